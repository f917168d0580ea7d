//! # Storage Backends
//!
//! Scheme-specific load/store. The set of backends is closed, so dispatch is a
//! plain enum rather than a trait object.

pub mod file;
pub mod registry;

use crate::error::Result;
use crate::generator::Generator;
use crate::reference::Reference;

pub use file::FileBackend;
pub use registry::RegistryBackend;

#[derive(Clone, Debug)]
pub enum Backend {
    /// `file://` references, read from and written to the local filesystem.
    File(FileBackend),
    /// `registry://` (and `oci://`) references, as single-layer OCI artifacts.
    Registry(RegistryBackend),
}

impl Backend {
    pub async fn load(&self, reference: &Reference) -> Result<Generator> {
        match self {
            Backend::File(file) => file.load(reference).await,
            Backend::Registry(registry) => registry.load(reference).await,
        }
    }

    pub async fn store(&self, reference: &Reference, generator: &Generator) -> Result<()> {
        match self {
            Backend::File(file) => file.store(reference, generator).await,
            Backend::Registry(registry) => registry.store(reference, generator).await,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::File(_) => "file",
            Backend::Registry(_) => "registry",
        }
    }
}
