//! # Store
//!
//! Routes `load`/`store` to a backend by reference scheme.
//!
//! The scheme table is fixed when the store is built. A reference whose scheme
//! is not in the table fails with [`Error::UnsupportedScheme`] before any I/O.

use std::collections::HashMap;

use tracing::debug;
use tracing::instrument;

use crate::backend::Backend;
use crate::backend::FileBackend;
use crate::backend::RegistryBackend;
use crate::error::Error;
use crate::error::Result;
use crate::generator::Generator;
use crate::reference::Reference;
use crate::settings::StoreConfig;

pub const SCHEME_FILE: &str = "file";
pub const SCHEME_REGISTRY: &str = "registry";
/// Alias of [`SCHEME_REGISTRY`].
pub const SCHEME_OCI: &str = "oci";

#[derive(Clone, Debug)]
pub struct Store {
    backends: HashMap<String, Backend>,
}

impl Store {
    /// A store with the `file`, `registry` and `oci` schemes registered.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let registry = Backend::Registry(RegistryBackend::new(config.registry)?);
        Ok(Self::empty()
            .with_backend(SCHEME_FILE, Backend::File(FileBackend::new()))
            .with_backend(SCHEME_REGISTRY, registry.clone())
            .with_backend(SCHEME_OCI, registry))
    }

    /// A store that knows no schemes.
    pub fn empty() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    pub fn with_backend(mut self, scheme: impl Into<String>, backend: Backend) -> Self {
        self.backends.insert(scheme.into(), backend);
        self
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    fn backend(&self, reference: &Reference) -> Result<&Backend> {
        let backend = self
            .backends
            .get(reference.scheme())
            .ok_or_else(|| Error::UnsupportedScheme(reference.scheme().to_string()))?;
        debug!(scheme = reference.scheme(), backend = backend.name(), "dispatch");
        Ok(backend)
    }

    #[instrument(skip(self, reference), fields(reference = %reference), err)]
    pub async fn load(&self, reference: &Reference) -> Result<Generator> {
        self.backend(reference)?.load(reference).await
    }

    #[instrument(skip(self, reference, generator), fields(reference = %reference, size = generator.len()), err)]
    pub async fn store(&self, reference: &Reference, generator: &Generator) -> Result<()> {
        self.backend(reference)?.store(reference, generator).await
    }
}
