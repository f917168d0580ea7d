//! Local filesystem backend.

use std::io;
use std::path::Path;

use tracing::debug;

use crate::error::Error;
use crate::error::Result;
use crate::generator::Generator;
use crate::reference::Reference;

/// Stores each generator as a single file at the reference's path.
///
/// Concurrent stores to the same path are not coordinated; the last write wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileBackend;

impl FileBackend {
    pub fn new() -> Self {
        Self
    }

    pub async fn load(&self, reference: &Reference) -> Result<Generator> {
        let path = reference.to_file_path()?;
        let bin = tokio::fs::read(&path)
            .await
            .map_err(|e| not_found_or_io(e, &path))?;

        debug!(path = %path.display(), size = bin.len(), "read generator");
        Ok(Generator::new(bin))
    }

    /// Writes the generator, creating missing parent directories.
    pub async fn store(&self, reference: &Reference, generator: &Generator) -> Result<()> {
        let path = reference.to_file_path()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, generator.bin()).await?;

        debug!(path = %path.display(), size = generator.len(), "wrote generator");
        Ok(())
    }
}

fn not_found_or_io(e: io::Error, path: &Path) -> Error {
    if e.kind() == io::ErrorKind::NotFound {
        Error::NotFound(path.display().to_string())
    } else {
        Error::Io(e)
    }
}
