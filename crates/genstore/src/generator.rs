//! # Generator
//!
//! The compiled bytecode of a generator. Immutable once built.

use std::sync::Arc;

use crate::oci::digest;

/// A compiled generator module.
///
/// Cloning is cheap; the bytes are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct Generator {
    bin: Arc<[u8]>,
}

impl Generator {
    pub fn new(bin: impl Into<Vec<u8>>) -> Self {
        Self {
            bin: Arc::from(bin.into()),
        }
    }

    /// The raw module bytes.
    pub fn bin(&self) -> &[u8] {
        &self.bin
    }

    pub fn len(&self) -> usize {
        self.bin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bin.is_empty()
    }

    /// Content identity: `sha256:<hex>` over the module bytes.
    pub fn digest(&self) -> String {
        digest::sha256(&self.bin)
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("len", &self.bin.len())
            .field("digest", &self.digest())
            .finish()
    }
}

impl From<Vec<u8>> for Generator {
    fn from(bin: Vec<u8>) -> Self {
        Self::new(bin)
    }
}

impl From<&[u8]> for Generator {
    fn from(bin: &[u8]) -> Self {
        Self::new(bin)
    }
}
