//! # Content Targets
//!
//! A minimal async interface over content-addressed storage.
//!
//! ## Invariants
//!
//! - `fetch` only returns bytes that match the descriptor's digest and size.
//! - `push` rejects bytes that do not match the descriptor.
//! - `tag` only points at content already present in the target.

use async_trait::async_trait;

use crate::error::Result;
use crate::oci::Descriptor;

/// Something content can be pushed to and fetched from.
///
/// Object-safe, so targets can be used as `&dyn Target`.
#[async_trait]
pub trait Target: Send + Sync {
    /// Whether the content described by `desc` is present.
    async fn exists(&self, desc: &Descriptor) -> Result<bool>;

    /// Fetches and verifies the content described by `desc`.
    async fn fetch(&self, desc: &Descriptor) -> Result<Vec<u8>>;

    /// Stores `content` under `desc`.
    async fn push(&self, desc: &Descriptor, content: Vec<u8>) -> Result<()>;

    /// Resolves a tag or digest to the descriptor of a manifest.
    async fn resolve(&self, reference: &str) -> Result<Descriptor>;

    /// Points `reference` at the manifest described by `desc`.
    async fn tag(&self, desc: &Descriptor, reference: &str) -> Result<()>;

    /// Stores a manifest and tags it in one step.
    async fn push_reference(
        &self,
        desc: &Descriptor,
        content: Vec<u8>,
        reference: &str,
    ) -> Result<()> {
        self.push(desc, content).await?;
        self.tag(desc, reference).await
    }
}
