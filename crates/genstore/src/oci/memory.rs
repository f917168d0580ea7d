//! # Memory Store
//!
//! In-process staging target. Content is verified on the way in, so anything
//! fetched from here matches its descriptor.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Error;
use crate::error::Result;
use crate::oci::Descriptor;
use crate::oci::Target;
use crate::oci::digest;

struct Entry {
    desc: Descriptor,
    content: Vec<u8>,
}

/// Content-addressed store held entirely in memory.
///
/// One is created per registry operation and dropped with it, so nothing
/// staged by a failed operation survives.
#[derive(Default)]
pub struct MemoryStore {
    content: DashMap<String, Entry>,
    tags: DashMap<String, Descriptor>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[async_trait]
impl Target for MemoryStore {
    async fn exists(&self, desc: &Descriptor) -> Result<bool> {
        Ok(self.content.contains_key(&desc.digest))
    }

    async fn fetch(&self, desc: &Descriptor) -> Result<Vec<u8>> {
        self.content
            .get(&desc.digest)
            .map(|entry| entry.content.clone())
            .ok_or_else(|| Error::NotFound(desc.digest.clone()))
    }

    async fn push(&self, desc: &Descriptor, content: Vec<u8>) -> Result<()> {
        digest::verify(desc, &content)?;
        self.content.insert(
            desc.digest.clone(),
            Entry {
                desc: desc.clone(),
                content,
            },
        );
        Ok(())
    }

    async fn resolve(&self, reference: &str) -> Result<Descriptor> {
        if let Some(desc) = self.tags.get(reference) {
            return Ok(desc.value().clone());
        }
        self.content
            .get(reference)
            .map(|entry| entry.desc.clone())
            .ok_or_else(|| Error::NotFound(reference.to_string()))
    }

    async fn tag(&self, desc: &Descriptor, reference: &str) -> Result<()> {
        if !self.content.contains_key(&desc.digest) {
            return Err(Error::NotFound(desc.digest.clone()));
        }
        self.tags.insert(reference.to_string(), desc.clone());
        Ok(())
    }
}
