//! # Registry Backend
//!
//! Ships generators as single-layer OCI artifacts.
//!
//! ## Store
//!
//! 1. Describe the bytecode as a `application/vnd.wasm.content.layer.v1+wasm`
//!    layer and push it to a fresh in-memory staging store.
//! 2. Pack a manifest (artifact type `application/vnd.dawg.generator.v1`,
//!    empty config) over that one layer and tag it.
//! 3. Copy the tagged manifest and its blobs from staging to the remote.
//!
//! ## Load
//!
//! 1. Copy the remote manifest and its blobs into a fresh staging store.
//! 2. Pick the wasm layer among the manifest's successors.
//! 3. Fetch it from staging.
//!
//! Staging never outlives the call, so a failed operation leaves nothing
//! behind locally.

use std::sync::Arc;

use reqwest::Client;

use crate::error::Error;
use crate::error::Result;
use crate::generator::Generator;
use crate::oci;
use crate::oci::ARTIFACT_TYPE_GENERATOR;
use crate::oci::Descriptor;
use crate::oci::MEDIA_TYPE_WASM_LAYER;
use crate::oci::MemoryStore;
use crate::oci::Repository;
use crate::oci::Target;
use crate::reference::Reference;
use crate::settings::RegistryConfig;

#[derive(Clone, Debug)]
pub struct RegistryBackend {
    client: Client,
    config: Arc<RegistryConfig>,
}

impl RegistryBackend {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let mut builder =
            Client::builder().user_agent(concat!("genstore/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("registry client: {}", e)))?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// The remote repository a reference points at.
    pub fn repository(&self, reference: &Reference) -> Result<Repository> {
        let host = reference.host();
        if host.is_empty() {
            return Err(Error::InvalidReference(format!(
                "{} has no registry host",
                reference
            )));
        }

        let settings = self.config.settings_for(host, reference.port());
        Repository::new(
            self.client.clone(),
            &reference.authority(),
            reference.repository(),
            settings,
        )
    }

    pub async fn load(&self, reference: &Reference) -> Result<Generator> {
        let remote = self.repository(reference)?;
        let target = reference.reference_or_default();

        let staging = MemoryStore::new();
        let root = oci::copy(&remote, target, &staging, target).await?;

        let manifest = staging.fetch(&root).await?;
        let layer = oci::successors(&root, &manifest)?
            .into_iter()
            .find(|desc| desc.media_type == MEDIA_TYPE_WASM_LAYER)
            .ok_or_else(|| Error::NoGeneratorLayer(reference.to_string()))?;

        let bin = staging.fetch(&layer).await?;
        Ok(Generator::new(bin))
    }

    pub async fn store(&self, reference: &Reference, generator: &Generator) -> Result<()> {
        if let Some(digest) = reference.digest() {
            return Err(Error::InvalidReference(format!(
                "cannot store to digest {}, use a tag",
                digest
            )));
        }
        let remote = self.repository(reference)?;
        let tag = reference.reference_or_default();

        let staging = MemoryStore::new();
        let layer = Descriptor::from_content(MEDIA_TYPE_WASM_LAYER, generator.bin());
        staging.push(&layer, generator.bin().to_vec()).await?;

        let manifest = oci::pack(&staging, ARTIFACT_TYPE_GENERATOR, vec![layer]).await?;
        staging.tag(&manifest, tag).await?;

        oci::copy(&staging, tag, &remote, tag).await?;
        Ok(())
    }
}
