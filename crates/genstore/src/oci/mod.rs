//! # OCI Content Model
//!
//! The subset of the OCI image and distribution specs needed to ship a
//! generator as a single-layer artifact.
//!
//! ## Layout
//!
//! - [`Descriptor`] / [`Manifest`]: the JSON documents.
//! - [`Target`]: anything content can be pushed to and fetched from.
//! - [`MemoryStore`]: in-process staging target.
//! - [`Repository`]: a remote registry repository.
//! - [`copy`]: moves a manifest and its blobs between targets.

pub mod copy;
pub mod digest;
pub mod memory;
pub mod remote;
pub mod target;

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;

pub use copy::copy;
pub use memory::MemoryStore;
pub use remote::Repository;
pub use target::Target;

/// Layer media type of generator bytecode.
pub const MEDIA_TYPE_WASM_LAYER: &str = "application/vnd.wasm.content.layer.v1+wasm";

/// Artifact type of a generator manifest.
pub const ARTIFACT_TYPE_GENERATOR: &str = "application/vnd.dawg.generator.v1";

pub const MEDIA_TYPE_IMAGE_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
pub const MEDIA_TYPE_DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const MEDIA_TYPE_IMAGE_INDEX: &str = "application/vnd.oci.image.index.v1+json";

/// Config media type for artifacts that carry no config.
pub const MEDIA_TYPE_EMPTY: &str = "application/vnd.oci.empty.v1+json";

/// The empty config blob: `{}`.
pub const EMPTY_CONTENT: &[u8] = b"{}";

/// A content-addressed pointer to a blob or manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub media_type: String,
    pub digest: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl Descriptor {
    /// Describes `content` under `media_type`.
    pub fn from_content(media_type: &str, content: &[u8]) -> Self {
        Self {
            media_type: media_type.to_string(),
            digest: digest::sha256(content),
            size: content.len() as u64,
            artifact_type: None,
            data: None,
            annotations: None,
        }
    }

    /// Descriptor of [`EMPTY_CONTENT`], with the content inlined.
    pub fn empty_config() -> Self {
        Self {
            // base64 of `{}`
            data: Some("e30=".to_string()),
            ..Self::from_content(MEDIA_TYPE_EMPTY, EMPTY_CONTENT)
        }
    }

    pub fn is_manifest(&self) -> bool {
        is_manifest(&self.media_type)
    }
}

/// An OCI image manifest (also accepted in its docker v2 spelling).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    pub config: Descriptor,
    #[serde(default)]
    pub layers: Vec<Descriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Descriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl Manifest {
    /// An artifact manifest in the OCI 1.1 style: empty config, `artifactType` set.
    pub fn artifact(artifact_type: &str, layers: Vec<Descriptor>) -> Self {
        Self {
            schema_version: 2,
            media_type: Some(MEDIA_TYPE_IMAGE_MANIFEST.to_string()),
            artifact_type: Some(artifact_type.to_string()),
            config: Descriptor::empty_config(),
            layers,
            subject: None,
            annotations: None,
        }
    }

    /// Serializes the manifest and describes the resulting bytes.
    pub fn encode(&self) -> Result<(Descriptor, Vec<u8>)> {
        let content = serde_json::to_vec(self)?;
        let mut desc = Descriptor::from_content(MEDIA_TYPE_IMAGE_MANIFEST, &content);
        desc.artifact_type = self.artifact_type.clone();
        Ok((desc, content))
    }
}

pub fn is_manifest(media_type: &str) -> bool {
    matches!(
        media_type,
        MEDIA_TYPE_IMAGE_MANIFEST | MEDIA_TYPE_DOCKER_MANIFEST | MEDIA_TYPE_IMAGE_INDEX
    )
}

/// Direct children of a node in the content graph.
///
/// Blobs have none; a manifest's children are its config, layers and subject.
pub fn successors(desc: &Descriptor, content: &[u8]) -> Result<Vec<Descriptor>> {
    match desc.media_type.as_str() {
        MEDIA_TYPE_IMAGE_MANIFEST | MEDIA_TYPE_DOCKER_MANIFEST => {
            let manifest: Manifest = serde_json::from_slice(content)?;
            let mut nodes = Vec::with_capacity(manifest.layers.len() + 2);
            nodes.push(manifest.config);
            nodes.extend(manifest.layers);
            nodes.extend(manifest.subject);
            Ok(nodes)
        }
        MEDIA_TYPE_IMAGE_INDEX => Err(Error::UnsupportedMediaType(desc.media_type.clone())),
        _ => Ok(Vec::new()),
    }
}

/// Packs a manifest over `layers` into `target`, pushing the empty config if
/// needed. The layers must already be in `target`.
pub async fn pack<T: Target + ?Sized>(
    target: &T,
    artifact_type: &str,
    layers: Vec<Descriptor>,
) -> Result<Descriptor> {
    let config = Descriptor::empty_config();
    if !target.exists(&config).await? {
        target.push(&config, EMPTY_CONTENT.to_vec()).await?;
    }

    let (desc, content) = Manifest::artifact(artifact_type, layers).encode()?;
    target.push(&desc, content).await?;
    Ok(desc)
}
