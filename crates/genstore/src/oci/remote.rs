//! # Remote Repository
//!
//! A repository on an OCI distribution registry, spoken to over the
//! `/v2/<name>/...` HTTP API.
//!
//! Blobs are uploaded with the two-step monolithic flow (`POST` an upload
//! session, then `PUT` the bytes with their digest). Manifests are `PUT`
//! directly under a tag or digest. Everything fetched is verified against its
//! descriptor before it is handed back.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::Response;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_LENGTH;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::LOCATION;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::error::Result;
use crate::oci::Descriptor;
use crate::oci::MEDIA_TYPE_DOCKER_MANIFEST;
use crate::oci::MEDIA_TYPE_IMAGE_MANIFEST;
use crate::oci::Target;
use crate::oci::digest;
use crate::oci::is_manifest;
use crate::settings::RegistrySettings;

const MANIFEST_ACCEPT: &str = "application/vnd.oci.image.manifest.v1+json, \
                               application/vnd.docker.distribution.manifest.v2+json";

const CONTENT_DIGEST: &str = "docker-content-digest";

/// Longest registry error body kept in an [`Error::Registry`].
const MAX_ERROR_BODY: usize = 512;

/// A single repository on a remote registry.
#[derive(Clone, Debug)]
pub struct Repository {
    client: Client,
    base: Url,
    name: String,
}

impl Repository {
    /// Connects to `authority` (`host[:port]`) and repository `name`.
    ///
    /// The URL scheme follows `settings`: `http` only when the host has been
    /// explicitly allowed plain HTTP, `https` otherwise.
    pub fn new(
        client: Client,
        authority: &str,
        name: &str,
        settings: RegistrySettings,
    ) -> Result<Self> {
        if authority.is_empty() {
            return Err(Error::InvalidReference("missing registry host".to_string()));
        }
        if name.is_empty() {
            return Err(Error::InvalidReference(format!(
                "missing repository name for {}",
                authority
            )));
        }

        let scheme = if settings.plain_http { "http" } else { "https" };
        let base = Url::parse(&format!("{}://{}/v2/{}/", scheme, authority, name))
            .map_err(|e| Error::InvalidReference(format!("{}/{}: {}", authority, name, e)))?;

        Ok(Self {
            client,
            base,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::InvalidReference(format!("{}: {}", path, e)))
    }

    fn manifest_url(&self, reference: &str) -> Result<Url> {
        self.endpoint(&format!("manifests/{}", reference))
    }

    fn blob_url(&self, digest: &str) -> Result<Url> {
        self.endpoint(&format!("blobs/{}", digest))
    }

    fn node_url(&self, desc: &Descriptor) -> Result<Url> {
        if desc.is_manifest() {
            self.manifest_url(&desc.digest)
        } else {
            self.blob_url(&desc.digest)
        }
    }

    async fn upload_blob(&self, desc: &Descriptor, content: Vec<u8>) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("blobs/uploads/")?)
            .header(CONTENT_LENGTH, 0)
            .send()
            .await?;
        let response = check(response, &desc.digest).await?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Error::Registry {
                status: response.status().as_u16(),
                message: "upload session has no Location header".to_string(),
            })?;
        let mut url = self
            .base
            .join(location)
            .map_err(|e| Error::InvalidReference(format!("{}: {}", location, e)))?;
        url.query_pairs_mut().append_pair("digest", &desc.digest);

        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, content.len())
            .body(content)
            .send()
            .await?;
        check(response, &desc.digest).await?;

        debug!(repository = %self.name, digest = %desc.digest, size = desc.size, "uploaded blob");
        Ok(())
    }

    async fn put_manifest(&self, desc: &Descriptor, content: Vec<u8>, reference: &str) -> Result<()> {
        let response = self
            .client
            .put(self.manifest_url(reference)?)
            .header(CONTENT_TYPE, desc.media_type.as_str())
            .body(content)
            .send()
            .await?;
        check(response, reference).await?;

        debug!(repository = %self.name, reference, digest = %desc.digest, "put manifest");
        Ok(())
    }
}

#[async_trait]
impl Target for Repository {
    async fn exists(&self, desc: &Descriptor) -> Result<bool> {
        let response = self
            .client
            .head(self.node_url(desc)?)
            .header(ACCEPT, MANIFEST_ACCEPT)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response, &desc.digest).await?;
        Ok(true)
    }

    async fn fetch(&self, desc: &Descriptor) -> Result<Vec<u8>> {
        let accept = if desc.is_manifest() {
            desc.media_type.as_str()
        } else {
            "*/*"
        };
        let response = self
            .client
            .get(self.node_url(desc)?)
            .header(ACCEPT, accept)
            .send()
            .await?;
        let response = check(response, &desc.digest).await?;

        if let Some(length) = response.content_length() {
            if length != desc.size {
                return Err(Error::SizeMismatch {
                    expected: desc.size,
                    actual: length,
                });
            }
        }

        let content = response.bytes().await?.to_vec();
        digest::verify(desc, &content)?;
        Ok(content)
    }

    async fn push(&self, desc: &Descriptor, content: Vec<u8>) -> Result<()> {
        digest::verify(desc, &content)?;
        if desc.is_manifest() {
            self.put_manifest(desc, content, &desc.digest).await
        } else {
            self.upload_blob(desc, content).await
        }
    }

    async fn resolve(&self, reference: &str) -> Result<Descriptor> {
        let response = self
            .client
            .get(self.manifest_url(reference)?)
            .header(ACCEPT, MANIFEST_ACCEPT)
            .send()
            .await?;
        let response = check(response, &format!("{}:{}", self.name, reference)).await?;

        let headers = response.headers();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_string());
        let advertised = headers
            .get(CONTENT_DIGEST)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let content = response.bytes().await?;

        let media_type = content_type
            .filter(|media_type| is_manifest(media_type))
            .or_else(|| sniff_media_type(&content))
            .unwrap_or_else(|| MEDIA_TYPE_IMAGE_MANIFEST.to_string());
        let desc = Descriptor::from_content(&media_type, &content);

        let expected = if digest::is_digest(reference) {
            Some(reference.to_string())
        } else {
            advertised
        };
        if let Some(expected) = expected {
            if expected != desc.digest {
                return Err(Error::DigestMismatch {
                    expected,
                    actual: desc.digest,
                });
            }
        }

        Ok(desc)
    }

    async fn tag(&self, desc: &Descriptor, reference: &str) -> Result<()> {
        let content = self.fetch(desc).await?;
        self.put_manifest(desc, content, reference).await
    }

    async fn push_reference(
        &self,
        desc: &Descriptor,
        content: Vec<u8>,
        reference: &str,
    ) -> Result<()> {
        digest::verify(desc, &content)?;
        self.put_manifest(desc, content, reference).await
    }
}

/// Turns non-success statuses into errors; 404 becomes [`Error::NotFound`].
async fn check(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound(what.to_string()));
    }

    let mut message = response.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
    Err(Error::Registry {
        status: status.as_u16(),
        message,
    })
}

/// Reads `mediaType` from a manifest body when the registry sent no usable
/// `Content-Type`.
fn sniff_media_type(content: &[u8]) -> Option<String> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Probe {
        media_type: Option<String>,
    }

    serde_json::from_slice::<Probe>(content)
        .ok()
        .and_then(|probe| probe.media_type)
        .filter(|media_type| {
            media_type == MEDIA_TYPE_IMAGE_MANIFEST || media_type == MEDIA_TYPE_DOCKER_MANIFEST
        })
}
