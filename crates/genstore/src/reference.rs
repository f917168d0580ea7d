//! # Artifact References
//!
//! A reference is a URI naming a generator: `<scheme>://<host>/<path>[:<tag>]`
//! or, for registries, `<scheme>://<host>/<path>@<digest>`.
//!
//! References carry no behavior; the scheme selects a backend in the
//! [`Store`](crate::store::Store) and the backend interprets the rest.

use std::path::PathBuf;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::Error;
use crate::error::Result;

/// Tag used when a registry reference names neither a tag nor a digest.
pub const DEFAULT_TAG: &str = "latest";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Reference {
    url: Url,
    /// Authority as written; `url` lowercases hosts of special schemes.
    raw_host: String,
}

impl Reference {
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input)
            .map_err(|e| Error::InvalidReference(format!("{:?}: {}", input, e)))?;
        Ok(Self {
            url,
            raw_host: raw_authority(input).to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Host name without port. Empty for host-less references such as `file:///x`.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn port(&self) -> Option<u16> {
        self.url.port()
    }

    /// `host[:port]`, the registry endpoint of the reference.
    pub fn authority(&self) -> String {
        match self.port() {
            Some(port) => format!("{}:{}", self.host(), port),
            None => self.host().to_string(),
        }
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Repository name: the path without its leading slash, tag or digest.
    pub fn repository(&self) -> &str {
        let path = self.path().trim_start_matches('/');
        if let Some((repository, _)) = path.split_once('@') {
            return repository;
        }
        match tag_split(path) {
            Some(split) => &path[..split],
            None => path,
        }
    }

    /// The `:tag` component, if any.
    pub fn tag(&self) -> Option<&str> {
        let path = self.path().trim_start_matches('/');
        if path.contains('@') {
            return None;
        }
        tag_split(path).map(|split| &path[split + 1..])
    }

    /// The `@digest` component, if any.
    pub fn digest(&self) -> Option<&str> {
        self.path()
            .split_once('@')
            .map(|(_, digest)| digest)
            .filter(|digest| !digest.is_empty())
    }

    /// Tag or digest to resolve, falling back to [`DEFAULT_TAG`].
    pub fn reference_or_default(&self) -> &str {
        self.digest().or(self.tag()).unwrap_or(DEFAULT_TAG)
    }

    /// Filesystem location for `file://` references.
    ///
    /// `file:///abs/path` maps to `/abs/path`; `file://dir/name` maps to the
    /// relative path `dir/name`, with `dir` kept as written and the rest
    /// percent-decoded.
    pub fn to_file_path(&self) -> Result<PathBuf> {
        let host = self.host();
        if host.is_empty() || host == "localhost" {
            return self
                .url
                .to_file_path()
                .map_err(|_| Error::InvalidReference(format!("{} is not a file path", self)));
        }
        let path = percent_decode_str(self.path())
            .decode_utf8()
            .map_err(|e| Error::InvalidReference(format!("{}: {}", self, e)))?;
        Ok(PathBuf::from(&self.raw_host).join(path.trim_start_matches('/')))
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

/// The `host[:port]` of `input` exactly as written.
fn raw_authority(input: &str) -> &str {
    input
        .split_once("://")
        .and_then(|(_, rest)| rest.split(['/', '?', '#']).next())
        .unwrap_or_default()
}

/// Byte offset of the `:` separating the last path segment from its tag.
fn tag_split(path: &str) -> Option<usize> {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    path[name_start..].rfind(':').map(|i| name_start + i)
}

impl FromStr for Reference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
