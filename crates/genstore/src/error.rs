//! # Error Definitions
//!
//! Every failure the store can report. Errors are terminal for a single
//! `load`/`store` call; callers decide on retries using [`Error::is_retryable`].

/// Failures raised while resolving, loading or publishing a generator.
#[derive(Debug)]
pub enum Error {
    /// The reference scheme has no registered backend.
    UnsupportedScheme(String),
    /// The reference could not be parsed or does not fit the backend.
    InvalidReference(String),
    /// Missing file, repository, tag or blob.
    NotFound(String),
    /// The manifest has no layer carrying generator bytecode.
    NoGeneratorLayer(String),
    /// Fetched content does not hash to the digest recorded in its descriptor.
    DigestMismatch { expected: String, actual: String },
    /// Fetched content does not have the size recorded in its descriptor.
    SizeMismatch { expected: u64, actual: u64 },
    /// The digest algorithm is not supported (only sha256 is).
    UnsupportedDigest(String),
    /// The manifest media type cannot be walked.
    UnsupportedMediaType(String),
    /// Filesystem failure other than not-found.
    Io(std::io::Error),
    /// Network or protocol failure talking to a registry.
    Http(reqwest::Error),
    /// The registry answered with an unexpected status.
    Registry { status: u16, message: String },
    /// A manifest could not be encoded or decoded.
    Manifest(serde_json::Error),
    /// The store configuration cannot be applied.
    Config(String),
}

impl Error {
    /// Whether repeating the same call could succeed.
    ///
    /// Network failures, registry-side errors (5xx) and throttling (429) are
    /// transient. Everything else is permanent for the given input.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Registry { status, .. } => *status >= 500 || *status == 429,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }

    /// Whether the referenced generator does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NoGeneratorLayer(_))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedScheme(scheme) => write!(f, "unsupported scheme {:?}", scheme),
            Self::InvalidReference(msg) => write!(f, "invalid reference: {}", msg),
            Self::NotFound(what) => write!(f, "not found: {}", what),
            Self::NoGeneratorLayer(what) => write!(f, "no generator layer in {}", what),
            Self::DigestMismatch { expected, actual } => {
                write!(f, "digest mismatch: expected {}, got {}", expected, actual)
            }
            Self::SizeMismatch { expected, actual } => {
                write!(f, "size mismatch: expected {} bytes, got {}", expected, actual)
            }
            Self::UnsupportedDigest(digest) => write!(f, "unsupported digest {:?}", digest),
            Self::UnsupportedMediaType(media_type) => {
                write!(f, "unsupported media type {:?}", media_type)
            }
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Http(e) => write!(f, "HTTP error: {}", e),
            Self::Registry { status, message } => {
                write!(f, "registry responded {}: {}", status, message)
            }
            Self::Manifest(e) => write!(f, "manifest error: {}", e),
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Http(e) => Some(e),
            Self::Manifest(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Manifest(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
