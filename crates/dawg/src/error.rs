//! Errors surfaced by the provisioning facade.

#[derive(Debug)]
pub enum Error {
    /// Loading or publishing the generator failed.
    Store(genstore::Error),
    /// Executing the generator failed.
    Runtime(genrun::Error),
    /// The configuration file could not be read.
    Io(std::io::Error),
    /// The configuration file is not valid.
    Config(toml::de::Error),
}

impl Error {
    /// Whether the same attempt could succeed if repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            Self::Runtime(e) => e.is_retryable(),
            Self::Io(_) | Self::Config(_) => false,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store error: {}", e),
            Self::Runtime(e) => write!(f, "runtime error: {}", e),
            Self::Io(e) => write!(f, "could not read configuration: {}", e),
            Self::Config(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Runtime(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

impl From<genstore::Error> for Error {
    fn from(e: genstore::Error) -> Self {
        Self::Store(e)
    }
}

impl From<genrun::Error> for Error {
    fn from(e: genrun::Error) -> Self {
        Self::Runtime(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
