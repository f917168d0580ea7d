//! # Error Definitions
//!
//! Every way a generator execution can fail. Errors are terminal for the call
//! and never carry a partial result.

use std::time::Duration;

/// Failures raised while compiling, instantiating or calling a generator.
#[derive(Debug)]
pub enum Error {
    /// The engine or linker could not be set up.
    Engine(wasmtime::Error),
    /// The module did not compile, link or start.
    InstantiationFailed(wasmtime::Error),
    /// A required export is missing.
    UnexportedSymbol(String),
    /// An export exists but has the wrong kind or type.
    UnexpectedSignature { name: String, detail: String },
    /// The input payload could not be written at the allocated pointer.
    MemoryWriteFailed { ptr: u32, len: usize },
    /// The range returned by the generator lies outside its memory.
    MemoryReadFailed { ptr: u32, len: u32 },
    /// The guest trapped, aborted or exited while running.
    ExecutionTrapped(String),
    /// The guest did not return within the deadline.
    ExecutionTimedOut(Duration),
    /// The generator returned an error envelope.
    GeneratorReportedError(String),
    /// The generator returned an error envelope that is not valid JSON.
    MalformedErrorEnvelope(serde_json::Error),
    /// The input file could not be mounted.
    Mount(String),
}

impl Error {
    /// Classifies a failed guest call.
    pub(crate) fn trapped(e: wasmtime::Error) -> Self {
        if let Some(exit) = e.downcast_ref::<wasmtime_wasi::I32Exit>() {
            return Self::ExecutionTrapped(format!("guest exited with status {}", exit.0));
        }
        Self::ExecutionTrapped(format!("{:#}", e))
    }

    /// Whether repeating the same call could succeed.
    ///
    /// Only timeouts and host-side mount failures are transient; everything
    /// else is a property of the generator or its input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExecutionTimedOut(_) | Self::Mount(_))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Engine(e) => write!(f, "engine error: {}", e),
            Self::InstantiationFailed(e) => write!(f, "could not instantiate generator: {:#}", e),
            Self::UnexportedSymbol(name) => {
                write!(f, "module does not export the symbol {:?}", name)
            }
            Self::UnexpectedSignature { name, detail } => {
                write!(f, "export {:?} has an unexpected signature: {}", name, detail)
            }
            Self::MemoryWriteFailed { ptr, len } => {
                write!(f, "could not write {} bytes to module memory at {:#x}", len, ptr)
            }
            Self::MemoryReadFailed { ptr, len } => {
                write!(f, "could not read {} bytes from module memory at {:#x}", len, ptr)
            }
            Self::ExecutionTrapped(detail) => write!(f, "generator trapped: {}", detail),
            Self::ExecutionTimedOut(timeout) => {
                write!(f, "generator did not return within {:?}", timeout)
            }
            Self::GeneratorReportedError(message) => {
                write!(f, "generator reported an error: {}", message)
            }
            Self::MalformedErrorEnvelope(e) => {
                write!(f, "generator reported an error that could not be decoded: {}", e)
            }
            Self::Mount(msg) => write!(f, "could not mount generator input: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Engine(e) | Self::InstantiationFailed(e) => Some(&**e),
            Self::MalformedErrorEnvelope(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
