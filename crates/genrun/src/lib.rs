//! # genrun
//!
//! Sandboxed execution of dashboard generators.
//!
//! A generator is a WebAssembly module targeting WASI preview 1. It receives a
//! configuration payload and returns an output payload, either the generated
//! document or an error envelope. Guests get no filesystem, network or
//! environment access beyond what their calling convention grants.
//!
//! ## Layout
//!
//! - [`Runtime`]: engine, linker, deadline and module cache.
//! - [`ContextBuilder`] / [`GuestCtx`]: what a guest is granted.
//! - [`ModuleInstance`]: one instantiated guest, used for one call.
//! - [`convention`]: payload passing (guest memory or mounted file).
//! - [`envelope`]: error envelope decoding.

pub mod cache;
pub mod config;
pub mod context;
pub mod convention;
pub mod envelope;
pub mod error;
pub mod instance;
pub mod runtime;

pub use config::InputMode;
pub use config::RuntimeConfig;
pub use context::ContextBuilder;
pub use context::GuestCtx;
pub use convention::ArgumentConvention;
pub use convention::Convention;
pub use convention::FileConvention;
pub use error::Error;
pub use error::Result;
pub use instance::ModuleInstance;
pub use runtime::ExecutionResult;
pub use runtime::Runtime;

#[cfg(test)]
mod tests;
