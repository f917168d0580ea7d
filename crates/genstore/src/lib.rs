//! # genstore
//!
//! Resolves generator references to verified bytecode and publishes bytecode
//! under references.
//!
//! ```text
//! file:///var/lib/dawg/gen.wasm
//! registry://registry.example.com/team/app:v1
//! registry://registry.example.com/team/app@sha256:...
//! ```

pub mod backend;
pub mod error;
pub mod generator;
pub mod oci;
pub mod reference;
pub mod settings;
pub mod store;

pub use error::Error;
pub use error::Result;
pub use generator::Generator;
pub use reference::Reference;
pub use settings::RegistryConfig;
pub use settings::RegistrySettings;
pub use settings::StoreConfig;
pub use store::Store;

#[cfg(test)]
mod tests;
