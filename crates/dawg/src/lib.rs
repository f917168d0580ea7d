//! # dawg
//!
//! Dashboard generator provisioning: load a generator from a
//! [`Store`](genstore::Store), run it in a [`Runtime`](genrun::Runtime), return
//! the generated payload.
//!
//! ```no_run
//! # async fn example() -> dawg::Result<()> {
//! dawg::telemetry::init();
//!
//! let config = dawg::Config::from_file("dawg.toml")?;
//! let provisioner = dawg::Provisioner::new(config)?;
//!
//! let reference: dawg::Reference = "registry://registry.example.com/team/app:v1".parse()?;
//! let dashboard = provisioner.generate(&reference, br#"{"title":"coucou"}"#).await?;
//! # let _ = dashboard;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod provisioner;
pub mod telemetry;

pub use config::Config;
pub use error::Error;
pub use error::Result;
pub use provisioner::Provisioner;

pub use genrun::ExecutionResult;
pub use genstore::Reference;
