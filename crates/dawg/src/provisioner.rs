//! # Provisioner
//!
//! What a reconciliation loop calls: resolve a generator reference, run it on
//! the dashboard's configuration and hand back the generated payload. Any
//! error is terminal for the attempt; [`Error::is_retryable`] tells the caller
//! whether a later attempt could succeed.
//!
//! [`Error::is_retryable`]: crate::Error::is_retryable

use std::time::Duration;

use genrun::ExecutionResult;
use genrun::Runtime;
use genstore::Generator;
use genstore::Reference;
use genstore::Store;
use tracing::info;
use tracing::instrument;

use crate::config::Config;
use crate::error::Result;

#[derive(Clone)]
pub struct Provisioner {
    store: Store,
    runtime: Runtime,
}

impl Provisioner {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            store: Store::new(config.store)?,
            runtime: Runtime::new(config.runtime)?,
        })
    }

    pub fn from_parts(store: Store, runtime: Runtime) -> Self {
        Self { store, runtime }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Loads the generator at `reference` and runs it on `payload` under the
    /// configured timeout.
    pub async fn generate(&self, reference: &Reference, payload: &[u8]) -> Result<ExecutionResult> {
        self.generate_with_timeout(reference, payload, self.runtime.default_timeout())
            .await
    }

    #[instrument(skip(self, reference, payload), fields(reference = %reference, input = payload.len()), err)]
    pub async fn generate_with_timeout(
        &self,
        reference: &Reference,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<ExecutionResult> {
        let generator = self.store.load(reference).await?;
        let result = self.runtime.execute(&generator, payload, timeout).await?;

        info!(digest = %generator.digest(), output = result.payload.len(), "generated");
        Ok(result)
    }

    /// Publishes `bin` under `reference`.
    #[instrument(skip(self, reference, bin), fields(reference = %reference), err)]
    pub async fn publish(&self, reference: &Reference, bin: impl Into<Vec<u8>>) -> Result<Generator> {
        let generator = Generator::new(bin);
        self.store.store(reference, &generator).await?;

        info!(digest = %generator.digest(), size = generator.len(), "published");
        Ok(generator)
    }
}
