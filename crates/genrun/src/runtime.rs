//! # Runtime
//!
//! Executes generators in a sandbox under a deadline.
//!
//! One engine and one linker (WASI preview 1, nothing granted) are built per
//! runtime and shared by every execution. Each execution gets its own store and
//! instance, dropped when the call returns or is cancelled.
//!
//! Deadlines rely on epoch interruption: a background thread bumps the engine
//! epoch every tick and running guests yield to the executor on each bump, so
//! a guest spinning in a loop can still be cancelled by `tokio::time::timeout`.

use std::sync::Arc;
use std::time::Duration;

use genstore::Generator;
use tracing::debug;
use tracing::instrument;
use tracing::warn;
use wasmtime::Engine;
use wasmtime::EngineWeak;
use wasmtime::Linker;
use wasmtime::Module;

use crate::cache::ModuleCache;
use crate::cache::compile;
use crate::config::InputMode;
use crate::config::RuntimeConfig;
use crate::context::ContextBuilder;
use crate::context::GuestCtx;
use crate::convention::ArgumentConvention;
use crate::convention::Convention;
use crate::convention::FileConvention;
use crate::envelope;
use crate::error::Error;
use crate::error::Result;
use crate::instance::ModuleInstance;
use crate::instance::check_exports;

/// Output of a successful execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    pub payload: Vec<u8>,
}

/// Shared handle to the execution engine. Cloning is cheap.
#[derive(Clone)]
pub struct Runtime {
    pub(crate) inner: Arc<RuntimeInner>,
}

pub(crate) struct RuntimeInner {
    pub(crate) engine: Engine,
    pub(crate) linker: Linker<GuestCtx>,
    pub(crate) convention: Arc<dyn Convention>,
    pub(crate) cache: Option<ModuleCache>,
    pub(crate) config: RuntimeConfig,
}

impl Runtime {
    /// Builds a runtime using the convention selected by `config.input`.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let convention: Arc<dyn Convention> = match config.input {
            InputMode::Argument => Arc::new(ArgumentConvention::new()),
            InputMode::File => Arc::new(FileConvention::new()),
        };
        Self::with_convention(config, convention)
    }

    /// Builds a runtime driving generators through `convention`.
    pub fn with_convention(config: RuntimeConfig, convention: Arc<dyn Convention>) -> Result<Self> {
        let mut wasm_config = wasmtime::Config::new();
        wasm_config.async_support(true);
        wasm_config.epoch_interruption(true);
        let engine = Engine::new(&wasm_config).map_err(Error::Engine)?;

        let mut linker = Linker::new(&engine);
        wasmtime_wasi::p1::add_to_linker_async(&mut linker, |ctx: &mut GuestCtx| &mut ctx.wasi)
            .map_err(Error::Engine)?;

        spawn_epoch_ticker(engine.weak(), config.epoch_tick())?;

        let cache = (config.cache_modules && config.module_cache_capacity > 0)
            .then(|| ModuleCache::new(config.module_cache_capacity));

        debug!(convention = convention.name(), cache = cache.is_some(), "runtime ready");
        Ok(Self {
            inner: Arc::new(RuntimeInner {
                engine,
                linker,
                convention,
                cache,
                config,
            }),
        })
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.inner.engine
    }

    pub fn default_timeout(&self) -> Duration {
        self.inner.config.timeout()
    }

    /// Runs `generator` on `payload`, failing with
    /// [`Error::ExecutionTimedOut`] if the guest has not returned by `timeout`.
    ///
    /// Required exports are checked on the compiled module first, so a guest
    /// missing one never runs. The deadline covers instantiation, start-up
    /// and the `generate` call.
    /// On expiry the instance is dropped mid-call; nothing of it survives.
    #[instrument(
        skip(self, generator, payload),
        fields(digest = %generator.digest(), input = payload.len(), convention = self.inner.convention.name()),
        err
    )]
    pub async fn execute(
        &self,
        generator: &Generator,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<ExecutionResult> {
        let module = self.module(generator).await?;
        check_exports(&module, self.inner.convention.required_exports())?;

        let run = async {
            let mut instance = self.instantiate(&module, payload).await?;
            self.inner.convention.call(&mut instance, payload).await
        };

        let output = match tokio::time::timeout(timeout, run).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(?timeout, "generator timed out");
                return Err(Error::ExecutionTimedOut(timeout));
            }
        };

        let payload = envelope::decode(output)?;
        debug!(output = payload.len(), "generated");
        Ok(ExecutionResult { payload })
    }

    /// Compiled module for `generator`, from the cache when enabled.
    pub(crate) async fn module(&self, generator: &Generator) -> Result<Module> {
        match &self.inner.cache {
            Some(cache) => cache.get_or_compile(&self.inner.engine, generator).await,
            None => compile(&self.inner.engine, generator).await,
        }
    }

    /// A fresh, started instance with the convention's grants applied.
    pub(crate) async fn instantiate(&self, module: &Module, payload: &[u8]) -> Result<ModuleInstance> {
        let mut builder = ContextBuilder::new();
        builder.memory_limit(self.inner.config.max_memory_bytes);
        self.inner.convention.configure(&mut builder, payload)?;

        ModuleInstance::instantiate(&self.inner.engine, &self.inner.linker, module, builder.build())
            .await
    }
}

/// Bumps the engine epoch every `tick` until the engine is dropped.
fn spawn_epoch_ticker(engine: EngineWeak, tick: Duration) -> Result<()> {
    std::thread::Builder::new()
        .name("genrun-epoch".to_string())
        .spawn(move || {
            loop {
                std::thread::sleep(tick);
                match engine.upgrade() {
                    Some(engine) => engine.increment_epoch(),
                    None => break,
                }
            }
        })
        .map(drop)
        .map_err(|e| Error::Engine(wasmtime::Error::new(e)))
}
