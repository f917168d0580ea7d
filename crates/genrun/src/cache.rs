//! Compiled-module cache keyed by bytecode digest.
//!
//! Only compilation is shared. Every execution still gets a fresh instance.

use dashmap::DashMap;
use genstore::Generator;
use tracing::debug;
use wasmtime::Engine;
use wasmtime::Module;

use crate::error::Error;
use crate::error::Result;

pub struct ModuleCache {
    modules: DashMap<String, Module>,
    capacity: usize,
}

impl ModuleCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            modules: DashMap::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Returns the compiled module for `generator`, compiling on a miss.
    ///
    /// When full, the cache is flushed before the new module is inserted.
    pub async fn get_or_compile(&self, engine: &Engine, generator: &Generator) -> Result<Module> {
        let digest = generator.digest();
        if let Some(module) = self.modules.get(&digest) {
            debug!(%digest, "module cache hit");
            return Ok(module.value().clone());
        }

        let module = compile(engine, generator).await?;
        if self.modules.len() >= self.capacity {
            debug!(capacity = self.capacity, "module cache full, flushing");
            self.modules.clear();
        }
        self.modules.insert(digest, module.clone());
        Ok(module)
    }
}

/// Compiles off the async executor.
pub async fn compile(engine: &Engine, generator: &Generator) -> Result<Module> {
    let engine = engine.clone();
    let generator = generator.clone();
    tokio::task::spawn_blocking(move || Module::new(&engine, generator.bin()))
        .await
        .map_err(|e| Error::Engine(wasmtime::Error::new(e)))?
        .map_err(Error::InstantiationFailed)
}
