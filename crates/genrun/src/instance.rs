//! # Module Instance
//!
//! One instantiated generator together with the store that owns it. An
//! instance serves exactly one execution and is dropped afterwards; nothing
//! is pooled or reused.

use tracing::debug;
use wasmtime::Engine;
use wasmtime::Extern;
use wasmtime::ExternType;
use wasmtime::Instance;
use wasmtime::Linker;
use wasmtime::Memory;
use wasmtime::Module;
use wasmtime::Store;
use wasmtime::TypedFunc;
use wasmtime::WasmParams;
use wasmtime::WasmResults;
use wasmtime_wasi::I32Exit;

use crate::context::GuestCtx;
use crate::error::Error;
use crate::error::Result;

/// Exported linear memory every generator must provide.
pub const MEMORY: &str = "memory";

/// Start-up exports, tried in order. At most one is run.
const STARTUP: [&str; 2] = ["_initialize", "_start"];

pub struct ModuleInstance {
    store: Store<GuestCtx>,
    instance: Instance,
    memory: Memory,
}

impl ModuleInstance {
    /// Instantiates `module`, runs its start-up export and locates its memory.
    ///
    /// Reactors export `_initialize`, commands export `_start`. A command
    /// that finishes with `proc_exit(0)` has started cleanly.
    pub async fn instantiate(
        engine: &Engine,
        linker: &Linker<GuestCtx>,
        module: &Module,
        ctx: GuestCtx,
    ) -> Result<Self> {
        let mut store = Store::new(engine, ctx);
        store.limiter(|ctx| &mut ctx.limits);
        store.set_epoch_deadline(1);
        store.epoch_deadline_async_yield_and_update(1);

        let instance = linker
            .instantiate_async(&mut store, module)
            .await
            .map_err(Error::InstantiationFailed)?;

        start(&mut store, &instance).await?;

        let memory = instance
            .get_memory(&mut store, MEMORY)
            .ok_or_else(|| Error::UnexportedSymbol(MEMORY.to_string()))?;

        Ok(Self {
            store,
            instance,
            memory,
        })
    }

    /// Looks up an exported function with the expected signature.
    pub fn typed_func<P, R>(&mut self, name: &str) -> Result<TypedFunc<P, R>>
    where
        P: WasmParams,
        R: WasmResults,
    {
        match self.instance.get_export(&mut self.store, name) {
            None => Err(Error::UnexportedSymbol(name.to_string())),
            Some(Extern::Func(func)) => {
                func.typed::<P, R>(&self.store)
                    .map_err(|e| Error::UnexpectedSignature {
                        name: name.to_string(),
                        detail: format!("{:#}", e),
                    })
            }
            Some(_) => Err(Error::UnexpectedSignature {
                name: name.to_string(),
                detail: "export is not a function".to_string(),
            }),
        }
    }

    /// Copies `data` into guest memory at `ptr`.
    pub fn write(&mut self, ptr: u32, data: &[u8]) -> Result<()> {
        self.memory
            .write(&mut self.store, ptr as usize, data)
            .map_err(|_| Error::MemoryWriteFailed {
                ptr,
                len: data.len(),
            })
    }

    /// Copies `len` bytes of guest memory starting at `ptr`.
    pub fn read(&self, ptr: u32, len: u32) -> Result<Vec<u8>> {
        let data = self.memory.data(&self.store);
        let start = ptr as usize;
        start
            .checked_add(len as usize)
            .and_then(|end| data.get(start..end))
            .map(<[u8]>::to_vec)
            .ok_or(Error::MemoryReadFailed { ptr, len })
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn store_mut(&mut self) -> &mut Store<GuestCtx> {
        &mut self.store
    }
}

/// Checks that `module` exports [`MEMORY`] and every function in `functions`.
///
/// Runs against the compiled module, so nothing in the guest has executed
/// when a missing export is reported.
pub fn check_exports(module: &Module, functions: &[&str]) -> Result<()> {
    match module.get_export(MEMORY) {
        Some(ExternType::Memory(_)) => {}
        Some(_) => {
            return Err(Error::UnexpectedSignature {
                name: MEMORY.to_string(),
                detail: "export is not a memory".to_string(),
            });
        }
        None => return Err(Error::UnexportedSymbol(MEMORY.to_string())),
    }

    for &name in functions {
        match module.get_export(name) {
            Some(ExternType::Func(_)) => {}
            Some(_) => {
                return Err(Error::UnexpectedSignature {
                    name: name.to_string(),
                    detail: "export is not a function".to_string(),
                });
            }
            None => return Err(Error::UnexportedSymbol(name.to_string())),
        }
    }
    Ok(())
}

async fn start(store: &mut Store<GuestCtx>, instance: &Instance) -> Result<()> {
    for name in STARTUP {
        let Some(export) = instance.get_export(&mut *store, name) else {
            continue;
        };
        let func = match export {
            Extern::Func(func) => func.typed::<(), ()>(&*store).map_err(|e| {
                Error::UnexpectedSignature {
                    name: name.to_string(),
                    detail: format!("{:#}", e),
                }
            })?,
            _ => {
                return Err(Error::UnexpectedSignature {
                    name: name.to_string(),
                    detail: "export is not a function".to_string(),
                });
            }
        };

        debug!(export = name, "running start-up");
        return match func.call_async(&mut *store, ()).await {
            Ok(()) => Ok(()),
            Err(e) => match e.downcast_ref::<I32Exit>() {
                Some(I32Exit(0)) => Ok(()),
                _ => Err(Error::InstantiationFailed(e)),
            },
        };
    }
    Ok(())
}
