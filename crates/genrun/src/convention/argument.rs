//! Payload passed through guest memory.
//!
//! ```text
//! ptr = malloc(len)
//! memory[ptr..ptr + len] = payload
//! out = generate(ptr, len)
//! free(ptr)
//! ```
//!
//! All three exports are checked before the module is instantiated, and `free`
//! runs on every path once `malloc` has returned.

use async_trait::async_trait;
use tracing::debug;
use tracing::warn;
use wasmtime::TypedFunc;

use crate::convention::Convention;
use crate::convention::GENERATE;
use crate::convention::read_output;
use crate::error::Error;
use crate::error::Result;
use crate::instance::ModuleInstance;

pub const MALLOC: &str = "malloc";
pub const FREE: &str = "free";

#[derive(Clone, Copy, Debug, Default)]
pub struct ArgumentConvention;

impl ArgumentConvention {
    pub fn new() -> Self {
        Self
    }

    async fn invoke(
        &self,
        instance: &mut ModuleInstance,
        generate: &TypedFunc<(u32, u32), u64>,
        ptr: u32,
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        instance.write(ptr, payload)?;
        let packed = generate
            .call_async(instance.store_mut(), (ptr, payload.len() as u32))
            .await
            .map_err(Error::trapped)?;
        read_output(instance, packed)
    }
}

#[async_trait]
impl Convention for ArgumentConvention {
    fn name(&self) -> &'static str {
        "argument"
    }

    fn required_exports(&self) -> &'static [&'static str] {
        &[MALLOC, FREE, GENERATE]
    }

    async fn call(&self, instance: &mut ModuleInstance, payload: &[u8]) -> Result<Vec<u8>> {
        let malloc = instance.typed_func::<u32, u32>(MALLOC)?;
        let free = instance.typed_func::<u32, ()>(FREE)?;
        let generate = instance.typed_func::<(u32, u32), u64>(GENERATE)?;

        let len = u32::try_from(payload.len()).map_err(|_| Error::MemoryWriteFailed {
            ptr: 0,
            len: payload.len(),
        })?;
        let ptr = malloc
            .call_async(instance.store_mut(), len)
            .await
            .map_err(Error::trapped)?;
        debug!(ptr, len, "allocated input");

        let result = self.invoke(instance, &generate, ptr, payload).await;

        if let Err(e) = free.call_async(instance.store_mut(), ptr).await {
            let e = Error::trapped(e);
            match &result {
                Ok(_) => return Err(e),
                Err(primary) => warn!(error = %e, primary = %primary, "free failed after error"),
            }
        }

        result
    }
}
