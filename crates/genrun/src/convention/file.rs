//! Payload mounted as a read-only file.
//!
//! The guest sees a single file at `/dawg/input` and exports a zero-argument
//! `generate`. No allocation crosses the boundary, so `malloc`/`free` are not
//! required.

use async_trait::async_trait;

use crate::context::ContextBuilder;
use crate::convention::Convention;
use crate::convention::GENERATE;
use crate::convention::read_output;
use crate::error::Error;
use crate::error::Result;
use crate::instance::ModuleInstance;

#[derive(Clone, Copy, Debug, Default)]
pub struct FileConvention;

impl FileConvention {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Convention for FileConvention {
    fn name(&self) -> &'static str {
        "file"
    }

    fn required_exports(&self) -> &'static [&'static str] {
        &[GENERATE]
    }

    fn configure(&self, builder: &mut ContextBuilder, payload: &[u8]) -> Result<()> {
        builder.mount_input(payload)?;
        Ok(())
    }

    async fn call(&self, instance: &mut ModuleInstance, _payload: &[u8]) -> Result<Vec<u8>> {
        let generate = instance.typed_func::<(), u64>(GENERATE)?;
        let packed = generate
            .call_async(instance.store_mut(), ())
            .await
            .map_err(Error::trapped)?;
        read_output(instance, packed)
    }
}
