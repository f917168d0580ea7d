//! # Calling Conventions
//!
//! How the host hands a payload to a generator and gets its output back.
//! A convention is a pair of steps: [`Convention::configure`] adjusts the guest
//! context before instantiation, [`Convention::call`] drives the instance.
//! Supporting another guest toolchain means adding an implementation here.
//!
//! Every convention ends with a `generate` export returning a packed `u64`:
//! the output pointer in the high 32 bits and its length in the low 32 bits.

pub mod argument;
pub mod file;

use async_trait::async_trait;

use crate::context::ContextBuilder;
use crate::error::Result;
use crate::instance::ModuleInstance;

pub use argument::ArgumentConvention;
pub use file::FileConvention;

pub const GENERATE: &str = "generate";

#[async_trait]
pub trait Convention: Send + Sync {
    fn name(&self) -> &'static str;

    /// Function exports the guest must provide besides its memory.
    fn required_exports(&self) -> &'static [&'static str];

    /// Grants the guest whatever this convention needs before instantiation.
    fn configure(&self, _builder: &mut ContextBuilder, _payload: &[u8]) -> Result<()> {
        Ok(())
    }

    /// Runs the generator and returns its raw output buffer.
    async fn call(&self, instance: &mut ModuleInstance, payload: &[u8]) -> Result<Vec<u8>>;
}

/// Splits a packed `generate` result into `(ptr, len)`.
pub fn unpack(packed: u64) -> (u32, u32) {
    ((packed >> 32) as u32, packed as u32)
}

/// Reads the output range a packed `generate` result points at.
pub(crate) fn read_output(instance: &ModuleInstance, packed: u64) -> Result<Vec<u8>> {
    let (ptr, len) = unpack(packed);
    instance.read(ptr, len)
}
