//! # Guest Context
//!
//! A [`ContextBuilder`] stages everything a guest is granted before its store
//! exists. The default grant is nothing: no preopened directories, no
//! environment, no arguments, no sockets, and stdio wired to nowhere.
//! Conventions add to it (for example the input mount) and the runtime bakes
//! it into a [`GuestCtx`].

use std::path::Path;

use tempfile::TempDir;
use tracing::debug;
use tracing::warn;
use wasmtime::StoreLimits;
use wasmtime::StoreLimitsBuilder;
use wasmtime_wasi::DirPerms;
use wasmtime_wasi::FilePerms;
use wasmtime_wasi::WasiCtxBuilder;
use wasmtime_wasi::p1::WasiP1Ctx;

use crate::error::Error;
use crate::error::Result;

/// Guest directory holding the input mount.
pub const INPUT_DIR: &str = "/dawg";

/// Name of the input file inside [`INPUT_DIR`].
pub const INPUT_FILE: &str = "input";

/// Full guest path of the input file.
pub const INPUT_PATH: &str = "/dawg/input";

pub struct ContextBuilder {
    pub wasi: WasiCtxBuilder,
    max_memory: Option<usize>,
    mounts: Vec<TempDir>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        let mut wasi = WasiCtxBuilder::new();
        wasi.allow_tcp(false)
            .allow_udp(false)
            .allow_ip_name_lookup(false);

        Self {
            wasi,
            max_memory: None,
            mounts: Vec::new(),
        }
    }

    /// Caps the guest's linear memory.
    pub fn memory_limit(&mut self, bytes: usize) -> &mut Self {
        self.max_memory = Some(bytes);
        self
    }

    /// Exposes `content` to the guest as the single read-only file
    /// [`INPUT_PATH`].
    ///
    /// The backing directory is private to this context and removed with it.
    pub fn mount_input(&mut self, content: &[u8]) -> Result<&mut Self> {
        let dir = tempfile::Builder::new()
            .prefix("genrun-input-")
            .tempdir()
            .map_err(|e| Error::Mount(e.to_string()))?;
        std::fs::write(dir.path().join(INPUT_FILE), content)
            .map_err(|e| Error::Mount(e.to_string()))?;

        self.wasi
            .preopened_dir(dir.path(), INPUT_DIR, DirPerms::READ, FilePerms::READ)
            .map_err(|e| Error::Mount(format!("{:#}", e)))?;

        debug!(host = %dir.path().display(), guest = INPUT_PATH, size = content.len(), "mounted input");
        self.mounts.push(dir);
        Ok(self)
    }

    pub fn build(mut self) -> GuestCtx {
        let mut limits = StoreLimitsBuilder::new();
        if let Some(bytes) = self.max_memory {
            limits = limits.memory_size(bytes);
        }

        GuestCtx {
            wasi: self.wasi.build_p1(),
            limits: limits.build(),
            mounts: std::mem::take(&mut self.mounts),
        }
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-instance state held in the wasmtime store.
pub struct GuestCtx {
    pub(crate) wasi: WasiP1Ctx,
    pub(crate) limits: StoreLimits,
    mounts: Vec<TempDir>,
}

impl GuestCtx {
    /// Host directories backing this guest's mounts.
    pub fn mount_paths(&self) -> impl Iterator<Item = &Path> {
        self.mounts.iter().map(TempDir::path)
    }
}

impl Drop for GuestCtx {
    fn drop(&mut self) {
        for dir in self.mounts.drain(..) {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(path = %path.display(), error = %e, "could not remove input mount");
            }
        }
    }
}
