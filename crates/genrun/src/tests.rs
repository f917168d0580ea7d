//! Unit tests for envelope decoding, configuration, contexts, the module
//! cache and the argument convention's cleanup guarantees.

use std::time::Duration;

use genstore::Generator;

use crate::ArgumentConvention;
use crate::Convention;
use crate::ContextBuilder;
use crate::Error;
use crate::InputMode;
use crate::ModuleInstance;
use crate::Runtime;
use crate::RuntimeConfig;
use crate::cache::ModuleCache;
use crate::context::INPUT_FILE;
use crate::convention::unpack;
use crate::envelope;

const ECHO: &str = "(i64.or (i64.shl (i64.extend_i32_u (local.get $ptr)) (i64.const 32)) (i64.extend_i32_u (local.get $len)))";

/// A guest that counts calls to `free` in an exported global.
fn counting_guest(malloc: &str, generate: &str) -> Generator {
    let wat = format!(
        r#"
(module
  (memory (export "memory") 1)
  (global $frees (export "frees") (mut i32) (i32.const 0))
  (func (export "malloc") (param i32) (result i32) {malloc})
  (func (export "free") (param i32)
    (global.set $frees (i32.add (global.get $frees) (i32.const 1))))
  (func (export "generate") (param $ptr i32) (param $len i32) (result i64) {generate}))
"#
    );
    Generator::new(wat.into_bytes())
}

fn frees(instance: &mut ModuleInstance) -> i32 {
    let handle = *instance.instance();
    let global = handle.get_global(instance.store_mut(), "frees").unwrap();
    global.get(instance.store_mut()).unwrap_i32()
}

async fn call_counting(generator: &Generator, payload: &[u8]) -> (crate::Result<Vec<u8>>, i32) {
    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let module = runtime.module(generator).await.unwrap();
    let mut instance = runtime.instantiate(&module, payload).await.unwrap();
    let result = ArgumentConvention::new().call(&mut instance, payload).await;
    (result, frees(&mut instance))
}

// --- Envelope ---

#[test]
fn test_envelope_passes_payloads_through() {
    assert_eq!(envelope::decode(b"{\"a\":1}".to_vec()).unwrap(), b"{\"a\":1}");
    assert!(envelope::decode(Vec::new()).unwrap().is_empty());
}

#[test]
fn test_envelope_reports_errors() {
    let err = envelope::decode(b"e{\"err\":\"boom\"}".to_vec()).unwrap_err();
    assert!(matches!(err, Error::GeneratorReportedError(ref m) if m == "boom"));
    assert!(!err.is_retryable());
}

#[test]
fn test_envelope_malformed() {
    let err = envelope::decode(b"enot json".to_vec()).unwrap_err();
    assert!(matches!(err, Error::MalformedErrorEnvelope(_)));

    let err = envelope::decode(b"e".to_vec()).unwrap_err();
    assert!(matches!(err, Error::MalformedErrorEnvelope(_)));

    let err = envelope::decode(b"e{\"message\":\"boom\"}".to_vec()).unwrap_err();
    assert!(matches!(err, Error::MalformedErrorEnvelope(_)));
}

#[test]
fn test_unpack() {
    assert_eq!(unpack(0), (0, 0));
    assert_eq!(unpack((1024 << 32) | 6), (1024, 6));
    assert_eq!(unpack(u64::MAX), (u32::MAX, u32::MAX));
}

// --- Configuration ---

#[test]
fn test_config_defaults() {
    let config = RuntimeConfig::default();
    assert_eq!(config.timeout(), Duration::from_secs(1));
    assert_eq!(config.input, InputMode::Argument);
    assert_eq!(config.max_memory_bytes, 256 * 1024 * 1024);
    assert!(config.cache_modules);
    assert_eq!(config.epoch_tick(), Duration::from_millis(10));
}

#[test]
fn test_config_epoch_tick_floor() {
    let config = RuntimeConfig {
        epoch_tick_ms: 0,
        ..RuntimeConfig::default()
    };
    assert_eq!(config.epoch_tick(), Duration::from_millis(1));
}

#[test]
fn test_config_deserialize() {
    let config: RuntimeConfig =
        serde_json::from_str(r#"{"timeout_ms": 250, "input": "file", "cache_modules": false}"#)
            .unwrap();
    assert_eq!(config.timeout(), Duration::from_millis(250));
    assert_eq!(config.input, InputMode::File);
    assert!(!config.cache_modules);
    assert_eq!(config.max_memory_bytes, RuntimeConfig::default().max_memory_bytes);
}

// --- Errors ---

#[test]
fn test_error_classification() {
    assert!(Error::ExecutionTimedOut(Duration::from_secs(1)).is_retryable());
    assert!(Error::Mount("disk full".into()).is_retryable());
    assert!(!Error::UnexportedSymbol("malloc".into()).is_retryable());
    assert!(!Error::ExecutionTrapped("unreachable".into()).is_retryable());
    assert_eq!(
        Error::UnexportedSymbol("malloc".into()).to_string(),
        "module does not export the symbol \"malloc\""
    );
}

// --- Context ---

#[test]
fn test_input_mount_lifecycle() {
    let mut builder = ContextBuilder::new();
    builder.mount_input(b"{\"panels\":3}").unwrap();
    let ctx = builder.build();

    let dir = ctx.mount_paths().next().unwrap().to_path_buf();
    assert_eq!(std::fs::read(dir.join(INPUT_FILE)).unwrap(), b"{\"panels\":3}");

    drop(ctx);
    assert!(!dir.exists());
}

#[test]
fn test_default_context_mounts_nothing() {
    let ctx = ContextBuilder::new().build();
    assert_eq!(ctx.mount_paths().count(), 0);
}

// --- Module cache ---

fn trivial_module(n: usize) -> Generator {
    Generator::new(format!(
        "(module (memory (export \"memory\") 1) (global i32 (i32.const {})))",
        n
    ))
}

#[tokio::test]
async fn test_module_cache_flushes_when_full() {
    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let cache = ModuleCache::new(2);

    cache.get_or_compile(runtime.engine(), &trivial_module(0)).await.unwrap();
    cache.get_or_compile(runtime.engine(), &trivial_module(1)).await.unwrap();
    assert_eq!(cache.len(), 2);

    // Hit: nothing is compiled or evicted.
    cache.get_or_compile(runtime.engine(), &trivial_module(1)).await.unwrap();
    assert_eq!(cache.len(), 2);

    cache.get_or_compile(runtime.engine(), &trivial_module(2)).await.unwrap();
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_module_cache_rejects_invalid_bytecode() {
    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let cache = ModuleCache::new(4);

    let err = cache
        .get_or_compile(runtime.engine(), &Generator::new(b"\0asm garbage".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InstantiationFailed(_)));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_runtime_cache_can_be_disabled() {
    let runtime = Runtime::new(RuntimeConfig {
        cache_modules: false,
        ..RuntimeConfig::default()
    })
    .unwrap();
    assert!(runtime.inner.cache.is_none());

    let cached = Runtime::new(RuntimeConfig::default()).unwrap();
    cached.module(&trivial_module(7)).await.unwrap();
    cached.module(&trivial_module(7)).await.unwrap();
    assert_eq!(cached.inner.cache.as_ref().unwrap().len(), 1);
}

// --- Argument convention cleanup ---

#[tokio::test]
async fn test_free_after_success() {
    let guest = counting_guest("(i32.const 1024)", ECHO);
    let (result, frees) = call_counting(&guest, b"{\"a\":1}").await;
    assert_eq!(result.unwrap(), b"{\"a\":1}");
    assert_eq!(frees, 1);
}

#[tokio::test]
async fn test_free_after_write_failure() {
    let guest = counting_guest("(i32.const -16)", ECHO);
    let (result, frees) = call_counting(&guest, b"{\"a\":1}").await;
    assert!(
        matches!(result, Err(Error::MemoryWriteFailed { ptr: 0xffff_fff0, len: 7 })),
        "got {:?}",
        result
    );
    assert_eq!(frees, 1);
}

#[tokio::test]
async fn test_free_after_trap() {
    let guest = counting_guest("(i32.const 1024)", "(unreachable)");
    let (result, frees) = call_counting(&guest, b"{}").await;
    assert!(matches!(result, Err(Error::ExecutionTrapped(_))), "got {:?}", result);
    assert_eq!(frees, 1);
}

#[tokio::test]
async fn test_free_after_read_failure() {
    let packed = (70_000u64 << 32) | 100;
    let guest = counting_guest("(i32.const 1024)", &format!("(i64.const {})", packed as i64));
    let (result, frees) = call_counting(&guest, b"{}").await;
    assert!(
        matches!(result, Err(Error::MemoryReadFailed { ptr: 70_000, len: 100 })),
        "got {:?}",
        result
    );
    assert_eq!(frees, 1);
}

#[tokio::test]
async fn test_missing_free_is_caught_before_malloc() {
    let wat = r#"
(module
  (memory (export "memory") 1)
  (global $mallocs (export "mallocs") (mut i32) (i32.const 0))
  (func (export "malloc") (param i32) (result i32)
    (global.set $mallocs (i32.add (global.get $mallocs) (i32.const 1)))
    (i32.const 1024))
  (func (export "generate") (param i32 i32) (result i64) (i64.const 0)))
"#;
    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let module = runtime.module(&Generator::new(wat)).await.unwrap();
    let mut instance = runtime.instantiate(&module, b"{}").await.unwrap();

    let err = ArgumentConvention::new()
        .call(&mut instance, b"{}")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnexportedSymbol(ref name) if name == "free"));

    let handle = *instance.instance();
    let mallocs = handle.get_global(instance.store_mut(), "mallocs").unwrap();
    assert_eq!(mallocs.get(instance.store_mut()).unwrap_i32(), 0);
}
