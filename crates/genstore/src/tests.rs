//! Unit tests for references, settings, the OCI content model and dispatch.

use crate::Error;
use crate::Generator;
use crate::Reference;
use crate::RegistryConfig;
use crate::RegistrySettings;
use crate::Store;
use crate::StoreConfig;
use crate::oci;
use crate::oci::Descriptor;
use crate::oci::MEDIA_TYPE_EMPTY;
use crate::oci::MEDIA_TYPE_IMAGE_INDEX;
use crate::oci::MEDIA_TYPE_IMAGE_MANIFEST;
use crate::oci::MEDIA_TYPE_WASM_LAYER;
use crate::oci::Manifest;
use crate::oci::MemoryStore;
use crate::oci::Target;
use crate::oci::digest;
use crate::reference::DEFAULT_TAG;

fn reference(input: &str) -> Reference {
    Reference::parse(input).unwrap()
}

// --- References ---

#[test]
fn test_registry_reference_components() {
    let r = reference("registry://localhost:5000/team/app:v1");
    assert_eq!(r.scheme(), "registry");
    assert_eq!(r.host(), "localhost");
    assert_eq!(r.port(), Some(5000));
    assert_eq!(r.authority(), "localhost:5000");
    assert_eq!(r.repository(), "team/app");
    assert_eq!(r.tag(), Some("v1"));
    assert_eq!(r.digest(), None);
    assert_eq!(r.reference_or_default(), "v1");
}

#[test]
fn test_registry_reference_without_tag_defaults_to_latest() {
    let r = reference("registry://registry.example.com/team/app");
    assert_eq!(r.port(), None);
    assert_eq!(r.authority(), "registry.example.com");
    assert_eq!(r.repository(), "team/app");
    assert_eq!(r.tag(), None);
    assert_eq!(r.reference_or_default(), DEFAULT_TAG);
}

#[test]
fn test_registry_reference_with_digest() {
    let digest = digest::sha256(b"coucou");
    let r = reference(&format!("oci://localhost:5000/team/app@{}", digest));
    assert_eq!(r.repository(), "team/app");
    assert_eq!(r.tag(), None);
    assert_eq!(r.digest(), Some(digest.as_str()));
    assert_eq!(r.reference_or_default(), digest);
}

#[test]
fn test_colon_in_earlier_segment_is_not_a_tag() {
    let r = reference("registry://localhost/team:x/app");
    assert_eq!(r.repository(), "team:x/app");
    assert_eq!(r.tag(), None);
}

#[test]
fn test_file_reference_paths() {
    let absolute = reference("file:///var/lib/dawg/gen.wasm");
    assert_eq!(absolute.host(), "");
    assert_eq!(
        absolute.to_file_path().unwrap(),
        std::path::PathBuf::from("/var/lib/dawg/gen.wasm")
    );

    let relative = reference("file://gens/gen.wasm");
    assert_eq!(
        relative.to_file_path().unwrap(),
        std::path::PathBuf::from("gens").join("gen.wasm")
    );
}

#[test]
fn test_file_reference_keeps_host_case_and_decodes_path() {
    let r = reference("file://Gens/my%20app.wasm");
    assert_eq!(
        r.to_file_path().unwrap(),
        std::path::PathBuf::from("Gens").join("my app.wasm")
    );

    let nested = reference("file://Team/Dashboards/caf%C3%A9.wasm");
    assert_eq!(
        nested.to_file_path().unwrap(),
        std::path::PathBuf::from("Team").join("Dashboards/café.wasm")
    );

    let invalid = reference("file://gens/%FF.wasm");
    assert!(matches!(invalid.to_file_path(), Err(Error::InvalidReference(_))));
}

#[test]
fn test_unparseable_reference() {
    let err = Reference::parse("no scheme here").unwrap_err();
    assert!(matches!(err, Error::InvalidReference(_)));
}

#[test]
fn test_reference_display_round_trips() {
    let input = "registry://localhost:5000/team/app:v1";
    let r: Reference = input.parse().unwrap();
    assert_eq!(r.to_string(), input);
}

// --- Settings ---

#[test]
fn test_settings_default_to_secure() {
    let config = RegistryConfig::default();
    assert!(!config.settings_for("localhost", Some(5000)).plain_http);
    assert!(config.timeout().is_none());
}

#[test]
fn test_settings_lookup_order() {
    let mut config = RegistryConfig::default()
        .allow_plain_http("localhost")
        .allow_plain_http("127.0.0.1:5000");
    config
        .hosts
        .insert("localhost:6000".into(), RegistrySettings { plain_http: false });

    assert!(config.settings_for("localhost", None).plain_http);
    assert!(config.settings_for("localhost", Some(5000)).plain_http);
    assert!(!config.settings_for("localhost", Some(6000)).plain_http);
    assert!(config.settings_for("127.0.0.1", Some(5000)).plain_http);
    assert!(!config.settings_for("127.0.0.1", Some(5001)).plain_http);
    assert!(!config.settings_for("registry.example.com", None).plain_http);
}

#[test]
fn test_settings_deserialize() {
    let config: StoreConfig = serde_json::from_str(
        r#"{"registry": {"timeout_ms": 2500, "hosts": {"localhost:5000": {"plain_http": true}}}}"#,
    )
    .unwrap();
    assert_eq!(
        config.registry.timeout(),
        Some(std::time::Duration::from_millis(2500))
    );
    assert!(config.registry.settings_for("localhost", Some(5000)).plain_http);
    assert!(!config.registry.default.plain_http);
}

// --- Digests and manifests ---

#[test]
fn test_sha256_format() {
    // sha256("") is well known.
    assert_eq!(
        digest::sha256(b""),
        "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert!(digest::is_digest(&digest::sha256(b"x")));
    assert!(!digest::is_digest("v1"));
}

#[test]
fn test_verify_rejects_mismatches() {
    let desc = Descriptor::from_content(MEDIA_TYPE_WASM_LAYER, b"coucou");
    assert!(digest::verify(&desc, b"coucou").is_ok());

    let err = digest::verify(&desc, b"hello!").unwrap_err();
    assert!(matches!(err, Error::DigestMismatch { .. }));

    let mut wrong_size = desc.clone();
    wrong_size.size = 1;
    let err = digest::verify(&wrong_size, b"coucou").unwrap_err();
    assert!(matches!(err, Error::SizeMismatch { expected: 1, actual: 6 }));

    let mut md5 = desc;
    md5.digest = "md5:abc".into();
    let err = digest::verify(&md5, b"coucou").unwrap_err();
    assert!(matches!(err, Error::UnsupportedDigest(_)));
}

#[test]
fn test_empty_config_descriptor() {
    let config = Descriptor::empty_config();
    assert_eq!(config.media_type, MEDIA_TYPE_EMPTY);
    assert_eq!(config.size, 2);
    assert_eq!(config.digest, digest::sha256(b"{}"));
    assert_eq!(config.data.as_deref(), Some("e30="));
}

#[test]
fn test_artifact_manifest_encoding() {
    let layer = Descriptor::from_content(MEDIA_TYPE_WASM_LAYER, b"\0asm");
    let manifest = Manifest::artifact("application/vnd.dawg.generator.v1", vec![layer.clone()]);
    let (desc, content) = manifest.encode().unwrap();

    assert_eq!(desc.media_type, MEDIA_TYPE_IMAGE_MANIFEST);
    assert_eq!(desc.digest, digest::sha256(&content));

    let json: serde_json::Value = serde_json::from_slice(&content).unwrap();
    assert_eq!(json["schemaVersion"], 2);
    assert_eq!(json["artifactType"], "application/vnd.dawg.generator.v1");
    assert_eq!(json["config"]["mediaType"], MEDIA_TYPE_EMPTY);
    assert_eq!(json["layers"][0]["mediaType"], MEDIA_TYPE_WASM_LAYER);
    assert_eq!(json["layers"][0]["digest"], layer.digest.as_str());
    assert!(json.get("subject").is_none());
}

#[test]
fn test_successors() {
    let layer = Descriptor::from_content(MEDIA_TYPE_WASM_LAYER, b"\0asm");
    let (desc, content) = Manifest::artifact("x", vec![layer.clone()]).encode().unwrap();

    let nodes = oci::successors(&desc, &content).unwrap();
    assert_eq!(nodes, vec![Descriptor::empty_config(), layer.clone()]);

    assert!(oci::successors(&layer, b"\0asm").unwrap().is_empty());

    let index = Descriptor::from_content(MEDIA_TYPE_IMAGE_INDEX, b"{}");
    let err = oci::successors(&index, b"{}").unwrap_err();
    assert!(matches!(err, Error::UnsupportedMediaType(_)));
}

// --- Memory store and copy ---

#[tokio::test]
async fn test_memory_store_push_verifies() {
    let store = MemoryStore::new();
    let desc = Descriptor::from_content(MEDIA_TYPE_WASM_LAYER, b"coucou");

    let err = store.push(&desc, b"other".to_vec()).await.unwrap_err();
    assert!(matches!(err, Error::DigestMismatch { .. }));
    assert!(store.is_empty());

    store.push(&desc, b"coucou".to_vec()).await.unwrap();
    assert!(store.exists(&desc).await.unwrap());
    assert_eq!(store.fetch(&desc).await.unwrap(), b"coucou");
}

#[tokio::test]
async fn test_memory_store_tags() {
    let store = MemoryStore::new();
    let layer = Descriptor::from_content(MEDIA_TYPE_WASM_LAYER, b"coucou");

    let err = store.tag(&layer, "v1").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    store.push(&layer, b"coucou".to_vec()).await.unwrap();
    let manifest = oci::pack(&store, "x", vec![layer]).await.unwrap();
    store.tag(&manifest, "v1").await.unwrap();

    assert_eq!(store.resolve("v1").await.unwrap(), manifest);
    assert_eq!(store.resolve(&manifest.digest).await.unwrap(), manifest);
    assert!(matches!(
        store.resolve("v2").await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn test_copy_between_memory_stores() {
    let src = MemoryStore::new();
    let layer = Descriptor::from_content(MEDIA_TYPE_WASM_LAYER, b"coucou");
    src.push(&layer, b"coucou".to_vec()).await.unwrap();
    let manifest = oci::pack(&src, "x", vec![layer.clone()]).await.unwrap();
    src.tag(&manifest, "v1").await.unwrap();

    let dst = MemoryStore::new();
    let copied = oci::copy(&src, "v1", &dst, "stable").await.unwrap();

    assert_eq!(copied, manifest);
    // Config, layer and manifest.
    assert_eq!(dst.len(), 3);
    assert_eq!(dst.resolve("stable").await.unwrap(), manifest);
    assert_eq!(dst.fetch(&layer).await.unwrap(), b"coucou");
}

#[tokio::test]
async fn test_copy_missing_tag() {
    let src = MemoryStore::new();
    let dst = MemoryStore::new();
    let err = oci::copy(&src, "v1", &dst, "v1").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(dst.is_empty());
}

// --- Dispatch ---

#[tokio::test]
async fn test_unsupported_scheme() {
    let store = Store::new(StoreConfig::default()).unwrap();
    let r = reference("ftp://example.com/gen.wasm");

    let err = store.load(&r).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedScheme(ref s) if s == "ftp"));

    let err = store.store(&r, &Generator::new(b"x".to_vec())).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedScheme(_)));
}

#[test]
fn test_default_schemes() {
    let store = Store::new(StoreConfig::default()).unwrap();
    assert_eq!(store.schemes(), vec!["file", "oci", "registry"]);
    assert!(Store::empty().schemes().is_empty());
}

#[tokio::test]
async fn test_store_to_digest_reference_is_rejected() {
    let store = Store::new(StoreConfig::default()).unwrap();
    let r = reference(&format!(
        "registry://localhost:5000/team/app@{}",
        digest::sha256(b"x")
    ));
    let err = store.store(&r, &Generator::new(b"x".to_vec())).await.unwrap_err();
    assert!(matches!(err, Error::InvalidReference(_)));
}

#[tokio::test]
async fn test_registry_reference_needs_host_and_repository() {
    let store = Store::new(StoreConfig::default()).unwrap();

    let err = store.load(&reference("registry:///team/app")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidReference(_)));

    let err = store.load(&reference("registry://localhost:5000/")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidReference(_)));
}

// --- Errors ---

#[test]
fn test_retryable_classification() {
    let server_error = Error::Registry {
        status: 503,
        message: String::new(),
    };
    let throttled = Error::Registry {
        status: 429,
        message: String::new(),
    };
    let denied = Error::Registry {
        status: 403,
        message: String::new(),
    };
    assert!(server_error.is_retryable());
    assert!(throttled.is_retryable());
    assert!(!denied.is_retryable());
    assert!(!Error::NotFound("x".into()).is_retryable());
    assert!(Error::Io(std::io::ErrorKind::TimedOut.into()).is_retryable());
    assert!(!Error::Io(std::io::ErrorKind::PermissionDenied.into()).is_retryable());
    assert!(Error::NoGeneratorLayer("x".into()).is_not_found());
}
