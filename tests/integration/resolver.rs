//! End-to-end resolver tests with in-process collaborators

use async_trait::async_trait;
use proxy_cache::cache::thumbprint::PackageInfo;
use proxy_cache::cache::{CacheLayout, InvalidationAction};
use proxy_cache::config::schema::ProxyConfig;
use proxy_cache::proxy::{
    CodeUnit, Collaborators, GenerationRequest, HostLoader, PackageMetadataProvider,
    ProxyGenerator, ResolutionPath, StaticPackageInfo,
};
use proxy_cache::{ProxyError, ProxyRequest, ProxyResolver, ProxyResult, TypeHandle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const KNOWN_TYPES: &[&str] = &[
    "com.example.Foo",
    "com.example.Baz",
    "com.tns.NativeScriptActivity",
    "android.view.View$OnClickListener",
];

/// Writes the identity as the artifact body and counts invocations
#[derive(Default)]
struct RecordingGenerator {
    calls: AtomicUsize,
    fail_next: AtomicBool,
}

impl RecordingGenerator {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProxyGenerator for RecordingGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest<'_>,
        output: &Path,
    ) -> ProxyResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ProxyError::generation(
                request.identity.as_str(),
                "emitter crashed",
            ));
        }

        tokio::fs::write(output, request.identity.as_str())
            .await
            .map_err(|e| ProxyError::io("writing artifact", e))?;
        Ok(output.to_path_buf())
    }
}

/// Knows a fixed set of host types; defines whatever the code unit names
struct FakeHost {
    known: &'static [&'static str],
    lookups: AtomicUsize,
}

impl FakeHost {
    fn knowing(known: &'static [&'static str]) -> Self {
        Self {
            known,
            lookups: AtomicUsize::new(0),
        }
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostLoader for FakeHost {
    async fn load_by_canonical_name(&self, name: &str) -> ProxyResult<TypeHandle> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.known.contains(&name) {
            Ok(TypeHandle::host(name))
        } else {
            Err(ProxyError::TypeNotFound(name.to_string()))
        }
    }

    async fn define_type(&self, _name: &str, unit: &CodeUnit) -> ProxyResult<TypeHandle> {
        let defined = String::from_utf8_lossy(&unit.code).into_owned();
        Ok(TypeHandle::proxy(defined, unit.container.clone()))
    }
}

struct MissingMetadata;

#[async_trait]
impl PackageMetadataProvider for MissingMetadata {
    async fn current_version_token(&self) -> ProxyResult<PackageInfo> {
        Err(ProxyError::Thumbprint("package record unavailable".to_string()))
    }
}

struct Harness {
    temp: TempDir,
    generator: Arc<RecordingGenerator>,
    host: Arc<FakeHost>,
}

impl Harness {
    fn new() -> Self {
        Self::with_host_types(KNOWN_TYPES)
    }

    fn with_host_types(known: &'static [&'static str]) -> Self {
        Self {
            temp: TempDir::new().unwrap(),
            generator: Arc::new(RecordingGenerator::default()),
            host: Arc::new(FakeHost::knowing(known)),
        }
    }

    fn layout(&self) -> CacheLayout {
        CacheLayout::with_defaults(self.temp.path())
    }

    fn secondary(&self) -> PathBuf {
        self.layout().secondary_dir().to_path_buf()
    }

    fn optimized(&self) -> PathBuf {
        self.layout().optimized_dir().to_path_buf()
    }

    fn seed(&self, files: &[&str], optimized: &[&str]) {
        fs::create_dir_all(self.optimized()).unwrap();
        for name in files {
            fs::write(self.secondary().join(name), name.as_bytes()).unwrap();
        }
        for name in optimized {
            fs::write(self.optimized().join(name), name.as_bytes()).unwrap();
        }
    }

    fn write_marker(&self, thumb: &str) {
        fs::create_dir_all(self.secondary()).unwrap();
        fs::write(self.layout().marker_path(), format!("{}\n", thumb)).unwrap();
    }

    fn marker(&self) -> String {
        fs::read_to_string(self.layout().marker_path()).unwrap()
    }

    async fn resolver(&self, version_code: i64, last_update_time: i64) -> ProxyResolver {
        self.try_resolver(Arc::new(StaticPackageInfo(PackageInfo {
            version_code,
            last_update_time,
        })))
        .await
        .unwrap()
    }

    async fn try_resolver(
        &self,
        metadata: Arc<dyn PackageMetadataProvider>,
    ) -> ProxyResult<ProxyResolver> {
        let collaborators =
            Collaborators::new(self.generator.clone(), self.host.clone(), metadata);
        ProxyResolver::new(self.layout(), ProxyConfig::default(), collaborators).await
    }
}

fn foo_bar() -> ProxyRequest {
    ProxyRequest::new("Bar", "com.example.Foo").with_overrides(["onCreate"])
}

#[tokio::test]
async fn end_to_end_build_layout() {
    let h = Harness::new();
    let resolver = h.resolver(1, 100).await;
    assert_eq!(resolver.thumbprint().as_str(), "100-1");

    let resolution = resolver.resolve_with_path(&foo_bar()).await.unwrap();
    assert_eq!(resolution.path, ResolutionPath::Generated);
    assert_eq!(resolution.handle.name(), "com.example.Foo-Bar");

    let artifact = h.secondary().join("com.example.Foo-Bar-100-1.dex");
    let container = h.secondary().join("com.example.Foo-Bar-100-1.jar");
    let optimized = h.optimized().join("com.example.Foo-Bar-100-1.odex");
    assert_eq!(fs::read_to_string(&artifact).unwrap(), "com.example.Foo-Bar");
    assert!(container.is_file());
    assert!(optimized.is_file());
    assert_eq!(h.marker(), "100-1\n");
    assert_eq!(resolver.cached_identities(), vec!["com.example.Foo-Bar"]);
}

#[tokio::test]
async fn repeated_request_returns_same_handle() {
    let h = Harness::new();
    let resolver = h.resolver(1, 100).await;

    let first = resolver.resolve(&foo_bar()).await.unwrap();
    let again = resolver.resolve_with_path(&foo_bar()).await.unwrap();

    assert!(first.ptr_eq(&again.handle));
    assert_eq!(again.path, ResolutionPath::MemoryHit);
    assert_eq!(h.generator.calls(), 1);
}

#[tokio::test]
async fn override_set_does_not_change_identity() {
    let h = Harness::new();
    let resolver = h.resolver(1, 100).await;

    let first = resolver.resolve(&foo_bar()).await.unwrap();
    let other = ProxyRequest::new("Bar", "com.example.Foo").with_overrides(["onStop"]);
    let second = resolver.resolve(&other).await.unwrap();

    assert!(first.ptr_eq(&second));
    assert_eq!(h.generator.calls(), 1);
}

#[tokio::test]
async fn reserved_base_type_short_circuits() {
    let h = Harness::new();
    let resolver = h.resolver(1, 100).await;
    assert_eq!(h.host.lookups(), 0);

    let request = ProxyRequest::new("Main", "com.tns.NativeScriptActivity");
    let first = resolver.resolve_with_path(&request).await.unwrap();
    let other = ProxyRequest::new("Other", "com.tns.NativeScriptActivity");
    let second = resolver.resolve_with_path(&other).await.unwrap();

    assert_eq!(first.path, ResolutionPath::Reserved);
    assert_eq!(second.path, ResolutionPath::Reserved);
    assert_eq!(first.handle.name(), "com.tns.NativeScriptActivity");
    assert!(first.handle.ptr_eq(&second.handle));
    assert_eq!(h.host.lookups(), 1);
    assert_eq!(h.generator.calls(), 0);
    assert!(!h.secondary().join("com.tns.NativeScriptActivity-Main-100-1.dex").exists());
    assert!(resolver.cached_identities().is_empty());
}

#[tokio::test]
async fn host_without_reserved_type_still_resolves_proxies() {
    let h = Harness::with_host_types(&["com.example.Foo"]);
    let resolver = h.resolver(1, 100).await;
    assert_eq!(h.host.lookups(), 0);

    let handle = resolver.resolve(&foo_bar()).await.unwrap();
    assert_eq!(handle.name(), "com.example.Foo-Bar");
    assert_eq!(h.generator.calls(), 1);

    let reserved = ProxyRequest::new("Main", "com.tns.NativeScriptActivity");
    let err = resolver.resolve(&reserved).await.unwrap_err();
    assert!(matches!(err, ProxyError::TypeNotFound(name) if name == "com.tns.NativeScriptActivity"));
    assert_eq!(h.generator.calls(), 1);
    assert!(!h.secondary().join("com.tns.NativeScriptActivity-Main-100-1.dex").exists());
}

#[tokio::test]
async fn same_thumbprint_leaves_cache_untouched() {
    let h = Harness::new();
    h.write_marker("100-1");
    h.seed(&["a.B-C-100-1.dex", "a.B-C-100-1.jar"], &["a.B-C-100-1.odex"]);

    let resolver = h.resolver(1, 100).await;

    assert_eq!(resolver.invalidation().action, InvalidationAction::Unchanged);
    assert!(resolver.invalidation().report.deleted.is_empty());
    assert_eq!(
        fs::read(h.secondary().join("a.B-C-100-1.dex")).unwrap(),
        b"a.B-C-100-1.dex"
    );
    assert!(h.secondary().join("a.B-C-100-1.jar").exists());
    assert!(h.optimized().join("a.B-C-100-1.odex").exists());
    assert_eq!(h.marker(), "100-1\n");
}

#[tokio::test]
async fn changed_thumbprint_purges_only_stale_files() {
    let h = Harness::new();

    // First run builds under 100-1
    let resolver = h.resolver(1, 100).await;
    resolver.resolve(&foo_bar()).await.unwrap();
    drop(resolver);
    h.seed(&["unrelated.txt", "x.Y-Z-200-2.dex"], &[]);

    // Restart after an update
    let resolver = h.resolver(2, 200).await;

    let outcome = resolver.invalidation();
    assert_eq!(outcome.action, InvalidationAction::Selective);
    assert_eq!(outcome.previous.as_ref().unwrap().as_str(), "100-1");
    assert_eq!(outcome.report.deleted.len(), 3);

    assert!(!h.secondary().join("com.example.Foo-Bar-100-1.dex").exists());
    assert!(!h.secondary().join("com.example.Foo-Bar-100-1.jar").exists());
    assert!(!h.optimized().join("com.example.Foo-Bar-100-1.odex").exists());
    assert!(h.secondary().join("unrelated.txt").exists());
    assert!(h.secondary().join("x.Y-Z-200-2.dex").exists());
    assert!(h.optimized().is_dir());
    assert_eq!(h.marker(), "200-2\n");
}

#[tokio::test]
async fn first_run_purges_everything() {
    let h = Harness::new();
    h.seed(&["leftover.dex", "leftover.jar"], &["leftover.odex"]);

    let resolver = h.resolver(1, 100).await;

    assert_eq!(resolver.invalidation().action, InvalidationAction::Full);
    assert!(resolver.invalidation().previous.is_none());
    assert!(!h.secondary().join("leftover.dex").exists());
    assert!(!h.secondary().join("leftover.jar").exists());
    assert!(!h.optimized().join("leftover.odex").exists());
    assert!(h.secondary().is_dir());
    assert!(h.optimized().is_dir());
    assert_eq!(h.marker(), "100-1\n");
}

#[tokio::test]
async fn proxy_of_proxy_rejected_without_generation() {
    let h = Harness::new();
    let resolver = h.resolver(1, 100).await;

    let request = ProxyRequest::new("Bar", "com.tns.gen.com.tns.gen.com.example.Foo");
    let err = resolver.resolve(&request).await.unwrap_err();

    assert!(matches!(err, ProxyError::InvalidProxy { .. }));
    assert_eq!(h.generator.calls(), 0);
    assert!(resolver.cached_identities().is_empty());
}

#[tokio::test]
async fn single_namespace_prefix_resolves_underlying_base() {
    let h = Harness::new();
    let resolver = h.resolver(1, 100).await;

    let request = ProxyRequest::new("Bar", "com.tns.gen.com.example.Foo");
    let handle = resolver.resolve(&request).await.unwrap();

    assert_eq!(handle.name(), "com.example.Foo-Bar");
}

#[tokio::test]
async fn unknown_base_type_is_not_generated() {
    let h = Harness::new();
    let resolver = h.resolver(1, 100).await;

    let request = ProxyRequest::new("Bar", "com.example.Missing");
    let err = resolver.resolve(&request).await.unwrap_err();

    assert!(matches!(err, ProxyError::TypeNotFound(_)));
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn artifact_on_disk_survives_restart() {
    let h = Harness::new();
    let resolver = h.resolver(1, 100).await;
    resolver.resolve(&foo_bar()).await.unwrap();
    drop(resolver);

    let resolver = h.resolver(1, 100).await;
    let resolution = resolver.resolve_with_path(&foo_bar()).await.unwrap();

    assert_eq!(resolution.path, ResolutionPath::DiskHit);
    assert_eq!(resolution.handle.name(), "com.example.Foo-Bar");
    assert_eq!(h.generator.calls(), 1);
}

#[tokio::test]
async fn failed_generation_is_not_cached() {
    let h = Harness::new();
    let resolver = h.resolver(1, 100).await;
    h.generator.fail_next.store(true, Ordering::SeqCst);

    let err = resolver.resolve(&foo_bar()).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(resolver.cached_identities().is_empty());
    assert!(!h.secondary().join("com.example.Foo-Bar-100-1.dex").exists());

    let resolution = resolver.resolve_with_path(&foo_bar()).await.unwrap();
    assert_eq!(resolution.path, ResolutionPath::Generated);
    assert_eq!(h.generator.calls(), 2);
}

#[tokio::test]
async fn concurrent_requests_build_once() {
    let h = Harness::new();
    let resolver = h.resolver(1, 100).await;

    let request = foo_bar();
    let (a, b) = tokio::join!(resolver.resolve(&request), resolver.resolve(&request));

    assert!(a.unwrap().ptr_eq(&b.unwrap()));
    assert_eq!(h.generator.calls(), 1);
}

#[tokio::test]
async fn distinct_identities_build_independently() {
    let h = Harness::new();
    let resolver = h.resolver(1, 100).await;

    let foo = foo_bar();
    let baz = ProxyRequest::new("Bar", "com.example.Baz");
    let listener = ProxyRequest::new("L", "android.view.View$OnClickListener");
    let (a, b, c) = tokio::join!(
        resolver.resolve(&foo),
        resolver.resolve(&baz),
        resolver.resolve(&listener)
    );

    assert_eq!(a.unwrap().name(), "com.example.Foo-Bar");
    assert_eq!(b.unwrap().name(), "com.example.Baz-Bar");
    assert_eq!(c.unwrap().name(), "android.view.View_OnClickListener-L");
    assert_eq!(h.generator.calls(), 3);
    assert_eq!(resolver.cached_identities().len(), 3);
}

#[tokio::test]
async fn missing_metadata_fails_construction() {
    let h = Harness::new();
    let result = h.try_resolver(Arc::new(MissingMetadata)).await;

    assert!(matches!(result, Err(ProxyError::Thumbprint(_))));
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn find_type_accepts_slash_names() {
    let h = Harness::new();
    let resolver = h.resolver(1, 100).await;

    let handle = resolver.find_type("com/example/Foo").await.unwrap();
    assert_eq!(handle.name(), "com.example.Foo");
}
