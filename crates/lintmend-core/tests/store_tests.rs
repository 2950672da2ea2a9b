//! Integration tests for the tiered model lookup.
//!
//! The remote store is faked with a transport backed by a local directory
//! tree, so the full lookup (cache miss, remote scan, download, cache hit)
//! runs without a network.

use lintmend::{
    LintmendError, ModelStore, ProjectId, Protocol, RemoteConfig, RemoteSession, RemoteTransport,
    Result, StoreConfig,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Transport whose "remote host" is a local directory.
#[derive(Debug)]
struct DirTransport {
    host_root: PathBuf,
    connects: AtomicUsize,
    fail_connect: bool,
}

impl DirTransport {
    fn new(host_root: impl Into<PathBuf>) -> Self {
        Self {
            host_root: host_root.into(),
            connects: AtomicUsize::new(0),
            fail_connect: false,
        }
    }

    fn unreachable(host_root: impl Into<PathBuf>) -> Self {
        Self {
            host_root: host_root.into(),
            connects: AtomicUsize::new(0),
            fail_connect: true,
        }
    }

    fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl RemoteTransport for DirTransport {
    fn connect(&self) -> Result<Box<dyn RemoteSession>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(LintmendError::Remote {
                message: "connection refused".to_string(),
                source: None,
            });
        }
        Ok(Box::new(DirSession {
            host_root: self.host_root.clone(),
        }))
    }
}

struct DirSession {
    host_root: PathBuf,
}

impl DirSession {
    fn resolve(&self, path: &str) -> PathBuf {
        self.host_root.join(path.trim_start_matches('/'))
    }
}

impl RemoteSession for DirSession {
    fn exists(&mut self, path: &str) -> Result<bool> {
        Ok(self.resolve(path).exists())
    }

    fn list_dir(&mut self, path: &str) -> Result<Vec<String>> {
        let dir = self.resolve(path);
        let entries = fs::read_dir(&dir).map_err(|e| LintmendError::Remote {
            message: format!("listing {path}: {e}"),
            source: None,
        })?;
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort_unstable();
        Ok(names)
    }

    fn fetch_file(&mut self, remote: &str, local: &Path) -> Result<()> {
        let source = self.resolve(remote);
        if !source.is_file() {
            return Err(LintmendError::RemoteNotFound(remote.to_string()));
        }
        fs::copy(&source, local).map_err(|e| LintmendError::io_with_path(e, local))?;
        Ok(())
    }

    fn upload_file(&mut self, local: &Path, remote: &str) -> Result<()> {
        let dest = self.resolve(remote);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| LintmendError::io_with_path(e, parent))?;
        }
        fs::copy(local, &dest).map_err(|e| LintmendError::io_with_path(e, &dest))?;
        Ok(())
    }

    fn make_dir_all(&mut self, path: &str) -> Result<()> {
        let dir = self.resolve(path);
        fs::create_dir_all(&dir).map_err(|e| LintmendError::io_with_path(e, &dir))?;
        Ok(())
    }
}

const STORE_ROOT: &str = "/srv/models";
const MATCHING_RULES: &str = "<module name=\"Checker\"/>\n";
const OTHER_RULES: &str = "<module name=\"TreeWalker\"/>\n";

struct Fixture {
    tmp: TempDir,
    cache_root: PathBuf,
    host_root: PathBuf,
    rules: PathBuf,
    project: ProjectId,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let cache_root = tmp.path().join("cache");
        let host_root = tmp.path().join("remote-host");
        fs::create_dir_all(&cache_root).unwrap();
        fs::create_dir_all(host_root.join("srv/models")).unwrap();

        let rules = tmp.path().join("checkstyle.xml");
        fs::write(&rules, MATCHING_RULES).unwrap();

        Self {
            tmp,
            cache_root,
            host_root,
            rules,
            project: ProjectId::parse("alice-demo").unwrap(),
        }
    }

    fn remote_config(&self) -> RemoteConfig {
        RemoteConfig {
            host: "store.example.org".to_string(),
            port: 22,
            username: "alice".to_string(),
            password: "secret".to_string(),
            store_root: STORE_ROOT.to_string(),
        }
    }

    /// Seed a release on the fake remote host.
    fn seed_remote_release(&self, release: u64, rules: &str, artifacts: &[&str]) {
        let dir = self
            .host_root
            .join("srv/models/alice/demo")
            .join(release.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(StoreConfig::CHECKSTYLE_FILE_NAME), rules).unwrap();
        for artifact in artifacts {
            fs::write(dir.join(artifact), format!("weights of {artifact}")).unwrap();
        }
    }

    fn store_with(&self, transport: Arc<DirTransport>) -> ModelStore {
        ModelStore::with_transport(&self.cache_root, self.remote_config(), transport)
    }

    fn transport(&self) -> Arc<DirTransport> {
        Arc::new(DirTransport::new(&self.host_root))
    }
}

#[test]
fn end_to_end_lookup_populates_cache_and_returns_artifact() {
    let fx = Fixture::new();
    fx.seed_remote_release(7, MATCHING_RULES, &["three_grams-v1.bin"]);

    let transport = fx.transport();
    let store = fx.store_with(transport.clone());

    let model = store
        .get_model(&fx.project, Protocol::ThreeGrams, &fx.rules)
        .unwrap()
        .expect("expected a model");

    let expected_dir = fx.cache_root.join("alice/demo/7");
    assert_eq!(model, expected_dir.join("three_grams-v1.bin"));
    assert!(model.is_file());
    assert!(expected_dir.join(StoreConfig::CHECKSTYLE_FILE_NAME).is_file());
    assert!(expected_dir.join(StoreConfig::MANIFEST_FILE_NAME).is_file());
    assert_eq!(transport.connect_count(), 1);
}

#[test]
fn second_lookup_hits_cache_without_opening_a_session() {
    let fx = Fixture::new();
    fx.seed_remote_release(7, MATCHING_RULES, &["three_grams-v1.bin"]);

    let transport = fx.transport();
    let store = fx.store_with(transport.clone());

    let first = store
        .get_model(&fx.project, Protocol::ThreeGrams, &fx.rules)
        .unwrap()
        .unwrap();
    assert_eq!(transport.connect_count(), 1);

    let second = store
        .get_model(&fx.project, Protocol::ThreeGrams, &fx.rules)
        .unwrap()
        .unwrap();
    assert_eq!(second, first);
    assert_eq!(transport.connect_count(), 1, "cache hit must not reconnect");
}

#[test]
fn releases_are_examined_newest_first() {
    let fx = Fixture::new();
    // Directory-listing order is [1, 2, 3]; the scan must still pick 3
    for release in [3u64, 1, 2] {
        fx.seed_remote_release(release, MATCHING_RULES, &["random-v1.bin"]);
    }

    let store = fx.store_with(fx.transport());
    let model = store
        .get_model(&fx.project, Protocol::Random, &fx.rules)
        .unwrap()
        .unwrap();
    assert_eq!(model, fx.cache_root.join("alice/demo/3/random-v1.bin"));
}

#[test]
fn most_recent_compatible_release_wins_and_older_ones_are_not_fetched() {
    let fx = Fixture::new();
    fx.seed_remote_release(5, OTHER_RULES, &["three_grams-v1.bin"]);
    fx.seed_remote_release(4, MATCHING_RULES, &["three_grams-v1.bin"]);
    fx.seed_remote_release(3, MATCHING_RULES, &["three_grams-v1.bin"]);

    let store = fx.store_with(fx.transport());
    let model = store
        .get_model(&fx.project, Protocol::ThreeGrams, &fx.rules)
        .unwrap()
        .unwrap();

    assert_eq!(model, fx.cache_root.join("alice/demo/4/three_grams-v1.bin"));
    // Release 3 is configuration-identical but must never be inspected,
    // let alone downloaded
    assert!(!fx.cache_root.join("alice/demo/3").exists());
    assert!(!fx.cache_root.join("alice/demo/5").exists());
}

#[test]
fn matching_release_without_protocol_artifact_continues_older() {
    let fx = Fixture::new();
    fx.seed_remote_release(6, MATCHING_RULES, &["random-v1.bin"]);
    fx.seed_remote_release(2, MATCHING_RULES, &["three_grams-v1.bin"]);

    let store = fx.store_with(fx.transport());
    let model = store
        .get_model(&fx.project, Protocol::ThreeGrams, &fx.rules)
        .unwrap()
        .unwrap();
    assert_eq!(model, fx.cache_root.join("alice/demo/2/three_grams-v1.bin"));
}

#[test]
fn no_matching_release_anywhere_returns_none() {
    let fx = Fixture::new();
    fx.seed_remote_release(5, OTHER_RULES, &["three_grams-v1.bin"]);

    let store = fx.store_with(fx.transport());
    let model = store
        .get_model(&fx.project, Protocol::ThreeGrams, &fx.rules)
        .unwrap();
    assert!(model.is_none());
}

#[test]
fn unreachable_remote_degrades_to_none() {
    let fx = Fixture::new();
    let transport = Arc::new(DirTransport::unreachable(&fx.host_root));
    let store = fx.store_with(transport);

    let model = store
        .get_model(&fx.project, Protocol::Random, &fx.rules)
        .unwrap();
    assert!(model.is_none());
}

#[test]
fn missing_store_root_degrades_to_none() {
    let fx = Fixture::new();
    let config = RemoteConfig {
        store_root: "/srv/absent".to_string(),
        ..fx.remote_config()
    };
    let store = ModelStore::with_transport(&fx.cache_root, config, fx.transport());

    let model = store
        .get_model(&fx.project, Protocol::Random, &fx.rules)
        .unwrap();
    assert!(model.is_none());
}

#[test]
fn unknown_project_degrades_to_none() {
    let fx = Fixture::new();
    let store = fx.store_with(fx.transport());
    let other = ProjectId::parse("bob-widget").unwrap();

    let model = store.get_model(&other, Protocol::Random, &fx.rules).unwrap();
    assert!(model.is_none());
}

#[test]
fn non_numeric_remote_entries_are_skipped() {
    let fx = Fixture::new();
    fx.seed_remote_release(1, MATCHING_RULES, &["random-v1.bin"]);
    fs::create_dir_all(fx.host_root.join("srv/models/alice/demo/notes")).unwrap();

    let store = fx.store_with(fx.transport());
    let model = store
        .get_model(&fx.project, Protocol::Random, &fx.rules)
        .unwrap()
        .unwrap();
    assert_eq!(model, fx.cache_root.join("alice/demo/1/random-v1.bin"));
}

#[test]
fn populate_overwrites_stale_local_release() {
    let fx = Fixture::new();
    fx.seed_remote_release(7, MATCHING_RULES, &["random-v2.bin"]);

    // A stale local copy of release 7 with a different ruleset and an
    // artifact that no longer exists upstream
    let stale = fx.cache_root.join("alice/demo/7");
    fs::create_dir_all(&stale).unwrap();
    fs::write(stale.join(StoreConfig::CHECKSTYLE_FILE_NAME), OTHER_RULES).unwrap();
    fs::write(stale.join("random-v1.bin"), b"old").unwrap();

    let store = fx.store_with(fx.transport());
    let model = store
        .get_model(&fx.project, Protocol::Random, &fx.rules)
        .unwrap()
        .unwrap();

    assert_eq!(model, stale.join("random-v2.bin"));
    assert!(!stale.join("random-v1.bin").exists(), "overwrite, not merge");
}

#[test]
fn upload_creates_release_layout_on_remote() {
    let fx = Fixture::new();
    let model_path = fx.tmp.path().join("three_grams-v9.bin");
    fs::write(&model_path, b"fresh weights").unwrap();

    let store = fx.store_with(fx.transport());
    let release = store
        .upload_model(&model_path, &fx.rules, &fx.project)
        .unwrap();

    let remote_dir = fx
        .host_root
        .join("srv/models/alice/demo")
        .join(release.to_string());
    assert!(remote_dir.join("three_grams-v9.bin").is_file());
    assert!(remote_dir.join(StoreConfig::CHECKSTYLE_FILE_NAME).is_file());
    assert_eq!(
        fs::read_to_string(remote_dir.join(StoreConfig::CHECKSTYLE_FILE_NAME)).unwrap(),
        MATCHING_RULES
    );
}

#[test]
fn uploaded_release_is_found_by_a_later_lookup() {
    let fx = Fixture::new();
    let model_path = fx.tmp.path().join("three_grams-v9.bin");
    fs::write(&model_path, b"fresh weights").unwrap();

    let store = fx.store_with(fx.transport());
    let release = store
        .upload_model(&model_path, &fx.rules, &fx.project)
        .unwrap();

    let found = store
        .get_model(&fx.project, Protocol::ThreeGrams, &fx.rules)
        .unwrap()
        .unwrap();
    assert_eq!(
        found,
        fx.cache_root
            .join("alice/demo")
            .join(release.to_string())
            .join("three_grams-v9.bin")
    );
}
