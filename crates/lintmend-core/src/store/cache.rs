//! Local release cache.
//!
//! Layout: `<cache_root>/<user>/<project>/<release>/` where `<release>` is a
//! positive integer. Each release holds the `checkstyle.xml` it was trained
//! against, one or more protocol-prefixed model artifacts, and (when the
//! cache itself populated it) a `manifest.json` completeness record. The
//! cache is populated lazily and never pruned.

use crate::config::{ProjectId, Protocol, StoreConfig};
use crate::diff;
use crate::error::{LintmendError, Result};
use crate::metadata::{read_json, write_json_atomic};
use crate::store::remote::RemoteSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Completeness record written when a release is cached locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub release: u64,
    /// Host the release was fetched from.
    pub source_host: String,
    pub fetched_at: DateTime<Utc>,
    pub files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub size: u64,
    pub sha256: String,
}

/// Filesystem cache of model releases, keyed by (user, project, release).
#[derive(Debug, Clone)]
pub struct ModelCache {
    root: PathBuf,
}

impl ModelCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_dir(&self, project: &ProjectId) -> PathBuf {
        self.root.join(project.user()).join(project.name())
    }

    pub fn release_dir(&self, project: &ProjectId, release: u64) -> PathBuf {
        self.project_dir(project).join(release.to_string())
    }

    /// Cached release ids for a project, most recent first.
    ///
    /// Non-numeric directory names (staging leftovers, strays) are skipped
    /// with a warning, never an error.
    pub fn releases(&self, project: &ProjectId) -> Result<Vec<u64>> {
        let dir = self.project_dir(project);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut releases = Vec::new();
        let entries = fs::read_dir(&dir).map_err(|e| LintmendError::io_with_path(e, &dir))?;
        for entry in entries {
            let entry = entry.map_err(|e| LintmendError::io_with_path(e, &dir))?;
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            match name.parse::<u64>() {
                Ok(release) => releases.push(release),
                Err(_) => {
                    warn!("Ignoring non-release entry {} in {}", name, dir.display());
                }
            }
        }

        releases.sort_unstable_by(|a, b| b.cmp(a));
        Ok(releases)
    }

    /// Most recent cached release whose stored ruleset is diff-identical to
    /// `checkstyle_xml`, returning the first artifact with the protocol
    /// prefix. `None` when no release matches or the matching release has no
    /// artifact for this protocol.
    pub fn cached(
        &self,
        project: &ProjectId,
        protocol: Protocol,
        checkstyle_xml: &Path,
    ) -> Result<Option<PathBuf>> {
        for release in self.releases(project)? {
            let dir = self.release_dir(project, release);

            let stored = dir.join(StoreConfig::CHECKSTYLE_FILE_NAME);
            if !stored.exists() {
                warn!(
                    "Release {} at {} has no {}; skipping",
                    release,
                    dir.display(),
                    StoreConfig::CHECKSTYLE_FILE_NAME
                );
                continue;
            }
            if !self.verify_release(release, &dir) {
                continue;
            }
            if !diff::no_diff(&stored, checkstyle_xml)? {
                continue;
            }

            if let Some(artifact) = find_artifact(&dir, protocol)? {
                debug!(
                    "Release {} matches requested ruleset; artifact {}",
                    release,
                    artifact.display()
                );
                return Ok(Some(artifact));
            }
        }

        Ok(None)
    }

    /// Replace any existing local copy of `release` with the contents of the
    /// remote release directory.
    ///
    /// Files are staged into a sibling temp directory, checked against the
    /// remote listing, recorded in a manifest, and only then swapped into
    /// place, so an interrupted download never becomes a servable release.
    pub fn populate_release(
        &self,
        session: &mut dyn RemoteSession,
        remote_release_path: &str,
        project: &ProjectId,
        release: u64,
        source_host: &str,
    ) -> Result<PathBuf> {
        let project_dir = self.project_dir(project);
        fs::create_dir_all(&project_dir)
            .map_err(|e| LintmendError::io_with_path(e, &project_dir))?;

        let names = session.list_dir(remote_release_path)?;
        debug!("Downloading release {} ({} files)", release, names.len());

        let staging = tempfile::Builder::new()
            .prefix(&format!("{release}.staging."))
            .tempdir_in(&project_dir)
            .map_err(|e| LintmendError::io_with_path(e, &project_dir))?;

        let mut manifest_files = Vec::with_capacity(names.len());
        for name in &names {
            debug!("Downloading {name}");
            let local = staging.path().join(name);
            session.fetch_file(&format!("{remote_release_path}/{name}"), &local)?;

            let size = fs::metadata(&local)
                .map_err(|e| LintmendError::io_with_path(e, &local))?
                .len();
            manifest_files.push(ManifestEntry {
                name: name.clone(),
                size,
                sha256: sha256_file(&local)?,
            });
        }

        let copied = fs::read_dir(staging.path())
            .map_err(|e| LintmendError::io_with_path(e, staging.path()))?
            .count();
        if copied != names.len() {
            return Err(LintmendError::IncompleteRelease {
                release,
                expected: names.len(),
                found: copied,
            });
        }

        let manifest = Manifest {
            release,
            source_host: source_host.to_string(),
            fetched_at: Utc::now(),
            files: manifest_files,
        };
        write_json_atomic(
            &staging.path().join(StoreConfig::MANIFEST_FILE_NAME),
            &manifest,
        )?;

        let final_dir = self.release_dir(project, release);
        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)
                .map_err(|e| LintmendError::io_with_path(e, &final_dir))?;
        }
        fs::rename(staging.path(), &final_dir)
            .map_err(|e| LintmendError::io_with_path(e, &final_dir))?;
        // The staging dir was renamed away; TempDir's cleanup of the stale
        // path is a harmless no-op.
        drop(staging);

        Ok(final_dir)
    }

    /// Projects with at least one entry under the cache root, in slug order.
    ///
    /// Stray directories that don't form a `user/project` pair are skipped
    /// with a warning.
    pub fn projects(&self) -> Result<Vec<ProjectId>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut projects = Vec::new();
        for user_entry in
            fs::read_dir(&self.root).map_err(|e| LintmendError::io_with_path(e, &self.root))?
        {
            let user_entry = user_entry.map_err(|e| LintmendError::io_with_path(e, &self.root))?;
            if !user_entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let user = user_entry.file_name().to_string_lossy().into_owned();

            let user_dir = user_entry.path();
            for project_entry in
                fs::read_dir(&user_dir).map_err(|e| LintmendError::io_with_path(e, &user_dir))?
            {
                let project_entry =
                    project_entry.map_err(|e| LintmendError::io_with_path(e, &user_dir))?;
                if !project_entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    continue;
                }
                let name = project_entry.file_name().to_string_lossy().into_owned();
                match ProjectId::parse(&format!("{user}-{name}")) {
                    Ok(project) => projects.push(project),
                    Err(_) => warn!("Ignoring stray cache entry {user}/{name}"),
                }
            }
        }

        projects.sort_by_key(|p| p.slug());
        Ok(projects)
    }

    /// Total bytes of every file under a cached release.
    pub fn release_size(&self, project: &ProjectId, release: u64) -> Result<u64> {
        let dir = self.release_dir(project, release);

        let mut total = 0u64;
        for entry in walkdir::WalkDir::new(&dir) {
            let entry = entry.map_err(|e| LintmendError::Io {
                message: e.to_string(),
                path: Some(dir.clone()),
                source: e.into_io_error(),
            })?;
            if entry.file_type().is_file() {
                let meta = entry
                    .metadata()
                    .map_err(|e| LintmendError::Other(e.to_string()))?;
                total += meta.len();
            }
        }
        Ok(total)
    }

    /// Remove every cached release of a project. The cache is never pruned
    /// automatically; this is the explicit path.
    pub fn remove_project(&self, project: &ProjectId) -> Result<()> {
        let dir = self.project_dir(project);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| LintmendError::io_with_path(e, &dir))?;
        }
        Ok(())
    }

    /// Validate a release against its manifest, when one is present.
    /// Manifest-less (hand-seeded) releases are accepted as-is.
    fn verify_release(&self, release: u64, dir: &Path) -> bool {
        let manifest_path = dir.join(StoreConfig::MANIFEST_FILE_NAME);
        let manifest: Manifest = match read_json(&manifest_path) {
            Ok(Some(m)) => m,
            Ok(None) => return true,
            Err(e) => {
                warn!("Release {} has an unreadable manifest: {e}; skipping", release);
                return false;
            }
        };

        for entry in &manifest.files {
            let path = dir.join(&entry.name);
            let size = match fs::metadata(&path) {
                Ok(meta) => meta.len(),
                Err(_) => {
                    warn!(
                        "Release {} is missing {} listed in its manifest; skipping",
                        release, entry.name
                    );
                    return false;
                }
            };
            if size != entry.size {
                warn!(
                    "Release {} file {} has size {} but manifest says {}; skipping",
                    release, entry.name, size, entry.size
                );
                return false;
            }
        }
        true
    }
}

/// First artifact in `dir` (by name order) whose filename starts with the
/// protocol prefix.
fn find_artifact(dir: &Path, protocol: Protocol) -> Result<Option<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| LintmendError::io_with_path(e, dir))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LintmendError::io_with_path(e, dir))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(protocol.as_str()) {
            names.push(name);
        }
    }
    names.sort_unstable();

    Ok(names.first().map(|name| dir.join(name)))
}

/// SHA256 of a file's contents as lowercase hex.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).map_err(|e| LintmendError::io_with_path(e, path))?;
    let mut hasher = Sha256::new();

    let mut buffer = vec![0u8; 1024 * 1024];
    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|e| LintmendError::io_with_path(e, path))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
