//! Tiered model lookup: local cache first, then the remote store.

use crate::config::{ProjectId, Protocol, RemoteConfig, StoreConfig};
use crate::diff;
use crate::error::{LintmendError, Result};
use crate::store::cache::ModelCache;
use crate::store::remote::{RemoteSession, RemoteTransport, SshTransport};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Locates the most recent model compatible with a checkstyle ruleset,
/// preferring the local cache and falling back to the remote store.
#[derive(Debug)]
pub struct ModelStore {
    cache: ModelCache,
    remote: RemoteConfig,
    transport: Arc<dyn RemoteTransport>,
}

impl ModelStore {
    pub fn new(cache_root: impl Into<PathBuf>, remote: RemoteConfig) -> Self {
        let transport = Arc::new(SshTransport::new(remote.clone()));
        Self::with_transport(cache_root, remote, transport)
    }

    pub fn with_transport(
        cache_root: impl Into<PathBuf>,
        remote: RemoteConfig,
        transport: Arc<dyn RemoteTransport>,
    ) -> Self {
        Self {
            cache: ModelCache::new(cache_root),
            remote,
            transport,
        }
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    /// Path of a project's release tree on the remote host.
    fn remote_project_path(&self, project: &ProjectId) -> String {
        format!(
            "{}/{}/{}",
            self.remote.store_root,
            project.user(),
            project.name()
        )
    }

    /// Most recent model for `project` and `protocol` trained against a
    /// ruleset diff-identical to `checkstyle_xml`.
    ///
    /// Consults the local cache first; on a miss it scans the remote store
    /// newest-release-first, downloads the first compatible release into the
    /// cache, and re-derives the answer from the cache so there is a single
    /// source of truth for "what counts as cached". Remote unavailability
    /// degrades to `Ok(None)`; the caller reads that as "train a new model".
    pub fn get_model(
        &self,
        project: &ProjectId,
        protocol: Protocol,
        checkstyle_xml: &Path,
    ) -> Result<Option<PathBuf>> {
        if let Some(hit) = self.cache.cached(project, protocol, checkstyle_xml)? {
            debug!("Cache hit for {project}/{protocol}: {}", hit.display());
            return Ok(Some(hit));
        }

        let mut session = match self.transport.connect() {
            Ok(session) => session,
            Err(e) => {
                warn!("Remote store unreachable: {e}");
                return Ok(None);
            }
        };

        match session.exists(&self.remote.store_root) {
            Ok(true) => {}
            Ok(false) => {
                debug!(
                    "Store remote location does not exist: {}",
                    self.remote.store_root
                );
                return Ok(None);
            }
            Err(e) => {
                warn!("Cannot stat store root {}: {e}", self.remote.store_root);
                return Ok(None);
            }
        }

        let project_path = self.remote_project_path(project);
        match session.exists(&project_path) {
            Ok(true) => {}
            Ok(false) => {
                debug!("No remote releases for project {project}");
                return Ok(None);
            }
            Err(e) => {
                warn!("Cannot stat {project_path}: {e}");
                return Ok(None);
            }
        }

        let releases = match remote_releases(session.as_mut(), &project_path) {
            Ok(releases) => releases,
            Err(e) => {
                warn!("Cannot list releases under {project_path}: {e}");
                return Ok(None);
            }
        };

        for release in releases {
            let release_path = format!("{project_path}/{release}");

            // Fetch only this release's ruleset to a scratch file; the
            // scratch is dropped before the next candidate is examined.
            let scratch = tempfile::Builder::new()
                .prefix("checkstyle.")
                .suffix(".xml")
                .tempfile()?;
            if let Err(e) = session.fetch_file(
                &format!("{release_path}/{}", StoreConfig::CHECKSTYLE_FILE_NAME),
                scratch.path(),
            ) {
                debug!("Release {release}: no readable ruleset ({e}); skipping");
                continue;
            }
            if !diff::no_diff(scratch.path(), checkstyle_xml)? {
                debug!("Release {release}: ruleset differs; skipping");
                continue;
            }

            let names = match session.list_dir(&release_path) {
                Ok(names) => names,
                Err(e) => {
                    debug!("Release {release}: cannot list contents ({e}); skipping");
                    continue;
                }
            };
            if !names.iter().any(|n| n.starts_with(protocol.as_str())) {
                debug!("Release {release}: no {protocol} artifact; skipping");
                continue;
            }

            info!("Release {release} matches; caching it for {project}");
            return match self.cache.populate_release(
                session.as_mut(),
                &release_path,
                project,
                release,
                &self.remote.host,
            ) {
                Ok(_) => self.cache.cached(project, protocol, checkstyle_xml),
                Err(e) => {
                    warn!("Failed to cache release {release}: {e}");
                    Ok(None)
                }
            };
        }

        debug!("No stored model matches all criteria for project {project}");
        Ok(None)
    }

    /// Upload a trained model and its ruleset as a new release.
    ///
    /// The release id is the current unix timestamp, which keeps release
    /// ordering aligned with upload order. Returns the new release id. The
    /// local cache is not touched; future lookups will fetch the release
    /// back through the normal path.
    pub fn upload_model(
        &self,
        model_path: &Path,
        checkstyle_xml: &Path,
        project: &ProjectId,
    ) -> Result<u64> {
        let model_name = model_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| LintmendError::Config {
                message: format!("model path has no file name: {}", model_path.display()),
            })?;

        let release = u64::try_from(Utc::now().timestamp()).map_err(|_| LintmendError::Config {
            message: "system clock is set before the unix epoch".to_string(),
        })?;

        let mut session = self.transport.connect()?;
        let release_path = format!("{}/{}", self.remote_project_path(project), release);

        debug!("Creating {release_path} on {}", self.remote.host);
        session.make_dir_all(&release_path)?;

        info!(
            "Uploading {} to {}:{release_path}",
            model_path.display(),
            self.remote.host
        );
        session.upload_file(model_path, &format!("{release_path}/{model_name}"))?;
        session.upload_file(
            checkstyle_xml,
            &format!("{release_path}/{}", StoreConfig::CHECKSTYLE_FILE_NAME),
        )?;

        Ok(release)
    }
}

/// Remote release ids under `project_path`, most recent first. Non-numeric
/// entries are skipped with a warning.
fn remote_releases(session: &mut dyn RemoteSession, project_path: &str) -> Result<Vec<u64>> {
    let names = session.list_dir(project_path)?;

    let mut releases = Vec::with_capacity(names.len());
    for name in names {
        match name.parse::<u64>() {
            Ok(release) => releases.push(release),
            Err(_) => warn!("Ignoring non-release entry {name} in {project_path}"),
        }
    }

    releases.sort_unstable_by(|a, b| b.cmp(a));
    Ok(releases)
}
