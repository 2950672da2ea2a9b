//! Training pipeline invocation.
//!
//! When no stored model fits a project's ruleset, an external per-protocol
//! shell script trains one and uploads it to the store. The script is a
//! collaborator, not part of this crate; everything here is invocation and
//! reporting.

use crate::command::{CommandRunner, DefaultCommandRunner};
use crate::config::{ProjectId, Protocol};
use crate::error::{LintmendError, Result};
use crate::store::ModelStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Invokes the external `train_<protocol>_upload.sh` scripts.
#[derive(Debug)]
pub struct TrainingRunner {
    scripts_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl TrainingRunner {
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self::with_runner(scripts_dir, Arc::new(DefaultCommandRunner))
    }

    pub fn with_runner(scripts_dir: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            runner,
        }
    }

    /// Run the training-and-upload script for one protocol, blocking until
    /// it finishes.
    pub fn train(&self, project: &ProjectId, protocol: Protocol) -> Result<()> {
        let script = self
            .scripts_dir
            .join(format!("train_{}_upload.sh", protocol.as_str()));
        if !script.exists() {
            return Err(LintmendError::TrainingFailed {
                project: project.slug(),
                message: format!("training script not found: {}", script.display()),
            });
        }

        info!("Training {protocol} model for {project}");
        let output = self
            .runner
            .run(&script, &[project.slug()])
            .map_err(|e| LintmendError::TrainingFailed {
                project: project.slug(),
                message: e.to_string(),
            })?;

        if !output.success() {
            return Err(LintmendError::TrainingFailed {
                project: project.slug(),
                message: format!("exit status {}: {}", output.code, output.stderr.trim()),
            });
        }
        Ok(())
    }
}

/// Outcome of a locate-or-train pass for one protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutcome {
    /// A compatible model is available at this local path.
    Available(PathBuf),
    /// No stored model matched; training ran and uploaded a new one.
    Trained,
}

/// For each protocol: return the stored model if one fits the ruleset, else
/// train a new one.
pub fn ensure_models(
    store: &ModelStore,
    trainer: &TrainingRunner,
    project: &ProjectId,
    protocols: &[Protocol],
    checkstyle_xml: &Path,
) -> Result<Vec<(Protocol, ModelOutcome)>> {
    let mut outcomes = Vec::with_capacity(protocols.len());
    for &protocol in protocols {
        match store.get_model(project, protocol, checkstyle_xml)? {
            Some(path) => {
                info!("Found model for {project} with protocol {protocol}");
                outcomes.push((protocol, ModelOutcome::Available(path)));
            }
            None => {
                info!(
                    "There is no model for {project} with protocol {protocol} \
                     available for the given ruleset; training one"
                );
                trainer.train(project, protocol)?;
                outcomes.push((protocol, ModelOutcome::Trained));
            }
        }
    }
    Ok(outcomes)
}
