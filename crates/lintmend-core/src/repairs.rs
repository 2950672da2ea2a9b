//! Collection of diff-based repair datasets.
//!
//! A repair experiment leaves two trees behind: the dataset directory of
//! numbered error cases (each with a `metadata.json` naming the original
//! file and its violations) and a repaired-files directory with matching
//! numbered subdirectories. Collection pairs them up and emits one diff per
//! repaired case.

use crate::diff;
use crate::error::{LintmendError, Result};
use crate::metadata::{read_json, write_json_atomic};
use crate::config::ProjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Violations recorded for one numbered error case.
///
/// The error records are carried through opaquely; their shape belongs to
/// whatever produced the dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMetadata {
    pub file_name: String,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

/// One collected repair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairEntry {
    pub errors: Vec<serde_json::Value>,
    /// Original file path relative to the project checkout.
    pub relative_path: String,
    /// Unified diff from the original file to its repaired version.
    pub diff: String,
}

/// Pairs repaired files with their originals and produces the dataset.
#[derive(Debug, Clone)]
pub struct RepairCollector {
    /// Numbered error-case directories, each holding `metadata.json`.
    dataset_dir: PathBuf,
    /// Numbered repaired-file directories.
    repaired_dir: PathBuf,
}

impl RepairCollector {
    pub fn new(dataset_dir: impl Into<PathBuf>, repaired_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset_dir: dataset_dir.into(),
            repaired_dir: repaired_dir.into(),
        }
    }

    /// Collect every repaired case that has a counterpart in the dataset.
    ///
    /// Per-case failures (missing metadata, unreadable files) are logged and
    /// skipped; they never abort the collection.
    pub fn collect(&self, project: &ProjectId) -> Result<BTreeMap<String, RepairEntry>> {
        let entries = fs::read_dir(&self.repaired_dir)
            .map_err(|e| LintmendError::io_with_path(e, &self.repaired_dir))?;

        let mut results = BTreeMap::new();
        for entry in entries {
            let entry = entry.map_err(|e| LintmendError::io_with_path(e, &self.repaired_dir))?;
            let case_id = entry.file_name().to_string_lossy().into_owned();
            debug!("Found repair dir for error {case_id}");

            if !self.dataset_dir.join(&case_id).exists() {
                continue;
            }

            match self.collect_case(project, &case_id) {
                Ok(repair) => {
                    results.insert(case_id, repair);
                }
                Err(e) => {
                    error!("There was an error while reading the repaired file {case_id}: {e}");
                }
            }
        }

        info!("Collected {} repairs", results.len());
        Ok(results)
    }

    /// Collect and write the dataset as pretty JSON, returning the number of
    /// repairs collected.
    pub fn collect_to(&self, project: &ProjectId, output: &Path) -> Result<usize> {
        let results = self.collect(project)?;
        write_json_atomic(output, &results)?;
        Ok(results.len())
    }

    fn collect_case(&self, project: &ProjectId, case_id: &str) -> Result<RepairEntry> {
        let metadata_path = self.dataset_dir.join(case_id).join("metadata.json");
        let metadata: ErrorMetadata = read_json(&metadata_path)?
            .ok_or_else(|| LintmendError::FileNotFound(metadata_path.clone()))?;

        let original = PathBuf::from(&metadata.file_name);
        let basename = original
            .file_name()
            .ok_or_else(|| LintmendError::Other(format!(
                "metadata for case {case_id} names no file: {}",
                metadata.file_name
            )))?;
        let repaired = self.repaired_dir.join(case_id).join(basename);

        Ok(RepairEntry {
            errors: metadata.errors,
            relative_path: relative_to_project(&metadata.file_name, project),
            diff: diff::unified_diff(&original, &repaired)?,
        })
    }
}

/// Portion of `path` after the last `<user>-<project>/` segment, matching
/// how the datasets embed checkout-absolute paths. Falls back to the full
/// path when the project segment never appears.
fn relative_to_project(path: &str, project: &ProjectId) -> String {
    let needle = format!("{}/", project.slug());
    match path.rsplit_once(&needle) {
        Some((_, rest)) => rest.to_string(),
        None => path.to_string(),
    }
}
