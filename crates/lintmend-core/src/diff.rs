//! Line-based unified diff between two files.
//!
//! The comparison is strict: order-sensitive, whitespace-sensitive, no
//! normalization beyond line splitting. Two checkstyle rulesets count as the
//! same configuration only when their diff is empty.

use crate::error::{LintmendError, Result};
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::Path;

/// Produce a unified diff between the contents of two files.
pub fn unified_diff(old: &Path, new: &Path) -> Result<String> {
    let old_content = read(old)?;
    let new_content = read(new)?;

    let diff = TextDiff::from_lines(&old_content, &new_content);
    let mut unified = diff.unified_diff();
    unified.header(&old.display().to_string(), &new.display().to_string());

    if diff
        .iter_all_changes()
        .all(|change| change.tag() == ChangeTag::Equal)
    {
        return Ok(String::new());
    }
    Ok(unified.to_string())
}

/// True iff the two files have identical line content.
pub fn no_diff(a: &Path, b: &Path) -> Result<bool> {
    let content_a = read(a)?;
    let content_b = read(b)?;

    let diff = TextDiff::from_lines(&content_a, &content_b);
    Ok(diff
        .iter_all_changes()
        .all(|change| change.tag() == ChangeTag::Equal))
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| LintmendError::io_with_path(e, path))
}
