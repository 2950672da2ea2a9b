//! External checkstyle invocation.

use crate::checkstyle::report::{parse_report, sanitize_output, Report, ReportFilter};
use crate::command::{format_command, CommandRunner, DefaultCommandRunner};
use crate::config::CheckstyleConfig;
use crate::error::{LintmendError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a checkstyle run.
#[derive(Debug)]
pub struct CheckResult {
    pub report: Report,
    /// Raw exit code; checkstyle exits nonzero when it finds violations at
    /// error severity, so nonzero does not mean the run failed.
    pub exit_code: i32,
}

/// Runs the checkstyle jar over target paths and parses its XML report.
#[derive(Debug)]
pub struct CheckstyleRunner {
    config: CheckstyleConfig,
    runner: Arc<dyn CommandRunner>,
}

impl CheckstyleRunner {
    pub fn new(config: CheckstyleConfig) -> Self {
        Self::with_runner(config, Arc::new(DefaultCommandRunner))
    }

    pub fn with_runner(config: CheckstyleConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Run `java -jar <checkstyle> -f xml -c <rules> <targets...>` and parse
    /// the report.
    pub fn check(
        &self,
        rules: &Path,
        targets: &[PathBuf],
        filter: ReportFilter,
    ) -> Result<CheckResult> {
        let mut args = vec![
            "-jar".to_string(),
            self.config.jar_path.display().to_string(),
            "-f".to_string(),
            "xml".to_string(),
            "-c".to_string(),
            rules.display().to_string(),
        ];
        args.extend(targets.iter().map(|t| t.display().to_string()));

        debug!("Running {}", format_command(&self.config.java_path, &args));
        let output = self
            .runner
            .run(&self.config.java_path, &args)
            .map_err(|e| LintmendError::CheckstyleFailed {
                message: e.to_string(),
            })?;

        let xml = if output.code == 0 {
            output.stdout.clone()
        } else {
            // Checkstyle appends non-XML noise after the report when it
            // exits nonzero; keep everything up to the last closing tag.
            warn!("Checkstyle exited with status {}", output.code);
            sanitize_output(&output.stdout)
                .ok_or_else(|| LintmendError::CheckstyleFailed {
                    message: format!(
                        "no XML report in output (exit status {}): {}",
                        output.code,
                        output.stderr.trim()
                    ),
                })?
                .to_string()
        };

        let report = parse_report(&xml, filter)?;
        Ok(CheckResult {
            report,
            exit_code: output.code,
        })
    }
}
