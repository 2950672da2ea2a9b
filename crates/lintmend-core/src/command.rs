//! External command execution behind a swappable runner.
//!
//! Both the checkstyle jar and the training scripts run through
//! [`CommandRunner`], so tests can substitute canned output for the real
//! processes.

use std::fmt;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

/// Captured output from a command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; -1 when the process was terminated by a signal.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

pub trait CommandRunner: Send + Sync + fmt::Debug {
    fn run(&self, program: &Path, args: &[String]) -> io::Result<CommandOutput>;
}

/// Runs the program synchronously, capturing stdout and stderr.
#[derive(Debug, Clone, Default)]
pub struct DefaultCommandRunner;

impl CommandRunner for DefaultCommandRunner {
    fn run(&self, program: &Path, args: &[String]) -> io::Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| {
                io::Error::new(
                    err.kind(),
                    format!("failed to spawn `{}`: {err}", format_command(program, args)),
                )
            })?;

        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Render a command line for log and error messages.
pub fn format_command(program: &Path, args: &[String]) -> String {
    let mut s = program.display().to_string();
    for arg in args {
        s.push(' ');
        s.push_str(arg);
    }
    s
}
