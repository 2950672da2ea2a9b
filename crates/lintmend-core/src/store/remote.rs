//! Remote store transport.
//!
//! [`RemoteTransport`] is the seam between the locator and the wire: the
//! production implementation speaks SSH (SFTP for stat/listing, SCP channels
//! for transfer), tests substitute a directory-backed fake. Sessions are
//! scoped resources; dropping one closes the underlying connection on every
//! exit path.

use crate::config::RemoteConfig;
use crate::error::{LintmendError, Result};
use ssh2::Session;
use std::fmt;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::Path;
use tracing::debug;

/// One open session against the remote store.
///
/// All operations are synchronous and sequential; no retries. A missing
/// remote path is reported as an error the caller may treat as "try the
/// next candidate" rather than as fatal.
pub trait RemoteSession {
    /// Whether a remote path exists.
    fn exists(&mut self, path: &str) -> Result<bool>;

    /// Entry names (not full paths) of a remote directory.
    fn list_dir(&mut self, path: &str) -> Result<Vec<String>>;

    /// Copy a single remote file to a local path.
    fn fetch_file(&mut self, remote: &str, local: &Path) -> Result<()>;

    /// Copy a single local file to a remote path.
    fn upload_file(&mut self, local: &Path, remote: &str) -> Result<()>;

    /// Create a remote directory and any missing parents.
    fn make_dir_all(&mut self, path: &str) -> Result<()>;
}

/// Connection factory for [`RemoteSession`]s.
pub trait RemoteTransport: Send + Sync + fmt::Debug {
    fn connect(&self) -> Result<Box<dyn RemoteSession>>;
}

/// SSH transport speaking to the store host configured in [`RemoteConfig`].
#[derive(Debug, Clone)]
pub struct SshTransport {
    config: RemoteConfig,
}

impl SshTransport {
    pub fn new(config: RemoteConfig) -> Self {
        Self { config }
    }
}

impl RemoteTransport for SshTransport {
    fn connect(&self) -> Result<Box<dyn RemoteSession>> {
        let addr = (self.config.host.as_str(), self.config.port);
        let tcp = TcpStream::connect(addr).map_err(|e| LintmendError::Remote {
            message: format!(
                "tcp connect to {}:{}: {e}",
                self.config.host, self.config.port
            ),
            source: None,
        })?;

        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.handshake()?;
        session.userauth_password(&self.config.username, &self.config.password)?;

        let sftp = session.sftp()?;
        debug!(
            "Opened store session to {}@{}",
            self.config.username, self.config.host
        );
        Ok(Box::new(SshSession { session, sftp }))
    }
}

struct SshSession {
    session: Session,
    sftp: ssh2::Sftp,
}

impl RemoteSession for SshSession {
    fn exists(&mut self, path: &str) -> Result<bool> {
        // Any stat failure counts as "not there"; connection-level problems
        // will resurface on the next real operation.
        Ok(self.sftp.stat(Path::new(path)).is_ok())
    }

    fn list_dir(&mut self, path: &str) -> Result<Vec<String>> {
        let entries = self
            .sftp
            .readdir(Path::new(path))
            .map_err(|e| LintmendError::Remote {
                message: format!("listing {path}: {e}"),
                source: Some(e),
            })?;

        Ok(entries
            .into_iter()
            .filter_map(|(entry_path, _stat)| {
                entry_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .collect())
    }

    fn fetch_file(&mut self, remote: &str, local: &Path) -> Result<()> {
        let (mut channel, _stat) =
            self.session
                .scp_recv(Path::new(remote))
                .map_err(|e| match e.code() {
                    ssh2::ErrorCode::Session(-28) => {
                        // LIBSSH2_ERROR_SCP_PROTOCOL: the path is missing
                        LintmendError::RemoteNotFound(remote.to_string())
                    }
                    _ => LintmendError::Remote {
                        message: format!("fetching {remote}: {e}"),
                        source: Some(e),
                    },
                })?;

        let mut contents = Vec::new();
        channel
            .read_to_end(&mut contents)
            .map_err(|e| LintmendError::Remote {
                message: format!("reading {remote}: {e}"),
                source: None,
            })?;
        channel.send_eof()?;
        channel.wait_eof()?;
        channel.wait_close()?;

        fs::write(local, contents).map_err(|e| LintmendError::io_with_path(e, local))
    }

    fn upload_file(&mut self, local: &Path, remote: &str) -> Result<()> {
        let contents = fs::read(local).map_err(|e| LintmendError::io_with_path(e, local))?;

        let mut channel = self.session.scp_send(
            Path::new(remote),
            0o644,
            contents.len() as u64,
            None,
        )?;
        channel
            .write_all(&contents)
            .map_err(|e| LintmendError::Remote {
                message: format!("uploading to {remote}: {e}"),
                source: None,
            })?;
        channel.send_eof()?;
        channel.wait_eof()?;
        channel.wait_close()?;
        Ok(())
    }

    fn make_dir_all(&mut self, path: &str) -> Result<()> {
        let mut prefix = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            prefix.push('/');
            prefix.push_str(segment);
            if self.sftp.stat(Path::new(&prefix)).is_err() {
                self.sftp
                    .mkdir(Path::new(&prefix), 0o755)
                    .map_err(|e| LintmendError::Remote {
                        message: format!("mkdir {prefix}: {e}"),
                        source: Some(e),
                    })?;
            }
        }
        Ok(())
    }
}
