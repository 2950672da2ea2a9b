//! Centralized configuration for Lintmend.
//!
//! All tunables are read once at startup and threaded through the
//! components explicitly; nothing below this module touches the process
//! environment.

use crate::error::{LintmendError, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Names and layout constants of the model store.
pub struct StoreConfig;

impl StoreConfig {
    /// Ruleset file present in every release, local or remote.
    pub const CHECKSTYLE_FILE_NAME: &'static str = "checkstyle.xml";
    /// Completeness record written when a release is cached locally.
    pub const MANIFEST_FILE_NAME: &'static str = "manifest.json";
    pub const DEFAULT_SSH_PORT: u16 = 22;
}

/// Environment variables consumed by [`RemoteConfig::from_env`].
pub struct EnvConfig;

impl EnvConfig {
    pub const STORE_HOST: &'static str = "LINTMEND_STORE_HOST";
    pub const STORE_PORT: &'static str = "LINTMEND_STORE_PORT";
    pub const STORE_USER: &'static str = "LINTMEND_STORE_USER";
    pub const STORE_PASSWORD: &'static str = "LINTMEND_STORE_PASSWORD";
    pub const STORE_ROOT: &'static str = "LINTMEND_STORE_ROOT";
}

/// Model-generation strategy, used as a filename prefix to distinguish
/// artifacts within a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Random,
    ThreeGrams,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Random => "random",
            Protocol::ThreeGrams => "three_grams",
        }
    }

    pub fn all() -> [Protocol; 2] {
        [Protocol::Random, Protocol::ThreeGrams]
    }
}

impl FromStr for Protocol {
    type Err = LintmendError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "random" => Ok(Protocol::Random),
            "three_grams" => Ok(Protocol::ThreeGrams),
            other => Err(LintmendError::UnknownProtocol(other.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Project identifier: a `user-project` slug, split at the first dash.
///
/// The user segment never contains a dash; the project segment may.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectId {
    user: String,
    name: String,
}

impl ProjectId {
    /// Parse a `user-project` slug.
    pub fn parse(slug: &str) -> Result<Self> {
        match slug.split_once('-') {
            Some((user, name)) if !user.is_empty() && !name.is_empty() => Ok(Self {
                user: user.to_string(),
                name: name.to_string(),
            }),
            _ => Err(LintmendError::InvalidProjectSlug(slug.to_string())),
        }
    }

    /// Remote-store user segment.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Project segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The original `user-project` form.
    pub fn slug(&self) -> String {
        format!("{}-{}", self.user, self.name)
    }
}

impl FromStr for ProjectId {
    type Err = LintmendError;

    fn from_str(s: &str) -> Result<Self> {
        ProjectId::parse(s)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.user, self.name)
    }
}

/// Checkstyle invocation settings.
#[derive(Debug, Clone)]
pub struct CheckstyleConfig {
    /// Path to the checkstyle all-in-one jar.
    pub jar_path: PathBuf,
    /// Java executable used to run the jar.
    pub java_path: PathBuf,
}

impl CheckstyleConfig {
    pub fn new(jar_path: impl Into<PathBuf>) -> Self {
        Self {
            jar_path: jar_path.into(),
            java_path: PathBuf::from("java"),
        }
    }

    pub fn with_java_path(mut self, java_path: impl Into<PathBuf>) -> Self {
        self.java_path = java_path.into();
        self
    }
}

/// Connection settings for the remote model store, read once at startup.
#[derive(Clone)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Absolute path of the store root on the remote host.
    pub store_root: String,
}

impl RemoteConfig {
    /// Build from the `LINTMEND_STORE_*` environment variables.
    ///
    /// Required only when the remote fallback or the upload path is
    /// exercised; cache-only lookups never need it.
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var(EnvConfig::STORE_PORT) {
            Ok(raw) => raw.parse::<u16>().map_err(|_| LintmendError::Config {
                message: format!("{} is not a valid port: {raw}", EnvConfig::STORE_PORT),
            })?,
            Err(_) => StoreConfig::DEFAULT_SSH_PORT,
        };

        Ok(Self {
            host: require_env(EnvConfig::STORE_HOST)?,
            port,
            username: require_env(EnvConfig::STORE_USER)?,
            password: require_env(EnvConfig::STORE_PASSWORD)?,
            store_root: require_env(EnvConfig::STORE_ROOT)?,
        })
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("store_root", &self.store_root)
            .finish()
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| LintmendError::Config {
        message: format!("required environment variable {name} is not set"),
    })
}

/// Platform default cache root: `<data dir>/lintmend/models`.
pub fn default_cache_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from(".lintmend"))
        .join("lintmend")
        .join("models")
}
