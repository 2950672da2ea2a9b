//! Lintmend: headless toolkit for style-violation-repair studies.
//!
//! Orchestrates an external checkstyle linter over Java corpora, parses its
//! XML reports, locates trained repair models in a local cache backed by an
//! SSH remote store, collects diff-based repair datasets, and drives the
//! external training pipeline when no compatible model exists.
//!
//! # Example
//!
//! ```rust,ignore
//! use lintmend::{ModelStore, ProjectId, Protocol, RemoteConfig};
//!
//! fn main() -> lintmend::Result<()> {
//!     let store = ModelStore::new("/var/cache/lintmend", RemoteConfig::from_env()?);
//!     let project = ProjectId::parse("alice-demo")?;
//!
//!     match store.get_model(&project, Protocol::ThreeGrams, "checkstyle.xml".as_ref())? {
//!         Some(model) => println!("model: {}", model.display()),
//!         None => println!("no compatible model; train one"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod checkstyle;
pub mod command;
pub mod config;
pub mod diff;
pub mod error;
pub mod metadata;
pub mod repairs;
pub mod store;
pub mod training;

// Re-export commonly used types
pub use checkstyle::{
    parse_report, CheckResult, CheckstyleRunner, FileReport, Report, ReportFilter, Severity,
    Violation, TARGETED_CHECKS,
};
pub use command::{CommandOutput, CommandRunner, DefaultCommandRunner};
pub use config::{
    default_cache_root, CheckstyleConfig, EnvConfig, ProjectId, Protocol, RemoteConfig, StoreConfig,
};
pub use error::{LintmendError, Result};
pub use repairs::{ErrorMetadata, RepairCollector, RepairEntry};
pub use store::{Manifest, ManifestEntry, ModelCache, ModelStore, RemoteSession, RemoteTransport, SshTransport};
pub use training::{ensure_models, ModelOutcome, TrainingRunner};
