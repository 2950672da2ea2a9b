//! Model store: remote transport, local release cache, and the tiered
//! locator that ties them together.

mod cache;
mod locator;
mod remote;

pub use cache::{sha256_file, Manifest, ManifestEntry, ModelCache};
pub use locator::ModelStore;
pub use remote::{RemoteSession, RemoteTransport, SshTransport};
