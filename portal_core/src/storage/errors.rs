use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`ProfileStore`](super::ProfileStore).
///
/// A missing profile is not an error; see [`Mutation::NotFound`](super::Mutation).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid IPv4 address '{0}'")]
    InvalidAddress(String),

    #[error("profile name must not be empty")]
    EmptyName,

    /// The backing file exists but is not a profile map. Never downgraded
    /// to an empty store.
    #[error("profile file {path:?} is malformed: {reason}")]
    MalformedStoreFile { path: PathBuf, reason: String },

    #[error("profile file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to locate config dir")]
    NoConfigDir,
}
