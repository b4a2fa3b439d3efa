use std::path::PathBuf;

use thiserror::Error;

use crate::storage::KeyKind;

/// A central error enum for connection-related errors.
///
/// Everything that can go wrong between "pick a profile" and "shell closed"
/// ends up here; callers report it and carry on without a session.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("authentication failed for user '{username}', please verify your credentials")]
    AuthenticationFailed { username: String },

    #[error("unable to establish SSH connection: {0}")]
    TransportError(String),

    #[error("unable to verify server's host key: {0}")]
    HostKeyError(String),

    #[error("key file not found: {}", .0.display())]
    KeyFileNotFound(PathBuf),

    #[error("key file is not readable: {}: {source}", .path.display())]
    KeyFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} does not look like a {kind} private key", .path.display())]
    InvalidKeyFile { path: PathBuf, kind: KeyKind },

    /// Remote channel failed while streaming.
    #[error("channel error: {0}")]
    Channel(String),

    /// Local terminal I/O failed while streaming.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything libssh2 reports that is not handled more specifically becomes a
/// transport error.
impl From<ssh2::Error> for ConnectionError {
    fn from(err: ssh2::Error) -> Self {
        ConnectionError::TransportError(err.to_string())
    }
}
