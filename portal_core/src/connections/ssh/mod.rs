pub mod host_keys;
pub mod key_file;
pub mod ssh_connection;

pub use host_keys::HostKeyPolicy;
pub use key_file::{load_key_file, resolve_key_path, KeyFile, KeyLoading};
pub use ssh_connection::{ConnectSettings, PtySettings, SshConnector, SshSession, SshShell};
