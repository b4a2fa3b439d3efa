pub mod connections;
pub mod core;
pub mod storage;
pub mod utils;

// re‑export ergonomic entry points
pub use connections::ssh::{SshConnector, SshSession, SshShell};
pub use connections::ConnectionError;
pub use self::core::relay::{Relay, RelayOutcome};
pub use storage::{ConnectionProfile, KeyKind, Mutation, ProfileEdit, ProfileStore, StoreError};
pub use utils::config::AppConfig;
