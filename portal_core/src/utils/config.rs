//! Static settings read once at startup from `config.yaml`.
//!
//! Every field has a default, so a missing or empty file is a valid config.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use std::{fs, io};

use log::{debug, LevelFilter};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::paths::{self, expand_tilde};
use crate::connections::ssh::{ConnectSettings, HostKeyPolicy, PtySettings};
use crate::connections::DrainPolicy;
use crate::storage::{ProfileStore, StoreError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("config {path:?} is malformed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("unknown log level '{0}'")]
    LogLevel(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where profiles live. Defaults to the platform config dir.
    pub profiles_file: Option<PathBuf>,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Seconds counted down before connecting from the menu.
    pub countdown_secs: u64,
    pub ssh: SshConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profiles_file: None,
            log_level: "warn".into(),
            countdown_secs: 3,
            ssh: SshConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub port: u16,
    pub connect_timeout_secs: Option<u64>,
    /// Quiet period after which a command's output is considered complete.
    pub settle_ms: u64,
    /// Upper bound on waiting for a single command's output.
    pub drain_max_ms: u64,
    pub pty: PtySettings,
    pub host_keys: HostKeyPolicy,
}

impl Default for SshConfig {
    fn default() -> Self {
        let drain = DrainPolicy::default();
        Self {
            port: 22,
            connect_timeout_secs: None,
            settle_ms: drain.settle.as_millis() as u64,
            drain_max_ms: drain.max_wait.as_millis() as u64,
            pty: PtySettings::default(),
            host_keys: HostKeyPolicy::default(),
        }
    }
}

impl AppConfig {
    /// `<config dir>/ssh_portal/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        paths::config_dir().map(|dir| dir.join("config.yaml"))
    }

    /// Reads `path`, which must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// An explicit path must load; otherwise the default location is used if
    /// a file is there, and built-in defaults if not.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(self.log_level.trim())
            .map_err(|_| ConfigError::LogLevel(self.log_level.clone()))
    }

    pub fn profiles_path(&self) -> Result<PathBuf, StoreError> {
        match &self.profiles_file {
            Some(path) => Ok(expand_path(path)),
            None => ProfileStore::default_path(),
        }
    }

    pub fn connect_settings(&self) -> ConnectSettings {
        let host_keys = match &self.ssh.host_keys {
            HostKeyPolicy::KnownHosts(path) => HostKeyPolicy::KnownHosts(expand_path(path)),
            other => other.clone(),
        };
        ConnectSettings {
            port: self.ssh.port,
            connect_timeout: self.ssh.connect_timeout_secs.map(Duration::from_secs),
            host_keys,
        }
    }

    pub fn drain_policy(&self) -> DrainPolicy {
        let settle = Duration::from_millis(self.ssh.settle_ms);
        DrainPolicy {
            settle,
            max_wait: Duration::from_millis(self.ssh.drain_max_ms).max(settle),
        }
    }

    pub fn countdown(&self) -> Duration {
        Duration::from_secs(self.countdown_secs)
    }
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(text) => expand_tilde(text),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_all_defaults() {
        let config = AppConfig::from_yaml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.ssh.port, 22);
        assert_eq!(config.drain_policy(), DrainPolicy::default());
        assert_eq!(config.log_level().unwrap(), LevelFilter::Warn);
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let yaml = r#"
profiles_file: /tmp/portal/profiles.json
ssh:
  port: 2222
  settle_ms: 100
  host_keys:
    known_hosts: /etc/ssh/ssh_known_hosts
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(
            config.profiles_path().unwrap(),
            PathBuf::from("/tmp/portal/profiles.json")
        );
        assert_eq!(config.countdown_secs, 3);

        let settings = config.connect_settings();
        assert_eq!(settings.port, 2222);
        assert_eq!(settings.connect_timeout, None);
        assert_eq!(
            settings.host_keys,
            HostKeyPolicy::KnownHosts(PathBuf::from("/etc/ssh/ssh_known_hosts"))
        );

        let drain = config.drain_policy();
        assert_eq!(drain.settle, Duration::from_millis(100));
        assert_eq!(drain.max_wait, Duration::from_secs(5));
    }

    #[test]
    fn max_wait_never_undercuts_settle() {
        let config = AppConfig::from_yaml("ssh: { settle_ms: 800, drain_max_ms: 10 }").unwrap();
        let drain = config.drain_policy();
        assert_eq!(drain.max_wait, drain.settle);
    }

    #[test]
    fn bad_log_level_is_reported() {
        let config = AppConfig::from_yaml("log_level: chatty").unwrap();
        assert!(matches!(config.log_level(), Err(ConfigError::LogLevel(_))));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(matches!(
            AppConfig::load_or_default(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "ssh: [not, a, map]\n").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
