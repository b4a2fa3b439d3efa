use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use base64::prelude::*;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use ssh2::{CheckResult, HashType, KnownHostFileKind, Session};

use crate::connections::errors::ConnectionError;

/// What to do with the key a server presents during the handshake.
///
/// In `config.yaml`:
/// `host_keys: accept_any`, `host_keys: { known_hosts: ~/.ssh/known_hosts }`
/// or `host_keys: { pinned: "SHA256:n4bQgY..." }` (as `ssh-keygen -lf` prints it,
/// or the same digest in hex).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyPolicy {
    /// Trust whatever key the server sends. Nothing is remembered.
    #[default]
    AcceptAny,
    /// The key must be listed for the host in an OpenSSH known_hosts file.
    KnownHosts(PathBuf),
    /// The key's SHA-256 fingerprint must equal this one.
    Pinned(String),
}

impl HostKeyPolicy {
    /// Checks the key of an already handshaken `session` against the policy.
    pub fn verify(&self, session: &Session, host: &str, port: u16) -> Result<(), ConnectionError> {
        let hash = session.host_key_hash(HashType::Sha256);

        match self {
            HostKeyPolicy::AcceptAny => {
                warn!(
                    "Accepting host key of {} without verification (SHA256:{})",
                    host,
                    hash.map_or_else(|| "unknown".to_string(), |h| BASE64_STANDARD_NO_PAD.encode(h))
                );
                Ok(())
            }
            HostKeyPolicy::KnownHosts(path) => {
                let (key, _) = session.host_key().ok_or_else(|| {
                    ConnectionError::HostKeyError(format!("{host} presented no host key"))
                })?;
                let mut known = session.known_hosts()?;
                known
                    .read_file(path, KnownHostFileKind::OpenSSH)
                    .map_err(|e| {
                        ConnectionError::HostKeyError(format!("cannot read {:?}: {}", path, e))
                    })?;
                known_hosts_verdict(known.check_port(host, port, key), host, path)
            }
            HostKeyPolicy::Pinned(expected) => {
                let actual = hash.ok_or_else(|| {
                    ConnectionError::HostKeyError(format!("{host} presented no host key"))
                })?;
                if fingerprint_matches(expected, actual) {
                    debug!("Host key of {} matches pinned fingerprint", host);
                    Ok(())
                } else {
                    Err(ConnectionError::HostKeyError(format!(
                        "host key of {host} has fingerprint SHA256:{}, expected {expected}",
                        BASE64_STANDARD_NO_PAD.encode(actual)
                    )))
                }
            }
        }
    }
}

fn known_hosts_verdict(result: CheckResult, host: &str, path: &Path) -> Result<(), ConnectionError> {
    match result {
        CheckResult::Match => {
            info!("Host key of {} matches {:?}", host, path);
            Ok(())
        }
        CheckResult::NotFound => Err(ConnectionError::HostKeyError(format!(
            "{host} is not listed in {path:?}"
        ))),
        CheckResult::Mismatch => Err(ConnectionError::HostKeyError(format!(
            "host key of {host} does not match the one in {path:?}"
        ))),
        CheckResult::Failure => Err(ConnectionError::HostKeyError(format!(
            "could not check host key of {host} against {path:?}"
        ))),
    }
}

/// `expected` is either OpenSSH's `SHA256:<base64>` as printed by
/// `ssh-keygen -lf`, or plain hex with optional `:` separators.
fn fingerprint_matches(expected: &str, hash: &[u8]) -> bool {
    let expected = expected.trim();
    let openssh = expected
        .get(..7)
        .filter(|prefix| prefix.eq_ignore_ascii_case("sha256:"))
        .map(|_| &expected[7..]);

    match openssh {
        Some(b64) => b64.trim_end_matches('=') == BASE64_STANDARD_NO_PAD.encode(hash),
        None => normalize_hex(expected) == fingerprint_hex(hash),
    }
}

fn fingerprint_hex(hash: &[u8]) -> String {
    hash.iter().fold(String::with_capacity(hash.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Lowercase hex without separators.
fn normalize_hex(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != ':')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA-256 of "test"
    const DIGEST: [u8; 32] = [
        0x9f, 0x86, 0xd0, 0x81, 0x88, 0x4c, 0x7d, 0x65, 0x9a, 0x2f, 0xea, 0xa0, 0xc5, 0x5a, 0xd0,
        0x15, 0xa3, 0xbf, 0x4f, 0x1b, 0x2b, 0x0b, 0x82, 0x2c, 0xd1, 0x5d, 0x6c, 0x15, 0xb0, 0xf0,
        0x0a, 0x08,
    ];

    #[test]
    fn hex_fingerprints_compare_without_separators() {
        assert_eq!(fingerprint_hex(&DIGEST[..4]), "9f86d081");
        assert!(fingerprint_matches(
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08",
            &DIGEST
        ));
        assert!(fingerprint_matches(
            " 9F:86:D0:81:88:4C:7D:65:9A:2F:EA:A0:C5:5A:D0:15:A3:BF:4F:1B:2B:0B:82:2C:D1:5D:6C:15:B0:F0:0A:08 ",
            &DIGEST
        ));
    }

    #[test]
    fn openssh_base64_fingerprints_match() {
        assert!(fingerprint_matches(
            "SHA256:n4bQgYhMfWWaL+qgxVrQFaO/TxsrC4Is0V1sFbDwCgg",
            &DIGEST
        ));
        assert!(fingerprint_matches(
            "sha256:n4bQgYhMfWWaL+qgxVrQFaO/TxsrC4Is0V1sFbDwCgg=",
            &DIGEST
        ));
        // base64 is case-sensitive
        assert!(!fingerprint_matches(
            "SHA256:N4BQGYHMFWWAL+QGXVRQFAO/TXSRC4IS0V1SFBDWCGG",
            &DIGEST
        ));
        assert!(!fingerprint_matches("SHA256:", &DIGEST));
    }

    #[test]
    fn known_hosts_only_accepts_a_match() {
        let path = Path::new("/home/u/.ssh/known_hosts");
        assert!(known_hosts_verdict(CheckResult::Match, "10.0.0.5", path).is_ok());
        for result in [CheckResult::NotFound, CheckResult::Mismatch, CheckResult::Failure] {
            assert!(matches!(
                known_hosts_verdict(result, "10.0.0.5", path),
                Err(ConnectionError::HostKeyError(_))
            ));
        }
    }

    #[test]
    fn policy_reads_from_yaml() {
        let p: HostKeyPolicy = serde_yaml::from_str("accept_any").unwrap();
        assert_eq!(p, HostKeyPolicy::AcceptAny);

        let p: HostKeyPolicy = serde_yaml::from_str("known_hosts: /etc/ssh/ssh_known_hosts").unwrap();
        assert_eq!(
            p,
            HostKeyPolicy::KnownHosts(PathBuf::from("/etc/ssh/ssh_known_hosts"))
        );

        let p: HostKeyPolicy = serde_yaml::from_str("pinned: \"ab:cd\"").unwrap();
        assert_eq!(p, HostKeyPolicy::Pinned("ab:cd".into()));
    }
}
