use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// How the `credential` of a profile is interpreted.
///
/// On disk this is the lowercase tag, e.g. `"key_kind": "ed25519"`.
/// Password profiles are written as `"none"`; `null`, `""` or a missing
/// field are read back as [`KeyKind::Password`] as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// `credential` is a literal password.
    #[default]
    #[serde(rename = "none")]
    Password,
    /// Generic key file; the transport detects the algorithm.
    Pem,
    Rsa,
    Dsa,
    Ed25519,
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Password => "none",
            KeyKind::Pem => "pem",
            KeyKind::Rsa => "rsa",
            KeyKind::Dsa => "dsa",
            KeyKind::Ed25519 => "ed25519",
        }
    }

    /// Parses a replacement kind for an edit. Blank input means "keep the
    /// current kind" and yields `None`, unlike [`FromStr`] where it means
    /// password authentication.
    pub fn parse_change(raw: &str) -> Result<Option<KeyKind>, UnknownKeyKind> {
        if raw.trim().is_empty() {
            return Ok(None);
        }
        raw.parse().map(Some)
    }

    /// `true` when `credential` names a private key file.
    pub fn uses_key_file(&self) -> bool {
        !matches!(self, KeyKind::Password)
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKeyKind(pub String);

impl fmt::Display for UnknownKeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown key kind '{}' (expected none, pem, rsa, dsa or ed25519)",
            self.0
        )
    }
}

impl std::error::Error for UnknownKeyKind {}

impl FromStr for KeyKind {
    type Err = UnknownKeyKind;

    /// Case-insensitive; blank input means password authentication.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        match tag.as_str() {
            "" | "none" | "password" => Ok(KeyKind::Password),
            "pem" => Ok(KeyKind::Pem),
            "rsa" => Ok(KeyKind::Rsa),
            "dsa" => Ok(KeyKind::Dsa),
            "ed25519" => Ok(KeyKind::Ed25519),
            _ => Err(UnknownKeyKind(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for KeyKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag: Option<String> = Option::deserialize(deserializer)?;
        match tag {
            None => Ok(KeyKind::Password),
            Some(tag) => tag.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// A stored connection preset. The profile name is the key it is stored
/// under, not a field.
///
/// ```json
/// "web-1": { "address": "10.0.0.5", "username": "deploy",
///            "credential": "~/.ssh/id_ed25519", "key_kind": "ed25519" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub address: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub credential: String,
    #[serde(default)]
    pub key_kind: KeyKind,
}

impl ConnectionProfile {
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
        key_kind: KeyKind,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            credential: credential.into(),
            key_kind,
        }
    }
}

/// Field-wise update for [`ProfileStore::edit`](super::ProfileStore::edit).
///
/// `None` and empty strings both leave the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEdit {
    pub address: Option<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
    pub key_kind: Option<KeyKind>,
}

impl ProfileEdit {
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn key_kind(mut self, key_kind: KeyKind) -> Self {
        self.key_kind = Some(key_kind);
        self
    }

    /// The new address, if one was supplied and is non-empty.
    pub(crate) fn supplied_address(&self) -> Option<&str> {
        non_empty(&self.address)
    }

    pub(crate) fn apply_to(&self, profile: &mut ConnectionProfile) {
        if let Some(address) = non_empty(&self.address) {
            profile.address = address.to_string();
        }
        if let Some(username) = non_empty(&self.username) {
            profile.username = username.to_string();
        }
        if let Some(credential) = non_empty(&self.credential) {
            profile.credential = credential.to_string();
        }
        if let Some(key_kind) = self.key_kind {
            profile.key_kind = key_kind;
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_kind_parses_case_insensitively() {
        assert_eq!("RSA".parse::<KeyKind>().unwrap(), KeyKind::Rsa);
        assert_eq!(" Ed25519 ".parse::<KeyKind>().unwrap(), KeyKind::Ed25519);
        assert_eq!("".parse::<KeyKind>().unwrap(), KeyKind::Password);
        assert!("ecdsa".parse::<KeyKind>().is_err());
    }

    #[test]
    fn blank_change_keeps_the_current_kind() {
        assert_eq!(KeyKind::parse_change("").unwrap(), None);
        assert_eq!(KeyKind::parse_change("   ").unwrap(), None);
        assert_eq!(KeyKind::parse_change("none").unwrap(), Some(KeyKind::Password));
        assert_eq!(KeyKind::parse_change("Pem").unwrap(), Some(KeyKind::Pem));
        assert!(KeyKind::parse_change("ecdsa").is_err());
    }

    #[test]
    fn password_profiles_accept_legacy_blank_kinds() {
        for raw in [
            r#"{"address":"10.0.0.1","username":"u","credential":"p","key_kind":null}"#,
            r#"{"address":"10.0.0.1","username":"u","credential":"p","key_kind":""}"#,
            r#"{"address":"10.0.0.1","username":"u","credential":"p"}"#,
        ] {
            let profile: ConnectionProfile = serde_json::from_str(raw).unwrap();
            assert_eq!(profile.key_kind, KeyKind::Password, "input: {raw}");
        }
    }

    #[test]
    fn key_kind_is_written_as_lowercase_tag() {
        let profile = ConnectionProfile::new("10.0.0.1", "u", "/k", KeyKind::Ed25519);
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["key_kind"], "ed25519");

        let profile = ConnectionProfile::new("10.0.0.1", "u", "pw", KeyKind::Password);
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["key_kind"], "none");
    }

    #[test]
    fn empty_edit_fields_are_ignored() {
        let mut profile = ConnectionProfile::new("10.0.0.1", "alice", "pw", KeyKind::Password);
        ProfileEdit::default()
            .username("")
            .credential("new-pw")
            .apply_to(&mut profile);
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.credential, "new-pw");
        assert_eq!(profile.address, "10.0.0.1");
    }
}
