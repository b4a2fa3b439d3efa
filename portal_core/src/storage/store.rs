use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::{fs, io};

use log::{debug, info, warn};
use tempfile::NamedTempFile;

use super::errors::StoreError;
use super::ipv4::validate_ipv4;
use super::profile::{ConnectionProfile, KeyKind, ProfileEdit};
use crate::utils::paths;

/// Outcome of `edit`/`delete`. A missing name is expected, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Applied,
    NotFound,
}

/// All profiles, held in memory and mirrored to one JSON file.
///
/// The whole map is rewritten after every mutation. Nothing guards against
/// another process writing the same file; the last writer wins.
#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    profiles: BTreeMap<String, ConnectionProfile>,
}

impl ProfileStore {
    /// Opens the store backed by `path`, loading it if it exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let mut store = Self {
            path: path.into(),
            profiles: BTreeMap::new(),
        };
        store.load()?;
        Ok(store)
    }

    /// `~/.config/ssh_portal/profiles.json` on Linux, `%APPDATA%\ssh_portal\profiles.json` on Windows, etc.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        paths::config_dir()
            .map(|dir| dir.join("profiles.json"))
            .ok_or(StoreError::NoConfigDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the in-memory map with the file contents.
    /// A missing or blank file is an empty store; anything unparsable fails.
    pub fn load(&mut self) -> Result<(), StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No profile file at {:?}, starting empty", self.path);
                self.profiles.clear();
                return Ok(());
            }
            Err(source) => return Err(self.io_error(source)),
        };

        if text.trim().is_empty() {
            self.profiles.clear();
            return Ok(());
        }

        let profiles: BTreeMap<String, ConnectionProfile> =
            serde_json::from_str(&text).map_err(|e| self.malformed(e.to_string()))?;

        for (name, profile) in &profiles {
            if name.is_empty() {
                return Err(self.malformed("profile with an empty name".into()));
            }
            if !validate_ipv4(&profile.address) {
                return Err(self.malformed(format!(
                    "profile '{name}' has invalid address '{}'",
                    profile.address
                )));
            }
        }

        info!("Loaded {} profile(s) from {:?}", profiles.len(), self.path);
        self.profiles = profiles;
        Ok(())
    }

    /// Writes the whole map to a temp file next to the target, then renames it
    /// into place so a crash mid-write never leaves a truncated store.
    pub fn save(&self) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        write_pretty(&mut tmp, &self.profiles).map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        debug!("Saved {} profile(s) to {:?}", self.profiles.len(), self.path);
        Ok(())
    }

    /// Every stored profile, ordered by name.
    pub fn list(&self) -> &BTreeMap<String, ConnectionProfile> {
        &self.profiles
    }

    pub fn get(&self, name: &str) -> Option<&ConnectionProfile> {
        self.profiles.get(name)
    }

    /// Create or overwrite a profile. An existing profile of the same name is
    /// replaced without complaint.
    pub fn create(
        &mut self,
        name: &str,
        address: &str,
        username: &str,
        credential: &str,
        key_kind: KeyKind,
    ) -> Result<(), StoreError> {
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        if !validate_ipv4(address) {
            return Err(StoreError::InvalidAddress(address.to_string()));
        }

        let profile = ConnectionProfile::new(address, username, credential, key_kind);
        let previous = self.profiles.insert(name.to_string(), profile);
        if let Err(e) = self.save() {
            match previous {
                Some(old) => self.profiles.insert(name.to_string(), old),
                None => self.profiles.remove(name),
            };
            return Err(e);
        }

        if previous.is_some() {
            info!("Profile '{}' overwritten", name);
        } else {
            info!("Profile '{}' created", name);
        }
        Ok(())
    }

    /// Applies the non-empty fields of `edit`. A missing name is reported
    /// before anything else; a supplied address must then be a valid IPv4
    /// address, same as on create.
    pub fn edit(&mut self, name: &str, edit: &ProfileEdit) -> Result<Mutation, StoreError> {
        if !self.profiles.contains_key(name) {
            warn!("Profile '{}' not found, nothing edited", name);
            return Ok(Mutation::NotFound);
        }
        if let Some(address) = edit.supplied_address() {
            if !validate_ipv4(address) {
                return Err(StoreError::InvalidAddress(address.to_string()));
            }
        }

        let Some(profile) = self.profiles.get_mut(name) else {
            return Ok(Mutation::NotFound);
        };
        let before = profile.clone();
        edit.apply_to(profile);

        if let Err(e) = self.save() {
            self.profiles.insert(name.to_string(), before);
            return Err(e);
        }
        info!("Profile '{}' updated", name);
        Ok(Mutation::Applied)
    }

    pub fn delete(&mut self, name: &str) -> Result<Mutation, StoreError> {
        let Some(removed) = self.profiles.remove(name) else {
            warn!("Profile '{}' not found, nothing deleted", name);
            return Ok(Mutation::NotFound);
        };

        if let Err(e) = self.save() {
            self.profiles.insert(name.to_string(), removed);
            return Err(e);
        }
        info!("Profile '{}' deleted", name);
        Ok(Mutation::Applied)
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn malformed(&self, reason: String) -> StoreError {
        StoreError::MalformedStoreFile {
            path: self.path.clone(),
            reason,
        }
    }
}

fn write_pretty(
    tmp: &mut NamedTempFile,
    profiles: &BTreeMap<String, ConnectionProfile>,
) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *tmp, profiles)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()
}
