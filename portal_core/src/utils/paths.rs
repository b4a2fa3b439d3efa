use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};

pub const APP_NAME: &str = "ssh_portal";

/// `~/.config/ssh_portal` on Linux, `%APPDATA%\ssh_portal` on Windows, etc.
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|proj| proj.config_dir().to_path_buf())
}

/// Expands a leading `~` or `~/` to the user's home directory.
/// Anything else (including `~user`) is returned untouched.
pub fn expand_tilde(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => rest,
        _ => return PathBuf::from(path),
    };
    match BaseDirs::new() {
        Some(dirs) => join_home(dirs.home_dir(), rest),
        None => PathBuf::from(path),
    }
}

fn join_home(home: &Path, rest: &str) -> PathBuf {
    let rest = rest.trim_start_matches(['/', '\\']);
    if rest.is_empty() {
        home.to_path_buf()
    } else {
        home.join(rest)
    }
}
