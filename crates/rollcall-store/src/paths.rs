//! Default on-disk locations under the XDG data directory.

use std::path::PathBuf;

/// `$XDG_DATA_HOME/rollcall`, falling back to `~/.local/share/rollcall`.
pub fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("rollcall")
}

pub fn default_db_path() -> PathBuf {
    default_data_dir().join("attendance.db")
}

pub fn default_portrait_dir() -> PathBuf {
    default_data_dir().join("portraits")
}

pub fn default_gallery_path() -> PathBuf {
    default_data_dir().join("gallery.json")
}
