//! Portrait blobs kept as `<dir>/<id>.png` files.

use rollcall_core::{Identity, PortraitStore, StoreError};
use std::path::{Path, PathBuf};

pub const PORTRAIT_EXTENSION: &str = "png";

pub struct DirPortraitStore {
    dir: PathBuf,
}

impl DirPortraitStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the portrait for `id`. Rejects ids that would escape `dir`.
    pub fn path_for(&self, id: &Identity) -> Result<PathBuf, StoreError> {
        let raw = id.as_str();
        if raw.is_empty() || raw.contains(['/', '\\']) || raw.starts_with('.') {
            return Err(StoreError::Malformed {
                id: raw.to_string(),
                reason: "identity is not usable as a file name".into(),
            });
        }
        Ok(self.dir.join(format!("{raw}.{PORTRAIT_EXTENSION}")))
    }
}

impl PortraitStore for DirPortraitStore {
    fn fetch(&self, id: &Identity) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(id)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}
