//! Process-lifetime memo of identity profiles and portraits.

use crate::store::Backends;
use crate::types::{Identity, Profile};
use image::DynamicImage;
use std::collections::HashMap;
use std::sync::Arc;

/// Cached snapshot for one identity.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub profile: Profile,
    pub portrait: Option<Arc<DynamicImage>>,
}

/// Lazily filled, never evicted.
///
/// Read failures are absorbed here: a missing or unreadable record becomes
/// an empty profile, and a missing or undecodable portrait becomes `None`.
#[derive(Default)]
pub struct IdentityCache {
    entries: HashMap<Identity, CacheEntry>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached entry, fetching it on first reference.
    pub fn get(&mut self, id: &Identity, backends: &Backends<'_>) -> &CacheEntry {
        self.entries
            .entry(id.clone())
            .or_insert_with(|| load_entry(id, backends))
    }

    /// Cached entry without any store access.
    pub fn peek(&self, id: &Identity) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reflect a successful attendance write in the cached profile.
    pub(crate) fn record_mark(&mut self, id: &Identity, total: u64, at: &str) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.profile.total_attendance = Some(total);
            entry.profile.last_attendance_time = Some(at.to_string());
        }
    }
}

fn load_entry(id: &Identity, backends: &Backends<'_>) -> CacheEntry {
    let profile = match backends.records.fetch(id) {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            tracing::debug!(id = %id, "no record for identity; using empty profile");
            Profile::default()
        }
        Err(err) => {
            tracing::warn!(id = %id, error = %err, "profile fetch failed; using empty profile");
            Profile::default()
        }
    };

    CacheEntry {
        profile,
        portrait: load_portrait(id, backends),
    }
}

fn load_portrait(id: &Identity, backends: &Backends<'_>) -> Option<Arc<DynamicImage>> {
    let bytes = match backends.portraits.fetch(id) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            tracing::debug!(id = %id, "no portrait stored");
            return None;
        }
        Err(err) => {
            tracing::warn!(id = %id, error = %err, "could not fetch portrait");
            return None;
        }
    };

    match image::load_from_memory(&bytes) {
        Ok(img) => {
            tracing::debug!(id = %id, width = img.width(), height = img.height(), "portrait decoded");
            Some(Arc::new(img))
        }
        Err(err) => {
            tracing::warn!(id = %id, error = %err, "could not decode portrait");
            None
        }
    }
}
