//! Known-face gallery: enrolled descriptors keyed by identity.
//!
//! JSON array of `{"id": "...", "descriptor": [f32, ...]}`. An identity
//! may appear more than once; every entry is matched independently.

use rollcall_core::KnownFace;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("cannot read gallery {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid gallery JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("descriptor for {id} has {actual} values, expected {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },
    #[error("descriptor for {id} is empty")]
    EmptyDescriptor { id: String },
}

pub fn parse_gallery(src: &str) -> Result<Vec<KnownFace>, GalleryError> {
    let gallery: Vec<KnownFace> = serde_json::from_str(src)?;

    let mut expected: Option<usize> = None;
    for face in &gallery {
        let actual = face.embedding.values.len();
        if actual == 0 {
            return Err(GalleryError::EmptyDescriptor {
                id: face.id.to_string(),
            });
        }
        match expected {
            None => expected = Some(actual),
            Some(exp) if exp != actual => {
                return Err(GalleryError::DimensionMismatch {
                    id: face.id.to_string(),
                    expected: exp,
                    actual,
                });
            }
            Some(_) => {}
        }
    }

    Ok(gallery)
}

pub fn load_gallery(path: &Path) -> Result<Vec<KnownFace>, GalleryError> {
    let src = std::fs::read_to_string(path).map_err(|source| GalleryError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let gallery = parse_gallery(&src)?;
    tracing::info!(path = %path.display(), entries = gallery.len(), "gallery loaded");
    Ok(gallery)
}
