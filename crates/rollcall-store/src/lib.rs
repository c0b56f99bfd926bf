//! rollcall-store — Concrete backends for the rollcall core.
//!
//! SQLite for attendance records, a directory of PNGs for portraits,
//! plus loaders for the TOML seed file and the JSON descriptor gallery.

pub mod gallery;
pub mod paths;
pub mod portraits;
pub mod seed;
pub mod sqlite;

pub use gallery::{load_gallery, parse_gallery, GalleryError};
pub use paths::{default_data_dir, default_db_path, default_gallery_path, default_portrait_dir};
pub use portraits::DirPortraitStore;
pub use seed::{apply_seed, load_seed, parse_seed, SeedError};
pub use sqlite::SqliteRecordStore;
