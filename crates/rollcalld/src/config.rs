use rollcall_core::{PresenceConfig, DEFAULT_MATCH_TOLERANCE};
use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite attendance database.
    pub db_path: PathBuf,
    /// Directory of `<id>.png` portraits.
    pub portrait_dir: PathBuf,
    /// JSON gallery of enrolled descriptors.
    pub gallery_path: PathBuf,
    /// Maximum descriptor distance accepted as a match.
    pub match_tolerance: f32,
    /// How long each person's card stays up when several are visible.
    pub rotate_interval: Duration,
    /// How long the last card is held after everyone leaves the frame.
    pub idle_timeout: Duration,
    /// How long a database call waits on a lock before failing.
    pub db_busy_timeout: Duration,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path_or = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);

        Self {
            db_path: path_or("ROLLCALL_DB_PATH", rollcall_store::default_db_path()),
            portrait_dir: path_or("ROLLCALL_PORTRAIT_DIR", rollcall_store::default_portrait_dir()),
            gallery_path: path_or("ROLLCALL_GALLERY_PATH", rollcall_store::default_gallery_path()),
            match_tolerance: parse_or(&lookup, "ROLLCALL_MATCH_TOLERANCE", DEFAULT_MATCH_TOLERANCE),
            rotate_interval: Duration::from_millis(parse_or(
                &lookup,
                "ROLLCALL_ROTATE_INTERVAL_MS",
                200,
            )),
            idle_timeout: Duration::from_millis(parse_or(&lookup, "ROLLCALL_IDLE_TIMEOUT_MS", 5000)),
            db_busy_timeout: Duration::from_millis(parse_or(
                &lookup,
                "ROLLCALL_DB_BUSY_TIMEOUT_MS",
                2000,
            )),
        }
    }

    pub fn presence(&self) -> PresenceConfig {
        PresenceConfig {
            rotate_interval: self.rotate_interval,
            idle_timeout: self.idle_timeout,
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
