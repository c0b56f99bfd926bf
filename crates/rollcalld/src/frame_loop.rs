use crate::config::Config;
use crate::frames::JsonLinesSource;
use crate::panel::PanelWriter;
use rollcall_core::{
    Backends, CaptureError, DistanceMatcher, KnownFace, RunSummary, Session, StoreError,
    SystemClock,
};
use rollcall_store::{DirPortraitStore, GalleryError, SqliteRecordStore};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Error, Debug)]
pub enum LoopError {
    #[error("record store: {0}")]
    Store(#[from] StoreError),
    #[error("gallery: {0}")]
    Gallery(#[from] GalleryError),
    #[error("cannot open frame stream {path}: {source}")]
    FrameStream {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("cannot spawn frame loop thread: {0}")]
    Spawn(std::io::Error),
    #[error("frame loop thread exited")]
    ThreadExited,
}

/// Handle to the running frame loop thread.
pub struct FrameLoopHandle {
    pub done: oneshot::Receiver<Result<RunSummary, LoopError>>,
}

/// Spawn the frame loop on a dedicated OS thread.
///
/// Opens the database, loads the gallery, and opens the frame stream
/// synchronously first, so a missing resource fails at startup rather
/// than inside the loop. Frames come from `frames_path`, or stdin when
/// it is `None`; panel updates go to stdout.
pub fn spawn_frame_loop(
    config: &Config,
    frames_path: Option<PathBuf>,
    stop: Arc<AtomicBool>,
) -> Result<FrameLoopHandle, LoopError> {
    let records = SqliteRecordStore::open(&config.db_path, config.db_busy_timeout)?;
    let record_count = records.count()?;
    tracing::info!(
        path = %config.db_path.display(),
        records = record_count,
        "attendance database opened"
    );

    let gallery = rollcall_store::load_gallery(&config.gallery_path)?;
    if gallery.is_empty() {
        tracing::warn!(path = %config.gallery_path.display(), "gallery is empty; nobody will be recognised");
    }

    let portraits = DirPortraitStore::new(&config.portrait_dir);
    tracing::info!(dir = %portraits.dir().display(), "portrait directory");

    let frames_file = match &frames_path {
        Some(path) => Some(File::open(path).map_err(|source| LoopError::FrameStream {
            path: path.clone(),
            source,
        })?),
        None => None,
    };

    let matcher = DistanceMatcher {
        tolerance: config.match_tolerance,
    };
    let presence = config.presence();
    let (tx, rx) = oneshot::channel();

    std::thread::Builder::new()
        .name("rollcall-frames".into())
        .spawn(move || {
            tracing::info!("frame loop thread started");
            let result = run_loop(records, portraits, gallery, matcher, presence, frames_file, &stop);
            let _ = tx.send(result);
            tracing::info!("frame loop thread exiting");
        })
        .map_err(LoopError::Spawn)?;

    Ok(FrameLoopHandle { done: rx })
}

fn run_loop(
    records: SqliteRecordStore,
    portraits: DirPortraitStore,
    gallery: Vec<KnownFace>,
    matcher: DistanceMatcher,
    presence: rollcall_core::PresenceConfig,
    frames_file: Option<File>,
    stop: &AtomicBool,
) -> Result<RunSummary, LoopError> {
    let dimension = gallery.first().map(|face| face.embedding.dim());
    let clock = SystemClock;
    let backends = Backends::new(&records, &portraits, &clock);
    let mut session = Session::new(backends, gallery, Box::new(matcher), presence);

    let reader: Box<dyn BufRead> = match frames_file {
        Some(file) => Box::new(BufReader::new(file)),
        None => Box::new(std::io::stdin().lock()),
    };
    let mut source = JsonLinesSource::new(reader);
    if let Some(dim) = dimension {
        source = source.with_dimension(dim);
    }
    let mut panel = PanelWriter::new(std::io::stdout().lock());

    let summary = session.run(&mut source, stop, |view| panel.observe(view))?;
    Ok(summary)
}
