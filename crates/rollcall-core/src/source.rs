use crate::types::DetectionFrame;
use thiserror::Error;

/// Failure to obtain a frame. Always fatal to the frame loop.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("frame source read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame at line {line}: {reason}")]
    Malformed { line: u64, reason: String },
    #[error("capture device failed: {0}")]
    Device(String),
}

/// Producer of detection frames, pulled once per loop iteration.
pub trait FrameSource {
    /// `Ok(None)` means the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<DetectionFrame>, CaptureError>;
}
