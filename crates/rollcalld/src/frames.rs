//! JSON-lines detection frame source.
//!
//! One frame per line: `{"at_ms": 1200, "faces": [[0.12, -0.03, ...], ...]}`.
//! Blank lines are skipped. `at_ms` must not go backwards, and every face
//! must be a non-empty descriptor of the gallery's dimension when one is set.

use rollcall_core::{CaptureError, DetectionFrame, Embedding, FrameSource};
use serde::Deserialize;
use std::io::BufRead;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct WireFrame {
    at_ms: u64,
    #[serde(default)]
    faces: Vec<Vec<f32>>,
}

pub struct JsonLinesSource<R> {
    reader: R,
    line: u64,
    last_at: Option<u64>,
    dim: Option<usize>,
    buf: String,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            last_at: None,
            dim: None,
            buf: String::new(),
        }
    }

    /// Require every face descriptor to have `dim` values.
    pub fn with_dimension(mut self, dim: usize) -> Self {
        self.dim = Some(dim);
        self
    }

    fn check_faces(&self, faces: &[Vec<f32>]) -> Result<(), CaptureError> {
        for (i, face) in faces.iter().enumerate() {
            if face.is_empty() {
                return Err(CaptureError::Malformed {
                    line: self.line,
                    reason: format!("face {i} has an empty descriptor"),
                });
            }
            if let Some(dim) = self.dim.filter(|&d| d != face.len()) {
                return Err(CaptureError::Malformed {
                    line: self.line,
                    reason: format!("face {i} has {} values, expected {dim}", face.len()),
                });
            }
        }
        Ok(())
    }
}

impl<R: BufRead> FrameSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<DetectionFrame>, CaptureError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }

            let wire: WireFrame =
                serde_json::from_str(text).map_err(|e| CaptureError::Malformed {
                    line: self.line,
                    reason: e.to_string(),
                })?;

            if let Some(prev) = self.last_at {
                if wire.at_ms < prev {
                    return Err(CaptureError::Malformed {
                        line: self.line,
                        reason: format!("at_ms {} is earlier than previous {prev}", wire.at_ms),
                    });
                }
            }
            self.check_faces(&wire.faces)?;
            self.last_at = Some(wire.at_ms);

            tracing::trace!(line = self.line, at_ms = wire.at_ms, faces = wire.faces.len(), "frame read");

            return Ok(Some(DetectionFrame {
                at: Duration::from_millis(wire.at_ms),
                faces: wire.faces.into_iter().map(Embedding::new).collect(),
            }));
        }
    }
}
