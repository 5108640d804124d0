//! Recognition engine boundary
//!
//! The actual MRZ recognition is performed by an opaque, closed-source
//! engine. This module defines the request/response seam the rest of the
//! crate talks to: recognize a file or buffer, fetch whatever the engine
//! produced, append settings. The vendor implementation lives behind the
//! `vendor` feature; tests script the seam directly.

use std::path::Path;

use thiserror::Error;

use crate::frame::FrameBuffer;

#[cfg(test)]
pub(crate) mod mock;
#[cfg(feature = "vendor")]
pub mod vendor;

/// A status-plus-message failure reported by the engine.
#[derive(Debug, Clone, Error)]
#[error("engine status {status}: {message}")]
pub struct EngineError {
    /// Native status code.
    pub status: i32,
    /// Engine-provided description, looked up from the status.
    pub message: String,
}

impl From<EngineError> for crate::error::ScanError {
    fn from(err: EngineError) -> Self {
        crate::error::ScanError::Engine {
            status: err.status,
            message: err.message,
        }
    }
}

/// One recognized text line inside a zone, in engine coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    /// Recognized characters.
    pub text: String,
    /// Engine confidence score.
    pub confidence: i32,
    /// Four corner points in engine winding order.
    pub corners: [(i32, i32); 4],
}

/// One recognized text zone; the engine groups line results under these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextZone {
    /// Line-level results in reading order.
    pub lines: Vec<TextLine>,
}

/// The engine seam.
///
/// One instance corresponds to one native engine handle. Recognition is a
/// two-step protocol: a `recognize_*` call runs the pipeline and leaves the
/// results inside the engine; [`take_results`](Self::take_results) fetches
/// and releases them. Implementations are not assumed to tolerate concurrent
/// calls; callers serialize access behind one lock.
pub trait RecognitionEngine: Send {
    /// Run recognition on an image file.
    fn recognize_file(&mut self, path: &Path) -> Result<(), EngineError>;

    /// Run recognition on a raw pixel buffer.
    fn recognize_buffer(&mut self, frame: &FrameBuffer) -> Result<(), EngineError>;

    /// Fetch all results produced by the last recognition call, releasing
    /// the engine-native representation. `None` means the engine produced no
    /// result structure at all.
    fn take_results(&mut self) -> Option<Vec<TextZone>>;

    /// Append recognition settings from a template file on disk.
    fn append_settings_file(&mut self, path: &Path) -> Result<(), EngineError>;

    /// Append recognition settings from template content.
    fn append_settings(&mut self, content: &str) -> Result<(), EngineError>;

    /// Engine runtime version string.
    fn version(&self) -> String;
}
