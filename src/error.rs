//! Error types for the MRZ scanner binding

use thiserror::Error;

/// Errors surfaced by the scanner boundary.
///
/// Engine-reported recognition failures are deliberately *not* represented
/// here: the synchronous decode calls log them and return an empty result
/// set, matching the behavior callers of this binding rely on. `Engine`
/// covers settings and license calls, where the status code is the result.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The engine rejected a settings or license call.
    #[error("engine call failed with status {status}: {message}")]
    Engine {
        /// Native status code as reported by the engine.
        status: i32,
        /// Engine-provided error description.
        message: String,
    },

    /// The stride-to-width ratio matches no supported pixel format.
    #[error("unsupported stride {stride} for width {width} (expected 1x, 3x or 4x)")]
    UnsupportedStride { width: u32, stride: u32 },

    /// The buffer length disagrees with the declared geometry.
    #[error("buffer holds {actual} bytes but stride {stride} x height {height} requires {expected}")]
    BufferSize {
        actual: usize,
        expected: usize,
        stride: u32,
        height: u32,
    },

    /// An async submission arrived with no registered listener.
    #[error("no async listener registered; call set_listener first")]
    NoListener,

    /// The engine refused to allocate an instance handle.
    #[error("failed to allocate an engine instance")]
    EngineAllocation,
}
