//! MRZ scanner binding - machine-readable-zone recognition for Rust
//!
//! Wraps the closed-source Dynamsoft Label Recognizer engine: this crate
//! marshals file paths, pixel buffers, and decoded images into the engine's
//! call conventions and converts its output into [`LineResult`] records. It
//! does no image processing or OCR of its own.
//!
//! Two usage modes:
//! - Synchronous: [`MrzScanner::decode_file`] / [`MrzScanner::decode_buffer`]
//!   / [`MrzScanner::decode_image`] run the engine inline and return results.
//! - Asynchronous: register a listener with [`MrzScanner::set_listener`] (or
//!   take a channel from [`MrzScanner::listen`]), then feed frames with
//!   [`MrzScanner::decode_buffer_async`]. A dedicated worker thread drains
//!   the frame queue; under the default latest-wins policy a live camera
//!   feed can never outrun recognition.
//!
//! The vendor runtime is linked only with the `vendor` feature; everything
//! above the [`RecognitionEngine`] seam works without it.
//!
//! ```rust,ignore
//! use mrz_scanner::MrzScanner;
//!
//! mrz_scanner::init_license("YOUR_LICENSE_KEY")?;
//!
//! let mut scanner = MrzScanner::new()?;
//! scanner.load_model(mrz_scanner::default_template())?;
//!
//! // one-shot
//! for line in scanner.decode_file("passport.jpg") {
//!     println!("[{}] {}", line.confidence, line.text);
//! }
//!
//! // camera feed
//! let results = scanner.listen();
//! loop {
//!     let frame = camera.next_frame();
//!     scanner.decode_buffer_async(frame)?;
//!     if let Ok(lines) = results.try_recv() {
//!         // freshest recognition output
//!     }
//! }
//! ```

pub mod engine;
mod error;
mod frame;
mod queue;
mod result;
mod scanner;
mod worker;

pub use engine::{EngineError, RecognitionEngine, TextLine, TextZone};
pub use error::ScanError;
pub use frame::{FrameBuffer, PixelFormat};
pub use queue::QueuePolicy;
pub use result::LineResult;
pub use scanner::MrzScanner;

#[cfg(feature = "vendor")]
pub use engine::vendor::{init_license, runtime_version};

/// The recognition settings template bundled with this crate, tuned for
/// passport/ID MRZ text. Load it with [`MrzScanner::load_model`].
pub fn default_template() -> &'static str {
    include_str!("../models/mrz.json")
}
