//! Scripted engine used by queue/worker/session tests
//!
//! Outcomes are scripted per recognition call; every call is recorded so
//! tests can assert exactly which frames reached the engine. An optional
//! gate lets a test hold the worker mid-recognition to stage queue races
//! deterministically.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::{EngineError, RecognitionEngine, TextLine, TextZone};
use crate::frame::FrameBuffer;

/// Outcome of one scripted recognition call.
pub(crate) enum Scripted {
    /// Recognition succeeds and leaves these zones in the engine.
    Zones(Vec<TextZone>),
    /// Recognition succeeds but produces no result structure.
    Nothing,
    /// Recognition fails with this status code.
    Fail(i32),
}

#[derive(Default)]
struct Shared {
    script: Mutex<VecDeque<Scripted>>,
    frames: Mutex<Vec<Vec<u8>>>,
    files: Mutex<Vec<PathBuf>>,
    settings: Mutex<Vec<String>>,
    settings_status: Mutex<Option<i32>>,
    held: Mutex<bool>,
    gate: Condvar,
}

pub(crate) struct MockEngine {
    shared: Arc<Shared>,
    pending: Option<Vec<TextZone>>,
}

/// Test-side handle to a [`MockEngine`] that has been boxed into a session.
#[derive(Clone)]
pub(crate) struct MockHandle {
    shared: Arc<Shared>,
}

impl MockEngine {
    pub(crate) fn new() -> (Self, MockHandle) {
        let shared = Arc::new(Shared::default());
        (
            Self {
                shared: Arc::clone(&shared),
                pending: None,
            },
            MockHandle { shared },
        )
    }

    fn wait_gate(&self) {
        let mut held = self.shared.held.lock();
        while *held {
            self.shared.gate.wait(&mut held);
        }
    }

    /// Consume the next scripted outcome; an exhausted script means
    /// "succeeded, nothing detected".
    fn next_outcome(&mut self) -> Result<(), EngineError> {
        match self.shared.script.lock().pop_front() {
            Some(Scripted::Zones(zones)) => {
                self.pending = Some(zones);
                Ok(())
            }
            Some(Scripted::Nothing) | None => {
                self.pending = None;
                Ok(())
            }
            Some(Scripted::Fail(status)) => {
                self.pending = None;
                Err(EngineError {
                    status,
                    message: format!("scripted failure {}", status),
                })
            }
        }
    }
}

impl RecognitionEngine for MockEngine {
    fn recognize_file(&mut self, path: &Path) -> Result<(), EngineError> {
        // record before the gate so tests can observe the in-flight call
        self.shared.files.lock().push(path.to_path_buf());
        self.wait_gate();
        self.next_outcome()
    }

    fn recognize_buffer(&mut self, frame: &FrameBuffer) -> Result<(), EngineError> {
        self.shared.frames.lock().push(frame.data().to_vec());
        self.wait_gate();
        self.next_outcome()
    }

    fn take_results(&mut self) -> Option<Vec<TextZone>> {
        self.pending.take()
    }

    fn append_settings_file(&mut self, path: &Path) -> Result<(), EngineError> {
        self.append_settings(&path.display().to_string())
    }

    fn append_settings(&mut self, content: &str) -> Result<(), EngineError> {
        if let Some(status) = *self.shared.settings_status.lock() {
            return Err(EngineError {
                status,
                message: format!("scripted settings failure {}", status),
            });
        }
        self.shared.settings.lock().push(content.to_string());
        Ok(())
    }

    fn version(&self) -> String {
        "mock-1.0".to_string()
    }
}

impl MockHandle {
    pub(crate) fn push_zones(&self, zones: Vec<TextZone>) {
        self.shared.script.lock().push_back(Scripted::Zones(zones));
    }

    pub(crate) fn push_nothing(&self) {
        self.shared.script.lock().push_back(Scripted::Nothing);
    }

    pub(crate) fn push_fail(&self, status: i32) {
        self.shared.script.lock().push_back(Scripted::Fail(status));
    }

    pub(crate) fn fail_settings(&self, status: i32) {
        *self.shared.settings_status.lock() = Some(status);
    }

    /// Frames the engine has recognized so far, in call order.
    pub(crate) fn recognized_frames(&self) -> Vec<Vec<u8>> {
        self.shared.frames.lock().clone()
    }

    pub(crate) fn recognized_files(&self) -> Vec<PathBuf> {
        self.shared.files.lock().clone()
    }

    pub(crate) fn appended_settings(&self) -> Vec<String> {
        self.shared.settings.lock().clone()
    }

    /// Block the next recognition call until [`release`](Self::release).
    pub(crate) fn hold(&self) {
        *self.shared.held.lock() = true;
    }

    pub(crate) fn release(&self) {
        *self.shared.held.lock() = false;
        self.shared.gate.notify_all();
    }
}

/// Single zone holding the given `(text, confidence)` lines with distinct
/// corner coordinates.
pub(crate) fn zone(lines: &[(&str, i32)]) -> TextZone {
    TextZone {
        lines: lines
            .iter()
            .enumerate()
            .map(|(i, (text, confidence))| {
                let base = i as i32 * 10;
                TextLine {
                    text: text.to_string(),
                    confidence: *confidence,
                    corners: [
                        (base, base),
                        (base + 100, base),
                        (base + 100, base + 12),
                        (base, base + 12),
                    ],
                }
            })
            .collect(),
    }
}
