//! Reader session
//!
//! [`MrzScanner`] owns one engine handle, at most one worker thread, and the
//! registered async listener. Synchronous decode calls go straight to the
//! engine; asynchronous submissions go through the frame queue and come back
//! through the listener on the worker thread.
//!
//! The engine is not assumed to tolerate concurrent invocation, so both
//! paths serialize on one lock.

use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use image::DynamicImage;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::engine::RecognitionEngine;
use crate::error::ScanError;
use crate::frame::FrameBuffer;
use crate::queue::QueuePolicy;
use crate::result::{flatten_zones, LineResult};
use crate::worker::{Listener, SharedEngine, Worker};

/// An MRZ reader session.
///
/// The engine handle is allocated when the session is created and destroyed
/// when it is dropped. The worker thread and queue exist only while a
/// listener is registered; dropping the session (or calling
/// [`clear_listener`](Self::clear_listener)) joins the worker before the
/// engine goes away.
pub struct MrzScanner {
    // declared before `engine` so the worker joins before the engine handle
    // can be torn down
    worker: Option<Worker>,
    engine: SharedEngine,
}

impl MrzScanner {
    /// Create a session backed by the vendor engine.
    #[cfg(feature = "vendor")]
    pub fn new() -> Result<Self, ScanError> {
        let engine = crate::engine::vendor::DynamsoftEngine::create()?;
        Ok(Self::with_engine(Box::new(engine)))
    }

    /// Create a session over any engine implementation.
    pub fn with_engine(engine: Box<dyn RecognitionEngine>) -> Self {
        Self {
            worker: None,
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// Recognize MRZ lines in an image file.
    ///
    /// Engine-reported failures (unreadable file, recognition error) are
    /// logged and yield an empty vector, indistinguishable from "no MRZ
    /// present" — callers that need the distinction watch the log.
    pub fn decode_file(&self, path: impl AsRef<Path>) -> Vec<LineResult> {
        let path = path.as_ref();
        let mut engine = self.engine.lock();
        if let Err(err) = engine.recognize_file(path) {
            warn!("recognition failed for {}: {}", path.display(), err);
            return Vec::new();
        }
        engine.take_results().map(flatten_zones).unwrap_or_default()
    }

    /// Recognize MRZ lines in a raw pixel buffer.
    ///
    /// Same failure semantics as [`decode_file`](Self::decode_file).
    pub fn decode_buffer(&self, frame: &FrameBuffer) -> Vec<LineResult> {
        let mut engine = self.engine.lock();
        if let Err(err) = engine.recognize_buffer(frame) {
            warn!(
                "recognition failed for {}x{} buffer: {}",
                frame.width(),
                frame.height(),
                err
            );
            return Vec::new();
        }
        engine.take_results().map(flatten_zones).unwrap_or_default()
    }

    /// Recognize MRZ lines in a decoded image.
    pub fn decode_image(&self, image: &DynamicImage) -> Vec<LineResult> {
        self.decode_buffer(&FrameBuffer::from_image(image))
    }

    /// Append recognition settings from a template file.
    pub fn load_model_file(&self, path: impl AsRef<Path>) -> Result<(), ScanError> {
        Ok(self.engine.lock().append_settings_file(path.as_ref())?)
    }

    /// Append recognition settings from template content, e.g.
    /// [`default_template`](crate::default_template).
    pub fn load_model(&self, content: &str) -> Result<(), ScanError> {
        Ok(self.engine.lock().append_settings(content)?)
    }

    /// Register the async listener, starting the worker thread on first
    /// registration with the default (latest-wins) queue policy.
    pub fn set_listener(&mut self, listener: impl FnMut(Vec<LineResult>) + Send + 'static) {
        self.set_listener_with_policy(listener, QueuePolicy::default());
    }

    /// Register the async listener with an explicit queue policy.
    ///
    /// The first registration allocates the queue and starts the worker.
    /// Registering again while listening only swaps the stored listener —
    /// the worker keeps running and the policy chosen at start stays in
    /// effect.
    pub fn set_listener_with_policy(
        &mut self,
        listener: impl FnMut(Vec<LineResult>) + Send + 'static,
        policy: QueuePolicy,
    ) {
        let listener: Listener = Box::new(listener);
        match &self.worker {
            Some(worker) => {
                debug!("swapping async listener on running worker");
                worker.swap_listener(listener);
            }
            None => {
                debug!("starting recognition worker ({:?})", policy);
                self.worker = Some(Worker::spawn(Arc::clone(&self.engine), policy, listener));
            }
        }
    }

    /// Channel-backed variant of [`set_listener`](Self::set_listener): each
    /// result batch is delivered on the returned receiver.
    pub fn listen(&mut self) -> Receiver<Vec<LineResult>> {
        self.listen_with_policy(QueuePolicy::default())
    }

    /// Channel-backed variant of
    /// [`set_listener_with_policy`](Self::set_listener_with_policy).
    pub fn listen_with_policy(&mut self, policy: QueuePolicy) -> Receiver<Vec<LineResult>> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.set_listener_with_policy(
            move |results| {
                let _ = tx.send(results);
            },
            policy,
        );
        rx
    }

    /// Queue a frame for asynchronous recognition and return immediately.
    ///
    /// Requires a registered listener; results arrive through it on the
    /// worker thread. Under the latest-wins policy this may silently drop
    /// frames that were queued but not yet picked up.
    pub fn decode_buffer_async(&self, frame: FrameBuffer) -> Result<(), ScanError> {
        let worker = self.worker.as_ref().ok_or(ScanError::NoListener)?;
        let discarded = worker.submit(frame);
        if discarded > 0 {
            debug!("dropped {} stale queued frames", discarded);
        }
        Ok(())
    }

    /// Queue a decoded image for asynchronous recognition.
    pub fn decode_image_async(&self, image: &DynamicImage) -> Result<(), ScanError> {
        self.decode_buffer_async(FrameBuffer::from_image(image))
    }

    /// Stop the worker and release the listener.
    ///
    /// Blocks until the worker thread has joined; frames still queued are
    /// dropped unexecuted. Safe to call when not listening.
    pub fn clear_listener(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
            debug!("async listener cleared");
        }
    }

    /// Whether a listener is registered and the worker is running.
    pub fn is_listening(&self) -> bool {
        self.worker.is_some()
    }

    /// Version string of the underlying engine.
    pub fn engine_version(&self) -> String {
        self.engine.lock().version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::{zone, MockEngine, MockHandle};
    use crate::engine::TextZone;
    use std::time::Duration;

    fn scanner() -> (MrzScanner, MockHandle) {
        let (engine, handle) = MockEngine::new();
        (MrzScanner::with_engine(Box::new(engine)), handle)
    }

    fn tagged_frame(tag: u8) -> FrameBuffer {
        FrameBuffer::from_raw(vec![tag], 1, 1, 1).unwrap()
    }

    #[test]
    fn test_decode_file_returns_flattened_lines() {
        let (scanner, handle) = scanner();
        handle.push_zones(vec![zone(&[("P<UTOERIKSSON<<ANNA<MARIA", 95), ("L898902C36UTO7408122F", 93)])]);

        let results = scanner.decode_file("passport.jpg");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "P<UTOERIKSSON<<ANNA<MARIA");
        assert_eq!(results[1].confidence, 93);
        assert_eq!(handle.recognized_files().len(), 1);
    }

    #[test]
    fn test_decode_file_engine_error_yields_empty_not_err() {
        let (scanner, handle) = scanner();
        handle.push_fail(-10005);

        // e.g. a nonexistent path: the engine reports a status, the caller
        // sees an empty result set
        let results = scanner.decode_file("/no/such/image.png");
        assert!(results.is_empty());
    }

    #[test]
    fn test_decode_buffer_no_results_yields_empty() {
        let (scanner, handle) = scanner();
        handle.push_nothing();

        let frame = FrameBuffer::from_raw(vec![0u8; 100 * 100], 100, 100, 100).unwrap();
        assert!(scanner.decode_buffer(&frame).is_empty());
    }

    #[test]
    fn test_decode_image_goes_through_buffer_path() {
        let (scanner, handle) = scanner();
        handle.push_zones(vec![zone(&[("IDFRA", 88)])]);

        let image = DynamicImage::new_rgb8(10, 10);
        let results = scanner.decode_image(&image);
        assert_eq!(results[0].text, "IDFRA");
        assert_eq!(handle.recognized_frames().len(), 1);
    }

    #[test]
    fn test_load_model_forwards_content() {
        let (scanner, handle) = scanner();
        scanner.load_model("{\"template\":1}").unwrap();
        assert_eq!(handle.appended_settings(), vec!["{\"template\":1}".to_string()]);
    }

    #[test]
    fn test_load_model_file_forwards_path() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut template = NamedTempFile::new().unwrap();
        writeln!(template, "{{}}").unwrap();

        let (scanner, handle) = scanner();
        scanner.load_model_file(template.path()).unwrap();

        let appended = handle.appended_settings();
        assert_eq!(appended, vec![template.path().display().to_string()]);
    }

    #[test]
    fn test_load_model_surfaces_engine_status() {
        let (scanner, handle) = scanner();
        handle.fail_settings(-10004);

        let err = scanner.load_model("{}").unwrap_err();
        assert!(matches!(err, ScanError::Engine { status: -10004, .. }));
    }

    #[test]
    fn test_async_submit_without_listener_is_rejected() {
        let (scanner, _handle) = scanner();
        let err = scanner.decode_buffer_async(tagged_frame(1)).unwrap_err();
        assert!(matches!(err, ScanError::NoListener));
    }

    #[test]
    fn test_async_round_trip() {
        let (mut scanner, handle) = scanner();
        handle.push_zones(vec![zone(&[("P<UTO", 90)])]);

        let rx = scanner.listen();
        assert!(scanner.is_listening());

        let frame = FrameBuffer::from_raw(vec![0u8; 100 * 100], 100, 100, 100).unwrap();
        scanner.decode_buffer_async(frame).unwrap();

        let results = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(results[0].text, "P<UTO");
    }

    #[test]
    fn test_async_callback_may_see_empty_batch() {
        let (mut scanner, handle) = scanner();
        // a result structure with no lines still triggers the listener
        handle.push_zones(vec![TextZone { lines: vec![] }]);

        let rx = scanner.listen();
        scanner.decode_buffer_async(tagged_frame(1)).unwrap();

        let results = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_callback_order_matches_submission_order() {
        let (mut scanner, handle) = scanner();
        let rx = scanner.listen();

        for tag in 1..=3u8 {
            handle.push_zones(vec![zone(&[(&format!("LINE{}", tag), 80)])]);
            scanner.decode_buffer_async(tagged_frame(tag)).unwrap();
            // wait for the callback before the next submission
            let results = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(results[0].text, format!("LINE{}", tag));
        }

        assert_eq!(
            handle.recognized_frames(),
            vec![vec![1], vec![2], vec![3]]
        );
    }

    #[test]
    fn test_latest_wins_drops_stale_frames_end_to_end() {
        let (mut scanner, handle) = scanner();
        for _ in 0..2 {
            handle.push_zones(vec![zone(&[("Z", 50)])]);
        }

        let rx = scanner.listen();

        // park the worker inside the engine on the first frame
        handle.hold();
        scanner.decode_buffer_async(tagged_frame(1)).unwrap();
        while handle.recognized_frames().is_empty() {
            std::thread::yield_now();
        }

        // these three race only against each other; 2 and 3 are evicted
        scanner.decode_buffer_async(tagged_frame(2)).unwrap();
        scanner.decode_buffer_async(tagged_frame(3)).unwrap();
        scanner.decode_buffer_async(tagged_frame(4)).unwrap();
        handle.release();

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(handle.recognized_frames(), vec![vec![1], vec![4]]);
        scanner.clear_listener();
    }

    #[test]
    fn test_reregistering_swaps_listener_without_second_worker() {
        let (mut scanner, handle) = scanner();
        handle.push_zones(vec![zone(&[("OLD", 10)])]);
        handle.push_zones(vec![zone(&[("NEW", 20)])]);

        let old_rx = scanner.listen();
        scanner.decode_buffer_async(tagged_frame(1)).unwrap();
        assert_eq!(
            old_rx.recv_timeout(Duration::from_secs(5)).unwrap()[0].text,
            "OLD"
        );

        let new_rx = scanner.listen();
        assert!(scanner.is_listening());
        scanner.decode_buffer_async(tagged_frame(2)).unwrap();

        assert_eq!(
            new_rx.recv_timeout(Duration::from_secs(5)).unwrap()[0].text,
            "NEW"
        );
        // the old listener was released on swap; its channel saw nothing more
        assert!(old_rx.try_recv().is_err());
    }

    #[test]
    fn test_clear_listener_then_drop_does_not_deadlock() {
        let (mut scanner, _handle) = scanner();
        let _rx = scanner.listen();
        scanner.clear_listener();
        assert!(!scanner.is_listening());

        // clearing again and dropping must both be no-ops on the worker
        scanner.clear_listener();
        drop(scanner);
    }

    #[test]
    fn test_submit_after_clear_is_rejected() {
        let (mut scanner, _handle) = scanner();
        let _rx = scanner.listen();
        scanner.clear_listener();

        let err = scanner.decode_buffer_async(tagged_frame(1)).unwrap_err();
        assert!(matches!(err, ScanError::NoListener));
    }

    #[test]
    fn test_sync_call_while_listening_serializes_on_engine() {
        let (mut scanner, handle) = scanner();
        handle.push_zones(vec![zone(&[("ASYNC", 30)])]);
        handle.push_zones(vec![zone(&[("SYNC", 40)])]);

        let rx = scanner.listen();
        scanner.decode_buffer_async(tagged_frame(1)).unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // with the worker idle, the sync path takes the same engine lock
        let results = scanner.decode_buffer(&tagged_frame(2));
        assert_eq!(results[0].text, "SYNC");
        assert_eq!(handle.recognized_frames(), vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_engine_version_passthrough() {
        let (scanner, _handle) = scanner();
        assert_eq!(scanner.engine_version(), "mock-1.0");
    }
}
