//! Recognition worker thread
//!
//! One dedicated thread drains the frame queue and runs the engine
//! synchronously per frame. Engine access is serialized with the
//! synchronous decode paths through the shared engine lock; the queue has
//! its own lock so the engine is never held while waiting for work.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::engine::RecognitionEngine;
use crate::frame::FrameBuffer;
use crate::queue::{FrameQueue, QueuePolicy};
use crate::result::{flatten_zones, LineResult};

/// Callback invoked on the worker thread with each batch of results.
pub(crate) type Listener = Box<dyn FnMut(Vec<LineResult>) + Send + 'static>;

/// Engine handle shared between the caller's thread and the worker.
pub(crate) type SharedEngine = Arc<Mutex<Box<dyn RecognitionEngine>>>;

struct WorkerShared {
    queue: FrameQueue,
    listener: Mutex<Listener>,
}

/// Owning handle to the worker thread; dropping it stops and joins the
/// thread.
pub(crate) struct Worker {
    shared: Arc<WorkerShared>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn spawn(engine: SharedEngine, policy: QueuePolicy, listener: Listener) -> Self {
        let shared = Arc::new(WorkerShared {
            queue: FrameQueue::new(policy),
            listener: Mutex::new(listener),
        });

        let handle = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || run_loop(engine, shared))
        };

        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Replace the registered listener; the old one is dropped. The worker
    /// keeps running.
    pub(crate) fn swap_listener(&self, listener: Listener) {
        *self.shared.listener.lock() = listener;
    }

    /// Enqueue a frame. Returns how many stale frames the queue dropped.
    pub(crate) fn submit(&self, frame: FrameBuffer) -> usize {
        self.shared.queue.submit(frame)
    }

    /// Signal shutdown, join the thread, then drop whatever was still
    /// queued. Idempotent: the joined handle is taken, so a second call
    /// (including the one from `Drop`) is a no-op.
    pub(crate) fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.shared.queue.shutdown();
        if handle.join().is_err() {
            warn!("recognition worker thread panicked");
        }

        let dropped = self.shared.queue.drain();
        if dropped > 0 {
            debug!("dropped {} unprocessed frames during shutdown", dropped);
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(engine: SharedEngine, shared: Arc<WorkerShared>) {
    debug!("recognition worker started");

    while let Some(frame) = shared.queue.take_blocking() {
        let zones = {
            let mut engine = engine.lock();
            match engine.recognize_buffer(&frame) {
                Ok(()) => engine.take_results(),
                Err(err) => {
                    warn!("async recognition failed: {}", err);
                    None
                }
            }
        };
        // buffer is released here, success or failure
        drop(frame);

        if let Some(zones) = zones {
            let results = flatten_zones(zones);
            let mut listener = shared.listener.lock();
            if catch_unwind(AssertUnwindSafe(|| (listener)(results))).is_err() {
                warn!("async listener panicked; worker continues");
            }
        }
    }

    debug!("recognition worker stopped");
}
