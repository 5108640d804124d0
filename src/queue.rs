//! Pending-frame queue between the caller and the worker thread
//!
//! Submissions never block. The worker blocks on the paired condvar until a
//! frame or a shutdown arrives. Under the latest-wins policy a new submission
//! evicts everything still pending, so a live camera feed can never outrun
//! the worker.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::frame::FrameBuffer;

/// How pending frames are kept while the worker is busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePolicy {
    /// Keep only the most recent submission; stale frames are dropped
    /// unexecuted. Suited to camera feeds where only the freshest frame
    /// matters.
    #[default]
    LatestWins,
    /// Keep every submission and execute in order.
    Fifo,
}

struct QueueState {
    frames: VecDeque<FrameBuffer>,
    shutdown: bool,
}

/// FIFO frame queue with a shutdown flag, shared between the submitting
/// thread and the worker.
pub(crate) struct FrameQueue {
    state: Mutex<QueueState>,
    available: Condvar,
    policy: QueuePolicy,
}

impl FrameQueue {
    pub(crate) fn new(policy: QueuePolicy) -> Self {
        Self {
            state: Mutex::new(QueueState {
                frames: VecDeque::new(),
                shutdown: false,
            }),
            available: Condvar::new(),
            policy,
        }
    }

    /// Enqueue a frame without blocking. Returns how many stale frames were
    /// dropped to make room (always 0 under FIFO).
    ///
    /// A frame submitted after shutdown is dropped on the spot; the worker
    /// that would consume it is already gone.
    pub(crate) fn submit(&self, frame: FrameBuffer) -> usize {
        let mut state = self.state.lock();
        if state.shutdown {
            trace!("frame submitted after shutdown, dropping");
            return 0;
        }

        let discarded = match self.policy {
            QueuePolicy::LatestWins => {
                let stale = state.frames.len();
                state.frames.clear();
                stale
            }
            QueuePolicy::Fifo => 0,
        };

        state.frames.push_back(frame);
        drop(state);
        self.available.notify_one();
        discarded
    }

    /// Block until a frame is available or shutdown is signalled.
    ///
    /// Returns `None` on shutdown, even if frames are still queued; the
    /// teardown path drains those separately.
    pub(crate) fn take_blocking(&self) -> Option<FrameBuffer> {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                return None;
            }
            if let Some(frame) = state.frames.pop_front() {
                return Some(frame);
            }
            self.available.wait(&mut state);
        }
    }

    /// Signal shutdown and wake the worker.
    pub(crate) fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        drop(state);
        self.available.notify_all();
    }

    /// Drop every frame still queued. Returns how many were dropped.
    pub(crate) fn drain(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.frames.len();
        state.frames.clear();
        dropped
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.state.lock().frames.len()
    }
}
