//! Scripted vision source.
//!
//! Feeder snapshots are served from a script queue; once the queue is
//! drained the last snapshot keeps being served. Classification frames and
//! crops are whatever was last set.

use parking_lot::Mutex;
use sorter_common::vision::{CropPair, FeederSnapshot, FramePair, VisionSource};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct SimulatedVision {
    script: Mutex<VecDeque<FeederSnapshot>>,
    current: Mutex<FeederSnapshot>,
    frames: Mutex<FramePair>,
    crops: Mutex<CropPair>,
    captures: AtomicU64,
}

impl SimulatedVision {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a snapshot to be served once, after those already queued.
    pub fn push_snapshot(&self, snapshot: FeederSnapshot) {
        self.script.lock().push_back(snapshot);
    }

    /// Replace the sticky snapshot and drop anything queued.
    pub fn set_snapshot(&self, snapshot: FeederSnapshot) {
        self.script.lock().clear();
        *self.current.lock() = snapshot;
    }

    pub fn set_frames(&self, frames: FramePair) {
        *self.frames.lock() = frames;
    }

    pub fn set_crops(&self, crops: CropPair) {
        *self.crops.lock() = crops;
    }

    /// Number of fresh-frame captures requested so far.
    pub fn capture_count(&self) -> u64 {
        self.captures.load(Ordering::Relaxed)
    }
}

impl VisionSource for SimulatedVision {
    fn feeder_snapshot(&self) -> FeederSnapshot {
        let next = self.script.lock().pop_front();
        let mut current = self.current.lock();
        if let Some(snapshot) = next {
            *current = snapshot;
        }
        current.clone()
    }

    fn capture_fresh_frames(&self, _timeout: Duration) -> FramePair {
        self.captures.fetch_add(1, Ordering::Relaxed);
        self.frames.lock().clone()
    }

    fn classification_crops(&self, _timeout: Duration) -> CropPair {
        self.crops.lock().clone()
    }
}
