//! Shared harness for pipeline tests.

mod exhaustion;
mod flow;
mod restart;

use sorter_common::consts::{CAROUSEL_CLASS_ID, OBJECT_CLASS_ID};
use sorter_common::pipeline::config::LayerConfig;
use sorter_common::pipeline::events::event_channel;
use sorter_common::prelude::*;
use sorter_common::vision::{CropPair, DetectedMask, ImageCrop, Mask};
use sorter_control::profile::JsonSortingProfile;
use sorter_control::{Collaborators, Coordinator};
use sorter_hal::drivers::simulation::SimulatedVision;
use sorter_hal::{DriverRegistry, SorterHardware};
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Default machine with every wait cut to zero.
pub fn fast_config() -> SorterConfig {
    let mut config = SorterConfig::default();
    config.pipeline.tick_ms = 1;
    config.classification.rotate_settle_ms = 0;
    config.classification.snap_delay_ms = 0;
    config.classification.capture_timeout_ms = 10;
    config.classification.timeout_ms = 30;
    config.distribution.position_settle_ms = 0;
    config.distribution.send_ms = 0;
    config.feeder.pause_ms = 1;
    config
}

/// One layer of `sections`, each a list of small bins.
pub fn layout(sections: &[usize]) -> Vec<LayerConfig> {
    vec![LayerConfig {
        sections: sections.iter().map(|&n| vec![BinSize::Small; n]).collect(),
    }]
}

/// An object resting against the carousel platform.
pub fn pickup_snapshot() -> FeederSnapshot {
    let mut snap = FeederSnapshot::default();
    snap.push(DetectedMask {
        mask: Mask::from_rect(40, 40, 10, 10, 20, 20),
        confidence: 0.9,
        class_id: OBJECT_CLASS_ID,
        instance_id: 1,
    });
    snap.push(DetectedMask {
        mask: Mask::from_rect(40, 40, 20, 0, 40, 40),
        confidence: 0.99,
        class_id: CAROUSEL_CLASS_ID,
        instance_id: 2,
    });
    snap
}

pub fn top_crop() -> CropPair {
    CropPair {
        top: Some(ImageCrop {
            jpeg: vec![0xff, 0xd8, 0xff, 0xd9],
            width: 64,
            height: 48,
        }),
        bottom: None,
    }
}

pub struct Harness {
    pub coordinator: Coordinator,
    pub vision: Arc<SimulatedVision>,
    pub hardware: SorterHardware,
    events: Receiver<SorterEvent>,
    pub seen: Vec<SorterEvent>,
}

impl Harness {
    pub fn new<S>(
        config: &SorterConfig,
        classifier: Arc<dyn Classifier>,
        profile: JsonSortingProfile,
        store: Arc<S>,
    ) -> Self
    where
        S: BindingStore + PositionStore + 'static,
    {
        let registry = DriverRegistry::with_builtin().unwrap();
        let hardware =
            SorterHardware::from_config(&config.hardware, &registry, store.clone()).unwrap();
        hardware.enable_all().unwrap();
        let vision = Arc::new(SimulatedVision::new());
        let (events, rx) = event_channel();
        let coordinator = Coordinator::new(
            config,
            Collaborators {
                hardware: hardware.clone(),
                vision: vision.clone(),
                classifier,
                profile: Arc::new(profile),
                bindings: store,
                events,
            },
        );
        Self {
            coordinator,
            vision,
            hardware,
            events: rx,
            seen: Vec::new(),
        }
    }

    /// Tick until `done` holds, failing after a generous deadline.
    pub fn tick_until(&mut self, what: &str, mut done: impl FnMut(&Self) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !done(self) {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            self.coordinator.step();
            self.seen.extend(self.events.try_iter());
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Ids of created pieces, in creation order.
    pub fn created(&self) -> Vec<Uuid> {
        self.seen
            .iter()
            .filter_map(|e| match e {
                SorterEvent::PieceCreated(p) => Some(p.id),
                _ => None,
            })
            .collect()
    }

    /// Final records of distributed pieces, in drop order.
    pub fn distributed(&self) -> Vec<TrackedPiece> {
        self.seen
            .iter()
            .filter_map(|e| match e {
                SorterEvent::PieceUpdated(p) if p.status == PieceStatus::Distributed => {
                    Some(p.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Distinct consecutive statuses `id` went through.
    pub fn status_trail(&self, id: Uuid) -> Vec<PieceStatus> {
        let mut trail: Vec<PieceStatus> = Vec::new();
        for event in &self.seen {
            if let SorterEvent::PieceCreated(p) | SorterEvent::PieceUpdated(p) = event {
                if p.id == id && trail.last() != Some(&p.status) {
                    trail.push(p.status);
                }
            }
        }
        trail
    }

    pub fn lost(&self) -> Vec<Uuid> {
        self.seen
            .iter()
            .filter_map(|e| match e {
                SorterEvent::PieceLost(p) => Some(p.id),
                _ => None,
            })
            .collect()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.coordinator.cleanup();
    }
}
