//! State carried across a restart through the data file.

use super::{Harness, fast_config, layout, pickup_snapshot, top_crop};
use sorter_common::classify::Classification;
use sorter_common::pipeline::piece::BinAddress;
use sorter_control::profile::JsonSortingProfile;
use sorter_hal::BlobStore;
use sorter_hal::drivers::simulation::SimulatedClassifier;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn harness(config: &sorter_common::pipeline::config::SorterConfig) -> Harness {
    let store = Arc::new(BlobStore::open(&config.hardware.data_file).unwrap());
    let classifier =
        SimulatedClassifier::fixed(Classification::identified("3001", 0.9), Duration::ZERO)
            .unwrap();
    Harness::new(
        config,
        Arc::new(classifier),
        JsonSortingProfile::from_pairs([("3001", "bricks"), ("3003", "plates")]),
        store,
    )
}

#[test]
fn bindings_and_chute_position_survive_restart() {
    let dir = TempDir::new().unwrap();
    let mut config = fast_config();
    config.hardware.data_file = dir.path().join("data.json");
    config.layout.layers = layout(&[2, 2]);

    let chute_steps = {
        let mut h = harness(&config);
        h.vision.set_crops(top_crop());
        h.vision.set_snapshot(pickup_snapshot());
        h.tick_until("first drop", |h| !h.distributed().is_empty());
        let steps = h.hardware.chute.lock().position_steps();
        assert_ne!(steps, 0);
        steps
    };

    let h = harness(&config);
    assert_eq!(h.hardware.chute.lock().position_steps(), chute_steps);
    let layout = h.coordinator.distribution().layout();
    assert_eq!(layout.find_bin("bricks"), Some(BinAddress::new(0, 0, 0)));
    assert_eq!(layout.bound_count(), 1);
}

#[test]
fn saved_bindings_for_another_layout_are_ignored() {
    let dir = TempDir::new().unwrap();
    let mut config = fast_config();
    config.hardware.data_file = dir.path().join("data.json");
    config.layout.layers = layout(&[2, 2]);
    {
        let mut h = harness(&config);
        h.vision.set_crops(top_crop());
        h.vision.set_snapshot(pickup_snapshot());
        h.tick_until("first drop", |h| !h.distributed().is_empty());
    }

    config.layout.layers = layout(&[3]);
    let h = harness(&config);
    assert_eq!(h.coordinator.distribution().layout().bound_count(), 0);
}
