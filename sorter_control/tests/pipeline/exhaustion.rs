//! Running out of bins.

use super::{Harness, fast_config, layout, pickup_snapshot, top_crop};
use sorter_common::classify::Classification;
use sorter_common::pipeline::piece::BinAddress;
use sorter_control::profile::JsonSortingProfile;
use sorter_hal::MemoryStore;
use sorter_hal::drivers::simulation::SimulatedClassifier;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[test]
fn exhausted_bins_abandon_pieces_and_keep_running() {
    let mut config = fast_config();
    config.layout.layers = layout(&[1]);

    // bricks, plates, bricks, plates, ...
    let answers = AtomicU32::new(0);
    let classifier = SimulatedClassifier::spawn(Duration::ZERO, move |_, _| {
        if answers.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            Classification::identified("3001", 0.9)
        } else {
            Classification::identified("3002", 0.9)
        }
    })
    .unwrap();
    let profile = JsonSortingProfile::from_pairs([("3001", "bricks"), ("3002", "plates")]);
    let mut h = Harness::new(
        &config,
        Arc::new(classifier),
        profile,
        Arc::new(MemoryStore::new()),
    );
    h.vision.set_crops(top_crop());
    h.vision.set_snapshot(pickup_snapshot());

    h.tick_until("a lost piece and two drops", |h| {
        !h.lost().is_empty() && h.distributed().len() >= 2
    });

    let created = h.created();
    assert_eq!(h.lost()[0], created[1]);
    assert!(h.coordinator.lost_pieces() >= 1);
    for piece in h.distributed() {
        assert_eq!(piece.category_id.as_deref(), Some("bricks"));
        assert_eq!(piece.destination_bin, Some(BinAddress::new(0, 0, 0)));
    }
    let layout = h.coordinator.distribution().layout();
    assert_eq!(layout.find_bin("plates"), None);
    assert_eq!(layout.bound_count(), 1);
}
