//! Pieces travelling from pickup to bin.

use super::{Harness, fast_config, layout, pickup_snapshot, top_crop};
use sorter_common::classify::Classification;
use sorter_common::consts::MISC_CATEGORY;
use sorter_common::pipeline::events::SorterEvent;
use sorter_common::pipeline::piece::{BinAddress, PieceStatus};
use sorter_control::profile::JsonSortingProfile;
use sorter_hal::MemoryStore;
use sorter_hal::drivers::simulation::SimulatedClassifier;
use std::sync::Arc;
use std::time::Duration;

fn bricks_profile() -> JsonSortingProfile {
    JsonSortingProfile::from_pairs([("3001", "bricks")])
}

#[test]
fn classified_piece_reaches_its_category_bin() {
    let mut config = fast_config();
    config.layout.layers = layout(&[2, 2]);
    let classifier =
        SimulatedClassifier::fixed(Classification::identified("3001", 0.93), Duration::ZERO)
            .unwrap();
    let store = Arc::new(MemoryStore::new());
    let mut h = Harness::new(&config, Arc::new(classifier), bricks_profile(), store.clone());
    h.vision.set_crops(top_crop());
    h.vision.set_snapshot(pickup_snapshot());

    h.tick_until("first drop", |h| !h.distributed().is_empty());

    let first = h.created()[0];
    let dropped = &h.distributed()[0];
    assert_eq!(dropped.id, first);
    assert_eq!(dropped.part_id.as_deref(), Some("3001"));
    assert_eq!(dropped.category_id.as_deref(), Some("bricks"));
    assert_eq!(dropped.destination_bin, Some(BinAddress::new(0, 0, 0)));
    assert!(dropped.thumbnail.is_some());
    assert_eq!(
        h.status_trail(first),
        vec![
            PieceStatus::Created,
            PieceStatus::Classifying,
            PieceStatus::Classified,
            PieceStatus::Distributing,
            PieceStatus::Distributed,
        ]
    );

    // the drop needed three more pickups behind the first piece
    assert!(h.created().len() >= 4);
    assert_eq!(h.coordinator.lost_pieces(), 0);
    assert!(h.seen.iter().any(|e| matches!(
        e,
        SorterEvent::BinAssigned { category_id, .. } if category_id == "bricks"
    )));
    assert_eq!(store.binding_writes(), 1);
    assert_ne!(h.hardware.chute.lock().position_steps(), 0);

    // same part again: same bin, nothing new persisted
    h.tick_until("second drop", |h| h.distributed().len() >= 2);
    let second = &h.distributed()[1];
    assert_eq!(second.category_id.as_deref(), Some("bricks"));
    assert_eq!(second.destination_bin, Some(BinAddress::new(0, 0, 0)));
    assert_eq!(store.binding_writes(), 1);
}

#[test]
fn uncropped_pieces_sort_to_misc() {
    let mut config = fast_config();
    config.layout.layers = layout(&[3]);
    let classifier =
        SimulatedClassifier::fixed(Classification::identified("3001", 0.9), Duration::ZERO)
            .unwrap();
    let mut h = Harness::new(
        &config,
        Arc::new(classifier),
        bricks_profile(),
        Arc::new(MemoryStore::new()),
    );
    h.vision.set_snapshot(pickup_snapshot());

    h.tick_until("two drops", |h| h.distributed().len() >= 2);

    for piece in h.distributed() {
        assert_eq!(piece.category_id.as_deref(), Some(MISC_CATEGORY));
        assert!(piece.part_id.is_none());
        assert!(h.status_trail(piece.id).contains(&PieceStatus::NotFound));
    }
    let layout = h.coordinator.distribution().layout();
    assert_eq!(layout.bound_count(), 1);
    assert_eq!(layout.find_bin(MISC_CATEGORY), Some(BinAddress::new(0, 0, 0)));
}

#[test]
fn silent_classifier_times_out_to_unknown() {
    let mut config = fast_config();
    config.layout.layers = layout(&[3]);
    let mut h = Harness::new(
        &config,
        Arc::new(SimulatedClassifier::deferred()),
        bricks_profile(),
        Arc::new(MemoryStore::new()),
    );
    h.vision.set_crops(top_crop());
    h.vision.set_snapshot(pickup_snapshot());

    h.tick_until("first drop", |h| !h.distributed().is_empty());

    let dropped = &h.distributed()[0];
    assert_eq!(dropped.category_id.as_deref(), Some(MISC_CATEGORY));
    let trail = h.status_trail(dropped.id);
    assert!(trail.contains(&PieceStatus::Classifying));
    assert!(trail.contains(&PieceStatus::Unknown));
    assert!(!trail.contains(&PieceStatus::Classified));
    assert_eq!(h.coordinator.lost_pieces(), 0);
}

#[test]
fn carousel_never_holds_more_than_its_platforms() {
    let mut config = fast_config();
    config.layout.layers = layout(&[3]);
    let classifier =
        SimulatedClassifier::fixed(Classification::none(), Duration::from_millis(2)).unwrap();
    let mut h = Harness::new(
        &config,
        Arc::new(classifier),
        bricks_profile(),
        Arc::new(MemoryStore::new()),
    );
    h.vision.set_crops(top_crop());
    h.vision.set_snapshot(pickup_snapshot());

    h.tick_until("five drops", |h| {
        assert!(h.coordinator.carousel().lock().occupied() <= 4);
        h.distributed().len() >= 5
    });

    // every drop happened in creation order
    let created = h.created();
    let dropped: Vec<_> = h.distributed().iter().map(|p| p.id).collect();
    assert_eq!(&created[..dropped.len()], dropped.as_slice());
}
