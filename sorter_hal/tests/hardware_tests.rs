//! Hardware bundle against the JSON store.
//!
//! Positions written by one `SorterHardware` instance must be restored by
//! the next one opened on the same data file, alongside bin bindings.

use sorter_common::hal::config::HardwareConfig;
use sorter_common::hal::driver::MotionProfile;
use sorter_common::store::BindingStore;
use sorter_hal::{BlobStore, DriverRegistry, SorterHardware};
use std::sync::Arc;
use tempfile::TempDir;

fn open(dir: &TempDir) -> (Arc<BlobStore>, SorterHardware) {
    let store = Arc::new(BlobStore::open(dir.path().join("data.json")).unwrap());
    let registry = DriverRegistry::with_builtin().unwrap();
    let hw = SorterHardware::from_config(&HardwareConfig::default(), &registry, store.clone())
        .unwrap();
    (store, hw)
}

#[test]
fn positions_survive_restart() {
    let dir = TempDir::new().unwrap();
    {
        let (store, hw) = open(&dir);
        hw.carousel
            .lock()
            .rotate(-90.0, &MotionProfile::default())
            .unwrap();
        hw.chute
            .lock()
            .rotate(180.0, &MotionProfile::default())
            .unwrap();
        assert_eq!(store.write_count(), 2);
    }

    let (_store, hw) = open(&dir);
    assert_eq!(hw.carousel.lock().position_steps(), -400);
    assert_eq!(hw.chute.lock().position_steps(), 800);
    assert_eq!(hw.intake.lock().position_steps(), 0);
}

#[test]
fn bindings_and_positions_share_one_document() {
    let dir = TempDir::new().unwrap();
    {
        let (store, hw) = open(&dir);
        store
            .save_bindings(&vec![vec![vec![Some("misc".to_string()), None]]])
            .unwrap();
        hw.chute
            .lock()
            .move_steps(42, &MotionProfile::default())
            .unwrap();
    }

    let (store, hw) = open(&dir);
    assert_eq!(hw.chute.lock().position_steps(), 42);
    let matrix = store.load_bindings().unwrap().unwrap();
    assert_eq!(matrix[0][0][0].as_deref(), Some("misc"));
    assert_eq!(store.snapshot().stepper_positions.len(), 1);
}
