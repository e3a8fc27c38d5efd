//! Shared piece handles.
//!
//! A piece is referenced from the carousel slot, the pending-classification
//! map, the classifier callback and the distribution machine at once. The
//! record itself is the plain [`TrackedPiece`] from `sorter_common`.

use parking_lot::Mutex;
use sorter_common::pipeline::events::{EventSender, SorterEvent};
use sorter_common::pipeline::piece::{PieceStatus, TrackedPiece};
use std::sync::Arc;
use uuid::Uuid;

pub type PieceRef = Arc<Mutex<TrackedPiece>>;

/// Fresh piece record in status `created`.
pub fn new_piece() -> PieceRef {
    Arc::new(Mutex::new(TrackedPiece::new()))
}

#[inline]
pub fn piece_id(piece: &PieceRef) -> Uuid {
    piece.lock().id
}

#[inline]
pub fn piece_status(piece: &PieceRef) -> PieceStatus {
    piece.lock().status
}

/// Mutate a piece, stamp `updated_at` and emit `PieceUpdated`.
///
/// The event carries a snapshot taken under the piece lock; the event is
/// sent after the lock is released.
pub fn update_piece(piece: &PieceRef, events: &EventSender, f: impl FnOnce(&mut TrackedPiece)) {
    let snapshot = {
        let mut record = piece.lock();
        f(&mut record);
        record.touch();
        record.clone()
    };
    events.emit(SorterEvent::PieceUpdated(snapshot));
}
