//! Carousel tracker.
//!
//! Four platform slots plus the map of pieces with an outstanding
//! classification request. The carousel is shared between the tick thread
//! and classifier callbacks behind one mutex ([`SharedCarousel`]); when a
//! piece lock is also needed it is always taken after the carousel lock.
//!
//! ```text
//!   slot 0        slot 1            slot 2          slot 3
//!   feeder  -->   classification -->  intermediate --> exit --> chute
//! ```

use parking_lot::Mutex;
use sorter_common::classify::Classification;
use sorter_common::consts::{CLASSIFICATION_POSITION, EXIT_POSITION, FEEDER_POSITION, NUM_PLATFORMS};
use sorter_common::pipeline::events::{EventSender, SorterEvent};
use sorter_common::pipeline::piece::PieceStatus;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::piece::{PieceRef, new_piece};

pub type SharedCarousel = Arc<Mutex<Carousel>>;

pub struct Carousel {
    platforms: [Option<PieceRef>; NUM_PLATFORMS],
    pending: HashMap<Uuid, PieceRef>,
    events: EventSender,
}

impl Carousel {
    pub fn new(events: EventSender) -> Self {
        Self {
            platforms: Default::default(),
            pending: HashMap::new(),
            events,
        }
    }

    pub fn shared(events: EventSender) -> SharedCarousel {
        Arc::new(Mutex::new(Self::new(events)))
    }

    /// Create a piece on the feeder platform and emit `PieceCreated`.
    ///
    /// The feeder slot is always empty after a rotation; a piece already
    /// there is replaced and reported.
    pub fn add_piece_at_feeder(&mut self) -> PieceRef {
        let piece = new_piece();
        let snapshot = piece.lock().clone();
        if let Some(previous) = self.platforms[FEEDER_POSITION].replace(Arc::clone(&piece)) {
            warn!(
                "carousel: feeder platform already held {}, replacing",
                previous.lock().short_id()
            );
        }
        info!("carousel: piece {} created at feeder", snapshot.short_id());
        self.events.emit(SorterEvent::PieceCreated(snapshot));
        piece
    }

    /// Shift every slot one position forward.
    ///
    /// Returns the piece that was on the exit platform, if any. Slot 0 is
    /// empty afterwards.
    pub fn rotate(&mut self) -> Option<PieceRef> {
        let exiting = self.platforms[EXIT_POSITION].take();
        self.platforms.rotate_right(1);
        debug!("carousel: rotated {}", self.summary());
        exiting
    }

    pub fn piece_at(&self, position: usize) -> Option<PieceRef> {
        self.platforms.get(position).and_then(Clone::clone)
    }

    pub fn piece_at_classification(&self) -> Option<PieceRef> {
        self.piece_at(CLASSIFICATION_POSITION)
    }

    pub fn piece_at_exit(&self) -> Option<PieceRef> {
        self.piece_at(EXIT_POSITION)
    }

    /// Remove and return the piece at `position`.
    pub fn clear_position(&mut self, position: usize) -> Option<PieceRef> {
        self.platforms.get_mut(position).and_then(Option::take)
    }

    pub fn occupied(&self) -> usize {
        self.platforms.iter().filter(|p| p.is_some()).count()
    }

    /// Register a piece whose classification request is about to be sent.
    pub fn mark_pending_classification(&mut self, piece: &PieceRef) {
        let id = piece.lock().id;
        self.pending.insert(id, Arc::clone(piece));
    }

    pub fn is_pending(&self, id: &Uuid) -> bool {
        self.pending.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Apply a classifier answer.
    ///
    /// The piece becomes `classified` when a part id is present, `unknown`
    /// otherwise. Returns `false` (and changes nothing) if `id` is not
    /// pending, which makes late or repeated answers harmless.
    pub fn resolve_classification(&mut self, id: Uuid, result: Classification) -> bool {
        let Some(piece) = self.pending.remove(&id) else {
            debug!("carousel: stale classification for {} ignored", id);
            return false;
        };
        let snapshot = {
            let mut record = piece.lock();
            record.status = if result.part_id.is_some() {
                PieceStatus::Classified
            } else {
                PieceStatus::Unknown
            };
            record.part_id = result.part_id;
            record.confidence = result.confidence;
            record.touch();
            record.clone()
        };
        info!(
            "carousel: piece {} {} (part {:?}, confidence {:?})",
            snapshot.short_id(),
            snapshot.status,
            snapshot.part_id,
            snapshot.confidence
        );
        self.events.emit(SorterEvent::PieceUpdated(snapshot));
        true
    }

    /// Give up on an outstanding classification and mark the piece unknown.
    pub fn force_resolve(&mut self, id: Uuid) -> bool {
        if self.pending.contains_key(&id) {
            warn!("carousel: classification of {} timed out", id);
        }
        self.resolve_classification(id, Classification::none())
    }

    /// One-line slot summary, e.g. `[1a2b3c4d, -, -, 9f8e7d6c]`.
    pub fn summary(&self) -> String {
        let slots: Vec<String> = self
            .platforms
            .iter()
            .map(|slot| match slot {
                Some(piece) => piece.lock().short_id(),
                None => "-".to_string(),
            })
            .collect();
        format!("[{}]", slots.join(", "))
    }
}
