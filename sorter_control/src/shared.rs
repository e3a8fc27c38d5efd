//! Pipeline handshake flags.
//!
//! Owned by the coordinator and passed `&mut` into every machine's step,
//! so it needs no lock: all three machines run on the tick thread.

use crate::piece::PieceRef;
use std::fmt;

pub struct SharedState {
    /// Classification can accept a new piece; FEEDING runs only while set.
    pub classification_ready: bool,
    /// Distribution is idle or the chute is positioned; ROTATING runs only
    /// while set. Cleared by the classification side as drop confirmation.
    pub distribution_ready: bool,
    /// Piece handed from classification to distribution.
    pub pending_piece: Option<PieceRef>,
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            classification_ready: true,
            distribution_ready: true,
            pending_piece: None,
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedState")
            .field("classification_ready", &self.classification_ready)
            .field("distribution_ready", &self.distribution_ready)
            .field(
                "pending_piece",
                &self.pending_piece.as_ref().map(|p| p.lock().short_id()),
            )
            .finish()
    }
}
