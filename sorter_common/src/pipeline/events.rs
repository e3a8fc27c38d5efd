//! Outbound pipeline events.
//!
//! Events are pushed onto an unbounded channel for the telemetry/UI layer.
//! Sending is fire-and-forget: a disconnected receiver is not an error.

use super::piece::{BinAddress, TrackedPiece};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};

/// Lifecycle event for a piece or the bin layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "data", rename_all = "snake_case")]
pub enum SorterEvent {
    /// A new piece entered the carousel.
    PieceCreated(TrackedPiece),
    /// Status, classification, category or bin of a piece changed.
    PieceUpdated(TrackedPiece),
    /// A category was bound to a previously free bin.
    BinAssigned {
        address: BinAddress,
        category_id: String,
    },
    /// A piece left the carousel without being distributed.
    PieceLost(TrackedPiece),
}

impl SorterEvent {
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::PieceCreated(_) => "piece_created",
            Self::PieceUpdated(_) => "piece_updated",
            Self::BinAssigned { .. } => "bin_assigned",
            Self::PieceLost(_) => "piece_lost",
        }
    }
}

/// Cloneable sending half of the event channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Option<Sender<SorterEvent>>,
}

impl EventSender {
    /// Sender that discards every event.
    pub const fn disabled() -> Self {
        Self { tx: None }
    }

    /// Emit an event; dropped silently if nobody listens.
    pub fn emit(&self, event: SorterEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

/// Create a connected sender/receiver pair.
pub fn event_channel() -> (EventSender, Receiver<SorterEvent>) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx: Some(tx) }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emitted_events_arrive_in_order() {
        let (tx, rx) = event_channel();
        let piece = TrackedPiece::new();
        tx.emit(SorterEvent::PieceCreated(piece.clone()));
        tx.emit(SorterEvent::PieceUpdated(piece));
        assert_eq!(rx.try_recv().unwrap().tag(), "piece_created");
        assert_eq!(rx.try_recv().unwrap().tag(), "piece_updated");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn emit_after_receiver_dropped_is_silent() {
        let (tx, rx) = event_channel();
        drop(rx);
        tx.emit(SorterEvent::BinAssigned {
            address: BinAddress::new(0, 0, 0),
            category_id: "misc".to_string(),
        });
        EventSender::disabled().emit(SorterEvent::PieceLost(TrackedPiece::new()));
    }

    #[test]
    fn events_serialize_tagged() {
        let event = SorterEvent::BinAssigned {
            address: BinAddress::new(0, 1, 2),
            category_id: "plates".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["tag"], "bin_assigned");
        assert_eq!(json["data"]["category_id"], "plates");
        assert_eq!(json["data"]["address"]["bin"], 2);
    }
}
