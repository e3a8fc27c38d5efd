//! Pipeline data model shared between the hardware and control crates.
//!
//! - [`config`] - `SorterConfig` and its per-subsystem sections
//! - [`piece`] - `TrackedPiece`, `PieceStatus`, bin addressing types
//! - [`events`] - outbound lifecycle events and their channel

pub mod config;
pub mod events;
pub mod piece;
