//! Prelude module for common re-exports.
//!
//! `use sorter_common::prelude::*;` brings in the types most sorter code
//! touches without listing individual paths.
//!
//! # Usage
//!
//! ```rust
//! use sorter_common::prelude::*;
//!
//! let piece = TrackedPiece::new();
//! assert_eq!(piece.status, PieceStatus::Created);
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::pipeline::config::SorterConfig;

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{EXIT_POSITION, FEEDER_POSITION, MISC_CATEGORY, NUM_PLATFORMS, TICK_MS};

// ─── Pipeline ───────────────────────────────────────────────────────
pub use crate::pipeline::events::{EventSender, SorterEvent};
pub use crate::pipeline::piece::{BinAddress, BinSize, PieceStatus, TrackedPiece};

// ─── Collaborators ──────────────────────────────────────────────────
pub use crate::classify::{Classification, Classifier, SortingProfile};
pub use crate::hal::driver::{HalError, MotionProfile, Stepper};
pub use crate::store::{BindingStore, CategoryMatrix, PositionStore, StoreError};
pub use crate::vision::{FeederSnapshot, VisionSource};
