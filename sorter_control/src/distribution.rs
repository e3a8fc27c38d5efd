//! Bin layout, category assignment and chute addressing.

pub mod chute;
pub mod layout;

pub use chute::{Chute, ChuteGeometry};
pub use layout::{Assignment, BinLayout, LayoutError};
