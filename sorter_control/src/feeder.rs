//! Feeder channel analysis.

pub mod analysis;

pub use analysis::{Channel, ChannelGeometry, FeedAction, Occupancy};
