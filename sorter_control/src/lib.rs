//! # Sorter Control Library
//!
//! Pipeline core of the parts sorter. A piece drops from the feeder onto
//! the carousel, is photographed and classified while the carousel turns,
//! and falls through the chute into the bin bound to its category.
//!
//! ## Modules
//!
//! - [`cycle`]: `Coordinator`, owner of the machines and the tick loop
//! - [`state`]: feeder, classification and distribution state machines
//! - [`carousel`]: platform tracking and outstanding classifications
//! - [`feeder`]: feeder channel analysis from fiducial markers
//! - [`distribution`]: bin layout, category binding and chute addressing
//! - [`worker`]: cancellable background workers used by blocking states
//! - [`config`]: configuration loading and validation
//! - [`profile`]: part → category mapping from the parts file
//!
//! ## Handshake
//!
//! The machines coordinate only through [`shared::SharedState`]:
//! `classification_ready` gates the feeder, `distribution_ready` gates the
//! carousel, and `pending_piece` carries a resolved piece from the exit
//! platform to distribution.

pub mod carousel;
pub mod config;
pub mod cycle;
pub mod distribution;
pub mod error;
pub mod feeder;
pub mod piece;
pub mod profile;
pub mod shared;
pub mod state;
pub mod worker;

pub use crate::cycle::{Collaborators, Coordinator};
pub use crate::error::SorterError;
