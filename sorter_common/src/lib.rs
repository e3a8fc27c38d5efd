//! Sorter Common Library
//!
//! This crate provides shared constants, types, collaborator interfaces and
//! configuration loading utilities for all sorter workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Carousel geometry, class ids, stepper names
//! - [`config`] - Configuration loading traits and types
//! - [`pipeline`] - Pipeline configuration, piece records, outbound events
//! - [`hal`] - Actuator trait, motion profiles, stepper configuration
//! - [`vision`] - Detection masks, feeder snapshots, classification crops
//! - [`classify`] - Classifier and sorting-profile interfaces
//! - [`store`] - Persistence interfaces for bin bindings and stepper positions
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use sorter_common::prelude::*;
//! use sorter_common::pipeline::piece::PieceStatus;
//! ```

pub mod classify;
pub mod config;
pub mod consts;
pub mod hal;
pub mod pipeline;
pub mod prelude;
pub mod store;
pub mod vision;
