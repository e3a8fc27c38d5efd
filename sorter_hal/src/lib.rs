//! # Sorter HAL Library
//!
//! Actuator, vision and classifier backends for the sorter pipeline.
//!
//! Steppers implement the `Stepper` trait defined in
//! `sorter_common::hal::driver` and are created by name through the
//! [`driver_registry`]. Machine state that must survive restarts lives in
//! the JSON [`state`] store.
//!
//! # Module Structure
//!
//! - [`core`] - `SorterHardware`, the bundle of named steppers
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations (simulation)
//! - [`state`] - Persistent JSON store for positions and bin bindings
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    sorter_hal (single crate)                     │
//! │  ┌─────────────┐    ┌────────────────┐    ┌──────────────────┐   │
//! │  │  BlobStore  │◄───│ SorterHardware │◄───│ Driver Registry  │   │
//! │  │   (JSON)    │    │  5 × Stepper   │    │                  │   │
//! │  └─────────────┘    └───────┬────────┘    └──────────────────┘   │
//! │                             │                                    │
//! │                             ▼                                    │
//! │                   ┌──────────────────┐                           │
//! │                   │ Stepper (trait   │                           │
//! │                   │ object per name) │                           │
//! │                   └──────────────────┘                           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod core;
pub mod driver_registry;
pub mod drivers;
pub mod state;

// Re-export key types for convenience
pub use crate::core::{SharedStepper, SorterHardware, share};
pub use crate::driver_registry::{DriverFactory, DriverRegistry, StepperSpec};
pub use crate::state::{BlobStore, MemoryStore, PersistedState};
