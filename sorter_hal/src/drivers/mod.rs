//! Stepper driver implementations.
//!
//! - [`simulation`] - Software simulation driver for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `Stepper` trait from `sorter_common::hal::driver`
//! 3. Register its factory in [`register_all_drivers`]

pub mod simulation;

use crate::driver_registry::DriverRegistry;
use sorter_common::hal::driver::HalError;

/// Register all built-in drivers.
///
/// # Errors
/// `HalError::ConfigError` if a driver name is already taken.
pub fn register_all_drivers(registry: &mut DriverRegistry) -> Result<(), HalError> {
    registry.register("simulation", simulation::create_stepper)
}
