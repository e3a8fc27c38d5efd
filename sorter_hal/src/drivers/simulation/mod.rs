//! Simulation driver module.
//!
//! Software stand-ins for the steppers, cameras and classifier, for
//! development and testing without physical hardware.

mod classifier;
mod stepper;
mod vision;

pub use classifier::SimulatedClassifier;
pub use stepper::{CommandLog, SimulatedStepper, StepCommand};
pub use vision::SimulatedVision;

use crate::driver_registry::StepperSpec;
use sorter_common::hal::driver::{HalError, Stepper};

/// Factory function creating a simulated stepper.
pub fn create_stepper(spec: StepperSpec<'_>) -> Result<Box<dyn Stepper>, HalError> {
    let stepper = SimulatedStepper::new(spec.name, *spec.config)
        .with_queue_depth(spec.queue_depth)
        .with_store(spec.store);
    Ok(Box::new(stepper))
}
