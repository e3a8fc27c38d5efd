//! Hardware bundle.
//!
//! `SorterHardware` owns the five named steppers the pipeline drives. Each
//! stepper sits behind its own mutex: feeder pulses run on a background
//! worker while the tick thread commands the carousel and chute.

use parking_lot::Mutex;
use sorter_common::consts::{
    CAROUSEL_STEPPER, CHUTE_STEPPER, INNER_CHANNEL_STEPPER, INTAKE_STEPPER,
    OUTER_CHANNEL_STEPPER,
};
use sorter_common::hal::config::HardwareConfig;
use sorter_common::hal::driver::{HalError, Stepper};
use sorter_common::store::PositionStore;
use std::sync::Arc;
use tracing::{info, warn};

use crate::driver_registry::{DriverRegistry, StepperSpec};

/// Stepper shared between the tick thread and background workers.
pub type SharedStepper = Arc<Mutex<Box<dyn Stepper>>>;

/// Wrap a stepper for sharing.
pub fn share(stepper: Box<dyn Stepper>) -> SharedStepper {
    Arc::new(Mutex::new(stepper))
}

/// The machine's actuators.
#[derive(Clone)]
pub struct SorterHardware {
    pub carousel: SharedStepper,
    pub chute: SharedStepper,
    pub intake: SharedStepper,
    pub outer_channel: SharedStepper,
    pub inner_channel: SharedStepper,
}

impl SorterHardware {
    /// Build every stepper through the configured driver.
    ///
    /// # Errors
    /// `HalError::ConfigError` if the hardware section is invalid,
    /// `HalError::DriverNotFound` if the driver is not registered, or any
    /// factory error.
    pub fn from_config(
        config: &HardwareConfig,
        registry: &DriverRegistry,
        store: Arc<dyn PositionStore>,
    ) -> Result<Self, HalError> {
        config.validate()?;
        info!("Initializing hardware with driver '{}'...", config.driver);

        let build = |name: &str| -> Result<SharedStepper, HalError> {
            let stepper_config = config.steppers.get(name).ok_or_else(|| {
                HalError::ConfigError(format!("missing stepper definition '{name}'"))
            })?;
            let stepper = registry.create_stepper(
                &config.driver,
                StepperSpec {
                    name,
                    config: stepper_config,
                    queue_depth: config.command_queue_depth,
                    store: Arc::clone(&store),
                },
            )?;
            info!(
                "  Created stepper '{}' ({} steps/rev, at {} steps)",
                name,
                stepper.total_steps_per_rev(),
                stepper.position_steps()
            );
            Ok(share(stepper))
        };

        Ok(Self {
            carousel: build(CAROUSEL_STEPPER)?,
            chute: build(CHUTE_STEPPER)?,
            intake: build(INTAKE_STEPPER)?,
            outer_channel: build(OUTER_CHANNEL_STEPPER)?,
            inner_channel: build(INNER_CHANNEL_STEPPER)?,
        })
    }

    /// Look up a stepper by name.
    pub fn stepper(&self, name: &str) -> Option<&SharedStepper> {
        match name {
            CAROUSEL_STEPPER => Some(&self.carousel),
            CHUTE_STEPPER => Some(&self.chute),
            INTAKE_STEPPER => Some(&self.intake),
            OUTER_CHANNEL_STEPPER => Some(&self.outer_channel),
            INNER_CHANNEL_STEPPER => Some(&self.inner_channel),
            _ => None,
        }
    }

    fn all(&self) -> [&SharedStepper; 5] {
        [
            &self.carousel,
            &self.chute,
            &self.intake,
            &self.outer_channel,
            &self.inner_channel,
        ]
    }

    /// Energize every stepper.
    ///
    /// # Errors
    /// The first driver failure.
    pub fn enable_all(&self) -> Result<(), HalError> {
        for stepper in self.all() {
            stepper.lock().set_enabled(true)?;
        }
        Ok(())
    }

    /// Release every stepper. A failure is logged and the remaining
    /// steppers are still released.
    pub fn shutdown(&self) {
        info!("Disabling all steppers");
        for stepper in self.all() {
            let mut stepper = stepper.lock();
            if let Err(e) = stepper.set_enabled(false) {
                warn!("Failed to disable stepper '{}': {}", stepper.name(), e);
            }
        }
    }
}
