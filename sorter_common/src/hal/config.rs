//! Hardware configuration types.
//!
//! - `HardwareConfig` - driver selection, persistent data file, steppers
//! - `StepperConfig` - per-stepper resolution and default step delay

use crate::consts::{DEFAULT_DATA_FILE, REQUIRED_STEPPERS};
use crate::hal::driver::HalError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Full steps per motor revolution (1.8° motors).
pub const STEPS_PER_REV_DEFAULT: u32 = 200;
/// Driver microstepping factor.
pub const MICROSTEPPING_DEFAULT: u32 = 8;
/// Inter-step delay used when a move does not specify one [µs].
pub const STEP_DELAY_US_DEFAULT: u32 = 400;
/// Commands a driver may hold before rejecting new ones.
pub const COMMAND_QUEUE_DEPTH_DEFAULT: usize = 64;

fn default_driver() -> String {
    "simulation".to_string()
}
fn default_data_file() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_FILE)
}
fn default_queue_depth() -> usize {
    COMMAND_QUEUE_DEPTH_DEFAULT
}
fn default_steppers() -> BTreeMap<String, StepperConfig> {
    REQUIRED_STEPPERS
        .iter()
        .map(|name| (name.to_string(), StepperConfig::default()))
        .collect()
}
fn default_steps_per_rev() -> u32 {
    STEPS_PER_REV_DEFAULT
}
fn default_microstepping() -> u32 {
    MICROSTEPPING_DEFAULT
}
fn default_step_delay() -> u32 {
    STEP_DELAY_US_DEFAULT
}

/// `[hardware]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareConfig {
    /// Registered driver to instantiate (e.g. "simulation").
    #[serde(default = "default_driver")]
    pub driver: String,

    /// JSON document holding stepper positions and bin bindings.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Per-driver command queue bound.
    #[serde(default = "default_queue_depth")]
    pub command_queue_depth: usize,

    /// Stepper definitions keyed by name.
    #[serde(default = "default_steppers")]
    pub steppers: BTreeMap<String, StepperConfig>,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            data_file: default_data_file(),
            command_queue_depth: default_queue_depth(),
            steppers: default_steppers(),
        }
    }
}

impl HardwareConfig {
    /// Validate the hardware section.
    ///
    /// # Errors
    /// `HalError::ConfigError` if the driver name is empty, a required
    /// stepper is missing, or any stepper definition is invalid.
    pub fn validate(&self) -> Result<(), HalError> {
        if self.driver.trim().is_empty() {
            return Err(HalError::ConfigError("driver cannot be empty".to_string()));
        }
        if self.command_queue_depth == 0 {
            return Err(HalError::ConfigError(
                "command_queue_depth must be > 0".to_string(),
            ));
        }
        for name in REQUIRED_STEPPERS {
            if !self.steppers.contains_key(name) {
                return Err(HalError::ConfigError(format!(
                    "missing stepper definition '{name}'"
                )));
            }
        }
        for (name, stepper) in &self.steppers {
            stepper.validate(name)?;
        }
        Ok(())
    }
}

/// `[hardware.steppers.<name>]` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepperConfig {
    /// Full steps per revolution.
    #[serde(default = "default_steps_per_rev")]
    pub steps_per_rev: u32,
    /// Microstepping factor.
    #[serde(default = "default_microstepping")]
    pub microstepping: u32,
    /// Inter-step delay when the move gives none [µs].
    #[serde(default = "default_step_delay")]
    pub default_delay_us: u32,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            steps_per_rev: STEPS_PER_REV_DEFAULT,
            microstepping: MICROSTEPPING_DEFAULT,
            default_delay_us: STEP_DELAY_US_DEFAULT,
        }
    }
}

impl StepperConfig {
    /// Steps per revolution including microstepping.
    #[inline]
    pub const fn total_steps_per_rev(&self) -> u32 {
        self.steps_per_rev * self.microstepping
    }

    fn validate(&self, name: &str) -> Result<(), HalError> {
        if self.steps_per_rev == 0 || self.microstepping == 0 {
            return Err(HalError::ConfigError(format!(
                "stepper '{name}': steps_per_rev and microstepping must be > 0"
            )));
        }
        if self.default_delay_us == 0 {
            return Err(HalError::ConfigError(format!(
                "stepper '{name}': default_delay_us must be > 0"
            )));
        }
        Ok(())
    }
}
