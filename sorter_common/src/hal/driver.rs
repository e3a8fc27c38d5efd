//! Actuator trait and error types.
//!
//! This module defines:
//! - `Stepper` trait - Interface for a named stepper actuator
//! - `MotionProfile` - Delay/acceleration profile attached to a move
//! - `HalError` enum - Error types for actuator operations

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for actuator operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HalError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Hardware communication error
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Command queue full; the command was dropped
    #[error("Command queue for '{name}' is full ({depth} pending)")]
    Backpressure {
        /// Actuator name.
        name: String,
        /// Commands pending when the new one was rejected.
        depth: usize,
    },

    /// Actuator is disabled and cannot move
    #[error("Actuator '{0}' is disabled")]
    Disabled(String),

    /// State persistence error
    #[error("State persistence error: {0}")]
    PersistenceError(String),
}

/// Step timing profile for a single move.
///
/// `delay_us` is the inter-step delay at cruise speed; `None` selects the
/// stepper's configured default. `acceleration` is the number of steps over
/// which the driver ramps from start speed to cruise (0 = no ramp).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MotionProfile {
    /// Cruise inter-step delay [µs].
    #[serde(default)]
    pub delay_us: Option<u32>,
    /// Ramp length [steps].
    #[serde(default)]
    pub acceleration: u32,
}

impl MotionProfile {
    /// Profile with an explicit delay and no ramp.
    pub const fn with_delay(delay_us: u32) -> Self {
        Self {
            delay_us: Some(delay_us),
            acceleration: 0,
        }
    }
}

/// Convert output degrees to whole steps (truncating toward zero).
#[inline]
pub fn degrees_to_steps(degrees: f64, total_steps_per_rev: u32) -> i64 {
    ((degrees / 360.0) * total_steps_per_rev as f64) as i64
}

/// Trait for a named stepper actuator.
///
/// Moves are relative and non-blocking: the driver queues the command and
/// returns. The driver tracks the absolute position (in steps) of every
/// command it accepted, and persists it so the position survives restarts.
///
/// # Contract
///
/// - A rejected command (`Err`) does not change `position_steps()`.
/// - `rotate(0.0, ..)` is a valid no-op move.
pub trait Stepper: Send {
    /// Actuator name (e.g. "carousel").
    fn name(&self) -> &str;

    /// Full-step count × microstepping for one revolution.
    fn total_steps_per_rev(&self) -> u32;

    /// Queue a relative move of `steps`.
    fn move_steps(&mut self, steps: i64, profile: &MotionProfile) -> Result<(), HalError>;

    /// Last known absolute position [steps].
    fn position_steps(&self) -> i64;

    /// Overwrite the absolute position (homing, restore).
    fn set_position_steps(&mut self, steps: i64) -> Result<(), HalError>;

    /// Energize or release the motor.
    fn set_enabled(&mut self, enabled: bool) -> Result<(), HalError>;

    /// Queue a relative rotation in degrees. Returns the step count issued.
    fn rotate(&mut self, degrees: f64, profile: &MotionProfile) -> Result<i64, HalError> {
        let steps = degrees_to_steps(degrees, self.total_steps_per_rev());
        self.move_steps(steps, profile)?;
        Ok(steps)
    }

    /// Absolute position in degrees of motor rotation.
    fn position_degrees(&self) -> f64 {
        self.position_steps() as f64 * 360.0 / self.total_steps_per_rev() as f64
    }
}
