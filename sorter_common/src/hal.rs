//! Hardware abstraction layer interfaces and configuration.
//!
//! This module contains the actuator trait consumed by the pipeline and
//! the configuration types for the stepper drivers behind it.

pub mod config;
pub mod driver;
