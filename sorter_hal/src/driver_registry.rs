//! Driver registry for stepper drivers.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving stepper
//! factories by driver name. Constructed at startup and passed by reference;
//! there is no global registry.

use sorter_common::hal::config::StepperConfig;
use sorter_common::hal::driver::{HalError, Stepper};
use sorter_common::store::PositionStore;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a factory needs to build one named stepper.
pub struct StepperSpec<'a> {
    pub name: &'a str,
    pub config: &'a StepperConfig,
    pub queue_depth: usize,
    pub store: Arc<dyn PositionStore>,
}

/// Creates one stepper instance.
pub type DriverFactory = fn(StepperSpec<'_>) -> Result<Box<dyn Stepper>, HalError>;

/// Registry of available stepper drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every built-in driver registered.
    ///
    /// # Errors
    /// Propagates a duplicate registration from [`crate::drivers::register_all_drivers`].
    pub fn with_builtin() -> Result<Self, HalError> {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry)?;
        Ok(registry)
    }

    /// Register a driver factory.
    ///
    /// # Errors
    /// `HalError::ConfigError` if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) -> Result<(), HalError> {
        if self.factories.contains_key(name) {
            return Err(HalError::ConfigError(format!(
                "Driver '{name}' is already registered"
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Create a stepper through the named driver.
    ///
    /// # Errors
    /// `HalError::DriverNotFound` if no driver with the given name is registered,
    /// or whatever the factory reports.
    pub fn create_stepper(
        &self,
        driver: &str,
        spec: StepperSpec<'_>,
    ) -> Result<Box<dyn Stepper>, HalError> {
        let factory = self
            .get_factory(driver)
            .ok_or_else(|| HalError::DriverNotFound(driver.to_string()))?;
        factory(spec)
    }

    /// List all registered driver names.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
