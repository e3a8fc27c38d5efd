//! Simulated stepper.
//!
//! Accepts relative moves, keeps the absolute position, persists it on
//! every accepted move and records every command for inspection. Motion
//! takes simulated time (`|steps| × delay`), so a burst of commands fills
//! the command queue and is rejected with `HalError::Backpressure`.

use parking_lot::Mutex;
use sorter_common::hal::config::StepperConfig;
use sorter_common::hal::driver::{HalError, MotionProfile, Stepper};
use sorter_common::store::PositionStore;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepCommand {
    pub steps: i64,
    pub delay_us: u32,
    pub acceleration: u32,
}

/// Shared handle to a stepper's command history.
pub type CommandLog = Arc<Mutex<Vec<StepCommand>>>;

pub struct SimulatedStepper {
    name: String,
    config: StepperConfig,
    position: i64,
    enabled: bool,
    queue_depth: usize,
    /// Completion instants of commands still "moving".
    in_flight: VecDeque<Instant>,
    log: CommandLog,
    store: Option<Arc<dyn PositionStore>>,
    realtime: bool,
}

impl SimulatedStepper {
    /// Stepper with instantaneous motion and no persistence.
    pub fn new(name: impl Into<String>, config: StepperConfig) -> Self {
        Self {
            name: name.into(),
            config,
            position: 0,
            enabled: true,
            queue_depth: usize::MAX,
            in_flight: VecDeque::new(),
            log: Arc::new(Mutex::new(Vec::new())),
            store: None,
            realtime: false,
        }
    }

    /// Restore the last persisted position and persist every future move.
    pub fn with_store(mut self, store: Arc<dyn PositionStore>) -> Self {
        match store.load_position(&self.name) {
            Ok(Some(steps)) => {
                debug!("{}: restored position {} steps", self.name, steps);
                self.position = steps;
            }
            Ok(None) => {}
            Err(e) => warn!("{}: could not restore position: {}", self.name, e),
        }
        self.store = Some(store);
        self
    }

    /// Simulate motion time and bound the number of moves in flight.
    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self.realtime = true;
        self
    }

    /// Handle to the command history.
    pub fn command_log(&self) -> CommandLog {
        Arc::clone(&self.log)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn move_duration(&self, steps: i64, delay_us: u32) -> Duration {
        Duration::from_micros(steps.unsigned_abs().saturating_mul(delay_us as u64))
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save_position(&self.name, self.position) {
                warn!("{}: failed to persist position: {}", self.name, e);
            }
        }
    }
}

impl Stepper for SimulatedStepper {
    fn name(&self) -> &str {
        &self.name
    }

    fn total_steps_per_rev(&self) -> u32 {
        self.config.total_steps_per_rev()
    }

    fn move_steps(&mut self, steps: i64, profile: &MotionProfile) -> Result<(), HalError> {
        if !self.enabled {
            return Err(HalError::Disabled(self.name.clone()));
        }
        let delay_us = profile.delay_us.unwrap_or(self.config.default_delay_us);

        if self.realtime {
            let now = Instant::now();
            while self.in_flight.front().is_some_and(|done| *done <= now) {
                self.in_flight.pop_front();
            }
            if self.in_flight.len() >= self.queue_depth {
                return Err(HalError::Backpressure {
                    name: self.name.clone(),
                    depth: self.in_flight.len(),
                });
            }
            let start = self.in_flight.back().copied().unwrap_or(now).max(now);
            self.in_flight
                .push_back(start + self.move_duration(steps, delay_us));
        }

        self.position += steps;
        self.log.lock().push(StepCommand {
            steps,
            delay_us,
            acceleration: profile.acceleration,
        });
        self.persist();
        Ok(())
    }

    fn position_steps(&self) -> i64 {
        self.position
    }

    fn set_position_steps(&mut self, steps: i64) -> Result<(), HalError> {
        self.position = steps;
        self.persist();
        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), HalError> {
        self.enabled = enabled;
        if !enabled {
            self.in_flight.clear();
        }
        Ok(())
    }
}
