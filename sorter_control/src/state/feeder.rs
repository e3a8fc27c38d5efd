//! Feeder machine: IDLE ⇄ FEEDING.
//!
//! FEEDING owns a background loop that analyzes the feeder camera, pulses
//! one channel stepper and pauses, over and over. The loop stops as soon as
//! classification stops accepting pieces.

use sorter_common::pipeline::config::FeederConfig;
use sorter_common::vision::VisionSource;
use sorter_hal::SorterHardware;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::machine::{Machine, StateKind};
use crate::feeder::analysis::{analyze, objects_visible};
use crate::shared::SharedState;
use crate::worker::{CancelToken, WorkerSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeederTag {
    Idle,
    Feeding,
}

impl fmt::Display for FeederTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Feeding => "FEEDING",
        })
    }
}

pub enum FeederState {
    Idle,
    Feeding(WorkerSlot<u64>),
}

impl StateKind for FeederState {
    type Tag = FeederTag;

    fn tag(&self) -> FeederTag {
        match self {
            Self::Idle => FeederTag::Idle,
            Self::Feeding(_) => FeederTag::Feeding,
        }
    }
}

struct FeederContext {
    config: FeederConfig,
    vision: Arc<dyn VisionSource>,
    hardware: SorterHardware,
}

pub struct FeederMachine {
    machine: Machine<FeederState>,
    ctx: FeederContext,
}

impl FeederMachine {
    pub fn new(config: FeederConfig, vision: Arc<dyn VisionSource>, hardware: SorterHardware) -> Self {
        Self {
            machine: Machine::new("feeder", FeederState::Idle),
            ctx: FeederContext {
                config,
                vision,
                hardware,
            },
        }
    }

    pub fn tag(&self) -> FeederTag {
        self.machine.tag()
    }

    pub fn step(&mut self, shared: &mut SharedState) {
        let ctx = &self.ctx;
        let next = match self.machine.state_mut() {
            FeederState::Idle => step_idle(ctx, shared),
            FeederState::Feeding(worker) => step_feeding(ctx, worker, shared),
        };
        self.machine.apply(next);
    }

    /// Return to IDLE, stopping the pulse loop.
    pub fn cleanup(&mut self) {
        if self.tag() != FeederTag::Idle {
            self.machine.apply(Some(FeederState::Idle));
        }
    }
}

fn step_idle(ctx: &FeederContext, shared: &SharedState) -> Option<FeederState> {
    if !shared.classification_ready {
        return None;
    }
    let upstream = ctx.config.intake_when_empty
        || objects_visible(&ctx.vision.feeder_snapshot(), &ctx.config);
    upstream.then(|| FeederState::Feeding(WorkerSlot::new()))
}

fn step_feeding(
    ctx: &FeederContext,
    worker: &mut WorkerSlot<u64>,
    shared: &SharedState,
) -> Option<FeederState> {
    if !shared.classification_ready {
        return Some(FeederState::Idle);
    }
    let config = ctx.config.clone();
    let vision = Arc::clone(&ctx.vision);
    let hardware = ctx.hardware.clone();
    worker.ensure_started("feeder", move |cancel| {
        feed_loop(cancel, &config, vision.as_ref(), &hardware)
    });
    match worker.poll() {
        Some(_) => Some(FeederState::Idle),
        None if worker.is_finished() => Some(FeederState::Idle),
        None => None,
    }
}

/// Pulse until cancelled. Returns the number of pulses issued.
fn feed_loop(
    cancel: &CancelToken,
    config: &FeederConfig,
    vision: &dyn VisionSource,
    hardware: &SorterHardware,
) -> u64 {
    let pause = Duration::from_millis(config.pause_ms);
    let mut pulses = 0;
    while !cancel.is_cancelled() {
        let action = analyze(&vision.feeder_snapshot(), config);
        let pulse = action.pulse(config);
        let Some(stepper) = hardware.stepper(action.stepper()) else {
            warn!("feeder: no stepper '{}'", action.stepper());
            break;
        };
        if cancel.is_cancelled() {
            break;
        }
        match stepper.lock().rotate(pulse.degrees, &pulse.profile()) {
            Ok(steps) => {
                pulses += 1;
                debug!("feeder: {} pulse ({} steps)", action, steps);
            }
            Err(e) => warn!("feeder: {} pulse rejected: {}", action, e),
        }
        if !cancel.sleep(pause) {
            break;
        }
    }
    debug!("feeder: loop stopped after {} pulses", pulses);
    pulses
}
