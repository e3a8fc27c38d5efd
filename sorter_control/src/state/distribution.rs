//! Distribution machine: IDLE → POSITIONING → READY → SENDING → IDLE.
//!
//! Takes the piece classification handed over, binds its category to a bin,
//! turns the chute there and reports ready. The carousel rotation that
//! follows drops the piece; classification signals that by clearing
//! `distribution_ready`, and SENDING waits out the fall before marking the
//! piece distributed.

use sorter_common::classify::SortingProfile;
use sorter_common::consts::MISC_CATEGORY;
use sorter_common::pipeline::config::DistributionConfig;
use sorter_common::pipeline::events::EventSender;
use sorter_common::pipeline::piece::PieceStatus;
use sorter_common::store::BindingStore;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::machine::{Machine, StateKind};
use crate::distribution::{BinLayout, Chute};
use crate::piece::{PieceRef, update_piece};
use crate::shared::SharedState;
use crate::worker::WorkerSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionTag {
    Idle,
    Positioning,
    Ready,
    Sending,
}

impl fmt::Display for DistributionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Positioning => "POSITIONING",
            Self::Ready => "READY",
            Self::Sending => "SENDING",
        })
    }
}

pub enum DistributionState {
    Idle,
    Positioning {
        piece: PieceRef,
        started: Option<Instant>,
    },
    Ready {
        piece: PieceRef,
        signaled: bool,
    },
    Sending {
        piece: PieceRef,
        worker: WorkerSlot<bool>,
    },
}

impl StateKind for DistributionState {
    type Tag = DistributionTag;

    fn tag(&self) -> DistributionTag {
        match self {
            Self::Idle => DistributionTag::Idle,
            Self::Positioning { .. } => DistributionTag::Positioning,
            Self::Ready { .. } => DistributionTag::Ready,
            Self::Sending { .. } => DistributionTag::Sending,
        }
    }
}

struct DistributionContext {
    config: DistributionConfig,
    layout: BinLayout,
    chute: Chute,
    profile: Arc<dyn SortingProfile>,
    bindings: Arc<dyn BindingStore>,
    events: EventSender,
}

pub struct DistributionMachine {
    machine: Machine<DistributionState>,
    ctx: DistributionContext,
}

impl DistributionMachine {
    /// Restores saved bin bindings into `layout` before the first piece.
    pub fn new(
        config: DistributionConfig,
        mut layout: BinLayout,
        chute: Chute,
        profile: Arc<dyn SortingProfile>,
        bindings: Arc<dyn BindingStore>,
        events: EventSender,
    ) -> Self {
        layout.restore(bindings.as_ref());
        Self {
            machine: Machine::new("distribution", DistributionState::Idle),
            ctx: DistributionContext {
                config,
                layout,
                chute,
                profile,
                bindings,
                events,
            },
        }
    }

    pub fn tag(&self) -> DistributionTag {
        self.machine.tag()
    }

    pub fn layout(&self) -> &BinLayout {
        &self.ctx.layout
    }

    pub fn chute(&self) -> &Chute {
        &self.ctx.chute
    }

    pub fn step(&mut self, shared: &mut SharedState) {
        let ctx = &mut self.ctx;
        let next = match self.machine.state_mut() {
            DistributionState::Idle => shared.pending_piece.take().map(|piece| {
                DistributionState::Positioning {
                    piece,
                    started: None,
                }
            }),
            DistributionState::Positioning { piece, started } => {
                step_positioning(ctx, piece, started, shared)
            }
            DistributionState::Ready { piece, signaled } => step_ready(piece, signaled, shared),
            DistributionState::Sending { piece, worker } => {
                step_sending(ctx, piece, worker, shared)
            }
        };
        self.machine.apply(next);
    }

    /// Return to IDLE, cancelling a drop in progress.
    pub fn cleanup(&mut self) {
        if self.tag() != DistributionTag::Idle {
            self.machine.apply(Some(DistributionState::Idle));
        }
    }
}

/// Category a piece sorts into: the profile's for identified parts, MISC
/// for everything else.
fn category_for(profile: &dyn SortingProfile, piece: &PieceRef) -> String {
    match &piece.lock().part_id {
        Some(part) => profile.category_for_part(part),
        None => MISC_CATEGORY.to_string(),
    }
}

fn step_positioning(
    ctx: &mut DistributionContext,
    piece: &PieceRef,
    started: &mut Option<Instant>,
    shared: &mut SharedState,
) -> Option<DistributionState> {
    let Some(started) = *started else {
        let category = category_for(ctx.profile.as_ref(), piece);
        let Some(assignment) = ctx
            .layout
            .assign(&category, ctx.bindings.as_ref(), &ctx.events)
        else {
            warn!(
                "distribution: no bin for '{}', piece {} left on the carousel",
                category,
                piece.lock().short_id()
            );
            shared.distribution_ready = true;
            return Some(DistributionState::Idle);
        };
        update_piece(piece, &ctx.events, |p| {
            p.category_id = Some(assignment.category_id.clone());
            p.destination_bin = Some(assignment.address);
        });
        if let Err(e) = ctx.chute.move_to_bin(&ctx.layout, assignment.address) {
            warn!("distribution: chute move rejected: {}", e);
        }
        *started = Some(Instant::now());
        return None;
    };
    (started.elapsed() >= Duration::from_millis(ctx.config.position_settle_ms)).then(|| {
        DistributionState::Ready {
            piece: Arc::clone(piece),
            signaled: false,
        }
    })
}

fn step_ready(
    piece: &PieceRef,
    signaled: &mut bool,
    shared: &mut SharedState,
) -> Option<DistributionState> {
    if !*signaled {
        shared.distribution_ready = true;
        *signaled = true;
        debug!("distribution: chute ready for {}", piece.lock().short_id());
        return None;
    }
    // cleared by classification once the carousel has dropped the piece
    (!shared.distribution_ready).then(|| DistributionState::Sending {
        piece: Arc::clone(piece),
        worker: WorkerSlot::new(),
    })
}

fn step_sending(
    ctx: &DistributionContext,
    piece: &PieceRef,
    worker: &mut WorkerSlot<bool>,
    shared: &mut SharedState,
) -> Option<DistributionState> {
    let send = Duration::from_millis(ctx.config.send_ms);
    worker.ensure_started("sending", move |cancel| cancel.sleep(send));
    if worker.poll().is_none() && !worker.is_finished() {
        return None;
    }
    update_piece(piece, &ctx.events, |p| p.status = PieceStatus::Distributed);
    {
        let p = piece.lock();
        info!(
            "distribution: piece {} ({}) distributed to {}",
            p.short_id(),
            p.category_id.as_deref().unwrap_or(MISC_CATEGORY),
            p.destination_bin.map(|a| a.to_string()).unwrap_or_default()
        );
    }
    if shared.pending_piece.is_none() {
        shared.distribution_ready = true;
    }
    Some(DistributionState::Idle)
}
