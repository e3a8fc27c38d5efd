//! Coordinator and fixed-period tick loop.
//!
//! Each tick polls feeder → classification → distribution, in that order,
//! with the one `SharedState` they hand pieces through. Nothing in a tick
//! blocks; work that takes real time runs on the states' workers.

use sorter_common::classify::{Classifier, SortingProfile};
use sorter_common::pipeline::config::SorterConfig;
use sorter_common::pipeline::events::EventSender;
use sorter_common::store::BindingStore;
use sorter_common::vision::VisionSource;
use sorter_hal::SorterHardware;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::carousel::{Carousel, SharedCarousel};
use crate::distribution::{BinLayout, Chute, ChuteGeometry};
use crate::shared::SharedState;
use crate::state::classification::{ClassificationMachine, ClassificationTag};
use crate::state::distribution::{DistributionMachine, DistributionTag};
use crate::state::feeder::{FeederMachine, FeederTag};

/// Ticks between periodic status lines.
const STATUS_INTERVAL_TICKS: u64 = 1000;

// ─── Tick Statistics ────────────────────────────────────────────────

/// Per-tick timing statistics.
#[derive(Debug, Clone)]
pub struct TickStats {
    /// Total ticks executed.
    pub tick_count: u64,
    /// Last tick duration [ns].
    pub last_tick_ns: u64,
    /// Minimum tick duration [ns].
    pub min_tick_ns: u64,
    /// Maximum tick duration [ns].
    pub max_tick_ns: u64,
    sum_tick_ns: u128,
    /// Ticks whose body ran longer than the period.
    pub overruns: u64,
}

impl TickStats {
    pub const fn new() -> Self {
        Self {
            tick_count: 0,
            last_tick_ns: 0,
            min_tick_ns: u64::MAX,
            max_tick_ns: 0,
            sum_tick_ns: 0,
            overruns: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, duration: Duration, period: Duration) {
        let ns = duration.as_nanos() as u64;
        self.tick_count += 1;
        self.last_tick_ns = ns;
        self.min_tick_ns = self.min_tick_ns.min(ns);
        self.max_tick_ns = self.max_tick_ns.max(ns);
        self.sum_tick_ns += ns as u128;
        if duration > period {
            self.overruns += 1;
        }
    }

    /// Average tick duration [ns] (0 before the first tick).
    pub fn avg_tick_ns(&self) -> u64 {
        if self.tick_count == 0 {
            0
        } else {
            (self.sum_tick_ns / self.tick_count as u128) as u64
        }
    }
}

impl Default for TickStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Coordinator ────────────────────────────────────────────────────

/// Everything the pipeline talks to outside this crate.
#[derive(Clone)]
pub struct Collaborators {
    pub hardware: SorterHardware,
    pub vision: Arc<dyn VisionSource>,
    pub classifier: Arc<dyn Classifier>,
    pub profile: Arc<dyn SortingProfile>,
    pub bindings: Arc<dyn BindingStore>,
    pub events: EventSender,
}

pub struct Coordinator {
    shared: SharedState,
    carousel: SharedCarousel,
    feeder: FeederMachine,
    classification: ClassificationMachine,
    distribution: DistributionMachine,
    period: Duration,
    stats: TickStats,
}

impl Coordinator {
    /// Wire the three machines around one carousel and shared state.
    ///
    /// Saved bin bindings are restored here.
    pub fn new(config: &SorterConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            hardware,
            vision,
            classifier,
            profile,
            bindings,
            events,
        } = collaborators;

        let carousel = Carousel::shared(events.clone());
        let chute = Chute::new(
            Arc::clone(&hardware.chute),
            ChuteGeometry::from_config(&config.distribution),
        );
        let classification = ClassificationMachine::new(
            config.classification.clone(),
            Arc::clone(&carousel),
            Arc::clone(&vision),
            classifier,
            Arc::clone(&hardware.carousel),
            events.clone(),
        );
        let distribution = DistributionMachine::new(
            config.distribution.clone(),
            BinLayout::from_config(&config.layout),
            chute,
            profile,
            bindings,
            events,
        );
        let feeder = FeederMachine::new(config.feeder.clone(), vision, hardware);

        Self {
            shared: SharedState::new(),
            carousel,
            feeder,
            classification,
            distribution,
            period: Duration::from_millis(config.pipeline.tick_ms),
            stats: TickStats::new(),
        }
    }

    /// One control tick.
    pub fn step(&mut self) {
        self.feeder.step(&mut self.shared);
        self.classification.step(&mut self.shared);
        self.distribution.step(&mut self.shared);
    }

    /// Tick every period until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) {
        info!("Pipeline running ({} ms tick)", self.period.as_millis());
        let mut next_wake = Instant::now();
        while running.load(Ordering::SeqCst) {
            next_wake += self.period;
            let tick_start = Instant::now();

            self.step();

            let elapsed = tick_start.elapsed();
            self.stats.record(elapsed, self.period);
            if elapsed > self.period {
                debug!("tick overrun: {:?} > {:?}", elapsed, self.period);
            }
            if self.stats.tick_count % STATUS_INTERVAL_TICKS == 0 {
                self.log_status();
            }

            let now = Instant::now();
            if next_wake > now {
                std::thread::sleep(next_wake - now);
            } else {
                // fell behind: restart pacing from now
                next_wake = now;
            }
        }
        info!("Pipeline stopped after {} ticks", self.stats.tick_count);
    }

    /// Return every machine to IDLE, cancelling workers.
    pub fn cleanup(&mut self) {
        self.feeder.cleanup();
        self.classification.cleanup();
        self.distribution.cleanup();
        self.log_status();
    }

    fn log_status(&self) {
        info!(
            "status: feeder={} classification={} distribution={} carousel={} ticks={} avg={}µs max={}µs overruns={} lost={}",
            self.feeder.tag(),
            self.classification.tag(),
            self.distribution.tag(),
            self.carousel.lock().summary(),
            self.stats.tick_count,
            self.stats.avg_tick_ns() / 1000,
            self.stats.max_tick_ns / 1000,
            self.stats.overruns,
            self.lost_pieces(),
        );
    }

    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    pub fn carousel(&self) -> &SharedCarousel {
        &self.carousel
    }

    pub fn stats(&self) -> &TickStats {
        &self.stats
    }

    pub fn distribution(&self) -> &DistributionMachine {
        &self.distribution
    }

    pub fn feeder_tag(&self) -> FeederTag {
        self.feeder.tag()
    }

    pub fn classification_tag(&self) -> ClassificationTag {
        self.classification.tag()
    }

    pub fn distribution_tag(&self) -> DistributionTag {
        self.distribution.tag()
    }

    pub fn lost_pieces(&self) -> u64 {
        self.classification.lost_pieces()
    }
}
