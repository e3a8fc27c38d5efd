//! Sorter configuration types.
//!
//! One TOML document, one section per subsystem. Every field has a serde
//! default so an empty file yields the bench machine's working values.
//!
//! ```toml
//! [shared]
//! log_level = "info"
//!
//! [classification]
//! rotate_degrees = -90.0
//! snap_dir = "/tmp/snaps"
//!
//! [[layout.layers]]
//! sections = [["small", "small", "small"], ["big"]]
//! ```

use super::piece::BinSize;
use crate::config::SharedConfig;
use crate::consts::TICK_MS;
use crate::hal::config::HardwareConfig;
use crate::hal::driver::MotionProfile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SorterConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub distribution: DistributionConfig,
    #[serde(default)]
    pub feeder: FeederConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub hardware: HardwareConfig,
}

// ─── [pipeline] ─────────────────────────────────────────────────────

/// `[pipeline]` section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Control tick period [ms].
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_tick_ms() -> u64 {
    TICK_MS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

// ─── [classification] ───────────────────────────────────────────────

/// `[classification]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Minimum edge proximity between an object and the carousel mask
    /// that counts as a pickup (0.0..=1.0).
    #[serde(default = "default_proximity_threshold")]
    pub proximity_threshold: f64,
    /// Neighbourhood used by the edge proximity test [px].
    #[serde(default = "default_proximity_radius_px")]
    pub proximity_radius_px: usize,
    /// Minimum detection confidence for an object mask.
    #[serde(default = "default_object_confidence")]
    pub object_confidence: f32,
    /// Carousel rotation per platform advance [deg].
    #[serde(default = "default_rotate_degrees")]
    pub rotate_degrees: f64,
    /// Optional carousel step delay override [µs].
    #[serde(default)]
    pub rotate_delay_us: Option<u32>,
    /// Wait after the rotate command before trusting the new positions [ms].
    #[serde(default = "default_rotate_settle_ms")]
    pub rotate_settle_ms: u64,
    /// Camera settle wait before capturing [ms].
    #[serde(default = "default_snap_delay_ms")]
    pub snap_delay_ms: u64,
    /// Fresh frame capture timeout [ms].
    #[serde(default = "default_capture_timeout_ms")]
    pub capture_timeout_ms: u64,
    /// Outstanding classification older than this is resolved as unknown
    /// when its piece blocks the exit platform [ms].
    #[serde(default = "default_classification_timeout_ms")]
    pub timeout_ms: u64,
    /// Directory for raw frames and crops of each snapped piece.
    #[serde(default)]
    pub snap_dir: Option<PathBuf>,
}

fn default_proximity_threshold() -> f64 {
    0.1
}
fn default_proximity_radius_px() -> usize {
    5
}
fn default_object_confidence() -> f32 {
    0.3
}
fn default_rotate_degrees() -> f64 {
    -90.0
}
fn default_rotate_settle_ms() -> u64 {
    1000
}
fn default_snap_delay_ms() -> u64 {
    2000
}
fn default_capture_timeout_ms() -> u64 {
    1000
}
fn default_classification_timeout_ms() -> u64 {
    10_000
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            proximity_threshold: default_proximity_threshold(),
            proximity_radius_px: default_proximity_radius_px(),
            object_confidence: default_object_confidence(),
            rotate_degrees: default_rotate_degrees(),
            rotate_delay_us: None,
            rotate_settle_ms: default_rotate_settle_ms(),
            snap_delay_ms: default_snap_delay_ms(),
            capture_timeout_ms: default_capture_timeout_ms(),
            timeout_ms: default_classification_timeout_ms(),
            snap_dir: None,
        }
    }
}

// ─── [distribution] ─────────────────────────────────────────────────

/// `[distribution]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionConfig {
    /// Chute settle wait after the positioning command [ms].
    #[serde(default = "default_position_settle_ms")]
    pub position_settle_ms: u64,
    /// Duration of the drop sequence [ms].
    #[serde(default = "default_send_ms")]
    pub send_ms: u64,
    /// Angular width of one section [deg].
    #[serde(default = "default_deg_per_section")]
    pub deg_per_section: f64,
    /// Dead zone at each section boundary [deg].
    #[serde(default = "default_pillar_width_deg")]
    pub pillar_width_deg: f64,
    /// Stepper rotations per chute rotation.
    #[serde(default = "default_gear_ratio")]
    pub gear_ratio: f64,
    /// JSON parts file mapping part ids to categories.
    #[serde(default)]
    pub parts_file: Option<PathBuf>,
}

fn default_position_settle_ms() -> u64 {
    3000
}
fn default_send_ms() -> u64 {
    500
}
fn default_deg_per_section() -> f64 {
    60.0
}
fn default_pillar_width_deg() -> f64 {
    5.0
}
fn default_gear_ratio() -> f64 {
    5.0
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            position_settle_ms: default_position_settle_ms(),
            send_ms: default_send_ms(),
            deg_per_section: default_deg_per_section(),
            pillar_width_deg: default_pillar_width_deg(),
            gear_ratio: default_gear_ratio(),
            parts_file: None,
        }
    }
}

impl DistributionConfig {
    /// Section width minus the pillar dead zone [deg].
    #[inline]
    pub fn usable_deg_per_section(&self) -> f64 {
        self.deg_per_section - self.pillar_width_deg
    }
}

// ─── [feeder] ───────────────────────────────────────────────────────

/// One stepper pulse: rotation plus timing profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseConfig {
    /// Relative rotation per pulse [deg].
    pub degrees: f64,
    /// Inter-step delay [µs]; unset uses the stepper default.
    #[serde(default)]
    pub delay_us: Option<u32>,
    /// Ramp length [steps].
    #[serde(default)]
    pub acceleration: u32,
}

impl PulseConfig {
    pub const fn new(degrees: f64, delay_us: u32, acceleration: u32) -> Self {
        Self {
            degrees,
            delay_us: Some(delay_us),
            acceleration,
        }
    }

    pub const fn profile(&self) -> MotionProfile {
        MotionProfile {
            delay_us: self.delay_us,
            acceleration: self.acceleration,
        }
    }
}

/// Fiducial geometry of one feeder channel.
///
/// The channel is the circle through `markers` (center at their midpoint,
/// radius half their separation). Quadrants are measured around that
/// center starting from the direction of `reference_marker`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub markers: [u32; 2],
    pub reference_marker: u32,
    /// Quadrant (0..4) just before the channel's drop point; objects there
    /// get the precise pulse.
    #[serde(default)]
    pub precise_quadrant: u8,
}

/// `[feeder]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeederConfig {
    /// Pause between pulses [ms].
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
    /// Minimum confidence for an object detection on the feeder.
    #[serde(default = "default_feeder_confidence")]
    pub confidence_threshold: f32,
    /// Start feeding with the intake pulse even when no object is visible
    /// on either channel.
    #[serde(default = "default_intake_when_empty")]
    pub intake_when_empty: bool,
    #[serde(default = "default_inner_channel")]
    pub inner_channel: ChannelConfig,
    #[serde(default = "default_outer_channel")]
    pub outer_channel: ChannelConfig,
    #[serde(default = "default_normal_pulse")]
    pub inner_normal: PulseConfig,
    #[serde(default = "default_precise_pulse")]
    pub inner_precise: PulseConfig,
    #[serde(default = "default_normal_pulse")]
    pub outer_normal: PulseConfig,
    #[serde(default = "default_precise_pulse")]
    pub outer_precise: PulseConfig,
    #[serde(default = "default_intake_pulse")]
    pub intake: PulseConfig,
}

fn default_pause_ms() -> u64 {
    200
}
fn default_feeder_confidence() -> f32 {
    0.3
}
fn default_intake_when_empty() -> bool {
    true
}
fn default_inner_channel() -> ChannelConfig {
    ChannelConfig {
        markers: [0, 1],
        reference_marker: 0,
        precise_quadrant: 0,
    }
}
fn default_outer_channel() -> ChannelConfig {
    ChannelConfig {
        markers: [2, 3],
        reference_marker: 2,
        precise_quadrant: 0,
    }
}
fn default_normal_pulse() -> PulseConfig {
    PulseConfig::new(12.0, 400, 20)
}
fn default_precise_pulse() -> PulseConfig {
    PulseConfig::new(4.0, 900, 0)
}
fn default_intake_pulse() -> PulseConfig {
    PulseConfig::new(30.0, 400, 40)
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            pause_ms: default_pause_ms(),
            confidence_threshold: default_feeder_confidence(),
            intake_when_empty: default_intake_when_empty(),
            inner_channel: default_inner_channel(),
            outer_channel: default_outer_channel(),
            inner_normal: default_normal_pulse(),
            inner_precise: default_precise_pulse(),
            outer_normal: default_normal_pulse(),
            outer_precise: default_precise_pulse(),
            intake: default_intake_pulse(),
        }
    }
}

// ─── [layout] ───────────────────────────────────────────────────────

/// `[[layout.layers]]` entry: bin size tags per section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub sections: Vec<Vec<BinSize>>,
}

/// `[layout]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_layers")]
    pub layers: Vec<LayerConfig>,
}

fn default_layers() -> Vec<LayerConfig> {
    vec![LayerConfig {
        sections: vec![vec![BinSize::Small; 3]; 6],
    }]
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            layers: default_layers(),
        }
    }
}

impl LayoutConfig {
    /// Largest section count over all layers.
    pub fn max_sections(&self) -> usize {
        self.layers.iter().map(|l| l.sections.len()).max().unwrap_or(0)
    }

    /// Total number of bins.
    pub fn bin_count(&self) -> usize {
        self.layers
            .iter()
            .flat_map(|l| l.sections.iter())
            .map(Vec::len)
            .sum()
    }
}
