//! Feeder channel analysis.
//!
//! Runs once per feeder pulse. Channel geometry is rebuilt from the
//! fiducial markers in every snapshot, so the rings may drift or vibrate
//! without recalibration.
//!
//! A channel is the circle through its two markers. Objects are placed by
//! mask centroid; an object inside the inner circle belongs to the inner
//! channel even when the outer circle also contains it. Quadrants count
//! counter-clockwise in image coordinates from the reference marker's
//! direction.

use bitflags::bitflags;
use sorter_common::consts::{
    INNER_CHANNEL_STEPPER, INTAKE_STEPPER, OBJECT_CLASS_ID, OUTER_CHANNEL_STEPPER,
};
use sorter_common::pipeline::config::{ChannelConfig, FeederConfig, PulseConfig};
use sorter_common::vision::{FeederSnapshot, Point};
use std::f64::consts::{FRAC_PI_2, TAU};
use std::fmt;

/// Marker pairs closer than this are treated as undetected [px].
const MIN_RADIUS_PX: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Channel {
    pub center: Point,
    pub radius: f64,
    /// Angle of the reference marker around `center` [rad].
    reference_angle: f64,
}

impl Channel {
    pub fn from_markers(a: Point, b: Point, reference: Point) -> Option<Self> {
        let center = a.midpoint(&b);
        let radius = a.distance(&b) / 2.0;
        if radius < MIN_RADIUS_PX {
            return None;
        }
        Some(Self {
            center,
            radius,
            reference_angle: (reference.y - center.y).atan2(reference.x - center.x),
        })
    }

    /// Build from the markers present in `snapshot`.
    pub fn locate(snapshot: &FeederSnapshot, config: &ChannelConfig) -> Option<Self> {
        let a = snapshot.marker(config.markers[0])?;
        let b = snapshot.marker(config.markers[1])?;
        let reference = snapshot.marker(config.reference_marker)?;
        Self::from_markers(a, b, reference)
    }

    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        self.center.distance(&p) <= self.radius
    }

    /// Quadrant 0..4 of `p` around the center.
    pub fn quadrant_of(&self, p: Point) -> u8 {
        let angle = (p.y - self.center.y).atan2(p.x - self.center.x) - self.reference_angle;
        let normalized = angle.rem_euclid(TAU);
        ((normalized / FRAC_PI_2) as u8).min(3)
    }
}

bitflags! {
    /// Which channels hold objects, and whether any sits in the channel's
    /// precise quadrant.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Occupancy: u8 {
        const INNER         = 1 << 0;
        const INNER_PRECISE = 1 << 1;
        const OUTER         = 1 << 2;
        const OUTER_PRECISE = 1 << 3;
    }
}

/// Live channel geometry; a channel whose markers are not visible is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelGeometry {
    pub inner: Option<Channel>,
    pub outer: Option<Channel>,
}

impl ChannelGeometry {
    pub fn locate(snapshot: &FeederSnapshot, config: &FeederConfig) -> Self {
        Self {
            inner: Channel::locate(snapshot, &config.inner_channel),
            outer: Channel::locate(snapshot, &config.outer_channel),
        }
    }

    pub fn occupancy(
        &self,
        objects: impl IntoIterator<Item = Point>,
        config: &FeederConfig,
    ) -> Occupancy {
        let mut occupancy = Occupancy::empty();
        for p in objects {
            if let Some(inner) = self.inner.filter(|c| c.contains(p)) {
                occupancy |= Occupancy::INNER;
                if inner.quadrant_of(p) == config.inner_channel.precise_quadrant {
                    occupancy |= Occupancy::INNER_PRECISE;
                }
            } else if let Some(outer) = self.outer.filter(|c| c.contains(p)) {
                occupancy |= Occupancy::OUTER;
                if outer.quadrant_of(p) == config.outer_channel.precise_quadrant {
                    occupancy |= Occupancy::OUTER_PRECISE;
                }
            }
        }
        occupancy
    }
}

/// One feeder pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedAction {
    InnerPrecise,
    InnerNormal,
    OuterPrecise,
    OuterNormal,
    Intake,
}

impl FeedAction {
    /// Highest-priority action for `occupancy`: inner before outer, precise
    /// before normal, intake when both channels are empty.
    pub fn select(occupancy: Occupancy) -> Self {
        if occupancy.contains(Occupancy::INNER_PRECISE) {
            Self::InnerPrecise
        } else if occupancy.contains(Occupancy::INNER) {
            Self::InnerNormal
        } else if occupancy.contains(Occupancy::OUTER_PRECISE) {
            Self::OuterPrecise
        } else if occupancy.contains(Occupancy::OUTER) {
            Self::OuterNormal
        } else {
            Self::Intake
        }
    }

    pub const fn stepper(&self) -> &'static str {
        match self {
            Self::InnerPrecise | Self::InnerNormal => INNER_CHANNEL_STEPPER,
            Self::OuterPrecise | Self::OuterNormal => OUTER_CHANNEL_STEPPER,
            Self::Intake => INTAKE_STEPPER,
        }
    }

    pub const fn pulse<'a>(&self, config: &'a FeederConfig) -> &'a PulseConfig {
        match self {
            Self::InnerPrecise => &config.inner_precise,
            Self::InnerNormal => &config.inner_normal,
            Self::OuterPrecise => &config.outer_precise,
            Self::OuterNormal => &config.outer_normal,
            Self::Intake => &config.intake,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InnerPrecise => "inner_precise",
            Self::InnerNormal => "inner_normal",
            Self::OuterPrecise => "outer_precise",
            Self::OuterNormal => "outer_normal",
            Self::Intake => "intake",
        }
    }
}

impl fmt::Display for FeedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Centroids of object detections at or above `min_confidence`.
pub fn object_points(snapshot: &FeederSnapshot, min_confidence: f32) -> Vec<Point> {
    snapshot
        .masks_of(OBJECT_CLASS_ID)
        .iter()
        .filter(|d| d.confidence >= min_confidence)
        .filter_map(|d| d.mask.centroid())
        .collect()
}

/// True if any object detection clears the feeder confidence threshold.
pub fn objects_visible(snapshot: &FeederSnapshot, config: &FeederConfig) -> bool {
    snapshot
        .masks_of(OBJECT_CLASS_ID)
        .iter()
        .any(|d| d.confidence >= config.confidence_threshold)
}

/// Pick the next pulse for `snapshot`.
pub fn analyze(snapshot: &FeederSnapshot, config: &FeederConfig) -> FeedAction {
    let geometry = ChannelGeometry::locate(snapshot, config);
    let objects = object_points(snapshot, config.confidence_threshold);
    FeedAction::select(geometry.occupancy(objects, config))
}
