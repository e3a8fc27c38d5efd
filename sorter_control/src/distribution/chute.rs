//! Chute addressing.
//!
//! Each section spans `deg_per_section` of output angle with a pillar dead
//! zone split across its two edges. Bins are spread evenly over the usable
//! width, each targeted at its centre:
//!
//! ```text
//! angle = section · deg_per_section + pillar / 2 + (bin + 0.5) · usable / bins
//! ```
//!
//! The chute stepper drives the output through `gear_ratio`; moves are
//! relative deltas from the stepper's absolute position, never wrapped.

use sorter_common::hal::driver::{HalError, MotionProfile};
use sorter_common::pipeline::config::DistributionConfig;
use sorter_common::pipeline::piece::BinAddress;
use sorter_hal::SharedStepper;
use tracing::{debug, info};

use super::layout::BinLayout;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChuteGeometry {
    pub deg_per_section: f64,
    pub pillar_width_deg: f64,
    pub gear_ratio: f64,
}

impl ChuteGeometry {
    pub fn from_config(config: &DistributionConfig) -> Self {
        Self {
            deg_per_section: config.deg_per_section,
            pillar_width_deg: config.pillar_width_deg,
            gear_ratio: config.gear_ratio,
        }
    }

    /// Output angle of bin `bin` out of `bins_in_section` [deg].
    pub fn bin_angle(&self, section: usize, bin: usize, bins_in_section: usize) -> f64 {
        let usable = self.deg_per_section - self.pillar_width_deg;
        let bin_width = usable / bins_in_section.max(1) as f64;
        section as f64 * self.deg_per_section
            + self.pillar_width_deg / 2.0
            + (bin as f64 + 0.5) * bin_width
    }
}

pub struct Chute {
    stepper: SharedStepper,
    geometry: ChuteGeometry,
}

impl Chute {
    pub fn new(stepper: SharedStepper, geometry: ChuteGeometry) -> Self {
        Self { stepper, geometry }
    }

    pub fn geometry(&self) -> ChuteGeometry {
        self.geometry
    }

    /// Target angle for `address`, `None` if the layout has no such bin.
    pub fn angle_for_bin(&self, layout: &BinLayout, address: BinAddress) -> Option<f64> {
        layout.bin(address)?;
        let bins = layout.section_len(address.layer, address.section)?;
        Some(self.geometry.bin_angle(address.section, address.bin, bins))
    }

    /// Current output angle [deg].
    pub fn current_angle(&self) -> f64 {
        self.stepper.lock().position_degrees() / self.geometry.gear_ratio
    }

    /// Move the output to `target` degrees. Returns the commanded step delta.
    pub fn move_to_angle(&self, target: f64) -> Result<i64, HalError> {
        let mut stepper = self.stepper.lock();
        let delta = target * self.geometry.gear_ratio - stepper.position_degrees();
        let steps = stepper.rotate(delta, &MotionProfile::default())?;
        debug!(
            "chute: target {:.2}° (stepper delta {:.2}°, {} steps)",
            target, delta, steps
        );
        Ok(steps)
    }

    /// Move to the centre of `address`. Returns the target angle.
    pub fn move_to_bin(&self, layout: &BinLayout, address: BinAddress) -> Result<f64, HalError> {
        let angle = self
            .angle_for_bin(layout, address)
            .ok_or_else(|| HalError::ConfigError(format!("no bin at {address}")))?;
        info!("chute: moving to bin {} at {:.2}°", address, angle);
        self.move_to_angle(angle)?;
        Ok(angle)
    }

    /// Declare the current chute position as 0°.
    pub fn home(&self) -> Result<(), HalError> {
        info!("chute: homing, current position becomes 0°");
        self.stepper.lock().set_position_steps(0)
    }
}
