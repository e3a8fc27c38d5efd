//! TOML configuration loader with validation.
//!
//! Parses `SorterConfig` through `ConfigLoader`, then checks parameter
//! bounds, layout geometry against the chute, feeder marker uniqueness and
//! the hardware section.

use sorter_common::config::ConfigLoader;
use sorter_common::pipeline::config::{
    ChannelConfig, ClassificationConfig, DistributionConfig, FeederConfig, LayoutConfig,
    PulseConfig, SorterConfig,
};
use std::collections::HashSet;
use std::path::Path;

use crate::error::SorterError;

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate the sorter configuration file.
pub fn load_config(path: &Path) -> Result<SorterConfig, SorterError> {
    let config = SorterConfig::load(path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load config from a TOML string (for testing).
pub fn load_config_from_str(content: &str) -> Result<SorterConfig, SorterError> {
    let config = SorterConfig::load_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Run every validation rule.
pub fn validate_config(config: &SorterConfig) -> Result<(), SorterError> {
    config.shared.validate()?;
    if config.pipeline.tick_ms == 0 {
        return Err(SorterError::validation("pipeline.tick_ms must be > 0"));
    }
    validate_classification(&config.classification)?;
    validate_distribution(&config.distribution)?;
    validate_layout(&config.layout, &config.distribution)?;
    validate_feeder(&config.feeder)?;
    config.hardware.validate()?;
    Ok(())
}

// ─── Section Validation ─────────────────────────────────────────────

fn check_fraction(name: &str, value: f64) -> Result<(), SorterError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SorterError::validation(format!(
            "{name} = {value} out of range [0, 1]"
        )));
    }
    Ok(())
}

fn validate_classification(c: &ClassificationConfig) -> Result<(), SorterError> {
    check_fraction("classification.proximity_threshold", c.proximity_threshold)?;
    check_fraction("classification.object_confidence", f64::from(c.object_confidence))?;
    if !c.rotate_degrees.is_finite() || c.rotate_degrees == 0.0 {
        return Err(SorterError::validation(
            "classification.rotate_degrees must be a non-zero angle",
        ));
    }
    if c.capture_timeout_ms == 0 || c.timeout_ms == 0 {
        return Err(SorterError::validation(
            "classification.capture_timeout_ms and timeout_ms must be > 0",
        ));
    }
    Ok(())
}

fn validate_distribution(d: &DistributionConfig) -> Result<(), SorterError> {
    if !(d.deg_per_section > 0.0) {
        return Err(SorterError::validation(
            "distribution.deg_per_section must be > 0",
        ));
    }
    if !(d.pillar_width_deg >= 0.0 && d.pillar_width_deg < d.deg_per_section) {
        return Err(SorterError::validation(format!(
            "distribution.pillar_width_deg = {} must be in [0, {})",
            d.pillar_width_deg, d.deg_per_section
        )));
    }
    if !(d.gear_ratio > 0.0) || !d.gear_ratio.is_finite() {
        return Err(SorterError::validation("distribution.gear_ratio must be > 0"));
    }
    Ok(())
}

/// Every layer, section and bin list must be non-empty and all sections
/// of a layer must fit on one chute revolution.
fn validate_layout(layout: &LayoutConfig, d: &DistributionConfig) -> Result<(), SorterError> {
    if layout.layers.is_empty() {
        return Err(SorterError::validation("layout must define at least one layer"));
    }
    for (l, layer) in layout.layers.iter().enumerate() {
        if layer.sections.is_empty() {
            return Err(SorterError::validation(format!(
                "layout.layers[{l}] has no sections"
            )));
        }
        if let Some(s) = layer.sections.iter().position(Vec::is_empty) {
            return Err(SorterError::validation(format!(
                "layout.layers[{l}].sections[{s}] has no bins"
            )));
        }
    }
    let span = layout.max_sections() as f64 * d.deg_per_section;
    if span > 360.0 {
        return Err(SorterError::validation(format!(
            "{} sections of {}° exceed one chute revolution",
            layout.max_sections(),
            d.deg_per_section
        )));
    }
    Ok(())
}

fn validate_channel(name: &str, ch: &ChannelConfig) -> Result<(), SorterError> {
    if ch.markers[0] == ch.markers[1] {
        return Err(SorterError::validation(format!(
            "feeder.{name}.markers must be two distinct ids"
        )));
    }
    if ch.precise_quadrant >= 4 {
        return Err(SorterError::validation(format!(
            "feeder.{name}.precise_quadrant must be in 0..4"
        )));
    }
    Ok(())
}

fn validate_pulse(name: &str, p: &PulseConfig) -> Result<(), SorterError> {
    if !p.degrees.is_finite() || p.degrees == 0.0 {
        return Err(SorterError::validation(format!(
            "feeder.{name}.degrees must be a non-zero angle"
        )));
    }
    if p.delay_us == Some(0) {
        return Err(SorterError::validation(format!(
            "feeder.{name}.delay_us must be > 0"
        )));
    }
    Ok(())
}

fn validate_feeder(f: &FeederConfig) -> Result<(), SorterError> {
    check_fraction("feeder.confidence_threshold", f64::from(f.confidence_threshold))?;
    validate_channel("inner_channel", &f.inner_channel)?;
    validate_channel("outer_channel", &f.outer_channel)?;

    let mut seen = HashSet::new();
    for id in f.inner_channel.markers.iter().chain(&f.outer_channel.markers) {
        if !seen.insert(*id) {
            return Err(SorterError::validation(format!(
                "feeder marker {id} is used by more than one channel point"
            )));
        }
    }

    for (name, pulse) in [
        ("inner_normal", &f.inner_normal),
        ("inner_precise", &f.inner_precise),
        ("outer_normal", &f.outer_normal),
        ("outer_precise", &f.outer_precise),
        ("intake", &f.intake),
    ] {
        validate_pulse(name, pulse)?;
    }
    Ok(())
}
