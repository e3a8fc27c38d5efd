//! Configuration file tests.
//!
//! Load complete `sorter.toml` documents from disk through `ConfigLoader`
//! and check section defaults, overrides and parse failures.

use sorter_common::config::{ConfigError, ConfigLoader, LogLevel};
use sorter_common::pipeline::config::SorterConfig;
use sorter_common::pipeline::piece::BinSize;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("sorter.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn full_document_overrides_every_section() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[shared]
log_level = "debug"
service_name = "bench-2"

[pipeline]
tick_ms = 20

[classification]
proximity_threshold = 0.25
rotate_degrees = 90.0
rotate_settle_ms = 800
snap_dir = "/tmp/snaps"

[distribution]
position_settle_ms = 2500
gear_ratio = 4.0
parts_file = "parts.json"

[feeder]
pause_ms = 150

[feeder.inner_channel]
markers = [10, 11]
reference_marker = 11
precise_quadrant = 3

[[layout.layers]]
sections = [["big", "big"], ["medium"]]

[hardware]
driver = "simulation"
data_file = "state/data.json"

[hardware.steppers.carousel]
[hardware.steppers.chute]
microstepping = 16
[hardware.steppers.intake]
[hardware.steppers.outer_channel]
[hardware.steppers.inner_channel]
"#,
    );

    let config = SorterConfig::load(&path).unwrap();
    assert_eq!(config.shared.log_level, LogLevel::Debug);
    assert_eq!(config.shared.service_name, "bench-2");
    assert_eq!(config.pipeline.tick_ms, 20);
    assert_eq!(config.classification.proximity_threshold, 0.25);
    assert_eq!(config.classification.rotate_degrees, 90.0);
    assert_eq!(config.classification.snap_delay_ms, 2000);
    assert_eq!(
        config.classification.snap_dir,
        Some(PathBuf::from("/tmp/snaps"))
    );
    assert_eq!(config.distribution.gear_ratio, 4.0);
    assert_eq!(config.distribution.send_ms, 500);
    assert_eq!(config.feeder.pause_ms, 150);
    assert_eq!(config.feeder.inner_channel.markers, [10, 11]);
    assert_eq!(config.feeder.inner_channel.precise_quadrant, 3);
    assert_eq!(config.feeder.outer_channel.markers, [2, 3]);
    assert_eq!(config.layout.layers[0].sections[0], vec![BinSize::Big; 2]);
    assert_eq!(config.hardware.steppers["chute"].total_steps_per_rev(), 3200);
    assert!(config.hardware.validate().is_ok());
}

#[test]
fn missing_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    assert!(matches!(
        SorterConfig::load(&path),
        Err(ConfigError::FileNotFound(_))
    ));
}

#[test]
fn wrong_type_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[pipeline]\ntick_ms = \"fast\"\n");
    match SorterConfig::load(&path) {
        Err(ConfigError::ParseError(msg)) => assert!(msg.contains("tick_ms")),
        other => panic!("expected ParseError, got {other:?}"),
    }
}
