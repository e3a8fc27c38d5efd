//! System-wide constants for the sorter workspace.
//!
//! Single source of truth for carousel geometry, detection class ids,
//! stepper names and default paths. Imported by all crates.

use static_assertions::const_assert;

/// Number of platforms on the carousel.
pub const NUM_PLATFORMS: usize = 4;

/// Platform index where pieces drop in from the feeder.
pub const FEEDER_POSITION: usize = 0;

/// Platform index under the classification cameras.
pub const CLASSIFICATION_POSITION: usize = 1;

/// Platform index between classification and exit.
pub const INTERMEDIATE_POSITION: usize = 2;

/// Platform index that drops into the distribution chute.
pub const EXIT_POSITION: usize = 3;

const_assert!(FEEDER_POSITION < CLASSIFICATION_POSITION);
const_assert!(CLASSIFICATION_POSITION < INTERMEDIATE_POSITION);
const_assert!(EXIT_POSITION == NUM_PLATFORMS - 1);

/// Catch-all category for unidentified or unbinnable pieces.
pub const MISC_CATEGORY: &str = "misc";

/// Detection class id for pieces on the feeder camera.
pub const OBJECT_CLASS_ID: u8 = 0;

/// Detection class id for the carousel platform on the feeder camera.
pub const CAROUSEL_CLASS_ID: u8 = 1;

/// Carousel rotation stepper.
pub const CAROUSEL_STEPPER: &str = "carousel";

/// Distribution chute stepper.
pub const CHUTE_STEPPER: &str = "chute";

/// Bulk intake stepper feeding the outer channel.
pub const INTAKE_STEPPER: &str = "intake";

/// Outer feeder channel rotor.
pub const OUTER_CHANNEL_STEPPER: &str = "outer_channel";

/// Inner feeder channel rotor (drops onto the carousel).
pub const INNER_CHANNEL_STEPPER: &str = "inner_channel";

/// All stepper names the pipeline requires.
pub const REQUIRED_STEPPERS: [&str; 5] = [
    CAROUSEL_STEPPER,
    CHUTE_STEPPER,
    INTAKE_STEPPER,
    OUTER_CHANNEL_STEPPER,
    INNER_CHANNEL_STEPPER,
];

/// Default control tick period in milliseconds.
pub const TICK_MS: u64 = 10;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/sorter.toml";

/// Default persistent data file (stepper positions, bin bindings).
pub const DEFAULT_DATA_FILE: &str = "data.json";
