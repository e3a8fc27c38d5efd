//! Control crate error type.
//!
//! Only startup can fail: configuration, persistence, driver creation and
//! the sorting profile. Per-tick failures are logged where they happen and
//! never surface as `SorterError`.

use sorter_common::config::ConfigError;
use sorter_common::hal::driver::HalError;
use sorter_common::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SorterError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error(transparent)]
    Hal(#[from] HalError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Sorting profile error: {0}")]
    Profile(String),

    #[error("Failed to spawn worker '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl SorterError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_keep_their_message() {
        let err: SorterError = HalError::DriverNotFound("ethercat".to_string()).into();
        assert_eq!(err.to_string(), "Driver not found: ethercat");

        let err: SorterError = ConfigError::ParseError("line 3".to_string()).into();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn validation_names_the_field() {
        let err = SorterError::validation("pipeline.tick_ms must be > 0");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: pipeline.tick_ms must be > 0"
        );
    }
}
