//! Persistence interfaces.
//!
//! Two independent concerns share one backing document in production:
//! stepper absolute positions, and the bin → category binding matrix.

use thiserror::Error;

/// Binding matrix indexed `[layer][section][bin]`.
pub type CategoryMatrix = Vec<Vec<Vec<Option<String>>>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Persisted bin → category bindings.
pub trait BindingStore: Send + Sync {
    /// Last saved matrix, `None` if nothing was saved yet.
    fn load_bindings(&self) -> Result<Option<CategoryMatrix>, StoreError>;

    /// Replace the saved matrix.
    fn save_bindings(&self, matrix: &CategoryMatrix) -> Result<(), StoreError>;
}

/// Persisted stepper absolute positions [steps], keyed by stepper name.
pub trait PositionStore: Send + Sync {
    fn load_position(&self, name: &str) -> Result<Option<i64>, StoreError>;

    fn save_position(&self, name: &str, steps: i64) -> Result<(), StoreError>;
}
