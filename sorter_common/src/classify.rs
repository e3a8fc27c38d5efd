//! Classification and sorting-profile collaborator interfaces.

use crate::vision::ImageCrop;
use serde::{Deserialize, Serialize};

/// Result of one classification request.
///
/// `part_id == None` means "no identification"; classifier failures are
/// reported this way rather than as errors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Classification {
    pub part_id: Option<String>,
    pub confidence: Option<f32>,
}

impl Classification {
    pub fn identified(part_id: impl Into<String>, confidence: f32) -> Self {
        Self {
            part_id: Some(part_id.into()),
            confidence: Some(confidence),
        }
    }

    pub const fn none() -> Self {
        Self {
            part_id: None,
            confidence: None,
        }
    }
}

/// Completion callback; invoked exactly once, possibly on another thread.
pub type ClassifyCallback = Box<dyn FnOnce(Classification) + Send + 'static>;

/// Asynchronous part classifier.
///
/// # Contract
///
/// - `classify` returns immediately.
/// - `callback` is invoked exactly once, with `Classification::none()` on
///   any internal failure. It never panics into the caller.
pub trait Classifier: Send + Sync {
    fn classify(&self, top: Option<ImageCrop>, bottom: Option<ImageCrop>, callback: ClassifyCallback);
}

/// Part → category mapping.
pub trait SortingProfile: Send + Sync {
    /// Category for `part_id`; the MISC category when unmapped.
    fn category_for_part(&self, part_id: &str) -> String;
}
