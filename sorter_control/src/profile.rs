//! Sorting profile backed by a JSON parts file.
//!
//! ```json
//! { "pieces": [ { "id": "3001", "category_id": "bricks" } ] }
//! ```
//!
//! Unmapped parts go to the MISC category.

use serde::Deserialize;
use sorter_common::classify::SortingProfile;
use sorter_common::consts::MISC_CATEGORY;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::error::SorterError;

#[derive(Debug, Deserialize)]
struct PartsFile {
    #[serde(default)]
    pieces: Vec<PartEntry>,
}

#[derive(Debug, Deserialize)]
struct PartEntry {
    id: String,
    category_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct JsonSortingProfile {
    categories: HashMap<String, String>,
}

impl JsonSortingProfile {
    /// Profile mapping every part to MISC.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, P, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        Self {
            categories: pairs
                .into_iter()
                .map(|(p, c)| (p.into(), c.into()))
                .collect(),
        }
    }

    /// Parse a parts document.
    pub fn from_json(content: &str) -> Result<Self, SorterError> {
        let file: PartsFile = serde_json::from_str(content)
            .map_err(|e| SorterError::Profile(format!("malformed parts file: {e}")))?;
        Ok(Self::from_pairs(
            file.pieces.into_iter().map(|e| (e.id, e.category_id)),
        ))
    }

    /// Load a parts file. A missing file yields an empty profile.
    pub fn load(path: &Path) -> Result<Self, SorterError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Parts file {} not found, every part sorts to '{}'",
                    path.display(),
                    MISC_CATEGORY
                );
                return Ok(Self::empty());
            }
            Err(e) => {
                return Err(SorterError::Profile(format!("{}: {e}", path.display())));
            }
        };
        let profile = Self::from_json(&content)?;
        info!(
            "Loaded sorting profile: {} parts from {}",
            profile.len(),
            path.display()
        );
        Ok(profile)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl SortingProfile for JsonSortingProfile {
    fn category_for_part(&self, part_id: &str) -> String {
        self.categories
            .get(part_id)
            .cloned()
            .unwrap_or_else(|| MISC_CATEGORY.to_string())
    }
}
