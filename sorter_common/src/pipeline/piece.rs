//! Tracked piece record and bin addressing types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Milliseconds since the Unix epoch (0 if the clock is before it).
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Lifecycle status of a tracked piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PieceStatus {
    /// Detected entering the carousel at the feeder platform.
    #[default]
    Created,
    /// Classification request dispatched, result outstanding.
    Classifying,
    /// Classifier returned a part id.
    Classified,
    /// Classifier returned no part id (or timed out).
    Unknown,
    /// No qualifying crop in either classification camera.
    NotFound,
    /// Handed to distribution; chute positioning for it.
    Distributing,
    /// Dropped into its bin.
    Distributed,
}

impl PieceStatus {
    /// True once classification has finished, successfully or not.
    ///
    /// Resolved pieces are eligible for hand-off to distribution.
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Classified | Self::Unknown | Self::NotFound)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Classifying => "classifying",
            Self::Classified => "classified",
            Self::Unknown => "unknown",
            Self::NotFound => "not_found",
            Self::Distributing => "distributing",
            Self::Distributed => "distributed",
        }
    }
}

impl fmt::Display for PieceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical bin size tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BinSize {
    #[default]
    Small,
    Medium,
    Big,
}

/// Address of one bin: layer → section → bin, all zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BinAddress {
    pub layer: usize,
    pub section: usize,
    pub bin: usize,
}

impl BinAddress {
    pub const fn new(layer: usize, section: usize, bin: usize) -> Self {
        Self {
            layer,
            section,
            bin,
        }
    }
}

impl fmt::Display for BinAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}/S{}/B{}", self.layer, self.section, self.bin)
    }
}

/// One physical item moving through the machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedPiece {
    pub id: Uuid,
    pub created_at: u64,
    pub updated_at: u64,
    pub status: PieceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_bin: Option<BinAddress>,
    /// Base64 JPEG payloads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom_image: Option<String>,
}

impl TrackedPiece {
    /// Fresh piece in status `created`.
    pub fn new() -> Self {
        let now = now_ms();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            status: PieceStatus::Created,
            part_id: None,
            category_id: None,
            confidence: None,
            destination_bin: None,
            thumbnail: None,
            top_image: None,
            bottom_image: None,
        }
    }

    /// Stamp `updated_at` with the current time.
    pub fn touch(&mut self) {
        self.updated_at = now_ms().max(self.created_at);
    }

    /// Change status and stamp `updated_at`.
    pub fn set_status(&mut self, status: PieceStatus) {
        self.status = status;
        self.touch();
    }

    /// Short id for log lines (first 8 hex chars).
    pub fn short_id(&self) -> String {
        let mut s = self.id.simple().to_string();
        s.truncate(8);
        s
    }
}

impl Default for TrackedPiece {
    fn default() -> Self {
        Self::new()
    }
}
