//! Video catalogue models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an uploaded video.
///
/// Serialized as the canonical 36-character hyphenated form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub Uuid);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for VideoId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for VideoId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// A row of the `videos` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    /// Unique video ID
    pub video_id: VideoId,

    /// Display name (the uploaded file name without extension)
    pub name: String,

    /// Canonical public URL prefix for the video's objects
    pub video_path: String,

    /// Source language ID; 0 means unknown
    pub language_id: i32,

    /// Normalised source height, always a standard height
    pub quality: i32,

    /// Creation timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Last update timestamp
    #[serde(rename = "update_at", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Video {
    /// Create a new record ready for insertion. Timestamps are filled by the database.
    pub fn new(
        video_id: VideoId,
        name: impl Into<String>,
        video_path: impl Into<String>,
        language_id: i32,
        quality: i32,
    ) -> Self {
        Self {
            video_id,
            name: name.into(),
            video_path: video_path.into(),
            language_id,
            quality,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Joined read view of a video, as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullVideo {
    pub video_id: VideoId,
    pub name: String,
    pub video_path: String,
    /// Language code, or empty when unknown
    pub language: String,
    /// Renditions believed to be available, ascending
    pub qualities: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "update_at", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
