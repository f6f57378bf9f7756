//! Upload job carried on the message bus.

use serde::{Deserialize, Serialize};

use crate::video::VideoId;

/// Job to process a freshly uploaded video.
///
/// Produced by the upload path after the staging object is written, consumed
/// once by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoJob {
    /// Video ID, also the storage key prefix
    pub video_id: VideoId,
    /// Display name for the catalogue
    pub file_name: String,
    /// Upload extension including the leading dot (e.g. ".mp4")
    pub file_ext: String,
    /// Base URL of the external ML services
    pub base_url: String,
    /// Whether an upscale was requested
    #[serde(default)]
    pub upscale: bool,
    /// Whether the upscaler should use its realistic-video model
    #[serde(rename = "realistic_video", default = "default_realistic")]
    pub realistic: bool,
}

/// The upload path asks for the realistic model unless told otherwise.
fn default_realistic() -> bool {
    true
}

impl VideoJob {
    pub fn new(
        video_id: VideoId,
        file_name: impl Into<String>,
        file_ext: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            video_id,
            file_name: file_name.into(),
            file_ext: file_ext.into(),
            base_url: base_url.into(),
            upscale: false,
            realistic: default_realistic(),
        }
    }

    /// Set the upscale flag.
    pub fn with_upscale(mut self, upscale: bool) -> Self {
        self.upscale = upscale;
        self
    }

    /// Set the realistic-video flag.
    pub fn with_realistic(mut self, realistic: bool) -> Self {
        self.realistic = realistic;
        self
    }

    /// Bus message key: the canonical video ID.
    pub fn message_key(&self) -> String {
        self.video_id.to_string()
    }
}
