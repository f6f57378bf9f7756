//! Shared data models for the vproc video pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Upload jobs carried on the message bus
//! - Video catalogue records and their joined read view
//! - The rendition ladder planner (standard heights, CRF schedule, upscale gate)

pub mod job;
pub mod rendition;
pub mod video;

// Re-export common types
pub use job::VideoJob;
pub use rendition::{
    available_qualities, closest_standard_height, ladder_crf, legacy_normalise_crf,
    lower_standard_heights, normalise_crf, upscale_allowed, Rendition, RenditionPlan,
    STANDARD_HEIGHTS, UPSCALE_MAX_HEIGHT,
};
pub use video::{FullVideo, Video, VideoId};
