//! Object key layout.
//!
//! Every object belonging to a video lives under `{video_id}/`. Keys are
//! deterministic, so re-processing a job overwrites in place.

use vproc_models::VideoId;

/// Key prefix shared by all objects of a video.
pub fn video_prefix(video_id: &VideoId) -> String {
    format!("{}/", video_id)
}

/// Staging copy of the original upload. `ext` includes the leading dot.
pub fn staging_key(video_id: &VideoId, ext: &str) -> String {
    format!("{}/tmp{}", video_id, ext)
}

/// Rendition at the given pixel height.
pub fn rendition_key(video_id: &VideoId, height: u32) -> String {
    format!("{}/{}.mp4", video_id, height)
}

/// Extracted audio track.
pub fn audio_key(video_id: &VideoId) -> String {
    format!("{}/audio.mp3", video_id)
}

/// Subtitle track, written by the subtitle service.
pub fn subtitle_key(video_id: &VideoId, lang: &str) -> String {
    format!("{}/{}_sub.vtt", video_id, lang)
}

/// Dubbed audio, written by the dubbing service.
pub fn dubbing_key(video_id: &VideoId, lang: &str) -> String {
    format!("{}/{}_dub.mp3", video_id, lang)
}
