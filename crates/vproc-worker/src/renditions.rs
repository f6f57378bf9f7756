//! Rendition and audio tasks.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempPath;
use tokio::sync::Semaphore;
use tracing::debug;

use vproc_media::MediaToolkit;
use vproc_models::{Rendition, VideoId};
use vproc_storage::keys::{audio_key, rendition_key};
use vproc_storage::ObjectStore;

use crate::error::{WorkerError, WorkerResult};
use crate::metrics;

/// Everything a fan-out task needs, cheap to clone into each task.
#[derive(Clone)]
pub struct JobScope {
    pub video_id: VideoId,
    /// Local copy of the source
    pub source: Arc<PathBuf>,
    pub work_dir: PathBuf,
    pub store: Arc<dyn ObjectStore>,
    pub media: Arc<dyn MediaToolkit>,
    /// Caps concurrent FFmpeg processes
    pub ffmpeg_permits: Arc<Semaphore>,
    pub transcode_timeout: Duration,
    pub audio_timeout: Duration,
}

impl JobScope {
    /// Fresh scratch file in the work directory, removed on drop.
    fn scratch_file(&self, label: &str, suffix: &str) -> io::Result<TempPath> {
        Ok(tempfile::Builder::new()
            .prefix(&format!("{}_{}_", self.video_id, label))
            .suffix(suffix)
            .tempfile_in(&self.work_dir)?
            .into_temp_path())
    }
}

/// Encode one rendition and upload it under `{video_id}/{height}.mp4`.
pub async fn transcode_rendition(scope: &JobScope, rendition: Rendition) -> WorkerResult<()> {
    let height = rendition.height;
    let fail = |e: &dyn std::fmt::Display| WorkerError::transcode_failed(height, e.to_string());

    let output = scope
        .scratch_file(&format!("{}p", height), ".mp4")
        .map_err(|e| fail(&e))?;

    {
        let _permit = scope
            .ffmpeg_permits
            .acquire()
            .await
            .map_err(|e| fail(&e))?;

        scope
            .media
            .transcode(&scope.source, &output, rendition, scope.transcode_timeout)
            .await
            .map_err(|e| fail(&e))?;
    }

    let key = rendition_key(&scope.video_id, height);
    scope
        .store
        .upload_file(&output, &key)
        .await
        .map_err(|e| fail(&e))?;

    debug!(height, crf = rendition.crf, "Uploaded rendition {}", key);
    metrics::record_rendition(height);
    Ok(())
}

/// Extract the audio track and upload it under `{video_id}/audio.mp3`.
pub async fn extract_audio_track(scope: &JobScope) -> WorkerResult<()> {
    let fail = |e: &dyn std::fmt::Display| WorkerError::AudioExtractFailed(e.to_string());

    let output = scope.scratch_file("audio", ".mp3").map_err(|e| fail(&e))?;

    {
        let _permit = scope
            .ffmpeg_permits
            .acquire()
            .await
            .map_err(|e| fail(&e))?;

        scope
            .media
            .extract_audio(&scope.source, &output, scope.audio_timeout)
            .await
            .map_err(|e| fail(&e))?;
    }

    let key = audio_key(&scope.video_id);
    scope
        .store
        .upload_file(&output, &key)
        .await
        .map_err(|e| fail(&e))?;

    debug!("Uploaded audio track {}", key);
    Ok(())
}
