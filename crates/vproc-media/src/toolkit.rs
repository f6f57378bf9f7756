//! Media toolkit abstraction.
//!
//! The worker only talks to FFmpeg through [`MediaToolkit`], which keeps the
//! orchestration testable on machines without the toolchain.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use vproc_models::Rendition;

use crate::audio::audio_extract_command;
use crate::command::FfmpegRunner;
use crate::error::MediaResult;
use crate::probe::{probe_resolution, Resolution, PROBE_TIMEOUT};
use crate::transcode::transcode_command;

/// Operations the worker needs from the media toolchain.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Resolution of the first video stream.
    async fn probe(&self, input: &Path) -> MediaResult<Resolution>;

    /// Encode one rendition of `input` into `output`.
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        rendition: Rendition,
        timeout: Duration,
    ) -> MediaResult<()>;

    /// Extract the audio track of `input` as MP3 into `output`.
    async fn extract_audio(&self, input: &Path, output: &Path, timeout: Duration)
        -> MediaResult<()>;
}

/// [`MediaToolkit`] backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    probe_timeout: Duration,
}

impl Default for FfmpegToolkit {
    fn default() -> Self {
        Self {
            probe_timeout: PROBE_TIMEOUT,
        }
    }
}

impl FfmpegToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe(&self, input: &Path) -> MediaResult<Resolution> {
        probe_resolution(input, self.probe_timeout).await
    }

    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        rendition: Rendition,
        timeout: Duration,
    ) -> MediaResult<()> {
        debug!(
            height = rendition.height,
            crf = rendition.crf,
            "Transcoding {} -> {}",
            input.display(),
            output.display()
        );
        let cmd = transcode_command(input, output, rendition);
        FfmpegRunner::with_timeout(timeout).run(&cmd).await
    }

    async fn extract_audio(
        &self,
        input: &Path,
        output: &Path,
        timeout: Duration,
    ) -> MediaResult<()> {
        debug!("Extracting audio {} -> {}", input.display(), output.display());
        let cmd = audio_extract_command(input, output);
        FfmpegRunner::with_timeout(timeout).run(&cmd).await
    }
}
