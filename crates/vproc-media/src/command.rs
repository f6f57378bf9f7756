//! FFmpeg invocation.
//!
//! [`FfmpegCommand`] collects the arguments for one input and one output.
//! [`FfmpegRunner`] spawns it under a wall-clock limit and keeps the tail of
//! stderr so a failed encode can be reported with ffmpeg's own diagnosis.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{ChildStderr, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

const STDERR_TAIL_LINES: usize = 20;

/// Arguments for a single-input, single-output ffmpeg run.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    before_input: Vec<String>,
    after_input: Vec<String>,
    verbosity: &'static str,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            before_input: Vec::new(),
            after_input: Vec::new(),
            verbosity: "error",
        }
    }

    /// Option applied to the input (placed before `-i`).
    pub fn input_option(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.before_input.push(flag.to_owned());
        self.before_input.push(value.into());
        self
    }

    /// Option applied to the output (placed after `-i`).
    pub fn option(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.after_input.push(flag.to_owned());
        self.after_input.push(value.into());
        self
    }

    /// Output flag without a value.
    pub fn flag(mut self, flag: &str) -> Self {
        self.after_input.push(flag.to_owned());
        self
    }

    /// Select an input stream, e.g. `0:v:0` or the optional `0:a?`.
    pub fn map(self, stream: &str) -> Self {
        self.option("-map", stream)
    }

    /// Scale to `height`, keeping the aspect ratio with an even width.
    pub fn scale_to_height(self, height: u32) -> Self {
        self.option("-vf", format!("scale=-2:{}", height))
    }

    /// Constant rate factor. Passed through unchecked; x264 rejects values
    /// outside its range.
    pub fn crf(self, crf: i32) -> Self {
        self.option("-crf", crf.to_string())
    }

    pub fn video_codec(self, codec: &str) -> Self {
        self.option("-c:v", codec)
    }

    pub fn audio_codec(self, codec: &str) -> Self {
        self.option("-c:a", codec)
    }

    pub fn audio_bitrate(self, bitrate: &str) -> Self {
        self.option("-b:a", bitrate)
    }

    pub fn container(self, format: &str) -> Self {
        self.option("-f", format)
    }

    pub fn verbosity(mut self, level: &'static str) -> Self {
        self.verbosity = level;
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Full argument list, always overwriting the output.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_owned(), "-v".to_owned(), self.verbosity.to_owned()];
        args.extend(self.before_input.iter().cloned());
        args.push("-i".to_owned());
        args.push(self.input.to_string_lossy().into_owned());
        args.extend(self.after_input.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Spawns ffmpeg and waits for it, killing the child once `timeout` elapses.
#[derive(Debug, Clone, Copy)]
pub struct FfmpegRunner {
    timeout: Duration,
}

impl FfmpegRunner {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let binary = check_ffmpeg()?;
        let args = cmd.build_args();
        debug!("ffmpeg {}", args.join(" "));

        let mut child = Command::new(binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .map(|pipe| tokio::spawn(stderr_tail(BufReader::new(pipe).lines())));

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(
                    output = %cmd.output().display(),
                    "ffmpeg exceeded {}s, killing it",
                    self.timeout.as_secs()
                );
                let _ = child.kill().await;
                return Err(MediaError::Timeout(self.timeout.as_secs()));
            }
        };

        if status.success() {
            return Ok(());
        }

        let tail = match stderr {
            Some(handle) => handle.await.ok().filter(|s| !s.is_empty()),
            None => None,
        };
        Err(MediaError::ffmpeg_failed(
            format!("ffmpeg exited with {}", status),
            tail,
            status.code(),
        ))
    }
}

async fn stderr_tail(mut lines: Lines<BufReader<ChildStderr>>) -> String {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    while let Ok(Some(line)) = lines.next_line().await {
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Vec::from(tail).join("\n")
}

/// Locate `ffmpeg` on `PATH`.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Locate `ffprobe` on `PATH`.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_options_precede_input() {
        let args = FfmpegCommand::new("input.mp4", "output.mp4")
            .input_option("-fflags", "+genpts")
            .video_codec("libx264")
            .build_args();

        assert_eq!(
            args,
            vec![
                "-y", "-v", "error", "-fflags", "+genpts", "-i", "input.mp4", "-c:v", "libx264",
                "output.mp4"
            ]
        );
    }

    #[test]
    fn test_negative_crf_is_passed_through() {
        let args = FfmpegCommand::new("in.mp4", "out.mp4").crf(-934).build_args();
        assert!(args.windows(2).any(|w| w[0] == "-crf" && w[1] == "-934"));
    }

    #[test]
    fn test_scale_keeps_even_width() {
        let args = FfmpegCommand::new("in.mp4", "out.mp4")
            .scale_to_height(360)
            .verbosity("warning")
            .build_args();
        assert_eq!(args[2], "warning");
        assert!(args.contains(&"scale=-2:360".to_string()));
    }
}
