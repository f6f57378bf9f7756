#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for video processing.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - A runner with timeouts that kills the child process on expiry
//! - FFprobe resolution lookup
//! - The rendition transcode and audio extraction commands
//! - A [`MediaToolkit`] seam so the worker can be driven without FFmpeg

pub mod audio;
pub mod command;
pub mod error;
pub mod probe;
pub mod toolkit;
pub mod transcode;

pub use audio::audio_extract_command;
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_resolution, Resolution, PROBE_TIMEOUT};
pub use toolkit::{FfmpegToolkit, MediaToolkit};
pub use transcode::transcode_command;
