//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent FFmpeg processes per job
    pub max_ffmpeg_processes: usize,
    /// Work directory for temporary files
    pub work_dir: PathBuf,
    /// Limit for one rendition transcode
    pub transcode_timeout: Duration,
    /// Limit for audio extraction
    pub audio_timeout: Duration,
    /// Limit for any single object storage call
    pub storage_timeout: Duration,
    /// Encode the normalising rendition with `26 - 2 * height`
    pub legacy_normalise_crf: bool,
    /// Pause after a failed bus read
    pub read_error_backoff: Duration,
    /// Prometheus listener, disabled when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_ffmpeg_processes: 4,
            work_dir: std::env::temp_dir(),
            transcode_timeout: Duration::from_secs(30 * 60),
            audio_timeout: Duration::from_secs(5 * 60),
            storage_timeout: Duration::from_secs(10 * 60),
            legacy_normalise_crf: false,
            read_error_backoff: Duration::from_secs(1),
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_ffmpeg_processes: std::env::var("WORKER_MAX_FFMPEG")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_ffmpeg_processes),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            transcode_timeout: std::env::var("WORKER_TRANSCODE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.transcode_timeout),
            audio_timeout: std::env::var("WORKER_AUDIO_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.audio_timeout),
            storage_timeout: std::env::var("WORKER_STORAGE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.storage_timeout),
            legacy_normalise_crf: std::env::var("WORKER_LEGACY_NORMALISE_CRF")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            read_error_backoff: defaults.read_error_backoff,
            metrics_addr: std::env::var("WORKER_METRICS_ADDR")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_ffmpeg_processes, 4);
        assert_eq!(config.transcode_timeout, Duration::from_secs(1800));
        assert_eq!(config.audio_timeout, Duration::from_secs(300));
        assert_eq!(config.storage_timeout, Duration::from_secs(600));
        assert_eq!(config.read_error_backoff, Duration::from_secs(1));
        assert!(!config.legacy_normalise_crf);
        assert!(config.metrics_addr.is_none());
    }
}
