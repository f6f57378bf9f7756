//! In-memory collaborators for worker tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use vproc_catalogue::{CatalogueError, CatalogueResult, FieldValue, VideoCatalogue, VideoField};
use vproc_media::{MediaError, MediaResult, MediaToolkit, Resolution};
use vproc_ml_client::{MediaServices, MlError, MlResult};
use vproc_models::{available_qualities, FullVideo, Rendition, Video, VideoId, VideoJob};
use vproc_queue::{JobSource, QueueError, QueueResult, RawMessage};
use vproc_storage::{ObjectStore, StorageError, StorageResult};
use vproc_worker::{JobProcessor, ProcessingContext, WorkerConfig};

pub const VIDEO_ID: &str = "00000000-0000-0000-0000-000000000001";
pub const SOURCE_BYTES: &[u8] = b"source video bytes";

pub fn video_id() -> VideoId {
    VIDEO_ID.parse().unwrap()
}

pub fn job() -> VideoJob {
    VideoJob::new(video_id(), "holiday", ".mp4", "http://svc")
}

// =============================================================================
// Object storage
// =============================================================================

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    failing_uploads: Mutex<HashSet<String>>,
    stalled: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn put(&self, key: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn fail_upload(&self, key: &str) {
        self.failing_uploads.lock().unwrap().insert(key.to_string());
    }

    /// Transfers touching `key` never complete.
    pub fn stall(&self, key: &str) {
        self.stalled.lock().unwrap().insert(key.to_string());
    }

    async fn maybe_stall(&self, key: &str) {
        let stalled = self.stalled.lock().unwrap().contains(key);
        if stalled {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload_file(&self, path: &Path, key: &str) -> StorageResult<()> {
        self.maybe_stall(key).await;
        if self.failing_uploads.lock().unwrap().contains(key) {
            return Err(StorageError::upload_failed(key, "injected"));
        }
        let bytes = tokio::fs::read(path).await?;
        self.put(key, &bytes);
        Ok(())
    }

    async fn download_file(&self, key: &str, path: &Path) -> StorageResult<()> {
        self.maybe_stall(key).await;
        let bytes = self.get(key).ok_or_else(|| StorageError::not_found(key))?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }

    fn public_url(&self, video_id: &VideoId) -> String {
        format!("https://s3.test/videos/{}", video_id)
    }
}

// =============================================================================
// Catalogue
// =============================================================================

#[derive(Default)]
pub struct MemoryCatalogue {
    videos: Mutex<HashMap<VideoId, Video>>,
    languages: Mutex<HashMap<String, i32>>,
    inserts: AtomicUsize,
}

impl MemoryCatalogue {
    pub fn with_language(self, code: &str, id: i32) -> Self {
        self.languages.lock().unwrap().insert(code.to_string(), id);
        self
    }

    pub fn video(&self, id: &VideoId) -> Option<Video> {
        self.videos.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.videos.lock().unwrap().len()
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoCatalogue for MemoryCatalogue {
    async fn insert(&self, video: &Video) -> CatalogueResult<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.videos
            .lock()
            .unwrap()
            .insert(video.video_id, video.clone());
        Ok(())
    }

    async fn update_partial(
        &self,
        video_id: &VideoId,
        field: &str,
        value: FieldValue,
    ) -> CatalogueResult<()> {
        let field: VideoField = field.parse()?;
        field.check(&value)?;

        let mut videos = self.videos.lock().unwrap();
        let video = videos
            .get_mut(video_id)
            .ok_or_else(|| CatalogueError::not_found(video_id.to_string()))?;
        match (field, value) {
            (VideoField::LanguageId, FieldValue::Int(v)) => video.language_id = v,
            (VideoField::Quality, FieldValue::Int(v)) => video.quality = v,
            (VideoField::Name, FieldValue::Text(v)) => video.name = v,
            (VideoField::VideoPath, FieldValue::Text(v)) => video.video_path = v,
            (field, _) => return Err(CatalogueError::invalid_field(field.column())),
        }
        Ok(())
    }

    async fn get_language_id(&self, code: &str) -> CatalogueResult<i32> {
        Ok(self.languages.lock().unwrap().get(code).copied().unwrap_or(0))
    }

    async fn get_by_id(&self, video_id: &VideoId) -> CatalogueResult<Option<FullVideo>> {
        let languages = self.languages.lock().unwrap().clone();
        Ok(self.video(video_id).map(|v| FullVideo {
            video_id: v.video_id,
            name: v.name,
            video_path: v.video_path,
            language: languages
                .iter()
                .find(|(_, id)| **id == v.language_id)
                .map(|(code, _)| code.clone())
                .unwrap_or_default(),
            qualities: available_qualities(v.quality as u32),
            created_at: v.created_at,
            updated_at: v.updated_at,
        }))
    }

    async fn delete(&self, video_id: &VideoId) -> CatalogueResult<()> {
        self.videos.lock().unwrap().remove(video_id);
        Ok(())
    }

    async fn list(&self, limit: &str, offset: &str) -> CatalogueResult<Vec<Video>> {
        let (limit, offset) = vproc_catalogue::parse_page(limit, offset);
        Ok(self
            .videos
            .lock()
            .unwrap()
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Media toolkit
// =============================================================================

pub struct ScriptedMedia {
    resolution: MediaResult<Resolution>,
    failing_heights: HashSet<u32>,
    panicking_heights: HashSet<u32>,
    panic_on_probe: bool,
    fail_audio: bool,
    transcodes: Mutex<Vec<Rendition>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedMedia {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: Ok(Resolution { width, height }),
            failing_heights: HashSet::new(),
            panicking_heights: HashSet::new(),
            panic_on_probe: false,
            fail_audio: false,
            transcodes: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn unprobeable() -> Self {
        Self {
            resolution: Err(MediaError::invalid_video("No video stream found")),
            ..Self::new(0, 0)
        }
    }

    pub fn failing_at(mut self, height: u32) -> Self {
        self.failing_heights.insert(height);
        self
    }

    /// The encoder task for `height` panics instead of returning.
    pub fn panicking_at(mut self, height: u32) -> Self {
        self.panicking_heights.insert(height);
        self
    }

    pub fn panicking_probe(mut self) -> Self {
        self.panic_on_probe = true;
        self
    }

    pub fn failing_audio(mut self) -> Self {
        self.fail_audio = true;
        self
    }

    pub fn transcodes(&self) -> Vec<Rendition> {
        self.transcodes.lock().unwrap().clone()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    async fn busy(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaToolkit for ScriptedMedia {
    async fn probe(&self, _input: &Path) -> MediaResult<Resolution> {
        if self.panic_on_probe {
            panic!("probe crashed");
        }
        match &self.resolution {
            Ok(r) => Ok(*r),
            Err(e) => Err(MediaError::invalid_video(e.to_string())),
        }
    }

    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        rendition: Rendition,
        _timeout: Duration,
    ) -> MediaResult<()> {
        assert!(input.exists(), "source must exist while tasks run");
        self.transcodes.lock().unwrap().push(rendition);
        self.busy().await;

        if self.panicking_heights.contains(&rendition.height) {
            panic!("encoder crashed at {}p", rendition.height);
        }
        if self.failing_heights.contains(&rendition.height) {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some("Conversion failed!".to_string()),
                Some(1),
            ));
        }
        tokio::fs::write(output, format!("{}p crf {}", rendition.height, rendition.crf)).await?;
        Ok(())
    }

    async fn extract_audio(&self, input: &Path, output: &Path, _timeout: Duration) -> MediaResult<()> {
        assert!(input.exists(), "source must exist while tasks run");
        self.busy().await;

        if self.fail_audio {
            return Err(MediaError::Timeout(300));
        }
        tokio::fs::write(output, b"mp3").await?;
        Ok(())
    }
}

// =============================================================================
// External services
// =============================================================================

pub struct RecordingServices {
    subtitle_language: Option<String>,
    fail_upscale: bool,
    calls: Mutex<Vec<String>>,
}

impl RecordingServices {
    pub fn answering(code: &str) -> Self {
        Self {
            subtitle_language: Some(code.to_string()),
            fail_upscale: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Subtitle requests fail at the transport level.
    pub fn unreachable_subtitles() -> Self {
        Self {
            subtitle_language: None,
            ..Self::answering("")
        }
    }

    pub fn failing_upscale(mut self) -> Self {
        self.fail_upscale = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn upscale_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.contains("/upscale/"))
            .collect()
    }

    fn record(&self, url: String) {
        self.calls.lock().unwrap().push(url);
    }
}

#[async_trait]
impl MediaServices for RecordingServices {
    async fn create_subtitles(&self, base_url: &str, video_id: &VideoId) -> MlResult<String> {
        self.record(format!("{}/subtitles/{}", base_url, video_id));
        self.subtitle_language
            .clone()
            .ok_or_else(|| MlError::ClientBuild("connection refused".to_string()))
    }

    async fn translate_subtitles(&self, base_url: &str, video_id: &VideoId, to: &str) -> MlResult<()> {
        self.record(format!("{}/translate/{}?lang={}", base_url, video_id, to));
        Ok(())
    }

    async fn create_dubbing(&self, base_url: &str, video_id: &VideoId, to: &str) -> MlResult<()> {
        self.record(format!("{}/dubbing/{}?lang={}", base_url, video_id, to));
        Ok(())
    }

    async fn upscale(
        &self,
        base_url: &str,
        video_id: &VideoId,
        height: u32,
        realistic: bool,
    ) -> MlResult<()> {
        self.record(format!(
            "{}/upscale/{}?file={}&real={}",
            base_url, video_id, height, realistic
        ));
        if self.fail_upscale {
            return Err(MlError::ClientBuild("connection reset".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Bus
// =============================================================================

/// Replays a fixed script, then blocks forever.
pub struct ScriptedSource {
    script: Mutex<VecDeque<QueueResult<RawMessage>>>,
    reads: Mutex<Vec<Instant>>,
    drained: Notify,
}

impl ScriptedSource {
    pub fn new(script: Vec<QueueResult<RawMessage>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            reads: Mutex::new(Vec::new()),
            drained: Notify::new(),
        }
    }

    pub fn read_error() -> QueueResult<RawMessage> {
        Err(QueueError::receive_failed("broker transport failure"))
    }

    pub fn message(payload: &[u8]) -> QueueResult<RawMessage> {
        Ok(RawMessage::new(payload))
    }

    /// Resolves once every scripted entry has been handed out and the
    /// consumer has asked for more.
    pub async fn drained(&self) {
        self.drained.notified().await;
    }

    pub fn read_times(&self) -> Vec<Instant> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobSource for ScriptedSource {
    async fn recv(&self) -> QueueResult<RawMessage> {
        self.reads.lock().unwrap().push(Instant::now());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(entry) => entry,
            None => {
                self.drained.notify_one();
                std::future::pending().await
            }
        }
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub catalogue: Arc<MemoryCatalogue>,
    pub media: Arc<ScriptedMedia>,
    pub services: Arc<RecordingServices>,
    pub work_dir: tempfile::TempDir,
    pub processor: JobProcessor,
}

impl Harness {
    pub fn new(media: ScriptedMedia, services: RecordingServices) -> Self {
        Self::with(media, services, MemoryCatalogue::default(), |_| {})
    }

    pub fn with(
        media: ScriptedMedia,
        services: RecordingServices,
        catalogue: MemoryCatalogue,
        configure: impl FnOnce(&mut WorkerConfig),
    ) -> Self {
        let store = Arc::new(MemoryStore::default());
        let catalogue = Arc::new(catalogue);
        let media = Arc::new(media);
        let services = Arc::new(services);
        let work_dir = tempfile::tempdir().unwrap();

        let mut config = WorkerConfig {
            work_dir: work_dir.path().to_path_buf(),
            ..WorkerConfig::default()
        };
        configure(&mut config);

        let processor = JobProcessor::new(ProcessingContext::new(
            config,
            store.clone(),
            catalogue.clone(),
            media.clone(),
            services.clone(),
        ));

        Self {
            store,
            catalogue,
            media,
            services,
            work_dir,
            processor,
        }
    }

    /// Put the upload where the API would have left it.
    pub fn stage(&self, job: &VideoJob) {
        self.store.put(
            &format!("{}/tmp{}", job.video_id, job.file_ext),
            SOURCE_BYTES,
        );
    }

    /// Keys under the video prefix, without the prefix.
    pub fn video_keys(&self, job: &VideoJob) -> Vec<String> {
        let prefix = format!("{}/", job.video_id);
        self.store
            .keys()
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn staging_present(&self, job: &VideoJob) -> bool {
        self.store
            .get(&format!("{}/tmp{}", job.video_id, job.file_ext))
            .is_some()
    }

    pub fn work_dir_is_empty(&self) -> bool {
        std::fs::read_dir(self.work_dir.path()).unwrap().next().is_none()
    }
}

/// `{h}.mp4` for each height plus the audio track, sorted like the store.
pub fn expected_keys(heights: &[u32]) -> Vec<String> {
    let mut keys: Vec<String> = heights.iter().map(|h| format!("{}.mp4", h)).collect();
    keys.push("audio.mp3".to_string());
    keys.sort();
    keys
}
