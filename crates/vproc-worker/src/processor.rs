//! Video processing orchestration.
//!
//! One job runs in five phases:
//! 1. Fetch the staging object into a local temp file
//! 2. Probe the source and plan renditions
//! 3. Store the base rendition, then fan out the catalogue chain, the
//!    ladder transcodes and the optional upscale request
//! 4. Join every task and aggregate their errors
//! 5. Release the temp file and the staging object
//!
//! Fetch and probe failures end the job early. Fan-out tasks never cancel
//! each other; their errors are collected into [`WorkerError::PartialFailure`].

use std::sync::Arc;
use std::time::Instant;

use tempfile::TempPath;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

use vproc_catalogue::VideoCatalogue;
use vproc_media::MediaToolkit;
use vproc_ml_client::MediaServices;
use vproc_models::{RenditionPlan, Video, VideoJob};
use vproc_storage::keys::{rendition_key, staging_key};
use vproc_storage::{ObjectStore, TimedStore};

use crate::cleanup::{release_staging, staging_guard};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::{JobLogger, JobPhase};
use crate::metrics;
use crate::renditions::{extract_audio_track, transcode_rendition, JobScope};

/// Shared collaborators for job processing.
pub struct ProcessingContext {
    pub config: WorkerConfig,
    pub store: Arc<dyn ObjectStore>,
    pub catalogue: Arc<dyn VideoCatalogue>,
    pub media: Arc<dyn MediaToolkit>,
    pub services: Arc<dyn MediaServices>,
    pub ffmpeg_permits: Arc<Semaphore>,
}

impl ProcessingContext {
    /// Every store call made on behalf of a job is bounded by
    /// `config.storage_timeout`.
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn ObjectStore>,
        catalogue: Arc<dyn VideoCatalogue>,
        media: Arc<dyn MediaToolkit>,
        services: Arc<dyn MediaServices>,
    ) -> Self {
        let ffmpeg_permits = Arc::new(Semaphore::new(config.max_ffmpeg_processes.max(1)));
        let store: Arc<dyn ObjectStore> = Arc::new(TimedStore::new(store, config.storage_timeout));
        Self {
            config,
            store,
            catalogue,
            media,
            services,
            ffmpeg_permits,
        }
    }
}

/// Processes one video job end to end.
#[derive(Clone)]
pub struct JobProcessor {
    ctx: Arc<ProcessingContext>,
}

impl JobProcessor {
    pub fn new(ctx: ProcessingContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub fn context(&self) -> &ProcessingContext {
        &self.ctx
    }

    /// Process a job. The staging object is released whatever the outcome.
    pub async fn process(&self, job: &VideoJob) -> WorkerResult<()> {
        let logger = JobLogger::new(&job.video_id, "process_video");
        let span = logger.span();

        async {
            let started = Instant::now();
            let key = staging_key(&job.video_id, &job.file_ext);
            logger.started(&key);

            let staging = staging_guard(Arc::clone(&self.ctx.store), key);

            let result = self.run(job, &logger).await;

            release_staging(&*self.ctx.store, staging).await;

            let elapsed = started.elapsed();
            match &result {
                Ok(()) => {
                    metrics::record_job("success", elapsed.as_secs_f64());
                    logger.finished(elapsed);
                }
                Err(e) => {
                    logger.failed(elapsed, e);
                    for entry in e.entries() {
                        metrics::record_task_failure(entry.kind());
                    }
                    let outcome = match e {
                        WorkerError::PartialFailure(_) => "partial_failure",
                        _ => "failed",
                    };
                    metrics::record_job(outcome, elapsed.as_secs_f64());
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, job: &VideoJob, logger: &JobLogger) -> WorkerResult<()> {
        let source = self.fetch(job).await?;
        logger.phase(JobPhase::Fetch, "source downloaded");

        let resolution = self
            .ctx
            .media
            .probe(&source)
            .await
            .map_err(|e| WorkerError::ProbeFailed(e.to_string()))?;

        let plan = RenditionPlan::new(
            resolution.height,
            job.upscale,
            self.ctx.config.legacy_normalise_crf,
        );
        logger.phase(
            JobPhase::Plan,
            &format!(
                "probed {}x{}, base {}p, ladder {:?}, upscale {}",
                resolution.width,
                resolution.height,
                plan.base,
                plan.ladder_heights(),
                plan.upscale
            ),
        );

        let scope = JobScope {
            video_id: job.video_id,
            source: Arc::new(source.to_path_buf()),
            work_dir: self.ctx.config.work_dir.clone(),
            store: Arc::clone(&self.ctx.store),
            media: Arc::clone(&self.ctx.media),
            ffmpeg_permits: Arc::clone(&self.ctx.ffmpeg_permits),
            transcode_timeout: self.ctx.config.transcode_timeout,
            audio_timeout: self.ctx.config.audio_timeout,
        };

        let mut errors = self.store_base(&scope, &plan, logger).await?;
        errors.extend(self.fan_out(job, &scope, &plan).await);

        // Every task has joined; the local source can go now.
        drop(source);
        logger.phase(JobPhase::Cleanup, "local source released");

        if errors.is_empty() {
            Ok(())
        } else {
            for e in &errors {
                logger.degraded(JobPhase::FanOut, &e.to_string());
            }
            Err(WorkerError::PartialFailure(errors))
        }
    }

    /// Download the staging object into a temp file in the work directory.
    async fn fetch(&self, job: &VideoJob) -> WorkerResult<TempPath> {
        let fail = |e: &dyn std::fmt::Display| WorkerError::FetchFailed(e.to_string());

        let path = tempfile::Builder::new()
            .prefix(&format!("{}_source_", job.video_id))
            .suffix(&job.file_ext)
            .tempfile_in(&self.ctx.config.work_dir)
            .map_err(|e| fail(&e))?
            .into_temp_path();

        let key = staging_key(&job.video_id, &job.file_ext);
        self.ctx
            .store
            .download_file(&key, &path)
            .await
            .map_err(|e| fail(&e))?;

        Ok(path)
    }

    /// Make `{video_id}/{base}.mp4` exist before anything else starts.
    ///
    /// A non-standard source is re-encoded to the base height. If that fails
    /// the source is stored as-is under the base key and the failure is
    /// reported with the other task errors.
    async fn store_base(
        &self,
        scope: &JobScope,
        plan: &RenditionPlan,
        logger: &JobLogger,
    ) -> WorkerResult<Vec<WorkerError>> {
        let mut errors = Vec::new();

        if let Some(normalise) = plan.normalise {
            logger.phase(
                JobPhase::Base,
                &format!(
                    "normalising {}p to {}p (crf {})",
                    plan.probed_height, normalise.height, normalise.crf
                ),
            );
            match transcode_rendition(scope, normalise).await {
                Ok(()) => return Ok(errors),
                Err(e) => {
                    logger.degraded(
                        JobPhase::Base,
                        &format!("{}, storing source as {}p", e, plan.base),
                    );
                    errors.push(e);
                }
            }
        }

        let key = rendition_key(&scope.video_id, plan.base);
        self.ctx
            .store
            .upload_file(&scope.source, &key)
            .await
            .map_err(|e| WorkerError::storage_failed(e.to_string()))?;

        Ok(errors)
    }

    /// Run the concurrent tasks and collect their errors.
    async fn fan_out(
        &self,
        job: &VideoJob,
        scope: &JobScope,
        plan: &RenditionPlan,
    ) -> Vec<WorkerError> {
        let mut tasks: JoinSet<Vec<WorkerError>> = JoinSet::new();

        tasks.spawn(
            catalogue_chain(
                scope.clone(),
                job.clone(),
                plan.base,
                Arc::clone(&self.ctx.catalogue),
                Arc::clone(&self.ctx.services),
            )
            .in_current_span(),
        );

        for rendition in plan.ladder.iter().copied() {
            let scope = scope.clone();
            tasks.spawn(
                async move {
                    transcode_rendition(&scope, rendition)
                        .await
                        .err()
                        .into_iter()
                        .collect::<Vec<_>>()
                }
                .in_current_span(),
            );
        }

        if plan.upscale {
            let services = Arc::clone(&self.ctx.services);
            let base_url = job.base_url.clone();
            let video_id = job.video_id;
            let (height, realistic) = (plan.base, job.realistic);
            tasks.spawn(
                async move {
                    services
                        .upscale(&base_url, &video_id, height, realistic)
                        .await
                        .err()
                        .map(|e| WorkerError::UpscaleRequestFailed(e.to_string()))
                        .into_iter()
                        .collect::<Vec<_>>()
                }
                .in_current_span(),
            );
        }

        let mut errors = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(task_errors) => errors.extend(task_errors),
                Err(e) => errors.push(WorkerError::TaskPanicked(e.to_string())),
            }
        }
        errors
    }
}

/// Audio, then subtitles, then language lookup, then the catalogue insert.
///
/// Each step runs even when an earlier one failed; the insert falls back to
/// language `0`.
async fn catalogue_chain(
    scope: JobScope,
    job: VideoJob,
    base: u32,
    catalogue: Arc<dyn VideoCatalogue>,
    services: Arc<dyn MediaServices>,
) -> Vec<WorkerError> {
    let mut errors = Vec::new();

    if let Err(e) = extract_audio_track(&scope).await {
        errors.push(e);
    }

    let code = match services.create_subtitles(&job.base_url, &job.video_id).await {
        Ok(code) => code,
        Err(e) => {
            errors.push(WorkerError::SubtitleRequestFailed(e.to_string()));
            String::new()
        }
    };

    let language_id = if code.is_empty() {
        0
    } else {
        match catalogue.get_language_id(&code).await {
            Ok(id) => id,
            Err(e) => {
                errors.push(WorkerError::LanguageLookupFailed(e.to_string()));
                0
            }
        }
    };

    let video = Video::new(
        job.video_id,
        job.file_name.clone(),
        scope.store.public_url(&job.video_id),
        language_id,
        i32::try_from(base).unwrap_or(i32::MAX),
    );
    if let Err(e) = catalogue.insert(&video).await {
        errors.push(WorkerError::CatalogueFailed(e.to_string()));
    }

    errors
}
