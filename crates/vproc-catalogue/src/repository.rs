//! Video catalogue repository.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info};
use uuid::Uuid;

use vproc_models::{available_qualities, FullVideo, Video, VideoId};

use crate::config::CatalogueConfig;
use crate::error::{CatalogueError, CatalogueResult};
use crate::field::{FieldValue, VideoField};

const INSERT_TIMEOUT: Duration = Duration::from_secs(2);
const QUERY_TIMEOUT: Duration = Duration::from_secs(3);
const LIST_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_LIMIT: i64 = 10;
const DEFAULT_OFFSET: i64 = 0;

/// Video catalogue operations.
#[async_trait]
pub trait VideoCatalogue: Send + Sync {
    /// Insert a video row. Re-inserting an id overwrites the row.
    async fn insert(&self, video: &Video) -> CatalogueResult<()>;

    /// Change one whitelisted column.
    async fn update_partial(
        &self,
        video_id: &VideoId,
        field: &str,
        value: FieldValue,
    ) -> CatalogueResult<()>;

    /// Language id for a code, `0` when the code is unknown.
    async fn get_language_id(&self, code: &str) -> CatalogueResult<i32>;

    /// Joined view of a video, `None` when absent.
    async fn get_by_id(&self, video_id: &VideoId) -> CatalogueResult<Option<FullVideo>>;

    async fn delete(&self, video_id: &VideoId) -> CatalogueResult<()>;

    /// Page of videos. Unparseable `limit`/`offset` fall back to 10 and 0.
    async fn list(&self, limit: &str, offset: &str) -> CatalogueResult<Vec<Video>>;
}

/// Parse pagination parameters, falling back to defaults.
pub fn parse_page(limit: &str, offset: &str) -> (i64, i64) {
    (
        limit.trim().parse().unwrap_or(DEFAULT_LIMIT),
        offset.trim().parse().unwrap_or(DEFAULT_OFFSET),
    )
}

#[derive(Debug, FromRow)]
struct VideoRow {
    video_id: Uuid,
    name: String,
    video_path: String,
    language_id: Option<i32>,
    quality: i32,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<VideoRow> for Video {
    fn from(row: VideoRow) -> Self {
        Video {
            video_id: VideoId::from_uuid(row.video_id),
            name: row.name,
            video_path: row.video_path,
            language_id: row.language_id.unwrap_or(0),
            quality: row.quality,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct FullVideoRow {
    video_id: Uuid,
    name: String,
    video_path: String,
    code: Option<String>,
    quality: i32,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<FullVideoRow> for FullVideo {
    fn from(row: FullVideoRow) -> Self {
        FullVideo {
            video_id: VideoId::from_uuid(row.video_id),
            name: row.name,
            video_path: row.video_path,
            language: row.code.unwrap_or_default(),
            qualities: available_qualities(u32::try_from(row.quality).unwrap_or(0)),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Bound a query by a wall-clock limit.
async fn bounded<T, F>(op: &'static str, limit: Duration, fut: F) -> CatalogueResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(CatalogueError::Timeout(op, limit.as_secs())),
    }
}

/// SQLx implementation of [`VideoCatalogue`] on PostgreSQL.
#[derive(Clone)]
pub struct PgVideoCatalogue {
    pool: PgPool,
}

impl PgVideoCatalogue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool.
    pub async fn connect(config: &CatalogueConfig) -> CatalogueResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options())
            .await?;

        info!(
            "Connected to catalogue at {}:{}/{}",
            config.host, config.port, config.database
        );
        Ok(Self::new(pool))
    }

    /// Connect using `DB_*` environment variables.
    pub async fn from_env() -> CatalogueResult<Self> {
        let config = CatalogueConfig::from_env()?;
        Self::connect(&config).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl VideoCatalogue for PgVideoCatalogue {
    async fn insert(&self, video: &Video) -> CatalogueResult<()> {
        debug!(video_id = %video.video_id, quality = video.quality, "Inserting video");

        let query = sqlx::query(
            r#"
            INSERT INTO videos (video_id, name, video_path, language_id, quality)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (video_id) DO UPDATE SET
                name = EXCLUDED.name,
                video_path = EXCLUDED.video_path,
                language_id = EXCLUDED.language_id,
                quality = EXCLUDED.quality,
                updated_at = NOW()
            "#,
        )
        .bind(*video.video_id.as_uuid())
        .bind(&video.name)
        .bind(&video.video_path)
        .bind(video.language_id)
        .bind(video.quality)
        .execute(&self.pool);

        bounded("insert", INSERT_TIMEOUT, query).await?;
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

        // Column name comes from the whitelist, never from the caller.
        let sql = format!(
            "UPDATE videos SET {} = $1, updated_at = NOW() WHERE video_id = $2",
            field.column()
        );
        let query = sqlx::query(&sql);
        let query = match value {
            FieldValue::Int(v) => query.bind(v),
            FieldValue::Text(v) => query.bind(v),
        };
        let result = bounded(
            "update",
            QUERY_TIMEOUT,
            query.bind(*video_id.as_uuid()).execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogueError::not_found(video_id.to_string()));
        }

        debug!(video_id = %video_id, field = %field, "Updated video");
        Ok(())
    }

    async fn get_language_id(&self, code: &str) -> CatalogueResult<i32> {
        let query = sqlx::query_scalar::<_, i32>("SELECT language_id FROM languages WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool);

        Ok(bounded("language lookup", QUERY_TIMEOUT, query)
            .await?
            .unwrap_or(0))
    }

    async fn get_by_id(&self, video_id: &VideoId) -> CatalogueResult<Option<FullVideo>> {
        let query = sqlx::query_as::<_, FullVideoRow>(
            r#"
            SELECT
                v.video_id,
                v.name,
                v.video_path,
                l.code,
                v.quality,
                v.created_at,
                v.updated_at
            FROM videos AS v
            LEFT JOIN languages AS l ON l.language_id = v.language_id
            WHERE v.video_id = $1
            "#,
        )
        .bind(*video_id.as_uuid())
        .fetch_optional(&self.pool);

        Ok(bounded("get", QUERY_TIMEOUT, query).await?.map(Into::into))
    }

    async fn delete(&self, video_id: &VideoId) -> CatalogueResult<()> {
        let query = sqlx::query("DELETE FROM videos WHERE video_id = $1")
            .bind(*video_id.as_uuid())
            .execute(&self.pool);

        bounded("delete", QUERY_TIMEOUT, query).await?;
        Ok(())
    }

    async fn list(&self, limit: &str, offset: &str) -> CatalogueResult<Vec<Video>> {
        let (limit, offset) = parse_page(limit, offset);

        let query = sqlx::query_as::<_, VideoRow>(
            r#"
            SELECT video_id, name, video_path, language_id, quality, created_at, updated_at
            FROM videos
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool);

        let rows = bounded("list", LIST_TIMEOUT, query).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
