//! Media services HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::debug;

use vproc_models::VideoId;

use crate::error::{MlError, MlResult};

/// Operations offered by the external media services.
///
/// Every call is a POST relative to the job's `base_url`. Any HTTP response
/// counts as accepted; only transport failures are errors.
#[async_trait]
pub trait MediaServices: Send + Sync {
    /// Generate subtitles. Returns the detected source language code.
    async fn create_subtitles(&self, base_url: &str, video_id: &VideoId) -> MlResult<String>;

    async fn translate_subtitles(&self, base_url: &str, video_id: &VideoId, to: &str)
        -> MlResult<()>;

    async fn create_dubbing(&self, base_url: &str, video_id: &VideoId, to: &str) -> MlResult<()>;

    /// Request super-resolution of the `{height}.mp4` rendition.
    async fn upscale(
        &self,
        base_url: &str,
        video_id: &VideoId,
        height: u32,
        realistic: bool,
    ) -> MlResult<()>;
}

/// Configuration for the service client.
#[derive(Debug, Clone)]
pub struct ServiceClientConfig {
    /// Request timeout
    pub timeout: Duration,
}

impl Default for ServiceClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
        }
    }
}

impl ServiceClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            timeout: Duration::from_secs(
                std::env::var("SERVICE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }
}

/// reqwest-backed [`MediaServices`].
#[derive(Clone)]
pub struct ServiceClient {
    http: Client,
}

impl ServiceClient {
    pub fn new(config: ServiceClientConfig) -> MlResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MlError::ClientBuild(e.to_string()))?;

        Ok(Self { http })
    }

    /// Create from environment variables.
    pub fn from_env() -> MlResult<Self> {
        Self::new(ServiceClientConfig::from_env())
    }

    async fn post(&self, url: String, query: &[(&str, String)]) -> MlResult<(String, Response)> {
        debug!("POST {} {:?}", url, query);

        let response = self
            .http
            .post(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| MlError::Network {
                url: url.clone(),
                source,
            })?;

        debug!("{} answered {}", url, response.status());
        Ok((url, response))
    }
}

fn endpoint(base_url: &str, action: &str, video_id: &VideoId) -> String {
    format!("{}/{}/{}", base_url.trim_end_matches('/'), action, video_id)
}

/// The subtitle service may answer with a bare code or a JSON string.
fn language_code(body: &str) -> String {
    body.trim().trim_matches('"').trim().to_string()
}

#[async_trait]
impl MediaServices for ServiceClient {
    async fn create_subtitles(&self, base_url: &str, video_id: &VideoId) -> MlResult<String> {
        let (url, response) = self
            .post(endpoint(base_url, "subtitles", video_id), &[])
            .await?;

        let body = response
            .text()
            .await
            .map_err(|source| MlError::Body { url, source })?;

        Ok(language_code(&body))
    }

    async fn translate_subtitles(
        &self,
        base_url: &str,
        video_id: &VideoId,
        to: &str,
    ) -> MlResult<()> {
        self.post(
            endpoint(base_url, "translate", video_id),
            &[("lang", to.to_string())],
        )
        .await?;
        Ok(())
    }

    async fn create_dubbing(&self, base_url: &str, video_id: &VideoId, to: &str) -> MlResult<()> {
        self.post(
            endpoint(base_url, "dubbing", video_id),
            &[("lang", to.to_string())],
        )
        .await?;
        Ok(())
    }

    async fn upscale(
        &self,
        base_url: &str,
        video_id: &VideoId,
        height: u32,
        realistic: bool,
    ) -> MlResult<()> {
        self.post(
            endpoint(base_url, "upscale", video_id),
            &[("file", height.to_string()), ("real", realistic.to_string())],
        )
        .await?;
        Ok(())
    }
}
