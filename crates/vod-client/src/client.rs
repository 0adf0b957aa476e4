//! VOD upstream HTTP client — the only component allowed to call the
//! upstream VOD API directly.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{multipart, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{VodClientError, VodClientResult};
use crate::metrics::record_request;

/// VOD client configuration.
#[derive(Debug, Clone)]
pub struct VodClientConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
    pub reachability_timeout: Duration,
}

impl VodClientConfig {
    pub fn from_env() -> VodClientResult<Self> {
        let base_url = std::env::var("VOD_API_BASE_URL")
            .map_err(|_| VodClientError::auth("VOD_API_BASE_URL not set"))?;
        Ok(Self {
            base_url,
            bearer_token: std::env::var("VOD_API_TOKEN").ok(),
            timeout: Duration::from_secs(30),
            reachability_timeout: Duration::from_secs(5),
        })
    }
}

/// Summary record returned by `list_recent_vods`/`get_vod`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VodSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Caption artifact metadata returned by `get_vod_captions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VodCaptions {
    pub vod_id: String,
    pub caption_url: Option<String>,
}

/// Typed REST client for the six VOD operations: a bearer-token +
/// `get`/`post` shape over the VOD upstream's REST surface.
pub struct VodClient {
    http: Client,
    config: VodClientConfig,
}

impl Clone for VodClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            config: self.config.clone(),
        }
    }
}

impl VodClient {
    pub fn new(config: VodClientConfig) -> VodClientResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> VodClientResult<Self> {
        Self::new(VodClientConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        operation: &str,
        builder: reqwest::RequestBuilder,
    ) -> VodClientResult<T> {
        let started = std::time::Instant::now();
        let response = self.authed(builder).send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                VodClientError::unreachable(e.to_string())
            } else {
                VodClientError::Network(e)
            }
        })?;

        let status = response.status();
        record_request(operation, status.as_u16(), started.elapsed().as_secs_f64() * 1000.0);

        if status == StatusCode::NOT_FOUND {
            return Err(VodClientError::not_found(format!("{operation}: not found")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VodClientError::from_status(status, body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| VodClientError::malformed(e.to_string()))
    }

    /// Up to `limit` most recently uploaded VODs.
    pub async fn list_recent_vods(&self, limit: u32) -> VodClientResult<Vec<VodSummary>> {
        let builder = self
            .http
            .get(self.url(&format!("/api/vods?limit={limit}")));
        self.send("list_recent_vods", builder).await
    }

    pub async fn get_vod(&self, id: &str) -> VodClientResult<VodSummary> {
        let builder = self.http.get(self.url(&format!("/api/vods/{id}")));
        self.send("get_vod", builder).await
    }

    pub async fn get_vod_captions(&self, id: &str) -> VodClientResult<VodCaptions> {
        let builder = self.http.get(self.url(&format!("/api/vods/{id}/captions")));
        self.send("get_vod_captions", builder).await
    }

    /// Uploads a captioned video file via multipart.
    pub async fn upload_video_file(&self, id: &str, path: &Path) -> VodClientResult<()> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();
        let part = multipart::Part::bytes(bytes).file_name(filename);
        let form = multipart::Form::new().part("file", part);

        let builder = self
            .http
            .post(self.url(&format!("/api/vods/{id}/video")))
            .multipart(form);
        self.send::<serde_json::Value>("upload_video_file", builder).await?;
        debug!(vod_id = %id, path = %path.display(), "uploaded video file");
        Ok(())
    }

    /// Uploads a caption artifact via multipart.
    pub async fn upload_caption_file(&self, id: &str, path: &Path) -> VodClientResult<()> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("captions.scc")
            .to_string();
        let part = multipart::Part::bytes(bytes).file_name(filename);
        let form = multipart::Form::new().part("file", part);

        let builder = self
            .http
            .post(self.url(&format!("/api/vods/{id}/captions")))
            .multipart(form);
        self.send::<serde_json::Value>("upload_caption_file", builder).await?;
        debug!(vod_id = %id, path = %path.display(), "uploaded caption file");
        Ok(())
    }

    /// Derives the upstream URL for a VOD's original source file, used by
    /// the pipeline's LOCATE stage as a last-resort download source.
    pub fn derive_source_url(&self, id: &str) -> String {
        self.url(&format!("/api/vods/{id}/video"))
    }

    /// GETs a health path; success if a 2xx arrives within the configured timeout.
    pub async fn test_reachability(&self) -> VodClientResult<bool> {
        let builder = self
            .http
            .get(self.url("/health"))
            .timeout(self.config.reachability_timeout);
        let response = self.authed(builder).send().await;
        match response {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) if e.is_timeout() || e.is_connect() => {
                Err(VodClientError::unreachable(e.to_string()))
            }
            Err(e) => Err(VodClientError::Network(e)),
        }
    }
}
