// HTTP client for the metadata and file-serving endpoints

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::errors::DownloadError;
use super::models::{NetworkConfig, VideoInfo, VideoReference};
use super::traits::MetadataBackend;
use super::utils::build_http_client;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Client for `POST /process-video` and `GET /download`
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Option<Duration>,
}

impl BackendClient {
    pub fn new(config: &NetworkConfig) -> Result<Self, DownloadError> {
        let mut base_url = Url::parse(&config.backend_url)
            .map_err(|e| DownloadError::InvalidUrl(format!("{}: {}", config.backend_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(DownloadError::InvalidUrl(config.backend_url.clone()));
        }
        // Endpoints are joined relative to the base path
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http: build_http_client(config)?,
            base_url,
            timeout: config.timeout.map(|secs| Duration::from_secs(secs as u64)),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DownloadError> {
        self.base_url
            .join(path)
            .map_err(|e| DownloadError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Fetch title, thumbnail, duration and formats for a video
    pub async fn process_video(&self, url: &str) -> Result<VideoInfo, DownloadError> {
        let video = VideoReference::parse(url)
            .ok_or_else(|| DownloadError::InvalidUrl("video URL is empty".to_string()))?;
        let endpoint = self.endpoint("process-video")?;

        debug!("[Backend] POST {} for {}", endpoint, video.url);
        let mut request = self.http.post(endpoint).json(&video);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request rejected")
                    .to_string()
            });
            warn!("[Backend] process-video failed ({}): {}", status, detail);
            return Err(DownloadError::Backend {
                status: status.as_u16(),
                detail,
            });
        }

        let body = response.bytes().await?;
        let info: VideoInfo = serde_json::from_slice(&body)
            .map_err(|e| DownloadError::Parse(format!("Invalid video info: {}", e)))?;
        info!(
            "[Backend] '{}' ({}), {} formats",
            info.title,
            info.formatted_duration(),
            info.formats.len()
        );
        Ok(info)
    }

    /// `GET /download` URL for a video and format
    pub fn download_url(&self, video_url: &str, format_id: &str) -> Result<Url, DownloadError> {
        let mut url = self.endpoint("download")?;
        url.query_pairs_mut()
            .append_pair("url", video_url)
            .append_pair("format_id", format_id);
        Ok(url)
    }

    /// Send the download request. Fails on a non-success status without reading the body.
    pub async fn open_download(
        &self,
        video_url: &str,
        format_id: &str,
    ) -> Result<reqwest::Response, DownloadError> {
        let url = self.download_url(video_url, format_id)?;
        debug!("[Backend] GET {}", url);

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("[Backend] download rejected with {}", status);
            return Err(DownloadError::Transport {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl MetadataBackend for BackendClient {
    fn name(&self) -> &'static str {
        "http-backend"
    }

    async fn get_video_info(&self, url: &str) -> Result<VideoInfo, DownloadError> {
        self.process_video(url).await
    }
}

/// `detail` from a `{"detail": ...}` error body
fn error_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
