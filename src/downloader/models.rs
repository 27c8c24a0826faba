// Common data models for the download flow

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Size assumed for progress estimation when the backend sends no hint
pub const DEFAULT_SIZE_ESTIMATE: u64 = 10_000_000;

/// File name used when the response carries no usable `Content-Disposition`
pub const DEFAULT_FILENAME: &str = "download";

/// Quiet period before a metadata request is sent
pub const DEBOUNCE_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// A video URL as typed by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoReference {
    pub url: String,
}

impl VideoReference {
    /// Trims the input; blank input is rejected, everything else is left to the backend
    pub fn parse(input: &str) -> Option<Self> {
        let url = input.trim();
        if url.is_empty() {
            None
        } else {
            Some(Self {
                url: url.to_string(),
            })
        }
    }
}

/// Video information returned by `POST /process-video`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub thumbnail_url: String,
    /// Duration in whole seconds
    #[serde(default, deserialize_with = "lenient_u64")]
    pub duration: u64,
    #[serde(default)]
    pub formats: Vec<FormatOption>,
}

impl VideoInfo {
    /// Duration as `m:ss`
    pub fn formatted_duration(&self) -> String {
        let minutes = self.duration / 60;
        let seconds = self.duration % 60;
        format!("{}:{:02}", minutes, seconds)
    }

    pub fn find_format(&self, format_id: &str) -> Option<&FormatOption> {
        self.formats.iter().find(|f| f.format_id == format_id)
    }
}

/// One downloadable resolution/container combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOption {
    pub format_id: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub resolution: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub ext: String,
    /// Backend sends a number or "N/A"
    #[serde(default, deserialize_with = "optional_size")]
    pub filesize: Option<u64>,
}

/// Result of a successful save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFile {
    pub filename: String,
    /// Where the file ended up, when the save target is the filesystem
    pub path: Option<PathBuf>,
    pub size_bytes: u64,
}

/// Download options
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub output_path: String,
    pub debounce: Duration,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output_path: dirs::download_dir()
                .unwrap_or_else(|| std::path::PathBuf::from("."))
                .to_string_lossy()
                .to_string(),
            debounce: DEBOUNCE_QUIET_PERIOD,
        }
    }
}

/// Network configuration for the backend client
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Base URL of the backend serving `/process-video` and `/download`
    pub backend_url: String,

    /// HTTP or SOCKS5 proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Timeout in seconds
    pub timeout: Option<u32>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            proxy: None,
            timeout: Some(30),
        }
    }
}

impl NetworkConfig {
    /// Defaults overridden by `VIDEO_BACKEND_URL` and `VIDEO_BACKEND_PROXY`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("VIDEO_BACKEND_URL") {
            if !url.trim().is_empty() {
                config.backend_url = url.trim().to_string();
            }
        }
        if let Ok(proxy) = std::env::var("VIDEO_BACKEND_PROXY") {
            if !proxy.trim().is_empty() {
                config.proxy = Some(proxy.trim().to_string());
            }
        }
        config
    }

    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into();
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_timeout(mut self, seconds: Option<u32>) -> Self {
        self.timeout = seconds;
        self
    }
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_size(deserializer)?.unwrap_or(0))
}

fn optional_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| *v >= 0.0).map(|v| v.round() as u64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
