// Helper functions shared by the backend client and the orchestrator

use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};
use std::time::Duration;
use tracing::{debug, warn};

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{NetworkConfig, DEFAULT_FILENAME, DEFAULT_SIZE_ESTIMATE};

/// Size hint sent by the file-serving backend
pub const ESTIMATED_SIZE_HEADER: &str = "X-Estimated-FileSize";

const USER_AGENT: &str = concat!("video-downloader/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client (with optional proxy) used for both endpoints
pub fn build_http_client(config: &NetworkConfig) -> Result<reqwest::Client, DownloadError> {
    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);

    if let Some(secs) = config.timeout {
        builder = builder.connect_timeout(Duration::from_secs(secs as u64));
    }

    if let Some(proxy_url) = config.proxy.as_deref() {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| DownloadError::InvalidUrl(format!("proxy {}: {}", proxy_url, e)))?;
        debug!("[Backend] Using proxy {}", proxy_url);
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| DownloadError::Request(format!("Failed to build HTTP client: {}", e)))
}

/// Byte count from `X-Estimated-FileSize`, or the fixed fallback.
///
/// The backend sends an empty value when it has no estimate.
pub fn estimated_size(headers: &HeaderMap) -> u64 {
    let hint = headers
        .get(ESTIMATED_SIZE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|size| *size > 0);

    match hint {
        Some(size) => size,
        None => {
            debug!(
                "[Downloader] No usable size hint, assuming {} bytes",
                DEFAULT_SIZE_ESTIMATE
            );
            DEFAULT_SIZE_ESTIMATE
        }
    }
}

/// Decode the `filename*=UTF-8''<percent-encoded>` token of a `Content-Disposition` value
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    lazy_static::lazy_static! {
        static ref FILENAME_STAR_RE: Regex =
            Regex::new(r#"(?i)filename\*\s*=\s*UTF-8''([^;\s"]+)"#).unwrap();
    }

    let encoded = FILENAME_STAR_RE.captures(value)?.get(1)?.as_str();
    match percent_decode_str(encoded).decode_utf8() {
        Ok(name) if !name.trim().is_empty() => Some(name.into_owned()),
        Ok(_) => None,
        Err(e) => {
            warn!("[Downloader] Undecodable filename in Content-Disposition: {}", e);
            None
        }
    }
}

/// File name for the response, falling back to [`DEFAULT_FILENAME`]
pub fn filename_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_content_disposition)
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

/// Human-readable byte size (e.g., "150.0 MB")
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1000.0 && unit < UNITS.len() - 1 {
        size /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
