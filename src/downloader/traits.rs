// Capabilities the download flow depends on

use async_trait::async_trait;

use super::errors::DownloadError;
use super::models::{SavedFile, VideoInfo};
use super::progress::DownloadState;

/// Source of video metadata
#[async_trait]
pub trait MetadataBackend: Send + Sync {
    /// Name of the backend (for logging)
    fn name(&self) -> &'static str;

    /// Get video information from URL
    async fn get_video_info(&self, url: &str) -> Result<VideoInfo, DownloadError>;
}

/// Persists a finished download
#[async_trait]
pub trait SaveFile: Send + Sync {
    /// Store `bytes` under a name derived from `filename`.
    ///
    /// Implementations must release any transient resource they create,
    /// whether or not the save succeeds.
    async fn save(&self, bytes: Vec<u8>, filename: &str) -> Result<SavedFile, DownloadError>;
}

/// Receives every progress transition
pub trait ProgressEmitter: Send + Sync {
    fn emit(&self, state: &DownloadState);
}
