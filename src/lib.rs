pub mod downloader;
pub mod session;

pub use downloader::{
    BackendClient, DirectorySaver, DownloadError, DownloadOptions, DownloadState, Downloader,
    FormatOption, NetworkConfig, SavedFile, VideoInfo,
};
pub use session::{MetadataState, VideoDownloaderSession};

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` overrides the default filter;
/// a second call is a no-op.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("video_downloader=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_init_logging_twice() {
        super::init_logging();
        super::init_logging();
        tracing::info!("[Test] logging initialised");
    }
}
