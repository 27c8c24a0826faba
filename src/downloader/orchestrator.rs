// Download orchestration: request, stream, estimate progress, save

use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

use super::client::BackendClient;
use super::errors::DownloadError;
use super::models::SavedFile;
use super::progress::{estimate_percent, DownloadState, ProgressTracker};
use super::traits::SaveFile;
use super::utils::{estimated_size, filename_from_headers};

pub struct Downloader {
    client: BackendClient,
    saver: Arc<dyn SaveFile>,
    tracker: ProgressTracker,
}

impl Downloader {
    pub fn new(client: BackendClient, saver: Arc<dyn SaveFile>) -> Self {
        Self::with_tracker(client, saver, ProgressTracker::new())
    }

    pub fn with_tracker(
        client: BackendClient,
        saver: Arc<dyn SaveFile>,
        tracker: ProgressTracker,
    ) -> Self {
        Self {
            client,
            saver,
            tracker,
        }
    }

    pub fn state(&self) -> DownloadState {
        self.tracker.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<DownloadState> {
        self.tracker.subscribe()
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Download `format_id` of `video_url` and hand the result to the save target.
    ///
    /// Progress returns to 0 on every exit path; on failure the error message
    /// is kept in the state until the next attempt.
    pub async fn download(
        &self,
        video_url: &str,
        format_id: &str,
    ) -> Result<SavedFile, DownloadError> {
        if format_id.trim().is_empty() {
            let err = DownloadError::MissingFormat;
            self.tracker.record_error(err.to_string());
            return Err(err);
        }

        let _idle_on_exit = self.tracker.begin();
        info!("[Downloader] Starting {} (format {})", video_url, format_id);

        match self.transfer(video_url, format_id).await {
            Ok(saved) => {
                info!(
                    "[Downloader] ✓ Saved {} ({} bytes)",
                    saved.filename, saved.size_bytes
                );
                Ok(saved)
            }
            Err(e) => {
                error!("[Downloader] ✗ {} failed: {}", video_url, e);
                self.tracker.record_error(e.to_string());
                Err(e)
            }
        }
    }

    async fn transfer(&self, video_url: &str, format_id: &str) -> Result<SavedFile, DownloadError> {
        let response = self.client.open_download(video_url, format_id).await?;

        let estimate = estimated_size(response.headers());
        let filename = filename_from_headers(response.headers());
        debug!(
            "[Downloader] Receiving '{}', estimated {} bytes",
            filename, estimate
        );

        let payload = collect_chunks(response.bytes_stream(), estimate, &self.tracker).await?;
        self.tracker.complete();

        self.saver.save(payload, &filename).await
    }
}

/// Drain `chunks` into one buffer, publishing estimated progress after each chunk.
///
/// Progress stays at or below 99 here; the caller reports 100 once this returns.
/// A failed chunk discards everything received so far.
pub async fn collect_chunks<S, B, E>(
    chunks: S,
    estimate: u64,
    tracker: &ProgressTracker,
) -> Result<Vec<u8>, DownloadError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    futures::pin_mut!(chunks);
    let mut payload = Vec::new();
    let mut received: u64 = 0;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|e| DownloadError::Stream(e.to_string()))?;
        let bytes = chunk.as_ref();
        received += bytes.len() as u64;
        payload.extend_from_slice(bytes);
        tracker.advance(estimate_percent(received, estimate));
    }

    debug!("[Downloader] Stream drained after {} bytes", received);
    Ok(payload)
}
