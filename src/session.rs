// Page-level state: URL input, debounced metadata, format selection, download trigger

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::downloader::{
    BackendClient, Debouncer, DirectorySaver, DownloadError, DownloadOptions, DownloadState,
    Downloader, FormatChoice, FormatSelector, MetadataBackend, NetworkConfig, SavedFile,
    VideoInfo, VideoReference,
};

/// What the page shows about the current URL
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataState {
    pub url: String,
    pub info: Option<VideoInfo>,
    pub selected_format: Option<String>,
    pub error_message: Option<String>,
    /// A metadata request is scheduled or running
    pub loading: bool,
}

pub struct VideoDownloaderSession {
    metadata: Arc<dyn MetadataBackend>,
    downloader: Arc<Downloader>,
    state: Arc<RwLock<MetadataState>>,
    debouncer: Debouncer,
    busy: AtomicBool,
}

impl VideoDownloaderSession {
    /// Session talking to the HTTP backend and saving into `options.output_path`
    pub fn new(config: &NetworkConfig, options: &DownloadOptions) -> Result<Self, DownloadError> {
        let client = BackendClient::new(config)?;
        let saver = Arc::new(DirectorySaver::from_options(options));
        let downloader = Arc::new(Downloader::new(client.clone(), saver));
        Ok(Self::with_parts(
            Arc::new(client),
            downloader,
            options.debounce,
        ))
    }

    pub fn with_parts(
        metadata: Arc<dyn MetadataBackend>,
        downloader: Arc<Downloader>,
        quiet: Duration,
    ) -> Self {
        Self {
            metadata,
            downloader,
            state: Arc::new(RwLock::new(MetadataState::default())),
            debouncer: Debouncer::new(quiet),
            busy: AtomicBool::new(false),
        }
    }

    /// Update the URL input. Metadata is fetched once the input has been
    /// stable for the quiet period; blank input clears everything.
    pub async fn set_url(&mut self, input: &str) {
        let video = VideoReference::parse(input);
        let url = video.as_ref().map(|v| v.url.clone()).unwrap_or_default();

        {
            let mut state = self.state.write().await;
            if state.url == url && (state.loading || state.info.is_some()) {
                return;
            }
            *state = MetadataState {
                url: url.clone(),
                loading: video.is_some(),
                ..MetadataState::default()
            };
        }

        if video.is_none() {
            self.debouncer.cancel();
            return;
        }

        let backend = self.metadata.clone();
        let state = self.state.clone();
        self.debouncer.call(async move {
            debug!("[Session] Fetching metadata via {} for {}", backend.name(), url);
            let result = backend.get_video_info(&url).await;

            let mut state = state.write().await;
            if state.url != url {
                return;
            }
            state.loading = false;
            match result {
                Ok(info) => {
                    info!("[Session] Loaded '{}'", info.title);
                    state.info = Some(info);
                    state.selected_format = None;
                    state.error_message = None;
                }
                Err(e) => {
                    warn!("[Session] Metadata fetch failed: {}", e);
                    state.info = None;
                    state.error_message = Some(e.to_string());
                }
            }
        });
    }

    pub async fn select_format(&self, format_id: &str) -> Result<(), DownloadError> {
        let mut state = self.state.write().await;
        let known = state
            .info
            .as_ref()
            .is_some_and(|info| info.find_format(format_id).is_some());
        if !known {
            return Err(DownloadError::UnknownFormat(format_id.to_string()));
        }
        state.selected_format = Some(format_id.to_string());
        Ok(())
    }

    pub async fn format_choices(&self) -> Vec<FormatChoice> {
        let state = self.state.read().await;
        state
            .info
            .as_ref()
            .map(|info| FormatSelector::build_options(&info.formats))
            .unwrap_or_default()
    }

    pub async fn metadata(&self) -> MetadataState {
        self.state.read().await.clone()
    }

    pub fn progress(&self) -> DownloadState {
        self.downloader.state()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<DownloadState> {
        self.downloader.subscribe()
    }

    /// Download the selected format of the current URL. Refused while a
    /// download is already running.
    pub async fn start_download(&self) -> Result<SavedFile, DownloadError> {
        let (url, format_id) = {
            let state = self.state.read().await;
            (
                state.url.clone(),
                state.selected_format.clone().unwrap_or_default(),
            )
        };

        if self.downloader.state().is_active() || self.busy.swap(true, Ordering::AcqRel) {
            return Err(DownloadError::Busy);
        }
        let _release = BusyFlag(&self.busy);

        self.downloader.download(&url, &format_id).await
    }
}

struct BusyFlag<'a>(&'a AtomicBool);

impl Drop for BusyFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::{FormatOption, SaveFile};
    use async_trait::async_trait;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBackend {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl FakeBackend {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MetadataBackend for FakeBackend {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn get_video_info(&self, url: &str) -> Result<VideoInfo, DownloadError> {
            self.calls.lock().unwrap().push(url.to_string());
            if self.fail {
                return Err(DownloadError::Backend {
                    status: 400,
                    detail: "Unsupported URL".to_string(),
                });
            }
            Ok(sample_info())
        }
    }

    fn sample_info() -> VideoInfo {
        VideoInfo {
            title: "Sample".to_string(),
            thumbnail_url: String::new(),
            duration: 90,
            formats: vec![
                FormatOption {
                    format_id: "22".to_string(),
                    resolution: "1280x720".to_string(),
                    ext: "mp4".to_string(),
                    filesize: Some(2_000_000),
                },
                FormatOption {
                    format_id: "18".to_string(),
                    resolution: "640x360".to_string(),
                    ext: "mp4".to_string(),
                    filesize: None,
                },
            ],
        }
    }

    fn offline_downloader(dir: &std::path::Path) -> Arc<Downloader> {
        let client =
            BackendClient::new(&NetworkConfig::default().with_backend_url("http://127.0.0.1:9"))
                .unwrap();
        let saver: Arc<dyn SaveFile> = Arc::new(DirectorySaver::new(dir));
        Arc::new(Downloader::new(client, saver))
    }

    fn fake_session(backend: Arc<FakeBackend>, dir: &std::path::Path) -> VideoDownloaderSession {
        VideoDownloaderSession::with_parts(
            backend,
            offline_downloader(dir),
            Duration::from_millis(500),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_fetch_once() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FakeBackend::default());
        let mut session = fake_session(backend.clone(), dir.path());

        for input in [
            "https://you",
            "https://youtu.be",
            "https://youtu.be/ab",
            "https://youtu.be/abc",
        ] {
            session.set_url(input).await;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(backend.calls().is_empty());
        assert!(session.metadata().await.loading);

        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(backend.calls(), vec!["https://youtu.be/abc".to_string()]);
        let metadata = session.metadata().await;
        assert!(!metadata.loading);
        assert_eq!(metadata.info, Some(sample_info()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_input_cancels_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FakeBackend::default());
        let mut session = fake_session(backend.clone(), dir.path());

        session.set_url("https://youtu.be/abc").await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        session.set_url("   ").await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(backend.calls().is_empty());
        assert_eq!(session.metadata().await, MetadataState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_input_does_not_refetch() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FakeBackend::default());
        let mut session = fake_session(backend.clone(), dir.path());

        session.set_url("https://youtu.be/abc").await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        session.set_url(" https://youtu.be/abc ").await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_error_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FakeBackend {
            fail: true,
            ..FakeBackend::default()
        });
        let mut session = fake_session(backend, dir.path());

        session.set_url("https://example.com/video").await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let metadata = session.metadata().await;
        assert!(metadata.info.is_none());
        assert!(metadata
            .error_message
            .unwrap()
            .contains("Unsupported URL"));
        assert!(session.format_choices().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_format() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FakeBackend::default());
        let mut session = fake_session(backend, dir.path());

        assert_eq!(
            session.select_format("22").await,
            Err(DownloadError::UnknownFormat("22".to_string()))
        );

        session.set_url("https://youtu.be/abc").await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let choices = session.format_choices().await;
        assert_eq!(choices.len(), 2);
        assert_eq!(choices[0].label, "1280x720 (mp4) - 2.0 MB");

        assert!(session.select_format("999").await.is_err());
        session.select_format("18").await.unwrap();
        assert_eq!(
            session.metadata().await.selected_format.as_deref(),
            Some("18")
        );

        // A new URL replaces the info and drops the selection
        session.set_url("https://youtu.be/xyz").await;
        assert_eq!(session.metadata().await.selected_format, None);
    }

    #[tokio::test]
    async fn test_download_without_format() {
        let mut server = Server::new_async().await;
        let download = server
            .mock("GET", "/download")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let config = NetworkConfig::default().with_backend_url(server.url());
        let options = DownloadOptions {
            output_path: dir.path().to_string_lossy().to_string(),
            debounce: Duration::from_millis(10),
        };
        let session = VideoDownloaderSession::new(&config, &options).unwrap();

        let err = session.start_download().await.unwrap_err();

        assert_eq!(err, DownloadError::MissingFormat);
        download.assert_async().await;
        assert_eq!(session.progress().progress_percent, 0);
    }

    #[tokio::test]
    async fn test_busy_session_refuses_download() {
        let dir = tempfile::tempdir().unwrap();
        let session = fake_session(Arc::new(FakeBackend::default()), dir.path());
        session.busy.store(true, Ordering::SeqCst);

        assert_eq!(session.start_download().await, Err(DownloadError::Busy));
    }

    #[tokio::test]
    async fn test_active_progress_refuses_download() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = offline_downloader(dir.path());
        let session = VideoDownloaderSession::with_parts(
            Arc::new(FakeBackend::default()),
            downloader.clone(),
            Duration::from_millis(500),
        );

        let running = downloader.tracker().begin();
        assert!(session.progress().is_active());
        assert_eq!(session.start_download().await, Err(DownloadError::Busy));
        assert!(!session.busy.load(Ordering::SeqCst));

        drop(running);
        assert_eq!(session.progress().progress_percent, 0);
        // Idle again: the request now goes through validation instead
        assert_eq!(
            session.start_download().await,
            Err(DownloadError::MissingFormat)
        );
    }

    #[tokio::test]
    async fn test_end_to_end_download() {
        let mut server = Server::new_async().await;
        let _info = server
            .mock("POST", "/process-video")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "title": "Sample",
                    "thumbnail_url": "https://example.com/t.jpg",
                    "duration": 12,
                    "formats": [{"format_id": "18", "ext": "mp4", "resolution": "640x360", "filesize": "N/A"}]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let _file = server
            .mock("GET", "/download")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("url".into(), "https://youtu.be/abc".into()),
                Matcher::UrlEncoded("format_id".into(), "18".into()),
            ]))
            .with_status(200)
            .with_header("content-disposition", "attachment; filename*=UTF-8''Sample.mp4")
            .with_body("0123456789")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = NetworkConfig::default().with_backend_url(server.url());
        let options = DownloadOptions {
            output_path: dir.path().to_string_lossy().to_string(),
            debounce: Duration::from_millis(10),
        };
        let mut session = VideoDownloaderSession::new(&config, &options).unwrap();

        session.set_url("https://youtu.be/abc").await;
        for _ in 0..200 {
            if !session.metadata().await.loading {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(session.metadata().await.info.unwrap().title, "Sample");

        session.select_format("18").await.unwrap();
        let saved = session.start_download().await.unwrap();

        assert_eq!(saved.filename, "Sample.mp4");
        assert_eq!(
            std::fs::read(dir.path().join("Sample.mp4")).unwrap(),
            b"0123456789"
        );
        assert_eq!(session.progress(), DownloadState::default());
    }
}
