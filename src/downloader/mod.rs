// Downloader module - metadata lookup, streamed download, progress, save

pub mod client;
pub mod debounce;
pub mod errors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod save;
pub mod traits;
pub mod utils;

pub use client::BackendClient;
pub use debounce::{schedule, Debouncer, TimerHandle};
pub use errors::DownloadError;
pub use format_selector::{FormatChoice, FormatSelector};
pub use models::{
    DownloadOptions, FormatOption, NetworkConfig, SavedFile, VideoInfo, VideoReference,
};
pub use orchestrator::Downloader;
pub use progress::{render_progress_bar, DownloadState, ProgressTracker};
pub use save::DirectorySaver;
pub use traits::{MetadataBackend, ProgressEmitter, SaveFile};
