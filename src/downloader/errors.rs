// Error types for the download flow

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DownloadError {
    /// No format was selected; nothing was sent to the backend
    #[error("Please select a format before downloading")]
    MissingFormat,

    /// The selected format is not part of the current video info
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    /// Empty or unusable video / backend URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A download is already running for this session
    #[error("A download is already in progress")]
    Busy,

    /// The file-serving endpoint answered with a non-success status
    #[error("Download failed. Please try again. (HTTP {status})")]
    Transport { status: u16 },

    /// The metadata endpoint rejected the request
    #[error("Failed to fetch video info: {detail} (HTTP {status})")]
    Backend { status: u16, detail: String },

    /// The request could not be sent (connection refused, proxy, timeout)
    #[error("Request failed: {0}")]
    Request(String),

    /// The body stream terminated abnormally mid-read
    #[error("Download interrupted: {0}")]
    Stream(String),

    /// Failed to parse a backend response
    #[error("Parse error: {0}")]
    Parse(String),

    /// The save capability could not persist the file
    #[error("Failed to save file: {0}")]
    Save(String),
}

impl DownloadError {
    /// Errors raised locally before any network activity
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingFormat | Self::UnknownFormat(_) | Self::InvalidUrl(_) | Self::Busy
        )
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status } | Self::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Parse(err.to_string());
        }
        if err.is_body() {
            return Self::Stream(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::Transport {
                status: status.as_u16(),
            };
        }
        Self::Request(err.to_string())
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        Self::Save(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors() {
        assert!(DownloadError::MissingFormat.is_validation());
        assert!(DownloadError::Busy.is_validation());
        assert!(!DownloadError::Transport { status: 500 }.is_validation());
        assert!(!DownloadError::Stream("reset".to_string()).is_validation());
    }

    #[test]
    fn test_status_code() {
        assert_eq!(DownloadError::Transport { status: 404 }.status(), Some(404));
        assert_eq!(
            DownloadError::Backend {
                status: 400,
                detail: "Unsupported URL".to_string()
            }
            .status(),
            Some(400)
        );
        assert_eq!(DownloadError::MissingFormat.status(), None);
    }

    #[test]
    fn test_messages_are_human_readable() {
        let msg = DownloadError::Transport { status: 502 }.to_string();
        assert!(msg.contains("Download failed"));
        assert!(msg.contains("502"));

        let msg = DownloadError::Stream("connection reset".to_string()).to_string();
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn test_io_error_maps_to_save() {
        let err: DownloadError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, DownloadError::Save(_)));
    }
}
