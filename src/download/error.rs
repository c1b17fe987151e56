use thiserror::Error;

/// Typed transfer errors enabling retry classification.
///
/// `is_retryable()` separates transient failures (server errors, rate
/// limits, dropped connections) from permanent ones (missing asset, disk
/// failures) so the retry loop can stop early. Either way an exhausted
/// transfer ends the run.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error {status} downloading {url}")]
    HttpStatus { status: u16, url: String },

    #[error("{source} (downloading {url}, {bytes_written} bytes received)")]
    Http {
        source: reqwest::Error,
        url: String,
        bytes_written: u64,
    },

    #[error("Disk error: {0}")]
    Disk(#[from] std::io::Error),
}

impl DownloadError {
    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            DownloadError::Http { .. } => true,
            DownloadError::Disk(_) => false,
        }
    }
}
