//! Errors that end a run.

use std::path::PathBuf;

use thiserror::Error;

use crate::download::error::DownloadError;
use crate::flickr::RemoteError;

/// Everything that can stop the fetch → enrich → download pipeline.
///
/// Remote and transfer failures arrive here only after their retry budget
/// is spent and carry the first attempt's message. `Cancelled` is a user
/// request, not a failure; callers turn it into a silent outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{context} {source}")]
    Remote {
        context: &'static str,
        source: RemoteError,
    },

    #[error("Too many photos: {total}")]
    TooManyItems { total: u64 },

    #[error("Too many files with same name: {}", base.display())]
    NameExhausted { base: PathBuf },

    #[error("Download failed. Error: {0}")]
    Transfer(#[source] DownloadError),

    #[error("Download failed. Unexpected error: {report}")]
    Tool { report: String },

    #[error("Download failed. Unexpected error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn remote(context: &'static str, source: RemoteError) -> Self {
        Self::Remote { context, source }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Message prefixes naming the stage a remote failure happened in.
pub mod context {
    pub const ALBUM_SEARCH: &str = "Album search failed.";
    pub const SEARCH: &str = "Search failed.";
    pub const TAGS: &str = "Getting tags failed.";
}
