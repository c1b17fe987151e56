//! Progress reporting and cooperative cancellation.
//!
//! The pipeline never touches the display. It pushes [`ProgressUpdate`]s
//! into a channel and polls a [`CancellationToken`] at fixed points
//! (before each page request, before each item). Whoever owns the other
//! ends decides how to draw progress and when to cancel.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;

/// Fractional completion of the current stage plus a status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub percent: u8,
    pub status: String,
}

/// Sending half of the progress channel. Cheap to clone; a dropped
/// receiver is not an error.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<ProgressUpdate>>,
}

impl ProgressReporter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A reporter that discards every update.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn report(&self, percent: u32, status: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ProgressUpdate {
                percent: percent.min(100) as u8,
                status: status.into(),
            });
        }
    }
}

/// `done * 100 / total`, with an empty total counting as complete.
pub fn percent(done: u64, total: u64) -> u32 {
    if total == 0 {
        return 100;
    }
    (done.saturating_mul(100) / total).min(100) as u32
}

/// Bail out with [`PipelineError::Cancelled`] if cancellation was requested.
pub fn checkpoint(token: &CancellationToken) -> Result<(), PipelineError> {
    if token.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}
