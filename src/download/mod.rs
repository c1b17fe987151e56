//! Download engine. Walks the enumerated photos one at a time in discovery
//! order: resolve a free destination, stream the original, write a JSON
//! sidecar, let the metadata tool embed it, then delete the sidecar. The
//! first failure of any step ends the run.

pub mod error;
pub mod exiftool;
pub mod file;
pub mod paths;
pub mod sidecar;

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::flickr::RemoteItem;
use crate::progress::{checkpoint, percent, ProgressReporter};
use crate::retry::RetryConfig;
use exiftool::MetadataEmbedder;

/// Subset of application config consumed by the download engine.
/// Decoupled from CLI parsing so the engine can be tested independently.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub(crate) directory: PathBuf,
    pub(crate) retry: RetryConfig,
}

/// Where one photo and its sidecar were written.
#[derive(Debug)]
struct DownloadTask {
    destination: PathBuf,
    sidecar: PathBuf,
}

/// Create the destination folder and claim a free file name in it.
async fn resolve_destination(
    item: &RemoteItem,
    config: &DownloadConfig,
) -> Result<PathBuf, PipelineError> {
    let folder = paths::destination_folder(&config.directory, item.collection.as_ref());
    tokio::fs::create_dir_all(&folder).await?;
    paths::unique_path(&folder.join(paths::base_filename(item))).await
}

/// Download every item, in `discovery_order`, and embed its metadata.
///
/// Cancellation is checked before each item; the item in flight always
/// runs to completion. Returns the number of photos written.
pub async fn download_items(
    client: &Client,
    embedder: &dyn MetadataEmbedder,
    items: &[RemoteItem],
    config: &DownloadConfig,
    token: &CancellationToken,
    progress: &ProgressReporter,
) -> Result<usize, PipelineError> {
    let mut ordered: Vec<&RemoteItem> = items.iter().collect();
    ordered.sort_by_key(|item| item.discovery_order);
    let total = ordered.len() as u64;

    let mut downloaded = 0;
    for (index, item) in ordered.into_iter().enumerate() {
        checkpoint(token)?;
        progress.report(
            percent(index as u64, total),
            format!("Downloading {}", item.title),
        );

        let task = download_single_item(client, embedder, item, config).await?;
        tracing::info!(
            id = %item.id,
            path = %task.destination.display(),
            "Downloaded"
        );
        downloaded += 1;
    }

    progress.report(100, "Download complete");
    Ok(downloaded)
}

async fn download_single_item(
    client: &Client,
    embedder: &dyn MetadataEmbedder,
    item: &RemoteItem,
    config: &DownloadConfig,
) -> Result<DownloadTask, PipelineError> {
    let destination = resolve_destination(item, config).await?;
    tracing::debug!(
        id = %item.id,
        owner = %item.owner_name,
        url = %item.original_url,
        path = %destination.display(),
        "downloading",
    );

    if let Err(e) =
        file::download_file(client, &item.original_url, &destination, &config.retry).await
    {
        tracing::error!(id = %item.id, path = %destination.display(), "Download failed: {e}");
        return Err(PipelineError::Transfer(e));
    }

    // Claimed after the transfer so a `.json` original is never taken for
    // its own sidecar.
    let task = DownloadTask {
        sidecar: paths::unique_path(&paths::sidecar_path(&destination)).await?,
        destination,
    };
    sidecar::write(item, &task.destination, &task.sidecar).await?;

    let report = match embedder.embed(&task.destination, &task.sidecar).await {
        Ok(report) => report,
        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => e.to_string(),
        Err(e) => return Err(PipelineError::Io(e)),
    };
    let report = report.trim();
    if !report.is_empty() {
        tracing::error!(
            path = %task.destination.display(),
            sidecar = %task.sidecar.display(),
            "exiftool reported a problem, keeping the sidecar"
        );
        return Err(PipelineError::Tool {
            report: report.to_string(),
        });
    }

    tokio::fs::remove_file(&task.sidecar).await?;
    Ok(task)
}

pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
