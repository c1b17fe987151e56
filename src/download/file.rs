use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::error::DownloadError;
use crate::retry::{self, RetryAction, RetryConfig};

/// `<destination>.part`, next to the final file so the rename stays on
/// one filesystem.
fn temp_download_path(download_path: &Path) -> PathBuf {
    let mut name = download_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    download_path.with_file_name(name)
}

/// Download a file from URL using a .part temp file.
///
/// Each attempt truncates the .part file and downloads from scratch. On
/// completion the .part file is renamed to the final destination path, so
/// a failed or interrupted transfer never leaves a file at `download_path`.
/// Retries with exponential backoff on transient failures; the error
/// returned is the first attempt's.
pub async fn download_file(
    client: &Client,
    url: &str,
    download_path: &Path,
    retry_config: &RetryConfig,
) -> Result<u64, DownloadError> {
    let part_path = temp_download_path(download_path);

    let result = retry::retry_with_backoff(
        retry_config,
        |e: &DownloadError| {
            if e.is_retryable() {
                RetryAction::Retry
            } else {
                RetryAction::Abort
            }
        },
        || attempt_download(client, url, download_path, &part_path),
    )
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&part_path).await;
    }
    result
}

/// Single download attempt.
async fn attempt_download(
    client: &Client,
    url: &str,
    download_path: &Path,
    part_path: &Path,
) -> Result<u64, DownloadError> {
    let response = client.get(url).send().await.map_err(|e| DownloadError::Http {
        source: e,
        url: url.to_string(),
        bytes_written: 0,
    })?;

    if !response.status().is_success() {
        return Err(DownloadError::HttpStatus {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }

    let status = response.status().as_u16();
    let content_length = response.content_length();

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(part_path)
        .await?;

    let mut bytes_written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            tracing::warn!(
                "Body decode error for {} (status={}, content_length={:?}, bytes_so_far={}): {}",
                url, status, content_length, bytes_written, e
            );
            DownloadError::Http {
                source: e,
                url: url.to_string(),
                bytes_written,
            }
        })?;
        file.write_all(&chunk).await?;
        bytes_written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    fs::rename(part_path, download_path).await?;
    tracing::debug!(path = %download_path.display(), bytes = bytes_written, "Transfer complete");

    Ok(bytes_written)
}
