//! Top-level operations: list, enrich and download everything the user
//! selected, and fold the result into one terminal [`RunOutcome`].

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::bail;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::download::exiftool::MetadataEmbedder;
use crate::download::{download_items, format_duration, paths, DownloadConfig};
use crate::error::PipelineError;
use crate::fetch::{discover_collections, enumerate_all, enumerate_collections, FetchConfig};
use crate::flickr::{Collection, DateRange, PhotoService};
use crate::progress::ProgressReporter;

/// Which photos to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every photo of the account, one search, into the base folder.
    AllItems,
    /// The named albums, each into its own subfolder.
    Albums(Vec<String>),
    /// Every album of the account, each into its own subfolder.
    EveryAlbum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    AllItems,
    Albums,
}

impl Selection {
    pub fn scope(&self) -> SearchScope {
        match self {
            Selection::AllItems => SearchScope::AllItems,
            Selection::Albums(_) | Selection::EveryAlbum => SearchScope::Albums,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub user_id: String,
    pub selection: Selection,
    pub date_range: Option<DateRange>,
    pub fetch: FetchConfig,
    pub download: DownloadConfig,
}

/// How a run ended. Exactly one of these is produced per run.
#[derive(Debug)]
pub enum RunOutcome {
    Completed { count: usize, elapsed: Duration },
    Cancelled,
    TooManyItems { total: u64, scope: SearchScope },
    Failed(String),
}

impl RunOutcome {
    /// The end-of-run notification, or `None` for a cancelled run.
    pub fn user_message(&self) -> Option<String> {
        match self {
            RunOutcome::Completed { count, elapsed } => Some(format!(
                "Downloaded {count} photos in {}.",
                format_duration(*elapsed)
            )),
            RunOutcome::Cancelled => None,
            RunOutcome::TooManyItems {
                total,
                scope: SearchScope::AllItems,
            } => Some(format!(
                "Too many photos found.\n\n\
                 Flickr limits the number of photos returned from a search to about 4000. \
                 This search found {total} photos and the resulting photo list is not accurate.\n\n\
                 Reduce the size of the search by either searching by album or limiting the search by date."
            )),
            RunOutcome::TooManyItems {
                total,
                scope: SearchScope::Albums,
            } => Some(format!(
                "Too many photos found.\n\n\
                 Flickr limits the number of photos returned from a search to about 4000. \
                 One of the album searches found {total} photos and the resulting photo list is not accurate.\n\n\
                 Reduce the size of the search by reducing the number of photos in the albums."
            )),
            RunOutcome::Failed(message) => Some(message.clone()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. } | RunOutcome::Cancelled)
    }
}

/// Run the whole pipeline for `request`. Never fails: every error becomes
/// a [`RunOutcome`].
pub async fn run(
    service: &dyn PhotoService,
    http: &Client,
    embedder: &dyn MetadataEmbedder,
    request: &RunRequest,
    token: &CancellationToken,
    progress: &ProgressReporter,
) -> RunOutcome {
    let started = Instant::now();
    let scope = request.selection.scope();

    match execute(service, http, embedder, request, token, progress).await {
        Ok(count) => {
            let elapsed = started.elapsed();
            tracing::info!(count, elapsed = %format_duration(elapsed), "Run complete");
            RunOutcome::Completed { count, elapsed }
        }
        Err(e) => match e.downcast_ref::<PipelineError>() {
            Some(err) if err.is_cancelled() => {
                tracing::info!("Run cancelled");
                RunOutcome::Cancelled
            }
            Some(PipelineError::TooManyItems { total }) => {
                tracing::error!(total, ?scope, "Too many photos");
                RunOutcome::TooManyItems {
                    total: *total,
                    scope,
                }
            }
            _ => {
                tracing::error!("{e}");
                RunOutcome::Failed(e.to_string())
            }
        },
    }
}

async fn execute(
    service: &dyn PhotoService,
    http: &Client,
    embedder: &dyn MetadataEmbedder,
    request: &RunRequest,
    token: &CancellationToken,
    progress: &ProgressReporter,
) -> anyhow::Result<usize> {
    let base = &request.download.directory;

    let items = match &request.selection {
        Selection::AllItems => {
            ensure_folder_empty(base).await?;
            enumerate_all(
                service,
                &request.user_id,
                request.date_range.as_ref(),
                &request.fetch,
                token,
                progress,
            )
            .await?
        }
        selection => {
            let found = discover_collections(
                service,
                &request.user_id,
                request.fetch.page_size,
                &request.fetch.retry,
                token,
                progress,
            )
            .await?;
            let collections = select_collections(found, selection)?;
            for c in collections.iter().filter(|c| c.enabled) {
                ensure_folder_empty(&paths::destination_folder(base, Some(&c.reference())))
                    .await?;
            }
            enumerate_collections(
                service,
                &request.user_id,
                &collections,
                &request.fetch,
                token,
                progress,
            )
            .await?
        }
    };

    tracing::info!(count = items.len(), "Starting downloads");
    Ok(download_items(http, embedder, &items, &request.download, token, progress).await?)
}

/// Mark the albums to search. Keeps discovery order.
pub fn select_collections(
    mut collections: Vec<Collection>,
    selection: &Selection,
) -> anyhow::Result<Vec<Collection>> {
    match selection {
        Selection::AllItems => {}
        Selection::EveryAlbum => collections.iter_mut().for_each(|c| c.enabled = true),
        Selection::Albums(titles) => {
            let unknown: Vec<&str> = titles
                .iter()
                .filter(|t| !collections.iter().any(|c| &c.title == *t))
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                let available: Vec<&str> = collections.iter().map(|c| c.title.as_str()).collect();
                bail!(
                    "Unknown album(s): {}. Available albums: {}",
                    unknown.join(", "),
                    available.join(", ")
                );
            }
            for c in &mut collections {
                c.enabled = titles.contains(&c.title);
            }
        }
    }

    if !collections.iter().any(|c| c.enabled) {
        bail!("No albums enabled to search");
    }
    Ok(collections)
}

/// Refuse to download into a folder that already has something in it.
/// A missing folder is fine.
pub async fn ensure_folder_empty(folder: &Path) -> anyhow::Result<()> {
    let mut entries = match tokio::fs::read_dir(folder).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => bail!("Cannot read {}: {e}", folder.display()),
    };
    if entries.next_entry().await?.is_some() {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| folder.display().to_string());
        bail!("The folder \"{name}\" exists and is not empty.");
    }
    Ok(())
}
