//! Builds the ordered list of photos to download, either from the whole
//! account or from each enabled album in turn.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::enrich::enrich_item;
use super::paginate::Paginator;
use super::FetchConfig;
use crate::error::{context, PipelineError};
use crate::flickr::{Collection, CollectionRef, DateRange, PhotoService, RemoteItem};
use crate::progress::{checkpoint, percent, ProgressReporter};

/// Search every photo of the account, oldest capture date first.
///
/// The date range is sent to the server and also applied per item. The
/// result-size guard is always on here, because the search index is the
/// listing known to go inaccurate past the ceiling.
pub async fn enumerate_all(
    service: &dyn PhotoService,
    user_id: &str,
    date_range: Option<&DateRange>,
    config: &FetchConfig,
    token: &CancellationToken,
    progress: &ProgressReporter,
) -> Result<Vec<RemoteItem>, PipelineError> {
    const STATUS: &str = "Searching all photos";
    progress.report(0, STATUS);

    let mut paginator = Paginator::new(config.page_size, &config.retry, context::SEARCH, token)
        .with_ceiling(Some(config.ceiling));
    let mut items = Vec::new();

    while let Some(page) = paginator
        .next(|p, n| service.search_items(user_id, date_range, p, n))
        .await?
    {
        admit_page(
            service, page.items, None, date_range, config, token, &mut items,
        )
        .await?;
        progress.report(percent(page.page.into(), page.pages.into()), STATUS);
    }

    info!(count = items.len(), "Search complete");
    Ok(items)
}

/// Walk the enabled albums in the order given and list each one.
///
/// Progress is `(albums done * 100 + percent of current album) / enabled
/// albums`. Album searches take no date range. The result-size guard
/// applies only when `config.guard_collections` is set.
pub async fn enumerate_collections(
    service: &dyn PhotoService,
    user_id: &str,
    collections: &[Collection],
    config: &FetchConfig,
    token: &CancellationToken,
    progress: &ProgressReporter,
) -> Result<Vec<RemoteItem>, PipelineError> {
    progress.report(0, "Connecting");

    let enabled = collections.iter().filter(|c| c.enabled).count() as u64;
    if enabled == 0 {
        warn!("No albums enabled, nothing to search");
        return Ok(Vec::new());
    }
    let ceiling = config.guard_collections.then_some(config.ceiling);

    let mut items = Vec::new();
    for (index, collection) in collections.iter().filter(|c| c.enabled).enumerate() {
        checkpoint(token)?;
        let done = index as u64 * 100;
        let status = format!("Searching Album {}", collection.title);
        progress.report((done / enabled) as u32, &status);

        let reference = collection.reference();
        let mut paginator = Paginator::new(config.page_size, &config.retry, context::SEARCH, token)
            .with_ceiling(ceiling);
        let before = items.len();

        while let Some(page) = paginator
            .next(|p, n| service.collection_items(user_id, &reference, p, n))
            .await?
        {
            admit_page(
                service,
                page.items,
                Some(&reference),
                None,
                config,
                token,
                &mut items,
            )
            .await?;
            let within = u64::from(percent(page.page.into(), page.pages.into()));
            progress.report(((done + within) / enabled) as u32, &status);
        }

        info!(
            album = %collection.title,
            count = items.len() - before,
            "Album search complete"
        );
    }

    Ok(items)
}

/// Filter, validate and enrich one page of raw items, appending the
/// survivors to `items` with consecutive discovery numbers.
async fn admit_page(
    service: &dyn PhotoService,
    page_items: Vec<RemoteItem>,
    collection: Option<&CollectionRef>,
    date_range: Option<&DateRange>,
    config: &FetchConfig,
    token: &CancellationToken,
    items: &mut Vec<RemoteItem>,
) -> Result<(), PipelineError> {
    for raw in page_items {
        checkpoint(token)?;

        if let Some(range) = date_range {
            if !range.admits(raw.date_taken) {
                debug!(id = %raw.id, taken = ?raw.date_taken, "Outside date range, skipping");
                continue;
            }
        }

        let Some(mut item) = normalize(raw) else {
            continue;
        };
        item.collection = collection.cloned();
        enrich_item(service, &mut item, &config.retry).await?;
        item.discovery_order = items.len();
        items.push(item);
    }
    Ok(())
}

/// Enforce the list invariants: a usable title and an absolute http(s)
/// origin URL. Untitled photos fall back to their id.
fn normalize(mut item: RemoteItem) -> Option<RemoteItem> {
    match url::Url::parse(&item.original_url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => {}
        _ => {
            warn!(
                id = %item.id,
                url = %item.original_url,
                "Photo has no downloadable original, skipping"
            );
            return None;
        }
    }
    if item.title.trim().is_empty() {
        item.title = item.id.clone();
    }
    Some(item)
}
