use tokio_util::sync::CancellationToken;
use tracing::info;

use super::paginate::{fetch_all_pages, Paginator};
use crate::error::{context, PipelineError};
use crate::flickr::{Collection, PhotoService};
use crate::progress::ProgressReporter;
use crate::retry::RetryConfig;

/// List every album of the account in the order the service returns them.
///
/// Each album starts disabled; `discovery_order` records its position so
/// callers can restore the original order after sorting for display.
pub async fn discover_collections(
    service: &dyn PhotoService,
    user_id: &str,
    page_size: u32,
    retry: &RetryConfig,
    token: &CancellationToken,
    progress: &ProgressReporter,
) -> Result<Vec<Collection>, PipelineError> {
    progress.report(0, "Finding albums");

    let paginator = Paginator::new(page_size, retry, context::ALBUM_SEARCH, token);
    let mut collections = fetch_all_pages(paginator, |page, per_page| {
        service.list_collections(user_id, page, per_page)
    })
    .await?;

    for (index, collection) in collections.iter_mut().enumerate() {
        collection.discovery_order = index;
    }

    info!(count = collections.len(), "Found albums");
    progress.report(100, "Finding albums");
    Ok(collections)
}
