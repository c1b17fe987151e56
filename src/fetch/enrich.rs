use tracing::debug;

use crate::error::{context, PipelineError};
use crate::flickr::{PhotoService, RemoteItem};
use crate::retry::{always_retry, retry_with_backoff, RetryConfig};

/// Replace the item's normalized tags with the raw tags as entered by the
/// owner (original case, spaces and punctuation kept).
///
/// One `getInfo` round trip per item; exhausting the retries ends the run.
pub async fn enrich_item(
    service: &dyn PhotoService,
    item: &mut RemoteItem,
    retry: &RetryConfig,
) -> Result<(), PipelineError> {
    let id = item.id.as_str();
    let tags = retry_with_backoff(retry, always_retry, || service.item_tags(id))
        .await
        .map_err(|e| PipelineError::remote(context::TAGS, e))?;
    debug!(id, count = tags.len(), "Fetched raw tags");
    item.tags = tags;
    Ok(())
}
