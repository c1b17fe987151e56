use super::error::RemoteError;
use super::types::{Collection, CollectionRef, DateRange, FetchPage, RemoteItem};

/// The four remote operations the download pipeline needs.
///
/// [`super::FlickrClient`] is the production implementation; the pipeline
/// only sees this trait so tests can script page sequences and failures.
#[async_trait::async_trait]
pub trait PhotoService: Send + Sync {
    /// List the account's albums, one page at a time.
    async fn list_collections(
        &self,
        user_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<FetchPage<Collection>, RemoteError>;

    /// Search every photo of the account, sorted by capture date ascending,
    /// optionally constrained to a capture-date range.
    async fn search_items(
        &self,
        user_id: &str,
        taken: Option<&DateRange>,
        page: u32,
        per_page: u32,
    ) -> Result<FetchPage<RemoteItem>, RemoteError>;

    /// List the photos of one album.
    async fn collection_items(
        &self,
        user_id: &str,
        collection: &CollectionRef,
        page: u32,
        per_page: u32,
    ) -> Result<FetchPage<RemoteItem>, RemoteError>;

    /// Raw (as entered) tags of one photo.
    async fn item_tags(&self, item_id: &str) -> Result<Vec<String>, RemoteError>;
}
