use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::guard::check_result_size;
use crate::error::PipelineError;
use crate::flickr::{FetchPage, RemoteError, RemoteErrorKind};
use crate::progress::checkpoint;
use crate::retry::{always_retry, retry_with_backoff, RetryConfig};

/// Walks a paginated listing one page at a time.
///
/// Termination follows the server: after page `p` of `P` the walk ends
/// when `p >= P`, regardless of how many items a page held. Each page
/// request goes through the retry loop, is preceded by a cancellation
/// check, and is followed by the result-size check when a ceiling is set.
#[derive(Debug)]
pub struct Paginator<'a> {
    page_size: u32,
    ceiling: Option<u64>,
    retry: &'a RetryConfig,
    context: &'static str,
    token: &'a CancellationToken,
    next_page: u32,
    finished: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(
        page_size: u32,
        retry: &'a RetryConfig,
        context: &'static str,
        token: &'a CancellationToken,
    ) -> Self {
        Self {
            page_size,
            ceiling: None,
            retry,
            context,
            token,
            next_page: 1,
            finished: false,
        }
    }

    /// Reject the whole listing once any page reports more than `ceiling`.
    pub fn with_ceiling(mut self, ceiling: Option<u64>) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Fetch the next page, or `None` once the server-reported last page
    /// has been consumed.
    pub async fn next<T, F, Fut>(
        &mut self,
        fetch_page: F,
    ) -> Result<Option<FetchPage<T>>, PipelineError>
    where
        F: Fn(u32, u32) -> Fut,
        Fut: Future<Output = Result<FetchPage<T>, RemoteError>>,
    {
        if self.finished {
            return Ok(None);
        }
        checkpoint(self.token)?;

        let (page_no, page_size) = (self.next_page, self.page_size);
        let page = retry_with_backoff(self.retry, always_retry, || fetch_page(page_no, page_size))
            .await
            .map_err(|e| {
                if let RemoteErrorKind::Service { code } = e.kind {
                    debug!(code, page = page_no, "Listing rejected by the API");
                }
                PipelineError::remote(self.context, e)
            })?;

        debug!(
            requested = page_no,
            page = page.page,
            pages = page.pages,
            per_page = page.per_page,
            total = page.total,
            items = page.items.len(),
            "Fetched page"
        );

        if let Some(ceiling) = self.ceiling {
            check_result_size(page.total, ceiling)?;
        }

        // A server that echoes page 0 would otherwise loop forever.
        let reported = page.page.max(page_no);
        self.finished = reported >= page.pages;
        self.next_page = reported + 1;
        Ok(Some(page))
    }
}

/// Drain a listing into one ordered `Vec`.
///
/// Any failure or cancellation discards what was accumulated so far.
pub async fn fetch_all_pages<T, F, Fut>(
    mut paginator: Paginator<'_>,
    fetch_page: F,
) -> Result<Vec<T>, PipelineError>
where
    F: Fn(u32, u32) -> Fut,
    Fut: Future<Output = Result<FetchPage<T>, RemoteError>>,
{
    let mut all = Vec::new();
    while let Some(page) = paginator.next(&fetch_page).await? {
        all.extend(page.items);
    }
    Ok(all)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    pub(crate) fn no_delay() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay_secs: 0,
            max_delay_secs: 0,
        }
    }

    fn scripted(
        pages: u32,
        total: u64,
        calls: Arc<AtomicU32>,
    ) -> impl Fn(u32, u32) -> std::future::Ready<Result<FetchPage<String>, RemoteError>> {
        move |page, per_page| {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(FetchPage {
                page,
                per_page,
                total,
                pages,
                items: vec![format!("p{page}-a"), format!("p{page}-b")],
            }))
        }
    }

    #[tokio::test]
    async fn test_stops_at_reported_page_count() {
        let calls = Arc::new(AtomicU32::new(0));
        let retry = no_delay();
        let token = CancellationToken::new();
        let items = fetch_all_pages(
            Paginator::new(2, &retry, "Search failed.", &token),
            scripted(3, 6, calls.clone()),
        )
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(items, vec!["p1-a", "p1-b", "p2-a", "p2-b", "p3-a", "p3-b"]);
    }

    #[tokio::test]
    async fn test_empty_listing_stops_after_first_page() {
        let calls = Arc::new(AtomicU32::new(0));
        let retry = no_delay();
        let token = CancellationToken::new();
        let c = calls.clone();
        let items: Vec<String> = fetch_all_pages(
            Paginator::new(500, &retry, "Search failed.", &token),
            move |page, per_page| {
                c.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Ok(FetchPage {
                    page,
                    per_page,
                    total: 0,
                    pages: 0,
                    items: Vec::new(),
                }))
            },
        )
        .await
        .unwrap();
        assert!(items.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_too_many_items_aborts_on_first_page() {
        let calls = Arc::new(AtomicU32::new(0));
        let retry = no_delay();
        let token = CancellationToken::new();
        let result = fetch_all_pages(
            Paginator::new(500, &retry, "Search failed.", &token).with_ceiling(Some(4000)),
            scripted(9, 4500, calls.clone()),
        )
        .await;
        match result {
            Err(PipelineError::TooManyItems { total }) => assert_eq!(total, 4500),
            other => panic!("expected TooManyItems, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_ceiling_means_no_guard() {
        let calls = Arc::new(AtomicU32::new(0));
        let retry = no_delay();
        let token = CancellationToken::new();
        let items = fetch_all_pages(
            Paginator::new(500, &retry, "Search failed.", &token),
            scripted(1, 10_000, calls),
        )
        .await
        .unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_request() {
        let calls = Arc::new(AtomicU32::new(0));
        let retry = no_delay();
        let token = CancellationToken::new();
        token.cancel();
        let result = fetch_all_pages(
            Paginator::new(500, &retry, "Search failed.", &token),
            scripted(3, 6, calls.clone()),
        )
        .await;
        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exhausted_page_retry_is_fatal_with_first_message() {
        let calls = Arc::new(AtomicU32::new(0));
        let retry = no_delay();
        let token = CancellationToken::new();
        let c = calls.clone();
        let result: Result<Vec<String>, _> = fetch_all_pages(
            Paginator::new(500, &retry, "Search failed.", &token),
            move |_, _| {
                let n = c.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err(RemoteError::service(98, format!("bad token {n}"))))
            },
        )
        .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Search failed. Flickr error: bad token 0"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transient_page_failure_recovers() {
        let calls = Arc::new(AtomicU32::new(0));
        let retry = no_delay();
        let token = CancellationToken::new();
        let c = calls.clone();
        let items = fetch_all_pages(
            Paginator::new(500, &retry, "Search failed.", &token),
            move |page, per_page| {
                let n = c.fetch_add(1, Ordering::SeqCst);
                std::future::ready(if n == 0 {
                    Err(RemoteError::unexpected("reset"))
                } else {
                    Ok(FetchPage {
                        page,
                        per_page,
                        total: 1,
                        pages: 1,
                        items: vec![7u32],
                    })
                })
            },
        )
        .await
        .unwrap();
        assert_eq!(items, vec![7]);
    }
}
