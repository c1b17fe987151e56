//! Listing side of the pipeline: album discovery, paginated photo
//! enumeration, the result-size guard and per-photo tag enrichment.

pub mod albums;
pub mod enrich;
pub mod enumerate;
pub mod guard;
pub mod paginate;

#[cfg(test)]
pub(crate) mod testing;

pub use albums::discover_collections;
pub use enumerate::{enumerate_all, enumerate_collections};
pub use guard::RESULT_CEILING;

use crate::retry::RetryConfig;

/// Knobs shared by every listing call of one run.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub page_size: u32,
    pub retry: RetryConfig,
    /// Largest `total` a listing may report before it is rejected.
    pub ceiling: u64,
    /// Apply the ceiling to album listings too, not only to the search.
    pub guard_collections: bool,
}
