use chrono::{NaiveDate, NaiveDateTime};

/// Reference from an item back to the album it was discovered in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    pub id: String,
    pub title: String,
}

/// A photo as discovered by the enumerator.
///
/// `tags` starts out as the normalized tag list from the search response
/// and is replaced with the raw tags during enrichment. `discovery_order`
/// is the position at which the item was first seen, so the download
/// order is stable even if a caller re-sorts the list for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date_taken: Option<NaiveDateTime>,
    pub owner_name: String,
    pub original_url: String,
    pub tags: Vec<String>,
    pub collection: Option<CollectionRef>,
    pub discovery_order: usize,
}

/// An album (photoset) belonging to the searched account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub id: String,
    pub title: String,
    pub enabled: bool,
    pub item_count: u64,
    pub discovery_order: usize,
}

impl Collection {
    pub fn reference(&self) -> CollectionRef {
        CollectionRef {
            id: self.id.clone(),
            title: self.title.clone(),
        }
    }
}

/// One page of a paginated listing, with the server-reported totals.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPage<T> {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u32,
    pub items: Vec<T>,
}

/// Inclusive range of capture dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Whether an item with this capture date passes the filter.
    /// Items with an unknown capture date always pass.
    pub fn admits(&self, date_taken: Option<NaiveDateTime>) -> bool {
        match date_taken {
            Some(taken) => {
                let day = taken.date();
                day >= self.start && day <= self.end
            }
            None => true,
        }
    }

    /// Lower bound in the API's `YYYY-MM-DD HH:MM:SS` form.
    pub fn min_taken(&self) -> String {
        format!("{} 00:00:00", self.start.format("%Y-%m-%d"))
    }

    /// Upper bound in the API's form, covering the whole last day.
    pub fn max_taken(&self) -> String {
        format!("{} 23:59:59", self.end.format("%Y-%m-%d"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> DateRange {
        DateRange {
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_range_is_inclusive_of_whole_days() {
        let r = range();
        assert!(r.admits(Some(at(2020, 1, 1, 0))));
        assert!(r.admits(Some(at(2020, 12, 31, 23))));
        assert!(!r.admits(Some(at(2019, 12, 31, 23))));
        assert!(!r.admits(Some(at(2021, 1, 1, 0))));
    }

    #[test]
    fn test_unknown_date_always_admitted() {
        assert!(range().admits(None));
    }

    #[test]
    fn test_api_bounds() {
        let r = range();
        assert_eq!(r.min_taken(), "2020-01-01 00:00:00");
        assert_eq!(r.max_taken(), "2020-12-31 23:59:59");
    }
}
