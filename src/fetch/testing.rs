//! Scripted [`PhotoService`] used by the fetch and run tests.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDateTime;

use crate::flickr::{
    Collection, CollectionRef, DateRange, FetchPage, PhotoService, RemoteError, RemoteItem,
};

pub(crate) fn item(id: &str, title: &str, taken: Option<&str>) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        title: title.to_string(),
        description: format!("about {title}"),
        date_taken: taken.map(|t| {
            NaiveDateTime::parse_from_str(t, "%Y-%m-%d %H:%M:%S").unwrap()
        }),
        owner_name: "owner".to_string(),
        original_url: format!("https://live.staticflickr.com/65535/{id}_o.jpg"),
        tags: vec!["normalized".to_string()],
        collection: None,
        discovery_order: 0,
    }
}

pub(crate) fn collection(id: &str, title: &str, enabled: bool) -> Collection {
    Collection {
        id: id.to_string(),
        title: title.to_string(),
        enabled,
        item_count: 0,
        discovery_order: 0,
    }
}

fn page_of<T: Clone>(pages: &[Vec<T>], page: u32, per_page: u32, total: u64) -> FetchPage<T> {
    FetchPage {
        page,
        per_page,
        total,
        pages: pages.len() as u32,
        items: pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default(),
    }
}

#[derive(Default)]
pub(crate) struct ScriptedService {
    collection_pages: Vec<Vec<Collection>>,
    search_pages: Vec<Vec<RemoteItem>>,
    search_total: Option<u64>,
    album_pages: HashMap<String, Vec<Vec<RemoteItem>>>,
    failing_album: Option<String>,
    fail_collections: bool,
    failing_tags: Option<String>,
    /// Every remote call in order, e.g. `search:1`, `album:a:2`, `tags:7`.
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) search_ranges: Mutex<Vec<Option<DateRange>>>,
}

impl ScriptedService {
    pub(crate) fn with_collection_pages(mut self, pages: Vec<Vec<(&str, &str)>>) -> Self {
        self.collection_pages = pages
            .into_iter()
            .map(|p| p.into_iter().map(|(id, t)| collection(id, t, false)).collect())
            .collect();
        self
    }

    pub(crate) fn with_search_pages(mut self, pages: Vec<Vec<RemoteItem>>) -> Self {
        self.search_pages = pages;
        self
    }

    pub(crate) fn with_search_total(mut self, total: u64) -> Self {
        self.search_total = Some(total);
        self
    }

    pub(crate) fn with_album(mut self, id: &str, pages: Vec<Vec<RemoteItem>>) -> Self {
        self.album_pages.insert(id.to_string(), pages);
        self
    }

    pub(crate) fn failing_album(mut self, id: &str) -> Self {
        self.failing_album = Some(id.to_string());
        self
    }

    pub(crate) fn failing_collections(mut self) -> Self {
        self.fail_collections = true;
        self
    }

    pub(crate) fn failing_tags(mut self, item_id: &str) -> Self {
        self.failing_tags = Some(item_id.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl PhotoService for ScriptedService {
    async fn list_collections(
        &self,
        _user_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<FetchPage<Collection>, RemoteError> {
        self.log(format!("collections:{page}"));
        if self.fail_collections {
            return Err(RemoteError::service(1, "User not found"));
        }
        let total = self.collection_pages.iter().map(Vec::len).sum::<usize>() as u64;
        Ok(page_of(&self.collection_pages, page, per_page, total))
    }

    async fn search_items(
        &self,
        _user_id: &str,
        taken: Option<&DateRange>,
        page: u32,
        per_page: u32,
    ) -> Result<FetchPage<RemoteItem>, RemoteError> {
        self.log(format!("search:{page}"));
        self.search_ranges.lock().unwrap().push(taken.copied());
        let total = self
            .search_total
            .unwrap_or_else(|| self.search_pages.iter().map(Vec::len).sum::<usize>() as u64);
        Ok(page_of(&self.search_pages, page, per_page, total))
    }

    async fn collection_items(
        &self,
        _user_id: &str,
        collection: &CollectionRef,
        page: u32,
        per_page: u32,
    ) -> Result<FetchPage<RemoteItem>, RemoteError> {
        self.log(format!("album:{}:{page}", collection.id));
        if self.failing_album.as_deref() == Some(collection.id.as_str()) {
            return Err(RemoteError::unexpected("connection reset"));
        }
        let pages = self
            .album_pages
            .get(&collection.id)
            .cloned()
            .unwrap_or_default();
        let total = pages.iter().map(Vec::len).sum::<usize>() as u64;
        Ok(page_of(&pages, page, per_page, total))
    }

    async fn item_tags(&self, item_id: &str) -> Result<Vec<String>, RemoteError> {
        self.log(format!("tags:{item_id}"));
        if self.failing_tags.as_deref() == Some(item_id) {
            return Err(RemoteError::service(1, "Photo not found"));
        }
        Ok(vec![format!("Raw Tag {item_id}"), "B&W".to_string()])
    }
}
