//! Wire types for the REST API's JSON responses.
//!
//! Flickr is loose about number encoding (`total` arrives as a string from
//! some methods and as a number from others), so counters go through
//! [`lenient_u64`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::error::RemoteError;
use super::types::{Collection, FetchPage, RemoteItem};

/// Unwrap the `stat` envelope and return the payload stored under `key`.
pub fn payload(mut body: Value, key: &str) -> Result<Value, RemoteError> {
    match body["stat"].as_str() {
        Some("ok") => match body.get_mut(key) {
            Some(v) => Ok(v.take()),
            None => Err(RemoteError::unexpected(format!(
                "response is missing '{key}'"
            ))),
        },
        Some("fail") => {
            let code = body["code"].as_i64().unwrap_or(0);
            let message = body["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            Err(RemoteError::service(code, message))
        }
        other => Err(RemoteError::unexpected(format!(
            "unrecognised response status {other:?}"
        ))),
    }
}

/// `{"_content": "..."}` wrapper used for titles and descriptions.
#[derive(Debug, Default, Deserialize)]
pub struct Content {
    #[serde(rename = "_content", default)]
    pub content: String,
}

/// Either a plain string or a `_content` wrapper.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TextField {
    Plain(String),
    Wrapped(Content),
}

impl Default for TextField {
    fn default() -> Self {
        TextField::Plain(String::new())
    }
}

impl TextField {
    pub fn into_string(self) -> String {
        match self {
            TextField::Plain(s) => s,
            TextField::Wrapped(c) => c.content,
        }
    }
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Num {
        Int(u64),
        Str(String),
    }
    match Num::deserialize(d)? {
        Num::Int(n) => Ok(n),
        Num::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let n = lenient_u64(d)?;
    u32::try_from(n).map_err(serde::de::Error::custom)
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Str(String),
    }
    Ok(match Flag::deserialize(d)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
        Flag::Str(s) => s.trim() != "0" && !s.trim().is_empty(),
    })
}

/// Paging counters shared by every list response.
#[derive(Debug, Deserialize)]
pub struct Paging {
    #[serde(default, deserialize_with = "lenient_u32")]
    pub page: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub pages: u32,
    #[serde(default, alias = "per_page", deserialize_with = "lenient_u32")]
    pub perpage: u32,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total: u64,
}

impl Paging {
    fn into_page<T>(self, items: Vec<T>) -> FetchPage<T> {
        FetchPage {
            page: self.page,
            per_page: self.perpage,
            total: self.total,
            pages: self.pages,
            items,
        }
    }
}

/// Payload of `flickr.photos.search` (`photos`) and
/// `flickr.photosets.getPhotos` (`photoset`).
#[derive(Debug, Deserialize)]
pub struct PhotoList {
    #[serde(flatten)]
    pub paging: Paging,
    #[serde(default)]
    pub photo: Vec<PhotoRecord>,
}

#[derive(Debug, Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    #[serde(default)]
    pub title: TextField,
    #[serde(default)]
    pub description: TextField,
    #[serde(default)]
    pub datetaken: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub datetakenunknown: bool,
    #[serde(default)]
    pub ownername: Option<String>,
    #[serde(default)]
    pub url_o: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
}

impl PhotoRecord {
    fn date_taken(&self) -> Option<NaiveDateTime> {
        if self.datetakenunknown {
            return None;
        }
        let raw = self.datetaken.as_deref()?;
        match NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
            Ok(dt) => Some(dt),
            Err(e) => {
                tracing::debug!(id = %self.id, raw, "Unparseable datetaken: {}", e);
                None
            }
        }
    }

    pub fn into_item(self) -> RemoteItem {
        let date_taken = self.date_taken();
        let tags = self
            .tags
            .as_deref()
            .map(|t| t.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        RemoteItem {
            id: self.id,
            title: self.title.into_string(),
            description: self.description.into_string(),
            date_taken,
            owner_name: self.ownername.unwrap_or_default(),
            original_url: self.url_o.unwrap_or_default(),
            tags,
            collection: None,
            discovery_order: 0,
        }
    }
}

impl PhotoList {
    pub fn into_page(self) -> FetchPage<RemoteItem> {
        let items = self.photo.into_iter().map(PhotoRecord::into_item).collect();
        self.paging.into_page(items)
    }
}

/// Payload of `flickr.photosets.getList` (`photosets`).
#[derive(Debug, Deserialize)]
pub struct PhotosetList {
    #[serde(flatten)]
    pub paging: Paging,
    #[serde(default)]
    pub photoset: Vec<PhotosetRecord>,
}

#[derive(Debug, Deserialize)]
pub struct PhotosetRecord {
    pub id: String,
    #[serde(default)]
    pub title: TextField,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub photos: u64,
}

impl PhotosetList {
    /// Discovery order is assigned by the caller, which knows the
    /// position across pages.
    pub fn into_page(self) -> FetchPage<Collection> {
        let items = self
            .photoset
            .into_iter()
            .map(|ps| Collection {
                id: ps.id,
                title: ps.title.into_string(),
                enabled: false,
                item_count: ps.photos,
                discovery_order: 0,
            })
            .collect();
        self.paging.into_page(items)
    }
}

/// Payload of `flickr.photos.getInfo` (`photo`). Only tags are read.
#[derive(Debug, Deserialize)]
pub struct PhotoInfo {
    #[serde(default)]
    pub tags: TagList,
}

#[derive(Debug, Default, Deserialize)]
pub struct TagList {
    #[serde(default)]
    pub tag: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub raw: String,
}

impl PhotoInfo {
    pub fn raw_tags(self) -> Vec<String> {
        self.tags.tag.into_iter().map(|t| t.raw).collect()
    }
}

/// Payload of `flickr.people.findByUsername` (`user`).
#[derive(Debug, Deserialize)]
pub struct FoundUser {
    pub nsid: String,
}
