//! Flickr REST client. Lists albums and photos and fetches raw tags.
//!
//! Authentication is left to the caller. The client is handed a ready
//! `reqwest::Client` and an API key, and only signs requests with the key.

pub mod error;
pub mod responses;
pub mod service;
pub mod types;

pub use error::{RemoteError, RemoteErrorKind};
pub use service::PhotoService;
pub use types::{Collection, CollectionRef, DateRange, FetchPage, RemoteItem};

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use responses::{FoundUser, PhotoInfo, PhotoList, PhotosetList};

pub const DEFAULT_ENDPOINT: &str = "https://api.flickr.com/services/rest/";

/// Extra fields requested with every photo listing so a single page carries
/// everything the download needs except raw tags.
const PHOTO_EXTRAS: &str = "description,owner_name,tags,date_taken,url_o,original_format";

#[derive(Clone)]
pub struct FlickrClient {
    http: Client,
    api_key: String,
    endpoint: String,
}

impl std::fmt::Debug for FlickrClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlickrClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl FlickrClient {
    pub fn new(http: Client, api_key: String) -> Self {
        Self::with_endpoint(http, api_key, DEFAULT_ENDPOINT.to_string())
    }

    pub fn with_endpoint(http: Client, api_key: String, endpoint: String) -> Self {
        Self {
            http,
            api_key,
            endpoint,
        }
    }

    /// Issue one API call and return the payload stored under `key`.
    async fn call(
        &self,
        method: &str,
        params: &[(&str, String)],
        key: &str,
    ) -> Result<Value, RemoteError> {
        let mut query: Vec<(&str, &str)> = vec![
            ("method", method),
            ("api_key", self.api_key.as_str()),
            ("format", "json"),
            ("nojsoncallback", "1"),
        ];
        query.extend(params.iter().map(|(k, v)| (*k, v.as_str())));

        debug!(method, ?params, "API request");
        let resp = self.http.get(&self.endpoint).query(&query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::unexpected(format!(
                "HTTP {} from {}",
                status.as_u16(),
                method
            )));
        }
        let body: Value = resp.json().await?;
        responses::payload(body, key)
    }

    /// Resolve a screen name to the account id used by every other call.
    pub async fn find_user_id(&self, username: &str) -> Result<String, RemoteError> {
        let user = self
            .call(
                "flickr.people.findByUsername",
                &[("username", username.to_string())],
                "user",
            )
            .await?;
        let found: FoundUser = serde_json::from_value(user)?;
        Ok(found.nsid)
    }
}

#[async_trait::async_trait]
impl PhotoService for FlickrClient {
    async fn list_collections(
        &self,
        user_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<FetchPage<Collection>, RemoteError> {
        let payload = self
            .call(
                "flickr.photosets.getList",
                &[
                    ("user_id", user_id.to_string()),
                    ("page", page.to_string()),
                    ("per_page", per_page.to_string()),
                ],
                "photosets",
            )
            .await?;
        let list: PhotosetList = serde_json::from_value(payload)?;
        Ok(list.into_page())
    }

    async fn search_items(
        &self,
        user_id: &str,
        taken: Option<&DateRange>,
        page: u32,
        per_page: u32,
    ) -> Result<FetchPage<RemoteItem>, RemoteError> {
        let mut params = vec![
            ("user_id", user_id.to_string()),
            ("extras", PHOTO_EXTRAS.to_string()),
            ("sort", "date-taken-asc".to_string()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        if let Some(range) = taken {
            params.push(("min_taken_date", range.min_taken()));
            params.push(("max_taken_date", range.max_taken()));
        }
        let payload = self.call("flickr.photos.search", &params, "photos").await?;
        let list: PhotoList = serde_json::from_value(payload)?;
        Ok(list.into_page())
    }

    async fn collection_items(
        &self,
        user_id: &str,
        collection: &CollectionRef,
        page: u32,
        per_page: u32,
    ) -> Result<FetchPage<RemoteItem>, RemoteError> {
        let payload = self
            .call(
                "flickr.photosets.getPhotos",
                &[
                    ("photoset_id", collection.id.clone()),
                    ("user_id", user_id.to_string()),
                    ("extras", PHOTO_EXTRAS.to_string()),
                    ("page", page.to_string()),
                    ("per_page", per_page.to_string()),
                ],
                "photoset",
            )
            .await?;
        let list: PhotoList = serde_json::from_value(payload)?;
        Ok(list.into_page())
    }

    async fn item_tags(&self, item_id: &str) -> Result<Vec<String>, RemoteError> {
        let payload = self
            .call(
                "flickr.photos.getInfo",
                &[("photo_id", item_id.to_string())],
                "photo",
            )
            .await?;
        let info: PhotoInfo = serde_json::from_value(payload)?;
        Ok(info.raw_tags())
    }
}
