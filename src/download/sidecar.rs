//! JSON sidecar handed to exiftool's `-j=` import.

use std::path::Path;

use serde::Serialize;

use crate::flickr::RemoteItem;

/// One exiftool JSON record. Field names are exiftool tag names.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SidecarRecord<'a> {
    /// exiftool matches records to files by this path and only accepts
    /// forward slashes.
    source_file: String,
    object_name: &'a str,
    image_description: &'a str,
    keywords: &'a [String],
}

/// Render the sidecar for `item` downloaded to `target`: a one-element
/// array. Values go through the JSON encoder, so quotes and backslashes in
/// titles or tags are escaped.
pub fn render(item: &RemoteItem, target: &Path) -> Result<String, serde_json::Error> {
    let record = SidecarRecord {
        source_file: target.to_string_lossy().replace('\\', "/"),
        object_name: &item.title,
        image_description: &item.description,
        keywords: &item.tags,
    };
    serde_json::to_string_pretty(&[record])
}

/// Write the sidecar to `sidecar`.
pub async fn write(item: &RemoteItem, target: &Path, sidecar: &Path) -> std::io::Result<()> {
    let body = render(item, target).map_err(std::io::Error::other)?;
    tokio::fs::write(sidecar, body).await
}
