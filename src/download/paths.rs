use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::flickr::{CollectionRef, RemoteItem};

/// Highest `_N` suffix probed before giving up on a name.
pub const MAX_NAME_SUFFIX: u32 = 20;

/// Clean a filename by removing characters that are invalid on common
/// filesystems: `/`, `\`, `:`, `*`, `?`, `"`, `<`, `>`, `|`.
pub fn clean_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect()
}

/// A single path component derived from user text. Falls back to
/// `fallback` when cleaning leaves nothing usable (empty, `.` or `..`).
fn path_component(name: &str, fallback: &str) -> String {
    let clean = clean_filename(name.trim());
    if clean.is_empty() || clean.chars().all(|c| c == '.') {
        clean_filename(fallback)
    } else {
        clean
    }
}

/// Extension of the origin URL's last path segment, with the leading dot,
/// or an empty string when there is none. Query strings are ignored.
pub fn extension_from_url(origin: &str) -> String {
    let Ok(parsed) = url::Url::parse(origin) else {
        return String::new();
    };
    let last = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    match last.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < last.len() => last[dot..].to_string(),
        _ => String::new(),
    }
}

/// Folder a photo lands in: the base directory, plus one subfolder named
/// after the album when the photo was listed from an album.
pub fn destination_folder(base: &Path, collection: Option<&CollectionRef>) -> PathBuf {
    match collection {
        Some(c) => base.join(path_component(&c.title, &c.id)),
        None => base.to_path_buf(),
    }
}

/// File name before uniqueness resolution: cleaned title plus the URL's
/// extension.
pub fn base_filename(item: &RemoteItem) -> String {
    let stem = path_component(&item.title, &item.id);
    format!("{stem}{}", extension_from_url(&item.original_url))
}

/// Sidecar location for a downloaded file, before uniqueness resolution.
pub fn sidecar_path(destination: &Path) -> PathBuf {
    destination.with_extension("json")
}

/// Return `path` if nothing exists there, otherwise the first free
/// `stem_N.ext` for N in `1..=20`.
pub async fn unique_path(path: &Path) -> Result<PathBuf, PipelineError> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(path.to_path_buf());
    }

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    for n in 1..=MAX_NAME_SUFFIX {
        let candidate = parent.join(format!("{stem}_{n}{ext}"));
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(PipelineError::NameExhausted {
        base: parent.join(stem),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::item;

    #[test]
    fn test_clean_filename() {
        assert_eq!(clean_filename("photo:1.jpg"), "photo1.jpg");
        assert_eq!(clean_filename("a/b\\c*d?e\"f<g>h|i"), "abcdefghi");
        assert_eq!(clean_filename("normal.jpg"), "normal.jpg");
        assert_eq!(clean_filename("tab\there"), "tabhere");
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(
            extension_from_url("https://live.staticflickr.com/65535/1_abc_o.jpg"),
            ".jpg"
        );
        assert_eq!(extension_from_url("https://x/y/video.MP4?s=1"), ".MP4");
        assert_eq!(extension_from_url("https://x/y/noext"), "");
        assert_eq!(extension_from_url("https://x/y/.hidden"), "");
        assert_eq!(extension_from_url("not a url"), "");
    }

    #[test]
    fn test_destination_folder_per_scope() {
        let base = Path::new("/photos");
        assert_eq!(destination_folder(base, None), PathBuf::from("/photos"));
        let album = CollectionRef {
            id: "72157".into(),
            title: "Trips: 2019".into(),
        };
        assert_eq!(
            destination_folder(base, Some(&album)),
            PathBuf::from("/photos/Trips 2019")
        );
        let dots = CollectionRef {
            id: "72157".into(),
            title: "..".into(),
        };
        assert_eq!(
            destination_folder(base, Some(&dots)),
            PathBuf::from("/photos/72157")
        );
    }

    #[test]
    fn test_base_filename_uses_title_and_url_extension() {
        let photo = item("51", "Sunset / Beach", None);
        assert_eq!(base_filename(&photo), "Sunset  Beach.jpg");

        let untitled = item("51", "???", None);
        assert_eq!(base_filename(&untitled), "51.jpg");
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("/p/photo_1.jpg")),
            PathBuf::from("/p/photo_1.json")
        );
    }

    #[tokio::test]
    async fn test_unique_path_free_name_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        assert_eq!(unique_path(&path).await.unwrap(), path);
    }

    #[tokio::test]
    async fn test_unique_path_appends_counter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("photo.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("photo_1.jpg"), b"x").unwrap();
        assert_eq!(
            unique_path(&dir.path().join("photo.jpg")).await.unwrap(),
            dir.path().join("photo_2.jpg")
        );
    }

    #[tokio::test]
    async fn test_unique_path_gives_up_after_twenty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("photo.jpg"), b"x").unwrap();
        for n in 1..=20 {
            std::fs::write(dir.path().join(format!("photo_{n}.jpg")), b"x").unwrap();
        }
        let err = unique_path(&dir.path().join("photo.jpg")).await.unwrap_err();
        assert!(matches!(err, PipelineError::NameExhausted { .. }));
        assert!(err.to_string().starts_with("Too many files with same name:"));
    }

    #[tokio::test]
    async fn test_unique_path_twentieth_slot_is_still_usable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("photo.jpg"), b"x").unwrap();
        for n in 1..20 {
            std::fs::write(dir.path().join(format!("photo_{n}.jpg")), b"x").unwrap();
        }
        assert_eq!(
            unique_path(&dir.path().join("photo.jpg")).await.unwrap(),
            dir.path().join("photo_20.jpg")
        );
    }
}
