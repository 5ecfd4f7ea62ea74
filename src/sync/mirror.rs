//! Best-effort local mirror of a product's primary image. Strictly a side
//! channel: a failed download is logged and the row is persisted anyway.

use crate::sync::error::SyncError;
use crate::sync::normalize::ProductRow;
use reqwest::Client;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

pub struct ImageMirror {
    http: Client,
    root: PathBuf,
}

impl ImageMirror {
    /// `http` is the shared marketplace client so downloads ride the same
    /// proxy and timeout; `root` anchors all mirrored paths.
    pub fn new(http: Client, root: impl Into<PathBuf>) -> Self {
        Self {
            http,
            root: root.into(),
        }
    }

    /// Download the first image of the row, if any, to a path derived from
    /// the image URL's path component. Returns the local path on success and
    /// `None` when the row has no images.
    pub async fn mirror(&self, row: &ProductRow) -> Result<Option<PathBuf>, SyncError> {
        let images = row.decoded_images();
        let Some(raw_url) = images
            .first()
            .and_then(|img| img.get("url"))
            .and_then(|u| u.as_str())
        else {
            return Ok(None);
        };

        let local = self.local_path(raw_url)?;
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::ImageMirror(format!("mkdir {parent:?}: {e}")))?;
        }

        let resp = self
            .http
            .get(raw_url)
            .send()
            .await
            .map_err(|e| SyncError::ImageMirror(format!("GET {raw_url}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::ImageMirror(format!(
                "GET {raw_url}: http {status}"
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SyncError::ImageMirror(format!("read {raw_url}: {e}")))?;
        tokio::fs::write(&local, &bytes)
            .await
            .map_err(|e| SyncError::ImageMirror(format!("write {local:?}: {e}")))?;

        debug!(product_id = row.id, path = ?local, "image mirrored");
        Ok(Some(local))
    }

    /// Derive the local target from the URL path, keeping only normal path
    /// segments so a hostile URL cannot climb out of the mirror root.
    fn local_path(&self, raw_url: &str) -> Result<PathBuf, SyncError> {
        let parsed = url::Url::parse(raw_url)
            .map_err(|e| SyncError::ImageMirror(format!("bad image url {raw_url}: {e}")))?;
        let mut local = self.root.clone();
        for component in Path::new(parsed.path()).components() {
            if let Component::Normal(seg) = component {
                local.push(seg);
            }
        }
        if local == self.root {
            return Err(SyncError::ImageMirror(format!(
                "image url has no file path: {raw_url}"
            )));
        }
        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::normalize::normalize;
    use serde_json::json;

    fn mirror_at(root: &str) -> ImageMirror {
        ImageMirror::new(Client::new(), root)
    }

    #[test]
    fn local_path_mirrors_the_url_path() {
        let m = mirror_at("/var/mirror");
        let p = m
            .local_path("https://img.shop.test/catalog/506/cable.jpg")
            .unwrap();
        assert_eq!(p, PathBuf::from("/var/mirror/catalog/506/cable.jpg"));
    }

    #[test]
    fn traversal_segments_are_dropped() {
        let m = mirror_at("/var/mirror");
        let p = m
            .local_path("https://img.shop.test/../../etc/passwd")
            .unwrap();
        assert_eq!(p, PathBuf::from("/var/mirror/etc/passwd"));
    }

    #[test]
    fn url_without_file_path_is_an_error() {
        let m = mirror_at("/var/mirror");
        assert!(matches!(
            m.local_path("https://img.shop.test/"),
            Err(SyncError::ImageMirror(_))
        ));
    }

    #[tokio::test]
    async fn row_without_images_is_skipped() {
        let m = mirror_at("/var/mirror");
        let row = normalize(&json!({"id": 1})).unwrap();
        assert_eq!(m.mirror(&row).await.unwrap(), None);
    }

    #[tokio::test]
    async fn image_entry_without_url_is_skipped() {
        let m = mirror_at("/var/mirror");
        let row = normalize(&json!({"id": 2, "images": [{"display_type": 1}]})).unwrap();
        assert_eq!(m.mirror(&row).await.unwrap(), None);
    }
}
