//! Profile image storage
//!
//! Uploads are streamed to `<uploads.dir>/profiles` and referenced by their
//! public path (`/uploads/profiles/<file>`). A file that crosses the size
//! ceiling is removed before the error is returned, so a rejected upload
//! never leaves anything behind.

use crate::config::UploadsConfig;
use crate::error::ApiError;
use anyhow::Context;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use taskboard_shared::is_placeholder_avatar;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

const PROFILE_SUBDIR: &str = "profiles";

/// Accepted image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            "image/gif" => Some(ImageKind::Gif),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => ".jpg",
            ImageKind::Png => ".png",
            ImageKind::Gif => ".gif",
        }
    }
}

/// A file written by [`AvatarStore::store`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAvatar {
    pub path: PathBuf,
    /// Reference saved on the credential record
    pub url: String,
    pub size: u64,
}

/// Disk-backed avatar storage
#[derive(Debug, Clone)]
pub struct AvatarStore {
    dir: PathBuf,
    public_prefix: String,
    max_bytes: u64,
}

impl AvatarStore {
    pub fn new(root: impl AsRef<Path>, public_path: &str, max_bytes: u64) -> Self {
        Self {
            dir: root.as_ref().join(PROFILE_SUBDIR),
            public_prefix: format!("{}/{}", public_path.trim_end_matches('/'), PROFILE_SUBDIR),
            max_bytes,
        }
    }

    pub fn from_config(config: &UploadsConfig) -> Self {
        Self::new(&config.dir, &config.public_path, config.max_image_bytes)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub async fn ensure_dir(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))
    }

    /// Stream an upload to disk as `<owner>-<unix-millis>-<random><ext>`.
    ///
    /// Files are created exclusively, so two uploads never share a path.
    pub async fn store<S, E>(
        &self,
        owner: Uuid,
        content_type: Option<&str>,
        stream: S,
    ) -> Result<StoredAvatar, ApiError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let kind = content_type
            .and_then(ImageKind::from_content_type)
            .ok_or_else(|| {
                ApiError::field("profileImage", "Only JPEG, PNG and GIF images are allowed")
            })?;

        self.ensure_dir().await?;

        let file_name = format!(
            "{}-{}-{}{}",
            owner,
            chrono::Utc::now().timestamp_millis(),
            &Uuid::new_v4().simple().to_string()[..8],
            kind.extension()
        );
        let path = self.dir.join(&file_name);

        // An existing file is never truncated and never cleaned up here
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .with_context(|| format!("creating {}", path.display()))?;

        match self.write_limited(file, stream).await {
            Ok(size) => {
                debug!(path = %path.display(), size, "Stored profile image");
                Ok(StoredAvatar {
                    path,
                    url: format!("{}/{}", self.public_prefix, file_name),
                    size,
                })
            }
            Err(err) => {
                remove_quietly(&path).await;
                Err(err)
            }
        }
    }

    async fn write_limited<S, E>(&self, mut file: fs::File, stream: S) -> Result<u64, ApiError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        futures_util::pin_mut!(stream);
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ApiError::BadRequest(format!("Upload failed: {}", e)))?;
            written += chunk.len() as u64;
            if written > self.max_bytes {
                return Err(ApiError::field(
                    "profileImage",
                    format!(
                        "Image must be at most {} MB",
                        self.max_bytes / (1024 * 1024)
                    ),
                ));
            }
            file.write_all(&chunk)
                .await
                .context("writing profile image")?;
        }
        file.flush().await.context("flushing profile image")?;

        if written == 0 {
            return Err(ApiError::field("profileImage", "Uploaded image is empty"));
        }
        Ok(written)
    }

    /// Remove a file stored by this request that will not be committed
    pub async fn discard(&self, avatar: &StoredAvatar) {
        remove_quietly(&avatar.path).await;
    }

    /// Remove the file behind a previously saved reference.
    ///
    /// Placeholder avatars and references outside this store are left alone.
    pub async fn remove_reference(&self, reference: &str) {
        if is_placeholder_avatar(reference) || !reference.starts_with(&self.public_prefix) {
            return;
        }
        // Only the final component is trusted
        let Some(file_name) = Path::new(reference).file_name() else {
            return;
        };
        remove_quietly(&self.dir.join(file_name)).await;
    }
}

async fn remove_quietly(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed profile image"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), "Failed to remove profile image: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use rstest::rstest;
    use std::convert::Infallible;

    const MB: usize = 1024 * 1024;

    fn chunks(total: usize) -> impl Stream<Item = Result<Bytes, Infallible>> {
        let chunk = Bytes::from(vec![0u8; 64 * 1024]);
        let full = total / chunk.len();
        let rest = total % chunk.len();
        let mut parts: Vec<Result<Bytes, Infallible>> = (0..full).map(|_| Ok(chunk.clone())).collect();
        if rest > 0 {
            parts.push(Ok(Bytes::from(vec![0u8; rest])));
        }
        stream::iter(parts)
    }

    fn store(root: &Path) -> AvatarStore {
        AvatarStore::new(root, "/uploads", 5 * MB as u64)
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[rstest]
    #[case("image/jpeg", Some(ImageKind::Jpeg))]
    #[case("IMAGE/PNG", Some(ImageKind::Png))]
    #[case("image/gif", Some(ImageKind::Gif))]
    #[case("image/webp", None)]
    #[case("application/pdf", None)]
    fn test_image_kind_from_content_type(#[case] value: &str, #[case] expected: Option<ImageKind>) {
        assert_eq!(ImageKind::from_content_type(value), expected);
    }

    #[tokio::test]
    async fn test_two_megabyte_png_is_stored() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        let owner = Uuid::new_v4();

        let avatar = store
            .store(owner, Some("image/png"), chunks(2 * MB))
            .await
            .unwrap();

        assert_eq!(avatar.size, (2 * MB) as u64);
        assert!(avatar.url.starts_with(&format!("/uploads/profiles/{}-", owner)));
        assert!(avatar.url.ends_with(".png"));
        assert_eq!(std::fs::metadata(&avatar.path).unwrap().len(), (2 * MB) as u64);
    }

    #[tokio::test]
    async fn test_back_to_back_uploads_get_distinct_files() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        let owner = Uuid::new_v4();

        let first = store
            .store(owner, Some("image/png"), chunks(1024))
            .await
            .unwrap();
        let second = store
            .store(owner, Some("image/png"), chunks(2048))
            .await
            .unwrap();
        assert_ne!(first.path, second.path);

        // Dropping the first upload must not touch the one that is kept
        store.discard(&first).await;
        assert!(!first.path.exists());
        assert_eq!(std::fs::metadata(&second.path).unwrap().len(), 2048);
        assert_eq!(files_in(store.dir()), 1);
    }

    #[tokio::test]
    async fn test_oversized_upload_leaves_nothing_on_disk() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());

        let err = store
            .store(Uuid::new_v4(), Some("image/jpeg"), chunks(6 * MB))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(files_in(store.dir()), 0);
    }

    #[tokio::test]
    async fn test_wrong_type_is_rejected_before_writing() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());

        let err = store
            .store(Uuid::new_v4(), Some("text/plain"), chunks(10))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(files_in(store.dir()), 0);
    }

    #[tokio::test]
    async fn test_remove_reference_deletes_previous_upload() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());

        let old = store
            .store(Uuid::new_v4(), Some("image/gif"), chunks(1024))
            .await
            .unwrap();
        store.remove_reference(&old.url).await;

        assert!(!old.path.exists());
    }

    #[tokio::test]
    async fn test_placeholder_and_foreign_references_are_kept() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        let kept = store
            .store(Uuid::new_v4(), Some("image/png"), chunks(1024))
            .await
            .unwrap();

        store
            .remove_reference("https://ui-avatars.com/api/?name=Alice&background=random")
            .await;
        store.remove_reference("/elsewhere/file.png").await;
        store.remove_reference("").await;

        assert!(kept.path.exists());
    }

    #[tokio::test]
    async fn test_traversal_is_confined_to_store() {
        let root = tempfile::tempdir().unwrap();
        let outside = root.path().join("secret.txt");
        std::fs::write(&outside, "keep").unwrap();
        let store = store(root.path());

        store
            .remove_reference("/uploads/profiles/../secret.txt")
            .await;

        assert!(outside.exists());
    }
}
