//! Local image storage for product uploads.
//!
//! Files land in `{UPLOAD_DIR}/{product_id}/{uuid}.{ext}` and are served
//! back under `{UPLOAD_BASE_URL}/{product_id}/{uuid}.{ext}`.

use std::path::PathBuf;

use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

use souq_core::ProductId;

use crate::config::UploadConfig;

/// Why an upload was refused or failed.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("file is empty")]
    Empty,

    #[error("file exceeds {0} bytes")]
    TooLarge(usize),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Image content types and the extension each is stored under.
const ACCEPTED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("image/avif", "avif"),
];

/// Writes product images to the upload directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    base_url: String,
    max_bytes: usize,
}

impl ImageStore {
    #[must_use]
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            base_url: config.base_url.clone(),
            max_bytes: config.max_bytes,
        }
    }

    /// Check an upload without touching the disk. Returns the file extension.
    ///
    /// # Errors
    ///
    /// Returns `UploadError` if the type is not an accepted image or the size
    /// is out of bounds.
    pub fn validate(&self, content_type: Option<&str>, len: usize) -> Result<&'static str, UploadError> {
        let content_type = content_type.unwrap_or_default().trim().to_ascii_lowercase();
        let ext = ACCEPTED_TYPES
            .iter()
            .find(|(mime, _)| *mime == content_type)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| UploadError::UnsupportedType(content_type.clone()))?;

        if len == 0 {
            return Err(UploadError::Empty);
        }
        if len > self.max_bytes {
            return Err(UploadError::TooLarge(self.max_bytes));
        }
        Ok(ext)
    }

    /// Store one image and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns `UploadError` if validation fails or the file cannot be written.
    pub async fn save(
        &self,
        product_id: ProductId,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, UploadError> {
        let ext = self.validate(content_type, bytes.len())?;

        let product_dir = self.dir.join(product_id.to_string());
        fs::create_dir_all(&product_dir).await?;

        let file_name = format!("{}.{ext}", Uuid::new_v4());
        fs::write(product_dir.join(&file_name), bytes).await?;

        Ok(format!("{}/{product_id}/{file_name}", self.base_url))
    }

    /// Remove a stored image by its public URL.
    ///
    /// URLs outside the upload prefix are ignored, as are files already gone.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Io` if the file exists but cannot be removed.
    pub async fn remove(&self, url: &str) -> Result<(), UploadError> {
        let Some(path) = self.path_for(url) else {
            return Ok(());
        };
        match fs::remove_file(path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn path_for(&self, url: &str) -> Option<PathBuf> {
        let relative = url.strip_prefix(&self.base_url)?.strip_prefix('/')?;
        let mut parts = relative.split('/');
        let (Some(product), Some(file), None) = (parts.next(), parts.next(), parts.next()) else {
            return None;
        };
        if product.is_empty() || file.is_empty() || product.starts_with('.') || file.starts_with('.') {
            return None;
        }
        Some(self.dir.join(product).join(file))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store(dir: PathBuf) -> ImageStore {
        ImageStore::new(&UploadConfig {
            dir,
            base_url: "/uploads".to_string(),
            max_bytes: 16,
        })
    }

    #[test]
    fn test_validate() {
        let store = store(PathBuf::from("uploads"));
        assert_eq!(store.validate(Some("image/png"), 4).unwrap(), "png");
        assert_eq!(store.validate(Some("IMAGE/JPEG"), 4).unwrap(), "jpg");
        assert!(matches!(
            store.validate(Some("application/pdf"), 4),
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(matches!(store.validate(None, 4), Err(UploadError::UnsupportedType(_))));
        assert!(matches!(store.validate(Some("image/png"), 0), Err(UploadError::Empty)));
        assert!(matches!(
            store.validate(Some("image/png"), 17),
            Err(UploadError::TooLarge(16))
        ));
    }

    #[test]
    fn test_path_for_stays_inside_upload_dir() {
        let store = store(PathBuf::from("uploads"));
        assert_eq!(
            store.path_for("/uploads/7/a.png"),
            Some(PathBuf::from("uploads/7/a.png"))
        );
        assert_eq!(store.path_for("/uploads/../etc/passwd"), None);
        assert_eq!(store.path_for("/uploads/7/../../x"), None);
        assert_eq!(store.path_for("https://cdn.example.com/7/a.png"), None);
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = std::env::temp_dir().join(format!("souq-uploads-{}", Uuid::new_v4()));
        let store = store(dir.clone());

        let url = store
            .save(ProductId::new(7), Some("image/webp"), b"RIFF0000WEBP")
            .await
            .unwrap();
        assert!(url.starts_with("/uploads/7/"));
        assert!(url.ends_with(".webp"));

        let path = store.path_for(&url).unwrap();
        assert_eq!(fs::read(&path).await.unwrap(), b"RIFF0000WEBP");

        store.remove(&url).await.unwrap();
        assert!(!path.exists());
        // Removing twice is fine.
        store.remove(&url).await.unwrap();

        fs::remove_dir_all(dir).await.unwrap();
    }
}
