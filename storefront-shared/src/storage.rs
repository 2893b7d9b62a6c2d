/// Local upload storage
///
/// Product images and seller-request documents are written to a single
/// directory. Stored names are `<uuid>_<sanitized original name>`, so two
/// uploads with the same name never overwrite each other and no stored
/// name can escape the directory. Rows keep only the stored name; the API
/// serves the directory back under `/uploads/` and `/view_document/`.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Upload is empty")]
    Empty,

    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to the upload directory
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directory if it doesn't exist yet
    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Writes an upload and returns its stored filename
    ///
    /// # Errors
    ///
    /// `Empty` for zero-length uploads, `TooLarge` above the configured
    /// limit, `Io` when the write fails.
    pub async fn save(&self, original_name: &str, data: Bytes) -> Result<String, StorageError> {
        if data.is_empty() {
            return Err(StorageError::Empty);
        }
        if data.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                size: data.len(),
                limit: self.max_bytes,
            });
        }

        let stored_name = format!("{}_{}", Uuid::new_v4().simple(), sanitize_filename(original_name));
        tokio::fs::write(self.root.join(&stored_name), &data).await?;

        info!(file = %stored_name, bytes = data.len(), "Stored upload");
        Ok(stored_name)
    }

    /// Removes a stored file, ignoring files that are already gone
    pub async fn remove(&self, stored_name: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.root.join(sanitize_filename(stored_name))).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(file = stored_name, "Upload already removed");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Reduces a client-supplied filename to a safe single path component
///
/// Keeps ASCII letters, digits, `.`, `-` and `_`; whitespace becomes `_`;
/// everything else is dropped. Directory parts are stripped first, leading
/// dots are removed, and an empty result becomes `upload`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(limit: usize) -> UploadStore {
        UploadStore::new(
            std::env::temp_dir().join(format!("storefront-uploads-{}", Uuid::new_v4())),
            limit,
        )
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("photo.png"), "photo.png");
        assert_eq!(sanitize_filename("my photo (1).png"), "my_photo_1.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\x\\id.pdf"), "id.pdf");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename("///"), "upload");
        assert_eq!(sanitize_filename("résumé.pdf"), "rsum.pdf");
    }

    #[tokio::test]
    async fn test_save_writes_unique_files() {
        let store = temp_store(1024);
        store.ensure_dir().await.unwrap();

        let a = store.save("doc.pdf", Bytes::from_static(b"one")).await.unwrap();
        let b = store.save("doc.pdf", Bytes::from_static(b"two")).await.unwrap();

        assert_ne!(a, b);
        assert!(a.ends_with("_doc.pdf"));
        assert_eq!(tokio::fs::read(store.root().join(&a)).await.unwrap(), b"one");

        store.remove(&a).await.unwrap();
        store.remove(&a).await.unwrap();
        assert!(!store.root().join(&a).exists());

        tokio::fs::remove_dir_all(store.root()).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_rejects_empty_and_oversized() {
        let store = temp_store(4);
        store.ensure_dir().await.unwrap();

        assert!(matches!(
            store.save("a.txt", Bytes::new()).await,
            Err(StorageError::Empty)
        ));
        assert!(matches!(
            store.save("a.txt", Bytes::from_static(b"12345")).await,
            Err(StorageError::TooLarge { size: 5, limit: 4 })
        ));

        tokio::fs::remove_dir_all(store.root()).await.unwrap();
    }
}
