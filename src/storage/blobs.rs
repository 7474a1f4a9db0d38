//! Filesystem blob store for view images.
//!
//! Each report owns a namespace `reports/<report_id>/` holding its view
//! images as `view_<n>.<ext>`. Deleting a report removes the whole
//! namespace. Keys are relative paths under the store root and double as the
//! opaque handles stored on report records.

use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::StorageError;
use crate::types::ImageRef;

/// Per-report image blob storage rooted at a local directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl BlobStore {
    /// Open the blob store, creating the root directory if needed.
    ///
    /// `public_base_url` is the externally reachable base of this service,
    /// used to derive the public URL for each stored image.
    pub fn open<P: Into<PathBuf>>(root: P, public_base_url: &str) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Store one view image under the report's namespace.
    ///
    /// `view` is the 1-based ordinal of the photograph within the request.
    /// Returns the stored reference: public URL plus opaque blob key.
    pub fn put_view(
        &self,
        report_id: &str,
        view: usize,
        extension: &str,
        bytes: &[u8],
    ) -> Result<ImageRef, StorageError> {
        let extension = sanitize_extension(extension);
        let key = format!("reports/{report_id}/view_{view}.{extension}");

        let path = self.resolve(&key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;

        Ok(ImageRef {
            url: format!(
                "{}/api/v1/reports/{report_id}/images/{view}",
                self.public_base_url
            ),
            blob_key: key,
        })
    }

    /// Read a blob by its opaque key.
    pub fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        Ok(fs::read(path)?)
    }

    /// Locate a stored view image by report id and 1-based ordinal.
    ///
    /// Returns the bytes and the stored file name (the extension varies with
    /// the original upload).
    pub fn view_image(
        &self,
        report_id: &str,
        view: usize,
    ) -> Result<Option<(Vec<u8>, String)>, StorageError> {
        let dir = self.resolve(&format!("reports/{report_id}"))?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("view_{view}.");
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) {
                return Ok(Some((fs::read(entry.path())?, name)));
            }
        }
        Ok(None)
    }

    /// Cascade-delete every blob under a report's namespace.
    ///
    /// Returns the number of removed blobs; absent namespaces are not an
    /// error.
    pub fn delete_report(&self, report_id: &str) -> Result<usize, StorageError> {
        let dir = self.resolve(&format!("reports/{report_id}"))?;
        if !dir.exists() {
            return Ok(0);
        }

        let removed = fs::read_dir(&dir)?.count();
        fs::remove_dir_all(&dir)?;
        tracing::debug!(report_id, removed, "Deleted report blob namespace");
        Ok(removed)
    }

    /// Resolve a key to an absolute path, rejecting traversal outside the
    /// store root.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let traverses = relative.components().any(|c| {
            !matches!(c, std::path::Component::Normal(_))
        });
        if key.is_empty() || traverses {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

/// Keep only a safe alphanumeric extension; anything else becomes `bin`.
fn sanitize_extension(extension: &str) -> String {
    let cleaned: String = extension
        .trim_start_matches('.')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if cleaned.is_empty() {
        "bin".to_string()
    } else {
        cleaned.to_ascii_lowercase()
    }
}
