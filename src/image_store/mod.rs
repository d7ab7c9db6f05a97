/// Complaint photo storage
///
/// Images live on the local filesystem under the upload root and are served
/// read-only under `/storage/`. Paths handed out are relative to that root,
/// e.g. `complaints/<uuid>.jpg`.
use crate::error::{FmsError, FmsResult};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

const COMPLAINT_DIR: &str = "complaints";

/// Accepted upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }

    fn format(&self) -> ImageFormat {
        match self {
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Png => ImageFormat::Png,
        }
    }
}

/// Sniff the content and confirm the header decodes
///
/// The client's declared content type is never trusted.
pub fn detect_image_kind(bytes: &[u8]) -> Option<ImageKind> {
    let kind = match image::guess_format(bytes).ok()? {
        ImageFormat::Jpeg => ImageKind::Jpeg,
        ImageFormat::Png => ImageKind::Png,
        _ => return None,
    };

    ImageReader::with_format(Cursor::new(bytes), kind.format())
        .into_dimensions()
        .ok()
        .map(|_| kind)
}

/// Whether the bytes carry any known image signature
pub fn is_image(bytes: &[u8]) -> bool {
    image::guess_format(bytes).is_ok()
}

/// Image written to disk
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// Path relative to the upload root
    pub path: String,
    pub kind: ImageKind,
}

/// Disk-backed image store
#[derive(Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a complaint photo under a fresh random name
    pub async fn save(&self, bytes: &[u8], kind: ImageKind) -> FmsResult<StoredImage> {
        let dir = self.root.join(COMPLAINT_DIR);
        fs::create_dir_all(&dir).await.map_err(|e| {
            FmsError::ImageStorage(format!("Failed to create image directory: {}", e))
        })?;

        let file_name = format!("{}.{}", Uuid::new_v4(), kind.extension());
        fs::write(dir.join(&file_name), bytes)
            .await
            .map_err(|e| FmsError::ImageStorage(format!("Failed to write image {}: {}", file_name, e)))?;

        Ok(StoredImage {
            path: format!("{}/{}", COMPLAINT_DIR, file_name),
            kind,
        })
    }

    /// Remove a stored image; missing files are ignored
    pub async fn delete(&self, path: &str) -> FmsResult<()> {
        let full = self.resolve(path)?;
        match fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FmsError::ImageStorage(format!(
                "Failed to delete image {}: {}",
                path, e
            ))),
        }
    }

    /// Reject anything that would escape the upload root
    fn resolve(&self, path: &str) -> FmsResult<PathBuf> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || path.is_empty() {
            return Err(FmsError::ImageStorage(format!("Invalid image path: {}", path)));
        }
        Ok(self.root.join(relative))
    }
}

/// Public URL of a stored image
pub fn public_url(base_url: &str, path: &str) -> String {
    format!("{}/storage/{}", base_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG_PIXEL: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    #[test]
    fn test_detect_image_kind() {
        assert_eq!(detect_image_kind(PNG_PIXEL), Some(ImageKind::Png));
        assert_eq!(detect_image_kind(b"hello world"), None);
        assert!(!is_image(b"hello world"));

        // GIF signature: an image, but not an accepted one
        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";
        assert!(is_image(gif));
        assert_eq!(detect_image_kind(gif), None);

        // PNG signature with a truncated header
        assert_eq!(detect_image_kind(&PNG_PIXEL[..12]), None);
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = ImageStore::new(temp_dir.path().to_path_buf());

        let stored = store.save(PNG_PIXEL, ImageKind::Png).await.unwrap();
        assert!(stored.path.starts_with("complaints/"));
        assert!(stored.path.ends_with(".png"));
        assert!(temp_dir.path().join(&stored.path).exists());

        let data = tokio::fs::read(store.resolve(&stored.path).unwrap()).await.unwrap();
        assert_eq!(data, PNG_PIXEL);

        store.delete(&stored.path).await.unwrap();
        assert!(!temp_dir.path().join(&stored.path).exists());
        // Second delete is a no-op
        store.delete(&stored.path).await.unwrap();
    }

    #[tokio::test]
    async fn test_unique_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = ImageStore::new(temp_dir.path().to_path_buf());

        let a = store.save(PNG_PIXEL, ImageKind::Png).await.unwrap();
        let b = store.save(PNG_PIXEL, ImageKind::Png).await.unwrap();
        assert_ne!(a.path, b.path);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = ImageStore::new(temp_dir.path().to_path_buf());

        assert!(store.resolve("../secret.txt").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.delete("../secret.txt").await.is_err());
        assert!(store.delete("").await.is_err());
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            public_url("http://localhost:8000/", "complaints/a.jpg"),
            "http://localhost:8000/storage/complaints/a.jpg"
        );
        assert_eq!(
            public_url("https://fms.example.gov", "complaints/b.png"),
            "https://fms.example.gov/storage/complaints/b.png"
        );
    }
}
