use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;
use uuid::Uuid;

/// Stores uploaded product images under the configured directory and
/// hands back the public URL path they are served from.
pub struct ImageService {
    images_path: String,
}

impl ImageService {
    #[must_use]
    pub const fn new(images_path: String) -> Self {
        Self { images_path }
    }

    pub async fn save_upload(&self, original_filename: &str, bytes: &[u8]) -> Result<String> {
        let extension = Path::new(original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("jpg");

        // Uploads get a fresh name so clients cannot pick paths or clobber
        // each other's files.
        let filename = format!("{}.{}", Uuid::new_v4(), extension.to_lowercase());

        let images_dir = PathBuf::from(&self.images_path);
        if !images_dir.exists() {
            fs::create_dir_all(&images_dir).await?;
        }

        let file_path = images_dir.join(&filename);
        fs::write(&file_path, bytes)
            .await
            .with_context(|| format!("Failed to write image to {}", file_path.display()))?;

        info!(path = %file_path.display(), "Saved product image");

        Ok(format!("/images/{filename}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_upload_sanitizes_extension() {
        let dir = std::env::temp_dir().join(format!("pickarr-images-{}", Uuid::new_v4()));
        let service = ImageService::new(dir.display().to_string());

        let url = service
            .save_upload("../evil/..\\photo.PNG", b"not-really-a-png")
            .await
            .unwrap();

        assert!(url.starts_with("/images/"));
        assert!(url.ends_with(".png"));

        let filename = url.trim_start_matches("/images/");
        let on_disk = dir.join(filename);
        assert_eq!(fs::read(on_disk).await.unwrap(), b"not-really-a-png");
    }

    #[tokio::test]
    async fn test_save_upload_defaults_extension() {
        let dir = std::env::temp_dir().join(format!("pickarr-images-{}", Uuid::new_v4()));
        let service = ImageService::new(dir.display().to_string());

        let url = service.save_upload("noextension", b"bytes").await.unwrap();
        assert!(url.ends_with(".jpg"));
    }
}
