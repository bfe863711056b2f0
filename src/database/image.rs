use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use uuid::Uuid;

use crate::constants::RECIPE_IMAGE_DIR;

use super::error::{StorageError, TypeError};

pub const INVALID_IMAGE: &str = "Загруженный файл не является корректным файлом.";
pub const EMPTY_IMAGE: &str = "Отправленный файл пуст.";

pub const IMAGE_TYPES: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Decoded image payload of a recipe form.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Accepts `data:image/<type>;base64,<payload>` or a bare base64 payload.
    /// A declared type must be one of [`IMAGE_TYPES`]; the stored type comes
    /// from the file signature.
    pub fn decode(value: &str) -> Result<Self, TypeError> {
        let payload = match value.split_once(";base64,") {
            Some((header, payload)) if declares_image(header) => payload,
            Some(_) => return Err(TypeError::new(INVALID_IMAGE)),
            None => value,
        };

        let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        if payload.is_empty() {
            return Err(TypeError::new(EMPTY_IMAGE));
        }

        let bytes = BASE64
            .decode(payload)
            .map_err(|_e| TypeError::new(INVALID_IMAGE))?;

        match sniff_extension(&bytes) {
            Some(extension) => Ok(Self { extension, bytes }),
            None => Err(TypeError::new(INVALID_IMAGE)),
        }
    }
}

fn declares_image(header: &str) -> bool {
    let Some(media_type) = header.strip_prefix("data:image/") else {
        return false;
    };
    let subtype = media_type.split(';').next().unwrap_or_default();

    IMAGE_TYPES.contains(&subtype.to_ascii_lowercase().as_str())
}

fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("gif")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

/// Uploaded files on disk, addressed by paths relative to `root`.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    url: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, url: &str) -> Self {
        let url = match url.ends_with('/') {
            true => url.to_string(),
            false => format!("{url}/"),
        };

        Self {
            root: root.into(),
            url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.url, path.trim_start_matches('/'))
    }

    /// Writes the image under a fresh name and returns its relative path.
    pub async fn save(&self, image: &ImageUpload) -> Result<String, potion::Error> {
        let path = format!("{}/{}.{}", RECIPE_IMAGE_DIR, Uuid::new_v4(), image.extension);
        let target = self.root.join(&path);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StorageError::from)?;
        }

        tokio::fs::write(&target, &image.bytes)
            .await
            .map_err(StorageError::from)?;

        log::trace!("> Stored image {path} ({} bytes)", image.bytes.len());
        Ok(path)
    }

    /// Best effort; a file that is already gone is not an error.
    pub async fn remove(&self, path: &str) {
        match tokio::fs::remove_file(self.root.join(path)).await {
            Ok(_) => log::trace!("> Removed image {path}"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::error!("> Failed to remove image {path}! {e}"),
        }
    }
}
