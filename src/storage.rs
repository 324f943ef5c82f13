/*!
 * Media Storage
 * Uploaded files on the local disk, served back under the public upload prefix
 */
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const MB: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("No file provided")]
    Empty,

    #[error("File too large. Maximum size is {limit_mb}MB.")]
    TooLarge { limit_mb: usize },

    #[error("File content does not match an allowed image type.")]
    NotAnImage,

    #[error("Invalid filename")]
    InvalidName,

    #[error("File not found")]
    NotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where an upload comes from decides how large it may be and whether it
/// has to be an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Media library: any file type.
    Media,
    /// Images inserted into post or block text.
    ContentImage,
    /// Site background images.
    Background,
}

impl UploadKind {
    pub fn max_bytes(&self) -> usize {
        match self {
            UploadKind::Media => 50 * MB,
            UploadKind::ContentImage => 5 * MB,
            UploadKind::Background => 10 * MB,
        }
    }

    pub fn requires_image(&self) -> bool {
        !matches!(self, UploadKind::Media)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub name: String,
    pub url: String,
    pub size: u64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

/// Sniff an image type from its leading bytes.
pub fn detect_image_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "video/mp4" => Some("mp4"),
        "video/webm" => Some("webm"),
        "video/ogg" => Some("ogg"),
        "video/quicktime" => Some("mov"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogg" => "video/ogg",
        "mov" => "video/quicktime",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Lowercased extension of a client-supplied file name, if it is a plain
/// short alphanumeric one.
fn clean_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    (!ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .then_some(ext)
}

/// Stored names are generated, so anything that could leave the upload
/// directory is rejected outright.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_url(&self, name: &str) -> String {
        format!("{}/{}", self.url_prefix, name)
    }

    /// Check `bytes` against the policy for `kind` and write them under a
    /// fresh `<uuid>.<ext>` name.
    pub async fn upload(
        &self,
        kind: UploadKind,
        file_name: Option<&str>,
        declared_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredFile, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::Empty);
        }
        if bytes.len() > kind.max_bytes() {
            return Err(StorageError::TooLarge {
                limit_mb: kind.max_bytes() / MB,
            });
        }

        let sniffed = detect_image_type(bytes);
        let (mime_type, ext) = if kind.requires_image() {
            let mime = sniffed.ok_or(StorageError::NotAnImage)?;
            (mime.to_string(), extension_for_mime(mime).unwrap_or("bin").to_string())
        } else {
            let mime = sniffed
                .or(declared_type.filter(|t| !t.is_empty()))
                .unwrap_or("application/octet-stream")
                .to_string();
            let ext = file_name
                .and_then(clean_extension)
                .or_else(|| extension_for_mime(&mime).map(str::to_string))
                .unwrap_or_else(|| "bin".to_string());
            (mime, ext)
        };

        tokio::fs::create_dir_all(&self.root).await?;

        let name = format!("{}.{}", Uuid::new_v4(), ext);
        tokio::fs::write(self.root.join(&name), bytes).await?;

        tracing::info!(file = %name, size = bytes.len(), mime = %mime_type, "file uploaded");

        Ok(StoredFile {
            url: self.public_url(&name),
            name,
            size: bytes.len() as u64,
            mime_type,
            created_at: Utc::now(),
        })
    }

    /// Every stored file, newest first.
    pub async fn list(&self) -> Result<Vec<StoredFile>, StorageError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            let created_at: DateTime<Utc> = metadata
                .created()
                .or_else(|_| metadata.modified())
                .map(DateTime::from)
                .unwrap_or_else(|_| Utc::now());
            let mime_type = clean_extension(&name)
                .map(|ext| mime_for_extension(&ext))
                .unwrap_or("application/octet-stream")
                .to_string();

            files.push(StoredFile {
                url: self.public_url(&name),
                name,
                size: metadata.len(),
                mime_type,
                created_at,
            });
        }

        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files)
    }

    pub async fn delete(&self, name: &str) -> Result<(), StorageError> {
        if !is_safe_name(name) {
            return Err(StorageError::InvalidName);
        }

        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => {
                tracing::info!(file = %name, "file deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}
