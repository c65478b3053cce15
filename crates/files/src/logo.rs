//! Content-addressed logo store implementation
//!
//! This module provides [`LogoStore`], which keeps every uploaded logo as an immutable file named
//! by its SHA-256 digest and tracks the active one through a pointer file.
//!
//! # Snapshot semantics
//!
//! [`LogoStore::current`] returns the path of an immutable file. Uploading a new logo writes a
//! new file and swaps the pointer with a rename, which is atomic on a single filesystem. A render
//! that already resolved its logo keeps embedding the old image; the next render picks up the
//! new one.

use crate::constants::{CURRENT_POINTER_NAME, LOGO_FOLDER_NAME, SUPPORTED_MEDIA_TYPES};
use crate::FilesError;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Component, Path, PathBuf};
use wardchart_types::NonEmptyText;

/// Metadata for a stored logo
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct LogoMetadata {
    /// Hexadecimal SHA-256 digest of the image bytes
    pub hash: NonEmptyText,

    /// Path relative to the store root where the image is stored
    pub relative_path: NonEmptyText,

    /// Size of the image in bytes
    pub size_bytes: u64,

    /// Detected media type (MIME type)
    pub media_type: NonEmptyText,

    /// Original filename from the source path
    pub original_filename: NonEmptyText,

    /// UTC timestamp when the image became the active logo
    pub stored_at: DateTime<Utc>,
}

/// Store for the single active site logo
///
/// # Design
///
/// - Immutable: stored images are never rewritten
/// - Content-addressed: identical uploads share one file
/// - Pointer-based: the active logo is named by a pointer file replaced atomically
#[derive(Debug, Clone)]
pub struct LogoStore {
    /// Canonicalised root directory of the store
    root_directory: PathBuf,
}

impl LogoStore {
    /// Opens (creating if needed) a logo store rooted at `root_directory`
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidRootDirectory` if the directory cannot be created, exists
    /// but is not a directory, or cannot be canonicalised.
    pub fn new(root_directory: &Path) -> Result<Self, FilesError> {
        if root_directory.exists() && !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        fs::create_dir_all(root_directory).map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot create directory {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self { root_directory })
    }

    /// Uploads an image and makes it the active logo
    ///
    /// The image is stored at `<root>/sha256/<shard>/<hash>.<ext>`. Uploading bytes that are
    /// already stored reuses the existing file and only moves the pointer.
    ///
    /// # Arguments
    ///
    /// * `source_path` - Path to a PNG or JPEG image
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - The source file cannot be read (I/O)
    /// - The content is not PNG or JPEG (`UnsupportedMediaType`)
    /// - Writing the image or the pointer fails (I/O)
    pub fn upload(&self, source_path: &Path) -> Result<LogoMetadata, FilesError> {
        let buffer = fs::read(source_path).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to read source file {}: {}",
                    source_path.display(),
                    e
                ),
            ))
        })?;

        let detected = infer::get(&buffer).map(|kind| kind.mime_type());
        let (media_type, extension) = detected
            .and_then(|mime| {
                SUPPORTED_MEDIA_TYPES
                    .iter()
                    .find(|(supported, _)| *supported == mime)
                    .copied()
            })
            .ok_or_else(|| FilesError::UnsupportedMediaType {
                path: source_path.display().to_string(),
                detected: detected.unwrap_or("unknown").to_string(),
            })?;

        let hash = hex::encode(Sha256::digest(&buffer));
        let relative_path = Self::compute_relative_path(&hash, extension);
        let storage_path = self.root_directory.join(relative_path.as_str());

        if !storage_path.exists() {
            if let Some(parent) = storage_path.parent() {
                fs::create_dir_all(parent)?;
            }
            // Write beside the final name so a reader never sees a half-written image.
            let partial = storage_path.with_extension(format!("{}.partial", extension));
            fs::write(&partial, &buffer)?;
            fs::rename(&partial, &storage_path)?;
        }

        let pointer_tmp = self
            .root_directory
            .join(format!("{}.{}.tmp", CURRENT_POINTER_NAME, hash));
        fs::write(&pointer_tmp, relative_path.as_str())?;
        fs::rename(&pointer_tmp, self.pointer_path())?;

        let original_filename = source_path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| NonEmptyText::new(n).ok())
            .unwrap_or_else(|| NonEmptyText::new("unknown").expect("literal is non-empty"));

        Ok(LogoMetadata {
            hash: NonEmptyText::new(&hash).expect("hex digest is non-empty"),
            relative_path,
            size_bytes: buffer.len() as u64,
            media_type: NonEmptyText::new(media_type).expect("mime type is non-empty"),
            original_filename,
            stored_at: Utc::now(),
        })
    }

    /// Resolves the active logo
    ///
    /// # Returns
    ///
    /// `Some(path)` to an immutable image if a logo has been uploaded and is still on disk,
    /// `None` if no logo has been uploaded or the stored image has been removed.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidPath` if the pointer names a location outside the store, or
    /// `FilesError::Io` if the pointer cannot be read.
    pub fn current(&self) -> Result<Option<PathBuf>, FilesError> {
        let pointer = match fs::read_to_string(self.pointer_path()) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FilesError::Io(e)),
        };

        let relative = Path::new(pointer.trim());
        let within_store = relative.starts_with(LOGO_FOLDER_NAME)
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !within_store {
            return Err(FilesError::InvalidPath(format!(
                "logo pointer escapes the store: {}",
                pointer.trim()
            )));
        }

        let path = self.root_directory.join(relative);
        Ok(path.is_file().then_some(path))
    }

    /// Returns the canonicalised store root
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    fn pointer_path(&self) -> PathBuf {
        self.root_directory.join(CURRENT_POINTER_NAME)
    }

    /// Relative path in the format `sha256/<shard>/<hash>.<ext>`
    fn compute_relative_path(hash_hex: &str, extension: &str) -> NonEmptyText {
        let shard = &hash_hex[0..2];
        NonEmptyText::new(format!(
            "{}/{}/{}.{}",
            LOGO_FOLDER_NAME, shard, hash_hex, extension
        ))
        .expect("computed path is non-empty")
    }
}
