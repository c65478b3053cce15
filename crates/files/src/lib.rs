//! Site logo storage.
//!
//! A chart carries exactly one logo in its header. Sites may upload their own image; when none
//! has been uploaded the renderer falls back to a bundled default. This crate owns the uploaded
//! side of that choice.
//!
//! ## Design Principles
//!
//! - Uploaded images are stored content-addressed by SHA-256 and never modified afterwards
//! - A small pointer file names the active image and is replaced atomically on upload
//! - Readers resolve the pointer once and keep the immutable path they were given, so a
//!   re-upload during an in-flight render cannot change what that render embeds
//!
//! ## Storage Layout
//!
//! ```text
//! <logo_root>/
//! ├── current              # relative path of the active logo
//! └── sha256/
//!     └── ab/
//!         └── ab3f9e….png
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use wardchart_files::LogoStore;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = LogoStore::new(Path::new("resources/logo"))?;
//! store.upload(Path::new("hospital.png"))?;
//! let active = store.current()?;
//! # Ok(())
//! # }
//! ```

mod constants;
mod logo;

pub use constants::{CURRENT_POINTER_NAME, LOGO_FOLDER_NAME};
pub use logo::{LogoMetadata, LogoStore};

/// Errors that can occur during logo storage operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory could not be created or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// The pointer file names a path outside the store or in an unexpected shape
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The uploaded file is not an image the typesetting engine can embed
    #[error("Unsupported media type for {path}: {detected}")]
    UnsupportedMediaType { path: String, detected: String },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
