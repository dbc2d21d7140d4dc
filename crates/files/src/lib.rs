//! PRS Blob Storage
//!
//! This crate provides the blob store behind patient file records: prescription documents,
//! lab reports and scans are stored at a caller-chosen path and referenced from the patient
//! record by URL.
//!
//! ## Storage Model
//!
//! - Blobs are addressed by a validated relative [`BlobPath`]
//! - Writing to an existing path overwrites it (callers make paths unique)
//! - Content may be supplied as raw bytes or as base64 text
//! - Every blob has a YAML metadata sidecar (content type, SHA-256, size, storage time)
//! - Each blob is reachable through a public URL built from a configured prefix and
//!   carrying a capability token for that path ([`UrlSigner`])
//!
//! ```text
//! <blob_root>/
//! ├── objects/
//! │   └── General Hospital/
//! │       └── LabReport_2a33…_1704067200000
//! └── metadata/
//!     └── General Hospital/
//!         └── LabReport_2a33…_1704067200000.yaml
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use prs_files::{BlobContent, BlobPath, BlobStore, FsBlobStore, UrlSigner};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let signer = UrlSigner::new("change-me")?;
//! let store = FsBlobStore::new(
//!     Path::new("patient_data/blobs"),
//!     "http://localhost:3000/blobs",
//!     signer,
//! )?;
//! let path = BlobPath::parse("General Hospital/report.pdf")?;
//! let stored = store.put(&path, BlobContent::Bytes(b"%PDF-1.7".to_vec()), None)?;
//! println!("{}", stored.url);
//! # Ok(())
//! # }
//! ```

mod constants;
mod files;
mod path;
mod signing;

pub use constants::{
    DEFAULT_CONTENT_TYPE, METADATA_FOLDER_NAME, OBJECTS_FOLDER_NAME, TOKEN_QUERY_PARAM,
};
pub use files::{BlobContent, BlobMetadata, BlobStore, FsBlobStore, StoredBlob};
pub use path::BlobPath;
pub use signing::UrlSigner;

/// Errors that can occur during blob operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Public URL prefix cannot be used as a base for blob URLs
    #[error("Invalid public URL: {0}")]
    InvalidPublicUrl(String),

    /// URL signing key is empty
    #[error("Blob URL signing key cannot be empty")]
    InvalidSigningKey,

    /// Path validation failed (potential directory traversal or unsafe path)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Base64 content could not be decoded
    #[error("Invalid base64 content: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// No blob is stored at the requested path
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// Metadata sidecar could not be written or read
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_yaml::Error),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
