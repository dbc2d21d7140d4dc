//! Filesystem-backed blob store implementation
//!
//! This module provides [`FsBlobStore`], the blob store used by the PRS service. Blobs are
//! written under `<root>/objects/<path>` and described by a YAML sidecar under
//! `<root>/metadata/<path>.yaml`. URLs handed back to callers are built from a configured
//! public prefix and carry a `token` query parameter signed for that path, so whoever holds
//! the URL can fetch the blob without further credentials.
//!
//! # Content Types
//!
//! The stored content type is resolved in this order:
//!
//! 1. the content type supplied by the caller
//! 2. the media type declared in a `data:` URL prefix of base64 content
//! 3. the media type detected from the leading bytes (best-effort)
//! 4. [`DEFAULT_CONTENT_TYPE`]
//!
//! # Overwrites
//!
//! Paths are chosen by the caller. Writing to a path that already holds a blob replaces
//! both the bytes and the metadata without warning.

use crate::constants::METADATA_EXTENSION;
use crate::{
    BlobPath, FilesError, UrlSigner, DEFAULT_CONTENT_TYPE, METADATA_FOLDER_NAME,
    OBJECTS_FOLDER_NAME, TOKEN_QUERY_PARAM,
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use prs_types::NonEmptyText;
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Content handed to the blob store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlobContent {
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Standard base64 text, optionally prefixed with `data:<media type>;base64,`.
    Base64(String),
}

impl BlobContent {
    /// Decodes the content into bytes, returning any media type declared by a data URL.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidBase64`] if base64 text cannot be decoded.
    pub fn decode(self) -> Result<(Vec<u8>, Option<String>), FilesError> {
        match self {
            BlobContent::Bytes(bytes) => Ok((bytes, None)),
            BlobContent::Base64(text) => {
                let text = text.trim();
                let (declared, payload) = match text
                    .strip_prefix("data:")
                    .and_then(|rest| rest.split_once(";base64,"))
                {
                    Some((media_type, payload)) => {
                        let media_type = media_type.trim();
                        let declared = (!media_type.is_empty()).then(|| media_type.to_owned());
                        (declared, payload)
                    }
                    None => (None, text),
                };
                let bytes = general_purpose::STANDARD.decode(payload)?;
                Ok((bytes, declared))
            }
        }
    }
}

/// Metadata for a stored blob
///
/// Serialised to YAML and stored alongside the blob. It carries no patient identifiers
/// beyond whatever the caller chose to put in the path.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct BlobMetadata {
    /// Path of the blob relative to the store root
    pub path: String,

    /// Hashing algorithm used for `hash` (always "sha256")
    pub hash_algorithm: NonEmptyText,

    /// Hexadecimal SHA-256 digest of the blob bytes
    pub hash: String,

    /// Size of the blob in bytes
    pub size_bytes: u64,

    /// Content type served with the blob
    pub content_type: NonEmptyText,

    /// Media type detected from the bytes, if any
    ///
    /// Best-effort only; recorded so a mismatch with `content_type` can be audited.
    pub detected_media_type: Option<NonEmptyText>,

    /// UTC timestamp when the blob was stored
    pub stored_at: DateTime<Utc>,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Dereferenceable URL of the blob
    pub url: String,
    pub metadata: BlobMetadata,
}

/// Path-addressed blob storage.
///
/// Implementations must be safe to share between request handlers.
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Stores `content` at `path`, overwriting anything already there.
    fn put(
        &self,
        path: &BlobPath,
        content: BlobContent,
        content_type: Option<&str>,
    ) -> Result<StoredBlob, FilesError>;

    /// Reads a blob and its metadata.
    fn read(&self, path: &BlobPath) -> Result<(Vec<u8>, BlobMetadata), FilesError>;

    /// Returns the public, token-bearing URL for `path` without touching storage.
    fn url_for(&self, path: &BlobPath) -> String;

    /// Checks a URL token presented for `path`.
    fn verify_token(&self, path: &BlobPath, token: &str) -> bool;
}

/// Blob store rooted in a local directory
///
/// # Design
///
/// - The root directory must exist when the store is created
/// - Object and metadata folders are created lazily on first write
/// - All paths are [`BlobPath`]s, which cannot escape the root
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    /// Canonicalised root directory
    root_directory: PathBuf,

    /// Prefix for public blob URLs
    public_base: Url,

    /// Signs the capability token appended to every URL
    signer: UrlSigner,
}

impl FsBlobStore {
    /// Creates a new `FsBlobStore`
    ///
    /// # Arguments
    ///
    /// * `root_directory` - Existing directory that will hold `objects/` and `metadata/`
    /// * `public_base_url` - Absolute URL prefix under which blobs are served
    /// * `signer` - Signs the per-path token carried by blob URLs
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - The root directory does not exist or is not a directory
    /// - Path canonicalisation fails
    /// - The public URL is not an absolute, hierarchical URL
    pub fn new(
        root_directory: &Path,
        public_base_url: &str,
        signer: UrlSigner,
    ) -> Result<Self, FilesError> {
        if !root_directory.exists() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                root_directory.display()
            )));
        }

        if !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        let public_base = Url::parse(public_base_url)
            .map_err(|e| FilesError::InvalidPublicUrl(format!("{}: {}", public_base_url, e)))?;
        if public_base.cannot_be_a_base() {
            return Err(FilesError::InvalidPublicUrl(format!(
                "{} cannot be used as a base URL",
                public_base_url
            )));
        }

        Ok(Self {
            root_directory,
            public_base,
            signer,
        })
    }

    /// Returns the canonicalised root directory
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    fn object_path(&self, path: &BlobPath) -> PathBuf {
        path.under(&self.root_directory.join(OBJECTS_FOLDER_NAME))
    }

    fn metadata_path(&self, path: &BlobPath) -> PathBuf {
        let mut file = path.under(&self.root_directory.join(METADATA_FOLDER_NAME));
        let name = file
            .file_name()
            .map(|n| format!("{}.{}", n.to_string_lossy(), METADATA_EXTENSION))
            .unwrap_or_else(|| format!("blob.{}", METADATA_EXTENSION));
        file.set_file_name(name);
        file
    }

    fn write_file(target: &Path, bytes: &[u8]) -> Result<(), FilesError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                FilesError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create storage directory {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        fs::write(target, bytes).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write file to {}: {}", target.display(), e),
            ))
        })
    }
}

impl BlobStore for FsBlobStore {
    fn put(
        &self,
        path: &BlobPath,
        content: BlobContent,
        content_type: Option<&str>,
    ) -> Result<StoredBlob, FilesError> {
        let (bytes, declared) = content.decode()?;

        let detected_media_type =
            infer::get(&bytes).and_then(|kind| NonEmptyText::new(kind.mime_type()).ok());
        let content_type = NonEmptyText::optional(content_type)
            .or_else(|| NonEmptyText::optional(declared))
            .or_else(|| detected_media_type.clone())
            .unwrap_or_else(default_content_type);

        let metadata = BlobMetadata {
            path: path.as_str().to_owned(),
            hash_algorithm: sha256_label(),
            hash: hex::encode(Sha256::digest(&bytes)),
            size_bytes: bytes.len() as u64,
            content_type,
            detected_media_type,
            stored_at: Utc::now(),
        };

        let object_path = self.object_path(path);
        if object_path.exists() {
            tracing::warn!("overwriting existing blob at {}", path);
        }

        Self::write_file(&object_path, &bytes)?;
        let yaml = serde_yaml::to_string(&metadata)?;
        Self::write_file(&self.metadata_path(path), yaml.as_bytes())?;

        tracing::info!(
            path = %path,
            size_bytes = metadata.size_bytes,
            content_type = %metadata.content_type,
            "stored blob"
        );

        Ok(StoredBlob {
            url: self.url_for(path),
            metadata,
        })
    }

    fn read(&self, path: &BlobPath) -> Result<(Vec<u8>, BlobMetadata), FilesError> {
        let object_path = self.object_path(path);
        if !object_path.is_file() {
            return Err(FilesError::NotFound(path.to_string()));
        }

        let bytes = fs::read(&object_path).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read file from {}: {}", object_path.display(), e),
            ))
        })?;

        let metadata = match fs::read_to_string(self.metadata_path(path)) {
            Ok(yaml) => serde_yaml::from_str(&yaml)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("blob {} has no metadata sidecar", path);
                let stored_at = fs::metadata(&object_path)?
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                let detected_media_type =
                    infer::get(&bytes).and_then(|kind| NonEmptyText::new(kind.mime_type()).ok());
                BlobMetadata {
                    path: path.as_str().to_owned(),
                    hash_algorithm: sha256_label(),
                    hash: hex::encode(Sha256::digest(&bytes)),
                    size_bytes: bytes.len() as u64,
                    content_type: detected_media_type
                        .clone()
                        .unwrap_or_else(default_content_type),
                    detected_media_type,
                    stored_at,
                }
            }
            Err(e) => return Err(FilesError::Io(e)),
        };

        Ok((bytes, metadata))
    }

    fn url_for(&self, path: &BlobPath) -> String {
        let mut url = self.public_base.clone();
        // The constructor rejects cannot-be-a-base URLs, so segments are always available.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(path.segments());
        }
        url.query_pairs_mut()
            .append_pair(TOKEN_QUERY_PARAM, &self.signer.sign(path));
        url.to_string()
    }

    fn verify_token(&self, path: &BlobPath, token: &str) -> bool {
        self.signer.verify(path, token)
    }
}

fn sha256_label() -> NonEmptyText {
    NonEmptyText::new("sha256").expect("sha256 is non-empty")
}

fn default_content_type() -> NonEmptyText {
    NonEmptyText::new(DEFAULT_CONTENT_TYPE).expect("default content type is non-empty")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PDF_BYTES: &[u8] = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n";

    fn signer() -> UrlSigner {
        UrlSigner::new("blob-secret").unwrap()
    }

    fn test_store(temp: &TempDir) -> FsBlobStore {
        FsBlobStore::new(temp.path(), "http://localhost:3000/blobs", signer()).unwrap()
    }

    #[test]
    fn test_new_rejects_missing_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("non-existent");

        let store = FsBlobStore::new(&root, "http://localhost:3000/blobs", signer());
        assert!(matches!(store, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("file.txt");
        fs::write(&root, "not a directory").unwrap();

        let store = FsBlobStore::new(&root, "http://localhost:3000/blobs", signer());
        assert!(matches!(store, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_new_rejects_non_base_url() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            FsBlobStore::new(temp.path(), "mailto:records@example.com", signer()),
            Err(FilesError::InvalidPublicUrl(_))
        ));
        assert!(matches!(
            FsBlobStore::new(temp.path(), "not a url", signer()),
            Err(FilesError::InvalidPublicUrl(_))
        ));
    }

    #[test]
    fn test_put_bytes_writes_object_and_metadata() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        let path = BlobPath::parse("Ward 3/report.pdf").unwrap();

        let stored = store
            .put(&path, BlobContent::Bytes(PDF_BYTES.to_vec()), None)
            .unwrap();

        assert_eq!(
            stored.url,
            format!(
                "http://localhost:3000/blobs/Ward%203/report.pdf?token={}",
                signer().sign(&path)
            )
        );
        assert_eq!(stored.metadata.size_bytes, PDF_BYTES.len() as u64);
        assert_eq!(stored.metadata.content_type.as_str(), "application/pdf");
        assert_eq!(stored.metadata.hash.len(), 64);

        let root = store.root_directory();
        assert!(root.join("objects").join("Ward 3").join("report.pdf").is_file());
        assert!(root
            .join("metadata")
            .join("Ward 3")
            .join("report.pdf.yaml")
            .is_file());
    }

    #[test]
    fn test_put_base64_decodes_content() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        let path = BlobPath::parse("notes.txt").unwrap();
        let encoded = general_purpose::STANDARD.encode("take with food");

        let stored = store
            .put(&path, BlobContent::Base64(encoded), Some("text/plain"))
            .unwrap();
        let (bytes, metadata) = store.read(&path).unwrap();

        assert_eq!(bytes, b"take with food");
        assert_eq!(metadata, stored.metadata);
        assert_eq!(metadata.content_type.as_str(), "text/plain");
    }

    #[test]
    fn test_put_data_url_uses_declared_type() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        let path = BlobPath::parse("scan").unwrap();
        let data_url = format!(
            "data:image/x-custom;base64,{}",
            general_purpose::STANDARD.encode([1u8, 2, 3])
        );

        let stored = store.put(&path, BlobContent::Base64(data_url), None).unwrap();
        assert_eq!(stored.metadata.content_type.as_str(), "image/x-custom");
        assert_eq!(stored.metadata.size_bytes, 3);
    }

    #[test]
    fn test_put_rejects_invalid_base64() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        let path = BlobPath::parse("broken.pdf").unwrap();

        let result = store.put(&path, BlobContent::Base64("***".into()), None);
        assert!(matches!(result, Err(FilesError::InvalidBase64(_))));
        assert!(matches!(store.read(&path), Err(FilesError::NotFound(_))));
    }

    #[test]
    fn test_put_unknown_bytes_defaults_content_type() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        let path = BlobPath::parse("blob").unwrap();

        let stored = store
            .put(&path, BlobContent::Bytes(vec![0, 1, 2, 3]), Some("  "))
            .unwrap();
        assert_eq!(stored.metadata.content_type.as_str(), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_put_overwrites_existing_path() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        let path = BlobPath::parse("Ward 3/report.txt").unwrap();

        store
            .put(&path, BlobContent::Bytes(b"first".to_vec()), Some("text/plain"))
            .unwrap();
        store
            .put(&path, BlobContent::Bytes(b"second".to_vec()), Some("text/plain"))
            .unwrap();

        let (bytes, metadata) = store.read(&path).unwrap();
        assert_eq!(bytes, b"second");
        assert_eq!(metadata.size_bytes, 6);
    }

    #[test]
    fn test_read_without_sidecar_falls_back_to_detection() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        let path = BlobPath::parse("legacy.pdf").unwrap();

        let object = store.root_directory().join("objects").join("legacy.pdf");
        fs::create_dir_all(object.parent().unwrap()).unwrap();
        fs::write(&object, PDF_BYTES).unwrap();

        let (bytes, metadata) = store.read(&path).unwrap();
        assert_eq!(bytes, PDF_BYTES);
        assert_eq!(metadata.content_type.as_str(), "application/pdf");
    }

    #[test]
    fn test_url_for_handles_trailing_slash_prefix() {
        let temp = TempDir::new().unwrap();
        let store =
            FsBlobStore::new(temp.path(), "https://records.example/blobs/", signer()).unwrap();
        let path = BlobPath::parse("General Hospital/x.pdf").unwrap();

        let url = store.url_for(&path);
        assert!(
            url.starts_with("https://records.example/blobs/General%20Hospital/x.pdf?token="),
            "{}",
            url
        );
    }

    #[test]
    fn test_url_token_verifies_for_its_path() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        let path = BlobPath::parse("Ward 3/report.pdf").unwrap();
        let other = BlobPath::parse("Ward 3/other.pdf").unwrap();

        let url = Url::parse(&store.url_for(&path)).unwrap();
        let token = url
            .query_pairs()
            .find(|(key, _)| key == TOKEN_QUERY_PARAM)
            .map(|(_, value)| value.into_owned())
            .unwrap();

        assert!(store.verify_token(&path, &token));
        assert!(!store.verify_token(&other, &token));
    }
}
