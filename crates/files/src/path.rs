//! Validated blob paths.

use crate::constants::MAX_PATH_LEN;
use crate::FilesError;
use chrono::{DateTime, Utc};
use prs_identifier::IdentifierHash;
use prs_types::NonEmptyText;
use std::fmt;
use std::path::{Path, PathBuf};

/// File extensions that are never accepted into the blob store.
const FORBIDDEN_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", // cspell:ignore dylib
    "sh", "bash", "zsh", "bat", "cmd", "ps1", "app", "bin", "run",
];

/// A relative, `/`-separated path inside the blob store.
///
/// Guarantees:
/// - not empty, not absolute, at most 1024 bytes
/// - every segment is non-empty and is neither `.` nor `..`
/// - no backslashes or control characters
/// - the final segment does not carry an executable extension
///
/// Spaces are allowed (facility names such as `Sasoon Pune` are used as folders).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlobPath(String);

impl BlobPath {
    /// Validates a caller-supplied blob path.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidPath`] if any guarantee above does not hold.
    pub fn parse(input: &str) -> Result<Self, FilesError> {
        if input.is_empty() {
            return Err(FilesError::InvalidPath("path cannot be empty".into()));
        }
        if input.len() > MAX_PATH_LEN {
            return Err(FilesError::InvalidPath(format!(
                "path exceeds maximum length of {} bytes",
                MAX_PATH_LEN
            )));
        }
        if input.starts_with('/') {
            return Err(FilesError::InvalidPath("path must be relative".into()));
        }
        if input.contains('\\') || input.chars().any(char::is_control) {
            return Err(FilesError::InvalidPath(
                "path contains backslashes or control characters".into(),
            ));
        }

        for segment in input.split('/') {
            if segment.trim().is_empty() {
                return Err(FilesError::InvalidPath(format!(
                    "path contains an empty segment: '{}'",
                    input
                )));
            }
            if segment == "." || segment == ".." {
                return Err(FilesError::InvalidPath(format!(
                    "path traversal is not allowed: '{}'",
                    input
                )));
            }
        }

        if let Some(ext) = Path::new(input).extension().and_then(|e| e.to_str()) {
            let ext = ext.to_ascii_lowercase();
            if FORBIDDEN_EXTENSIONS.contains(&ext.as_str()) {
                return Err(FilesError::InvalidPath(format!(
                    "files with extension '.{}' cannot be stored",
                    ext
                )));
            }
        }

        Ok(Self(input.to_owned()))
    }

    /// Builds the conventional upload path `<facility>/<label>_<hash>_<millis>[.<ext>]`.
    ///
    /// `/` and `\` inside the facility or label are replaced by `_` so each always forms a
    /// single segment. The millisecond timestamp makes the path unique per upload; two
    /// uploads within the same millisecond for the same label and patient overwrite each
    /// other.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidPath`] if the resulting path is not valid (for example,
    /// a forbidden extension).
    pub fn for_record(
        facility: &NonEmptyText,
        label: &str,
        hash: &IdentifierHash,
        at: DateTime<Utc>,
        extension: Option<&str>,
    ) -> Result<Self, FilesError> {
        let facility = single_segment(facility.as_str());
        let label = match single_segment(label) {
            l if l.is_empty() => "Document".to_string(),
            l => l,
        };

        let mut path = format!(
            "{}/{}_{}_{}",
            facility,
            label,
            hash,
            at.timestamp_millis()
        );
        if let Some(ext) = extension.map(str::trim).filter(|e| !e.is_empty()) {
            path.push('.');
            path.push_str(ext.trim_start_matches('.'));
        }

        Self::parse(&path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the `/`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Joins this path onto a filesystem directory, segment by segment.
    pub(crate) fn under(&self, dir: &Path) -> PathBuf {
        self.segments().fold(dir.to_path_buf(), |acc, s| acc.join(s))
    }
}

impl fmt::Display for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn single_segment(input: &str) -> String {
    input.trim().replace(['/', '\\'], "_")
}
