//! The `patients` document collection.
//!
//! Documents are addressed by [`IdentifierHash`] and stored one JSON file per patient:
//!
//! ```text
//! <patients_dir>/<h[0..2]>/<h[2..4]>/<h>/patient.json
//! ```
//!
//! Reads are point lookups and writes replace the whole document. A missing document is
//! reported as `Ok(None)`; any other read failure is an error, so callers can tell "no such
//! patient" apart from "the store is unavailable".

use crate::constants::PATIENT_JSON_FILENAME;
use crate::record::PatientRecord;
use crate::{PatientError, PatientResult};
use prs_identifier::IdentifierHash;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Keyed storage for patient record documents.
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Point lookup. `Ok(None)` means no document exists for `hash`.
    fn fetch(&self, hash: &IdentifierHash) -> PatientResult<Option<PatientRecord>>;

    /// Stores a new document.
    ///
    /// Fails with [`PatientError::RecordAlreadyExists`] if one is already stored under the
    /// record's hash.
    fn create(&self, record: &PatientRecord) -> PatientResult<()>;

    /// Writes the full document, replacing any existing one.
    fn write(&self, record: &PatientRecord) -> PatientResult<()>;
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// [`RecordStore`] backed by JSON files in a sharded directory tree.
#[derive(Debug, Clone)]
pub struct FsRecordStore {
    patients_dir: PathBuf,
}

impl FsRecordStore {
    /// Opens (creating if needed) the collection directory.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::StorageDirCreation`] if the directory cannot be created.
    pub fn new(patients_dir: impl Into<PathBuf>) -> PatientResult<Self> {
        let patients_dir = patients_dir.into();
        fs::create_dir_all(&patients_dir).map_err(PatientError::StorageDirCreation)?;
        Ok(Self { patients_dir })
    }

    pub fn patients_dir(&self) -> &Path {
        &self.patients_dir
    }

    /// Path of the JSON document for `hash`. The file may not exist.
    pub fn document_path(&self, hash: &IdentifierHash) -> PathBuf {
        hash.sharded_dir(&self.patients_dir)
            .join(PATIENT_JSON_FILENAME)
    }

    /// Serialises `record` into a temporary file next to its final location.
    fn stage(&self, record: &PatientRecord) -> PatientResult<(PathBuf, PathBuf)> {
        let json = record.render()?;
        let target = self.document_path(&record.identifier_hash);
        let Some(dir) = target.parent() else {
            return Err(PatientError::FileWrite(io::Error::other(
                "patient document has no parent directory",
            )));
        };
        fs::create_dir_all(dir).map_err(PatientError::PatientDirCreation)?;

        let temp = dir.join(format!(
            ".{}.{}.{}.tmp",
            PATIENT_JSON_FILENAME,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let mut file = fs::File::create(&temp).map_err(PatientError::FileWrite)?;
        let written = file
            .write_all(json.as_bytes())
            .and_then(|()| file.sync_all());
        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(PatientError::FileWrite(e));
        }

        Ok((temp, target))
    }
}

impl RecordStore for FsRecordStore {
    fn fetch(&self, hash: &IdentifierHash) -> PatientResult<Option<PatientRecord>> {
        let path = self.document_path(hash);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PatientError::FileRead(e)),
        };

        let record = PatientRecord::parse(&text)?;
        if &record.identifier_hash != hash {
            return Err(PatientError::Deserialization(format!(
                "document at {} carries identifier hash {}",
                path.display(),
                record.identifier_hash
            )));
        }
        Ok(Some(record))
    }

    fn create(&self, record: &PatientRecord) -> PatientResult<()> {
        let (temp, target) = self.stage(record)?;

        // hard_link refuses to replace an existing file, which makes create-if-absent atomic.
        let linked = fs::hard_link(&temp, &target);
        let _ = fs::remove_file(&temp);
        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(
                PatientError::RecordAlreadyExists(record.identifier_hash.clone()),
            ),
            Err(e) => Err(PatientError::FileWrite(e)),
        }
    }

    fn write(&self, record: &PatientRecord) -> PatientResult<()> {
        let (temp, target) = self.stage(record)?;
        if let Err(e) = fs::rename(&temp, &target) {
            let _ = fs::remove_file(&temp);
            return Err(PatientError::FileWrite(e));
        }
        Ok(())
    }
}
