//! # PRS Core
//!
//! Core business logic for the Patient Record Store.
//!
//! This crate contains pure data operations over the `patients` document collection and the
//! blob store:
//! - Identifier hashing and point lookup of patient records
//! - Intake of new patients
//! - Append-only file records (reports, prescriptions, manually added documents)
//! - Blob uploads with generated, facility-prefixed paths
//! - Summary requests to the external summarisation service
//!
//! **No API concerns**: Authentication and HTTP servers belong in `api-rest` or `api-shared`.

pub mod config;
pub mod constants;
pub mod error;
pub mod intake;
pub mod patient;
pub mod prescription;
pub mod record;
pub mod report;
pub mod session;
pub mod store;
pub mod validation;

pub use config::{resolve_core_config, CoreConfig};
pub use error::{ErrorKind, PatientError, PatientResult};
pub use intake::IntakeForm;
pub use patient::PatientRecordService;
pub use prescription::{BloodGroup, Medication, Prescription};
pub use record::{Appointment, FileRecord, PatientRecord, Vitals};
pub use report::ReportUpload;
pub use session::StaffSession;
pub use store::{FsRecordStore, RecordStore};

pub use prs_files::{BlobContent, BlobMetadata, BlobPath, StoredBlob};
pub use prs_identifier::{hash_identifier, IdentifierHash, NationalId};
pub use prs_summary::SummaryError;
pub use prs_types::{NonEmptyText, TextError, TextList};
