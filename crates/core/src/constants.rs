//! Constants used throughout the PRS core crate.

/// Default directory for patient data storage when no explicit directory is configured.
pub const DEFAULT_PATIENT_DATA_DIR: &str = "patient_data";

/// Name of the document collection holding one record per patient.
pub const PATIENTS_COLLECTION: &str = "patients";

/// Directory (under the patient data directory) used for blobs when none is configured.
pub const DEFAULT_BLOB_DIR_NAME: &str = "blobs";

/// Default URL prefix for blob URLs, matching the REST server's `/blobs` route.
pub const DEFAULT_PUBLIC_BLOB_URL: &str = "http://localhost:3000/blobs";

/// Facility used for blob paths when a session does not name one.
pub const DEFAULT_FACILITY: &str = "General Hospital";

/// Filename for patient JSON documents.
pub const PATIENT_JSON_FILENAME: &str = "patient.json";

/// Label used in blob paths for prescription documents.
pub const PRESCRIPTION_LABEL: &str = "Prescription";

/// Content type of rendered prescription documents.
pub const PRESCRIPTION_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";
