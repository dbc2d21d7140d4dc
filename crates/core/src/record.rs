//! The patient record document.
//!
//! One [`PatientRecord`] exists per patient, keyed by the [`IdentifierHash`] of their national
//! ID. Field names are camelCase on the wire so that documents written by other clients of
//! the `patients` collection read back unchanged.

use crate::{PatientError, PatientResult};
use prs_identifier::IdentifierHash;
use prs_types::TextList;
use serde::{Deserialize, Serialize};

/// A patient's mutable record document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    /// Primary key: SHA-256 of the patient's national ID.
    pub identifier_hash: IdentifierHash,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,

    #[serde(default)]
    pub past_diseases: TextList,
    #[serde(default)]
    pub allergies: TextList,
    #[serde(default)]
    pub ongoing_medication: TextList,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vitals: Option<Vitals>,

    /// Append-only list of documents and events.
    #[serde(default)]
    pub file_records: Vec<FileRecord>,

    #[serde(default)]
    pub upcoming_appointments: Vec<Appointment>,
}

impl PatientRecord {
    /// An empty record for `identifier_hash`.
    pub fn empty(identifier_hash: IdentifierHash) -> Self {
        Self {
            identifier_hash,
            name: None,
            email: None,
            age: None,
            city: None,
            date_of_birth: None,
            mobile_number: None,
            blood_type: None,
            past_diseases: TextList::default(),
            allergies: TextList::default(),
            ongoing_medication: TextList::default(),
            vitals: None,
            file_records: Vec::new(),
            upcoming_appointments: Vec::new(),
        }
    }

    /// Parse a patient record from JSON text.
    ///
    /// This uses `serde_path_to_error` to surface a best-effort "path" (e.g.
    /// `fileRecords[2].url`) to the failing field when the document does not match.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::Deserialization`] if the JSON is malformed or does not
    /// represent a patient record.
    pub fn parse(json_text: &str) -> PatientResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);

        match serde_path_to_error::deserialize::<_, PatientRecord>(&mut deserializer) {
            Ok(record) => Ok(record),
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                Err(PatientError::Deserialization(format!(
                    "patient record schema mismatch at {path}: {source}"
                )))
            }
        }
    }

    /// Render the record as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::Serialization`] if serialisation fails.
    pub fn render(&self) -> PatientResult<String> {
        serde_json::to_string_pretty(self).map_err(PatientError::Serialization)
    }

    /// URLs of every file record, in the order they were appended.
    pub fn document_urls(&self) -> Vec<String> {
        self.file_records.iter().map(|r| r.url.clone()).collect()
    }
}

/// A pointer to a stored document plus who produced it and when.
///
/// No field is validated here; `type` is a free-text label such as
/// `Prescription_1704067200000_Dr. A` or `LabReport`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub doctor: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub date: String,
}

impl FileRecord {
    pub fn new(
        url: impl Into<String>,
        doctor: impl Into<String>,
        kind: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            doctor: doctor.into(),
            kind: kind.into(),
            date: date.into(),
        }
    }
}

/// A scheduled follow-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(default)]
    pub doctor: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub next_step: String,
}

/// Vital signs captured at intake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oxygen_saturation: Option<String>,
}

impl Vitals {
    pub fn is_empty(&self) -> bool {
        self.blood_pressure.is_none()
            && self.heart_rate.is_none()
            && self.respiratory_rate.is_none()
            && self.temperature.is_none()
            && self.oxygen_saturation.is_none()
    }
}
