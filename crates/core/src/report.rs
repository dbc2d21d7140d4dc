//! Report uploads (lab reports, scans and other documents).

use crate::NonEmptyText;
use crate::{PatientError, PatientResult};
use prs_files::BlobContent;

/// A document to upload and attach to a patient.
#[derive(Debug, Clone)]
pub struct ReportUpload {
    /// Free-text label such as `LabReport` or `X-Ray`; also used in the blob path.
    pub report_type: String,
    pub date: String,
    /// Attributed doctor; defaults to the acting staff member when blank.
    pub doctor: Option<String>,
    pub content: BlobContent,
    pub content_type: Option<String>,
    /// Extension for the stored blob, e.g. `pdf`.
    pub file_extension: Option<String>,
}

/// Required fields of a validated upload.
pub(crate) struct ValidatedReport {
    pub report_type: NonEmptyText,
    pub date: NonEmptyText,
    pub doctor: Option<NonEmptyText>,
}

impl ReportUpload {
    /// Checks the fields the upload dialog requires: type, date and content.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::InvalidInput`] naming every missing field.
    pub(crate) fn validate(&self) -> PatientResult<ValidatedReport> {
        let report_type = NonEmptyText::optional(Some(&self.report_type));
        let date = NonEmptyText::optional(Some(&self.date));
        let has_content = match &self.content {
            BlobContent::Bytes(bytes) => !bytes.is_empty(),
            BlobContent::Base64(text) => !text.trim().is_empty(),
        };

        match (report_type, date, has_content) {
            (Some(report_type), Some(date), true) => Ok(ValidatedReport {
                report_type,
                date,
                doctor: NonEmptyText::optional(self.doctor.as_deref()),
            }),
            (report_type, date, has_content) => {
                let missing: Vec<&str> = [
                    report_type.is_none().then_some("type"),
                    date.is_none().then_some("date"),
                    (!has_content).then_some("content"),
                ]
                .into_iter()
                .flatten()
                .collect();
                Err(PatientError::InvalidInput(format!(
                    "report is missing required fields: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}
