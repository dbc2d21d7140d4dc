use prs_files::FilesError;
use prs_identifier::{IdentifierError, IdentifierHash};
use prs_summary::SummaryError;
use prs_types::TextError;

/// Broad failure classes reported to callers.
///
/// Every [`PatientError`] maps onto exactly one kind, which is what the presentation layer
/// (REST status codes, CLI messages) switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The addressed record or blob does not exist.
    NotFound,
    /// A record already exists for this identifier.
    Conflict,
    /// The caller may not read the addressed blob.
    Forbidden,
    /// Required input is missing or malformed.
    ValidationFailure,
    /// The record store, blob store or summarisation service failed.
    NetworkFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid text: {0}")]
    Text(#[from] TextError),
    #[error("invalid identifier: {0}")]
    Identifier(#[from] IdentifierError),

    #[error("no patient record found for {0}")]
    RecordNotFound(IdentifierHash),
    #[error("a patient record already exists for {0}")]
    RecordAlreadyExists(IdentifierHash),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create patient directory: {0}")]
    PatientDirCreation(std::io::Error),
    #[error("failed to write patient file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read patient file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize patient: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize patient: {0}")]
    Deserialization(String),

    #[error("blob storage error: {0}")]
    Files(#[from] FilesError),

    #[error("blob token is not valid for {0}")]
    BlobAccessDenied(String),

    #[error("summarisation service is not configured")]
    SummariesDisabled,
    #[error("{0}")]
    Summary(#[from] SummaryError),
}

impl PatientError {
    /// Classifies this error for presentation.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PatientError::InvalidInput(_)
            | PatientError::Text(_)
            | PatientError::Identifier(_)
            | PatientError::Files(FilesError::InvalidPath(_))
            | PatientError::Files(FilesError::InvalidBase64(_)) => ErrorKind::ValidationFailure,

            PatientError::RecordNotFound(_) | PatientError::Files(FilesError::NotFound(_)) => {
                ErrorKind::NotFound
            }

            PatientError::RecordAlreadyExists(_) => ErrorKind::Conflict,

            PatientError::BlobAccessDenied(_) => ErrorKind::Forbidden,

            PatientError::StorageDirCreation(_)
            | PatientError::PatientDirCreation(_)
            | PatientError::FileWrite(_)
            | PatientError::FileRead(_)
            | PatientError::Serialization(_)
            | PatientError::Deserialization(_)
            | PatientError::Files(_)
            | PatientError::SummariesDisabled
            | PatientError::Summary(_) => ErrorKind::NetworkFailure,
        }
    }
}

pub type PatientResult<T> = std::result::Result<T, PatientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let hash = prs_identifier::NationalId::new("123456789012").unwrap().hash();

        assert_eq!(
            PatientError::RecordNotFound(hash.clone()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            PatientError::RecordAlreadyExists(hash).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            PatientError::BlobAccessDenied("Ward 3/x.pdf".into()).kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            PatientError::InvalidInput("missing date".into()).kind(),
            ErrorKind::ValidationFailure
        );
        assert_eq!(
            PatientError::Files(FilesError::InvalidPath("..".into())).kind(),
            ErrorKind::ValidationFailure
        );
        assert_eq!(
            PatientError::FileRead(std::io::Error::other("disk unavailable")).kind(),
            ErrorKind::NetworkFailure
        );
        assert_eq!(
            PatientError::Summary(SummaryError::Connection {
                url: "http://127.0.0.1:1".into(),
                message: "connection refused".into(),
            })
            .kind(),
            ErrorKind::NetworkFailure
        );
    }
}
