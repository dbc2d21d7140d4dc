//! Patient identifier hashing and sharded-path utilities.
//!
//! PRS never uses a patient's national ID number as a storage key. Instead every record is
//! keyed by the SHA-256 digest of the national ID, rendered as **64 lowercase hexadecimal
//! characters**.
//!
//! Two types keep the hashing boundary explicit:
//! - [`NationalId`]: the raw, human-entered identifier. It can be hashed and nothing else.
//! - [`IdentifierHash`]: the storage key. It is produced by hashing a [`NationalId`] or by
//!   parsing an already-canonical digest (for example, from a URL path segment).
//!
//! Because the store only accepts an [`IdentifierHash`] and only a [`NationalId`] can be
//! hashed, a digest can never be hashed a second time and a raw identifier can never be used
//! as a key by mistake.
//!
//! ## Sharded directory layout
//! For a digest `h`, documents live under:
//! `parent_dir/<h[0..2]>/<h[2..4]>/<h>/`
//!
//! Example:
//! `patient_data/patients/2a/33/2a33349e7e606a8ad2e30e3c84521f9377450cf09083e162e0a9b1480ce0f972/`

mod digest;

pub use digest::{hash_identifier, IdentifierHash, NationalId};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentifierError {
    /// The raw national ID was empty or only whitespace.
    #[error("national ID cannot be empty")]
    EmptyNationalId,

    /// A supplied digest was not in canonical form.
    #[error("Invalid identifier hash: {0}")]
    InvalidHash(String),
}

/// Result type for identifier operations.
pub type IdentifierResult<T> = Result<T, IdentifierError>;
