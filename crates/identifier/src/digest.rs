//! Internal implementation of identifier hashing.

use crate::{IdentifierError, IdentifierResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// A raw national ID number.
///
/// The value is kept byte for byte and hashed as given, so `" 123"` and `"123"` are different
/// identifiers. It must not be blank; no other format validation (length, checksum) is
/// applied. Input typed into a form goes through [`NationalId::from_entry`], which strips
/// surrounding whitespace first.
///
/// `Debug` output is redacted so raw identifiers do not end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct NationalId(String);

impl NationalId {
    /// Wraps a raw identifier exactly as given.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::EmptyNationalId`] if the input is empty or only whitespace.
    pub fn new(raw: impl AsRef<str>) -> IdentifierResult<Self> {
        let raw = raw.as_ref();
        if raw.trim().is_empty() {
            return Err(IdentifierError::EmptyNationalId);
        }
        Ok(Self(raw.to_owned()))
    }

    /// Wraps an identifier typed by staff, stripping surrounding whitespace.
    pub fn from_entry(entry: impl AsRef<str>) -> IdentifierResult<Self> {
        Self::new(entry.as_ref().trim())
    }

    /// Hashes this identifier into its storage key.
    pub fn hash(&self) -> IdentifierHash {
        hash_identifier(self)
    }
}

impl fmt::Debug for NationalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NationalId(<redacted>)")
    }
}

impl FromStr for NationalId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NationalId::new(s)
    }
}

/// Applies SHA-256 to the identifier's UTF-8 bytes and returns the digest.
///
/// Pure and deterministic: the same identifier always yields the same hash. There is no
/// salt, so a given national ID maps to exactly one record.
pub fn hash_identifier(id: &NationalId) -> IdentifierHash {
    let digest = Sha256::digest(id.0.as_bytes());
    IdentifierHash(hex::encode(digest))
}

/// SHA-256 digest of a national ID, in canonical form (64 lowercase hex characters).
///
/// # Construction
/// - [`hash_identifier`] / [`NationalId::hash`] derive the digest from a raw identifier.
/// - [`IdentifierHash::parse`] validates an externally supplied digest.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentifierHash(String);

impl IdentifierHash {
    /// Length of a canonical hex-encoded SHA-256 digest.
    pub const LEN: usize = 64;

    /// Validates a digest string that must already be in canonical form.
    ///
    /// Uppercase hex is rejected rather than normalised, so each record has exactly one
    /// textual key.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidHash`] if `input` is not canonical.
    pub fn parse(input: &str) -> IdentifierResult<Self> {
        if Self::is_canonical(input) {
            return Ok(Self(input.to_owned()));
        }
        Err(IdentifierError::InvalidHash(format!(
            "identifier hash must be {} lowercase hex characters, got {} characters",
            Self::LEN,
            input.len()
        )))
    }

    /// Returns true if `input` is 64 lowercase hex characters.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == Self::LEN
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `parent_dir/<s1>/<s2>/<hash>/` where `s1`/`s2` are the first four hex
    /// characters of the digest.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let s1 = &self.0[0..2];
        let s2 = &self.0[2..4];
        parent_dir.join(s1).join(s2).join(&self.0)
    }
}

impl fmt::Display for IdentifierHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdentifierHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for IdentifierHash {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IdentifierHash::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for IdentifierHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for IdentifierHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        IdentifierHash::parse(&s).map_err(serde::de::Error::custom)
    }
}
