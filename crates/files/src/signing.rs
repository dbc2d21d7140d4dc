//! Capability tokens for blob URLs.
//!
//! A blob URL carries `?token=<hex HMAC-SHA256 of the blob path>`. Anyone holding the URL can
//! read that one blob; the token cannot be reused for another path, and forging one requires
//! the signing key.

use crate::{BlobPath, FilesError};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies blob path tokens with a shared secret.
#[derive(Clone)]
pub struct UrlSigner {
    key: Vec<u8>,
}

impl UrlSigner {
    /// Creates a signer from a secret key.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidSigningKey`] if the key is empty.
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self, FilesError> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(FilesError::InvalidSigningKey);
        }
        Ok(Self { key: key.to_vec() })
    }

    fn mac(&self, path: &BlobPath) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(path.as_str().as_bytes());
        mac
    }

    /// Returns the hex token for `path`.
    pub fn sign(&self, path: &BlobPath) -> String {
        hex::encode(self.mac(path).finalize().into_bytes())
    }

    /// Checks `token` against `path` in constant time.
    pub fn verify(&self, path: &BlobPath, token: &str) -> bool {
        match hex::decode(token.trim()) {
            Ok(bytes) => self.mac(path).verify_slice(&bytes).is_ok(),
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner").finish_non_exhaustive()
    }
}
