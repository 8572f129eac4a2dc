//! Result sealing: serialize the finalized result set and encrypt it.
//!
//! Each seal generates a fresh Fernet key (AES-128-CBC + HMAC-SHA256,
//! url-safe base64). The key lives only in the returned [`SealedResult`];
//! persisting it is the caller's job.

use fernet::Fernet;
use sha2::{Digest, Sha256};

use crate::error::{PipelineError, Result};
use crate::result::{ResultCell, ResultSet};

/// Symmetric key for one sealed result. `Debug` never prints the key.
#[derive(Clone, PartialEq, Eq)]
pub struct SealKey(String);

impl SealKey {
    fn generate() -> Self {
        Self(Fernet::generate_key())
    }

    /// The key in its url-safe base64 form.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SealKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealKey(<redacted>)")
    }
}

/// Ciphertext of a serialized result set plus the key that opens it.
#[derive(Debug, Clone)]
pub struct SealedResult {
    key: SealKey,
    ciphertext: Vec<u8>,
    plaintext_len: usize,
    rows: usize,
    chunks: usize,
}

impl SealedResult {
    pub fn key(&self) -> &SealKey {
        &self.key
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn into_ciphertext(self) -> Vec<u8> {
        self.ciphertext
    }

    pub fn plaintext_len(&self) -> usize {
        self.plaintext_len
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// SHA-256 of the ciphertext, hex encoded.
    pub fn fingerprint(&self) -> String {
        hex_encode(&Sha256::digest(&self.ciphertext))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResultSealer;

impl ResultSealer {
    pub fn new() -> Self {
        Self
    }

    /// Take the finalized set out of `cell` and seal it.
    ///
    /// Fails with [`PipelineError::ResultNotReady`] if the worker has not
    /// published its result yet.
    pub fn seal(&self, cell: &ResultCell) -> Result<SealedResult> {
        let set = cell.take()?;
        self.seal_set(&set)
    }

    /// Serialize `set` as CSV and encrypt it under a new key.
    pub fn seal_set(&self, set: &ResultSet) -> Result<SealedResult> {
        let key = SealKey::generate();
        let cipher = Fernet::new(key.expose())
            .ok_or_else(|| PipelineError::Seal("generated key was rejected".into()))?;

        let plaintext = set.to_csv();
        let token = cipher.encrypt(&plaintext);

        Ok(SealedResult {
            key,
            ciphertext: token.into_bytes(),
            plaintext_len: plaintext.len(),
            rows: set.row_count(),
            chunks: set.chunk_count(),
        })
    }
}

/// Decrypt a sealed payload back to the serialized CSV bytes.
pub fn unseal(key: &str, sealed: &[u8]) -> Result<Vec<u8>> {
    let cipher =
        Fernet::new(key.trim()).ok_or_else(|| PipelineError::Seal("malformed key".into()))?;
    let token = std::str::from_utf8(sealed)
        .map_err(|_| PipelineError::Seal("sealed payload is not a Fernet token".into()))?;
    cipher
        .decrypt(token.trim())
        .map_err(|e| PipelineError::Seal(format!("decryption failed: {e}")))
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}
