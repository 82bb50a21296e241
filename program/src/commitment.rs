//! Secret commitments.
//!
//! A sender publishes the SHA-256 digest of a secret when locking funds and
//! the secret itself is only revealed at redemption. Hashing is always over
//! the raw secret bytes, never over a hex or base58 re-encoding of them.

use std::convert::TryFrom;

use solana_program::hash::{hash, HASH_BYTES};

use crate::error::EscrowError;

/// Length of a secret digest in bytes.
pub const DIGEST_LEN: usize = HASH_BYTES;

/// SHA-256 commitment to an escrow secret.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SecretDigest([u8; DIGEST_LEN]);

impl SecretDigest {
    pub const fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(self) -> [u8; DIGEST_LEN] {
        self.0
    }

    /// Returns true iff `secret` hashes to this digest.
    ///
    /// Every byte is compared, there is no early exit on the first
    /// differing byte.
    pub fn verify(&self, secret: &[u8]) -> bool {
        let candidate = commit(secret);
        self.0
            .iter()
            .zip(candidate.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl AsRef<[u8]> for SecretDigest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for SecretDigest {
    type Error = EscrowError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != DIGEST_LEN {
            return Err(EscrowError::InvalidDigestLength);
        }
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(bytes);
        Ok(Self(digest))
    }
}

/// Commits to `secret` by hashing its raw bytes with SHA-256.
pub fn commit(secret: &[u8]) -> SecretDigest {
    SecretDigest(hash(secret).to_bytes())
}
