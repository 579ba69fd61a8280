//! # Hashing Utilities
//!
//! SHA-256 is the only hash the record layer uses. It produces the full
//! hash of a transaction, and both numeric identifiers in the ledger are
//! folded out of a SHA-256 digest:
//!
//! - a transaction id is the first 8 bytes of its full hash, read as a
//!   little-endian `u64`;
//! - an account id is the first 8 bytes of `SHA-256(public_key)`, read the
//!   same way.
//!
//! ## Full hash construction
//!
//! ```text
//! full_hash = SHA-256( unsigned_bytes || SHA-256(signature) )
//! ```
//!
//! `unsigned_bytes` is the wire encoding with the signature field zeroed.
//! Hashing the signature separately lets the full hash commit to it while
//! keeping the unsigned bytes stable across signing.

use sha2::{Digest, Sha256};

use crate::config::{HASH_LENGTH, SIGNATURE_LENGTH};

/// Compute the SHA-256 hash of the input data.
///
/// # Example
///
/// ```
/// use tessera_protocol::crypto::sha256;
///
/// let hash = sha256(b"tessera");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; HASH_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Fold a 32-byte digest into a ledger identifier.
///
/// Takes the first 8 bytes as a little-endian integer. Every id in the
/// ledger (transaction, account) is produced this way, so two values that
/// share a digest always share an id.
pub fn full_hash_to_id(hash: &[u8; HASH_LENGTH]) -> u64 {
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(prefix)
}

/// Derive the account id owning a public key.
pub fn account_id(public_key: &[u8]) -> u64 {
    full_hash_to_id(&sha256(public_key))
}

/// Compute a transaction full hash from its unsigned bytes and signature.
///
/// `signature` is `None` for transactions that have not been signed yet;
/// those hash an all-zero signature, so the value is still deterministic.
pub fn transaction_full_hash(
    unsigned_bytes: &[u8],
    signature: Option<&[u8; SIGNATURE_LENGTH]>,
) -> [u8; HASH_LENGTH] {
    let zero = [0u8; SIGNATURE_LENGTH];
    let signature_hash = sha256(signature.unwrap_or(&zero));

    let mut hasher = Sha256::new();
    hasher.update(unsigned_bytes);
    hasher.update(signature_hash);
    hasher.finalize().into()
}
