//! # Cryptographic Primitives
//!
//! Hashing and identifier derivation for the record layer. Signature
//! verification belongs to the consensus engine and is not performed here;
//! this module only needs to turn bytes into stable digests and ids.

pub mod hash;

pub use hash::{account_id, full_hash_to_id, sha256, transaction_full_hash};
