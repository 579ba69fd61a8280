//! Error types for transaction parsing and construction.
//!
//! Every failure on the path from bytes (or a stored row) to a
//! [`Transaction`](super::Transaction) is a [`ValidationError`]. Whether it
//! is recoverable depends on where the bytes came from: a rejection of
//! network input is routine, the same error raised while reading the
//! ledger's own store means the store is corrupt. The storage layer makes
//! that promotion; this enum does not know the origin.

use thiserror::Error;

use super::types::TransactionType;

/// Structural validation failures raised by the codec and the builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No handler is registered for the `(type, subtype)` pair.
    #[error("unknown transaction type {type_byte}:{subtype}")]
    UnknownTransactionType {
        /// Major type byte as found in the input.
        type_byte: u8,
        /// Subtype nibble as found in the input.
        subtype: u8,
    },

    /// The byte cursor ran short, a length field disagreed with the bytes
    /// available, or bytes were left over after the last component.
    #[error("malformed attachment: {0}")]
    MalformedAttachment(String),

    /// The transaction type requires a recipient and none was given.
    #[error("transaction type {0} requires a recipient")]
    MissingRecipient(TransactionType),

    /// The transaction type takes no recipient but one was given.
    #[error("transaction type {0} does not take a recipient")]
    UnexpectedRecipient(TransactionType),

    /// Exactly one of EC block height and EC block id is present.
    #[error("EC block height and id must be both present or both absent")]
    InconsistentEcBlock,

    /// A mandatory builder field was never set.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The transaction version is newer than this codec understands.
    #[error("unsupported transaction version {0}")]
    UnsupportedVersion(u8),

    /// A field is outside its permitted range.
    #[error("invalid transaction parameters: {0}")]
    NotValid(String),

    /// A supplied id disagrees with the id derived from the full hash.
    #[error("transaction id mismatch: derived {derived}, supplied {supplied}")]
    IdMismatch {
        /// Id folded out of the full hash.
        derived: u64,
        /// Id that was supplied to the builder.
        supplied: u64,
    },

    /// A supplied full hash disagrees with the hash of the transaction bytes.
    #[error("full hash mismatch: derived {derived}, supplied {supplied}")]
    FullHashMismatch {
        /// Hex of the hash computed from the transaction bytes.
        derived: String,
        /// Hex of the hash that was supplied to the builder.
        supplied: String,
    },

    /// A supplied sender id disagrees with the sender public key.
    #[error("sender id mismatch: derived {derived}, supplied {supplied}")]
    SenderMismatch {
        /// Id derived from the sender public key.
        derived: u64,
        /// Id that was supplied to the builder.
        supplied: u64,
    },
}

impl ValidationError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedAttachment(reason.into())
    }

    pub(crate) fn not_valid(reason: impl Into<String>) -> Self {
        Self::NotValid(reason.into())
    }
}
