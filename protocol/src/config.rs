//! # Protocol Configuration & Constants
//!
//! Every fixed size and bound used by the transaction record layer lives
//! here. The wire codec, the builder checks and the store all read from
//! this module so that a layout change is a one-line edit, not a hunt.
//!
//! These values are consensus-relevant: two nodes that disagree on any of
//! them will compute different full hashes for the same transaction.

// ---------------------------------------------------------------------------
// Transaction Versions
// ---------------------------------------------------------------------------

/// The version new transactions are built with.
pub const CURRENT_TRANSACTION_VERSION: u8 = 1;

/// Highest transaction version the codec understands.
pub const MAX_TRANSACTION_VERSION: u8 = 1;

/// Appendage version written in front of every non-empty appendage of a
/// version >= 1 transaction.
pub const APPENDIX_VERSION: u8 = 1;

// ---------------------------------------------------------------------------
// Fixed Field Lengths
// ---------------------------------------------------------------------------

/// Sender public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Transaction signature length in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// SHA-256 output length; also the full hash length.
pub const HASH_LENGTH: usize = 32;

/// Nonce appended to every non-empty encrypted payload.
pub const ENCRYPTION_NONCE_LENGTH: usize = 32;

/// Header length of a version 0 transaction (no flags, no EC binding).
pub const TRANSACTION_HEADER_LENGTH_V0: usize =
    1 + 1 + 4 + 2 + PUBLIC_KEY_LENGTH + 8 + 8 + 8 + HASH_LENGTH + SIGNATURE_LENGTH;

/// Header length of a version >= 1 transaction: v0 plus flags (4),
/// EC block height (4) and EC block id (8).
pub const TRANSACTION_HEADER_LENGTH: usize = TRANSACTION_HEADER_LENGTH_V0 + 4 + 4 + 8;

/// Byte offset of the signature inside the serialized header.
pub const SIGNATURE_OFFSET: usize = 1 + 1 + 4 + 2 + PUBLIC_KEY_LENGTH + 8 + 8 + 8 + HASH_LENGTH;

// ---------------------------------------------------------------------------
// Monetary Bounds
// ---------------------------------------------------------------------------

/// Minor units per whole coin.
pub const ONE_COIN: i64 = 100_000_000;

/// Total supply in whole coins.
pub const MAX_BALANCE_COINS: i64 = 1_000_000_000;

/// Upper bound for any amount or fee, in minor units.
pub const MAX_BALANCE: i64 = MAX_BALANCE_COINS * ONE_COIN;

// ---------------------------------------------------------------------------
// Appendage & Attachment Limits
// ---------------------------------------------------------------------------

/// Maximum plain message payload.
pub const MAX_ARBITRARY_MESSAGE_LENGTH: usize = 1000;

/// Maximum ciphertext length of an encrypted message (nonce excluded).
pub const MAX_ENCRYPTED_MESSAGE_LENGTH: usize = 1000;

/// Maximum alias name length in bytes.
pub const MAX_ALIAS_LENGTH: usize = 100;

/// Maximum alias URI length in bytes.
pub const MAX_ALIAS_URI_LENGTH: usize = 1000;

/// Maximum account name length in bytes.
pub const MAX_ACCOUNT_NAME_LENGTH: usize = 100;

/// Maximum account description length in bytes.
pub const MAX_ACCOUNT_DESCRIPTION_LENGTH: usize = 1000;

/// Maximum comment on a version 0 asset transfer.
pub const MAX_ASSET_TRANSFER_COMMENT_LENGTH: usize = 1000;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Deadline applied when the builder is not given one, in minutes.
pub const DEFAULT_DEADLINE_MINUTES: u16 = 1440;

/// Start of the ledger epoch, 2013-11-24T12:00:00Z, in Unix milliseconds.
/// Transaction and block timestamps count seconds from this instant.
pub const EPOCH_BEGINNING_MS: i64 = 1_385_294_400_000;
