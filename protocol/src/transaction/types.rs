//! Core type definitions for ledger transactions.
//!
//! Fixed-size byte values ([`FullHash`], [`PublicKey`], [`Signature`]) get
//! their own newtypes so a 32-byte key can never be passed where a 32-byte
//! hash is expected. All of them print and parse as lowercase hex, which
//! is how external callers (API layer, CLI) address them.
//!
//! [`TransactionType`] is the attachment type registry: a closed set of
//! kinds, each keyed by its `(type, subtype)` byte pair and carrying its
//! own recipient rule and attachment parser.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::attachment::Attachment;
use super::codec::ByteReader;
use super::error::ValidationError;
use crate::config::{HASH_LENGTH, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

// ---------------------------------------------------------------------------
// Hex helpers
// ---------------------------------------------------------------------------

/// Error returned when parsing a hash, key or signature from hex.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HashParseError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Serialize any byte container as a lowercase hex string.
pub(crate) fn serialize_hex<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<[u8]>,
{
    serializer.serialize_str(&hex::encode(bytes))
}

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Byte length of this value.
            pub const LEN: usize = $len;

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Returns `true` when every byte is zero; the wire format uses
            /// that pattern for "absent".
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Build from a slice, returning `None` on a length mismatch.
            pub fn from_slice(bytes: &[u8]) -> Option<Self> {
                <[u8; $len]>::try_from(bytes).ok().map(Self)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = HashParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut out = [0u8; $len];
                hex::decode_to_slice(s.trim(), &mut out)?;
                Ok(Self(out))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serialize_hex(&self.0, serializer)
            }
        }
    };
}

fixed_bytes!(
    /// SHA-256 content digest identifying a transaction. The canonical
    /// lookup key; the numeric id is folded out of it.
    FullHash,
    HASH_LENGTH
);

fixed_bytes!(
    /// Account public key.
    PublicKey,
    PUBLIC_KEY_LENGTH
);

fixed_bytes!(
    /// Transaction signature.
    Signature,
    SIGNATURE_LENGTH
);

impl FullHash {
    /// The numeric transaction id this hash maps to.
    pub fn to_id(&self) -> u64 {
        crate::crypto::full_hash_to_id(&self.0)
    }
}

impl PublicKey {
    /// The account id owning this key.
    pub fn account_id(&self) -> u64 {
        crate::crypto::account_id(&self.0)
    }
}

// ---------------------------------------------------------------------------
// TransactionType
// ---------------------------------------------------------------------------

/// Registered transaction kinds, keyed by `(type, subtype)`.
///
/// The set is closed and fixed at compile time: looking up a pair that is
/// not listed in [`TransactionType::ALL`] is always a hard
/// [`ValidationError::UnknownTransactionType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Plain value transfer.
    OrdinaryPayment,
    /// Data-only transaction; the payload travels in a message appendage.
    ArbitraryMessage,
    /// Assign a URI to an alias name.
    AliasAssignment,
    /// Set the sender's account name and description.
    AccountInfo,
    /// Move units of an asset to the recipient.
    AssetTransfer,
    /// Lease the sender's forging balance to the recipient.
    EffectiveBalanceLeasing,
}

impl TransactionType {
    /// The registry. Lookup walks this table.
    pub const ALL: [TransactionType; 6] = [
        TransactionType::OrdinaryPayment,
        TransactionType::ArbitraryMessage,
        TransactionType::AliasAssignment,
        TransactionType::AccountInfo,
        TransactionType::AssetTransfer,
        TransactionType::EffectiveBalanceLeasing,
    ];

    /// Resolve a `(type, subtype)` pair to its handler.
    ///
    /// Consumes no bytes: callers resolve the type before touching the
    /// attachment region.
    pub fn find(type_byte: u8, subtype: u8) -> Result<Self, ValidationError> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.type_byte() == type_byte && kind.subtype_byte() == subtype)
            .ok_or(ValidationError::UnknownTransactionType { type_byte, subtype })
    }

    pub const fn type_byte(self) -> u8 {
        match self {
            Self::OrdinaryPayment => 0,
            Self::ArbitraryMessage | Self::AliasAssignment | Self::AccountInfo => 1,
            Self::AssetTransfer => 2,
            Self::EffectiveBalanceLeasing => 4,
        }
    }

    pub const fn subtype_byte(self) -> u8 {
        match self {
            Self::OrdinaryPayment => 0,
            Self::ArbitraryMessage => 0,
            Self::AliasAssignment => 1,
            Self::AccountInfo => 5,
            Self::AssetTransfer => 2,
            Self::EffectiveBalanceLeasing => 0,
        }
    }

    /// Whether transactions of this kind must name a recipient.
    pub const fn has_recipient(self) -> bool {
        match self {
            Self::OrdinaryPayment
            | Self::ArbitraryMessage
            | Self::AssetTransfer
            | Self::EffectiveBalanceLeasing => true,
            Self::AliasAssignment | Self::AccountInfo => false,
        }
    }

    /// Parse this kind's attachment payload from the cursor.
    pub fn parse_attachment(
        self,
        reader: &mut ByteReader<'_>,
        transaction_version: u8,
    ) -> Result<Attachment, ValidationError> {
        Attachment::parse(self, reader, transaction_version)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrdinaryPayment => write!(f, "OrdinaryPayment"),
            Self::ArbitraryMessage => write!(f, "ArbitraryMessage"),
            Self::AliasAssignment => write!(f, "AliasAssignment"),
            Self::AccountInfo => write!(f, "AccountInfo"),
            Self::AssetTransfer => write!(f, "AssetTransfer"),
            Self::EffectiveBalanceLeasing => write!(f, "EffectiveBalanceLeasing"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_pairs_are_unique() {
        for (i, a) in TransactionType::ALL.iter().enumerate() {
            for b in &TransactionType::ALL[i + 1..] {
                assert_ne!(
                    (a.type_byte(), a.subtype_byte()),
                    (b.type_byte(), b.subtype_byte()),
                    "{a} and {b} share a type pair"
                );
            }
        }
    }

    #[test]
    fn find_resolves_every_registered_pair() {
        for kind in TransactionType::ALL {
            assert_eq!(
                TransactionType::find(kind.type_byte(), kind.subtype_byte()).unwrap(),
                kind
            );
        }
    }

    #[test]
    fn find_rejects_unknown_pair() {
        assert_eq!(
            TransactionType::find(1, 9),
            Err(ValidationError::UnknownTransactionType {
                type_byte: 1,
                subtype: 9
            })
        );
    }

    #[test]
    fn recipient_rules() {
        assert!(TransactionType::OrdinaryPayment.has_recipient());
        assert!(TransactionType::AssetTransfer.has_recipient());
        assert!(!TransactionType::AliasAssignment.has_recipient());
        assert!(!TransactionType::AccountInfo.has_recipient());
    }

    #[test]
    fn full_hash_hex_roundtrip() {
        let hash = FullHash::new([0xAB; 32]);
        let parsed: FullHash = hash.to_hex().parse().unwrap();
        assert_eq!(parsed, hash);
        assert_eq!(hash.to_string().len(), 64);
    }

    #[test]
    fn full_hash_rejects_wrong_length_hex() {
        assert!("abcd".parse::<FullHash>().is_err());
        assert!("zz".repeat(32).parse::<FullHash>().is_err());
    }

    #[test]
    fn full_hash_to_id_uses_first_eight_bytes() {
        let mut bytes = [0u8; 32];
        bytes[0] = 42;
        assert_eq!(FullHash::new(bytes).to_id(), 42);
    }

    #[test]
    fn signature_serializes_as_hex() {
        let sig = Signature::new([1u8; 64]);
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(64)));
    }

    #[test]
    fn from_slice_checks_length() {
        assert!(PublicKey::from_slice(&[0u8; 31]).is_none());
        assert!(PublicKey::from_slice(&[0u8; 32]).is_some());
    }
}
