//! # Transaction Module
//!
//! Binary shape, parse-time validation and construction of ledger
//! transactions. Every path that materializes a [`Transaction`] (network
//! bytes, a stored row, application code) ends in
//! [`TransactionBuilder::build`].
//!
//! ## Architecture
//!
//! ```text
//! codec.rs      : bounds-checked little-endian byte cursor
//! types.rs      : hash/key newtypes and the TransactionType registry
//! appendix.rs   : Appendix trait, optional appendages, presence flags
//! attachment.rs : type-specific attachment payloads
//! builder.rs    : immutable Transaction and its validating builder
//! wire.rs       : full network encoding and the attachment blob
//! error.rs      : ValidationError
//! ```
//!
//! ## Parse order
//!
//! 1. Resolve `(type, subtype)` through [`TransactionType::find`]; unknown
//!    pairs fail before any attachment byte is read.
//! 2. Parse the type attachment.
//! 3. Parse each flagged appendage in fixed order.
//! 4. Require the cursor to be empty.
//! 5. Hand everything to the builder, which validates and derives identity.

pub mod appendix;
pub mod attachment;
pub mod builder;
pub mod codec;
pub mod error;
pub mod types;
pub mod wire;

pub use appendix::{
    Appendix, AppendixFlags, EncryptToSelfMessage, EncryptedData, EncryptedMessage, Message,
    PublicKeyAnnouncement,
};
pub use attachment::{
    AccountInfo, AliasAssignment, AssetTransfer, Attachment, EffectiveBalanceLeasing,
};
pub use builder::{BlockPlacement, EcBlock, Transaction, TransactionBuilder};
pub use error::ValidationError;
pub use types::{FullHash, HashParseError, PublicKey, Signature, TransactionType};
pub(crate) use wire::AttachmentBlob;
