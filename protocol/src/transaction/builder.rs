//! The immutable [`Transaction`] and the [`TransactionBuilder`] that makes it.
//!
//! `build()` is the only way to obtain a `Transaction`, whether the fields
//! came from the network codec, a stored row, or application code. It is
//! also the single place where structural validation runs, so a value of
//! type `Transaction` is always internally consistent:
//!
//! - `id` is folded out of `full_hash`, and `full_hash` is the digest of
//!   the transaction's own bytes;
//! - a recipient is present exactly when the type requires one;
//! - EC-block height and id are present together or not at all;
//! - every attachment and appendage passed its own sanity check.
//!
//! Once built, a transaction never changes. To derive a new one (e.g. to
//! record its block placement) reopen it with
//! [`TransactionBuilder::from_transaction`] and build again.

use serde::Serialize;

use super::appendix::{
    Appendix, AppendixFlags, EncryptToSelfMessage, EncryptedMessage, Message,
    PublicKeyAnnouncement,
};
use super::attachment::Attachment;
use super::error::ValidationError;
use super::types::{FullHash, PublicKey, Signature, TransactionType};
use crate::config::{
    CURRENT_TRANSACTION_VERSION, DEFAULT_DEADLINE_MINUTES, MAX_BALANCE, MAX_TRANSACTION_VERSION,
};
use crate::crypto::transaction_full_hash;
use crate::time::epoch_time_now;

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// Binding to an ancestor block, scoping the transaction to one fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EcBlock {
    pub height: u32,
    pub id: u64,
}

/// Where a confirmed transaction sits in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockPlacement {
    pub block_id: u64,
    pub height: u32,
    pub block_timestamp: u32,
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A validated ledger transaction.
///
/// Fields are private; use the accessors. Serializes to JSON with hashes,
/// keys and signatures as hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    id: u64,
    full_hash: FullHash,
    version: u8,
    #[serde(rename = "type")]
    transaction_type: TransactionType,
    timestamp: u32,
    deadline: u16,
    sender_public_key: PublicKey,
    sender_id: u64,
    recipient_id: Option<u64>,
    amount: i64,
    fee: i64,
    referenced_transaction_full_hash: Option<FullHash>,
    signature: Option<Signature>,
    ec_block: Option<EcBlock>,
    attachment: Attachment,
    message: Option<Message>,
    encrypted_message: Option<EncryptedMessage>,
    public_key_announcement: Option<PublicKeyAnnouncement>,
    encrypt_to_self_message: Option<EncryptToSelfMessage>,
    block: Option<BlockPlacement>,
}

impl Transaction {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn full_hash(&self) -> &FullHash {
        &self.full_hash
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    /// Seconds since the ledger epoch.
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Validity window in minutes after `timestamp`.
    pub fn deadline(&self) -> u16 {
        self.deadline
    }

    pub fn sender_public_key(&self) -> &PublicKey {
        &self.sender_public_key
    }

    pub fn sender_id(&self) -> u64 {
        self.sender_id
    }

    pub fn recipient_id(&self) -> Option<u64> {
        self.recipient_id
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn fee(&self) -> i64 {
        self.fee
    }

    pub fn referenced_transaction_full_hash(&self) -> Option<&FullHash> {
        self.referenced_transaction_full_hash.as_ref()
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn ec_block(&self) -> Option<EcBlock> {
        self.ec_block
    }

    pub fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    pub fn encrypted_message(&self) -> Option<&EncryptedMessage> {
        self.encrypted_message.as_ref()
    }

    pub fn public_key_announcement(&self) -> Option<&PublicKeyAnnouncement> {
        self.public_key_announcement.as_ref()
    }

    pub fn encrypt_to_self_message(&self) -> Option<&EncryptToSelfMessage> {
        self.encrypt_to_self_message.as_ref()
    }

    /// Block placement; `None` while the transaction is unconfirmed.
    pub fn block(&self) -> Option<BlockPlacement> {
        self.block
    }

    /// Presence flags of the optional appendages.
    pub fn appendix_flags(&self) -> AppendixFlags {
        AppendixFlags {
            message: self.message.is_some(),
            encrypted_message: self.encrypted_message.is_some(),
            public_key_announcement: self.public_key_announcement.is_some(),
            encrypt_to_self_message: self.encrypt_to_self_message.is_some(),
        }
    }

    /// The attachment followed by every present appendage, in layout order.
    pub fn appendages(&self) -> Vec<&dyn Appendix> {
        let mut parts: Vec<&dyn Appendix> = Vec::with_capacity(5);
        parts.push(&self.attachment);
        if let Some(message) = &self.message {
            parts.push(message);
        }
        if let Some(message) = &self.encrypted_message {
            parts.push(message);
        }
        if let Some(announcement) = &self.public_key_announcement {
            parts.push(announcement);
        }
        if let Some(message) = &self.encrypt_to_self_message {
            parts.push(message);
        }
        parts
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Accumulates transaction fields and validates them in [`build`](Self::build).
///
/// # Usage
///
/// ```rust
/// use tessera_protocol::transaction::{Attachment, TransactionBuilder};
/// use tessera_protocol::transaction::types::PublicKey;
///
/// let tx = TransactionBuilder::new(Attachment::OrdinaryPayment)
///     .sender_public_key(PublicKey::new([7; 32]))
///     .recipient_id(42)
///     .amount(5_000)
///     .fee(100_000_000)
///     .timestamp(1_000)
///     .build()
///     .expect("valid payment");
/// assert_eq!(tx.recipient_id(), Some(42));
/// ```
///
/// Defaults: version 1, deadline 1440 minutes, amount 0, timestamp taken
/// from the clock at build time. The sender key and a fee must be given.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    version: u8,
    attachment: Attachment,
    sender_public_key: Option<PublicKey>,
    amount: i64,
    fee: i64,
    timestamp: Option<u32>,
    deadline: u16,
    recipient_id: Option<u64>,
    referenced_transaction_full_hash: Option<FullHash>,
    signature: Option<Signature>,
    ec_block_height: Option<u32>,
    ec_block_id: Option<u64>,
    message: Option<Message>,
    encrypted_message: Option<EncryptedMessage>,
    public_key_announcement: Option<PublicKeyAnnouncement>,
    encrypt_to_self_message: Option<EncryptToSelfMessage>,
    block_id: Option<u64>,
    height: Option<u32>,
    block_timestamp: Option<u32>,
    id: Option<u64>,
    sender_id: Option<u64>,
    full_hash: Option<FullHash>,
}

impl TransactionBuilder {
    /// Start a transaction whose type is determined by `attachment`.
    pub fn new(attachment: Attachment) -> Self {
        Self {
            version: CURRENT_TRANSACTION_VERSION,
            attachment,
            sender_public_key: None,
            amount: 0,
            fee: 0,
            timestamp: None,
            deadline: DEFAULT_DEADLINE_MINUTES,
            recipient_id: None,
            referenced_transaction_full_hash: None,
            signature: None,
            ec_block_height: None,
            ec_block_id: None,
            message: None,
            encrypted_message: None,
            public_key_announcement: None,
            encrypt_to_self_message: None,
            block_id: None,
            height: None,
            block_timestamp: None,
            id: None,
            sender_id: None,
            full_hash: None,
        }
    }

    /// Reopen an existing transaction. Derived identity (id, sender id,
    /// full hash) is not carried over; `build()` recomputes it.
    pub fn from_transaction(tx: &Transaction) -> Self {
        let mut builder = Self::new(tx.attachment.clone())
            .version(tx.version)
            .sender_public_key(tx.sender_public_key)
            .amount(tx.amount)
            .fee(tx.fee)
            .timestamp(tx.timestamp)
            .deadline(tx.deadline);
        builder.recipient_id = tx.recipient_id;
        builder.referenced_transaction_full_hash = tx.referenced_transaction_full_hash;
        builder.signature = tx.signature;
        builder.ec_block_height = tx.ec_block.map(|ec| ec.height);
        builder.ec_block_id = tx.ec_block.map(|ec| ec.id);
        builder.message = tx.message.clone();
        builder.encrypted_message = tx.encrypted_message.clone();
        builder.public_key_announcement = tx.public_key_announcement.clone();
        builder.encrypt_to_self_message = tx.encrypt_to_self_message.clone();
        if let Some(block) = tx.block {
            builder = builder.block(block.block_id, block.height, block.block_timestamp);
        }
        builder
    }

    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    pub fn sender_public_key(mut self, key: PublicKey) -> Self {
        self.sender_public_key = Some(key);
        self
    }

    pub fn amount(mut self, amount: i64) -> Self {
        self.amount = amount;
        self
    }

    pub fn fee(mut self, fee: i64) -> Self {
        self.fee = fee;
        self
    }

    /// Seconds since the ledger epoch. Defaults to now.
    pub fn timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Minutes after `timestamp` during which the transaction is valid.
    pub fn deadline(mut self, deadline: u16) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn recipient_id(mut self, recipient_id: u64) -> Self {
        self.recipient_id = Some(recipient_id);
        self
    }

    pub fn referenced_transaction_full_hash(mut self, hash: FullHash) -> Self {
        self.referenced_transaction_full_hash = Some(hash);
        self
    }

    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn ec_block_height(mut self, height: u32) -> Self {
        self.ec_block_height = Some(height);
        self
    }

    pub fn ec_block_id(mut self, id: u64) -> Self {
        self.ec_block_id = Some(id);
        self
    }

    pub fn message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }

    pub fn encrypted_message(mut self, message: EncryptedMessage) -> Self {
        self.encrypted_message = Some(message);
        self
    }

    pub fn public_key_announcement(mut self, announcement: PublicKeyAnnouncement) -> Self {
        self.public_key_announcement = Some(announcement);
        self
    }

    pub fn encrypt_to_self_message(mut self, message: EncryptToSelfMessage) -> Self {
        self.encrypt_to_self_message = Some(message);
        self
    }

    /// Record the block that confirmed the transaction.
    pub fn block(mut self, block_id: u64, height: u32, block_timestamp: u32) -> Self {
        self.block_id = Some(block_id);
        self.height = Some(height);
        self.block_timestamp = Some(block_timestamp);
        self
    }

    pub fn block_id(mut self, block_id: u64) -> Self {
        self.block_id = Some(block_id);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn block_timestamp(mut self, block_timestamp: u32) -> Self {
        self.block_timestamp = Some(block_timestamp);
        self
    }

    /// Expected id. Checked against the derived id at build time.
    pub fn id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Expected sender id. Checked against the sender key at build time.
    pub fn sender_id(mut self, sender_id: u64) -> Self {
        self.sender_id = Some(sender_id);
        self
    }

    /// Expected full hash. Checked against the transaction bytes at build time.
    pub fn full_hash(mut self, full_hash: FullHash) -> Self {
        self.full_hash = Some(full_hash);
        self
    }

    /// Validate the accumulated fields and produce the transaction.
    pub fn build(self) -> Result<Transaction, ValidationError> {
        if self.version > MAX_TRANSACTION_VERSION {
            return Err(ValidationError::UnsupportedVersion(self.version));
        }
        let sender_public_key = self
            .sender_public_key
            .ok_or(ValidationError::MissingField("sender public key"))?;
        let transaction_type = self.attachment.transaction_type();

        if self.deadline < 1 {
            return Err(ValidationError::not_valid("deadline must be at least 1 minute"));
        }
        if self.fee <= 0 || self.fee > MAX_BALANCE {
            return Err(ValidationError::not_valid(format!(
                "fee {} outside 1..={MAX_BALANCE}",
                self.fee
            )));
        }
        if self.amount < 0 || self.amount > MAX_BALANCE {
            return Err(ValidationError::not_valid(format!(
                "amount {} outside 0..={MAX_BALANCE}",
                self.amount
            )));
        }

        match (transaction_type.has_recipient(), self.recipient_id) {
            (true, None) => return Err(ValidationError::MissingRecipient(transaction_type)),
            (false, Some(_)) => return Err(ValidationError::UnexpectedRecipient(transaction_type)),
            _ => {}
        }
        if !transaction_type.has_recipient() && self.amount != 0 {
            return Err(ValidationError::not_valid(format!(
                "{transaction_type} transactions must carry a zero amount"
            )));
        }

        let ec_block = match (self.ec_block_height, self.ec_block_id) {
            (Some(0), Some(_)) => {
                return Err(ValidationError::not_valid("EC block height must be positive"))
            }
            (Some(height), Some(id)) => Some(EcBlock { height, id }),
            (None, None) => None,
            _ => return Err(ValidationError::InconsistentEcBlock),
        };

        let block = match (self.block_id, self.height, self.block_timestamp) {
            (Some(block_id), Some(height), Some(block_timestamp)) => Some(BlockPlacement {
                block_id,
                height,
                block_timestamp,
            }),
            (None, None, None) => None,
            _ => return Err(ValidationError::MissingField("complete block placement")),
        };

        let mut tx = Transaction {
            id: 0,
            full_hash: FullHash::new([0; 32]),
            version: self.version,
            transaction_type,
            timestamp: self.timestamp.unwrap_or_else(epoch_time_now),
            deadline: self.deadline,
            sender_public_key,
            sender_id: sender_public_key.account_id(),
            recipient_id: self.recipient_id,
            amount: self.amount,
            fee: self.fee,
            // All-zero bytes encode "absent" on the wire.
            referenced_transaction_full_hash: self
                .referenced_transaction_full_hash
                .filter(|hash| !hash.is_zero()),
            signature: self.signature.filter(|signature| !signature.is_zero()),
            ec_block,
            attachment: self.attachment.for_transaction_version(self.version),
            message: self.message,
            encrypted_message: self.encrypted_message,
            public_key_announcement: self.public_key_announcement,
            encrypt_to_self_message: self.encrypt_to_self_message,
            block,
        };

        if tx.version == 0 {
            if tx.appendix_flags().any() {
                return Err(ValidationError::not_valid(
                    "version 0 transactions cannot carry appendages",
                ));
            }
            if tx.ec_block.is_some() {
                return Err(ValidationError::not_valid(
                    "version 0 transactions cannot carry an EC block binding",
                ));
            }
        }
        for part in tx.appendages() {
            part.validate()?;
        }

        let full_hash = FullHash::new(transaction_full_hash(
            &tx.unsigned_bytes(),
            tx.signature.as_ref().map(|s| s.as_bytes()),
        ));
        if let Some(supplied) = self.full_hash {
            if supplied != full_hash {
                return Err(ValidationError::FullHashMismatch {
                    derived: full_hash.to_hex(),
                    supplied: supplied.to_hex(),
                });
            }
        }
        tx.full_hash = full_hash;
        tx.id = full_hash.to_id();

        if let Some(supplied) = self.id {
            if supplied != tx.id {
                return Err(ValidationError::IdMismatch {
                    derived: tx.id,
                    supplied,
                });
            }
        }
        if let Some(supplied) = self.sender_id {
            if supplied != tx.sender_id {
                return Err(ValidationError::SenderMismatch {
                    derived: tx.sender_id,
                    supplied,
                });
            }
        }

        Ok(tx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::appendix::EncryptedData;
    use crate::transaction::attachment::{AliasAssignment, AssetTransfer};

    fn payment() -> TransactionBuilder {
        TransactionBuilder::new(Attachment::OrdinaryPayment)
            .sender_public_key(PublicKey::new([1; 32]))
            .recipient_id(99)
            .amount(1_000)
            .fee(100_000_000)
            .timestamp(50_000)
    }

    #[test]
    fn builds_deterministic_identity() {
        let a = payment().build().unwrap();
        let b = payment().build().unwrap();
        assert_eq!(a.full_hash(), b.full_hash());
        assert_eq!(a.id(), a.full_hash().to_id());
        assert_eq!(a.sender_id(), PublicKey::new([1; 32]).account_id());
    }

    #[test]
    fn missing_recipient_is_rejected() {
        let err = TransactionBuilder::new(Attachment::OrdinaryPayment)
            .sender_public_key(PublicKey::new([1; 32]))
            .fee(1)
            .timestamp(1)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingRecipient(TransactionType::OrdinaryPayment)
        );
    }

    #[test]
    fn unexpected_recipient_is_rejected() {
        let err = TransactionBuilder::new(Attachment::AliasAssignment(AliasAssignment::new(
            "name", "uri",
        )))
        .sender_public_key(PublicKey::new([1; 32]))
        .recipient_id(5)
        .fee(1)
        .build()
        .unwrap_err();
        assert!(matches!(err, ValidationError::UnexpectedRecipient(_)));
    }

    #[test]
    fn half_ec_binding_is_rejected() {
        let err = payment().ec_block_height(10).build().unwrap_err();
        assert_eq!(err, ValidationError::InconsistentEcBlock);

        let err = payment().ec_block_id(10).build().unwrap_err();
        assert_eq!(err, ValidationError::InconsistentEcBlock);
    }

    #[test]
    fn full_ec_binding_is_kept() {
        let tx = payment().ec_block_height(10).ec_block_id(77).build().unwrap();
        assert_eq!(tx.ec_block(), Some(EcBlock { height: 10, id: 77 }));
    }

    #[test]
    fn missing_sender_key_is_rejected() {
        let err = TransactionBuilder::new(Attachment::OrdinaryPayment)
            .recipient_id(1)
            .fee(1)
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("sender public key"));
    }

    #[test]
    fn fee_and_amount_bounds() {
        assert!(payment().fee(0).build().is_err());
        assert!(payment().fee(MAX_BALANCE + 1).build().is_err());
        assert!(payment().amount(-1).build().is_err());
        assert!(payment().deadline(0).build().is_err());
    }

    #[test]
    fn oversized_message_fails_build() {
        let err = payment()
            .message(Message::new(vec![0; 1001]))
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotValid(_)));
    }

    #[test]
    fn version_zero_rejects_appendages() {
        let err = payment()
            .version(0)
            .message(Message::text("hi"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotValid(_)));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        assert_eq!(
            payment().version(2).build().unwrap_err(),
            ValidationError::UnsupportedVersion(2)
        );
    }

    #[test]
    fn version_zero_attachment_drops_version_byte() {
        let tx = TransactionBuilder::new(Attachment::AssetTransfer(
            AssetTransfer::new(3, 10).with_comment("memo"),
        ))
        .version(0)
        .sender_public_key(PublicKey::new([2; 32]))
        .recipient_id(8)
        .fee(1)
        .timestamp(1)
        .build()
        .unwrap();
        assert_eq!(tx.attachment().version(), 0);
    }

    #[test]
    fn supplied_identity_must_match() {
        let tx = payment().build().unwrap();
        assert!(payment().id(tx.id()).full_hash(*tx.full_hash()).build().is_ok());
        assert!(matches!(
            payment().id(tx.id() ^ 1).build(),
            Err(ValidationError::IdMismatch { .. })
        ));
        assert!(matches!(
            payment().full_hash(FullHash::new([9; 32])).build(),
            Err(ValidationError::FullHashMismatch { .. })
        ));
        assert!(matches!(
            payment().sender_id(1).build(),
            Err(ValidationError::SenderMismatch { .. })
        ));
    }

    #[test]
    fn signature_changes_identity() {
        let unsigned = payment().build().unwrap();
        let signed = payment().signature(Signature::new([5; 64])).build().unwrap();
        assert!(!unsigned.is_signed());
        assert!(signed.is_signed());
        assert_ne!(unsigned.id(), signed.id());
    }

    #[test]
    fn zero_signature_builds_as_unsigned() {
        let unsigned = payment().build().unwrap();
        let zeroed = payment()
            .signature(Signature::new([0; 64]))
            .referenced_transaction_full_hash(FullHash::new([0; 32]))
            .build()
            .unwrap();
        assert!(!zeroed.is_signed());
        assert_eq!(zeroed.referenced_transaction_full_hash(), None);
        assert_eq!(zeroed, unsigned);
    }

    #[test]
    fn partial_block_placement_is_rejected() {
        assert!(payment().block_id(1).build().is_err());
        let tx = payment().block(1, 2, 3).build().unwrap();
        assert_eq!(
            tx.block(),
            Some(BlockPlacement {
                block_id: 1,
                height: 2,
                block_timestamp: 3
            })
        );
    }

    #[test]
    fn from_transaction_preserves_identity_when_unchanged() {
        let tx = payment()
            .message(Message::text("note"))
            .encrypted_message(EncryptedMessage::new(
                EncryptedData::new(vec![1, 2, 3], [4; 32]),
                false,
            ))
            .build()
            .unwrap();
        let placed = TransactionBuilder::from_transaction(&tx)
            .block(10, 20, 30)
            .build()
            .unwrap();
        assert_eq!(placed.id(), tx.id());
        assert_eq!(placed.message(), tx.message());
        assert_eq!(placed.block().map(|b| b.height), Some(20));
    }

    #[test]
    fn appendages_follow_layout_order() {
        let tx = payment()
            .public_key_announcement(PublicKeyAnnouncement::new(PublicKey::new([3; 32])))
            .message(Message::text("first"))
            .build()
            .unwrap();
        let sizes: Vec<usize> = tx.appendages().iter().map(|a| a.size()).collect();
        assert_eq!(sizes, vec![0, 1 + 4 + 5, 33]);
        let flags = tx.appendix_flags();
        assert!(flags.message && flags.public_key_announcement);
        assert!(!flags.encrypted_message && !flags.encrypt_to_self_message);
    }

    #[test]
    fn serializes_to_json() {
        let tx = payment().build().unwrap();
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "ordinary_payment");
        assert_eq!(json["full_hash"], tx.full_hash().to_hex());
    }
}
