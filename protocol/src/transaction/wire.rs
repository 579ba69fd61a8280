//! Network byte encoding of a whole transaction.
//!
//! ```text
//! type | version<<4 | subtype | timestamp | deadline | sender key
//! recipient | amount | fee | referenced full hash | signature
//! [v>=1: flags | ec height | ec id] | attachment blob
//! ```
//!
//! All integers are little-endian. Absent optional fields are written as
//! zeros. The attachment blob is the type attachment followed by every
//! flagged appendage in fixed order; its length is exactly the sum of
//! their sizes.

use bytes::BufMut;
use tracing::warn;

use super::appendix::{
    Appendix, AppendixFlags, EncryptToSelfMessage, EncryptedMessage, Message,
    PublicKeyAnnouncement,
};
use super::attachment::Attachment;
use super::builder::{Transaction, TransactionBuilder};
use super::codec::ByteReader;
use super::error::ValidationError;
use super::types::{FullHash, PublicKey, Signature, TransactionType};
use crate::config::{
    MAX_TRANSACTION_VERSION, SIGNATURE_LENGTH, SIGNATURE_OFFSET, TRANSACTION_HEADER_LENGTH,
    TRANSACTION_HEADER_LENGTH_V0,
};

/// The decoded attachment blob: the type attachment plus whichever
/// appendages the flags announced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttachmentBlob {
    pub attachment: Attachment,
    pub message: Option<Message>,
    pub encrypted_message: Option<EncryptedMessage>,
    pub public_key_announcement: Option<PublicKeyAnnouncement>,
    pub encrypt_to_self_message: Option<EncryptToSelfMessage>,
}

impl AttachmentBlob {
    /// Parse a complete blob. Every byte must be consumed.
    pub fn parse(
        kind: TransactionType,
        transaction_version: u8,
        flags: AppendixFlags,
        bytes: &[u8],
    ) -> Result<Self, ValidationError> {
        let mut reader = ByteReader::new(bytes);
        let blob = Self::read(kind, transaction_version, flags, &mut reader)?;
        reader.finish("attachment blob")?;
        Ok(blob)
    }

    fn read(
        kind: TransactionType,
        transaction_version: u8,
        flags: AppendixFlags,
        reader: &mut ByteReader<'_>,
    ) -> Result<Self, ValidationError> {
        let attachment = kind.parse_attachment(reader, transaction_version)?;
        let message = flags
            .message
            .then(|| Message::parse(reader, transaction_version))
            .transpose()?;
        let encrypted_message = flags
            .encrypted_message
            .then(|| EncryptedMessage::parse(reader, transaction_version))
            .transpose()?;
        let public_key_announcement = flags
            .public_key_announcement
            .then(|| PublicKeyAnnouncement::parse(reader, transaction_version))
            .transpose()?;
        let encrypt_to_self_message = flags
            .encrypt_to_self_message
            .then(|| EncryptToSelfMessage::parse(reader, transaction_version))
            .transpose()?;
        Ok(Self {
            attachment,
            message,
            encrypted_message,
            public_key_announcement,
            encrypt_to_self_message,
        })
    }

    /// Seed a builder with the blob's attachment and appendages.
    pub fn into_builder(self) -> TransactionBuilder {
        let mut builder = TransactionBuilder::new(self.attachment);
        if let Some(message) = self.message {
            builder = builder.message(message);
        }
        if let Some(message) = self.encrypted_message {
            builder = builder.encrypted_message(message);
        }
        if let Some(announcement) = self.public_key_announcement {
            builder = builder.public_key_announcement(announcement);
        }
        if let Some(message) = self.encrypt_to_self_message {
            builder = builder.encrypt_to_self_message(message);
        }
        builder
    }
}

impl Transaction {
    fn header_length(&self) -> usize {
        if self.version() == 0 {
            TRANSACTION_HEADER_LENGTH_V0
        } else {
            TRANSACTION_HEADER_LENGTH
        }
    }

    /// Length of the attachment blob.
    pub fn attachment_size(&self) -> usize {
        self.appendages().iter().map(|part| part.size()).sum()
    }

    /// Total encoded length.
    pub fn size(&self) -> usize {
        self.header_length() + self.attachment_size()
    }

    /// The attachment blob, or `None` when there is nothing to store.
    pub fn attachment_bytes(&self) -> Option<Vec<u8>> {
        let size = self.attachment_size();
        if size == 0 {
            return None;
        }
        let mut buf = Vec::with_capacity(size);
        for part in self.appendages() {
            part.write(&mut buf);
        }
        Some(buf)
    }

    /// Full network encoding, signature included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.size());
        buf.put_u8(self.transaction_type().type_byte());
        buf.put_u8((self.version() << 4) | self.transaction_type().subtype_byte());
        buf.put_u32_le(self.timestamp());
        buf.put_u16_le(self.deadline());
        buf.put_slice(self.sender_public_key().as_bytes());
        buf.put_u64_le(self.recipient_id().unwrap_or(0));
        buf.put_i64_le(self.amount());
        buf.put_i64_le(self.fee());
        match self.referenced_transaction_full_hash() {
            Some(hash) => buf.put_slice(hash.as_bytes()),
            None => buf.put_bytes(0, FullHash::LEN),
        }
        match self.signature() {
            Some(signature) => buf.put_slice(signature.as_bytes()),
            None => buf.put_bytes(0, Signature::LEN),
        }
        if self.version() > 0 {
            buf.put_u32_le(self.appendix_flags().bits());
            let ec = self.ec_block();
            buf.put_u32_le(ec.map_or(0, |ec| ec.height));
            buf.put_u64_le(ec.map_or(0, |ec| ec.id));
        }
        for part in self.appendages() {
            part.write(&mut buf);
        }
        buf
    }

    /// Encoding with the signature zeroed; the bytes a signer signs.
    pub fn unsigned_bytes(&self) -> Vec<u8> {
        let mut bytes = self.to_bytes();
        bytes[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_LENGTH].fill(0);
        bytes
    }

    /// Decode a transaction received from the network.
    ///
    /// The type pair is resolved before any attachment byte is read, and
    /// the whole input must be consumed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValidationError> {
        Self::parse_bytes(bytes).map_err(|err| {
            warn!(len = bytes.len(), error = %err, "rejected transaction bytes");
            err
        })
    }

    fn parse_bytes(bytes: &[u8]) -> Result<Self, ValidationError> {
        let mut reader = ByteReader::new(bytes);
        let type_byte = reader.read_u8("type")?;
        let packed = reader.read_u8("version and subtype")?;
        let version = packed >> 4;
        let subtype = packed & 0x0F;
        if version > MAX_TRANSACTION_VERSION {
            return Err(ValidationError::UnsupportedVersion(version));
        }
        let kind = TransactionType::find(type_byte, subtype)?;

        let timestamp = reader.read_u32("timestamp")?;
        let deadline = reader.read_u16("deadline")?;
        let sender_public_key = PublicKey::new(reader.read_array("sender public key")?);
        let recipient = reader.read_u64("recipient")?;
        let amount = reader.read_i64("amount")?;
        let fee = reader.read_i64("fee")?;
        let referenced = FullHash::new(reader.read_array("referenced transaction full hash")?);
        let signature = Signature::new(reader.read_array("signature")?);

        let (flags, ec_height, ec_id) = if version > 0 {
            let flags = AppendixFlags::from_bits(reader.read_u32("flags")?)?;
            (flags, reader.read_u32("ec block height")?, reader.read_u64("ec block id")?)
        } else {
            (AppendixFlags::default(), 0, 0)
        };

        let blob = AttachmentBlob::read(kind, version, flags, &mut reader)?;
        reader.finish("transaction")?;

        let mut builder = blob
            .into_builder()
            .version(version)
            .timestamp(timestamp)
            .deadline(deadline)
            .sender_public_key(sender_public_key)
            .amount(amount)
            .fee(fee);
        if kind.has_recipient() {
            builder = builder.recipient_id(recipient);
        } else if recipient != 0 {
            return Err(ValidationError::UnexpectedRecipient(kind));
        }
        if !referenced.is_zero() {
            builder = builder.referenced_transaction_full_hash(referenced);
        }
        if !signature.is_zero() {
            builder = builder.signature(signature);
        }
        match (ec_height, ec_id) {
            (0, 0) => {}
            (0, _) => return Err(ValidationError::InconsistentEcBlock),
            (height, id) => builder = builder.ec_block_height(height).ec_block_id(id),
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::appendix::EncryptedData;
    use crate::transaction::attachment::{AccountInfo, AssetTransfer, EffectiveBalanceLeasing};

    fn base(attachment: Attachment) -> TransactionBuilder {
        TransactionBuilder::new(attachment)
            .sender_public_key(PublicKey::new([0x11; 32]))
            .fee(100_000_000)
            .timestamp(12_345)
            .deadline(60)
    }

    fn decorated() -> Transaction {
        base(Attachment::OrdinaryPayment)
            .recipient_id(777)
            .amount(42)
            .referenced_transaction_full_hash(FullHash::new([0x22; 32]))
            .signature(Signature::new([0x33; 64]))
            .ec_block_height(500)
            .ec_block_id(0xDEAD_BEEF)
            .message(Message::text("hello"))
            .encrypted_message(EncryptedMessage::new(
                EncryptedData::new(vec![1; 24], [2; 32]),
                true,
            ))
            .public_key_announcement(PublicKeyAnnouncement::new(PublicKey::new([0x44; 32])))
            .encrypt_to_self_message(EncryptToSelfMessage::new(EncryptedData::empty(), false))
            .build()
            .unwrap()
    }

    #[test]
    fn header_length_matches_layout() {
        let tx = base(Attachment::OrdinaryPayment).recipient_id(1).build().unwrap();
        assert_eq!(tx.to_bytes().len(), TRANSACTION_HEADER_LENGTH);
        assert!(tx.attachment_bytes().is_none());

        let v0 = base(Attachment::OrdinaryPayment)
            .version(0)
            .recipient_id(1)
            .build()
            .unwrap();
        assert_eq!(v0.to_bytes().len(), TRANSACTION_HEADER_LENGTH_V0);
    }

    #[test]
    fn decorated_transaction_roundtrips() {
        let tx = decorated();
        let bytes = tx.to_bytes();
        assert_eq!(bytes.len(), tx.size());
        let parsed = Transaction::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, tx);
    }

    #[test]
    fn typed_attachments_roundtrip() {
        let cases = [
            base(Attachment::AccountInfo(AccountInfo::new("alice", "about me"))),
            base(Attachment::EffectiveBalanceLeasing(EffectiveBalanceLeasing::new(1440)))
                .recipient_id(9),
            base(Attachment::AssetTransfer(AssetTransfer::new(5, 10).with_comment("memo")))
                .version(0)
                .recipient_id(9),
        ];
        for builder in cases {
            let tx = builder.build().unwrap();
            assert_eq!(Transaction::from_bytes(&tx.to_bytes()).unwrap(), tx);
        }
    }

    #[test]
    fn unsigned_bytes_zero_the_signature() {
        let tx = decorated();
        let unsigned = tx.unsigned_bytes();
        assert!(unsigned[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_LENGTH]
            .iter()
            .all(|b| *b == 0));
        assert_eq!(unsigned.len(), tx.to_bytes().len());
    }

    #[test]
    fn zero_signature_and_reference_roundtrip_as_absent() {
        let cases = [
            base(Attachment::OrdinaryPayment)
                .recipient_id(5)
                .signature(Signature::new([0; 64])),
            base(Attachment::OrdinaryPayment)
                .recipient_id(5)
                .referenced_transaction_full_hash(FullHash::new([0; 32])),
        ];
        for builder in cases {
            let tx = builder.build().unwrap();
            assert!(tx.signature().is_none());
            assert!(tx.referenced_transaction_full_hash().is_none());
            assert_eq!(Transaction::from_bytes(&tx.to_bytes()).unwrap(), tx);
        }
    }

    #[test]
    fn unknown_type_fails_first() {
        let mut bytes = decorated().to_bytes();
        bytes[0] = 9;
        assert_eq!(
            Transaction::from_bytes(&bytes),
            Err(ValidationError::UnknownTransactionType {
                type_byte: 9,
                subtype: 0
            })
        );
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut bytes = decorated().to_bytes();
        bytes[1] = 0x20;
        assert_eq!(
            Transaction::from_bytes(&bytes),
            Err(ValidationError::UnsupportedVersion(2))
        );
    }

    #[test]
    fn truncated_and_padded_inputs_are_malformed() {
        let bytes = decorated().to_bytes();
        assert!(matches!(
            Transaction::from_bytes(&bytes[..bytes.len() - 1]),
            Err(ValidationError::MalformedAttachment(_))
        ));
        let mut padded = bytes.clone();
        padded.push(0);
        assert!(matches!(
            Transaction::from_bytes(&padded),
            Err(ValidationError::MalformedAttachment(_))
        ));
    }

    #[test]
    fn recipient_on_recipientless_type_is_rejected() {
        let tx = base(Attachment::AccountInfo(AccountInfo::new("bob", "")))
            .build()
            .unwrap();
        let mut bytes = tx.to_bytes();
        bytes[40] = 1;
        assert!(matches!(
            Transaction::from_bytes(&bytes),
            Err(ValidationError::UnexpectedRecipient(TransactionType::AccountInfo))
        ));
    }

    #[test]
    fn ec_id_without_height_is_inconsistent() {
        let tx = base(Attachment::OrdinaryPayment).recipient_id(1).build().unwrap();
        let mut bytes = tx.to_bytes();
        let ec_id_offset = TRANSACTION_HEADER_LENGTH - 8;
        bytes[ec_id_offset] = 5;
        assert_eq!(
            Transaction::from_bytes(&bytes),
            Err(ValidationError::InconsistentEcBlock)
        );
    }

    #[test]
    fn unknown_flag_bit_is_malformed() {
        let tx = base(Attachment::OrdinaryPayment).recipient_id(1).build().unwrap();
        let mut bytes = tx.to_bytes();
        bytes[SIGNATURE_OFFSET + SIGNATURE_LENGTH] = 0x10;
        assert!(matches!(
            Transaction::from_bytes(&bytes),
            Err(ValidationError::MalformedAttachment(_))
        ));
    }

    #[test]
    fn blob_size_is_sum_of_parts() {
        let tx = decorated();
        let blob = tx.attachment_bytes().unwrap();
        let expected: usize = tx.appendages().iter().map(|a| a.size()).sum();
        assert_eq!(blob.len(), expected);
        let parsed =
            AttachmentBlob::parse(tx.transaction_type(), tx.version(), tx.appendix_flags(), &blob)
                .unwrap();
        assert_eq!(parsed.message.as_ref(), tx.message());
        assert_eq!(parsed.encrypt_to_self_message.as_ref(), tx.encrypt_to_self_message());
    }
}
