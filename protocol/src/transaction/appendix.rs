//! Optional transaction appendages and their binary codec.
//!
//! A transaction may carry zero or one of each appendage, always laid out
//! in this order after the type-specific attachment:
//!
//! ```text
//! Message | EncryptedMessage | PublicKeyAnnouncement | EncryptToSelfMessage
//! ```
//!
//! Which ones are present is recorded in [`AppendixFlags`], never inferred
//! from the bytes. Every appendage implements [`Appendix`]: it knows its
//! exact encoded size and how to write itself. The matching `parse`
//! constructors consume exactly that many bytes.
//!
//! ## Versioned layout
//!
//! The layout is selected by the *transaction* version: for version >= 1
//! each appendage is prefixed with a one-byte appendage version, for
//! version 0 the prefix is absent.

use bytes::BufMut;
use serde::Serialize;

use super::codec::{check_length, ByteReader};
use super::error::ValidationError;
use super::types::{serialize_hex, PublicKey};
use crate::config::{
    APPENDIX_VERSION, ENCRYPTION_NONCE_LENGTH, MAX_ARBITRARY_MESSAGE_LENGTH,
    MAX_ENCRYPTED_MESSAGE_LENGTH,
};

/// Top bit of a message length word marks a text payload.
const TEXT_FLAG: u32 = 0x8000_0000;

// ---------------------------------------------------------------------------
// Appendix trait
// ---------------------------------------------------------------------------

/// A self-describing, independently encoded part of the attachment blob.
///
/// Implemented by the type-specific [`Attachment`](super::Attachment) and
/// by every optional appendage.
pub trait Appendix {
    /// Layout version; 0 means no version byte is written.
    fn version(&self) -> u8;

    /// Encoded size of the body, excluding the version byte.
    fn body_size(&self) -> usize;

    /// Write the body, excluding the version byte.
    fn write_body(&self, buf: &mut Vec<u8>);

    /// Post-construction sanity checks (length bounds and the like).
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Exact encoded size, version byte included.
    fn size(&self) -> usize {
        self.body_size() + usize::from(self.version() > 0)
    }

    /// Write the full encoding at the end of `buf`.
    fn write(&self, buf: &mut Vec<u8>) {
        if self.version() > 0 {
            buf.put_u8(self.version());
        }
        self.write_body(buf);
    }
}

/// Appendage version implied by a transaction version.
pub(crate) fn appendix_version_for(transaction_version: u8) -> u8 {
    if transaction_version == 0 {
        0
    } else {
        APPENDIX_VERSION
    }
}

/// Read the appendage version byte if the transaction version has one.
pub(crate) fn read_appendix_version(
    reader: &mut ByteReader<'_>,
    transaction_version: u8,
) -> Result<u8, ValidationError> {
    if transaction_version == 0 {
        return Ok(0);
    }
    let version = reader.read_u8("appendix version")?;
    if version != APPENDIX_VERSION {
        return Err(ValidationError::malformed(format!(
            "unsupported appendix version {version}"
        )));
    }
    Ok(version)
}

fn split_length_word(word: u32) -> (usize, bool) {
    ((word & !TEXT_FLAG) as usize, word & TEXT_FLAG != 0)
}

fn length_word(len: usize, is_text: bool) -> u32 {
    let len = len as u32;
    if is_text {
        len | TEXT_FLAG
    } else {
        len
    }
}

// ---------------------------------------------------------------------------
// AppendixFlags
// ---------------------------------------------------------------------------

/// One presence flag per appendage kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppendixFlags {
    pub message: bool,
    pub encrypted_message: bool,
    pub public_key_announcement: bool,
    pub encrypt_to_self_message: bool,
}

impl AppendixFlags {
    const MESSAGE: u32 = 1;
    const ENCRYPTED_MESSAGE: u32 = 1 << 1;
    const PUBLIC_KEY_ANNOUNCEMENT: u32 = 1 << 2;
    const ENCRYPT_TO_SELF_MESSAGE: u32 = 1 << 3;
    const KNOWN: u32 = Self::MESSAGE
        | Self::ENCRYPTED_MESSAGE
        | Self::PUBLIC_KEY_ANNOUNCEMENT
        | Self::ENCRYPT_TO_SELF_MESSAGE;

    /// Wire bitmask.
    pub fn bits(&self) -> u32 {
        let mut bits = 0;
        if self.message {
            bits |= Self::MESSAGE;
        }
        if self.encrypted_message {
            bits |= Self::ENCRYPTED_MESSAGE;
        }
        if self.public_key_announcement {
            bits |= Self::PUBLIC_KEY_ANNOUNCEMENT;
        }
        if self.encrypt_to_self_message {
            bits |= Self::ENCRYPT_TO_SELF_MESSAGE;
        }
        bits
    }

    /// Decode a wire bitmask. Unknown bits are malformed.
    pub fn from_bits(bits: u32) -> Result<Self, ValidationError> {
        if bits & !Self::KNOWN != 0 {
            return Err(ValidationError::malformed(format!(
                "unknown appendix flags {bits:#x}"
            )));
        }
        Ok(Self {
            message: bits & Self::MESSAGE != 0,
            encrypted_message: bits & Self::ENCRYPTED_MESSAGE != 0,
            public_key_announcement: bits & Self::PUBLIC_KEY_ANNOUNCEMENT != 0,
            encrypt_to_self_message: bits & Self::ENCRYPT_TO_SELF_MESSAGE != 0,
        })
    }

    pub fn any(&self) -> bool {
        self.bits() != 0
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Plain (unencrypted) message attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    version: u8,
    #[serde(serialize_with = "serialize_hex")]
    message: Vec<u8>,
    is_text: bool,
}

impl Message {
    /// Binary message.
    pub fn new(message: Vec<u8>) -> Self {
        Self {
            version: APPENDIX_VERSION,
            message,
            is_text: false,
        }
    }

    /// UTF-8 text message.
    pub fn text(text: &str) -> Self {
        Self {
            version: APPENDIX_VERSION,
            message: text.as_bytes().to_vec(),
            is_text: true,
        }
    }

    pub fn parse(
        reader: &mut ByteReader<'_>,
        transaction_version: u8,
    ) -> Result<Self, ValidationError> {
        let version = read_appendix_version(reader, transaction_version)?;
        let (len, is_text) = split_length_word(reader.read_u32("message length")?);
        check_length(len, MAX_ARBITRARY_MESSAGE_LENGTH, "message")?;
        let message = reader.read_vec(len, "message")?;
        if is_text && std::str::from_utf8(&message).is_err() {
            return Err(ValidationError::malformed("text message is not UTF-8"));
        }
        Ok(Self {
            version,
            message,
            is_text,
        })
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub fn is_text(&self) -> bool {
        self.is_text
    }

    /// The message as text, if it was sent as text.
    pub fn as_text(&self) -> Option<&str> {
        if self.is_text {
            std::str::from_utf8(&self.message).ok()
        } else {
            None
        }
    }
}

impl Appendix for Message {
    fn version(&self) -> u8 {
        self.version
    }

    fn body_size(&self) -> usize {
        4 + self.message.len()
    }

    fn write_body(&self, buf: &mut Vec<u8>) {
        buf.put_u32_le(length_word(self.message.len(), self.is_text));
        buf.put_slice(&self.message);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.message.len() > MAX_ARBITRARY_MESSAGE_LENGTH {
            return Err(ValidationError::not_valid(format!(
                "message length {} exceeds {MAX_ARBITRARY_MESSAGE_LENGTH}",
                self.message.len()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EncryptedData
// ---------------------------------------------------------------------------

/// Ciphertext plus the nonce it was sealed with.
///
/// Empty data carries no nonce; that is how an empty payload is encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptedData {
    #[serde(serialize_with = "serialize_hex")]
    data: Vec<u8>,
    #[serde(serialize_with = "serialize_hex")]
    nonce: Vec<u8>,
}

impl EncryptedData {
    /// Ciphertext sealed with `nonce`. Empty `data` drops the nonce.
    pub fn new(data: Vec<u8>, nonce: [u8; ENCRYPTION_NONCE_LENGTH]) -> Self {
        let nonce = if data.is_empty() {
            Vec::new()
        } else {
            nonce.to_vec()
        };
        Self { data, nonce }
    }

    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            nonce: Vec::new(),
        }
    }

    fn read(reader: &mut ByteReader<'_>, len: usize) -> Result<Self, ValidationError> {
        if len == 0 {
            return Ok(Self::empty());
        }
        check_length(len, MAX_ENCRYPTED_MESSAGE_LENGTH, "encrypted data")?;
        let data = reader.read_vec(len, "encrypted data")?;
        let nonce = reader.read_vec(ENCRYPTION_NONCE_LENGTH, "encryption nonce")?;
        Ok(Self { data, nonce })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    pub fn size(&self) -> usize {
        self.data.len() + self.nonce.len()
    }
}

/// Shared body of the two encrypted appendages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct EncryptedBody {
    version: u8,
    encrypted_data: EncryptedData,
    is_text: bool,
}

impl EncryptedBody {
    fn parse(
        reader: &mut ByteReader<'_>,
        transaction_version: u8,
    ) -> Result<Self, ValidationError> {
        let version = read_appendix_version(reader, transaction_version)?;
        let (len, is_text) = split_length_word(reader.read_u32("encrypted message length")?);
        let encrypted_data = EncryptedData::read(reader, len)?;
        Ok(Self {
            version,
            encrypted_data,
            is_text,
        })
    }

    fn body_size(&self) -> usize {
        4 + self.encrypted_data.size()
    }

    fn write_body(&self, buf: &mut Vec<u8>) {
        buf.put_u32_le(length_word(self.encrypted_data.data.len(), self.is_text));
        buf.put_slice(&self.encrypted_data.data);
        buf.put_slice(&self.encrypted_data.nonce);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let data = &self.encrypted_data;
        if data.data.len() > MAX_ENCRYPTED_MESSAGE_LENGTH {
            return Err(ValidationError::not_valid(format!(
                "encrypted message length {} exceeds {MAX_ENCRYPTED_MESSAGE_LENGTH}",
                data.data.len()
            )));
        }
        let expected_nonce = if data.data.is_empty() {
            0
        } else {
            ENCRYPTION_NONCE_LENGTH
        };
        if data.nonce.len() != expected_nonce {
            return Err(ValidationError::not_valid("encrypted message nonce length"));
        }
        Ok(())
    }
}

macro_rules! encrypted_appendix {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
        #[serde(transparent)]
        pub struct $name(EncryptedBody);

        impl $name {
            pub fn new(encrypted_data: EncryptedData, is_text: bool) -> Self {
                Self(EncryptedBody {
                    version: APPENDIX_VERSION,
                    encrypted_data,
                    is_text,
                })
            }

            pub fn parse(
                reader: &mut ByteReader<'_>,
                transaction_version: u8,
            ) -> Result<Self, ValidationError> {
                EncryptedBody::parse(reader, transaction_version).map(Self)
            }

            pub fn encrypted_data(&self) -> &EncryptedData {
                &self.0.encrypted_data
            }

            pub fn is_text(&self) -> bool {
                self.0.is_text
            }
        }

        impl Appendix for $name {
            fn version(&self) -> u8 {
                self.0.version
            }

            fn body_size(&self) -> usize {
                self.0.body_size()
            }

            fn write_body(&self, buf: &mut Vec<u8>) {
                self.0.write_body(buf)
            }

            fn validate(&self) -> Result<(), ValidationError> {
                self.0.validate()
            }
        }
    };
}

encrypted_appendix!(
    /// Message encrypted for the recipient.
    EncryptedMessage
);

encrypted_appendix!(
    /// Message the sender encrypted to their own key, readable only by them.
    EncryptToSelfMessage
);

// ---------------------------------------------------------------------------
// PublicKeyAnnouncement
// ---------------------------------------------------------------------------

/// Publishes the recipient's public key alongside the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicKeyAnnouncement {
    version: u8,
    public_key: PublicKey,
}

impl PublicKeyAnnouncement {
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            version: APPENDIX_VERSION,
            public_key,
        }
    }

    pub fn parse(
        reader: &mut ByteReader<'_>,
        transaction_version: u8,
    ) -> Result<Self, ValidationError> {
        let version = read_appendix_version(reader, transaction_version)?;
        let public_key = PublicKey::new(reader.read_array("announced public key")?);
        Ok(Self {
            version,
            public_key,
        })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }
}

impl Appendix for PublicKeyAnnouncement {
    fn version(&self) -> u8 {
        self.version
    }

    fn body_size(&self) -> usize {
        PublicKey::LEN
    }

    fn write_body(&self, buf: &mut Vec<u8>) {
        buf.put_slice(self.public_key.as_bytes());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
