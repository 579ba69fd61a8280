//! Type-specific attachment payloads.
//!
//! Each [`TransactionType`] owns exactly one attachment shape. Payment and
//! message transactions have an empty attachment (zero bytes, no version
//! byte); the others carry a small fixed layout, parsed first in the
//! attachment blob ahead of any appendage.

use bytes::BufMut;
use serde::Serialize;

use super::appendix::{appendix_version_for, read_appendix_version, Appendix};
use super::codec::{check_length, put_long_string, put_short_string, ByteReader};
use super::error::ValidationError;
use super::types::TransactionType;
use crate::config::{
    APPENDIX_VERSION, MAX_ACCOUNT_DESCRIPTION_LENGTH, MAX_ACCOUNT_NAME_LENGTH, MAX_ALIAS_LENGTH,
    MAX_ALIAS_URI_LENGTH, MAX_ASSET_TRANSFER_COMMENT_LENGTH,
};

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// The mandatory, type-specific payload of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attachment {
    OrdinaryPayment,
    ArbitraryMessage,
    AliasAssignment(AliasAssignment),
    AccountInfo(AccountInfo),
    AssetTransfer(AssetTransfer),
    EffectiveBalanceLeasing(EffectiveBalanceLeasing),
}

impl Attachment {
    /// The registry entry this attachment belongs to.
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            Self::OrdinaryPayment => TransactionType::OrdinaryPayment,
            Self::ArbitraryMessage => TransactionType::ArbitraryMessage,
            Self::AliasAssignment(_) => TransactionType::AliasAssignment,
            Self::AccountInfo(_) => TransactionType::AccountInfo,
            Self::AssetTransfer(_) => TransactionType::AssetTransfer,
            Self::EffectiveBalanceLeasing(_) => TransactionType::EffectiveBalanceLeasing,
        }
    }

    /// Parse the attachment for `kind` from the front of the cursor.
    pub fn parse(
        kind: TransactionType,
        reader: &mut ByteReader<'_>,
        transaction_version: u8,
    ) -> Result<Self, ValidationError> {
        Ok(match kind {
            TransactionType::OrdinaryPayment => Self::OrdinaryPayment,
            TransactionType::ArbitraryMessage => Self::ArbitraryMessage,
            TransactionType::AliasAssignment => {
                Self::AliasAssignment(AliasAssignment::parse(reader, transaction_version)?)
            }
            TransactionType::AccountInfo => {
                Self::AccountInfo(AccountInfo::parse(reader, transaction_version)?)
            }
            TransactionType::AssetTransfer => {
                Self::AssetTransfer(AssetTransfer::parse(reader, transaction_version)?)
            }
            TransactionType::EffectiveBalanceLeasing => Self::EffectiveBalanceLeasing(
                EffectiveBalanceLeasing::parse(reader, transaction_version)?,
            ),
        })
    }

    /// Align the layout version with the transaction it is attached to.
    pub(crate) fn for_transaction_version(mut self, transaction_version: u8) -> Self {
        let version = appendix_version_for(transaction_version);
        match &mut self {
            Self::OrdinaryPayment | Self::ArbitraryMessage => {}
            Self::AliasAssignment(a) => a.version = version,
            Self::AccountInfo(a) => a.version = version,
            Self::AssetTransfer(a) => a.version = version,
            Self::EffectiveBalanceLeasing(a) => a.version = version,
        }
        self
    }

    fn inner(&self) -> Option<&dyn Appendix> {
        match self {
            Self::OrdinaryPayment | Self::ArbitraryMessage => None,
            Self::AliasAssignment(a) => Some(a),
            Self::AccountInfo(a) => Some(a),
            Self::AssetTransfer(a) => Some(a),
            Self::EffectiveBalanceLeasing(a) => Some(a),
        }
    }
}

impl Appendix for Attachment {
    fn version(&self) -> u8 {
        self.inner().map_or(0, |a| a.version())
    }

    fn body_size(&self) -> usize {
        self.inner().map_or(0, |a| a.body_size())
    }

    fn write_body(&self, buf: &mut Vec<u8>) {
        if let Some(inner) = self.inner() {
            inner.write_body(buf);
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.inner().map_or(Ok(()), |a| a.validate())
    }
}

fn bound(len: usize, max: usize, field: &str) -> Result<(), ValidationError> {
    if len > max {
        return Err(ValidationError::not_valid(format!(
            "{field} length {len} exceeds {max}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// AliasAssignment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasAssignment {
    version: u8,
    alias_name: String,
    alias_uri: String,
}

impl AliasAssignment {
    pub fn new(alias_name: &str, alias_uri: &str) -> Self {
        Self {
            version: APPENDIX_VERSION,
            alias_name: alias_name.trim().to_string(),
            alias_uri: alias_uri.trim().to_string(),
        }
    }

    fn parse(reader: &mut ByteReader<'_>, transaction_version: u8) -> Result<Self, ValidationError> {
        let version = read_appendix_version(reader, transaction_version)?;
        let name_len = usize::from(reader.read_u8("alias name length")?);
        check_length(name_len, MAX_ALIAS_LENGTH, "alias name")?;
        let alias_name = reader.read_string(name_len, "alias name")?;
        let uri_len = usize::from(reader.read_u16("alias uri length")?);
        check_length(uri_len, MAX_ALIAS_URI_LENGTH, "alias uri")?;
        let alias_uri = reader.read_string(uri_len, "alias uri")?;
        Ok(Self {
            version,
            alias_name,
            alias_uri,
        })
    }

    pub fn alias_name(&self) -> &str {
        &self.alias_name
    }

    pub fn alias_uri(&self) -> &str {
        &self.alias_uri
    }
}

impl Appendix for AliasAssignment {
    fn version(&self) -> u8 {
        self.version
    }

    fn body_size(&self) -> usize {
        1 + self.alias_name.len() + 2 + self.alias_uri.len()
    }

    fn write_body(&self, buf: &mut Vec<u8>) {
        put_short_string(buf, &self.alias_name);
        put_long_string(buf, &self.alias_uri);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.alias_name.is_empty() {
            return Err(ValidationError::not_valid("empty alias name"));
        }
        bound(self.alias_name.len(), MAX_ALIAS_LENGTH, "alias name")?;
        bound(self.alias_uri.len(), MAX_ALIAS_URI_LENGTH, "alias uri")
    }
}

// ---------------------------------------------------------------------------
// AccountInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    version: u8,
    name: String,
    description: String,
}

impl AccountInfo {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            version: APPENDIX_VERSION,
            name: name.trim().to_string(),
            description: description.trim().to_string(),
        }
    }

    fn parse(reader: &mut ByteReader<'_>, transaction_version: u8) -> Result<Self, ValidationError> {
        let version = read_appendix_version(reader, transaction_version)?;
        let name_len = usize::from(reader.read_u8("account name length")?);
        check_length(name_len, MAX_ACCOUNT_NAME_LENGTH, "account name")?;
        let name = reader.read_string(name_len, "account name")?;
        let description_len = usize::from(reader.read_u16("account description length")?);
        check_length(
            description_len,
            MAX_ACCOUNT_DESCRIPTION_LENGTH,
            "account description",
        )?;
        let description = reader.read_string(description_len, "account description")?;
        Ok(Self {
            version,
            name,
            description,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Appendix for AccountInfo {
    fn version(&self) -> u8 {
        self.version
    }

    fn body_size(&self) -> usize {
        1 + self.name.len() + 2 + self.description.len()
    }

    fn write_body(&self, buf: &mut Vec<u8>) {
        put_short_string(buf, &self.name);
        put_long_string(buf, &self.description);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        bound(self.name.len(), MAX_ACCOUNT_NAME_LENGTH, "account name")?;
        bound(
            self.description.len(),
            MAX_ACCOUNT_DESCRIPTION_LENGTH,
            "account description",
        )
    }
}

// ---------------------------------------------------------------------------
// AssetTransfer
// ---------------------------------------------------------------------------

/// Asset movement. Version 0 transactions additionally carry a comment;
/// later versions moved free text into the message appendage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetTransfer {
    version: u8,
    asset_id: u64,
    quantity: i64,
    comment: String,
}

impl AssetTransfer {
    pub fn new(asset_id: u64, quantity: i64) -> Self {
        Self {
            version: APPENDIX_VERSION,
            asset_id,
            quantity,
            comment: String::new(),
        }
    }

    /// Attach a comment. Only encodable on version 0 transactions.
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    fn parse(reader: &mut ByteReader<'_>, transaction_version: u8) -> Result<Self, ValidationError> {
        let version = read_appendix_version(reader, transaction_version)?;
        let asset_id = reader.read_u64("asset id")?;
        let quantity = reader.read_i64("asset quantity")?;
        let comment = if version == 0 {
            let len = usize::from(reader.read_u16("asset comment length")?);
            check_length(len, MAX_ASSET_TRANSFER_COMMENT_LENGTH, "asset comment")?;
            reader.read_string(len, "asset comment")?
        } else {
            String::new()
        };
        Ok(Self {
            version,
            asset_id,
            quantity,
            comment,
        })
    }

    pub fn asset_id(&self) -> u64 {
        self.asset_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }
}

impl Appendix for AssetTransfer {
    fn version(&self) -> u8 {
        self.version
    }

    fn body_size(&self) -> usize {
        let comment = if self.version == 0 {
            2 + self.comment.len()
        } else {
            0
        };
        8 + 8 + comment
    }

    fn write_body(&self, buf: &mut Vec<u8>) {
        buf.put_u64_le(self.asset_id);
        buf.put_i64_le(self.quantity);
        if self.version == 0 {
            put_long_string(buf, &self.comment);
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.quantity <= 0 {
            return Err(ValidationError::not_valid(format!(
                "asset quantity {} must be positive",
                self.quantity
            )));
        }
        if self.version > 0 && !self.comment.is_empty() {
            return Err(ValidationError::not_valid(
                "asset transfer comments require a version 0 transaction",
            ));
        }
        bound(
            self.comment.len(),
            MAX_ASSET_TRANSFER_COMMENT_LENGTH,
            "asset comment",
        )
    }
}

// ---------------------------------------------------------------------------
// EffectiveBalanceLeasing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveBalanceLeasing {
    version: u8,
    period: u16,
}

impl EffectiveBalanceLeasing {
    /// Lease for `period` blocks.
    pub fn new(period: u16) -> Self {
        Self {
            version: APPENDIX_VERSION,
            period,
        }
    }

    fn parse(reader: &mut ByteReader<'_>, transaction_version: u8) -> Result<Self, ValidationError> {
        let version = read_appendix_version(reader, transaction_version)?;
        let period = reader.read_u16("leasing period")?;
        Ok(Self { version, period })
    }

    pub fn period(&self) -> u16 {
        self.period
    }
}

impl Appendix for EffectiveBalanceLeasing {
    fn version(&self) -> u8 {
        self.version
    }

    fn body_size(&self) -> usize {
        2
    }

    fn write_body(&self, buf: &mut Vec<u8>) {
        buf.put_u16_le(self.period);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.period == 0 {
            return Err(ValidationError::not_valid("leasing period must be positive"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
