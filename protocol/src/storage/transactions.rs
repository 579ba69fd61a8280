//! # Transaction Store
//!
//! Row-oriented persistence for confirmed transactions.
//!
//! Each transaction is stored as one [`TransactionRow`]: the fixed header
//! fields, the attachment blob (absent when empty) and one presence flag
//! per appendage kind. The flags duplicate what the blob encodes, which
//! lets a reader check one against the other.
//!
//! Rows are rebuilt through [`TransactionBuilder`], with the stored id,
//! sender id and full hash supplied for cross-checking. A row that fails
//! to build was valid when written, so the failure is reported as
//! [`DbError::Corrupted`] rather than a validation error.

use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionResult};
use sled::Transactional;
use std::collections::HashSet;
use tracing::{debug, error};

use super::db::{serialization, DbError, DbResult, LedgerDb, TransactionTables};
use crate::transaction::{
    AppendixFlags, AttachmentBlob, FullHash, PublicKey, Signature, Transaction, TransactionType,
    ValidationError,
};

// ---------------------------------------------------------------------------
// TransactionRow
// ---------------------------------------------------------------------------

/// The persisted shape of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub id: u64,
    pub full_hash: [u8; 32],
    pub transaction_type: u8,
    pub subtype: u8,
    pub version: u8,
    pub timestamp: u32,
    pub deadline: u16,
    pub sender_public_key: [u8; 32],
    pub sender_id: u64,
    pub recipient_id: Option<u64>,
    pub amount: i64,
    pub fee: i64,
    pub referenced_transaction_full_hash: Option<[u8; 32]>,
    pub signature: Option<Vec<u8>>,
    pub attachment_bytes: Option<Vec<u8>>,
    pub has_message: bool,
    pub has_encrypted_message: bool,
    pub has_public_key_announcement: bool,
    pub has_encrypt_to_self_message: bool,
    /// 0 when the transaction has no EC-block binding.
    pub ec_block_height: u32,
    pub ec_block_id: Option<u64>,
    pub block_id: u64,
    pub height: u32,
    pub block_timestamp: u32,
}

impl TransactionRow {
    /// Flatten a confirmed transaction. Pending transactions have no row.
    pub fn from_transaction(tx: &Transaction) -> DbResult<Self> {
        let block = tx.block().ok_or(DbError::NotInBlock { id: tx.id() })?;
        let flags = tx.appendix_flags();
        let ec = tx.ec_block();
        Ok(Self {
            id: tx.id(),
            full_hash: *tx.full_hash().as_bytes(),
            transaction_type: tx.transaction_type().type_byte(),
            subtype: tx.transaction_type().subtype_byte(),
            version: tx.version(),
            timestamp: tx.timestamp(),
            deadline: tx.deadline(),
            sender_public_key: *tx.sender_public_key().as_bytes(),
            sender_id: tx.sender_id(),
            recipient_id: tx.recipient_id(),
            amount: tx.amount(),
            fee: tx.fee(),
            referenced_transaction_full_hash: tx
                .referenced_transaction_full_hash()
                .map(|hash| *hash.as_bytes()),
            signature: tx.signature().map(|sig| sig.as_bytes().to_vec()),
            attachment_bytes: tx.attachment_bytes(),
            has_message: flags.message,
            has_encrypted_message: flags.encrypted_message,
            has_public_key_announcement: flags.public_key_announcement,
            has_encrypt_to_self_message: flags.encrypt_to_self_message,
            ec_block_height: ec.map_or(0, |ec| ec.height),
            ec_block_id: ec.map(|ec| ec.id),
            block_id: block.block_id,
            height: block.height,
            block_timestamp: block.block_timestamp,
        })
    }

    pub fn appendix_flags(&self) -> AppendixFlags {
        AppendixFlags {
            message: self.has_message,
            encrypted_message: self.has_encrypted_message,
            public_key_announcement: self.has_public_key_announcement,
            encrypt_to_self_message: self.has_encrypt_to_self_message,
        }
    }

    /// Rebuild the transaction, cross-checking the stored identity.
    pub fn into_transaction(self) -> Result<Transaction, ValidationError> {
        let kind = TransactionType::find(self.transaction_type, self.subtype)?;
        let blob = match self.attachment_bytes.as_deref() {
            None => AttachmentBlob::parse(kind, self.version, self.appendix_flags(), &[])?,
            Some([]) => {
                return Err(ValidationError::malformed(
                    "stored attachment blob is present but empty",
                ))
            }
            Some(bytes) => AttachmentBlob::parse(kind, self.version, self.appendix_flags(), bytes)?,
        };

        let mut builder = blob
            .into_builder()
            .version(self.version)
            .timestamp(self.timestamp)
            .deadline(self.deadline)
            .sender_public_key(PublicKey::new(self.sender_public_key))
            .amount(self.amount)
            .fee(self.fee)
            .block(self.block_id, self.height, self.block_timestamp)
            .id(self.id)
            .sender_id(self.sender_id)
            .full_hash(FullHash::new(self.full_hash));
        if let Some(recipient) = self.recipient_id {
            builder = builder.recipient_id(recipient);
        }
        if let Some(hash) = self.referenced_transaction_full_hash {
            builder = builder.referenced_transaction_full_hash(FullHash::new(hash));
        }
        if let Some(bytes) = &self.signature {
            let signature = Signature::from_slice(bytes).ok_or_else(|| {
                ValidationError::malformed(format!("stored signature has {} bytes", bytes.len()))
            })?;
            builder = builder.signature(signature);
        }
        if self.ec_block_height != 0 {
            builder = builder.ec_block_height(self.ec_block_height);
        }
        if let Some(id) = self.ec_block_id {
            builder = builder.ec_block_id(id);
        }
        builder.build()
    }
}

fn block_key(block_id: u64, id: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&block_id.to_be_bytes());
    key[8..].copy_from_slice(&id.to_be_bytes());
    key
}

fn id_from_key(bytes: &[u8], key: &str) -> DbResult<u64> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| DbError::DanglingIndex {
        key: key.to_string(),
    })?;
    Ok(u64::from_be_bytes(raw))
}

// ---------------------------------------------------------------------------
// TransactionStore
// ---------------------------------------------------------------------------

/// Lookup and batch persistence of confirmed transactions.
///
/// Every call takes its own set of tree handles from the [`LedgerDb`] and
/// drops them on return, whatever the outcome. Calls are synchronous.
#[derive(Debug, Clone)]
pub struct TransactionStore {
    db: LedgerDb,
}

impl TransactionStore {
    pub fn new(db: LedgerDb) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &LedgerDb {
        &self.db
    }

    fn load(tables: &TransactionTables, id: u64) -> DbResult<Option<Transaction>> {
        let Some(bytes) = tables.transactions.get(id.to_be_bytes())? else {
            return Ok(None);
        };
        let row: TransactionRow = bincode::deserialize(&bytes).map_err(serialization)?;
        match row.into_transaction() {
            Ok(tx) => Ok(Some(tx)),
            Err(source) => {
                error!(id, error = %source, "stored transaction failed validation");
                Err(DbError::Corrupted {
                    key: id.to_string(),
                    source,
                })
            }
        }
    }

    /// Look up a transaction by numeric id.
    pub fn find_by_id(&self, id: u64) -> DbResult<Option<Transaction>> {
        let tables = self.db.tables();
        let tx = Self::load(&tables, id)?;
        debug!(id, found = tx.is_some(), "find transaction by id");
        Ok(tx)
    }

    /// Look up a transaction by full hash.
    pub fn find_by_full_hash(&self, full_hash: &FullHash) -> DbResult<Option<Transaction>> {
        let tables = self.db.tables();
        let Some(id_bytes) = tables.transaction_hashes.get(full_hash.as_bytes())? else {
            debug!(full_hash = %full_hash, found = false, "find transaction by full hash");
            return Ok(None);
        };
        let id = id_from_key(&id_bytes, &full_hash.to_hex())?;
        let tx = Self::load(&tables, id)?.ok_or_else(|| DbError::DanglingIndex {
            key: full_hash.to_hex(),
        })?;
        if tx.full_hash() != full_hash {
            error!(full_hash = %full_hash, id, "hash index points at another transaction");
            return Err(DbError::DanglingIndex {
                key: full_hash.to_hex(),
            });
        }
        debug!(full_hash = %full_hash, id, found = true, "find transaction by full hash");
        Ok(Some(tx))
    }

    /// Look up a transaction by full hash given as hex.
    pub fn find_by_full_hash_hex(&self, full_hash: &str) -> DbResult<Option<Transaction>> {
        let full_hash: FullHash = full_hash.parse()?;
        self.find_by_full_hash(&full_hash)
    }

    pub fn has_by_id(&self, id: u64) -> DbResult<bool> {
        Ok(self.db.tables().transactions.contains_key(id.to_be_bytes())?)
    }

    pub fn has_by_full_hash(&self, full_hash: &FullHash) -> DbResult<bool> {
        Ok(self
            .db
            .tables()
            .transaction_hashes
            .contains_key(full_hash.as_bytes())?)
    }

    /// All transactions of one block, in ascending id order.
    pub fn find_by_block(&self, block_id: u64) -> DbResult<Vec<Transaction>> {
        let tables = self.db.tables();
        let mut transactions = Vec::new();
        for entry in tables.block_transactions.scan_prefix(block_id.to_be_bytes()) {
            let (key, _) = entry?;
            let key_label = hex::encode(&key);
            let id = id_from_key(&key[8..], &key_label)?;
            let tx = Self::load(&tables, id)?
                .ok_or(DbError::DanglingIndex { key: key_label })?;
            transactions.push(tx);
        }
        debug!(block_id, count = transactions.len(), "find transactions by block");
        Ok(transactions)
    }

    /// Persist a batch of confirmed transactions atomically.
    ///
    /// Either every row and index entry is written or none is. A
    /// transaction whose id or full hash is already stored (or repeated
    /// within the batch) aborts the whole batch.
    ///
    /// The commit is followed by a flush. A flush failure is reported as
    /// [`DbError::NotDurable`]: the rows are already visible and must not
    /// be saved again.
    pub fn save_all(&self, transactions: &[Transaction]) -> DbResult<()> {
        if transactions.is_empty() {
            return Ok(());
        }

        let mut seen = HashSet::with_capacity(transactions.len());
        let mut rows = Vec::with_capacity(transactions.len());
        for tx in transactions {
            if !seen.insert(tx.id()) {
                return Err(DbError::DuplicateTransaction { id: tx.id() });
            }
            let row = TransactionRow::from_transaction(tx)?;
            let bytes = bincode::serialize(&row).map_err(serialization)?;
            rows.push((row.id, row.full_hash, row.block_id, bytes));
        }

        let tables = self.db.tables();
        let result: TransactionResult<(), DbError> = (
            &tables.transactions,
            &tables.transaction_hashes,
            &tables.block_transactions,
        )
            .transaction(|(by_id, by_hash, by_block)| {
                for (id, full_hash, block_id, bytes) in &rows {
                    let id_key = id.to_be_bytes();
                    if by_id.get(&id_key[..])?.is_some() || by_hash.get(&full_hash[..])?.is_some() {
                        return Err(ConflictableTransactionError::Abort(
                            DbError::DuplicateTransaction { id: *id },
                        ));
                    }
                    by_id.insert(&id_key[..], bytes.as_slice())?;
                    by_hash.insert(&full_hash[..], &id_key[..])?;
                    by_block.insert(&block_key(*block_id, *id)[..], Vec::<u8>::new())?;
                }
                Ok(())
            });

        match result {
            Ok(()) => {}
            Err(TransactionError::Abort(err)) => return Err(err),
            Err(TransactionError::Storage(err)) => return Err(err.into()),
        }
        self.db.flush().map_err(|err| match err {
            DbError::Sled(err) => DbError::NotDurable(err),
            other => other,
        })?;
        debug!(count = rows.len(), "saved transactions");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{
        Attachment, EncryptedData, EncryptedMessage, Message, TransactionBuilder,
    };

    fn confirmed(seed: u8, block_id: u64) -> Transaction {
        TransactionBuilder::new(Attachment::OrdinaryPayment)
            .sender_public_key(PublicKey::new([seed; 32]))
            .recipient_id(u64::from(seed) + 1000)
            .amount(i64::from(seed) * 10)
            .fee(100_000_000)
            .timestamp(1_000 + u32::from(seed))
            .block(block_id, 10, 2_000)
            .build()
            .unwrap()
    }

    fn store() -> TransactionStore {
        TransactionStore::new(LedgerDb::open_temporary().unwrap())
    }

    #[test]
    fn save_then_find_by_id_and_hash() {
        let store = store();
        let tx = confirmed(1, 55);
        store.save_all(std::slice::from_ref(&tx)).unwrap();

        assert_eq!(store.find_by_id(tx.id()).unwrap(), Some(tx.clone()));
        assert_eq!(store.find_by_full_hash(tx.full_hash()).unwrap(), Some(tx.clone()));
        assert_eq!(
            store.find_by_full_hash_hex(&tx.full_hash().to_hex()).unwrap(),
            Some(tx.clone())
        );
        assert!(store.has_by_id(tx.id()).unwrap());
        assert!(store.has_by_full_hash(tx.full_hash()).unwrap());
    }

    #[test]
    fn missing_lookups_return_none() {
        let store = store();
        assert!(store.find_by_id(1).unwrap().is_none());
        assert!(store.find_by_full_hash(&FullHash::new([1; 32])).unwrap().is_none());
        assert!(!store.has_by_id(1).unwrap());
        assert!(store.find_by_block(1).unwrap().is_empty());
    }

    #[test]
    fn bad_hex_is_not_fatal() {
        let err = store().find_by_full_hash_hex("not hex").unwrap_err();
        assert!(matches!(err, DbError::InvalidHash(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn pending_transaction_is_rejected() {
        let pending = TransactionBuilder::new(Attachment::OrdinaryPayment)
            .sender_public_key(PublicKey::new([9; 32]))
            .recipient_id(1)
            .fee(1)
            .timestamp(1)
            .build()
            .unwrap();
        assert!(matches!(
            store().save_all(&[pending]),
            Err(DbError::NotInBlock { .. })
        ));
    }

    #[test]
    fn duplicate_aborts_whole_batch() {
        let store = store();
        let first = confirmed(1, 7);
        store.save_all(std::slice::from_ref(&first)).unwrap();

        let fresh = confirmed(2, 7);
        let err = store.save_all(&[fresh.clone(), first]).unwrap_err();
        assert!(matches!(err, DbError::DuplicateTransaction { .. }));
        assert!(!store.has_by_id(fresh.id()).unwrap());
        assert_eq!(store.db().transaction_count(), 1);
    }

    #[test]
    fn committed_batch_is_not_saved_twice() {
        let store = store();
        let batch = [confirmed(3, 9), confirmed(4, 9)];
        store.save_all(&batch).unwrap();

        let err = store.save_all(&batch).unwrap_err();
        assert!(matches!(err, DbError::DuplicateTransaction { .. }));
        assert!(!err.is_fatal());
        assert_eq!(store.find_by_block(9).unwrap().len(), 2);
    }

    #[test]
    fn repeated_transaction_in_batch_is_rejected() {
        let tx = confirmed(3, 1);
        assert!(matches!(
            store().save_all(&[tx.clone(), tx]),
            Err(DbError::DuplicateTransaction { .. })
        ));
    }

    #[test]
    fn row_keeps_flags_and_blob_in_step() {
        let tx = TransactionBuilder::from_transaction(&confirmed(4, 1))
            .message(Message::text("memo"))
            .encrypted_message(EncryptedMessage::new(
                EncryptedData::new(vec![7; 10], [8; 32]),
                false,
            ))
            .build()
            .unwrap();
        let row = TransactionRow::from_transaction(&tx).unwrap();
        assert!(row.has_message && row.has_encrypted_message);
        assert!(!row.has_public_key_announcement && !row.has_encrypt_to_self_message);
        assert_eq!(
            row.attachment_bytes.as_ref().map(Vec::len),
            Some((1 + 4 + 4) + (1 + 4 + 10 + 32))
        );
        assert_eq!(row.into_transaction().unwrap(), tx);
    }

    #[test]
    fn empty_blob_row_has_no_bytes() {
        let row = TransactionRow::from_transaction(&confirmed(5, 1)).unwrap();
        assert!(row.attachment_bytes.is_none());
    }

    #[test]
    fn present_but_empty_blob_is_rejected() {
        let mut row = TransactionRow::from_transaction(&confirmed(5, 1)).unwrap();
        row.attachment_bytes = Some(Vec::new());
        assert!(matches!(
            row.into_transaction(),
            Err(ValidationError::MalformedAttachment(_))
        ));
    }

    #[test]
    fn flag_without_blob_is_rejected() {
        let mut row = TransactionRow::from_transaction(&confirmed(6, 1)).unwrap();
        row.has_message = true;
        assert!(matches!(
            row.into_transaction(),
            Err(ValidationError::MalformedAttachment(_))
        ));
    }

    #[test]
    fn tampered_row_reads_as_corruption() {
        let store = store();
        let tx = confirmed(7, 3);
        let mut row = TransactionRow::from_transaction(&tx).unwrap();
        row.amount += 1;
        store
            .db()
            .tables()
            .transactions
            .insert(tx.id().to_be_bytes(), bincode::serialize(&row).unwrap())
            .unwrap();

        let err = store.find_by_id(tx.id()).unwrap_err();
        assert!(matches!(
            err,
            DbError::Corrupted {
                source: ValidationError::FullHashMismatch { .. },
                ..
            }
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn find_by_block_orders_by_ascending_id() {
        let store = store();
        let batch: Vec<Transaction> = (10..15).map(|seed| confirmed(seed, 99)).collect();
        store.save_all(&batch).unwrap();
        store.save_all(&[confirmed(20, 100)]).unwrap();

        let found = store.find_by_block(99).unwrap();
        assert_eq!(found.len(), 5);
        let ids: Vec<u64> = found.iter().map(Transaction::id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert!(found.iter().all(|tx| tx.block().map(|b| b.block_id) == Some(99)));
    }
}
