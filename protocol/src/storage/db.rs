//! # LedgerDb: Persistent Storage Engine
//!
//! The sled handle behind the transaction store. All on-disk data flows
//! through this module.
//!
//! ## Tree Layout
//!
//! | Tree                 | Key                             | Value                   |
//! |----------------------|---------------------------------|-------------------------|
//! | `transactions`       | `id` (8B BE)                    | `bincode(TransactionRow)` |
//! | `transaction_hashes` | `full_hash` (32B)               | `id` (8B BE)            |
//! | `block_transactions` | `block_id` (8B BE) ‖ `id` (8B BE) | empty                 |
//!
//! Ids are stored big-endian so sled's lexicographic ordering matches
//! unsigned numeric ordering; a prefix scan over `block_transactions`
//! therefore yields a block's transactions in ascending id order.

use sled::{Db, Tree};
use std::path::Path;

use crate::transaction::{HashParseError, ValidationError};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored row no longer builds into a valid transaction.
    #[error("corrupted ledger row {key}: {source}")]
    Corrupted {
        key: String,
        #[source]
        source: ValidationError,
    },

    /// An index entry points at a row that does not exist.
    #[error("dangling index entry {key}")]
    DanglingIndex { key: String },

    #[error("transaction {id} is already stored")]
    DuplicateTransaction { id: u64 },

    #[error("transaction {id} has no block placement")]
    NotInBlock { id: u64 },

    #[error("invalid full hash: {0}")]
    InvalidHash(#[from] HashParseError),

    /// The batch committed but could not be flushed to disk. Retrying the
    /// same batch reports `DuplicateTransaction`.
    #[error("batch committed but not flushed: {0}")]
    NotDurable(#[source] sled::Error),
}

impl DbError {
    /// Whether the ledger can no longer be trusted to serve queries.
    ///
    /// Storage failures and corruption are fatal; rejected input is not.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Sled(_)
                | Self::Serialization(_)
                | Self::Corrupted { .. }
                | Self::DanglingIndex { .. }
                | Self::NotDurable(_)
        )
    }
}

pub type DbResult<T> = Result<T, DbError>;

pub(crate) fn serialization(err: bincode::Error) -> DbError {
    DbError::Serialization(err.to_string())
}

// ---------------------------------------------------------------------------
// LedgerDb
// ---------------------------------------------------------------------------

/// Persistent ledger storage.
///
/// # Thread Safety
///
/// sled trees support concurrent reads and serialized writes, so a
/// `LedgerDb` can be cloned or shared via `Arc` across threads without
/// external locking.
#[derive(Debug, Clone)]
pub struct LedgerDb {
    db: Db,
    transactions: Tree,
    transaction_hashes: Tree,
    block_transactions: Tree,
}

/// Tree handles borrowed for the duration of one store call.
#[derive(Debug, Clone)]
pub(crate) struct TransactionTables {
    pub transactions: Tree,
    pub transaction_hashes: Tree,
    pub block_transactions: Tree,
}

impl LedgerDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// In-memory database removed when the last handle is dropped.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let transactions = db.open_tree("transactions")?;
        let transaction_hashes = db.open_tree("transaction_hashes")?;
        let block_transactions = db.open_tree("block_transactions")?;

        Ok(Self {
            db,
            transactions,
            transaction_hashes,
            block_transactions,
        })
    }

    /// Handles scoped to a single operation; released when dropped.
    pub(crate) fn tables(&self) -> TransactionTables {
        TransactionTables {
            transactions: self.transactions.clone(),
            transaction_hashes: self.transaction_hashes.clone(),
            block_transactions: self.block_transactions.clone(),
        }
    }

    /// Number of stored transactions.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Block until all pending writes are durable.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_temporary_database() {
        let db = LedgerDb::open_temporary().expect("should create temp db");
        assert_eq!(db.transaction_count(), 0);
    }

    #[test]
    fn open_persistent_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = LedgerDb::open(dir.path()).expect("should open db");
        db.tables()
            .transactions
            .insert(7u64.to_be_bytes(), &b"row"[..])
            .unwrap();
        db.flush().unwrap();
        drop(db);

        let reopened = LedgerDb::open(dir.path()).expect("should reopen db");
        assert_eq!(reopened.transaction_count(), 1);
    }

    #[test]
    fn fatal_classification() {
        let corrupted = DbError::Corrupted {
            key: "1".into(),
            source: ValidationError::InconsistentEcBlock,
        };
        assert!(corrupted.is_fatal());
        assert!(DbError::DanglingIndex { key: "x".into() }.is_fatal());
        assert!(!DbError::DuplicateTransaction { id: 1 }.is_fatal());
        assert!(!DbError::NotInBlock { id: 1 }.is_fatal());
        assert!(DbError::NotDurable(sled::Error::Unsupported("flush".into())).is_fatal());
    }
}
