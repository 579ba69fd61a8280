//! # Storage Module
//!
//! Persistence of confirmed transactions in an embedded sled database.
//!
//! ```text
//! db.rs           : LedgerDb: sled handle, named trees, DbError
//! transactions.rs : TransactionRow and the TransactionStore lookups
//! ```
//!
//! Rows are bincode-encoded. Index trees map full hashes and block ids to
//! transaction ids; all three trees are written in one sled transaction
//! per `save_all` call.

pub mod db;
pub mod transactions;

pub use db::{DbError, DbResult, LedgerDb};
pub use transactions::{TransactionRow, TransactionStore};
