// Copyright (c) 2026 Tessera Contributors. MIT License.
// See LICENSE for details.

//! # Tessera Ledger Node
//!
//! Entry point for the `tessera-node` binary. Parses CLI arguments,
//! initializes logging, and runs one command against the transaction
//! codec or the ledger store.
//!
//! - `decode`  : parse network bytes, print the transaction or the rejection
//! - `import`  : parse transactions and save them as one block
//! - `show`    : print a stored transaction by id or full hash
//! - `block`   : list a block's transactions in ascending id order
//! - `version` : print build version information
//!
//! Command output goes to stdout as JSON; logs go to stderr. A fatal
//! store error (I/O failure or a corrupted row) is logged and ends the
//! process with a non-zero status.

mod cli;
mod logging;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;

use tessera_protocol::storage::{DbResult, LedgerDb, TransactionStore};
use tessera_protocol::time::to_utc;
use tessera_protocol::transaction::{Transaction, TransactionBuilder};

use cli::{BlockArgs, Commands, DecodeArgs, ImportArgs, ShowArgs, StoreArgs, TesseraNodeCli};

fn main() -> Result<()> {
    let cli = TesseraNodeCli::parse();
    logging::init_logging(cli.log_format);

    match cli.command {
        Commands::Decode(args) => decode(args),
        Commands::Import(args) => import(args),
        Commands::Show(args) => show(args),
        Commands::Block(args) => list_block(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// JSON rendering of a transaction with its epoch times also shown as
/// UTC dates.
#[derive(Serialize)]
struct TransactionView<'a> {
    #[serde(flatten)]
    transaction: &'a Transaction,
    timestamp_utc: Option<DateTime<Utc>>,
    block_timestamp_utc: Option<DateTime<Utc>>,
    size: usize,
}

impl<'a> TransactionView<'a> {
    fn new(transaction: &'a Transaction) -> Self {
        Self {
            transaction,
            timestamp_utc: to_utc(transaction.timestamp()),
            block_timestamp_utc: transaction
                .block()
                .and_then(|block| to_utc(block.block_timestamp)),
            size: transaction.size(),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to render JSON")?;
    println!("{json}");
    Ok(())
}

fn parse_hex_transaction(input: &str) -> Result<Transaction> {
    let bytes = hex::decode(input.trim()).context("transaction is not valid hex")?;
    Transaction::from_bytes(&bytes).context("transaction rejected")
}

fn open_store(args: &StoreArgs) -> Result<TransactionStore> {
    let path = args.ledger_path();
    std::fs::create_dir_all(&path)
        .with_context(|| format!("failed to create ledger directory: {}", path.display()))?;
    let db = checked(LedgerDb::open(&path))
        .with_context(|| format!("failed to open ledger at {}", path.display()))?;
    tracing::info!(path = %path.display(), transactions = db.transaction_count(), "ledger opened");
    Ok(TransactionStore::new(db))
}

/// Convert a store result, logging fatal errors before they end the process.
fn checked<T>(result: DbResult<T>) -> Result<T> {
    result.map_err(|err| {
        if err.is_fatal() {
            tracing::error!(error = %err, "fatal ledger error, stopping");
        }
        anyhow!(err)
    })
}

fn decode(args: DecodeArgs) -> Result<()> {
    let tx = parse_hex_transaction(&args.hex)?;
    tracing::info!(id = tx.id(), kind = %tx.transaction_type(), "transaction decoded");
    print_json(&TransactionView::new(&tx))
}

fn import(args: ImportArgs) -> Result<()> {
    let store = open_store(&args.store)?;

    let mut batch = Vec::with_capacity(args.transactions.len());
    for (index, input) in args.transactions.iter().enumerate() {
        let tx = parse_hex_transaction(input)
            .with_context(|| format!("transaction #{index} of the batch"))?;
        let placed = TransactionBuilder::from_transaction(&tx)
            .block(args.block_id, args.height, args.block_timestamp)
            .build()
            .with_context(|| format!("failed to place transaction {} in block", tx.id()))?;
        batch.push(placed);
    }

    checked(store.save_all(&batch)).context("failed to save block transactions")?;
    tracing::info!(block_id = args.block_id, count = batch.len(), "block transactions imported");

    #[derive(Serialize)]
    struct Imported {
        block_id: u64,
        height: u32,
        ids: Vec<u64>,
    }
    print_json(&Imported {
        block_id: args.block_id,
        height: args.height,
        ids: batch.iter().map(Transaction::id).collect(),
    })
}

fn show(args: ShowArgs) -> Result<()> {
    let store = open_store(&args.store)?;
    let found = match (args.id, args.full_hash.as_deref()) {
        (Some(id), _) => checked(store.find_by_id(id))?,
        (None, Some(hash)) => checked(store.find_by_full_hash_hex(hash))?,
        (None, None) => bail!("either --id or --full-hash is required"),
    };
    let Some(tx) = found else {
        bail!("transaction not found");
    };
    print_json(&TransactionView::new(&tx))
}

fn list_block(args: BlockArgs) -> Result<()> {
    let store = open_store(&args.store)?;
    let transactions = checked(store.find_by_block(args.block_id))?;
    let views: Vec<TransactionView<'_>> = transactions.iter().map(TransactionView::new).collect();
    print_json(&views)
}

/// Prints version information to stdout.
fn print_version() {
    println!("tessera-node {}", env!("CARGO_PKG_VERSION"));
    println!(
        "transaction version {}",
        tessera_protocol::config::CURRENT_TRANSACTION_VERSION
    );
}
