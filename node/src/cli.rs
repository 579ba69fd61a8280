//! # CLI Interface
//!
//! Defines the command-line argument structure for `tessera-node` using
//! `clap` derive. Subcommands: `decode`, `import`, `show`, `block` and
//! `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Tessera ledger node.
///
/// Decodes network transaction bytes and reads or writes the node's
/// transaction store.
#[derive(Parser, Debug)]
#[command(
    name = "tessera-node",
    about = "Tessera ledger node",
    version,
    propagate_version = true
)]
pub struct TesseraNodeCli {
    /// Log output format.
    #[arg(
        long,
        global = true,
        value_enum,
        env = "TESSERA_LOG_FORMAT",
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse hex-encoded transaction bytes and print the result as JSON.
    Decode(DecodeArgs),
    /// Parse transactions and store them as the contents of one block.
    Import(ImportArgs),
    /// Print one stored transaction.
    Show(ShowArgs),
    /// List the stored transactions of a block.
    Block(BlockArgs),
    /// Print version information and exit.
    Version,
}

/// Location of the ledger database.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Node data directory; the ledger lives in `<data-dir>/ledger`.
    #[arg(long, short = 'd', env = "TESSERA_DATA_DIR", default_value = ".tessera")]
    pub data_dir: PathBuf,
}

impl StoreArgs {
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger")
    }
}

/// Arguments for the `decode` subcommand.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex-encoded transaction bytes.
    pub hex: String,
}

/// Arguments for the `import` subcommand.
#[derive(Args, Debug)]
pub struct ImportArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Id of the block the transactions belong to.
    #[arg(long)]
    pub block_id: u64,

    /// Height of that block.
    #[arg(long)]
    pub height: u32,

    /// Block timestamp, seconds since the ledger epoch.
    #[arg(long)]
    pub block_timestamp: u32,

    /// Hex-encoded transaction bytes, one argument per transaction.
    #[arg(required = true)]
    pub transactions: Vec<String>,
}

/// Arguments for the `show` subcommand.
#[derive(Args, Debug)]
#[command(group = clap::ArgGroup::new("key").required(true).args(["id", "full_hash"]))]
pub struct ShowArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Numeric transaction id.
    #[arg(long)]
    pub id: Option<u64>,

    /// Full hash as 64 hex characters.
    #[arg(long)]
    pub full_hash: Option<String>,
}

/// Arguments for the `block` subcommand.
#[derive(Args, Debug)]
pub struct BlockArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Block id to list.
    #[arg(long)]
    pub block_id: u64,
}
