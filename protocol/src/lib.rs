// Copyright (c) 2026 Tessera Contributors. MIT License.
// See LICENSE for details.

//! # Tessera Protocol: Transaction Record Layer
//!
//! The single place where untrusted bytes become typed, validated ledger
//! transactions, and where those transactions are persisted and read back.
//!
//! ## Architecture
//!
//! - **config**: Protocol constants: lengths, size bounds, epoch start.
//! - **crypto**: SHA-256 digests and the id derivations built on them.
//! - **time**: Ledger epoch clock.
//! - **transaction**: Type registry, appendage codec, builder, wire format.
//! - **storage**: sled-backed transaction store.
//!
//! ## Error model
//!
//! Parsing and building return [`transaction::ValidationError`]. Reading a
//! stored row that fails validation is a [`storage::DbError::Corrupted`],
//! which callers must treat as fatal: the ledger's own data disagrees with
//! itself.

pub mod config;
pub mod crypto;
pub mod storage;
pub mod time;
pub mod transaction;
