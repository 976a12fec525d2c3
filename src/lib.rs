// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger Vault - Encrypted Blobs on an Append-Only Ledger
//!
//! A blob is encrypted under a key derived from the owner's signature,
//! split into fragments and written to the ledger one transaction at a
//! time. Record state only tracks progress; the fragment bytes live in the
//! transaction logs, and reading a blob back means replaying them.
//!
//! ## Modules
//!
//! - `program` - Record state machine, addresses, events, error codes
//! - `ledger` - redb-backed ledger node hosting the program
//! - `crypto` - Signature-derived keys, ChaCha20-Poly1305
//! - `chunker` - Fragment splitting and joining
//! - `client` - Ledger and signer collaborators (local and HTTP)
//! - `vault` - Upload and retrieval protocols
//! - `api` - HTTP API handlers (Axum)

pub mod api;
pub mod chunker;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod program;
pub mod state;
pub mod vault;
