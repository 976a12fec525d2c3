// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Record Program
//!
//! Ledger-side state machine for one upload record per `(authority, name)`:
//!
//! ```text
//! Uninitialized --create--> Open(chunks_uploaded < total_chunks)
//!      Open --append_fragment(index == chunks_uploaded)--> Open
//!      Open --seal (chunks_uploaded == total_chunks)--> Sealed
//! ```
//!
//! Only the counter moves in record state. Fragment bytes are emitted as
//! `FragmentAppended` log events and nowhere else.
//!
//! ## Modules
//!
//! - `address` - identities and derived record addresses
//! - `constants` - size limits and derivation seeds
//! - `error` - program error codes and their classes
//! - `events` - log-only events and their log-line encoding
//! - `instructions` - pure transition functions
//! - `operation` - signed operations and transaction metadata
//! - `state` - the record itself

pub mod address;
pub mod constants;
pub mod encoding;
pub mod error;
pub mod events;
pub mod instructions;
pub mod operation;
pub mod state;

pub use address::{
    create_record_address, find_record_address, Authority, ParseKeyError, RecordAddress,
};
pub use error::{ErrorClass, ProgramError};
pub use events::LedgerEvent;
pub use instructions::{execute, Transition};
pub use operation::{Instruction, OpId, Operation, Receipt, SignedOperation, TransactionSummary};
pub use state::Record;
