// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `records`: record address → serialized Record
//! - `transactions`: op_id → serialized StoredTransaction (logs included)
//! - `address_history`: composite key (address|!slot) → op_id
//! - `ledger_state`: key → value (slot counter)
//!
//! Every operation runs inside a single write transaction. redb admits one
//! writer at a time, which gives each operation a single, ordered
//! application against the state it validated.

use std::path::Path;

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::{Deserialize, Serialize};

use crate::program::events::LOG_INSTRUCTION_PREFIX;
use crate::program::{
    execute, Authority, OpId, Receipt, Record, RecordAddress, SignedOperation, TransactionSummary,
};

use super::{LedgerError, LedgerResult};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary state: record address → serialized Record (JSON bytes).
const RECORDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("records");

/// Committed transactions: op_id → serialized StoredTransaction (JSON bytes).
const TRANSACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");

/// Index: composite key → op_id.
/// Key format: `address | !slot_be` for newest-first range scans.
const ADDRESS_HISTORY: TableDefinition<&[u8], &str> = TableDefinition::new("address_history");

/// Ledger state: key → value (e.g., "next_slot").
const LEDGER_STATE: TableDefinition<&str, u64> = TableDefinition::new("ledger_state");

const NEXT_SLOT_KEY: &str = "next_slot";

/// A committed transaction as kept by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub op_id: OpId,
    pub slot: u64,
    pub signer: Authority,
    pub address: RecordAddress,
    pub instruction: String,
    pub committed_at: i64,
    /// `None` once dropped by log retention
    pub logs: Option<Vec<String>>,
}

impl StoredTransaction {
    pub fn summary(&self) -> TransactionSummary {
        TransactionSummary {
            op_id: self.op_id.clone(),
            slot: self.slot,
            instruction: self.instruction.clone(),
            committed_at: self.committed_at,
        }
    }
}

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key for the address_history table.
///
/// The inverted slot ensures newest-first ordering when scanning forward.
fn make_history_key(address: &RecordAddress, slot: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(32 + 8);
    key.extend_from_slice(address.as_bytes());
    key.extend_from_slice(&(!slot).to_be_bytes());
    key
}

// =============================================================================
// LedgerDatabase
// =============================================================================

/// Embedded ACID ledger database.
pub struct LedgerDatabase {
    db: Database,
}

impl LedgerDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECORDS)?;
            let _ = write_txn.open_table(TRANSACTIONS)?;
            let _ = write_txn.open_table(ADDRESS_HISTORY)?;
            let _ = write_txn.open_table(LEDGER_STATE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Operation application
    // =========================================================================

    /// Validate and commit one signed operation.
    ///
    /// A rejected operation aborts the write transaction, so the record,
    /// history and slot counter are exactly as they were before the attempt.
    pub fn apply(&self, signed: &SignedOperation, now: i64) -> LedgerResult<Receipt> {
        signed.verify()?;
        let op_id = signed.op_id()?;

        let write_txn = self.db.begin_write()?;
        match stage(&write_txn, signed, op_id, now) {
            Ok(receipt) => {
                write_txn.commit()?;
                Ok(receipt)
            }
            Err(e) => {
                write_txn.abort()?;
                Err(e)
            }
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Look up the record stored at an address.
    pub fn get_record(&self, address: &RecordAddress) -> LedgerResult<Option<Record>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;
        match table.get(address.as_bytes().as_slice())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All records owned by `authority`, newest first.
    pub fn records_by_authority(&self, authority: &Authority) -> LedgerResult<Vec<Record>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;

        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let record: Record = serde_json::from_slice(value.value())?;
            if &record.authority == authority {
                records.push(record);
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(records)
    }

    /// Look up a committed transaction by id.
    pub fn get_transaction(&self, op_id: &OpId) -> LedgerResult<Option<StoredTransaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS)?;
        match table.get(op_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Paginated history of an address, newest first.
    ///
    /// `before` restricts the page to slots strictly below it.
    pub fn history(
        &self,
        address: &RecordAddress,
        before: Option<u64>,
        limit: usize,
    ) -> LedgerResult<Vec<TransactionSummary>> {
        let newest = match before {
            Some(0) => return Ok(Vec::new()),
            Some(slot) => slot - 1,
            None => u64::MAX,
        };
        let start = make_history_key(address, newest);
        let end = make_history_key(address, 0);

        let read_txn = self.db.begin_read()?;
        let history = read_txn.open_table(ADDRESS_HISTORY)?;
        let transactions = read_txn.open_table(TRANSACTIONS)?;

        let mut results = Vec::with_capacity(limit.min(1024));
        for entry in history.range(start.as_slice()..=end.as_slice())? {
            if results.len() >= limit {
                break;
            }
            let (_, op_id) = entry?;
            if let Some(value) = transactions.get(op_id.value())? {
                let tx: StoredTransaction = serde_json::from_slice(value.value())?;
                results.push(tx.summary());
            }
        }
        Ok(results)
    }

    /// Slot the next committed operation will receive.
    pub fn next_slot(&self) -> LedgerResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LEDGER_STATE)?;
        Ok(table.get(NEXT_SLOT_KEY)?.map(|v| v.value()).unwrap_or(0))
    }

    /// Number of committed transactions.
    pub fn transaction_count(&self) -> LedgerResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS)?;
        Ok(table.len()?)
    }

    // =========================================================================
    // Log retention
    // =========================================================================

    /// Drop the logs of every transaction with a slot below `cutoff`.
    ///
    /// History entries and records are untouched. Returns the number of
    /// transactions whose logs were dropped.
    pub fn prune_logs_before(&self, cutoff: u64) -> LedgerResult<usize> {
        let write_txn = self.db.begin_write()?;
        let pruned = {
            let mut table = write_txn.open_table(TRANSACTIONS)?;

            let mut expired = Vec::new();
            for entry in table.iter()? {
                let (_, value) = entry?;
                let tx: StoredTransaction = serde_json::from_slice(value.value())?;
                if tx.slot < cutoff && tx.logs.is_some() {
                    expired.push(tx);
                }
            }

            for mut tx in expired.iter().cloned() {
                tx.logs = None;
                let json = serde_json::to_vec(&tx)?;
                table.insert(tx.op_id.as_str(), json.as_slice())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        Ok(pruned)
    }
}

/// Run the program against the state visible to `write_txn` and stage the
/// resulting writes. Nothing is visible until the caller commits.
fn stage(
    write_txn: &WriteTransaction,
    signed: &SignedOperation,
    op_id: OpId,
    now: i64,
) -> LedgerResult<Receipt> {
    let operation = &signed.operation;
    let address = operation.record;
    let key = address.as_bytes().as_slice();

    let mut records = write_txn.open_table(RECORDS)?;
    let existing: Option<Record> = match records.get(key)? {
        Some(value) => Some(serde_json::from_slice(value.value())?),
        None => None,
    };

    let transition = execute(existing.as_ref(), operation, now)?;

    let mut state = write_txn.open_table(LEDGER_STATE)?;
    let slot = state.get(NEXT_SLOT_KEY)?.map(|v| v.value()).unwrap_or(0);
    state.insert(NEXT_SLOT_KEY, slot + 1)?;

    let mut logs = Vec::with_capacity(1 + transition.events.len());
    logs.push(format!("{LOG_INSTRUCTION_PREFIX}{}", operation.instruction.name()));
    for event in &transition.events {
        logs.push(event.to_log_line()?);
    }

    let stored = StoredTransaction {
        op_id: op_id.clone(),
        slot,
        signer: operation.signer,
        address,
        instruction: operation.instruction.name().to_string(),
        committed_at: now,
        logs: Some(logs),
    };

    let mut transactions = write_txn.open_table(TRANSACTIONS)?;
    if transactions.get(op_id.as_str())?.is_some() {
        return Err(LedgerError::DuplicateOperation(op_id.to_string()));
    }
    transactions.insert(op_id.as_str(), serde_json::to_vec(&stored)?.as_slice())?;

    let record_json = serde_json::to_vec(&transition.record)?;
    records.insert(key, record_json.as_slice())?;

    let mut history = write_txn.open_table(ADDRESS_HISTORY)?;
    history.insert(make_history_key(&address, slot).as_slice(), op_id.as_str())?;

    Ok(Receipt { op_id, slot })
}
