// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Node
//!
//! Append-only ledger hosting the record program. The node keeps three
//! things per committed operation:
//!
//! - the successor record state (tiny, authoritative)
//! - a transaction entry with its log lines (bulk fragment data lives here)
//! - an address-history index entry so the logs can be found again
//!
//! Logs are not indexed by content. A client that wants its fragments back
//! lists the address history and replays every transaction's logs.

pub mod database;
pub mod retention;

use std::path::Path;

use crate::program::{
    Authority, OpId, ProgramError, Receipt, Record, RecordAddress, SignedOperation,
    TransactionSummary,
};

pub use database::{LedgerDatabase, StoredTransaction};
pub use retention::LogRetention;

/// Largest history page served in one call.
pub const MAX_HISTORY_PAGE: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Program(#[from] ProgramError),

    #[error("duplicate operation: {0}")]
    DuplicateOperation(String),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// The ledger node: the record program plus its persistent log.
pub struct Ledger {
    db: LedgerDatabase,
}

impl Ledger {
    /// Open (or create) a ledger stored at `path`.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        let db = LedgerDatabase::open(path)?;
        tracing::info!(path = %path.display(), "Ledger opened");
        Ok(Self { db })
    }

    /// Verify, execute and commit a signed operation.
    pub fn submit(&self, signed: &SignedOperation) -> LedgerResult<Receipt> {
        let now = chrono::Utc::now().timestamp();
        let instruction = signed.operation.instruction.name();
        let address = signed.operation.record;

        match self.db.apply(signed, now) {
            Ok(receipt) => {
                tracing::debug!(
                    %address,
                    instruction,
                    slot = receipt.slot,
                    op_id = %receipt.op_id,
                    "Operation committed"
                );
                Ok(receipt)
            }
            Err(e) => {
                tracing::info!(%address, instruction, error = %e, "Operation rejected");
                Err(e)
            }
        }
    }

    pub fn record(&self, address: &RecordAddress) -> LedgerResult<Option<Record>> {
        self.db.get_record(address)
    }

    /// Records of one authority, newest first.
    pub fn records_by_authority(&self, authority: &Authority) -> LedgerResult<Vec<Record>> {
        self.db.records_by_authority(authority)
    }

    /// One page of an address's history, newest first. `limit` is capped at
    /// [`MAX_HISTORY_PAGE`].
    pub fn history(
        &self,
        address: &RecordAddress,
        before: Option<u64>,
        limit: usize,
    ) -> LedgerResult<Vec<TransactionSummary>> {
        self.db.history(address, before, limit.min(MAX_HISTORY_PAGE))
    }

    pub fn transaction(&self, op_id: &OpId) -> LedgerResult<Option<StoredTransaction>> {
        self.db.get_transaction(op_id)
    }

    /// Drop logs of transactions more than `retain_slots` slots old.
    pub fn prune_logs(&self, retain_slots: u64) -> LedgerResult<usize> {
        let cutoff = self.db.next_slot()?.saturating_sub(retain_slots);
        let pruned = self.db.prune_logs_before(cutoff)?;
        if pruned > 0 {
            tracing::info!(cutoff, pruned, "Pruned expired transaction logs");
        }
        Ok(pruned)
    }

    /// Read the slot counter to prove the database answers.
    pub fn health_check(&self) -> LedgerResult<u64> {
        self.db.next_slot()
    }

    pub fn transaction_count(&self) -> LedgerResult<u64> {
        self.db.transaction_count()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::program::{find_record_address, Instruction, LedgerEvent};

    fn temp_ledger() -> (tempfile::TempDir, Ledger) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::open(&dir.path().join("ledger.redb")).unwrap();
        (dir, ledger)
    }

    fn program_error(result: LedgerResult<Receipt>) -> ProgramError {
        match result {
            Err(LedgerError::Program(e)) => e,
            other => panic!("expected program error, got {other:?}"),
        }
    }

    #[test]
    fn lifecycle_commits_record_and_logs() {
        let (_dir, ledger) = temp_ledger();
        let owner_key = key(1);
        let owner = authority_of(&owner_key);
        let (address, proof) = find_record_address(&owner, "photo").unwrap();

        ledger.submit(&signed(&owner_key, &owner, "photo", create("photo", 2))).unwrap();
        ledger.submit(&signed(&owner_key, &owner, "photo", append(0, b"ab"))).unwrap();
        let second = ledger
            .submit(&signed(&owner_key, &owner, "photo", append(1, b"cd")))
            .unwrap();
        ledger.submit(&signed(&owner_key, &owner, "photo", Instruction::Seal)).unwrap();

        let record = ledger.record(&address).unwrap().unwrap();
        assert!(record.sealed);
        assert_eq!(record.chunks_uploaded, 2);
        assert_eq!(record.address_proof, proof);

        let logs = ledger.transaction(&second.op_id).unwrap().unwrap().logs.unwrap();
        assert_eq!(
            LedgerEvent::parse_logs(&logs),
            vec![LedgerEvent::FragmentAppended {
                authority: owner,
                name: "photo".to_string(),
                index: 1,
                data: b"cd".to_vec(),
            }]
        );
        assert_eq!(ledger.transaction_count().unwrap(), 4);
    }

    #[test]
    fn rejected_operation_leaves_state_untouched() {
        let (_dir, ledger) = temp_ledger();
        let owner_key = key(1);
        let owner = authority_of(&owner_key);
        let (address, _) = find_record_address(&owner, "seq").unwrap();

        ledger.submit(&signed(&owner_key, &owner, "seq", create("seq", 3))).unwrap();
        let before = ledger.record(&address).unwrap();
        let slot_before = ledger.health_check().unwrap();

        let err = program_error(ledger.submit(&signed(&owner_key, &owner, "seq", append(1, b"x"))));
        assert_eq!(err, ProgramError::InvalidFragmentIndex);
        assert_eq!(ledger.record(&address).unwrap(), before);
        assert_eq!(ledger.health_check().unwrap(), slot_before);
        assert_eq!(ledger.history(&address, None, 10).unwrap().len(), 1);
    }

    #[test]
    fn recreate_fails_without_overwrite() {
        let (_dir, ledger) = temp_ledger();
        let owner_key = key(1);
        let owner = authority_of(&owner_key);
        let (address, _) = find_record_address(&owner, "dup").unwrap();

        ledger.submit(&signed(&owner_key, &owner, "dup", create("dup", 2))).unwrap();
        let err = program_error(ledger.submit(&signed(&owner_key, &owner, "dup", create("dup", 9))));
        assert_eq!(err, ProgramError::RecordExists);
        assert_eq!(ledger.record(&address).unwrap().unwrap().total_chunks, 2);
    }

    #[test]
    fn foreign_signer_cannot_append_or_seal() {
        let (_dir, ledger) = temp_ledger();
        let owner_key = key(1);
        let intruder_key = key(2);
        let owner = authority_of(&owner_key);

        ledger.submit(&signed(&owner_key, &owner, "mine", create("mine", 1))).unwrap();

        let err = program_error(ledger.submit(&signed(&intruder_key, &owner, "mine", append(0, b"x"))));
        assert_eq!(err, ProgramError::Unauthorized);
        let err = program_error(ledger.submit(&signed(&intruder_key, &owner, "mine", Instruction::Seal)));
        assert_eq!(err, ProgramError::Unauthorized);
    }

    #[test]
    fn forged_signature_is_rejected() {
        let (_dir, ledger) = temp_ledger();
        let owner_key = key(1);
        let owner = authority_of(&owner_key);

        let mut op = signed(&owner_key, &owner, "forged", create("forged", 1));
        op.signature[10] ^= 0xFF;
        let err = program_error(ledger.submit(&op));
        assert_eq!(err, ProgramError::InvalidSignature);
    }

    #[test]
    fn history_pages_newest_first() {
        let (_dir, ledger) = temp_ledger();
        let owner_key = key(1);
        let owner = authority_of(&owner_key);
        let (address, _) = find_record_address(&owner, "paged").unwrap();

        ledger.submit(&signed(&owner_key, &owner, "paged", create("paged", 4))).unwrap();
        for index in 0..4 {
            ledger
                .submit(&signed(&owner_key, &owner, "paged", append(index, &[index as u8])))
                .unwrap();
        }
        // unrelated record interleaved in the global slot order
        ledger.submit(&signed(&owner_key, &owner, "other", create("other", 1))).unwrap();

        let all = ledger.history(&address, None, 100).unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|w| w[0].slot > w[1].slot));
        assert_eq!(all.last().unwrap().instruction, "Create");

        let first_page = ledger.history(&address, None, 2).unwrap();
        let second_page = ledger
            .history(&address, Some(first_page[1].slot), 2)
            .unwrap();
        assert_eq!(first_page, all[0..2]);
        assert_eq!(second_page, all[2..4]);
        assert!(ledger.history(&address, Some(0), 10).unwrap().is_empty());
    }

    #[test]
    fn prune_drops_old_logs_but_keeps_history() {
        let (_dir, ledger) = temp_ledger();
        let owner_key = key(1);
        let owner = authority_of(&owner_key);
        let (address, _) = find_record_address(&owner, "old").unwrap();

        let created = ledger.submit(&signed(&owner_key, &owner, "old", create("old", 2))).unwrap();
        let first = ledger.submit(&signed(&owner_key, &owner, "old", append(0, b"a"))).unwrap();
        let second = ledger.submit(&signed(&owner_key, &owner, "old", append(1, b"b"))).unwrap();

        // next_slot is 3; keep only the newest slot
        assert_eq!(ledger.prune_logs(1).unwrap(), 2);
        assert!(ledger.transaction(&created.op_id).unwrap().unwrap().logs.is_none());
        assert!(ledger.transaction(&first.op_id).unwrap().unwrap().logs.is_none());
        assert!(ledger.transaction(&second.op_id).unwrap().unwrap().logs.is_some());
        assert_eq!(ledger.history(&address, None, 10).unwrap().len(), 3);
        assert_eq!(ledger.prune_logs(1).unwrap(), 0);
    }

    #[test]
    fn records_by_authority_lists_only_owned_records() {
        let (_dir, ledger) = temp_ledger();
        let a_key = key(1);
        let b_key = key(2);
        let a = authority_of(&a_key);
        let b = authority_of(&b_key);

        ledger.submit(&signed(&a_key, &a, "a1", create("a1", 1))).unwrap();
        ledger.submit(&signed(&a_key, &a, "a2", create("a2", 1))).unwrap();
        ledger.submit(&signed(&b_key, &b, "b1", create("b1", 1))).unwrap();

        let mine = ledger.records_by_authority(&a).unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|r| r.authority == a));
    }

    #[test]
    fn unusable_data_dir_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        match Ledger::open(&blocker.join("nested").join("ledger.redb")) {
            Err(LedgerError::Io(_)) => {}
            Err(other) => panic!("expected I/O error, got {other:?}"),
            Ok(_) => panic!("ledger opened under a regular file"),
        }
    }
}
