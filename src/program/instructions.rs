// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Record transitions.
//!
//! Each transition is a pure function of the stored record (if any), the
//! signer and the instruction. It either returns the complete successor
//! record together with the events to log, or an error and no successor at
//! all; the ledger commits the successor atomically or nothing.

use super::address::{create_record_address, find_record_address, Authority, RecordAddress};
use super::constants::*;
use super::error::ProgramError;
use super::events::LedgerEvent;
use super::operation::{Instruction, Operation};
use super::state::Record;

/// Successor state produced by a valid instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub record: Record,
    pub events: Vec<LedgerEvent>,
}

/// Validate and apply `operation` against the record currently stored at
/// `operation.record`.
pub fn execute(
    existing: Option<&Record>,
    operation: &Operation,
    now: i64,
) -> Result<Transition, ProgramError> {
    match &operation.instruction {
        Instruction::Create {
            name,
            total_chunks,
            content_type,
        } => create(
            existing,
            &operation.signer,
            &operation.record,
            name,
            *total_chunks,
            content_type,
            now,
        ),
        Instruction::AppendFragment { index, data } => {
            let record = existing.ok_or(ProgramError::RecordNotFound)?;
            append_fragment(record, &operation.signer, &operation.record, *index, data)
        }
        Instruction::Seal => {
            let record = existing.ok_or(ProgramError::RecordNotFound)?;
            seal(record, &operation.signer, &operation.record)
        }
    }
}

/// Open a new record for `(signer, name)`.
pub fn create(
    existing: Option<&Record>,
    signer: &Authority,
    target: &RecordAddress,
    name: &str,
    total_chunks: u32,
    content_type: &str,
    now: i64,
) -> Result<Transition, ProgramError> {
    if name.len() > MAX_NAME_LENGTH {
        return Err(ProgramError::NameTooLong);
    }
    if total_chunks == 0 {
        return Err(ProgramError::ZeroChunks);
    }
    if total_chunks > MAX_TOTAL_CHUNKS {
        return Err(ProgramError::TooManyChunks);
    }
    if content_type.len() > MAX_CONTENT_TYPE_LENGTH {
        return Err(ProgramError::ContentTypeTooLong);
    }

    let (address, address_proof) =
        find_record_address(signer, name).ok_or(ProgramError::AddressMismatch)?;
    if &address != target {
        return Err(ProgramError::AddressMismatch);
    }
    if existing.is_some() {
        return Err(ProgramError::RecordExists);
    }

    let record = Record {
        authority: *signer,
        name: name.to_string(),
        total_chunks,
        chunks_uploaded: 0,
        sealed: false,
        content_type: content_type.to_string(),
        created_at: now,
        address_proof,
    };

    let events = vec![LedgerEvent::RecordCreated {
        authority: record.authority,
        name: record.name.clone(),
        total_chunks,
        content_type: record.content_type.clone(),
    }];

    Ok(Transition { record, events })
}

/// Append fragment `index`, which must be exactly `chunks_uploaded`.
pub fn append_fragment(
    record: &Record,
    signer: &Authority,
    target: &RecordAddress,
    index: u32,
    data: &[u8],
) -> Result<Transition, ProgramError> {
    authorize(record, signer, target)?;

    if record.sealed {
        return Err(ProgramError::AlreadySealed);
    }
    if data.is_empty() {
        return Err(ProgramError::EmptyFragment);
    }
    if data.len() > MAX_FRAGMENT_SIZE {
        return Err(ProgramError::FragmentTooLarge);
    }
    // Also rejects appends past `total_chunks`: once complete, no index
    // can both equal `chunks_uploaded` and stay in range.
    if index != record.chunks_uploaded || index >= record.total_chunks {
        return Err(ProgramError::InvalidFragmentIndex);
    }

    let mut next = record.clone();
    next.chunks_uploaded += 1;

    let events = vec![LedgerEvent::FragmentAppended {
        authority: record.authority,
        name: record.name.clone(),
        index,
        data: data.to_vec(),
    }];

    Ok(Transition {
        record: next,
        events,
    })
}

/// Seal a complete record.
pub fn seal(
    record: &Record,
    signer: &Authority,
    target: &RecordAddress,
) -> Result<Transition, ProgramError> {
    authorize(record, signer, target)?;

    if record.sealed {
        return Err(ProgramError::AlreadySealed);
    }
    if !record.is_complete() {
        return Err(ProgramError::IncompleteUpload);
    }

    let mut next = record.clone();
    next.sealed = true;

    let events = vec![LedgerEvent::RecordSealed {
        authority: record.authority,
        name: record.name.clone(),
        total_chunks: record.total_chunks,
    }];

    Ok(Transition {
        record: next,
        events,
    })
}

/// Signer must own the record, and the record's seeds must reproduce the
/// targeted address.
fn authorize(
    record: &Record,
    signer: &Authority,
    target: &RecordAddress,
) -> Result<(), ProgramError> {
    if &record.authority != signer {
        return Err(ProgramError::Unauthorized);
    }
    match create_record_address(&record.authority, &record.name, record.address_proof) {
        Some(address) if &address == target => Ok(()),
        _ => Err(ProgramError::AddressMismatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    const NOW: i64 = 1_760_000_000;

    fn authority(seed: u8) -> Authority {
        let key = SigningKey::from_slice(&[seed; 32]).unwrap();
        Authority::from_verifying_key(key.verifying_key())
    }

    fn address(owner: &Authority, name: &str) -> RecordAddress {
        find_record_address(owner, name).unwrap().0
    }

    fn open(owner: &Authority, name: &str, total: u32) -> Record {
        create(None, owner, &address(owner, name), name, total, "image/png", NOW)
            .unwrap()
            .record
    }

    #[test]
    fn full_lifecycle_seals_complete_record() {
        let owner = authority(1);
        let target = address(&owner, "test-image-001");
        let created = create(None, &owner, &target, "test-image-001", 3, "image/png", NOW).unwrap();
        assert_eq!(created.record.chunks_uploaded, 0);
        assert!(!created.record.sealed);
        assert_eq!(created.record.created_at, NOW);
        assert!(matches!(created.events[0], LedgerEvent::RecordCreated { total_chunks: 3, .. }));

        let mut record = created.record;
        for index in 0..3 {
            let step = append_fragment(&record, &owner, &target, index, &[index as u8; 10]).unwrap();
            assert_eq!(step.record.chunks_uploaded, index + 1);
            record = step.record;
        }

        let sealed = seal(&record, &owner, &target).unwrap();
        assert!(sealed.record.sealed);
        assert_eq!(sealed.record.chunks_uploaded, 3);
        assert!(matches!(sealed.events[0], LedgerEvent::RecordSealed { total_chunks: 3, .. }));
    }

    #[test]
    fn create_validates_limits() {
        let owner = authority(1);
        let long_name = "n".repeat(MAX_NAME_LENGTH + 1);
        let target = address(&owner, "ok");

        assert_eq!(
            create(None, &owner, &address(&owner, &long_name), &long_name, 1, "a", NOW),
            Err(ProgramError::NameTooLong)
        );
        assert_eq!(
            create(None, &owner, &target, "ok", 0, "a", NOW),
            Err(ProgramError::ZeroChunks)
        );
        assert_eq!(
            create(None, &owner, &target, "ok", MAX_TOTAL_CHUNKS + 1, "a", NOW),
            Err(ProgramError::TooManyChunks)
        );
        assert_eq!(
            create(None, &owner, &target, "ok", 1, &"t".repeat(33), NOW),
            Err(ProgramError::ContentTypeTooLong)
        );
        assert!(create(None, &owner, &target, "ok", MAX_TOTAL_CHUNKS, &"t".repeat(32), NOW).is_ok());
    }

    #[test]
    fn create_never_overwrites() {
        let owner = authority(1);
        let existing = open(&owner, "dup", 2);
        assert_eq!(
            create(Some(&existing), &owner, &address(&owner, "dup"), "dup", 5, "x", NOW),
            Err(ProgramError::RecordExists)
        );
    }

    #[test]
    fn create_rejects_foreign_address() {
        let owner = authority(1);
        let other = authority(2);
        assert_eq!(
            create(None, &owner, &address(&other, "pic"), "pic", 1, "x", NOW),
            Err(ProgramError::AddressMismatch)
        );
    }

    #[test]
    fn out_of_order_append_is_rejected() {
        let owner = authority(1);
        let record = open(&owner, "seq", 3);
        let target = address(&owner, "seq");

        assert_eq!(
            append_fragment(&record, &owner, &target, 1, &[1]),
            Err(ProgramError::InvalidFragmentIndex)
        );
        assert_eq!(record.chunks_uploaded, 0);

        let first = append_fragment(&record, &owner, &target, 0, &[1]).unwrap().record;
        // duplicate of an already committed index
        assert_eq!(
            append_fragment(&first, &owner, &target, 0, &[1]),
            Err(ProgramError::InvalidFragmentIndex)
        );
    }

    #[test]
    fn append_validates_fragment_size() {
        let owner = authority(1);
        let record = open(&owner, "size", 2);
        let target = address(&owner, "size");

        assert_eq!(
            append_fragment(&record, &owner, &target, 0, &[]),
            Err(ProgramError::EmptyFragment)
        );
        assert_eq!(
            append_fragment(&record, &owner, &target, 0, &[0; MAX_FRAGMENT_SIZE + 1]),
            Err(ProgramError::FragmentTooLarge)
        );
        assert!(append_fragment(&record, &owner, &target, 0, &[0; MAX_FRAGMENT_SIZE]).is_ok());
    }

    #[test]
    fn append_beyond_total_is_rejected() {
        let owner = authority(1);
        let target = address(&owner, "full");
        let record = open(&owner, "full", 1);
        let full = append_fragment(&record, &owner, &target, 0, &[1]).unwrap().record;
        assert_eq!(
            append_fragment(&full, &owner, &target, 1, &[1]),
            Err(ProgramError::InvalidFragmentIndex)
        );
    }

    #[test]
    fn seal_requires_completion_and_happens_once() {
        let owner = authority(1);
        let target = address(&owner, "seal");
        let record = open(&owner, "seal", 1);

        assert_eq!(seal(&record, &owner, &target), Err(ProgramError::IncompleteUpload));

        let full = append_fragment(&record, &owner, &target, 0, &[9]).unwrap().record;
        let sealed = seal(&full, &owner, &target).unwrap().record;

        assert_eq!(seal(&sealed, &owner, &target), Err(ProgramError::AlreadySealed));
        assert_eq!(
            append_fragment(&sealed, &owner, &target, 1, &[9]),
            Err(ProgramError::AlreadySealed)
        );
    }

    #[test]
    fn foreign_signer_is_rejected_in_every_state() {
        let owner = authority(1);
        let intruder = authority(2);
        let target = address(&owner, "mine");
        let record = open(&owner, "mine", 1);

        assert_eq!(
            append_fragment(&record, &intruder, &target, 0, &[1]),
            Err(ProgramError::Unauthorized)
        );
        assert_eq!(seal(&record, &intruder, &target), Err(ProgramError::Unauthorized));

        let full = append_fragment(&record, &owner, &target, 0, &[1]).unwrap().record;
        let sealed = seal(&full, &owner, &target).unwrap().record;
        assert_eq!(
            append_fragment(&sealed, &intruder, &target, 1, &[1]),
            Err(ProgramError::Unauthorized)
        );
        assert_eq!(seal(&sealed, &intruder, &target), Err(ProgramError::Unauthorized));
    }

    #[test]
    fn execute_dispatches_and_requires_existing_record() {
        let owner = authority(1);
        let target = address(&owner, "exec");
        let append = Operation::new(
            owner,
            target,
            Instruction::AppendFragment {
                index: 0,
                data: vec![1],
            },
        );
        assert_eq!(execute(None, &append, NOW), Err(ProgramError::RecordNotFound));

        let create_op = Operation::new(
            owner,
            target,
            Instruction::Create {
                name: "exec".to_string(),
                total_chunks: 1,
                content_type: "text/plain".to_string(),
            },
        );
        let created = execute(None, &create_op, NOW).unwrap().record;
        let appended = execute(Some(&created), &append, NOW).unwrap().record;
        let sealed = execute(Some(&appended), &Operation::new(owner, target, Instruction::Seal), NOW)
            .unwrap()
            .record;
        assert!(sealed.sealed);
    }
}
