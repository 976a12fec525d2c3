// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Limits and derivation seeds of the record program.

/// Identifier mixed into every derived record address.
pub const PROGRAM_ID: &[u8] = b"ledger-vault.record.v1";

/// Leading seed of a record address.
pub const SEED_RECORD: &[u8] = b"record";

/// Trailing domain tag of a record address.
pub const ADDRESS_DOMAIN_TAG: &[u8] = b"ProgramDerivedAddress";

/// Largest fragment a single append may carry.
pub const MAX_FRAGMENT_SIZE: usize = 900;

/// Upper bound on the number of fragments of one record.
pub const MAX_TOTAL_CHUNKS: u32 = 10_000;

/// Maximum record name length in bytes.
pub const MAX_NAME_LENGTH: usize = 64;

/// Maximum content type length in bytes.
pub const MAX_CONTENT_TYPE_LENGTH: usize = 32;
