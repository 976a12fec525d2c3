// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger-resident record state.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::address::Authority;

/// Upload metadata kept in account state. Fragment bytes never live here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Record {
    /// Identity that must sign every mutation
    #[schema(value_type = String)]
    pub authority: Authority,
    /// Logical name, unique per authority
    pub name: String,
    /// Number of fragments announced at creation
    pub total_chunks: u32,
    /// Fragments committed so far
    pub chunks_uploaded: u32,
    /// One-way terminal flag
    pub sealed: bool,
    /// MIME type of the plaintext
    pub content_type: String,
    /// Unix seconds at creation
    pub created_at: i64,
    /// Derivation nonce of the record address
    pub address_proof: u8,
}

impl Record {
    /// All announced fragments have been appended.
    pub fn is_complete(&self) -> bool {
        self.chunks_uploaded == self.total_chunks
    }

    /// Index the next append must carry.
    pub fn next_index(&self) -> u32 {
        self.chunks_uploaded
    }
}
