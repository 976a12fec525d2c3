// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rejections raised by the record program.

use std::fmt;

use serde::Serialize;

/// Broad category of a failure, shared by ledger and client errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Size or count limits violated. Rejected before any mutation.
    Validation,
    /// Fragment index does not extend the sequence.
    Sequence,
    /// Operation not valid in the record's current state.
    State,
    /// Signer is not allowed to touch the record.
    Authorization,
    /// Data failed authentication or reconstruction.
    Integrity,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorClass::Validation => "validation",
            ErrorClass::Sequence => "sequence",
            ErrorClass::State => "state",
            ErrorClass::Authorization => "authorization",
            ErrorClass::Integrity => "integrity",
        };
        f.write_str(label)
    }
}

/// Program error codes.
///
/// Variants carry no payload so that a code survives a trip over the wire
/// and back through [`ProgramError::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    #[error("Record name exceeds maximum length of 64 bytes")]
    NameTooLong,

    #[error("Total chunks must be greater than zero")]
    ZeroChunks,

    #[error("Total chunks exceeds maximum of 10,000")]
    TooManyChunks,

    #[error("Fragment data exceeds maximum size of 900 bytes")]
    FragmentTooLarge,

    #[error("Fragment data must not be empty")]
    EmptyFragment,

    #[error("Fragment index does not match expected next fragment")]
    InvalidFragmentIndex,

    #[error("Record is already sealed")]
    AlreadySealed,

    #[error("Not all fragments have been uploaded")]
    IncompleteUpload,

    #[error("Content type exceeds maximum length of 32 bytes")]
    ContentTypeTooLong,

    #[error("A record with this name already exists for this authority")]
    RecordExists,

    #[error("Record not found")]
    RecordNotFound,

    #[error("Signer is not the record authority")]
    Unauthorized,

    #[error("Operation signature is invalid")]
    InvalidSignature,

    #[error("Operation targets an address not derived from its seeds")]
    AddressMismatch,
}

const ALL: [ProgramError; 14] = [
    ProgramError::NameTooLong,
    ProgramError::ZeroChunks,
    ProgramError::TooManyChunks,
    ProgramError::FragmentTooLarge,
    ProgramError::EmptyFragment,
    ProgramError::InvalidFragmentIndex,
    ProgramError::AlreadySealed,
    ProgramError::IncompleteUpload,
    ProgramError::ContentTypeTooLong,
    ProgramError::RecordExists,
    ProgramError::RecordNotFound,
    ProgramError::Unauthorized,
    ProgramError::InvalidSignature,
    ProgramError::AddressMismatch,
];

impl ProgramError {
    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ProgramError::NameTooLong => "name_too_long",
            ProgramError::ZeroChunks => "zero_chunks",
            ProgramError::TooManyChunks => "too_many_chunks",
            ProgramError::FragmentTooLarge => "fragment_too_large",
            ProgramError::EmptyFragment => "empty_fragment",
            ProgramError::InvalidFragmentIndex => "invalid_fragment_index",
            ProgramError::AlreadySealed => "already_sealed",
            ProgramError::IncompleteUpload => "incomplete_upload",
            ProgramError::ContentTypeTooLong => "content_type_too_long",
            ProgramError::RecordExists => "record_exists",
            ProgramError::RecordNotFound => "record_not_found",
            ProgramError::Unauthorized => "unauthorized",
            ProgramError::InvalidSignature => "invalid_signature",
            ProgramError::AddressMismatch => "address_mismatch",
        }
    }

    /// Inverse of [`error_code`](Self::error_code).
    pub fn from_code(code: &str) -> Option<Self> {
        ALL.into_iter().find(|e| e.error_code() == code)
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ProgramError::NameTooLong
            | ProgramError::ZeroChunks
            | ProgramError::TooManyChunks
            | ProgramError::FragmentTooLarge
            | ProgramError::EmptyFragment
            | ProgramError::ContentTypeTooLong => ErrorClass::Validation,
            ProgramError::InvalidFragmentIndex => ErrorClass::Sequence,
            ProgramError::AlreadySealed
            | ProgramError::IncompleteUpload
            | ProgramError::RecordExists
            | ProgramError::RecordNotFound => ErrorClass::State,
            ProgramError::Unauthorized
            | ProgramError::InvalidSignature
            | ProgramError::AddressMismatch => ErrorClass::Authorization,
        }
    }
}
