// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault Protocol
//!
//! Client-side halves of storing a blob on the ledger.
//!
//! ## Upload
//!
//! 1. Sign `encrypt:<name>` and hash the signature into a key.
//! 2. Encrypt the payload, split the ciphertext into 900-byte fragments.
//! 3. `create` the record, `append_fragment` each fragment in order, `seal`.
//!
//! ## Retrieval
//!
//! 1. Fetch the record and require it sealed.
//! 2. Replay the logs of every transaction at the record's address.
//! 3. Order the fragments, join them, re-derive the key, decrypt.

pub mod error;
pub mod retrieve;
pub mod upload;

pub use error::VaultError;
pub use retrieve::{Reconstructor, Retrieved};
pub use upload::{
    generate_name, progress_channel, PreparedUpload, UploadPhase, UploadReceipt, UploadStatus,
    Uploader,
};
