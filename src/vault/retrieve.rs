// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Retrieval: rebuild a sealed upload from its transaction logs.
//!
//! Record state holds no fragment data. The fragments are recovered by
//! listing every transaction that touched the record's address, fetching
//! each transaction's logs and decoding the `FragmentAppended` events.
//! Decryption is the only integrity check; a missing or altered fragment
//! surfaces as an authentication failure if it slips past the index check.

use futures::stream::{self, StreamExt, TryStreamExt};

use super::error::VaultError;
use crate::chunker;
use crate::client::{LedgerClient, MessageSigner};
use crate::crypto;
use crate::program::{find_record_address, Authority, LedgerEvent, Record, RecordAddress};

/// Transaction log fetches kept in flight at once by default.
pub const DEFAULT_LOG_FETCH_CONCURRENCY: usize = 16;

/// A decrypted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieved {
    pub bytes: Vec<u8>,
    /// Content type stored on the record
    pub content_type: String,
    /// Content type the caller asked for
    pub expected_content_type: String,
    pub record: Record,
}

impl Retrieved {
    pub fn content_type_matches(&self) -> bool {
        self.content_type == self.expected_content_type
    }
}

/// Reads uploads back for one signer.
///
/// The signer must be the record's authority, or the derived key will not
/// open the ciphertext.
pub struct Reconstructor<'a, C: ?Sized, S: ?Sized> {
    client: &'a C,
    signer: &'a S,
    concurrency: usize,
}

impl<'a, C, S> Reconstructor<'a, C, S>
where
    C: LedgerClient + ?Sized,
    S: MessageSigner + ?Sized,
{
    pub fn new(client: &'a C, signer: &'a S) -> Self {
        Self {
            client,
            signer,
            concurrency: DEFAULT_LOG_FETCH_CONCURRENCY,
        }
    }

    /// Cap on transaction log fetches in flight at once (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub async fn retrieve(
        &self,
        authority: &Authority,
        name: &str,
        expected_content_type: &str,
    ) -> Result<Retrieved, VaultError> {
        let (address, _) = find_record_address(authority, name)
            .ok_or_else(|| VaultError::NoAddress(name.to_string()))?;

        let record = self
            .client
            .fetch_record(&address)
            .await?
            .ok_or(VaultError::RecordNotFound(address))?;
        if !record.sealed {
            return Err(VaultError::NotSealed(address));
        }

        let logs = fetch_address_logs(self.client, &address, self.concurrency).await?;
        let fragments = collect_fragments(&logs, authority, name, record.total_chunks)?;
        let blob = chunker::join(&fragments);

        let signature = self.signer.sign_message(&crypto::key_message(name)).await?;
        let bytes = {
            let key = crypto::derive_key(&signature);
            crypto::decrypt(&key, &blob)?
        };

        if record.content_type != expected_content_type {
            tracing::warn!(
                %address,
                stored = %record.content_type,
                expected = expected_content_type,
                "Content type differs from the expected one"
            );
        }

        tracing::info!(
            %address,
            name,
            fragments = fragments.len(),
            bytes = bytes.len(),
            "Upload reconstructed"
        );

        Ok(Retrieved {
            bytes,
            content_type: record.content_type.clone(),
            expected_content_type: expected_content_type.to_string(),
            record,
        })
    }
}

/// Logs of every transaction that touched `address`, fetched at most
/// `concurrency` at a time. Unknown or pruned logs are left out.
pub(crate) async fn fetch_address_logs<C: LedgerClient + ?Sized>(
    client: &C,
    address: &RecordAddress,
    concurrency: usize,
) -> Result<Vec<Vec<String>>, VaultError> {
    let history = client.fetch_transaction_history(address).await?;
    let logs: Vec<Option<Vec<String>>> = stream::iter(&history)
        .map(|tx| client.fetch_transaction_logs(&tx.op_id))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let missing_logs = logs.iter().filter(|l| l.is_none()).count();
    if missing_logs > 0 {
        tracing::warn!(%address, missing_logs, "Some transaction logs are unavailable");
    }
    Ok(logs.into_iter().flatten().collect())
}

/// Gather this record's fragments from transaction logs, ordered by index.
///
/// Fails unless the indices are exactly `0..total_chunks`.
pub fn collect_fragments<'l, I>(
    logs: I,
    authority: &Authority,
    name: &str,
    total_chunks: u32,
) -> Result<Vec<Vec<u8>>, VaultError>
where
    I: IntoIterator<Item = &'l Vec<String>>,
{
    let mut fragments: Vec<(u32, Vec<u8>)> = logs
        .into_iter()
        .flat_map(|lines| LedgerEvent::parse_logs(lines))
        .filter_map(|event| match event {
            LedgerEvent::FragmentAppended {
                authority: a,
                name: n,
                index,
                data,
            } if a == *authority && n == name => Some((index, data)),
            _ => None,
        })
        .collect();
    fragments.sort_by_key(|(index, _)| *index);

    let contiguous = fragments.len() == total_chunks as usize
        && fragments
            .iter()
            .enumerate()
            .all(|(position, (index, _))| *index as usize == position);
    if !contiguous {
        return Err(VaultError::IncompleteReconstruction {
            found: fragments.len(),
            expected: total_chunks,
        });
    }

    Ok(fragments.into_iter().map(|(_, data)| data).collect())
}
