// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Upload: sign → encrypt → split → create → append... → seal.
//!
//! Appends are strictly sequential. Each one is submitted only after the
//! previous one committed, because the ledger accepts fragment `i` only
//! when `chunks_uploaded == i`.
//!
//! ## Interrupted uploads
//!
//! [`Uploader::submit`] never retries. After a failure, hand the same
//! [`PreparedUpload`] to [`Uploader::resume`], which re-reads
//! `chunks_uploaded` from the ledger and continues from there. A freshly
//! prepared upload cannot resume an older one: encryption uses a random
//! nonce, so its fragments are a different ciphertext. Resume replays the
//! committed fragments and refuses to append unless they match.

use tokio::sync::watch;

use super::error::VaultError;
use super::retrieve::{collect_fragments, fetch_address_logs, DEFAULT_LOG_FETCH_CONCURRENCY};
use crate::chunker::{self, DEFAULT_FRAGMENT_SIZE};
use crate::client::{sign_operation, LedgerClient, MessageSigner};
use crate::crypto;
use crate::program::{find_record_address, Instruction, OpId, RecordAddress};

/// Upload progress phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadPhase {
    #[default]
    Idle,
    Signing,
    Encrypting,
    Creating,
    Uploading,
    Sealing,
    Done,
    Failed,
}

/// Snapshot published on the progress channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadStatus {
    pub phase: UploadPhase,
    /// Fragments committed so far
    pub current: u32,
    /// Fragments in the upload, zero until known
    pub total: u32,
    /// Failure message in the `Failed` phase
    pub error: Option<String>,
}

/// Progress channel pair starting at `Idle`.
pub fn progress_channel() -> (watch::Sender<UploadStatus>, watch::Receiver<UploadStatus>) {
    watch::channel(UploadStatus::default())
}

/// Random upload name: 32 lowercase hex characters.
pub fn generate_name() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Encrypted, fragmented payload ready to submit. Holds no key material.
#[derive(Debug, Clone)]
pub struct PreparedUpload {
    pub name: String,
    pub content_type: String,
    pub address: RecordAddress,
    pub address_proof: u8,
    fragments: Vec<Vec<u8>>,
}

impl PreparedUpload {
    pub fn fragments(&self) -> &[Vec<u8>] {
        &self.fragments
    }

    pub fn total_chunks(&self) -> u32 {
        self.fragments.len() as u32
    }

    /// Ciphertext size including nonce and tag.
    pub fn encrypted_len(&self) -> usize {
        self.fragments.iter().map(Vec::len).sum()
    }
}

/// Outcome of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub address: RecordAddress,
    pub name: String,
    pub total_chunks: u32,
    /// Transactions submitted by this call, in order
    pub op_ids: Vec<OpId>,
}

/// Drives uploads for one signer against one ledger.
pub struct Uploader<'a, C: ?Sized, S: ?Sized> {
    client: &'a C,
    signer: &'a S,
    fragment_size: usize,
    log_concurrency: usize,
    progress: Option<watch::Sender<UploadStatus>>,
}

impl<'a, C, S> Uploader<'a, C, S>
where
    C: LedgerClient + ?Sized,
    S: MessageSigner + ?Sized,
{
    pub fn new(client: &'a C, signer: &'a S) -> Self {
        Self {
            client,
            signer,
            fragment_size: DEFAULT_FRAGMENT_SIZE,
            log_concurrency: DEFAULT_LOG_FETCH_CONCURRENCY,
            progress: None,
        }
    }

    /// Publish status snapshots on `progress`.
    pub fn with_progress(mut self, progress: watch::Sender<UploadStatus>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Override the fragment size. Zero or anything above the ledger's
    /// append limit fails in [`Uploader::prepare`].
    pub fn with_fragment_size(mut self, fragment_size: usize) -> Self {
        self.fragment_size = fragment_size;
        self
    }

    /// Cap on log fetches in flight while resume checks committed fragments.
    pub fn with_log_concurrency(mut self, log_concurrency: usize) -> Self {
        self.log_concurrency = log_concurrency;
        self
    }

    /// Prepare and submit in one go.
    pub async fn upload(
        &self,
        name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<UploadReceipt, VaultError> {
        let prepared = self.prepare(name, content_type, bytes).await?;
        self.submit(&prepared).await
    }

    /// Derive the key, encrypt and fragment. Nothing touches the ledger.
    pub async fn prepare(
        &self,
        name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<PreparedUpload, VaultError> {
        let result = self.prepare_inner(name, content_type, bytes).await;
        self.report_outcome(result)
    }

    async fn prepare_inner(
        &self,
        name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<PreparedUpload, VaultError> {
        let (address, address_proof) = find_record_address(&self.signer.authority(), name)
            .ok_or_else(|| VaultError::NoAddress(name.to_string()))?;

        self.report(UploadPhase::Signing, 0, 0);
        let signature = self.signer.sign_message(&crypto::key_message(name)).await?;

        self.report(UploadPhase::Encrypting, 0, 0);
        let blob = {
            let key = crypto::derive_key(&signature);
            crypto::encrypt(&key, bytes)?
        };
        let fragments: Vec<Vec<u8>> = chunker::split(&blob, self.fragment_size)?
            .into_iter()
            .map(<[u8]>::to_vec)
            .collect();

        tracing::debug!(
            %address,
            name,
            plaintext_len = bytes.len(),
            fragments = fragments.len(),
            "Upload prepared"
        );

        Ok(PreparedUpload {
            name: name.to_string(),
            content_type: content_type.to_string(),
            address,
            address_proof,
            fragments,
        })
    }

    /// Create the record, append every fragment in order, then seal. Stops
    /// at the first failure.
    pub async fn submit(&self, prepared: &PreparedUpload) -> Result<UploadReceipt, VaultError> {
        let result = self.submit_inner(prepared).await;
        self.report_outcome(result)
    }

    async fn submit_inner(&self, prepared: &PreparedUpload) -> Result<UploadReceipt, VaultError> {
        let total = prepared.total_chunks();
        let mut op_ids = Vec::with_capacity(prepared.fragments.len() + 2);

        self.report(UploadPhase::Creating, 0, total);
        let create = Instruction::Create {
            name: prepared.name.clone(),
            total_chunks: total,
            content_type: prepared.content_type.clone(),
        };
        op_ids.push(self.send(prepared.address, create).await?);

        self.append_from(prepared, 0, &mut op_ids).await?;
        self.seal(prepared, &mut op_ids).await?;
        Ok(self.finish(prepared, op_ids))
    }

    /// Continue an interrupted upload of `prepared` from the ledger's
    /// current `chunks_uploaded`.
    pub async fn resume(&self, prepared: &PreparedUpload) -> Result<UploadReceipt, VaultError> {
        let result = self.resume_inner(prepared).await;
        self.report_outcome(result)
    }

    async fn resume_inner(&self, prepared: &PreparedUpload) -> Result<UploadReceipt, VaultError> {
        let Some(record) = self.client.fetch_record(&prepared.address).await? else {
            tracing::info!(address = %prepared.address, "No record to resume, starting fresh");
            return self.submit_inner(prepared).await;
        };

        if record.authority != self.signer.authority() {
            return Err(VaultError::ResumeMismatch(
                "record belongs to another authority".to_string(),
            ));
        }
        if record.total_chunks != prepared.total_chunks() {
            return Err(VaultError::ResumeMismatch(format!(
                "record expects {} fragments, prepared upload has {}",
                record.total_chunks,
                prepared.total_chunks()
            )));
        }
        if record.content_type != prepared.content_type {
            return Err(VaultError::ResumeMismatch(format!(
                "record content type is {:?}, prepared upload has {:?}",
                record.content_type, prepared.content_type
            )));
        }

        let next_index = record.next_index();
        if next_index > 0 {
            self.verify_committed(prepared, next_index).await?;
        }

        tracing::info!(
            address = %prepared.address,
            chunks_uploaded = next_index,
            total_chunks = record.total_chunks,
            sealed = record.sealed,
            "Resuming upload"
        );

        let mut op_ids = Vec::new();
        if !record.sealed {
            self.append_from(prepared, next_index, &mut op_ids).await?;
            self.seal(prepared, &mut op_ids).await?;
        }
        Ok(self.finish(prepared, op_ids))
    }

    /// Fragments `0..committed` on the ledger must be exactly the ones in
    /// `prepared`.
    async fn verify_committed(
        &self,
        prepared: &PreparedUpload,
        committed: u32,
    ) -> Result<(), VaultError> {
        let logs = fetch_address_logs(self.client, &prepared.address, self.log_concurrency).await?;
        let on_ledger = match collect_fragments(
            &logs,
            &self.signer.authority(),
            &prepared.name,
            committed,
        ) {
            Ok(fragments) => fragments,
            Err(VaultError::IncompleteReconstruction { found, expected }) => {
                return Err(VaultError::ResumeMismatch(format!(
                    "only {found} of {expected} committed fragments are readable"
                )));
            }
            Err(e) => return Err(e),
        };

        if prepared.fragments.get(..committed as usize) != Some(on_ledger.as_slice()) {
            tracing::warn!(
                address = %prepared.address,
                committed,
                "Committed fragments differ from the prepared upload"
            );
            return Err(VaultError::ResumeMismatch(
                "committed fragments differ from this prepared upload".to_string(),
            ));
        }
        Ok(())
    }

    async fn append_from(
        &self,
        prepared: &PreparedUpload,
        start: u32,
        op_ids: &mut Vec<OpId>,
    ) -> Result<(), VaultError> {
        let total = prepared.total_chunks();
        self.report(UploadPhase::Uploading, start, total);

        for (index, fragment) in prepared.fragments.iter().enumerate().skip(start as usize) {
            let index = index as u32;
            let append = Instruction::AppendFragment {
                index,
                data: fragment.clone(),
            };
            op_ids.push(self.send(prepared.address, append).await?);
            self.report(UploadPhase::Uploading, index + 1, total);
        }
        Ok(())
    }

    async fn seal(
        &self,
        prepared: &PreparedUpload,
        op_ids: &mut Vec<OpId>,
    ) -> Result<(), VaultError> {
        let total = prepared.total_chunks();
        self.report(UploadPhase::Sealing, total, total);
        op_ids.push(self.send(prepared.address, Instruction::Seal).await?);
        Ok(())
    }

    async fn send(
        &self,
        address: RecordAddress,
        instruction: Instruction,
    ) -> Result<OpId, VaultError> {
        let signed = sign_operation(self.signer, address, instruction).await?;
        Ok(self.client.submit_signed_operation(&signed).await?)
    }

    fn finish(&self, prepared: &PreparedUpload, op_ids: Vec<OpId>) -> UploadReceipt {
        let total = prepared.total_chunks();
        self.report(UploadPhase::Done, total, total);
        tracing::info!(
            address = %prepared.address,
            name = %prepared.name,
            total_chunks = total,
            "Upload sealed"
        );
        UploadReceipt {
            address: prepared.address,
            name: prepared.name.clone(),
            total_chunks: total,
            op_ids,
        }
    }

    fn report(&self, phase: UploadPhase, current: u32, total: u32) {
        if let Some(progress) = &self.progress {
            progress.send_replace(UploadStatus {
                phase,
                current,
                total,
                error: None,
            });
        }
    }

    fn report_outcome<T>(&self, result: Result<T, VaultError>) -> Result<T, VaultError> {
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Upload failed");
            if let Some(progress) = &self.progress {
                progress.send_modify(|status| {
                    status.phase = UploadPhase::Failed;
                    status.error = Some(e.to_string());
                });
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::chunker::ChunkError;
    use crate::client::{ClientError, LocalSigner};
    use crate::ledger::Ledger;
    use crate::program::{ErrorClass, ProgramError, Record, SignedOperation, TransactionSummary};

    fn temp_ledger() -> (tempfile::TempDir, Ledger) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::open(&dir.path().join("ledger.redb")).unwrap();
        (dir, ledger)
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 256) as u8).collect()
    }

    /// Passes through to a ledger but fails every submission after the
    /// first `allowed`.
    struct FlakyLedger<'a> {
        inner: &'a Ledger,
        allowed: AtomicUsize,
    }

    #[async_trait]
    impl<'a> LedgerClient for FlakyLedger<'a> {
        async fn submit_signed_operation(
            &self,
            operation: &SignedOperation,
        ) -> Result<OpId, ClientError> {
            let left = self.allowed.load(Ordering::SeqCst);
            if left == 0 {
                return Err(ClientError::Transport("connection reset".to_string()));
            }
            self.allowed.store(left - 1, Ordering::SeqCst);
            self.inner.submit_signed_operation(operation).await
        }

        async fn fetch_record(
            &self,
            address: &RecordAddress,
        ) -> Result<Option<Record>, ClientError> {
            self.inner.fetch_record(address).await
        }

        async fn fetch_transaction_history(
            &self,
            address: &RecordAddress,
        ) -> Result<Vec<TransactionSummary>, ClientError> {
            self.inner.fetch_transaction_history(address).await
        }

        async fn fetch_transaction_logs(
            &self,
            op_id: &OpId,
        ) -> Result<Option<Vec<String>>, ClientError> {
            self.inner.fetch_transaction_logs(op_id).await
        }
    }

    #[test]
    fn generated_names_are_hex() {
        let name = generate_name();
        assert_eq!(name.len(), 32);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(generate_name(), name);
    }

    #[tokio::test]
    async fn prepare_fragments_ciphertext() {
        let (_dir, ledger) = temp_ledger();
        let signer = LocalSigner::from_bytes(&[1; 32]).unwrap();
        let uploader = Uploader::new(&ledger, &signer);

        let prepared = uploader
            .prepare("test-image-001", "image/png", &payload(2500))
            .await
            .unwrap();
        assert_eq!(prepared.total_chunks(), 3);
        assert_eq!(prepared.encrypted_len(), 2500 + crypto::ENCRYPTION_OVERHEAD);
        assert!(prepared.fragments().iter().all(|f| f.len() <= 900));
        assert!(ledger.record(&prepared.address).unwrap().is_none());
    }

    #[tokio::test]
    async fn upload_reports_progress_until_done() {
        let (_dir, ledger) = temp_ledger();
        let signer = LocalSigner::from_bytes(&[1; 32]).unwrap();
        let (tx, rx) = progress_channel();
        let uploader = Uploader::new(&ledger, &signer).with_progress(tx);

        let receipt = uploader
            .upload("progress", "image/png", &payload(2000))
            .await
            .unwrap();

        assert_eq!(receipt.total_chunks, 3);
        assert_eq!(receipt.op_ids.len(), 5);
        assert_eq!(
            *rx.borrow(),
            UploadStatus {
                phase: UploadPhase::Done,
                current: 3,
                total: 3,
                error: None,
            }
        );
        let record = ledger.record(&receipt.address).unwrap().unwrap();
        assert!(record.sealed);
        assert_eq!(record.chunks_uploaded, 3);
    }

    #[tokio::test]
    async fn duplicate_name_fails_and_reports() {
        let (_dir, ledger) = temp_ledger();
        let signer = LocalSigner::from_bytes(&[1; 32]).unwrap();
        let (tx, rx) = progress_channel();
        let uploader = Uploader::new(&ledger, &signer).with_progress(tx);

        uploader.upload("twice", "text/plain", b"one").await.unwrap();
        let err = uploader.upload("twice", "text/plain", b"two").await.unwrap_err();

        assert!(matches!(
            err,
            VaultError::Client(ClientError::Rejected(ProgramError::RecordExists))
        ));
        assert_eq!(err.class(), Some(ErrorClass::State));
        let status = rx.borrow().clone();
        assert_eq!(status.phase, UploadPhase::Failed);
        assert!(status.error.is_some());
    }

    #[tokio::test]
    async fn oversized_name_is_rejected_by_ledger() {
        let (_dir, ledger) = temp_ledger();
        let signer = LocalSigner::from_bytes(&[1; 32]).unwrap();
        let name = "n".repeat(65);

        let err = Uploader::new(&ledger, &signer)
            .upload(&name, "text/plain", b"x")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::Client(ClientError::Rejected(ProgramError::NameTooLong))
        ));
    }

    #[tokio::test]
    async fn oversized_fragments_fail_before_create() {
        let (_dir, ledger) = temp_ledger();
        let signer = LocalSigner::from_bytes(&[1; 32]).unwrap();
        let uploader = Uploader::new(&ledger, &signer).with_fragment_size(901);

        let err = uploader
            .upload("wide", "image/png", &payload(2500))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::Chunking(ChunkError::TooLarge { size: 901, max: 900 })
        ));

        let (address, _) = find_record_address(&signer.authority(), "wide").unwrap();
        assert!(ledger.record(&address).unwrap().is_none());
    }

    #[tokio::test]
    async fn resume_continues_after_interruption() {
        let (_dir, ledger) = temp_ledger();
        let signer = LocalSigner::from_bytes(&[1; 32]).unwrap();

        // create + two appends get through, the third append fails
        let flaky = FlakyLedger {
            inner: &ledger,
            allowed: AtomicUsize::new(3),
        };
        let prepared = Uploader::new(&flaky, &signer)
            .prepare("interrupted", "image/png", &payload(3000))
            .await
            .unwrap();
        assert_eq!(prepared.total_chunks(), 4);

        let err = Uploader::new(&flaky, &signer).submit(&prepared).await.unwrap_err();
        assert!(matches!(err, VaultError::Client(ClientError::Transport(_))));
        assert_eq!(err.class(), None);

        let record = ledger.record(&prepared.address).unwrap().unwrap();
        assert_eq!(record.chunks_uploaded, 2);
        assert!(!record.sealed);

        let receipt = Uploader::new(&ledger, &signer).resume(&prepared).await.unwrap();
        // two remaining appends plus the seal
        assert_eq!(receipt.op_ids.len(), 3);
        let record = ledger.record(&prepared.address).unwrap().unwrap();
        assert!(record.sealed);
        assert_eq!(record.chunks_uploaded, 4);

        // resuming a finished upload is a no-op
        let again = Uploader::new(&ledger, &signer).resume(&prepared).await.unwrap();
        assert!(again.op_ids.is_empty());
    }

    #[tokio::test]
    async fn resume_without_record_starts_fresh() {
        let (_dir, ledger) = temp_ledger();
        let signer = LocalSigner::from_bytes(&[1; 32]).unwrap();
        let uploader = Uploader::new(&ledger, &signer);

        let prepared = uploader.prepare("fresh", "text/plain", b"hello").await.unwrap();
        let receipt = uploader.resume(&prepared).await.unwrap();
        assert_eq!(receipt.op_ids.len(), 3);
    }

    #[tokio::test]
    async fn resume_rejects_different_payload_shape() {
        let (_dir, ledger) = temp_ledger();
        let signer = LocalSigner::from_bytes(&[1; 32]).unwrap();
        let uploader = Uploader::new(&ledger, &signer);

        let flaky = FlakyLedger {
            inner: &ledger,
            allowed: AtomicUsize::new(1),
        };
        let original = uploader.prepare("shape", "image/png", &payload(2000)).await.unwrap();
        Uploader::new(&flaky, &signer).submit(&original).await.unwrap_err();

        let smaller = uploader.prepare("shape", "image/png", &payload(10)).await.unwrap();
        let err = uploader.resume(&smaller).await.unwrap_err();
        assert!(matches!(err, VaultError::ResumeMismatch(_)));

        let retyped = uploader.prepare("shape", "image/jpeg", &payload(2000)).await.unwrap();
        let err = uploader.resume(&retyped).await.unwrap_err();
        assert!(matches!(err, VaultError::ResumeMismatch(_)));
    }

    #[tokio::test]
    async fn resume_rejects_reprepared_upload() {
        let (_dir, ledger) = temp_ledger();
        let signer = LocalSigner::from_bytes(&[1; 32]).unwrap();
        let bytes = payload(2500);

        // create + first append get through
        let flaky = FlakyLedger {
            inner: &ledger,
            allowed: AtomicUsize::new(2),
        };
        let first = Uploader::new(&flaky, &signer)
            .prepare("again", "image/png", &bytes)
            .await
            .unwrap();
        Uploader::new(&flaky, &signer).submit(&first).await.unwrap_err();

        // same name, type and length, but a fresh nonce
        let uploader = Uploader::new(&ledger, &signer);
        let second = uploader.prepare("again", "image/png", &bytes).await.unwrap();
        assert_eq!(second.total_chunks(), first.total_chunks());
        assert_ne!(second.fragments()[0], first.fragments()[0]);

        let err = uploader.resume(&second).await.unwrap_err();
        assert!(matches!(err, VaultError::ResumeMismatch(_)));
        let record = ledger.record(&first.address).unwrap().unwrap();
        assert_eq!(record.chunks_uploaded, 1);
        assert!(!record.sealed);

        let receipt = uploader.resume(&first).await.unwrap();
        assert_eq!(receipt.op_ids.len(), 3);
        let retrieved = crate::vault::Reconstructor::new(&ledger, &signer)
            .retrieve(&signer.authority(), "again", "image/png")
            .await
            .unwrap();
        assert_eq!(retrieved.bytes, bytes);
    }

    #[tokio::test]
    async fn resume_refuses_when_committed_logs_are_gone() {
        let (_dir, ledger) = temp_ledger();
        let signer = LocalSigner::from_bytes(&[1; 32]).unwrap();

        let flaky = FlakyLedger {
            inner: &ledger,
            allowed: AtomicUsize::new(2),
        };
        let prepared = Uploader::new(&flaky, &signer)
            .prepare("pruned", "image/png", &payload(2500))
            .await
            .unwrap();
        Uploader::new(&flaky, &signer).submit(&prepared).await.unwrap_err();

        ledger.prune_logs(0).unwrap();

        let err = Uploader::new(&ledger, &signer).resume(&prepared).await.unwrap_err();
        assert!(matches!(err, VaultError::ResumeMismatch(_)));
    }
}
