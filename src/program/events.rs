// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Log-only events.
//!
//! Events are never stored in record state. Each committed transaction
//! carries a list of log lines; an event is one `Program data: <json>` line.
//! The only way to find an event again is to replay the logs of every
//! transaction that touched the record's address.

use serde::{Deserialize, Serialize};

use super::address::Authority;

/// Prefix of a log line carrying an encoded event.
pub const LOG_DATA_PREFIX: &str = "Program data: ";

/// Prefix of a log line naming the executed instruction.
pub const LOG_INSTRUCTION_PREFIX: &str = "Program log: Instruction: ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    RecordCreated {
        authority: Authority,
        name: String,
        total_chunks: u32,
        content_type: String,
    },
    FragmentAppended {
        authority: Authority,
        name: String,
        index: u32,
        #[serde(with = "crate::program::encoding")]
        data: Vec<u8>,
    },
    RecordSealed {
        authority: Authority,
        name: String,
        total_chunks: u32,
    },
}

impl LedgerEvent {
    /// Render as a log line.
    pub fn to_log_line(&self) -> Result<String, serde_json::Error> {
        Ok(format!("{LOG_DATA_PREFIX}{}", serde_json::to_string(self)?))
    }

    /// Decode one log line. Lines that are not event lines yield `None`.
    pub fn from_log_line(line: &str) -> Option<Result<Self, serde_json::Error>> {
        line.strip_prefix(LOG_DATA_PREFIX)
            .map(|payload| serde_json::from_str(payload))
    }

    /// Extract every decodable event from a transaction log.
    ///
    /// Malformed data lines are skipped; an unrelated emitter sharing the
    /// log must not abort a scan.
    pub fn parse_logs<S: AsRef<str>>(lines: &[S]) -> Vec<Self> {
        let mut events = Vec::new();
        for line in lines {
            match Self::from_log_line(line.as_ref()) {
                Some(Ok(event)) => events.push(event),
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Skipping undecodable log data line");
                }
                None => {}
            }
        }
        events
    }
}
