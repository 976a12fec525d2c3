// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults and the loaders that read them at
//! startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the ledger database | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `LOG_RETENTION_SLOTS` | Slots of transaction logs to keep; unset keeps all | unset |
//! | `PRUNE_INTERVAL_SECS` | Seconds between log pruning passes | `60` |
//! | `LEDGER_URL` | Node URL used by ledger clients | `http://127.0.0.1:8080` |
//! | `LEDGER_TIMEOUT_SECS` | Per-request timeout of ledger clients | `15` |
//! | `LOG_CACHE_CAPACITY` | Transactions whose logs a client caches | `1024` |
//! | `LOG_CACHE_TTL_SECS` | Lifetime of a cached log entry | `300` |
//! | `LOG_FETCH_CONCURRENCY` | Log fetches a client keeps in flight (at least 1) | `16` |

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::client::{ClientError, HttpLedgerClient, LogCache};
use crate::vault::retrieve::DEFAULT_LOG_FETCH_CONCURRENCY;

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const LOG_RETENTION_SLOTS_ENV: &str = "LOG_RETENTION_SLOTS";
pub const PRUNE_INTERVAL_SECS_ENV: &str = "PRUNE_INTERVAL_SECS";
pub const LEDGER_URL_ENV: &str = "LEDGER_URL";
pub const LEDGER_TIMEOUT_SECS_ENV: &str = "LEDGER_TIMEOUT_SECS";
pub const LOG_CACHE_CAPACITY_ENV: &str = "LOG_CACHE_CAPACITY";
pub const LOG_CACHE_TTL_SECS_ENV: &str = "LOG_CACHE_TTL_SECS";
pub const LOG_FETCH_CONCURRENCY_ENV: &str = "LOG_FETCH_CONCURRENCY";

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";
pub const DEFAULT_PRUNE_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_LEDGER_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_LEDGER_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_LOG_CACHE_CAPACITY: usize = 1024;
pub const DEFAULT_LOG_CACHE_TTL_SECS: u64 = 300;

/// File name of the ledger database inside `DATA_DIR`.
pub const LEDGER_DB_FILE: &str = "ledger.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Settings of the ledger node binary.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub log_format: LogFormat,
    /// `None` keeps every transaction's logs forever
    pub log_retention_slots: Option<u64>,
    pub prune_interval: Duration,
}

impl NodeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port: u16 = parse_or(&lookup, PORT_ENV, DEFAULT_PORT)?;
        let bind_addr = format!("{host}:{port}")
            .parse()
            .map_err(|_| ConfigError::Invalid {
                var: HOST_ENV,
                value: host.clone(),
            })?;

        let log_format = match lookup(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: LOG_FORMAT_ENV,
                    value: other.to_string(),
                })
            }
        };

        let log_retention_slots = match lookup(LOG_RETENTION_SLOTS_ENV) {
            Some(value) => Some(parse_value(LOG_RETENTION_SLOTS_ENV, value)?),
            None => None,
        };

        Ok(Self {
            bind_addr,
            data_dir: lookup(DATA_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            log_format,
            log_retention_slots,
            prune_interval: Duration::from_secs(parse_or(
                &lookup,
                PRUNE_INTERVAL_SECS_ENV,
                DEFAULT_PRUNE_INTERVAL_SECS,
            )?),
        })
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_DB_FILE)
    }
}

/// Settings for talking to a remote ledger node.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub ledger_url: String,
    pub timeout: Duration,
    pub log_cache_capacity: usize,
    pub log_cache_ttl: Duration,
    /// Cap on concurrent log fetches during retrieve and resume
    pub log_fetch_concurrency: usize,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            ledger_url: lookup(LEDGER_URL_ENV).unwrap_or_else(|| DEFAULT_LEDGER_URL.to_string()),
            timeout: Duration::from_secs(parse_or(
                &lookup,
                LEDGER_TIMEOUT_SECS_ENV,
                DEFAULT_LEDGER_TIMEOUT_SECS,
            )?),
            log_cache_capacity: parse_or(
                &lookup,
                LOG_CACHE_CAPACITY_ENV,
                DEFAULT_LOG_CACHE_CAPACITY,
            )?,
            log_cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                LOG_CACHE_TTL_SECS_ENV,
                DEFAULT_LOG_CACHE_TTL_SECS,
            )?),
            log_fetch_concurrency: match lookup(LOG_FETCH_CONCURRENCY_ENV) {
                Some(value) => {
                    parse_value::<NonZeroUsize>(LOG_FETCH_CONCURRENCY_ENV, value)?.get()
                }
                None => DEFAULT_LOG_FETCH_CONCURRENCY,
            },
        })
    }

    /// HTTP client configured from these settings.
    pub fn http_client(&self) -> Result<HttpLedgerClient, ClientError> {
        Ok(HttpLedgerClient::with_timeout(&self.ledger_url, self.timeout)?
            .with_log_cache(LogCache::new(self.log_cache_capacity, self.log_cache_ttl)))
    }
}

fn parse_value<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => parse_value(var, value),
        None => Ok(default),
    }
}
