// Copyright 2025 RisingWave Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! [`DataStore`] implementation against the hosted wide-column service.
//!
//! The wire client is injected behind [`BigtableRpc`]; this module owns the
//! policy around it: bounded retries with exponential backoff on transient
//! failures, iterating the remote scan cursor when a caller asks for more
//! rows than one RPC returns, and falling back to scan-and-delete where the
//! server lacks the range-drop primitive.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use crate::config::BigtableConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::{validate_max_rows, DataStore, Row, ScanPage, Table};

pub type RpcResult<T> = std::result::Result<T, RpcError>;

/// Error classes surfaced by the remote service.
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unimplemented: {0}")]
    Unimplemented(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl RpcError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::DeadlineExceeded(_) | Self::ResourceExhausted(_)
        )
    }
}

/// One remote scan request. The scan covers the half-open key interval
/// `[start_key, limit_key)` within the single data column family.
#[derive(Clone, Debug)]
pub struct ReadRowsRequest {
    pub table_path: String,
    pub start_key: Bytes,
    /// Exclusive; `None` scans to the end of the table.
    pub limit_key: Option<Bytes>,
    /// Column qualifiers to return; empty selects all.
    pub columns: Vec<String>,
    pub rows_limit: usize,
}

/// One page of a remote scan.
///
/// `next_start_key` is the first unexamined key when the server cut the
/// scan at its own page size before `rows_limit` was satisfied; `None`
/// means the request was satisfied or the range is exhausted.
#[derive(Debug, Default)]
pub struct ReadRowsPage {
    pub rows: Vec<Row>,
    pub next_start_key: Option<Bytes>,
}

/// Row-range drop primitive of the admin surface.
#[derive(Clone, Debug)]
pub enum DropRowRange {
    Prefix(Bytes),
    AllRows,
}

/// Data-plane RPC surface of the hosted service, scoped to the data column
/// family. Production wraps the generated gRPC stubs; tests substitute an
/// in-process fake.
#[async_trait]
pub trait BigtableRpc: Send + Sync + 'static {
    async fn mutate_rows(&self, table_path: &str, rows: Vec<Row>) -> RpcResult<()>;

    async fn read_rows(&self, request: ReadRowsRequest) -> RpcResult<ReadRowsPage>;

    async fn delete_row(&self, table_path: &str, key: &[u8]) -> RpcResult<()>;

    async fn drop_row_range(&self, table_path: &str, range: DropRowRange) -> RpcResult<()>;
}

/// Fully qualified table path on the wire.
pub fn table_path(project: &str, instance: &str, table: Table) -> String {
    format!(
        "projects/{}/instances/{}/tables/{}",
        project,
        instance,
        table.id()
    )
}

/// The production [`DataStore`].
#[derive(Clone)]
pub struct BigtableDataStore {
    client: Arc<dyn BigtableRpc>,
    config: BigtableConfig,
}

impl std::fmt::Debug for BigtableDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigtableDataStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BigtableDataStore {
    pub fn new(client: Arc<dyn BigtableRpc>, config: BigtableConfig) -> Self {
        Self { client, config }
    }

    fn table_path(&self, table: Table) -> String {
        table_path(&self.config.project, &self.config.instance, table)
    }

    fn retry_strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(self.config.retry.base_delay_ms)
            .max_delay(Duration::from_millis(self.config.retry.max_delay_ms))
            .map(jitter)
            .take(self.config.retry.max_attempts.saturating_sub(1))
    }

    /// Runs one RPC under the retry budget, retrying transient failures
    /// only. The terminal error is returned unmapped so callers can react
    /// to specific classes.
    async fn try_rpc<T, A, F>(&self, context: &'static str, action: A) -> RpcResult<T>
    where
        A: FnMut() -> F,
        F: Future<Output = RpcResult<T>>,
    {
        RetryIf::spawn(self.retry_strategy(), action, |error: &RpcError| {
            let transient = error.is_transient();
            if transient {
                tracing::warn!("transient {} failure, will retry: {}", context, error);
            }
            transient
        })
        .await
    }

    /// As [`Self::try_rpc`], but any terminal error becomes
    /// `OperationFailed`.
    async fn retry_rpc<T, A, F>(&self, context: &'static str, action: A) -> StoreResult<T>
    where
        A: FnMut() -> F,
        F: Future<Output = RpcResult<T>>,
    {
        self.try_rpc(context, action)
            .await
            .map_err(|error| StoreError::operation_failed(format!("{}: {}", context, error)))
    }

    /// Range-delete fallback for servers without the drop primitive:
    /// repeatedly scan a page of the prefix and delete it row by row.
    async fn scan_and_delete(&self, table: Table, prefix: Bytes) -> StoreResult<()> {
        let path = self.table_path(table);
        let limit_key = prefix_successor(&prefix);
        loop {
            let page = self
                .read_rows(
                    table,
                    prefix.clone(),
                    limit_key.clone(),
                    &[],
                    self.config.scan_page_size,
                )
                .await?;
            for row in &page.rows {
                self.retry_rpc("delete_row", || self.client.delete_row(&path, &row.key))
                    .await?;
            }
            if !page.more_available {
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl DataStore for BigtableDataStore {
    async fn write_rows(&self, table: Table, rows: Vec<Row>) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let path = self.table_path(table);
        self.retry_rpc("mutate_rows", || {
            self.client.mutate_rows(&path, rows.clone())
        })
        .await
    }

    async fn read_row(
        &self,
        table: Table,
        key: &[u8],
        columns: &[&str],
    ) -> StoreResult<Option<Row>> {
        // A point read is a scan of the single-key interval [key, key + NUL).
        let mut limit = key.to_vec();
        limit.push(0);
        let page = self
            .read_rows(
                table,
                Bytes::copy_from_slice(key),
                Some(limit.into()),
                columns,
                1,
            )
            .await?;
        Ok(page.rows.into_iter().next())
    }

    async fn read_rows(
        &self,
        table: Table,
        start_key: Bytes,
        limit_key: Option<Bytes>,
        columns: &[&str],
        max_rows: usize,
    ) -> StoreResult<ScanPage> {
        validate_max_rows(max_rows)?;
        let path = self.table_path(table);
        let columns: Vec<String> = columns.iter().map(|name| (*name).to_owned()).collect();

        // One extra row decides `more_available` without a second scan.
        let target = max_rows + 1;
        let mut rows: Vec<Row> = Vec::new();
        let mut start_key = start_key;
        loop {
            let request = ReadRowsRequest {
                table_path: path.clone(),
                start_key: start_key.clone(),
                limit_key: limit_key.clone(),
                columns: columns.clone(),
                rows_limit: (target - rows.len()).min(self.config.scan_page_size),
            };
            let page = self
                .retry_rpc("read_rows", || self.client.read_rows(request.clone()))
                .await?;
            rows.extend(page.rows);
            match page.next_start_key {
                Some(next) if rows.len() < target => start_key = next,
                _ => break,
            }
        }

        let more_available = rows.len() >= target;
        rows.truncate(max_rows);
        Ok(ScanPage {
            rows,
            more_available,
        })
    }

    async fn delete_row(&self, table: Table, key: &[u8]) -> StoreResult<()> {
        let path = self.table_path(table);
        self.retry_rpc("delete_row", || self.client.delete_row(&path, key))
            .await
    }

    async fn delete_rows_with_prefix(&self, table: Table, prefix: &[u8]) -> StoreResult<()> {
        let path = self.table_path(table);
        let range = DropRowRange::Prefix(Bytes::copy_from_slice(prefix));
        match self
            .try_rpc("drop_row_range", || {
                self.client.drop_row_range(&path, range.clone())
            })
            .await
        {
            Ok(()) => Ok(()),
            Err(RpcError::Unimplemented(_)) => {
                tracing::debug!(
                    "server has no row-range drop for {}, falling back to scan-and-delete",
                    path
                );
                self.scan_and_delete(table, Bytes::copy_from_slice(prefix))
                    .await
            }
            Err(error) => Err(StoreError::operation_failed(format!(
                "drop_row_range: {}",
                error
            ))),
        }
    }

    async fn delete_all_rows(&self, table: Table) -> StoreResult<()> {
        let path = self.table_path(table);
        match self
            .try_rpc("drop_row_range", || {
                self.client.drop_row_range(&path, DropRowRange::AllRows)
            })
            .await
        {
            Ok(()) => Ok(()),
            Err(RpcError::Unimplemented(_)) => self.scan_and_delete(table, Bytes::new()).await,
            Err(error) => Err(StoreError::operation_failed(format!(
                "drop_row_range: {}",
                error
            ))),
        }
    }
}

/// Smallest key greater than every key sharing `prefix`; `None` when no
/// such key exists (empty or all-0xff prefix).
fn prefix_successor(prefix: &[u8]) -> Option<Bytes> {
    let pos = prefix.iter().rposition(|byte| *byte != 0xff)?;
    let mut limit = prefix[..=pos].to_vec();
    limit[pos] += 1;
    Some(limit.into())
}
