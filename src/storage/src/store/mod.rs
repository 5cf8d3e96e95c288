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

//! Generic wide-column storage underneath the observation and report stores.

pub mod bigtable;
pub mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::{BackendKind, StorageConfig};
use crate::error::{StoreError, StoreResult};
use crate::store::bigtable::{BigtableDataStore, BigtableRpc};
use crate::store::memory::MemoryDataStore;

/// The single column family every table uses. Column names within it are
/// free-form strings chosen by the caller.
pub const DATA_COLUMN_FAMILY: &str = "data";

/// Logical tables of the analyzer keyspace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    Observations,
    Reports,
}

impl Table {
    pub fn id(self) -> &'static str {
        match self {
            Self::Observations => "observations",
            Self::Reports => "reports",
        }
    }
}

/// One stored row: a key plus its cells in the data column family.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    pub key: Bytes,
    pub columns: HashMap<String, Bytes>,
}

impl Row {
    pub fn new(key: Bytes) -> Self {
        Self {
            key,
            columns: HashMap::new(),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.columns.insert(name.into(), value.into());
        self
    }
}

/// One page of an ordered scan. `more_available` is true iff the scan
/// stopped at `max_rows` with rows of the range still unread.
#[derive(Debug, Default)]
pub struct ScanPage {
    pub rows: Vec<Row>,
    pub more_available: bool,
}

/// A wide-column store addressed by byte-string keys within a named table.
///
/// Writes are upserts: a colliding key has the written columns merged over
/// its existing cells. Scans return rows in ascending key order over the
/// half-open interval `[start_key, limit_key)`, with `limit_key = None`
/// meaning "to the end of the table". Point reads of an absent key are
/// `Ok(None)`, not an error.
#[async_trait]
pub trait DataStore: Send + Sync + std::fmt::Debug + 'static {
    async fn write_row(&self, table: Table, row: Row) -> StoreResult<()> {
        self.write_rows(table, vec![row]).await
    }

    async fn write_rows(&self, table: Table, rows: Vec<Row>) -> StoreResult<()>;

    /// Point read. An empty `columns` slice selects all columns.
    async fn read_row(
        &self,
        table: Table,
        key: &[u8],
        columns: &[&str],
    ) -> StoreResult<Option<Row>>;

    /// Ordered scan of at most `max_rows` rows. `max_rows` must be positive.
    async fn read_rows(
        &self,
        table: Table,
        start_key: Bytes,
        limit_key: Option<Bytes>,
        columns: &[&str],
        max_rows: usize,
    ) -> StoreResult<ScanPage>;

    async fn delete_row(&self, table: Table, key: &[u8]) -> StoreResult<()>;

    /// Deletes all and only the rows whose keys start with `prefix`.
    async fn delete_rows_with_prefix(&self, table: Table, prefix: &[u8]) -> StoreResult<()>;

    /// Truncates the whole table. Admin only.
    async fn delete_all_rows(&self, table: Table) -> StoreResult<()>;
}

pub(crate) fn validate_max_rows(max_rows: usize) -> StoreResult<()> {
    if max_rows == 0 {
        return Err(StoreError::invalid_arguments("max_rows must be positive"));
    }
    Ok(())
}

/// Builds the configured [`DataStore`] backend. The remote backend needs an
/// RPC client; wiring one up is the caller's concern.
pub fn data_store_from_config(
    config: &StorageConfig,
    client: Option<Arc<dyn BigtableRpc>>,
) -> StoreResult<Arc<dyn DataStore>> {
    match config.backend {
        BackendKind::Memory => {
            tracing::warn!(
                "using the in-memory store backend; data will not survive a process restart"
            );
            Ok(Arc::new(MemoryDataStore::new()))
        }
        BackendKind::Bigtable => {
            let client = client.ok_or_else(|| {
                StoreError::invalid_arguments("the bigtable backend requires an rpc client")
            })?;
            Ok(Arc::new(BigtableDataStore::new(
                client,
                config.bigtable.clone(),
            )))
        }
    }
}
