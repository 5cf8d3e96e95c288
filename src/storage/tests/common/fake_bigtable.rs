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

//! In-process fake of the remote wide-column service.
//!
//! Honors the RPC contract closely enough for the backend-agnostic suite:
//! a small server-side page size forces the client to iterate the scan
//! cursor, and periodically injected `Unavailable` errors force the retry
//! layer to earn its keep.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use telemetry_storage::store::bigtable::{
    BigtableRpc, DropRowRange, ReadRowsPage, ReadRowsRequest, RpcError, RpcResult,
};
use telemetry_storage::store::Row;

type TableMap = BTreeMap<Bytes, HashMap<String, Bytes>>;

pub struct FakeBigtable {
    tables: Mutex<HashMap<String, TableMap>>,
    /// Rows returned per scan RPC at most, regardless of `rows_limit`.
    page_size: usize,
    /// Every `fail_every`-th RPC fails with `Unavailable`; 0 disables.
    fail_every: usize,
    calls: AtomicUsize,
}

impl FakeBigtable {
    pub fn new(page_size: usize) -> Self {
        Self::with_failures(page_size, 0)
    }

    pub fn with_failures(page_size: usize, fail_every: usize) -> Self {
        Self {
            tables: Mutex::default(),
            page_size,
            fail_every,
            calls: AtomicUsize::new(0),
        }
    }

    fn maybe_fail(&self) -> RpcResult<()> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if self.fail_every != 0 && call % self.fail_every == 0 {
            return Err(RpcError::Unavailable(format!(
                "injected outage on call {}",
                call
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl BigtableRpc for FakeBigtable {
    async fn mutate_rows(&self, table_path: &str, rows: Vec<Row>) -> RpcResult<()> {
        self.maybe_fail()?;
        let mut tables = self.tables.lock();
        let table = tables.entry(table_path.to_owned()).or_default();
        for row in rows {
            table.entry(row.key).or_default().extend(row.columns);
        }
        Ok(())
    }

    async fn read_rows(&self, request: ReadRowsRequest) -> RpcResult<ReadRowsPage> {
        self.maybe_fail()?;
        let tables = self.tables.lock();
        let Some(table) = tables.get(&request.table_path) else {
            return Ok(ReadRowsPage::default());
        };

        let fetch = request.rows_limit.min(self.page_size);
        let mut page = ReadRowsPage::default();
        for (key, cells) in table.range(request.start_key.clone()..) {
            if let Some(limit) = &request.limit_key {
                if key >= limit {
                    break;
                }
            }
            if page.rows.len() == fetch {
                // Cut by the server page size with range left over.
                if fetch < request.rows_limit {
                    page.next_start_key = Some(key.clone());
                }
                break;
            }
            let columns = cells
                .iter()
                .filter(|(name, _)| {
                    request.columns.is_empty() || request.columns.iter().any(|c| c == *name)
                })
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            page.rows.push(Row {
                key: key.clone(),
                columns,
            });
        }
        Ok(page)
    }

    async fn delete_row(&self, table_path: &str, key: &[u8]) -> RpcResult<()> {
        self.maybe_fail()?;
        if let Some(table) = self.tables.lock().get_mut(table_path) {
            table.remove(key);
        }
        Ok(())
    }

    async fn drop_row_range(&self, table_path: &str, range: DropRowRange) -> RpcResult<()> {
        self.maybe_fail()?;
        let mut tables = self.tables.lock();
        let Some(table) = tables.get_mut(table_path) else {
            return Ok(());
        };
        match range {
            DropRowRange::AllRows => table.clear(),
            DropRowRange::Prefix(prefix) => table.retain(|key, _| !key.starts_with(&prefix)),
        }
        Ok(())
    }
}
