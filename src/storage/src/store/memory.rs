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

use std::collections::BTreeMap;
use std::ops::Bound::{Included, Unbounded};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::StoreResult;
use crate::store::{validate_max_rows, DataStore, Row, ScanPage, Table};

type ColumnMap = BTreeMap<String, Bytes>;

/// An in-memory data store.
///
/// Backed by a single ordered map from (table, key) to the row's cells,
/// guarded by one lock; scans iterate the sorted map in place. It exists to
/// make the backend-agnostic test suite runnable deterministically and
/// should never be used in production.
#[derive(Clone, Default, Debug)]
pub struct MemoryDataStore {
    inner: Arc<RwLock<BTreeMap<(Table, Bytes), ColumnMap>>>,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl DataStore for MemoryDataStore {
    async fn write_rows(&self, table: Table, rows: Vec<Row>) -> StoreResult<()> {
        let mut inner = self.inner.write();
        for row in rows {
            let cells = inner.entry((table, row.key)).or_default();
            for (name, value) in row.columns {
                cells.insert(name, value);
            }
        }
        Ok(())
    }

    async fn read_row(
        &self,
        table: Table,
        key: &[u8],
        columns: &[&str],
    ) -> StoreResult<Option<Row>> {
        let inner = self.inner.read();
        let row = inner
            .get(&(table, Bytes::copy_from_slice(key)))
            .map(|cells| Row {
                key: Bytes::copy_from_slice(key),
                columns: project_cells(cells, columns),
            });
        Ok(row)
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

        let inner = self.inner.read();
        let mut page = ScanPage::default();
        let in_range = |key: &Bytes| match &limit_key {
            Some(limit) => key < limit,
            None => true,
        };
        for ((row_table, key), cells) in
            inner.range((Included((table, start_key)), Unbounded))
        {
            if *row_table != table || !in_range(key) {
                break;
            }
            if page.rows.len() == max_rows {
                page.more_available = true;
                break;
            }
            page.rows.push(Row {
                key: key.clone(),
                columns: project_cells(cells, columns),
            });
        }
        Ok(page)
    }

    async fn delete_row(&self, table: Table, key: &[u8]) -> StoreResult<()> {
        self.inner
            .write()
            .remove(&(table, Bytes::copy_from_slice(key)));
        Ok(())
    }

    async fn delete_rows_with_prefix(&self, table: Table, prefix: &[u8]) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let doomed: Vec<_> = inner
            .range((Included((table, Bytes::copy_from_slice(prefix))), Unbounded))
            .take_while(|((row_table, key), _)| *row_table == table && key.starts_with(prefix))
            .map(|(id, _)| id.clone())
            .collect();
        for id in doomed {
            inner.remove(&id);
        }
        Ok(())
    }

    async fn delete_all_rows(&self, table: Table) -> StoreResult<()> {
        self.inner
            .write()
            .retain(|(row_table, _), _| *row_table != table);
        Ok(())
    }
}

fn project_cells(cells: &ColumnMap, requested: &[&str]) -> std::collections::HashMap<String, Bytes> {
    cells
        .iter()
        .filter(|(name, _)| requested.is_empty() || requested.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
