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

//! The logical observation store over a [`DataStore`] backend.
//!
//! Observations are stored one per row under keys encoded by
//! [`crate::row_key`], so a day-range query is a single ordered scan and a
//! per-metric delete is a prefix drop. The store itself is stateless:
//! pagination state lives entirely in the opaque token handed back to the
//! client, which is literally the next row key to scan from.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use itertools::Itertools;
use prost::Message;
use telemetry_pb::observation::{
    Observation, ObservationMetadata, SystemProfile, SystemProfileField,
};

use crate::error::{StoreError, StoreResult};
use crate::profile::project_system_profile;
use crate::row_key::{self, RowKey};
use crate::store::{DataStore, Row, Table};

/// Column holding the serialized observation payload. Never empty.
pub const OBSERVATION_COLUMN: &str = "observation";
/// Column holding the serialized system profile; present iff the batch
/// metadata carried one.
pub const SYSTEM_PROFILE_COLUMN: &str = "system_profile";

/// Hard cap on rows returned by one query page.
const MAX_QUERY_RESULTS: usize = 1000;
/// Page size used when the caller does not specify one.
const DEFAULT_QUERY_RESULTS: usize = 100;

/// Parameters of one [`ObservationStore::query_observations`] page.
#[derive(Clone, Debug, Default)]
pub struct ObservationQuery {
    pub customer_id: u32,
    pub project_id: u32,
    pub metric_id: u32,
    pub first_day_index: u32,
    pub last_day_index: u32,
    /// Part names to retain on each returned observation; empty keeps all.
    pub parts: Vec<String>,
    /// Profile fields to echo back on each result; empty suppresses the
    /// profile even where one is stored.
    pub system_profile_fields: Vec<SystemProfileField>,
    /// Upper bound on returned results; 0 selects the default page size.
    pub max_results: usize,
    /// Cursor from the previous response; empty starts at the range top.
    pub pagination_token: Bytes,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryResult {
    pub metadata: ObservationMetadata,
    pub observation: Observation,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryResponse {
    pub results: Vec<QueryResult>,
    /// Cursor for the next page; empty when the range is exhausted. Opaque
    /// to clients but stable across server restarts.
    pub pagination_token: Bytes,
}

/// Durable, queryable repository of telemetry observations.
#[derive(Clone)]
pub struct ObservationStore {
    store: Arc<dyn DataStore>,
}

impl ObservationStore {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Writes one row per observation under the shared metadata.
    ///
    /// There is no transactional guarantee across the batch: the backend
    /// may persist a prefix before failing, and a retried call generates
    /// fresh keys, so retries can duplicate rows. Downstream aggregation
    /// tolerates duplicates.
    pub async fn add_observation_batch(
        &self,
        metadata: &ObservationMetadata,
        observations: &[Observation],
    ) -> StoreResult<()> {
        if metadata.customer_id == 0 || metadata.project_id == 0 || metadata.metric_id == 0 {
            return Err(StoreError::invalid_arguments(format!(
                "customer_id, project_id and metric_id must be positive, got ({}, {}, {})",
                metadata.customer_id, metadata.project_id, metadata.metric_id
            )));
        }
        if observations.is_empty() {
            return Ok(());
        }

        let profile_bytes = metadata
            .system_profile
            .as_ref()
            .map(|profile| Bytes::from(profile.encode_to_vec()));
        let rows = observations
            .iter()
            .map(|observation| {
                let key = RowKey::generate(
                    metadata.customer_id,
                    metadata.project_id,
                    metadata.metric_id,
                    metadata.day_index,
                );
                let mut row = Row::new(key.encode())
                    .with_column(OBSERVATION_COLUMN, observation.encode_to_vec());
                if let Some(profile) = &profile_bytes {
                    row = row.with_column(SYSTEM_PROFILE_COLUMN, profile.clone());
                }
                row
            })
            .collect_vec();
        self.store.write_rows(Table::Observations, rows).await
    }

    /// Returns one page of observations of a metric within a day range, in
    /// ascending row-key order. Feed the returned token back to get the
    /// next page; an empty token means the range is exhausted.
    pub async fn query_observations(
        &self,
        query: &ObservationQuery,
    ) -> StoreResult<QueryResponse> {
        let start_key = query_start_key(query)?;
        let limit_key = row_key::day_range_limit(
            query.customer_id,
            query.project_id,
            query.metric_id,
            query.last_day_index,
        );
        let max_results = match query.max_results {
            0 => DEFAULT_QUERY_RESULTS,
            requested => requested.min(MAX_QUERY_RESULTS),
        };

        let page = self
            .store
            .read_rows(
                Table::Observations,
                start_key,
                limit_key,
                &[OBSERVATION_COLUMN, SYSTEM_PROFILE_COLUMN],
                max_results,
            )
            .await?;

        let requested_parts: HashSet<&str> = query.parts.iter().map(String::as_str).collect();
        let mut results = Vec::with_capacity(page.rows.len());
        let mut last_key: Option<RowKey> = None;
        for row in page.rows {
            let key = match RowKey::decode(&row.key) {
                Ok(key) => key,
                Err(error) => {
                    tracing::warn!("skipping row with undecodable key: {}", error);
                    continue;
                }
            };
            last_key = Some(key);
            if let Some(result) = decode_result(&row, key, &requested_parts, query) {
                results.push(result);
            }
        }

        let pagination_token = match (page.more_available, last_key) {
            (true, Some(key)) => key
                .successor()
                .map(|next| next.encode())
                .unwrap_or_default(),
            _ => Bytes::new(),
        };
        Ok(QueryResponse {
            results,
            pagination_token,
        })
    }

    /// Removes every observation of one metric. Other metrics are
    /// untouched.
    pub async fn delete_all_for_metric(
        &self,
        customer_id: u32,
        project_id: u32,
        metric_id: u32,
    ) -> StoreResult<()> {
        self.store
            .delete_rows_with_prefix(
                Table::Observations,
                &row_key::metric_prefix(customer_id, project_id, metric_id),
            )
            .await
    }

    /// Truncates the observations table. Admin only.
    pub async fn delete_all_observations(&self) -> StoreResult<()> {
        self.store.delete_all_rows(Table::Observations).await
    }
}

/// Validates the range and token and picks the scan start.
fn query_start_key(query: &ObservationQuery) -> StoreResult<Bytes> {
    if query.last_day_index < query.first_day_index {
        return Err(StoreError::invalid_arguments(format!(
            "last_day_index {} is before first_day_index {}",
            query.last_day_index, query.first_day_index
        )));
    }
    if query.pagination_token.is_empty() {
        return Ok(row_key::day_start_key(
            query.customer_id,
            query.project_id,
            query.metric_id,
            query.first_day_index,
        ));
    }

    let token = RowKey::decode(&query.pagination_token)?;
    if (token.customer_id, token.project_id, token.metric_id)
        != (query.customer_id, query.project_id, query.metric_id)
    {
        return Err(StoreError::invalid_arguments(
            "pagination token addresses a different metric",
        ));
    }
    if token.day_index < query.first_day_index {
        return Err(StoreError::invalid_arguments(format!(
            "pagination token day {} is before first_day_index {}",
            token.day_index, query.first_day_index
        )));
    }
    Ok(query.pagination_token.clone())
}

/// Decodes one stored row into a query result. Corrupt rows are logged and
/// dropped so a single bad cell cannot fail the whole query.
fn decode_result(
    row: &Row,
    key: RowKey,
    requested_parts: &HashSet<&str>,
    query: &ObservationQuery,
) -> Option<QueryResult> {
    let payload = match row.columns.get(OBSERVATION_COLUMN) {
        Some(payload) => payload,
        None => {
            tracing::warn!("skipping row without an observation column");
            return None;
        }
    };
    let mut observation = match Observation::decode(payload.as_ref()) {
        Ok(observation) => observation,
        Err(error) => {
            tracing::warn!("skipping row with corrupt observation: {}", error);
            return None;
        }
    };
    if !requested_parts.is_empty() {
        observation
            .parts
            .retain(|name, _| requested_parts.contains(name.as_str()));
    }

    let system_profile = match row.columns.get(SYSTEM_PROFILE_COLUMN) {
        Some(raw) if !query.system_profile_fields.is_empty() => {
            match SystemProfile::decode(raw.as_ref()) {
                Ok(profile) => project_system_profile(&profile, &query.system_profile_fields),
                Err(error) => {
                    tracing::warn!("dropping corrupt system profile: {}", error);
                    None
                }
            }
        }
        _ => None,
    };

    Some(QueryResult {
        metadata: ObservationMetadata {
            customer_id: key.customer_id,
            project_id: key.project_id,
            metric_id: key.metric_id,
            day_index: key.day_index,
            system_profile,
        },
        observation,
    })
}
