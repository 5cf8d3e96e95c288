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

//! Backend-agnostic scenarios for the observation store.
//!
//! Every `run_*` function takes the `DataStore` built by the calling test
//! crate, so the same scenarios exercise the in-memory backend and the
//! remote backend over its fake RPC server.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use telemetry_pb::observation::observation_part::Value;
use telemetry_pb::observation::{
    BasicRapporObservation, ForculusObservation, Observation, ObservationMetadata,
    ObservationPart, RapporObservation, SystemProfile, SystemProfileField,
};
use telemetry_storage::row_key::RowKey;
use telemetry_storage::store::DataStore;
use telemetry_storage::{ObservationQuery, ObservationStore, QueryResult, StatusCode};

pub const CUSTOMER_ID: u32 = 1;
pub const PROJECT_ID: u32 = 1;
pub const BOARD_NAME: &str = "fake board name";

/// Part name with a fixed-width index so names sort like their indices.
pub fn part_name(index: usize) -> String {
    format!("part{:010}", index)
}

/// The encoding variant rotates with the part index, as the reporting
/// clients do.
fn make_part(index: usize) -> ObservationPart {
    let payload = part_name(index).into_bytes();
    let value = match index % 3 {
        0 => Value::Forculus(ForculusObservation {
            ciphertext: payload,
        }),
        1 => Value::Rappor(RapporObservation { data: payload }),
        _ => Value::BasicRappor(BasicRapporObservation { data: payload }),
    };
    ObservationPart { value: Some(value) }
}

/// Writes one batch of `num_observations` observations with `num_parts`
/// parts each. A non-empty `board_name` attaches a system profile to the
/// batch metadata.
pub async fn add_observation_batch(
    store: &ObservationStore,
    metric_id: u32,
    day_index: u32,
    num_parts: usize,
    num_observations: usize,
    board_name: &str,
) {
    let system_profile = (!board_name.is_empty()).then(|| SystemProfile {
        board_name: board_name.to_owned(),
        ..Default::default()
    });
    let metadata = ObservationMetadata {
        customer_id: CUSTOMER_ID,
        project_id: PROJECT_ID,
        metric_id,
        day_index,
        system_profile,
    };
    let observations: Vec<Observation> = (0..num_observations)
        .map(|_| Observation {
            parts: (0..num_parts)
                .map(|index| (part_name(index), make_part(index)))
                .collect(),
        })
        .collect();
    store
        .add_observation_batch(&metadata, &observations)
        .await
        .unwrap();
}

/// One batch per day over the inclusive day range.
pub async fn add_observations(
    store: &ObservationStore,
    metric_id: u32,
    first_day_index: u32,
    last_day_index: u32,
    num_per_day: usize,
    num_parts: usize,
    board_name: &str,
) {
    for day_index in first_day_index..=last_day_index {
        add_observation_batch(store, metric_id, day_index, num_parts, num_per_day, board_name)
            .await;
    }
}

/// Pages through the whole result set, feeding each response's token into
/// the next request, and returns the concatenated results.
pub async fn query_full_results(
    store: &ObservationStore,
    metric_id: u32,
    first_day_index: u32,
    last_day_index: u32,
    num_parts: usize,
    system_profile_fields: &[SystemProfileField],
    max_results: usize,
) -> Vec<QueryResult> {
    let parts: Vec<String> = (0..num_parts).map(part_name).collect();
    let mut full_results = Vec::new();
    let mut pagination_token = Bytes::new();
    loop {
        let response = store
            .query_observations(&ObservationQuery {
                customer_id: CUSTOMER_ID,
                project_id: PROJECT_ID,
                metric_id,
                first_day_index,
                last_day_index,
                parts: parts.clone(),
                system_profile_fields: system_profile_fields.to_vec(),
                max_results,
                pagination_token,
            })
            .await
            .unwrap();
        for result in &response.results {
            assert_eq!(result.metadata.customer_id, CUSTOMER_ID);
            assert_eq!(result.metadata.project_id, PROJECT_ID);
            assert_eq!(result.metadata.metric_id, metric_id);
        }
        full_results.extend(response.results);
        pagination_token = response.pagination_token;
        if pagination_token.is_empty() {
            return full_results;
        }
    }
}

/// Checks the shape of a full result set: total count, per-day grouping in
/// ascending day order, part count and variants, and profile presence.
pub fn check_full_results(
    results: &[QueryResult],
    expected_num_results: usize,
    expected_per_day: usize,
    expected_num_parts: usize,
    expected_first_day_index: u32,
    expected_board_name: &str,
) {
    assert_eq!(results.len(), expected_num_results);
    for (index, result) in results.iter().enumerate() {
        let expected_day = expected_first_day_index + (index / expected_per_day) as u32;
        assert_eq!(result.metadata.day_index, expected_day);
        assert_eq!(result.observation.parts.len(), expected_num_parts);

        match &result.metadata.system_profile {
            Some(profile) => {
                assert!(!expected_board_name.is_empty());
                assert_eq!(profile.board_name, expected_board_name);
            }
            None => assert!(expected_board_name.is_empty()),
        }

        for part_index in 0..expected_num_parts {
            let part = &result.observation.parts[&part_name(part_index)];
            match part_index % 3 {
                0 => assert!(matches!(part.value, Some(Value::Forculus(_)))),
                1 => assert!(matches!(part.value, Some(Value::Rappor(_)))),
                _ => assert!(matches!(part.value, Some(Value::BasicRappor(_)))),
            }
        }
    }
}

/// The main end-to-end scenario: two metrics with overlapping day ranges,
/// queried over wide, full, and narrowed ranges with and without part and
/// profile projection, then a per-metric delete.
pub async fn run_add_and_query(data_store: Arc<dyn DataStore>) {
    let store = ObservationStore::new(data_store);
    store.delete_all_observations().await.unwrap();

    // Metric 1: 100 observations with 2 parts per day for days [100, 109],
    // stored with a system profile.
    add_observations(&store, 1, 100, 109, 100, 2, BOARD_NAME).await;
    // Metric 2: 200 observations with 1 part per day for days [101, 110],
    // stored without a profile.
    add_observations(&store, 2, 101, 110, 200, 1, "").await;

    // Metric 1, days [50, 150], both parts, no profile requested.
    let results = query_full_results(&store, 1, 50, 150, 2, &[], 100).await;
    check_full_results(&results, 1000, 100, 2, 100, "");

    // Same query, now asking for the board name.
    let results =
        query_full_results(&store, 1, 50, 150, 2, &[SystemProfileField::BoardName], 100).await;
    check_full_results(&results, 1000, 100, 2, 100, BOARD_NAME);

    // The full day range returns the same rows.
    let results = query_full_results(&store, 1, 0, u32::MAX, 2, &[], 100).await;
    check_full_results(&results, 1000, 100, 2, 100, "");

    // Narrowed ranges.
    let results = query_full_results(&store, 1, 100, 105, 2, &[], 100).await;
    check_full_results(&results, 600, 100, 2, 100, "");
    let results = query_full_results(&store, 1, 105, 110, 2, &[], 100).await;
    check_full_results(&results, 500, 100, 2, 105, "");

    // Requesting no parts returns all of them.
    let results = query_full_results(&store, 1, 105, 110, 0, &[], 100).await;
    check_full_results(&results, 500, 100, 2, 105, "");
    let results =
        query_full_results(&store, 1, 105, 110, 0, &[SystemProfileField::BoardName], 100).await;
    check_full_results(&results, 500, 100, 2, 105, BOARD_NAME);

    // Requesting 1 of the 2 parts returns only that part.
    let results = query_full_results(&store, 1, 105, 110, 1, &[], 100).await;
    check_full_results(&results, 500, 100, 1, 105, "");
    let results =
        query_full_results(&store, 1, 105, 110, 1, &[SystemProfileField::BoardName], 100).await;
    check_full_results(&results, 500, 100, 1, 105, BOARD_NAME);

    // Metric 2, days [50, 150].
    let results = query_full_results(&store, 2, 50, 150, 1, &[], 100).await;
    check_full_results(&results, 2000, 200, 1, 101, "");

    // Requesting the board name attaches nothing: none was ever stored.
    let results =
        query_full_results(&store, 2, 50, 150, 1, &[SystemProfileField::BoardName], 100).await;
    check_full_results(&results, 2000, 200, 1, 101, "");

    let results = query_full_results(&store, 2, 0, u32::MAX, 1, &[], 100).await;
    check_full_results(&results, 2000, 200, 1, 101, "");
    let results = query_full_results(&store, 2, 100, 105, 1, &[], 100).await;
    check_full_results(&results, 1000, 200, 1, 101, "");
    let results = query_full_results(&store, 2, 105, 110, 1, &[], 100).await;
    check_full_results(&results, 1200, 200, 1, 105, "");
    let results = query_full_results(&store, 2, 105, 110, 0, &[], 100).await;
    check_full_results(&results, 1200, 200, 1, 105, "");
    let results =
        query_full_results(&store, 2, 105, 110, 0, &[SystemProfileField::BoardName], 100).await;
    check_full_results(&results, 1200, 200, 1, 105, "");

    // Metrics that never saw a write, including the invalid id 0.
    let results = query_full_results(&store, 3, 0, u32::MAX, 0, &[], 100).await;
    assert!(results.is_empty());
    let results = query_full_results(&store, 0, 0, u32::MAX, 0, &[], 100).await;
    assert!(results.is_empty());

    // Deleting metric 1 leaves metric 2 untouched.
    store
        .delete_all_for_metric(CUSTOMER_ID, PROJECT_ID, 1)
        .await
        .unwrap();
    let results = query_full_results(&store, 1, 0, u32::MAX, 0, &[], 100).await;
    assert!(results.is_empty());
    let results = query_full_results(&store, 2, 50, 150, 1, &[], 100).await;
    check_full_results(&results, 2000, 200, 1, 101, "");
}

/// Argument validation around the pagination token and the day range.
pub async fn run_query_with_invalid_arguments(data_store: Arc<dyn DataStore>) {
    let store = ObservationStore::new(data_store);
    let first_day_index = 42;

    let token_for_day = |day_index| {
        RowKey {
            customer_id: CUSTOMER_ID,
            project_id: PROJECT_ID,
            metric_id: 1,
            day_index,
            arrival_id: 0,
            random_id: 0,
        }
        .encode()
    };
    let query = |first_day_index, last_day_index, pagination_token| ObservationQuery {
        customer_id: CUSTOMER_ID,
        project_id: PROJECT_ID,
        metric_id: 1,
        first_day_index,
        last_day_index,
        pagination_token,
        ..Default::default()
    };

    // A token for a day before the range start is rejected.
    let response = store
        .query_observations(&query(first_day_index, first_day_index, token_for_day(41)))
        .await;
    assert_eq!(
        response.unwrap_err().code(),
        StatusCode::InvalidArguments
    );

    // A token at the range start is accepted.
    store
        .query_observations(&query(first_day_index, first_day_index, token_for_day(42)))
        .await
        .unwrap();

    // An inverted day range is rejected.
    let response = store
        .query_observations(&query(first_day_index, first_day_index - 1, Bytes::new()))
        .await;
    assert_eq!(
        response.unwrap_err().code(),
        StatusCode::InvalidArguments
    );

    // The single-day range itself is fine.
    store
        .query_observations(&query(first_day_index, first_day_index, Bytes::new()))
        .await
        .unwrap();
}

/// Token-driven pagination yields every row exactly once, in day order.
pub async fn run_pagination_exactly_once(data_store: Arc<dyn DataStore>) {
    let store = ObservationStore::new(data_store);

    for i in 0..25u32 {
        let observation = Observation {
            parts: [(
                "tag".to_owned(),
                ObservationPart {
                    value: Some(Value::Rappor(RapporObservation {
                        data: format!("obs-{:02}", i).into_bytes(),
                    })),
                },
            )]
            .into_iter()
            .collect(),
        };
        let metadata = ObservationMetadata {
            customer_id: CUSTOMER_ID,
            project_id: PROJECT_ID,
            metric_id: 9,
            day_index: 5 + (i % 5),
            system_profile: None,
        };
        store
            .add_observation_batch(&metadata, &[observation])
            .await
            .unwrap();
    }

    let mut seen = HashSet::new();
    let mut pagination_token = Bytes::new();
    let mut last_day = 0;
    loop {
        let response = store
            .query_observations(&ObservationQuery {
                customer_id: CUSTOMER_ID,
                project_id: PROJECT_ID,
                metric_id: 9,
                first_day_index: 0,
                last_day_index: u32::MAX,
                max_results: 7,
                pagination_token,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(response.results.len() <= 7);
        for result in &response.results {
            assert!(result.metadata.day_index >= last_day);
            last_day = result.metadata.day_index;
            let Some(Value::Rappor(rappor)) = &result.observation.parts["tag"].value else {
                panic!("unexpected part variant");
            };
            assert!(seen.insert(rappor.data.clone()), "row returned twice");
        }
        pagination_token = response.pagination_token;
        if pagination_token.is_empty() {
            break;
        }
    }
    assert_eq!(seen.len(), 25);
}
