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

//! Storage layer of the telemetry analyzer.
//!
//! Observations reported by the device fleet are persisted in a wide-column
//! store under row keys whose lexicographic order tracks (customer, project,
//! metric, day), so the analyzer's day-range queries are single ordered
//! scans and per-metric deletes are prefix drops. The [`store`] module
//! abstracts the backend; [`observation_store`] is the logical store the
//! analyzer services talk to.

pub mod config;
pub mod error;
pub mod observation_store;
mod profile;
pub mod report;
pub mod row_key;
pub mod store;

pub use error::{StatusCode, StoreError, StoreResult};
pub use observation_store::{ObservationQuery, ObservationStore, QueryResponse, QueryResult};
