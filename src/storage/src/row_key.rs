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

//! Canonical encoding of observation row keys.
//!
//! A row key encodes six fields, most significant first: customer, project,
//! metric, day index, arrival id, random id. Each integer is serialized as
//! fixed-width zero-padded big-endian hex (u32 -> 8 chars, u64 -> 16 chars)
//! with a `:` between fields, so that byte-wise lexicographic order of the
//! encodings equals the numeric order of the tuples. This keeps rows of one
//! metric contiguous and sorted by day, which is what makes day-range scans
//! and per-metric prefix deletes cheap. The encoded form is the persisted
//! schema; changing it is a breaking migration.
//!
//! `arrival_id` is strictly monotonic within a process and `random_id` makes
//! independent writer processes collision-free without coordination. Writers
//! with skewed clocks can produce keys that interleave with a concurrent
//! reader's pagination window, so a paginating reader may see such rows in
//! later pages only; callers that need a stable snapshot must quiesce
//! writes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use rand::Rng;

use crate::error::{StoreError, StoreResult};

const DELIMITER: char = ':';
const U32_HEX_WIDTH: usize = 8;
const U64_HEX_WIDTH: usize = 16;

/// Low bits of the arrival id reserved for the per-process burst counter.
const ARRIVAL_COUNTER_BITS: u32 = 12;

/// The decoded form of an observation row key.
///
/// Derived `Ord` matches the lexicographic order of [`RowKey::encode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey {
    pub customer_id: u32,
    pub project_id: u32,
    pub metric_id: u32,
    pub day_index: u32,
    pub arrival_id: u64,
    pub random_id: u32,
}

impl RowKey {
    /// 5 u32 fields, one u64 field, 5 delimiters.
    pub const ENCODED_LEN: usize = 5 * U32_HEX_WIDTH + U64_HEX_WIDTH + 5;

    /// A fresh key for one observation written under the given metadata ids.
    pub fn generate(customer_id: u32, project_id: u32, metric_id: u32, day_index: u32) -> Self {
        Self {
            customer_id,
            project_id,
            metric_id,
            day_index,
            arrival_id: next_arrival_id(),
            random_id: rand::thread_rng().gen(),
        }
    }

    pub fn encode(&self) -> Bytes {
        format!(
            "{:08x}:{:08x}:{:08x}:{:08x}:{:016x}:{:08x}",
            self.customer_id,
            self.project_id,
            self.metric_id,
            self.day_index,
            self.arrival_id,
            self.random_id
        )
        .into()
    }

    /// Decodes a well-formed row key; anything else is `InvalidArguments`.
    pub fn decode(raw: &[u8]) -> StoreResult<Self> {
        let malformed =
            || StoreError::invalid_arguments(format!("malformed row key {}", raw.escape_ascii()));

        if raw.len() != Self::ENCODED_LEN {
            return Err(malformed());
        }
        let text = std::str::from_utf8(raw).map_err(|_| malformed())?;
        let mut fields = text.split(DELIMITER);
        let mut next_field = |width: usize| -> StoreResult<u64> {
            let field = fields.next().ok_or_else(malformed)?;
            if field.len() != width || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(malformed());
            }
            u64::from_str_radix(field, 16).map_err(|_| malformed())
        };

        let key = Self {
            customer_id: next_field(U32_HEX_WIDTH)? as u32,
            project_id: next_field(U32_HEX_WIDTH)? as u32,
            metric_id: next_field(U32_HEX_WIDTH)? as u32,
            day_index: next_field(U32_HEX_WIDTH)? as u32,
            arrival_id: next_field(U64_HEX_WIDTH)?,
            random_id: next_field(U32_HEX_WIDTH)? as u32,
        };
        Ok(key)
    }

    /// The smallest key strictly greater than `self`, or `None` if every
    /// field is saturated. Because keys are fixed-width, this is also the
    /// smallest *encodable* key strictly greater, which makes it suitable
    /// as an inclusive scan start after `self` (i.e. a pagination token).
    pub fn successor(mut self) -> Option<Self> {
        if let Some(random_id) = self.random_id.checked_add(1) {
            self.random_id = random_id;
            return Some(self);
        }
        self.random_id = 0;
        if let Some(arrival_id) = self.arrival_id.checked_add(1) {
            self.arrival_id = arrival_id;
            return Some(self);
        }
        self.arrival_id = 0;
        if let Some(day_index) = self.day_index.checked_add(1) {
            self.day_index = day_index;
            return Some(self);
        }
        self.day_index = 0;
        if let Some(metric_id) = self.metric_id.checked_add(1) {
            self.metric_id = metric_id;
            return Some(self);
        }
        self.metric_id = 0;
        if let Some(project_id) = self.project_id.checked_add(1) {
            self.project_id = project_id;
            return Some(self);
        }
        self.project_id = 0;
        if let Some(customer_id) = self.customer_id.checked_add(1) {
            self.customer_id = customer_id;
            return Some(self);
        }
        None
    }
}

/// Key prefix shared by every row of one metric, trailing delimiter
/// included. Used for per-metric range deletes.
pub fn metric_prefix(customer_id: u32, project_id: u32, metric_id: u32) -> Bytes {
    format!("{:08x}:{:08x}:{:08x}:", customer_id, project_id, metric_id).into()
}

/// The smallest possible key for the given day: zero arrival and random ids.
pub fn day_start_key(customer_id: u32, project_id: u32, metric_id: u32, day_index: u32) -> Bytes {
    RowKey {
        customer_id,
        project_id,
        metric_id,
        day_index,
        arrival_id: 0,
        random_id: 0,
    }
    .encode()
}

/// Exclusive upper bound for a scan covering days `..= last_day_index` of
/// one metric: the successor of the key prefix through the day field. On
/// day saturation the carry moves into the next more significant field so
/// the bound never admits rows of another metric; only a fully saturated
/// tuple has no upper bound.
pub fn day_range_limit(
    customer_id: u32,
    project_id: u32,
    metric_id: u32,
    last_day_index: u32,
) -> Option<Bytes> {
    let (customer_id, project_id, metric_id, day_index) = match last_day_index.checked_add(1) {
        Some(day_index) => (customer_id, project_id, metric_id, day_index),
        None => match metric_id.checked_add(1) {
            Some(metric_id) => (customer_id, project_id, metric_id, 0),
            None => match project_id.checked_add(1) {
                Some(project_id) => (customer_id, project_id, 0, 0),
                None => match customer_id.checked_add(1) {
                    Some(customer_id) => (customer_id, 0, 0, 0),
                    None => return None,
                },
            },
        },
    };
    Some(day_start_key(customer_id, project_id, metric_id, day_index))
}

/// Issues arrival ids that are strictly monotonic within this process.
///
/// The id is wall-clock microseconds shifted left by the counter width; the
/// low bits absorb bursts of writes landing on the same microsecond. A CAS
/// max against the last issued value keeps the sequence strictly increasing
/// even if the clock steps backwards.
fn next_arrival_id() -> u64 {
    static LAST: AtomicU64 = AtomicU64::new(0);

    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64;
    let candidate = micros << ARRIVAL_COUNTER_BITS;

    let mut prev = LAST.load(Ordering::Relaxed);
    loop {
        let next = candidate.max(prev + 1);
        match LAST.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => prev = observed,
        }
    }
}
