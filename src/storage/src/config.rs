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

//! Configuration of the analyzer storage layer.
//!
//! All fields have sane defaults so an empty TOML document is a valid
//! config; deployments override only what they need.

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Which [`DataStore`](crate::store::DataStore) backend to run against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-memory ordered map. Tests and local development only.
    #[default]
    Memory,
    /// The hosted wide-column service.
    Bigtable,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default)]
    pub bigtable: BigtableConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BigtableConfig {
    /// Cloud project owning the analyzer tables.
    #[serde(default)]
    pub project: String,
    /// Instance hosting the analyzer tables.
    #[serde(default)]
    pub instance: String,
    /// Upper bound on rows fetched by one remote scan RPC.
    #[serde(default = "default::scan_page_size")]
    pub scan_page_size: usize,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for BigtableConfig {
    fn default() -> Self {
        toml::from_str("").unwrap()
    }
}

/// Backoff budget for transient RPC failures.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, the first try included.
    #[serde(default = "default::retry_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default::retry_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default::retry_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        toml::from_str("").unwrap()
    }
}

mod default {
    pub fn scan_page_size() -> usize {
        1000
    }

    pub fn retry_max_attempts() -> usize {
        5
    }

    pub fn retry_base_delay_ms() -> u64 {
        20
    }

    pub fn retry_max_delay_ms() -> u64 {
        5000
    }
}

/// Loads the storage configuration from a TOML file.
pub fn load_config(path: &str) -> anyhow::Result<StorageConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path))?;
    let config =
        toml::from_str(&raw).with_context(|| format!("failed to parse config file {}", path))?;
    Ok(config)
}
