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

use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Status codes surfaced at the RPC boundary. The numeric values are part
/// of the wire contract with the analyzer services and must not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
    Ok = 0,
    InvalidArguments = 1,
    PreconditionFailed = 2,
    AlreadyExists = 3,
    NotFound = 4,
    OperationFailed = 5,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

impl StoreError {
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    pub fn operation_failed(msg: impl Into<String>) -> Self {
        Self::OperationFailed(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// The wire status code for this error. `Ok` is never produced here;
    /// success is the `Ok` arm of [`StoreResult`].
    pub fn code(&self) -> StatusCode {
        match self {
            Self::InvalidArguments(_) => StatusCode::InvalidArguments,
            Self::PreconditionFailed(_) => StatusCode::PreconditionFailed,
            Self::AlreadyExists(_) => StatusCode::AlreadyExists,
            Self::NotFound(_) => StatusCode::NotFound,
            Self::OperationFailed(_) => StatusCode::OperationFailed,
        }
    }
}
