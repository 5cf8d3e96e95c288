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

use std::collections::HashMap;

/// A single encoded measurement produced by a reporting device.
///
/// An observation is composed of named *parts*, each carrying one privacy
/// encoding variant. The storage layer treats the payload as opaque; only
/// the part names are meaningful to queries.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Observation {
    /// Part name to encoded part payload.
    #[prost(map = "string, message", tag = "1")]
    pub parts: HashMap<String, ObservationPart>,
}

/// One named sub-field of an [`Observation`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ObservationPart {
    #[prost(oneof = "observation_part::Value", tags = "1, 2, 3")]
    pub value: Option<observation_part::Value>,
}

pub mod observation_part {
    /// The encoding variant carried by a part. Exactly one is set.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(message, tag = "1")]
        Forculus(super::ForculusObservation),
        #[prost(message, tag = "2")]
        Rappor(super::RapporObservation),
        #[prost(message, tag = "3")]
        BasicRappor(super::BasicRapporObservation),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ForculusObservation {
    #[prost(bytes = "vec", tag = "1")]
    pub ciphertext: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RapporObservation {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BasicRapporObservation {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
}

/// Descriptor of the device that produced a batch of observations.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SystemProfile {
    #[prost(enumeration = "system_profile::Os", tag = "1")]
    pub os: i32,
    #[prost(enumeration = "system_profile::Arch", tag = "2")]
    pub arch: i32,
    #[prost(string, tag = "3")]
    pub board_name: String,
}

pub mod system_profile {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Os {
        UnknownOs = 0,
        Fuchsia = 1,
        Linux = 2,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Arch {
        UnknownArch = 0,
        X8664 = 1,
        Arm64 = 2,
    }
}

/// Fields of [`SystemProfile`] that a query may ask to have echoed back
/// alongside each result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SystemProfileField {
    Os = 0,
    Arch = 1,
    BoardName = 2,
}

/// Header shared by every observation in an ingest batch.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ObservationMetadata {
    #[prost(uint32, tag = "1")]
    pub customer_id: u32,
    #[prost(uint32, tag = "2")]
    pub project_id: u32,
    #[prost(uint32, tag = "3")]
    pub metric_id: u32,
    /// Days since the Unix epoch; the coarse temporal bucket for queries.
    #[prost(uint32, tag = "4")]
    pub day_index: u32,
    #[prost(message, optional, tag = "5")]
    pub system_profile: Option<SystemProfile>,
}
