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

use telemetry_pb::observation::{SystemProfile, SystemProfileField};

/// Reduces a stored profile to the fields a query requested.
///
/// Returns `None` when nothing was requested, so the result metadata
/// carries no profile at all rather than an empty one. Rows that never had
/// a stored profile are the caller's concern.
pub(crate) fn project_system_profile(
    profile: &SystemProfile,
    requested_fields: &[SystemProfileField],
) -> Option<SystemProfile> {
    if requested_fields.is_empty() {
        return None;
    }
    let mut projected = SystemProfile::default();
    for field in requested_fields {
        match field {
            SystemProfileField::Os => projected.os = profile.os,
            SystemProfileField::Arch => projected.arch = profile.arch,
            SystemProfileField::BoardName => {
                projected.board_name.clone_from(&profile.board_name)
            }
        }
    }
    Some(projected)
}
