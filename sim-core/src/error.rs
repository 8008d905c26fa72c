// Copyright 2025 John Brosnihan
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
//! Error types for the simulation core
//!
//! Most invariant violations in this crate are programmer errors and are
//! reported with assertions. The types here cover the fallible `try_*` paths
//! and the load-time validation of scene data.

use thiserror::Error;

/// Errors reported by pools, handles and scene data validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// A fixed-capacity pool had no room left
    #[error("pool for {type_name} is full (capacity {capacity})")]
    CapacityExceeded {
        /// Name of the pooled type
        type_name: &'static str,
        /// Capacity the pool was sized with
        capacity: usize,
    },

    /// A handle was made for a type whose pool was never allocated
    #[error("no pool allocated for {0}")]
    PoolNotAllocated(&'static str),

    /// A handle did not resolve to a live item
    #[error("invalid handle for {type_name} (tag {tag}, index {index})")]
    InvalidHandle {
        /// Name of the pooled type
        type_name: &'static str,
        /// Validity tag carried by the handle
        tag: u32,
        /// Index carried by the handle
        index: u32,
    },

    /// Terrain height data was malformed
    #[error("invalid height map: {0}")]
    InvalidHeightMap(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SimError>;
