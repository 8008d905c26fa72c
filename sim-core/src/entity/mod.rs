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
//! Gameplay entities
//!
//! Entities are plain structs in per-kind pools. [`EntityReference`] names
//! one of them, and [`EntityPools`] resolves references with an exhaustive
//! match on [`EntityKind`].

pub mod interaction;
pub mod pools;
pub mod reference;

pub use interaction::{CarryState, InteractOutcome, PickupOutcome};
pub use pools::{
    BoxState, EntityPools, Pot, Raccoon, RaccoonMode, StorageBox, Tree, WaterDrop, FULL_WATER_LEVEL,
};
pub use reference::{EntityKind, EntityReference};
