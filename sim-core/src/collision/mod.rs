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
//! Collision detection
//!
//! Two independent layers:
//! - [`manager2d`]: X-axis lane overlaps between 2D box colliders, recomputed
//!   every frame into symmetric collision records.
//! - [`system3d`] and [`terrain`]: terrain height queries and ray queries
//!   against oriented boxes and upright cylinders.
//!
//! Both scan linearly; there is no broad phase.

pub mod manager2d;
pub mod system3d;
pub mod terrain;

pub use manager2d::{Collider, ColliderTag, Collision, CollisionManager2D};
pub use system3d::{BoxCollider, CollisionSystem3D, CylinderCollider, RaycastHit};
pub use terrain::HeightMap;
