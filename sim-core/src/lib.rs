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
//! # Sim Core
//!
//! Fixed-capacity simulation layer of a small 3D game: handle-based pools,
//! 2D lane collisions, terrain and ray queries, and drop-and-bounce physics
//! for carried gameplay entities.
//!
//! ## Features
//!
//! - **Fixed capacities**: every pool is sized once from a [`SceneConfig`]
//!   and never grows
//! - **Handles**: validity-checked `(tag, index)` references into per-scene
//!   pools, no global state
//! - **Collisions**: X-axis lane overlaps with symmetric records, plus
//!   heightmap terrain and oriented box / cylinder ray queries
//! - **Physics**: gravity and ground bounce until an entity settles
//! - **Parallelization**: optional Rayon pair scan for 2D collisions
//!
//! ## Example
//!
//! ```rust
//! use sim_core::{FrameInput, HeightMap, Scene, SceneConfig, Transform3D};
//! use glam::Vec3;
//!
//! let mut scene = Scene::load(SceneConfig::default(), HeightMap::flat(0.0, 64.0)).unwrap();
//! let tree = scene
//!     .entities_mut()
//!     .spawn_tree(Transform3D::from_position(Vec3::new(4.0, 4.0, 5.0)))
//!     .unwrap();
//! scene.physics_mut().push_entity(tree);
//!
//! for _ in 0..600 {
//!     scene.begin_frame();
//!     scene.update(1.0 / 60.0, FrameInput::default());
//! }
//! assert!(scene.physics().is_empty());
//! assert_eq!(scene.entities().position(tree).unwrap().z, 0.0);
//! ```

#![warn(missing_docs)]

/// Collision detection in 2D and 3D
pub mod collision;

/// Scene configuration
pub mod config;

/// Gameplay entities and carrying
pub mod entity;

/// Error types
pub mod error;

/// Drop-and-bounce physics
pub mod physics;

/// Fixed-capacity pools and handles
pub mod pool;

/// Scene context and frame loop
pub mod scene;

/// World transforms
pub mod transform;

pub use collision::{CollisionManager2D, CollisionSystem3D, HeightMap};
pub use config::{ConfigError, PhysicsConfig, SceneConfig};
pub use entity::{EntityKind, EntityPools, EntityReference};
pub use error::{Result, SimError};
pub use physics::{PhysicsStepReport, PhysicsWorld};
pub use pool::{Arena, Handle, HandlePool, HandleRegistry};
pub use scene::{FrameInput, FrameReport, Scene};
pub use transform::Transform3D;
