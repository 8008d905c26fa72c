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
//! Drop-and-bounce physics
//!
//! The physics world only simulates entities that are currently falling.
//! Dropping an entity pushes it; it falls under gravity, bounces off the
//! terrain losing speed each time, and is removed once a bounce is too slow
//! to matter. Motion is vertical only and integrated with semi-implicit
//! Euler:
//!
//! ```text
//! v(t + dt) = v(t) + g * dt
//! z(t + dt) = z(t) + v(t + dt) * dt
//! ```

use crate::collision::CollisionSystem3D;
use crate::config::PhysicsConfig;
use crate::entity::{EntityPools, EntityReference};
use crate::error::Result;
use crate::pool::Arena;
use glam::Vec3;

/// An entity in free fall
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsEntity {
    /// Which entity
    pub entity: EntityReference,
    /// Vertical velocity, negative is down
    pub velocity: f32,
}

/// A ground contact during one update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landing {
    /// Entity that hit the ground
    pub entity: EntityReference,
    /// Downward speed at impact
    pub impact_speed: f32,
    /// Impact speed normalized to `[0, 1]` for audio
    pub volume: f32,
    /// Where it hit the ground
    pub position: Vec3,
}

/// What happened during one [`PhysicsWorld::update`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicsStepReport {
    /// Ground contacts in update order
    pub landings: Vec<Landing>,
    /// Entities that came to rest and left the simulation
    pub settled: Vec<EntityReference>,
}

/// Dense set of falling entities
#[derive(Debug)]
pub struct PhysicsWorld {
    entities: Arena<PhysicsEntity>,
    config: PhysicsConfig,
}

impl PhysicsWorld {
    /// Create a world for at most `capacity` falling entities
    pub fn new(capacity: usize, config: PhysicsConfig) -> Self {
        PhysicsWorld {
            entities: Arena::with_capacity(capacity),
            config,
        }
    }

    /// Physics constants in use
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Start simulating `entity` from rest
    ///
    /// The caller must already have taken the entity out of any container
    /// or hand. Pushing an entity that is already simulated is a bug: it is
    /// logged and asserted in debug builds.
    ///
    /// # Panics
    ///
    /// Panics when the world is full.
    pub fn push_entity(&mut self, entity: EntityReference) {
        self.warn_on_duplicate(entity);
        self.entities.push(PhysicsEntity {
            entity,
            velocity: 0.0,
        });
    }

    /// Start simulating `entity` from rest, failing when the world is full
    pub fn try_push_entity(&mut self, entity: EntityReference) -> Result<()> {
        self.warn_on_duplicate(entity);
        self.entities.try_push(PhysicsEntity {
            entity,
            velocity: 0.0,
        })?;
        Ok(())
    }

    fn warn_on_duplicate(&self, entity: EntityReference) {
        if self.contains(entity) {
            log::warn!("{} pushed to physics twice", entity);
            debug_assert!(false, "Entity {} is already simulated", entity);
        }
    }

    /// Stop simulating `entity`
    ///
    /// Removes the first match only and returns it; `None` when the entity
    /// is not simulated. Reorders the remaining entities.
    pub fn remove_entity(&mut self, entity: EntityReference) -> Option<PhysicsEntity> {
        let index = self.entities.position(|e| e.entity == entity)?;
        Some(self.entities.swap_remove(index))
    }

    /// Check if `entity` is simulated
    pub fn contains(&self, entity: EntityReference) -> bool {
        self.entities.iter().any(|e| e.entity == entity)
    }

    /// Number of simulated entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if nothing is falling
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Simulated entities in update order
    pub fn entities(&self) -> &[PhysicsEntity] {
        self.entities.as_slice()
    }

    /// Drop every simulated entity
    pub fn clear(&mut self) {
        self.entities.flush();
    }

    /// Advance every falling entity by `elapsed_time` seconds
    ///
    /// Entities whose reference no longer resolves are dropped with a
    /// warning.
    ///
    /// # Panics
    ///
    /// Panics if `elapsed_time` is negative, NaN, or infinite.
    pub fn update(
        &mut self,
        elapsed_time: f32,
        pools: &mut EntityPools,
        collision: &CollisionSystem3D,
    ) -> PhysicsStepReport {
        assert!(
            elapsed_time >= 0.0 && elapsed_time.is_finite(),
            "Elapsed time must be non-negative and finite"
        );

        let config = self.config;
        let mut report = PhysicsStepReport::default();
        let mut index = 0;

        while index < self.entities.len() {
            let body = &mut self.entities[index];
            let Some(position) = pools.position_mut(body.entity) else {
                log::warn!("{} no longer resolves; dropped from physics", body.entity);
                self.entities.swap_remove(index);
                continue;
            };

            let ground_height = collision.terrain_height(position.truncate());

            if body.velocity < 0.0 && position.z < ground_height {
                position.z = ground_height;

                let impact_speed = -body.velocity;
                report.landings.push(Landing {
                    entity: body.entity,
                    impact_speed,
                    volume: impact_speed.clamp(0.0, config.max_impact_speed)
                        / config.max_impact_speed,
                    position: *position,
                });

                body.velocity *= -config.bounce_factor;
                if body.velocity.abs() < config.sleep_threshold {
                    log::debug!("{} settled at z = {}", body.entity, ground_height);
                    report.settled.push(body.entity);
                    self.entities.swap_remove(index);
                    continue;
                }
            } else {
                body.velocity += config.gravity * elapsed_time;
                position.z += body.velocity * elapsed_time;
            }

            index += 1;
        }

        log::trace!(
            "physics step: {} falling, {} landings, {} settled",
            self.entities.len(),
            report.landings.len(),
            report.settled.len()
        );
        report
    }
}
