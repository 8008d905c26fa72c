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
//! Scene context
//!
//! A [`Scene`] owns every pool of one loaded level and runs the per-frame
//! pass. All capacities come from the [`SceneConfig`] given at load and never
//! change afterwards.
//!
//! Frame order:
//! 1. [`Scene::begin_frame`] drops last frame's submitted 3D colliders; moving
//!    objects submit theirs afterwards.
//! 2. [`Scene::update`] resolves 2D collisions, applies the player's carry
//!    input, animates boxes, moves carried entities to their carriers and
//!    steps the physics world.

use crate::collision::{CollisionManager2D, CollisionSystem3D, HeightMap};
use crate::config::{ConfigError, SceneConfig};
use crate::entity::{CarryState, EntityPools, InteractOutcome, PickupOutcome};
use crate::error::{Result, SimError};
use crate::physics::{PhysicsStepReport, PhysicsWorld};
use crate::pool::{Handle, HandlePool, HandleRegistry};
use crate::transform::Transform3D;

/// Player input events for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInput {
    /// Pick up the nearest entity or drop the held one
    pub pickup_or_drop: bool,
    /// Use the held entity or the nearest box
    pub interact: bool,
}

/// What happened during one [`Scene::update`]
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Result of the pickup input
    pub pickup: PickupOutcome,
    /// Result of the interact input
    pub interaction: InteractOutcome,
    /// Why the held entity could not be dropped, if it could not
    pub drop_error: Option<SimError>,
    /// Physics landings and settles
    pub physics: PhysicsStepReport,
    /// 2D collision records written this frame
    pub collision_count: usize,
}

/// One loaded level
#[derive(Debug)]
pub struct Scene {
    config: SceneConfig,
    registry: HandleRegistry,
    player: Handle<Transform3D>,
    hands: CarryState,
    entities: EntityPools,
    collisions_2d: CollisionManager2D,
    collision_3d: CollisionSystem3D,
    physics: PhysicsWorld,
}

fn transform_pool(registry: &HandleRegistry) -> &HandlePool<Transform3D> {
    match registry.pool::<Transform3D>() {
        Some(pool) => pool,
        None => unreachable!("transform pool is allocated at scene load"),
    }
}

fn transform_pool_mut(registry: &mut HandleRegistry) -> &mut HandlePool<Transform3D> {
    match registry.pool_mut::<Transform3D>() {
        Some(pool) => pool,
        None => unreachable!("transform pool is allocated at scene load"),
    }
}

impl Scene {
    /// Validate `config` and size every pool from it
    pub fn load(config: SceneConfig, terrain: HeightMap) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let mut registry = HandleRegistry::new();
        registry.allocate_for_handle::<Transform3D>(config.max_transforms);
        let player = registry.make_handle(Transform3D::IDENTITY);

        log::info!(
            "scene loaded: {} transforms, {} colliders, {} physics entities, {} entities per kind",
            config.max_transforms,
            config.max_colliders,
            config.max_physics_entities,
            config.max_entities_per_kind
        );

        Ok(Scene {
            registry,
            player,
            hands: CarryState::new(),
            entities: EntityPools::with_capacity(config.max_entities_per_kind),
            collisions_2d: CollisionManager2D::new(config.max_colliders, config.max_collisions),
            collision_3d: CollisionSystem3D::new(terrain, &config),
            physics: PhysicsWorld::new(config.max_physics_entities, config.physics),
            config,
        })
    }

    /// Configuration the scene was loaded with
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Handle registry of this scene
    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Handle registry of this scene
    pub fn registry_mut(&mut self) -> &mut HandleRegistry {
        &mut self.registry
    }

    /// Transforms reachable through handles
    pub fn transforms(&self) -> &HandlePool<Transform3D> {
        transform_pool(&self.registry)
    }

    /// Transforms reachable through handles
    pub fn transforms_mut(&mut self) -> &mut HandlePool<Transform3D> {
        transform_pool_mut(&mut self.registry)
    }

    /// Register a transform, e.g. for a 2D collider to follow
    pub fn add_transform(&mut self, transform: Transform3D) -> Result<Handle<Transform3D>> {
        self.registry.try_make_handle(transform)
    }

    /// Handle of the player's transform
    pub fn player(&self) -> Handle<Transform3D> {
        self.player
    }

    /// The player's transform
    pub fn player_transform(&self) -> &Transform3D {
        &self.transforms()[self.player]
    }

    /// The player's transform
    pub fn player_transform_mut(&mut self) -> &mut Transform3D {
        let player = self.player;
        &mut self.transforms_mut()[player]
    }

    /// What the player is holding
    pub fn hands(&self) -> &CarryState {
        &self.hands
    }

    /// Gameplay entity pools
    pub fn entities(&self) -> &EntityPools {
        &self.entities
    }

    /// Gameplay entity pools
    pub fn entities_mut(&mut self) -> &mut EntityPools {
        &mut self.entities
    }

    /// 2D lane collisions
    pub fn collisions_2d(&self) -> &CollisionManager2D {
        &self.collisions_2d
    }

    /// 2D lane collisions
    pub fn collisions_2d_mut(&mut self) -> &mut CollisionManager2D {
        &mut self.collisions_2d
    }

    /// Terrain and 3D colliders
    pub fn collision_3d(&self) -> &CollisionSystem3D {
        &self.collision_3d
    }

    /// Terrain and 3D colliders
    pub fn collision_3d_mut(&mut self) -> &mut CollisionSystem3D {
        &mut self.collision_3d
    }

    /// Falling entities
    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    /// Falling entities
    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    /// Start a frame: forget the colliders submitted last frame
    pub fn begin_frame(&mut self) {
        self.collision_3d.clear_submitted();
    }

    /// Run one frame of simulation
    ///
    /// A drop that does not fit into the physics world is reported in
    /// [`FrameReport::drop_error`]; the player keeps holding the entity and
    /// the rest of the frame still runs.
    ///
    /// # Panics
    ///
    /// Panics if `elapsed_time` is negative, NaN, or infinite.
    pub fn update(&mut self, elapsed_time: f32, input: FrameInput) -> FrameReport {
        self.collisions_2d
            .do_collisions(transform_pool(&self.registry));

        let player = self.transforms()[self.player];

        let mut drop_error = None;
        let pickup = if input.pickup_or_drop {
            match self
                .hands
                .pickup_or_drop(player.position, &mut self.entities, &mut self.physics)
            {
                Ok(outcome) => outcome,
                Err(error) => {
                    log::warn!("cannot drop {}: {}", self.hands.carried(), error);
                    drop_error = Some(error);
                    PickupOutcome::Nothing
                }
            }
        } else {
            PickupOutcome::Nothing
        };

        let interaction = if input.interact {
            self.hands
                .interact(player.position, &mut self.entities, &self.collision_3d)
        } else {
            InteractOutcome::Nothing
        };

        self.entities.update_boxes(elapsed_time);
        self.hands
            .update_carried_transforms(&player, &mut self.entities);
        let physics = self
            .physics
            .update(elapsed_time, &mut self.entities, &self.collision_3d);

        FrameReport {
            pickup,
            interaction,
            drop_error,
            physics,
            collision_count: self.collisions_2d.collision_count(),
        }
    }

    /// Empty every dynamic pool for a fresh start of the same level
    ///
    /// Terrain and static 3D colliders stay. Every transform handle made
    /// before the reset stops resolving; the player gets a new one at the
    /// origin.
    pub fn reset(&mut self) {
        let cleared = self.entities.total_count();
        self.physics.clear();
        self.entities.clear();
        self.hands.clear();
        self.collisions_2d.clear();
        self.collision_3d.clear_submitted();

        self.registry.reset::<Transform3D>();
        self.player = self.registry.make_handle(Transform3D::IDENTITY);
        log::debug!("scene reset, {} entities cleared", cleared);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityReference;
    use glam::{Vec2, Vec3};

    fn scene() -> Scene {
        Scene::load(SceneConfig::new(8, 8).with_entities_per_kind(4), HeightMap::flat(0.0, 100.0)).unwrap()
    }

    #[test]
    fn test_load_rejects_invalid_config() {
        let mut config = SceneConfig::default();
        config.max_transforms = 0;
        assert!(matches!(
            Scene::load(config, HeightMap::flat(0.0, 1.0)),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_player_transform_is_registered() {
        let mut scene = scene();
        assert!(scene.registry().is_handle_valid(scene.player()));
        scene.player_transform_mut().position = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(scene.player_transform().position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_pickup_then_drop_falls_and_settles() {
        let mut scene = scene();
        scene.player_transform_mut().position = Vec3::new(10.0, 10.0, 0.0);
        let pot = scene
            .entities_mut()
            .spawn_small_pot(Transform3D::from_position(Vec3::new(10.5, 10.0, 0.0)))
            .unwrap();

        let pick = FrameInput {
            pickup_or_drop: true,
            ..FrameInput::default()
        };
        let report = scene.update(1.0 / 60.0, pick);
        assert_eq!(report.pickup, PickupOutcome::PickedUp(pot));
        assert!((scene.entities().position(pot).unwrap().z - 0.7).abs() < 1e-5);

        let report = scene.update(1.0 / 60.0, pick);
        assert_eq!(report.pickup, PickupOutcome::Dropped(pot));
        assert!(scene.physics().contains(pot));

        let mut landings = 0;
        for _ in 0..600 {
            let report = scene.update(1.0 / 60.0, FrameInput::default());
            landings += report.physics.landings.len();
            if !scene.physics().contains(pot) {
                break;
            }
        }
        assert!(landings >= 1);
        assert!(scene.physics().is_empty());
        assert_eq!(scene.entities().position(pot).unwrap().z, 0.0);
    }

    #[test]
    fn test_failed_drop_keeps_rest_of_frame() {
        let config = SceneConfig::new(8, 1).with_entities_per_kind(4);
        let mut scene = Scene::load(config, HeightMap::flat(0.0, 100.0)).unwrap();
        let water = scene.entities_mut().spawn_water(Vec3::new(10.5, 10.0, 0.0), 1.0).unwrap();
        let storage_box = scene
            .entities_mut()
            .spawn_box(Transform3D::from_position(Vec3::new(12.5, 10.0, 0.0)))
            .unwrap();
        let tree = scene
            .entities_mut()
            .spawn_tree(Transform3D::from_position(Vec3::new(30.0, 30.0, 0.0)))
            .unwrap();

        scene.player_transform_mut().position = Vec3::new(10.0, 10.0, 0.0);
        let pick = FrameInput {
            pickup_or_drop: true,
            ..FrameInput::default()
        };
        assert_eq!(scene.update(1.0 / 60.0, pick).pickup, PickupOutcome::PickedUp(water));

        // One step below the ground, so the next step settles it
        scene.physics_mut().push_entity(tree);
        scene.update(1.0 / 60.0, FrameInput::default());
        assert!(scene.physics().contains(tree));
        scene.player_transform_mut().position = Vec3::new(11.5, 10.0, 0.0);
        let report = scene.update(
            1.0 / 60.0,
            FrameInput {
                pickup_or_drop: true,
                interact: true,
            },
        );

        assert_eq!(report.pickup, PickupOutcome::Nothing);
        assert!(matches!(
            report.drop_error,
            Some(SimError::CapacityExceeded { capacity: 1, .. })
        ));
        assert_eq!(
            report.interaction,
            InteractOutcome::PutInto {
                entity: water,
                container: storage_box
            }
        );
        assert_eq!(report.physics.settled, vec![tree]);
        assert!(scene.physics().is_empty());
    }

    #[test]
    fn test_update_runs_2d_collisions() {
        let mut scene = scene();
        let a = scene.add_transform(Transform3D::IDENTITY).unwrap();
        let b = scene
            .add_transform(Transform3D::from_position(Vec3::new(0.9, 0.0, 0.0)))
            .unwrap();
        let collider = scene.collisions_2d_mut().push_collider(
            a,
            Vec2::splat(0.5),
            Vec2::ZERO,
            crate::collision::ColliderTag::Default,
        );
        scene.collisions_2d_mut().push_collider(
            b,
            Vec2::splat(0.5),
            Vec2::ZERO,
            crate::collision::ColliderTag::Default,
        );

        let report = scene.update(0.016, FrameInput::default());
        assert_eq!(report.collision_count, 2);
        assert!(scene.collisions_2d().collider(collider).unwrap().has_collision);
    }

    #[test]
    fn test_reset_invalidates_old_handles() {
        let mut scene = scene();
        let old_player = scene.player();
        let extra = scene.add_transform(Transform3D::IDENTITY).unwrap();
        scene
            .entities_mut()
            .spawn_tree(Transform3D::IDENTITY)
            .unwrap();

        scene.reset();

        assert!(!scene.registry().is_handle_valid(old_player));
        assert!(!scene.registry().is_handle_valid(extra));
        assert!(scene.registry().is_handle_valid(scene.player()));
        assert_eq!(scene.entities().total_count(), 0);
        assert_eq!(scene.hands().carried(), EntityReference::NONE);
    }
}
