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
//! Carrying entities around
//!
//! The player holds at most one entity. Picking something up takes it out of
//! the physics world and out of any container; dropping it hands it back to
//! the physics world to fall. Boxes and small pots carry their contents the
//! same way the player does.

use crate::collision::CollisionSystem3D;
use crate::entity::pools::{BoxState, EntityPools, RaccoonMode};
use crate::entity::{EntityKind, EntityReference};
use crate::error::Result;
use crate::physics::PhysicsWorld;
use crate::transform::Transform3D;
use glam::{Quat, Vec3};

/// Reach for picking up and interacting with most entities
pub const PICKUP_DISTANCE: f32 = 1.0;

/// Reach for boxes, which are larger
pub const BOX_REACH: f32 = 0.5 + PICKUP_DISTANCE;

/// Where the player holds an entity, in the player's local space
pub const PLAYER_CARRY_OFFSET: Vec3 = Vec3::new(0.0, 0.7, 0.7);

/// Where boxes and pots hold their contents, in their local space
pub const CONTAINER_CARRY_OFFSET: Vec3 = Vec3::new(0.0, 0.0, 0.1);

/// Kinds searched by a pickup after boxes, in priority order
const PICKUP_ORDER: [EntityKind; 4] = [
    EntityKind::SmallPot,
    EntityKind::Water,
    EntityKind::Raccoon,
    EntityKind::Tree,
];

/// Result of [`CarryState::pickup_or_drop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupOutcome {
    /// Nothing in reach and nothing held
    Nothing,
    /// The entity is now held
    PickedUp(EntityReference),
    /// The entity was released and is falling
    Dropped(EntityReference),
}

/// Result of [`CarryState::interact`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractOutcome {
    /// Nothing to interact with
    Nothing,
    /// The held entity went into a box or pot
    PutInto {
        /// Entity that was held
        entity: EntityReference,
        /// Box or pot that now holds it
        container: EntityReference,
    },
    /// A box lid started opening or closing
    ToggledBox(EntityReference),
    /// The held tree was planted in the ground
    Planted(EntityReference),
}

/// What the player is holding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarryState {
    carried: EntityReference,
}

impl CarryState {
    /// Empty hands
    pub fn new() -> Self {
        Self::default()
    }

    /// The held entity, [`EntityReference::NONE`] when empty
    pub fn carried(&self) -> EntityReference {
        self.carried
    }

    /// Check if nothing is held
    pub fn is_empty(&self) -> bool {
        self.carried.is_none()
    }

    /// Forget the held entity without dropping it
    pub fn clear(&mut self) {
        self.carried = EntityReference::NONE;
    }

    /// Pick up the nearest entity in reach, or drop the held one
    ///
    /// Boxes are searched first: an open box with something inside gives up
    /// its contents, any other box is picked up itself. Then small pots,
    /// water, raccoons and trees. Within a kind the nearest entity wins.
    ///
    /// Dropping fails without releasing the entity when the physics world is
    /// full.
    pub fn pickup_or_drop(
        &mut self,
        player_position: Vec3,
        pools: &mut EntityPools,
        physics: &mut PhysicsWorld,
    ) -> Result<PickupOutcome> {
        if self.carried.is_some() {
            return self.drop_carried(pools, physics);
        }

        let Some(target) = self.find_pickup(player_position, pools) else {
            return Ok(PickupOutcome::Nothing);
        };

        pools.detach_from_container(target);
        physics.remove_entity(target);
        match target.kind {
            EntityKind::Raccoon => pools.raccoons[target.index].mode = RaccoonMode::Carried,
            EntityKind::Tree => pools.trees[target.index].planted = false,
            EntityKind::None
            | EntityKind::Box
            | EntityKind::SmallPot
            | EntityKind::BigPot
            | EntityKind::Water => {}
        }

        log::debug!("picked up {}", target);
        self.carried = target;
        Ok(PickupOutcome::PickedUp(target))
    }

    fn find_pickup(&self, player_position: Vec3, pools: &EntityPools) -> Option<EntityReference> {
        if let Some(storage_box) = pools.nearest_within(EntityKind::Box, player_position, BOX_REACH) {
            let inside = &pools.boxes[storage_box.index];
            if inside.state == BoxState::Open && inside.contents.is_some() {
                return Some(inside.contents);
            }
            return Some(storage_box);
        }

        PICKUP_ORDER
            .iter()
            .find_map(|&kind| pools.nearest_within(kind, player_position, PICKUP_DISTANCE))
    }

    fn drop_carried(
        &mut self,
        pools: &mut EntityPools,
        physics: &mut PhysicsWorld,
    ) -> Result<PickupOutcome> {
        let entity = self.carried;
        if !entity.kind.can_be_picked_up() {
            log::debug!("cannot drop {}", entity);
            return Ok(PickupOutcome::Nothing);
        }

        physics.try_push_entity(entity)?;

        if entity.kind == EntityKind::Raccoon {
            if let Some(raccoon) = pools.raccoons.get_mut(entity.index) {
                raccoon.transform.rotation = Quat::IDENTITY;
                raccoon.mode = RaccoonMode::Idle;
            }
        }

        log::debug!("dropped {}", entity);
        self.carried = EntityReference::NONE;
        Ok(PickupOutcome::Dropped(entity))
    }

    /// Use the held entity, or the nearest box with empty hands
    ///
    /// Tried in order: put the held entity into an empty box in reach; put a
    /// held tree or raccoon into an empty small pot in reach; with empty
    /// hands, open a closed box or close an open one; plant a held tree.
    pub fn interact(
        &mut self,
        player_position: Vec3,
        pools: &mut EntityPools,
        collision: &CollisionSystem3D,
    ) -> InteractOutcome {
        let carried = self.carried;

        if carried.kind.fits_in_box() {
            let target = pools.nearest_matching(EntityKind::Box, player_position, BOX_REACH, |b| {
                pools.boxes[b.index].contents.is_none()
            });
            if let Some(container) = target {
                return self.put_into(container, pools);
            }
        }

        if carried.kind.fits_in_pot() {
            let target = pools.nearest_matching(
                EntityKind::SmallPot,
                player_position,
                PICKUP_DISTANCE,
                |p| pools.small_pots[p.index].contents.is_none(),
            );
            if let Some(container) = target {
                return self.put_into(container, pools);
            }
        }

        if carried.is_none() {
            let target = pools.nearest_matching(EntityKind::Box, player_position, BOX_REACH, |b| {
                matches!(pools.boxes[b.index].state, BoxState::Open | BoxState::Closed)
            });
            if let Some(storage_box) = target {
                let storage_box_state = &mut pools.boxes[storage_box.index];
                storage_box_state.state = match storage_box_state.state {
                    BoxState::Closed => BoxState::Opening,
                    _ => BoxState::Closing,
                };
                storage_box_state.lid_progress = 0.0;
                return InteractOutcome::ToggledBox(storage_box);
            }
        }

        if carried.kind == EntityKind::Tree {
            if let Some(tree) = pools.trees.get_mut(carried.index) {
                let position = &mut tree.transform.position;
                position.z = collision.terrain_height(position.truncate());
                tree.planted = true;
                log::debug!("planted {} at {:?}", carried, tree.transform.position);
                self.carried = EntityReference::NONE;
                return InteractOutcome::Planted(carried);
            }
        }

        InteractOutcome::Nothing
    }

    fn put_into(&mut self, container: EntityReference, pools: &mut EntityPools) -> InteractOutcome {
        let entity = self.carried;
        pools.set_contents(container, entity);
        log::debug!("put {} into {}", entity, container);
        self.carried = EntityReference::NONE;
        InteractOutcome::PutInto { entity, container }
    }

    /// Move held and contained entities to their carriers
    ///
    /// The player goes first, then boxes, then pots, so a pot carried in a
    /// box still brings its contents along in the same frame.
    pub fn update_carried_transforms(&self, player: &Transform3D, pools: &mut EntityPools) {
        pools.set_carried_transform(
            self.carried,
            player.transform_point(PLAYER_CARRY_OFFSET),
            player.rotation,
        );

        for index in 0..pools.boxes.len() {
            let carrier = pools.boxes[index].transform;
            let contents = pools.boxes[index].contents;
            pools.set_carried_transform(
                contents,
                carrier.transform_point(CONTAINER_CARRY_OFFSET),
                carrier.rotation,
            );
        }

        for index in 0..pools.small_pots.len() {
            let carrier = pools.small_pots[index].transform;
            let contents = pools.small_pots[index].contents;
            pools.set_carried_transform(
                contents,
                carrier.transform_point(CONTAINER_CARRY_OFFSET),
                carrier.rotation,
            );
        }
    }
}
