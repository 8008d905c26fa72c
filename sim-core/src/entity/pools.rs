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
//! Per-kind gameplay entity pools
//!
//! Each kind has its own fixed-capacity [`Arena`]. Everything that has to act
//! on "an entity" goes through [`EntityPools`] with an [`EntityReference`] and
//! is dispatched by an exhaustive `match` on the kind.

use crate::entity::{EntityKind, EntityReference};
use crate::error::Result;
use crate::pool::Arena;
use crate::transform::Transform3D;
use glam::{Quat, Vec3};

/// Seconds a box lid takes to open or close
pub const BOX_OPENING_TIME: f32 = 0.7;

/// Water in a drop drawn at unit scale
pub const FULL_WATER_LEVEL: f32 = 1.0;

/// Height a carried raccoon is lifted above its carry point
const CARRIED_RACCOON_LIFT: f32 = 0.2;

/// Tilt of a carried raccoon around the carrier's right axis, in radians
const CARRIED_RACCOON_TILT: f32 = 1.4;

/// Lid state of a storage box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxState {
    /// Lid shut; contents cannot be taken
    #[default]
    Closed,
    /// Lid animating open
    Opening,
    /// Lid open; contents can be taken
    Open,
    /// Lid animating shut
    Closing,
}

/// Storage box holding at most one entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageBox {
    /// World transform
    pub transform: Transform3D,
    /// Lid state
    pub state: BoxState,
    /// Progress of the current lid animation in `[0, 1]`
    pub lid_progress: f32,
    /// Entity inside the box
    pub contents: EntityReference,
}

/// Small pot holding at most one plant or animal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pot {
    /// World transform
    pub transform: Transform3D,
    /// Entity inside the pot
    pub contents: EntityReference,
}

/// Behaviour mode of a raccoon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RaccoonMode {
    /// Free on the ground
    #[default]
    Idle,
    /// Held by the player or sitting in a pot
    Carried,
}

/// A raccoon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Raccoon {
    /// World transform
    pub transform: Transform3D,
    /// Behaviour mode
    pub mode: RaccoonMode,
}

/// A tree sapling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tree {
    /// World transform
    pub transform: Transform3D,
    /// Whether the tree has been planted in the ground
    pub planted: bool,
}

/// A drop of water
///
/// The amount of water is carried by the transform's scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterDrop {
    /// World transform
    pub transform: Transform3D,
}

/// All gameplay entity pools of a scene
#[derive(Debug)]
pub struct EntityPools {
    /// Storage boxes
    pub boxes: Arena<StorageBox>,
    /// Small pots
    pub small_pots: Arena<Pot>,
    /// Big pots
    pub big_pots: Arena<Transform3D>,
    /// Raccoons
    pub raccoons: Arena<Raccoon>,
    /// Trees
    pub trees: Arena<Tree>,
    /// Water drops
    pub waters: Arena<WaterDrop>,
}

impl EntityPools {
    /// Create empty pools holding `capacity` entities of each kind
    pub fn with_capacity(capacity: usize) -> Self {
        EntityPools {
            boxes: Arena::with_capacity(capacity),
            small_pots: Arena::with_capacity(capacity),
            big_pots: Arena::with_capacity(capacity),
            raccoons: Arena::with_capacity(capacity),
            trees: Arena::with_capacity(capacity),
            waters: Arena::with_capacity(capacity),
        }
    }

    /// Add a closed, empty storage box
    pub fn spawn_box(&mut self, transform: Transform3D) -> Result<EntityReference> {
        let index = self.boxes.try_push(StorageBox {
            transform,
            state: BoxState::Closed,
            lid_progress: 0.0,
            contents: EntityReference::NONE,
        })?;
        Ok(EntityReference::new(EntityKind::Box, index))
    }

    /// Add an empty small pot
    pub fn spawn_small_pot(&mut self, transform: Transform3D) -> Result<EntityReference> {
        let index = self.small_pots.try_push(Pot {
            transform,
            contents: EntityReference::NONE,
        })?;
        Ok(EntityReference::new(EntityKind::SmallPot, index))
    }

    /// Add a big pot
    pub fn spawn_big_pot(&mut self, transform: Transform3D) -> Result<EntityReference> {
        let index = self.big_pots.try_push(transform)?;
        Ok(EntityReference::new(EntityKind::BigPot, index))
    }

    /// Add an idle raccoon
    pub fn spawn_raccoon(&mut self, transform: Transform3D) -> Result<EntityReference> {
        let index = self.raccoons.try_push(Raccoon {
            transform,
            mode: RaccoonMode::Idle,
        })?;
        Ok(EntityReference::new(EntityKind::Raccoon, index))
    }

    /// Add an unplanted tree
    pub fn spawn_tree(&mut self, transform: Transform3D) -> Result<EntityReference> {
        let index = self.trees.try_push(Tree {
            transform,
            planted: false,
        })?;
        Ok(EntityReference::new(EntityKind::Tree, index))
    }

    /// Add a water drop holding `level` units of water
    ///
    /// A full drop of [`FULL_WATER_LEVEL`] has unit scale.
    pub fn spawn_water(&mut self, position: Vec3, level: f32) -> Result<EntityReference> {
        let index = self.waters.try_push(WaterDrop {
            transform: Transform3D {
                position,
                rotation: Quat::IDENTITY,
                scale: Vec3::splat(level / FULL_WATER_LEVEL),
            },
        })?;
        Ok(EntityReference::new(EntityKind::Water, index))
    }

    /// Number of live entities of `kind`
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::None => 0,
            EntityKind::Box => self.boxes.len(),
            EntityKind::SmallPot => self.small_pots.len(),
            EntityKind::BigPot => self.big_pots.len(),
            EntityKind::Raccoon => self.raccoons.len(),
            EntityKind::Tree => self.trees.len(),
            EntityKind::Water => self.waters.len(),
        }
    }

    /// Number of live entities over all kinds
    pub fn total_count(&self) -> usize {
        EntityKind::POOLED.iter().map(|&kind| self.count(kind)).sum()
    }

    /// Check if `entity` refers to a live slot
    pub fn contains(&self, entity: EntityReference) -> bool {
        entity.is_some() && entity.index < self.count(entity.kind)
    }

    /// Transform of the referenced entity
    pub fn transform(&self, entity: EntityReference) -> Option<&Transform3D> {
        let index = entity.index;
        match entity.kind {
            EntityKind::None => None,
            EntityKind::Box => self.boxes.get(index).map(|b| &b.transform),
            EntityKind::SmallPot => self.small_pots.get(index).map(|p| &p.transform),
            EntityKind::BigPot => self.big_pots.get(index),
            EntityKind::Raccoon => self.raccoons.get(index).map(|r| &r.transform),
            EntityKind::Tree => self.trees.get(index).map(|t| &t.transform),
            EntityKind::Water => self.waters.get(index).map(|w| &w.transform),
        }
    }

    /// Mutable transform of the referenced entity
    pub fn transform_mut(&mut self, entity: EntityReference) -> Option<&mut Transform3D> {
        let index = entity.index;
        match entity.kind {
            EntityKind::None => None,
            EntityKind::Box => self.boxes.get_mut(index).map(|b| &mut b.transform),
            EntityKind::SmallPot => self.small_pots.get_mut(index).map(|p| &mut p.transform),
            EntityKind::BigPot => self.big_pots.get_mut(index),
            EntityKind::Raccoon => self.raccoons.get_mut(index).map(|r| &mut r.transform),
            EntityKind::Tree => self.trees.get_mut(index).map(|t| &mut t.transform),
            EntityKind::Water => self.waters.get_mut(index).map(|w| &mut w.transform),
        }
    }

    /// World position of the referenced entity
    pub fn position(&self, entity: EntityReference) -> Option<Vec3> {
        self.transform(entity).map(|t| t.position)
    }

    /// Mutable world position of the referenced entity
    pub fn position_mut(&mut self, entity: EntityReference) -> Option<&mut Vec3> {
        self.transform_mut(entity).map(|t| &mut t.position)
    }

    /// Entity held by a box or small pot
    ///
    /// `None` when `container` is not a live container.
    pub fn contents(&self, container: EntityReference) -> Option<EntityReference> {
        match container.kind {
            EntityKind::Box => self.boxes.get(container.index).map(|b| b.contents),
            EntityKind::SmallPot => self.small_pots.get(container.index).map(|p| p.contents),
            EntityKind::None
            | EntityKind::BigPot
            | EntityKind::Raccoon
            | EntityKind::Tree
            | EntityKind::Water => None,
        }
    }

    /// Move the referenced entity to where its carrier holds it
    ///
    /// Raccoons hang a little higher and tilted forward. Does nothing for
    /// the empty reference or a stale index.
    pub fn set_carried_transform(&mut self, entity: EntityReference, position: Vec3, rotation: Quat) {
        match entity.kind {
            EntityKind::None => {}
            EntityKind::Raccoon => {
                if let Some(raccoon) = self.raccoons.get_mut(entity.index) {
                    let right = rotation * Vec3::X;
                    raccoon.transform.position = position + Vec3::new(0.0, 0.0, CARRIED_RACCOON_LIFT);
                    raccoon.transform.rotation =
                        rotation * Quat::from_axis_angle(right, CARRIED_RACCOON_TILT);
                }
            }
            EntityKind::Box
            | EntityKind::SmallPot
            | EntityKind::BigPot
            | EntityKind::Tree
            | EntityKind::Water => {
                if let Some(transform) = self.transform_mut(entity) {
                    transform.position = position;
                    transform.rotation = rotation;
                }
            }
        }
    }

    /// Put `entity` into a box or small pot
    ///
    /// Returns `false` when `container` is not a live container.
    pub fn set_contents(&mut self, container: EntityReference, entity: EntityReference) -> bool {
        let slot = match container.kind {
            EntityKind::Box => self.boxes.get_mut(container.index).map(|b| &mut b.contents),
            EntityKind::SmallPot => self
                .small_pots
                .get_mut(container.index)
                .map(|p| &mut p.contents),
            EntityKind::None
            | EntityKind::BigPot
            | EntityKind::Raccoon
            | EntityKind::Tree
            | EntityKind::Water => None,
        };
        match slot {
            Some(slot) => {
                *slot = entity;
                true
            }
            None => false,
        }
    }

    /// Take `entity` out of whichever box or pot holds it
    ///
    /// Returns the container it was in.
    pub fn detach_from_container(&mut self, entity: EntityReference) -> Option<EntityReference> {
        if entity.is_none() {
            return None;
        }
        if let Some(index) = self.boxes.position(|b| b.contents == entity) {
            self.boxes[index].contents = EntityReference::NONE;
            return Some(EntityReference::new(EntityKind::Box, index));
        }
        if let Some(index) = self.small_pots.position(|p| p.contents == entity) {
            self.small_pots[index].contents = EntityReference::NONE;
            return Some(EntityReference::new(EntityKind::SmallPot, index));
        }
        None
    }

    /// Nearest entity of `kind` strictly within `reach` of `point`
    pub fn nearest_within(&self, kind: EntityKind, point: Vec3, reach: f32) -> Option<EntityReference> {
        self.nearest_matching(kind, point, reach, |_| true)
    }

    /// Nearest entity of `kind` strictly within `reach` of `point` accepted
    /// by `filter`
    pub fn nearest_matching(
        &self,
        kind: EntityKind,
        point: Vec3,
        reach: f32,
        mut filter: impl FnMut(EntityReference) -> bool,
    ) -> Option<EntityReference> {
        let mut best: Option<(EntityReference, f32)> = None;
        for index in 0..self.count(kind) {
            let entity = EntityReference::new(kind, index);
            let Some(position) = self.position(entity) else {
                continue;
            };
            let distance = position.distance(point);
            if distance < reach && best.map_or(true, |(_, d)| distance < d) && filter(entity) {
                best = Some((entity, distance));
            }
        }
        best.map(|(entity, _)| entity)
    }

    /// Advance box lid animations
    pub fn update_boxes(&mut self, elapsed_time: f32) {
        for storage_box in self.boxes.iter_mut() {
            match storage_box.state {
                BoxState::Opening | BoxState::Closing => {
                    storage_box.lid_progress += elapsed_time / BOX_OPENING_TIME;
                    if storage_box.lid_progress >= 1.0 {
                        storage_box.lid_progress = 1.0;
                        storage_box.state = if storage_box.state == BoxState::Opening {
                            BoxState::Open
                        } else {
                            BoxState::Closed
                        };
                    }
                }
                BoxState::Open | BoxState::Closed => {}
            }
        }
    }

    /// Empty every pool, keeping capacities
    pub fn clear(&mut self) {
        self.boxes.flush();
        self.small_pots.flush();
        self.big_pots.flush();
        self.raccoons.flush();
        self.trees.flush();
        self.waters.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    fn at(x: f32, y: f32, z: f32) -> Transform3D {
        Transform3D::from_position(Vec3::new(x, y, z))
    }

    #[test]
    fn test_spawn_returns_typed_references() {
        let mut pools = EntityPools::with_capacity(4);
        let tree = pools.spawn_tree(at(1.0, 0.0, 0.0)).unwrap();
        let water = pools.spawn_water(Vec3::new(2.0, 0.0, 0.0), 1.0).unwrap();

        assert_eq!(tree, EntityReference::new(EntityKind::Tree, 0));
        assert_eq!(water, EntityReference::new(EntityKind::Water, 0));
        assert_eq!(pools.position(water), Some(Vec3::new(2.0, 0.0, 0.0)));
        assert_eq!(pools.count(EntityKind::Tree), 1);
        assert!(pools.contains(tree));
    }

    #[test]
    fn test_water_level_sets_scale() {
        let mut pools = EntityPools::with_capacity(2);
        let half = pools.spawn_water(Vec3::ZERO, 0.5 * FULL_WATER_LEVEL).unwrap();
        assert_eq!(pools.transform(half).unwrap().scale, Vec3::splat(0.5));

        // Carrying moves the drop without changing how much water it holds
        pools.set_carried_transform(half, Vec3::ONE, Quat::from_rotation_z(1.0));
        assert_eq!(pools.transform(half).unwrap().scale, Vec3::splat(0.5));
    }

    #[test]
    fn test_total_count_and_clear() {
        let mut pools = EntityPools::with_capacity(2);
        pools.spawn_box(at(0.0, 0.0, 0.0)).unwrap();
        pools.spawn_raccoon(at(1.0, 0.0, 0.0)).unwrap();
        pools.spawn_water(Vec3::ZERO, 1.0).unwrap();
        pools.spawn_water(Vec3::ONE, 1.0).unwrap();
        assert_eq!(pools.total_count(), 4);

        pools.clear();
        assert_eq!(pools.total_count(), 0);
    }

    #[test]
    fn test_spawn_past_capacity() {
        let mut pools = EntityPools::with_capacity(1);
        pools.spawn_raccoon(at(0.0, 0.0, 0.0)).unwrap();
        assert!(matches!(
            pools.spawn_raccoon(at(0.0, 0.0, 0.0)),
            Err(SimError::CapacityExceeded { capacity: 1, .. })
        ));
    }

    #[test]
    fn test_position_dispatch_covers_every_kind() {
        let mut pools = EntityPools::with_capacity(2);
        let spawned = [
            pools.spawn_box(at(1.0, 0.0, 0.0)).unwrap(),
            pools.spawn_small_pot(at(2.0, 0.0, 0.0)).unwrap(),
            pools.spawn_big_pot(at(3.0, 0.0, 0.0)).unwrap(),
            pools.spawn_raccoon(at(4.0, 0.0, 0.0)).unwrap(),
            pools.spawn_tree(at(5.0, 0.0, 0.0)).unwrap(),
            pools.spawn_water(Vec3::new(6.0, 0.0, 0.0), 1.0).unwrap(),
        ];

        for (i, entity) in spawned.iter().enumerate() {
            assert_eq!(pools.position(*entity).unwrap().x, (i + 1) as f32);
            *pools.position_mut(*entity).unwrap() = Vec3::ZERO;
            assert_eq!(pools.position(*entity), Some(Vec3::ZERO));
        }
    }

    #[test]
    fn test_missing_references_resolve_to_none() {
        let mut pools = EntityPools::with_capacity(2);
        assert_eq!(pools.position(EntityReference::NONE), None);
        assert_eq!(pools.position(EntityReference::new(EntityKind::Tree, 0)), None);
        assert!(pools.position_mut(EntityReference::new(EntityKind::Box, 1)).is_none());
        assert!(!pools.contains(EntityReference::NONE));
    }

    #[test]
    fn test_carried_raccoon_is_lifted_and_tilted() {
        let mut pools = EntityPools::with_capacity(2);
        let raccoon = pools.spawn_raccoon(at(0.0, 0.0, 0.0)).unwrap();
        let tree = pools.spawn_tree(at(0.0, 0.0, 0.0)).unwrap();

        let carry_point = Vec3::new(1.0, 2.0, 3.0);
        pools.set_carried_transform(raccoon, carry_point, Quat::IDENTITY);
        pools.set_carried_transform(tree, carry_point, Quat::IDENTITY);

        let raccoon_transform = pools.transform(raccoon).unwrap();
        assert!(raccoon_transform.position.abs_diff_eq(Vec3::new(1.0, 2.0, 3.2), 1e-6));
        assert!(raccoon_transform
            .rotation
            .abs_diff_eq(Quat::from_rotation_x(1.4), 1e-6));
        assert_eq!(pools.position(tree), Some(carry_point));
    }

    #[test]
    fn test_nearest_within_prefers_closest() {
        let mut pools = EntityPools::with_capacity(4);
        pools.spawn_small_pot(at(0.9, 0.0, 0.0)).unwrap();
        let near = pools.spawn_small_pot(at(0.3, 0.0, 0.0)).unwrap();
        pools.spawn_small_pot(at(5.0, 0.0, 0.0)).unwrap();

        assert_eq!(pools.nearest_within(EntityKind::SmallPot, Vec3::ZERO, 1.0), Some(near));
        assert_eq!(pools.nearest_within(EntityKind::SmallPot, Vec3::ZERO, 0.2), None);
        assert_eq!(pools.nearest_within(EntityKind::None, Vec3::ZERO, 10.0), None);
    }

    #[test]
    fn test_box_lid_animation() {
        let mut pools = EntityPools::with_capacity(1);
        let storage_box = pools.spawn_box(at(0.0, 0.0, 0.0)).unwrap();
        pools.boxes[storage_box.index].state = BoxState::Opening;

        pools.update_boxes(0.35);
        assert_eq!(pools.boxes[0].state, BoxState::Opening);
        assert!((pools.boxes[0].lid_progress - 0.5).abs() < 1e-5);

        pools.update_boxes(0.5);
        assert_eq!(pools.boxes[0].state, BoxState::Open);
        assert_eq!(pools.boxes[0].lid_progress, 1.0);

        pools.boxes[0].state = BoxState::Closing;
        pools.boxes[0].lid_progress = 0.0;
        pools.update_boxes(1.0);
        assert_eq!(pools.boxes[0].state, BoxState::Closed);
    }

    #[test]
    fn test_contents_only_for_containers() {
        let mut pools = EntityPools::with_capacity(2);
        let storage_box = pools.spawn_box(at(0.0, 0.0, 0.0)).unwrap();
        let tree = pools.spawn_tree(at(0.0, 0.0, 0.0)).unwrap();

        assert_eq!(pools.contents(storage_box), Some(EntityReference::NONE));
        pools.boxes[0].contents = tree;
        assert_eq!(pools.contents(storage_box), Some(tree));
        assert_eq!(pools.contents(tree), None);
    }

    #[test]
    fn test_set_contents_and_detach() {
        let mut pools = EntityPools::with_capacity(2);
        let pot = pools.spawn_small_pot(at(0.0, 0.0, 0.0)).unwrap();
        let tree = pools.spawn_tree(at(0.0, 0.0, 0.0)).unwrap();

        assert!(pools.set_contents(pot, tree));
        assert!(!pools.set_contents(tree, pot));
        assert_eq!(pools.contents(pot), Some(tree));

        assert_eq!(pools.detach_from_container(tree), Some(pot));
        assert_eq!(pools.contents(pot), Some(EntityReference::NONE));
        assert_eq!(pools.detach_from_container(tree), None);
    }

    #[test]
    fn test_nearest_matching_filters() {
        let mut pools = EntityPools::with_capacity(4);
        pools.spawn_box(at(0.2, 0.0, 0.0)).unwrap();
        let far = pools.spawn_box(at(1.0, 0.0, 0.0)).unwrap();

        let found = pools.nearest_matching(EntityKind::Box, Vec3::ZERO, 1.5, |b| b.index == 1);
        assert_eq!(found, Some(far));
    }
}
