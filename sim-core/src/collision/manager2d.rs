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
//! Lane collisions between 2D box colliders
//!
//! Colliders live on the plane spanned by the transform's `x` and `z`
//! coordinates. Overlap is resolved on the X axis only: two colliders touch
//! when their X intervals overlap, regardless of their `z` extents. Every
//! overlapping pair produces two [`Collision`] records, one per side, written
//! into a fixed buffer that is rebuilt by each [`CollisionManager2D::do_collisions`].
//!
//! Collision records only live for one frame. A collider's
//! [`Collider::collision`] index must be read after `do_collisions` and before
//! the next call.

use crate::error::Result;
use crate::pool::{Arena, Handle, HandlePool};
use crate::transform::Transform3D;
use glam::{Vec2, Vec3};

/// Behaviour of a collider when touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColliderTag {
    /// Solid collider
    #[default]
    Default,
    /// Reports collisions but never blocks a raycast
    Trigger,
}

/// Axis-aligned box on the collision plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    /// Transform the collider follows
    pub transform: Handle<Transform3D>,
    /// Half size on the plane
    pub extents: Vec2,
    /// Offset from the transform's plane position
    pub offset: Vec2,
    /// Collision behaviour
    pub tag: ColliderTag,
    /// Ladders only block raycasts that ask for it
    pub is_ladder: bool,
    /// Set by the last `do_collisions` when this collider overlapped another
    pub has_collision: bool,
    /// Index of this collider's record in the current frame's buffer
    pub collision: Option<usize>,
}

/// One side of an overlapping pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    /// Edge of the other collider that was hit
    pub position: Vec3,
    /// Unit X direction towards the other collider, zero for coincident centers
    pub normal: Vec3,
    /// Tag of the other collider
    pub tag: ColliderTag,
    /// The other collider
    pub other: Handle<Collider>,
}

/// Lane position and X half-extent resolved for one frame
#[derive(Debug, Clone, Copy)]
struct LaneBody {
    x: f32,
    radius: f32,
}

/// Per-frame X-axis collision detection over a fixed set of colliders
#[derive(Debug)]
pub struct CollisionManager2D {
    colliders: HandlePool<Collider>,
    collisions: Arena<Collision>,
    bodies: Vec<Option<LaneBody>>,
}

impl CollisionManager2D {
    /// Create a manager for `max_colliders` colliders and `max_collisions`
    /// records per frame
    pub fn new(max_colliders: usize, max_collisions: usize) -> Self {
        CollisionManager2D {
            colliders: HandlePool::with_capacity(max_colliders),
            collisions: Arena::with_capacity(max_collisions),
            bodies: Vec::with_capacity(max_colliders),
        }
    }

    /// Register a collider
    ///
    /// # Panics
    ///
    /// Panics when the collider pool is full.
    pub fn push_collider(
        &mut self,
        transform: Handle<Transform3D>,
        extents: Vec2,
        offset: Vec2,
        tag: ColliderTag,
    ) -> Handle<Collider> {
        self.colliders
            .make_handle(Collider::new(transform, extents, offset, tag, false))
    }

    /// Register a collider, failing when the pool is full
    pub fn try_push_collider(
        &mut self,
        transform: Handle<Transform3D>,
        extents: Vec2,
        offset: Vec2,
        tag: ColliderTag,
    ) -> Result<Handle<Collider>> {
        self.colliders
            .try_make_handle(Collider::new(transform, extents, offset, tag, false))
    }

    /// Register a ladder collider
    pub fn push_ladder(
        &mut self,
        transform: Handle<Transform3D>,
        extents: Vec2,
        offset: Vec2,
    ) -> Handle<Collider> {
        self.colliders.make_handle(Collider::new(
            transform,
            extents,
            offset,
            ColliderTag::Default,
            true,
        ))
    }

    /// Look up a collider
    pub fn collider(&self, handle: Handle<Collider>) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    /// This frame's collision record for a collider
    pub fn collision_for(&self, handle: Handle<Collider>) -> Option<&Collision> {
        self.collider(handle)?
            .collision
            .and_then(|index| self.collisions.get(index))
    }

    /// All colliders in registration order
    pub fn colliders(&self) -> &HandlePool<Collider> {
        &self.colliders
    }

    /// This frame's collision records
    pub fn collisions(&self) -> &[Collision] {
        self.collisions.as_slice()
    }

    /// Number of records written by the last `do_collisions`
    pub fn collision_count(&self) -> usize {
        self.collisions.len()
    }

    /// Remove every collider and record
    pub fn clear(&mut self) {
        self.colliders.reset();
        self.collisions.flush();
    }

    /// Recompute all collisions for this frame
    ///
    /// # Panics
    ///
    /// Panics when the record buffer overflows. In debug builds also panics
    /// when a collider's transform handle does not resolve; release builds
    /// skip such colliders.
    pub fn do_collisions(&mut self, transforms: &HandlePool<Transform3D>) {
        self.collisions.flush();
        for collider in self.colliders.iter_mut() {
            collider.has_collision = false;
            collider.collision = None;
        }

        self.bodies.clear();
        self.bodies.extend(
            self.colliders
                .as_slice()
                .iter()
                .map(|collider| lane_body(collider, transforms)),
        );

        let pairs = overlapping_pairs(&self.bodies);
        for (a, b) in pairs {
            self.record_pair(a, b);
        }

        log::trace!(
            "2d collisions: {} colliders, {} records",
            self.colliders.len(),
            self.collisions.len()
        );
    }

    fn record_pair(&mut self, a: usize, b: usize) {
        let (Some(body_a), Some(body_b)) = (self.bodies[a], self.bodies[b]) else {
            return;
        };
        let (Some(handle_a), Some(handle_b)) =
            (self.colliders.handle_at(a), self.colliders.handle_at(b))
        else {
            return;
        };

        let normal_a = sign(body_b.x - body_a.x);
        let normal_b = -normal_a;
        if normal_a == 0.0 {
            log::debug!("colliders {} and {} share a center; zero normal", a, b);
        }

        let tag_a = self.colliders.as_slice()[a].tag;
        let tag_b = self.colliders.as_slice()[b].tag;

        let record_a = self.collisions.push(Collision {
            position: Vec3::new(body_b.x + normal_b * body_b.radius, 0.0, 0.0),
            normal: Vec3::new(normal_a, 0.0, 0.0),
            tag: tag_b,
            other: handle_b,
        });
        let record_b = self.collisions.push(Collision {
            position: Vec3::new(body_a.x + normal_a * body_a.radius, 0.0, 0.0),
            normal: Vec3::new(normal_b, 0.0, 0.0),
            tag: tag_a,
            other: handle_a,
        });

        let colliders = self.colliders.as_mut_slice();
        colliders[a].has_collision = true;
        colliders[a].collision = Some(record_a);
        colliders[b].has_collision = true;
        colliders[b].collision = Some(record_b);
    }

    /// Check if the segment `origin..origin + ray` enters a collider
    ///
    /// Only a crossing counts: the start must be outside and the end strictly
    /// inside the same collider. Triggers never block; ladders block only when
    /// `ladders_block` is set. Returns on the first qualifying collider in
    /// registration order.
    pub fn raycast(
        &self,
        transforms: &HandlePool<Transform3D>,
        origin: Vec2,
        ray: Vec2,
        ladders_block: bool,
    ) -> bool {
        let start = origin;
        let end = origin + ray;

        self.colliders.as_slice().iter().any(|collider| {
            if collider.tag == ColliderTag::Trigger || (collider.is_ladder && !ladders_block) {
                return false;
            }
            let Some(transform) = transforms.get(collider.transform) else {
                debug_assert!(false, "Invalid transform passed to collider");
                return false;
            };

            let center = plane_position(transform) + collider.offset;
            let corner = center - collider.extents;
            let edge_x = Vec2::new(2.0 * collider.extents.x, 0.0);
            let edge_y = Vec2::new(0.0, 2.0 * collider.extents.y);

            !inside_box(start, corner, edge_x, edge_y) && inside_box(end, corner, edge_x, edge_y)
        })
    }
}

impl Collider {
    fn new(
        transform: Handle<Transform3D>,
        extents: Vec2,
        offset: Vec2,
        tag: ColliderTag,
        is_ladder: bool,
    ) -> Self {
        Collider {
            transform,
            extents,
            offset,
            tag,
            is_ladder,
            has_collision: false,
            collision: None,
        }
    }
}

fn plane_position(transform: &Transform3D) -> Vec2 {
    Vec2::new(transform.position.x, transform.position.z)
}

fn lane_body(collider: &Collider, transforms: &HandlePool<Transform3D>) -> Option<LaneBody> {
    let transform = transforms.get(collider.transform);
    debug_assert!(transform.is_some(), "Invalid transform passed to collider");
    transform.map(|transform| LaneBody {
        x: plane_position(transform).x + collider.offset.x,
        radius: collider.extents.x,
    })
}

fn overlaps(a: LaneBody, b: LaneBody) -> bool {
    (b.x - a.x).abs() < a.radius + b.radius
}

fn pairs_from(bodies: &[Option<LaneBody>], a: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
    let body_a = bodies[a];
    (a + 1..bodies.len()).filter_map(move |b| match (body_a, bodies[b]) {
        (Some(body_a), Some(body_b)) if overlaps(body_a, body_b) => Some((a, b)),
        _ => None,
    })
}

/// Overlapping index pairs `(a, b)` with `a < b`, ordered by `a` then `b`
fn overlapping_pairs(bodies: &[Option<LaneBody>]) -> Vec<(usize, usize)> {
    #[cfg(feature = "parallel")]
    {
        overlapping_pairs_parallel(bodies)
    }

    #[cfg(not(feature = "parallel"))]
    {
        overlapping_pairs_sequential(bodies)
    }
}

#[cfg(feature = "parallel")]
fn overlapping_pairs_parallel(bodies: &[Option<LaneBody>]) -> Vec<(usize, usize)> {
    use rayon::prelude::*;

    (0..bodies.len())
        .into_par_iter()
        .flat_map_iter(|a| pairs_from(bodies, a))
        .collect()
}

#[cfg(any(test, not(feature = "parallel")))]
fn overlapping_pairs_sequential(bodies: &[Option<LaneBody>]) -> Vec<(usize, usize)> {
    (0..bodies.len()).flat_map(|a| pairs_from(bodies, a)).collect()
}

/// Parallelogram containment: both projections of `point - corner` fall
/// strictly inside their edges
fn inside_box(point: Vec2, corner: Vec2, edge_ab: Vec2, edge_ad: Vec2) -> bool {
    let am = point - corner;
    let along_ab = am.dot(edge_ab);
    let along_ad = am.dot(edge_ad);
    (0.0 < along_ab && along_ab < edge_ab.dot(edge_ab))
        && (0.0 < along_ad && along_ad < edge_ad.dot(edge_ad))
}

/// Sign that maps zero to zero, unlike `f32::signum`
fn sign(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}
