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
//! 3D collision queries
//!
//! [`CollisionSystem3D`] answers two questions: how high is the ground at a
//! point, and what does a ray hit first. Colliders come in two lifetimes.
//! Static colliders are pushed once at scene load; submitted colliders are
//! pushed by moving objects every frame and dropped by
//! [`CollisionSystem3D::clear_submitted`].
//!
//! Box colliders are stored precomputed as a collider-to-world matrix and its
//! inverse, so a query only transforms the ray into the unit cube
//! `[-1, 1]³` of each box.

use crate::collision::terrain::HeightMap;
use crate::config::SceneConfig;
use crate::pool::Arena;
use crate::transform::Transform3D;
use glam::{Mat4, Quat, Vec2, Vec3};

/// Hits closer than this to the ray start are ignored
const RAY_EPSILON: f32 = 1e-5;

/// Oriented box in the local space of a transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxCollider {
    /// Half size along each local axis
    pub extents: Vec3,
    /// Rotation relative to the owning transform
    pub orientation: Quat,
    /// Center relative to the owning transform
    pub center: Vec3,
}

impl BoxCollider {
    /// Axis-aligned box centered on its transform
    pub fn new(extents: Vec3) -> Self {
        BoxCollider {
            extents,
            orientation: Quat::IDENTITY,
            center: Vec3::ZERO,
        }
    }

    fn local_transform(&self) -> Transform3D {
        Transform3D {
            position: self.center,
            rotation: self.orientation,
            scale: self.extents,
        }
    }
}

/// Box collider baked into world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecomputedBoxCollider {
    /// Unit cube to world
    pub transform: Mat4,
    /// World to unit cube
    pub inverse_transform: Mat4,
}

impl PrecomputedBoxCollider {
    /// Bake `collider` as attached to `transform`
    pub fn new(collider: &BoxCollider, transform: &Transform3D) -> Self {
        let local = collider.local_transform();
        PrecomputedBoxCollider {
            transform: transform.matrix() * local.matrix(),
            inverse_transform: local.inverse_matrix() * transform.inverse_matrix(),
        }
    }

    /// Check if a world point is inside or on the box
    pub fn contains_point(&self, point: Vec3) -> bool {
        let local = self.inverse_transform.transform_point3(point);
        local.abs().cmple(Vec3::ONE).all()
    }

    fn raycast(&self, start: Vec3, direction: Vec3, length: f32) -> Option<RaycastHit> {
        let local_start = self.inverse_transform.transform_point3(start);
        let local_direction = self.inverse_transform.transform_vector3(direction);

        // Both points move with the same parameter in either space, so the
        // entry distance is measured in world units along `direction`.
        let mut entry = f32::NEG_INFINITY;
        let mut exit = f32::INFINITY;
        let mut entry_axis = 0;
        for axis in 0..3 {
            let (near, far) = slab(local_start[axis], local_direction[axis])?;
            if near > entry {
                entry = near;
                entry_axis = axis;
            }
            exit = exit.min(far);
            if entry > exit {
                return None;
            }
        }

        if !(RAY_EPSILON < entry && entry < length) {
            return None;
        }

        let mut local_normal = Vec3::ZERO;
        local_normal[entry_axis] = -local_direction[entry_axis].signum();
        let normal = self
            .inverse_transform
            .transpose()
            .transform_vector3(local_normal)
            .normalize_or_zero();

        Some(RaycastHit {
            position: start + direction * entry,
            normal,
            distance: entry,
        })
    }
}

/// Entry and exit parameters of a ray through the slab `[-1, 1]` on one axis
///
/// `None` when the ray runs parallel to the slab and outside it.
fn slab(start: f32, direction: f32) -> Option<(f32, f32)> {
    if direction.abs() < f32::EPSILON {
        return (-1.0..=1.0)
            .contains(&start)
            .then_some((f32::NEG_INFINITY, f32::INFINITY));
    }
    let inverse = direction.recip();
    let to_min = (-1.0 - start) * inverse;
    let to_max = (1.0 - start) * inverse;
    Some(if to_min <= to_max {
        (to_min, to_max)
    } else {
        (to_max, to_min)
    })
}

/// Upright cylinder in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CylinderCollider {
    /// Radius on the ground plane
    pub radius: f32,
    /// Half of the height along `z`
    pub half_height: f32,
    /// Center relative to the owning transform until submitted, world center
    /// afterwards
    pub center: Vec3,
}

impl CylinderCollider {
    /// Cylinder centered on its transform
    pub fn new(radius: f32, half_height: f32) -> Self {
        CylinderCollider {
            radius,
            half_height,
            center: Vec3::ZERO,
        }
    }

    /// Move into world space
    ///
    /// Rotation is ignored and `scale.x` scales the radius.
    fn placed(mut self, transform: &Transform3D) -> Self {
        self.center += transform.position;
        self.radius *= transform.scale.x;
        self.half_height *= transform.scale.z;
        self
    }

    fn contains_point(&self, point: Vec3) -> bool {
        let local = point - self.center;
        local.truncate().length() <= self.radius && local.z.abs() <= self.half_height
    }

    fn raycast(&self, start: Vec3, direction: Vec3, length: f32) -> Option<RaycastHit> {
        let p = start - self.center;
        let v = direction;
        let mut best: Option<RaycastHit> = None;

        if v.z.abs() > RAY_EPSILON {
            let to_top = (self.half_height - p.z) / v.z;
            let to_bottom = (-self.half_height - p.z) / v.z;
            let t = to_top.min(to_bottom);
            if RAY_EPSILON < t && t < length {
                let at = p + v * t;
                if at.truncate().length() < self.radius {
                    best = Some(RaycastHit {
                        position: at + self.center,
                        normal: Vec3::new(0.0, 0.0, -v.z.signum()),
                        distance: t,
                    });
                }
            }
        }

        let a = v.x * v.x + v.y * v.y;
        if a < RAY_EPSILON {
            return best;
        }
        let b = 2.0 * (p.x * v.x + p.y * v.y);
        let c = p.x * p.x + p.y * p.y - self.radius * self.radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < RAY_EPSILON {
            return best;
        }

        let t = (-b - discriminant.sqrt()) / (2.0 * a);
        if RAY_EPSILON < t && t < length {
            let at = p + v * t;
            if at.z.abs() < self.half_height && best.map_or(true, |hit| t < hit.distance) {
                best = Some(RaycastHit {
                    position: at + self.center,
                    normal: Vec3::new(at.x, at.y, 0.0).normalize_or_zero(),
                    distance: t,
                });
            }
        }
        best
    }
}

/// Nearest ray hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// World hit point
    pub position: Vec3,
    /// Unit surface normal at the hit point
    pub normal: Vec3,
    /// Distance from the ray start
    pub distance: f32,
}

fn nearer(best: Option<RaycastHit>, candidate: Option<RaycastHit>) -> Option<RaycastHit> {
    match (best, candidate) {
        (Some(best), Some(candidate)) if candidate.distance < best.distance => Some(candidate),
        (None, candidate) => candidate,
        (best, _) => best,
    }
}

/// Terrain plus static and per-frame colliders
#[derive(Debug)]
pub struct CollisionSystem3D {
    terrain: HeightMap,
    terrain_offset: Vec3,
    static_boxes: Arena<PrecomputedBoxCollider>,
    submitted_boxes: Arena<PrecomputedBoxCollider>,
    static_cylinders: Arena<CylinderCollider>,
    submitted_cylinders: Arena<CylinderCollider>,
}

impl CollisionSystem3D {
    /// Create a system over `terrain` with pools sized from `config`
    pub fn new(terrain: HeightMap, config: &SceneConfig) -> Self {
        CollisionSystem3D {
            terrain,
            terrain_offset: Vec3::ZERO,
            static_boxes: Arena::with_capacity(config.max_static_box_colliders),
            submitted_boxes: Arena::with_capacity(config.max_submitted_box_colliders),
            static_cylinders: Arena::with_capacity(config.max_cylinder_colliders),
            submitted_cylinders: Arena::with_capacity(config.max_cylinder_colliders),
        }
    }

    /// Place the terrain's origin at `offset`
    pub fn with_terrain_offset(mut self, offset: Vec3) -> Self {
        self.terrain_offset = offset;
        self
    }

    /// The terrain height map
    pub fn terrain(&self) -> &HeightMap {
        &self.terrain
    }

    /// World position of the terrain's origin
    pub fn terrain_offset(&self) -> Vec3 {
        self.terrain_offset
    }

    /// Ground height under a world ground-plane position
    pub fn terrain_height(&self, position: Vec2) -> f32 {
        self.terrain
            .height_at(position - self.terrain_offset.truncate())
    }

    /// Drop every submitted collider; call at the start of each frame
    pub fn clear_submitted(&mut self) {
        self.submitted_boxes.flush();
        self.submitted_cylinders.flush();
    }

    /// Add a box collider that lives for the whole scene
    ///
    /// # Panics
    ///
    /// Panics when the static box pool is full.
    pub fn push_static_box_collider(&mut self, collider: BoxCollider, transform: &Transform3D) {
        self.static_boxes
            .push(PrecomputedBoxCollider::new(&collider, transform));
    }

    /// Add a box collider for this frame only
    ///
    /// # Panics
    ///
    /// Panics when the submitted box pool is full.
    pub fn submit_box_collider(&mut self, collider: BoxCollider, transform: &Transform3D) {
        self.submitted_boxes
            .push(PrecomputedBoxCollider::new(&collider, transform));
    }

    /// Add a cylinder collider that lives for the whole scene
    ///
    /// # Panics
    ///
    /// Panics when the static cylinder pool is full.
    pub fn push_static_cylinder_collider(&mut self, collider: CylinderCollider, transform: &Transform3D) {
        self.static_cylinders.push(collider.placed(transform));
    }

    /// Add a cylinder collider for this frame only
    ///
    /// # Panics
    ///
    /// Panics when the submitted cylinder pool is full.
    pub fn submit_cylinder_collider(&mut self, collider: CylinderCollider, transform: &Transform3D) {
        self.submitted_cylinders.push(collider.placed(transform));
    }

    /// Number of static and submitted box colliders
    pub fn box_collider_count(&self) -> usize {
        self.static_boxes.len() + self.submitted_boxes.len()
    }

    /// Number of static and submitted cylinder colliders
    pub fn cylinder_collider_count(&self) -> usize {
        self.static_cylinders.len() + self.submitted_cylinders.len()
    }

    /// Nearest collider hit by the segment from `start` along `direction`
    ///
    /// `direction` must be normalized. Terrain is not part of the query.
    pub fn raycast(&self, start: Vec3, direction: Vec3, length: f32) -> Option<RaycastHit> {
        if !direction.is_normalized() {
            log::debug!("raycast with non-normalized direction {:?}", direction);
        }

        let boxes = self
            .submitted_boxes
            .iter()
            .chain(self.static_boxes.iter())
            .map(|collider| collider.raycast(start, direction, length));
        let cylinders = self
            .static_cylinders
            .iter()
            .chain(self.submitted_cylinders.iter())
            .map(|collider| collider.raycast(start, direction, length));

        boxes.chain(cylinders).fold(None, nearer)
    }

    /// Check if a world point is inside any collider
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.static_boxes
            .iter()
            .chain(self.submitted_boxes.iter())
            .any(|collider| collider.contains_point(point))
            || self
                .static_cylinders
                .iter()
                .chain(self.submitted_cylinders.iter())
                .any(|collider| collider.contains_point(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_4;

    fn system() -> CollisionSystem3D {
        CollisionSystem3D::new(HeightMap::flat(0.0, 100.0), &SceneConfig::default())
    }

    #[test]
    fn test_ray_hits_box_face() {
        let mut system = system();
        system.push_static_box_collider(
            BoxCollider::new(Vec3::ONE),
            &Transform3D::from_position(Vec3::new(5.0, 0.0, 0.0)),
        );

        let hit = system.raycast(Vec3::ZERO, Vec3::X, 10.0).unwrap();
        assert_relative_eq!(hit.distance, 4.0, epsilon = 1e-5);
        assert!(hit.position.abs_diff_eq(Vec3::new(4.0, 0.0, 0.0), 1e-5));
        assert!(hit.normal.abs_diff_eq(-Vec3::X, 1e-5));
    }

    #[test]
    fn test_ray_respects_length() {
        let mut system = system();
        system.push_static_box_collider(
            BoxCollider::new(Vec3::ONE),
            &Transform3D::from_position(Vec3::new(5.0, 0.0, 0.0)),
        );
        assert!(system.raycast(Vec3::ZERO, Vec3::X, 3.9).is_none());
        assert!(system.raycast(Vec3::ZERO, -Vec3::X, 10.0).is_none());
    }

    #[test]
    fn test_ray_starting_inside_box_misses() {
        let mut system = system();
        system.push_static_box_collider(BoxCollider::new(Vec3::ONE), &Transform3D::IDENTITY);
        assert!(system.raycast(Vec3::ZERO, Vec3::X, 10.0).is_none());
    }

    #[test]
    fn test_ray_hits_rotated_scaled_box() {
        let mut system = system();
        let transform = Transform3D {
            position: Vec3::new(0.0, 6.0, 0.0),
            rotation: Quat::from_rotation_z(FRAC_PI_4),
            scale: Vec3::splat(2.0),
        };
        system.push_static_box_collider(BoxCollider::new(Vec3::splat(0.5)), &transform);

        // Diagonal of a 2x2 square is 2*sqrt(2), so the corner is at y = 6 - sqrt(2)
        let hit = system.raycast(Vec3::ZERO, Vec3::Y, 20.0).unwrap();
        assert_relative_eq!(hit.distance, 6.0 - 2.0_f32.sqrt(), epsilon = 1e-4);
    }

    #[test]
    fn test_nearest_hit_across_groups() {
        let mut system = system();
        system.push_static_box_collider(
            BoxCollider::new(Vec3::ONE),
            &Transform3D::from_position(Vec3::new(8.0, 0.0, 0.0)),
        );
        system.submit_cylinder_collider(
            CylinderCollider::new(0.5, 1.0),
            &Transform3D::from_position(Vec3::new(3.0, 0.0, 0.0)),
        );

        let hit = system.raycast(Vec3::ZERO, Vec3::X, 20.0).unwrap();
        assert_relative_eq!(hit.distance, 2.5, epsilon = 1e-5);
        assert!(hit.normal.abs_diff_eq(-Vec3::X, 1e-5));

        system.clear_submitted();
        let hit = system.raycast(Vec3::ZERO, Vec3::X, 20.0).unwrap();
        assert_relative_eq!(hit.distance, 7.0, epsilon = 1e-5);
    }

    #[test]
    fn test_ray_hits_cylinder_cap() {
        let mut system = system();
        system.push_static_cylinder_collider(
            CylinderCollider::new(1.0, 0.5),
            &Transform3D::from_position(Vec3::new(0.0, 0.0, 1.0)),
        );

        let hit = system.raycast(Vec3::new(0.2, 0.0, 5.0), -Vec3::Z, 10.0).unwrap();
        assert_relative_eq!(hit.distance, 3.5, epsilon = 1e-5);
        assert!(hit.normal.abs_diff_eq(Vec3::Z, 1e-5));
    }

    #[test]
    fn test_scaled_cylinder() {
        let mut system = system();
        let transform = Transform3D {
            position: Vec3::new(5.0, 0.0, 0.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::new(2.0, 2.0, 1.0),
        };
        system.push_static_cylinder_collider(CylinderCollider::new(0.5, 1.0), &transform);
        let hit = system.raycast(Vec3::ZERO, Vec3::X, 10.0).unwrap();
        assert_relative_eq!(hit.distance, 4.0, epsilon = 1e-5);
    }

    #[test]
    fn test_terrain_height_uses_offset() {
        let terrain = HeightMap::new(vec![0.0, 1.0, 0.0, 1.0], 2, 10.0, 0.0, 4.0).unwrap();
        let system = CollisionSystem3D::new(terrain, &SceneConfig::default())
            .with_terrain_offset(Vec3::new(-5.0, -5.0, 0.0));

        assert_relative_eq!(system.terrain_height(Vec2::new(-4.0, -5.0)), 0.8, epsilon = 1e-5);
        assert_relative_eq!(system.terrain_height(Vec2::new(-2.5, -5.0)), 2.0, epsilon = 1e-5);
        assert_eq!(system.terrain_height(Vec2::new(0.5, -5.0)), 0.0);
    }

    #[test]
    fn test_contains_point() {
        let mut system = system();
        system.push_static_box_collider(
            BoxCollider {
                extents: Vec3::new(2.0, 1.0, 1.0),
                orientation: Quat::IDENTITY,
                center: Vec3::new(0.0, 0.0, 1.0),
            },
            &Transform3D::from_position(Vec3::new(10.0, 0.0, 0.0)),
        );
        system.submit_cylinder_collider(CylinderCollider::new(1.0, 1.0), &Transform3D::IDENTITY);

        assert!(system.contains_point(Vec3::new(11.5, 0.5, 1.5)));
        assert!(!system.contains_point(Vec3::new(12.5, 0.0, 1.0)));
        assert!(system.contains_point(Vec3::new(0.5, 0.5, 0.0)));
        assert_eq!(system.box_collider_count(), 1);
        assert_eq!(system.cylinder_collider_count(), 1);

        system.clear_submitted();
        assert!(!system.contains_point(Vec3::new(0.5, 0.5, 0.0)));
    }

    #[test]
    fn test_slab_parallel_ray() {
        assert_eq!(slab(2.0, 0.0), None);
        assert_eq!(slab(0.5, 0.0), Some((f32::NEG_INFINITY, f32::INFINITY)));
        assert_eq!(slab(-3.0, 1.0), Some((2.0, 4.0)));
        assert_eq!(slab(3.0, -1.0), Some((2.0, 4.0)));
    }
}
