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
//! 2D lane collision properties
//!
//! Symmetry of the per-pair records, per-frame reset and raycast crossing
//! checks across many collider layouts.

use approx::assert_relative_eq;
use glam::{Vec2, Vec3};
use sim_core::collision::{Collider, ColliderTag, CollisionManager2D};
use sim_core::pool::{Handle, HandlePool};
use sim_core::Transform3D;

fn lane(xs: &[f32], half_width: f32) -> (HandlePool<Transform3D>, CollisionManager2D, Vec<Handle<Collider>>) {
    let mut transforms = HandlePool::with_capacity(xs.len());
    let mut manager = CollisionManager2D::new(xs.len(), xs.len() * xs.len());
    let handles = xs
        .iter()
        .map(|&x| {
            let transform = transforms.make_handle(Transform3D::from_position(Vec3::new(x, 0.0, 0.0)));
            manager.push_collider(transform, Vec2::new(half_width, 1.0), Vec2::ZERO, ColliderTag::Default)
        })
        .collect();
    (transforms, manager, handles)
}

#[test]
fn test_two_colliders_scenario() {
    let (transforms, mut manager, handles) = lane(&[0.0, 0.9], 0.5);
    manager.do_collisions(&transforms);

    let a = manager.collider(handles[0]).unwrap();
    let b = manager.collider(handles[1]).unwrap();
    assert!(a.has_collision && b.has_collision);

    let hit_a = manager.collision_for(handles[0]).unwrap();
    let hit_b = manager.collision_for(handles[1]).unwrap();
    assert_relative_eq!(hit_a.position.x, 0.4, epsilon = 1e-6);
    assert_eq!(hit_a.normal, Vec3::new(1.0, 0.0, 0.0));
    assert_relative_eq!(hit_b.position.x, 0.5, epsilon = 1e-6);
    assert_eq!(hit_b.normal, Vec3::new(-1.0, 0.0, 0.0));
}

#[test]
fn test_records_are_antiparallel_for_every_pair() {
    let xs = [0.0, 0.3, 0.75, 1.1, 1.6, 4.0, 4.2];
    let (transforms, mut manager, handles) = lane(&xs, 0.4);
    manager.do_collisions(&transforms);

    assert_eq!(manager.collision_count() % 2, 0);
    for pair in manager.collisions().chunks(2) {
        assert_eq!(pair[0].normal, -pair[1].normal);
        assert_ne!(pair[0].other, pair[1].other);
    }

    for (i, handle) in handles.iter().enumerate() {
        let collider = manager.collider(*handle).unwrap();
        let has_neighbour = xs
            .iter()
            .enumerate()
            .any(|(j, x)| j != i && (x - xs[i]).abs() < 0.8);
        assert_eq!(collider.has_collision, has_neighbour, "collider {}", i);
    }
}

#[test]
fn test_last_record_wins_for_crowded_collider() {
    let (transforms, mut manager, handles) = lane(&[0.0, 0.5, 1.0], 0.4);
    manager.do_collisions(&transforms);

    // Middle collider touches both neighbours; its link points at the later pair
    let middle = manager.collision_for(handles[1]).unwrap();
    assert_eq!(middle.other, handles[2]);
}

#[test]
fn test_reset_clears_previous_frame() {
    let (mut transforms, mut manager, handles) = lane(&[0.0, 0.5, 1.0], 0.4);
    manager.do_collisions(&transforms);
    assert!(manager.collision_count() > 0);

    for (i, transform) in transforms.iter_mut().enumerate() {
        transform.position.x = i as f32 * 10.0;
    }
    manager.do_collisions(&transforms);

    assert_eq!(manager.collision_count(), 0);
    for handle in handles {
        let collider = manager.collider(handle).unwrap();
        assert!(!collider.has_collision);
        assert!(collider.collision.is_none());
        assert!(manager.collision_for(handle).is_none());
    }
}

#[test]
fn test_raycast_crossing() {
    let mut transforms = HandlePool::with_capacity(1);
    let mut manager = CollisionManager2D::new(1, 3);
    let at = transforms.make_handle(Transform3D::from_position(Vec3::new(2.0, 7.0, 3.0)));
    manager.push_collider(at, Vec2::new(1.0, 0.5), Vec2::ZERO, ColliderTag::Default);

    // Box spans x in (1, 3), plane y (from world z) in (2.5, 3.5)
    let cases = [
        (Vec2::new(-2.0, 3.0), Vec2::new(1.0, 0.0), false),
        (Vec2::new(0.0, 3.0), Vec2::new(1.5, 0.0), true),
        (Vec2::new(2.0, 0.0), Vec2::new(0.0, 3.0), true),
        (Vec2::new(1.5, 3.0), Vec2::new(1.0, 0.1), false),
        (Vec2::new(0.0, 0.0), Vec2::new(5.0, 0.0), false),
    ];
    for (origin, ray, expected) in cases {
        assert_eq!(
            manager.raycast(&transforms, origin, ray, false),
            expected,
            "origin {:?} ray {:?}",
            origin,
            ray
        );
    }
}
