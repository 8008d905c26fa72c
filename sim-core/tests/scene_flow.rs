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
//! Full frames through the scene context: handles, carrying and falling

use glam::Vec3;
use sim_core::entity::{BoxState, EntityKind, InteractOutcome, PickupOutcome};
use sim_core::pool::{Handle, HandleRegistry};
use sim_core::{FrameInput, HeightMap, Scene, SceneConfig, Transform3D};

const DT: f32 = 1.0 / 60.0;

const PICK: FrameInput = FrameInput {
    pickup_or_drop: true,
    interact: false,
};

const USE: FrameInput = FrameInput {
    pickup_or_drop: false,
    interact: true,
};

fn scene() -> Scene {
    let config = SceneConfig::new(16, 32).with_entities_per_kind(8);
    Scene::load(config, HeightMap::flat(0.0, 64.0)).unwrap()
}

fn run_until_still(scene: &mut Scene) {
    for _ in 0..1200 {
        scene.begin_frame();
        scene.update(DT, FrameInput::default());
        if scene.physics().is_empty() {
            // Contents follow their container one frame behind physics
            scene.update(DT, FrameInput::default());
            return;
        }
    }
    panic!("physics never settled");
}

#[test]
fn test_handles_stay_valid_until_reset() {
    let mut registry = HandleRegistry::new();
    registry.allocate_for_handle::<Transform3D>(64);

    let handles: Vec<Handle<Transform3D>> = (0..64)
        .map(|i| registry.make_handle(Transform3D::from_position(Vec3::splat(i as f32))))
        .collect();

    for (i, handle) in handles.iter().enumerate() {
        assert!(registry.is_handle_valid(*handle));
        assert_eq!(registry.get(*handle).unwrap().position.x, i as f32);
    }
    assert!(registry.try_make_handle(Transform3D::IDENTITY).is_err());

    registry.reset::<Transform3D>();
    assert!(handles.iter().all(|handle| !registry.is_handle_valid(*handle)));
}

#[test]
#[should_panic(expected = "Cannot reference uninitialized handle")]
fn test_default_handle_dereference_is_detected() {
    let scene = scene();
    let _ = scene.transforms()[Handle::<Transform3D>::default()];
}

#[test]
fn test_carry_tree_into_pot_then_drop_pot() {
    let mut scene = scene();
    let tree = scene
        .entities_mut()
        .spawn_tree(Transform3D::from_position(Vec3::new(5.0, 5.0, 0.0)))
        .unwrap();
    let pot = scene
        .entities_mut()
        .spawn_small_pot(Transform3D::from_position(Vec3::new(20.0, 20.0, 0.0)))
        .unwrap();

    scene.player_transform_mut().position = Vec3::new(5.0, 5.5, 0.0);
    let report = scene.update(DT, PICK);
    assert_eq!(report.pickup, PickupOutcome::PickedUp(tree));

    scene.player_transform_mut().position = Vec3::new(20.0, 19.5, 0.0);
    let report = scene.update(DT, USE);
    assert_eq!(
        report.interaction,
        InteractOutcome::PutInto {
            entity: tree,
            container: pot
        }
    );
    assert!(scene.hands().is_empty());

    let report = scene.update(DT, PICK);
    assert_eq!(report.pickup, PickupOutcome::PickedUp(pot));
    let tree_above_pot = scene.entities().position(tree).unwrap() - scene.entities().position(pot).unwrap();
    assert!(tree_above_pot.abs_diff_eq(Vec3::new(0.0, 0.0, 0.1), 1e-5));

    let report = scene.update(DT, PICK);
    assert_eq!(report.pickup, PickupOutcome::Dropped(pot));
    run_until_still(&mut scene);

    // The pot fell; its contents followed it down
    let pot_position = scene.entities().position(pot).unwrap();
    assert_eq!(pot_position.z, 0.0);
    let tree_position = scene.entities().position(tree).unwrap();
    assert!((tree_position.z - 0.1).abs() < 1e-5);
}

#[test]
fn test_store_and_retrieve_from_box() {
    let mut scene = scene();
    let storage_box = scene
        .entities_mut()
        .spawn_box(Transform3D::from_position(Vec3::new(8.0, 8.0, 0.0)))
        .unwrap();
    let water = scene
        .entities_mut()
        .spawn_water(Vec3::new(1.0, 1.0, 0.0), 0.5)
        .unwrap();

    scene.player_transform_mut().position = Vec3::new(1.0, 1.2, 0.0);
    scene.update(DT, PICK);
    assert_eq!(scene.hands().carried(), water);

    scene.player_transform_mut().position = Vec3::new(8.0, 7.0, 0.0);
    let report = scene.update(DT, USE);
    assert_eq!(
        report.interaction,
        InteractOutcome::PutInto {
            entity: water,
            container: storage_box
        }
    );

    // Closed box: pickup takes the whole box
    let report = scene.update(DT, PICK);
    assert_eq!(report.pickup, PickupOutcome::PickedUp(storage_box));
    scene.update(DT, PICK);
    run_until_still(&mut scene);

    let report = scene.update(DT, USE);
    assert_eq!(report.interaction, InteractOutcome::ToggledBox(storage_box));
    for _ in 0..60 {
        scene.update(DT, FrameInput::default());
    }
    assert_eq!(scene.entities().boxes[storage_box.index].state, BoxState::Open);

    let report = scene.update(DT, PICK);
    assert_eq!(report.pickup, PickupOutcome::PickedUp(water));
    assert_eq!(scene.entities().contents(storage_box), Some(sim_core::EntityReference::NONE));
}

#[test]
fn test_plant_tree() {
    let mut scene = Scene::load(SceneConfig::default(), HeightMap::flat(2.0, 64.0)).unwrap();
    let tree = scene
        .entities_mut()
        .spawn_tree(Transform3D::from_position(Vec3::new(3.0, 3.0, 2.0)))
        .unwrap();

    scene.player_transform_mut().position = Vec3::new(3.0, 3.0, 2.0);
    scene.update(DT, PICK);
    scene.player_transform_mut().position = Vec3::new(30.0, 30.0, 2.0);
    scene.update(DT, FrameInput::default());

    let report = scene.update(DT, USE);
    assert_eq!(report.interaction, InteractOutcome::Planted(tree));
    assert!(scene.entities().trees[tree.index].planted);
    let position = scene.entities().position(tree).unwrap();
    assert!((position.x - 30.0).abs() < 1e-5);
    assert_eq!(position.z, 2.0);
    assert!(scene.physics().is_empty());
    assert_eq!(scene.entities().count(EntityKind::Tree), 1);
}
