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
//! Drop and bounce example
//!
//! Loads a scene on rolling terrain, carries a raccoon over to a pot,
//! picks the pot up and drops it, then prints every landing until it
//! settles. Pass a TOML file path to override the scene configuration.
//!
//! Run with `RUST_LOG=debug cargo run --example drop_and_bounce` to see the
//! simulation's own log output.

use glam::Vec3;
use sim_core::entity::{InteractOutcome, PickupOutcome};
use sim_core::{FrameInput, HeightMap, Scene, SceneConfig, Transform3D};

const DT: f32 = 1.0 / 60.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("Sim Core - Drop and Bounce Example");
    println!("==================================\n");

    let config = match std::env::args().nth(1) {
        Some(path) => SceneConfig::load_from_file(path)?,
        None => SceneConfig::default(),
    };

    let terrain = HeightMap::from_fn(33, 64.0, 0.0, 3.0, |p| {
        0.5 + 0.25 * (p.x * 0.2).sin() + 0.25 * (p.y * 0.15).cos()
    })?;
    let mut scene = Scene::load(config, terrain)?;

    let ground = |scene: &Scene, x: f32, y: f32| scene.collision_3d().terrain_height(glam::Vec2::new(x, y));

    let raccoon_at = Vec3::new(10.0, 10.0, ground(&scene, 10.0, 10.0));
    let pot_at = Vec3::new(14.0, 10.0, ground(&scene, 14.0, 10.0));
    let raccoon = scene
        .entities_mut()
        .spawn_raccoon(Transform3D::from_position(raccoon_at))?;
    let pot = scene
        .entities_mut()
        .spawn_small_pot(Transform3D::from_position(pot_at))?;
    println!("Spawned {} at {:?}", raccoon, raccoon_at);
    println!("Spawned {} at {:?}\n", pot, pot_at);

    let pick = FrameInput {
        pickup_or_drop: true,
        ..FrameInput::default()
    };
    let interact = FrameInput {
        interact: true,
        ..FrameInput::default()
    };

    scene.player_transform_mut().position = raccoon_at - Vec3::Y * 0.5;
    if let PickupOutcome::PickedUp(entity) = scene.update(DT, pick).pickup {
        println!("Player picked up {}", entity);
    }

    scene.player_transform_mut().position = pot_at - Vec3::Y * 0.5;
    if let InteractOutcome::PutInto { entity, container } = scene.update(DT, interact).interaction {
        println!("Player put {} into {}", entity, container);
    }

    scene.update(DT, pick);
    scene.player_transform_mut().position.z += 2.0;
    scene.update(DT, FrameInput::default());
    if let PickupOutcome::Dropped(entity) = scene.update(DT, pick).pickup {
        let height = scene.entities().position(entity).map(|p| p.z).unwrap_or_default();
        println!("Player dropped {} from z = {:.2}\n", entity, height);
    }

    let mut frame = 0;
    while !scene.physics().is_empty() && frame < 1200 {
        scene.begin_frame();
        let report = scene.update(DT, FrameInput::default());
        for landing in &report.physics.landings {
            println!(
                "  t = {:5.2}s  {} landed at {:.2} m/s (volume {:.2})",
                frame as f32 * DT,
                landing.entity,
                landing.impact_speed,
                landing.volume
            );
        }
        for entity in &report.physics.settled {
            println!("  {} settled", entity);
        }
        frame += 1;
    }

    // One more frame so the raccoon catches up with the settled pot
    scene.update(DT, FrameInput::default());

    println!();
    for entity in [pot, raccoon] {
        if let Some(position) = scene.entities().position(entity) {
            println!("{} rests at {:?}", entity, position);
        }
    }

    let stats = scene.transforms().stats();
    println!(
        "\nTransform pool: {}/{} used, peak {:.1}%",
        stats.len,
        stats.capacity,
        stats.peak_utilization()
    );

    Ok(())
}
