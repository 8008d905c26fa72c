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
//! Scene configuration
//!
//! Every pool in the simulation is sized once, at scene load, from a
//! [`SceneConfig`]. Physics constants live here too so that tests and tools
//! can run the same code with different tuning.
//!
//! Configurations can be built in code or loaded from TOML:
//!
//! ```
//! use sim_core::config::SceneConfig;
//!
//! let config = SceneConfig::from_toml_str("max_colliders = 16\ngravity = -4.0").unwrap();
//! assert_eq!(config.max_colliders, 16);
//! assert_eq!(config.physics.gravity, -4.0);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error while reading a config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file was not valid TOML for a scene config
    #[error("Parse error: {0}")]
    Parse(String),

    /// The values parsed but cannot be used
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Constants driving the drop-and-bounce simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Vertical acceleration in units/s², negative is down
    pub gravity: f32,
    /// Fraction of speed kept after a ground bounce
    pub bounce_factor: f32,
    /// Bounce speed below which an entity is considered settled
    pub sleep_threshold: f32,
    /// Impact speed mapped to full landing volume
    pub max_impact_speed: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            gravity: -9.81,
            bounce_factor: 0.5,
            sleep_threshold: 0.2,
            max_impact_speed: 10.0,
        }
    }
}

/// Capacities and tuning for one loaded scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Transform slots reachable through handles
    pub max_transforms: usize,
    /// 2D colliders
    pub max_colliders: usize,
    /// 2D collision records per frame (two per colliding pair)
    pub max_collisions: usize,
    /// Entities simulated by the physics world at once
    pub max_physics_entities: usize,
    /// Static oriented box colliders
    pub max_static_box_colliders: usize,
    /// Box colliders submitted per frame
    pub max_submitted_box_colliders: usize,
    /// Static and per-frame cylinder colliders
    pub max_cylinder_colliders: usize,
    /// Capacity of each gameplay entity pool
    pub max_entities_per_kind: usize,
    /// Physics constants, flattened into the top-level table
    #[serde(flatten)]
    pub physics: PhysicsConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            max_transforms: 256,
            max_colliders: 100,
            max_collisions: 300,
            max_physics_entities: 1000,
            max_static_box_colliders: 100,
            max_submitted_box_colliders: 100,
            max_cylinder_colliders: 100,
            max_entities_per_kind: 256,
            physics: PhysicsConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Create a configuration with the given collider and physics capacities
    pub fn new(max_colliders: usize, max_physics_entities: usize) -> Self {
        SceneConfig {
            max_colliders,
            max_collisions: max_colliders * 3,
            max_physics_entities,
            ..SceneConfig::default()
        }
    }

    /// Set the gravity acceleration
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        assert!(gravity.is_finite(), "Gravity must be finite");
        self.physics.gravity = gravity;
        self
    }

    /// Set the bounce factor
    pub fn with_bounce_factor(mut self, factor: f32) -> Self {
        assert!(
            (0.0..1.0).contains(&factor),
            "Bounce factor must be in [0, 1)"
        );
        self.physics.bounce_factor = factor;
        self
    }

    /// Set the capacity of each gameplay entity pool
    pub fn with_entities_per_kind(mut self, capacity: usize) -> Self {
        self.max_entities_per_kind = capacity;
        self
    }

    /// Check that the values can drive a simulation
    pub fn validate(&self) -> Result<(), ConfigError> {
        let physics = &self.physics;
        if !physics.gravity.is_finite() {
            return Err(ConfigError::Invalid("gravity must be finite".into()));
        }
        if !(0.0..1.0).contains(&physics.bounce_factor) {
            return Err(ConfigError::Invalid(format!(
                "bounce_factor {} outside [0, 1)",
                physics.bounce_factor
            )));
        }
        if !(physics.sleep_threshold > 0.0) {
            return Err(ConfigError::Invalid(
                "sleep_threshold must be positive".into(),
            ));
        }
        if !(physics.max_impact_speed > 0.0) {
            return Err(ConfigError::Invalid(
                "max_impact_speed must be positive".into(),
            ));
        }
        if self.max_transforms == 0 {
            return Err(ConfigError::Invalid(
                "max_transforms must leave room for the player".into(),
            ));
        }
        if self.max_collisions < self.max_colliders.min(2) {
            return Err(ConfigError::Invalid(
                "max_collisions cannot hold a single colliding pair".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SceneConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Serialize to pretty TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
