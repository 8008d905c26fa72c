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
//! World transforms
//!
//! The world is Z-up: `x`/`y` span the ground plane and `z` is height.

use glam::{Mat4, Quat, Vec3};

/// Position, rotation and scale of a scene object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform3D {
    /// World position
    pub position: Vec3,
    /// World rotation
    pub rotation: Quat,
    /// Per-axis scale
    pub scale: Vec3,
}

impl Transform3D {
    /// Identity transform
    pub const IDENTITY: Transform3D = Transform3D {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Identity transform moved to `position`
    pub fn from_position(position: Vec3) -> Self {
        Transform3D {
            position,
            ..Self::IDENTITY
        }
    }

    /// Local-to-world matrix
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// World-to-local matrix
    ///
    /// Built from the inverted components rather than a general matrix
    /// inverse. A zero scale axis produces non-finite values.
    pub fn inverse_matrix(&self) -> Mat4 {
        Mat4::from_scale(self.scale.recip())
            * Mat4::from_quat(self.rotation.inverse())
            * Mat4::from_translation(-self.position)
    }

    /// Transform a point from local to world space
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * (point * self.scale)
    }

    /// The local +X axis in world space
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::IDENTITY
    }
}
