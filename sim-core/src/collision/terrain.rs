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
//! Heightmap terrain

use crate::error::{Result, SimError};
use glam::Vec2;

/// Square grid of normalized height samples
///
/// Samples are laid out in rows along `y`, `grid_size` samples per row,
/// spaced `world_size / grid_size` apart starting at the origin. Heights are
/// interpolated between the first and the last sample of each row, so the
/// covered square ends one spacing short of `world_size`. Sample values are
/// normalized: `0.0` maps to `min_height` and `1.0` to `max_height`.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightMap {
    values: Vec<f32>,
    grid_size: usize,
    world_size: f32,
    min_height: f32,
    max_height: f32,
}

impl HeightMap {
    /// Build a height map from row-major samples
    ///
    /// Fails when the sample count is not `grid_size²`, the grid has fewer
    /// than two samples per side, the world size is not positive, or a sample
    /// is not finite.
    pub fn new(
        values: Vec<f32>,
        grid_size: usize,
        world_size: f32,
        min_height: f32,
        max_height: f32,
    ) -> Result<Self> {
        if grid_size < 2 {
            return Err(SimError::InvalidHeightMap(format!(
                "grid size {} is below 2",
                grid_size
            )));
        }
        if values.len() != grid_size * grid_size {
            return Err(SimError::InvalidHeightMap(format!(
                "expected {} samples for a {}x{} grid, got {}",
                grid_size * grid_size,
                grid_size,
                grid_size,
                values.len()
            )));
        }
        if !(world_size > 0.0 && world_size.is_finite()) {
            return Err(SimError::InvalidHeightMap(format!(
                "world size {} must be positive",
                world_size
            )));
        }
        if let Some(index) = values.iter().position(|value| !value.is_finite()) {
            return Err(SimError::InvalidHeightMap(format!(
                "sample {} is not finite",
                index
            )));
        }
        Ok(HeightMap {
            values,
            grid_size,
            world_size,
            min_height,
            max_height,
        })
    }

    /// Level ground at `height` covering `[0, world_size)²`
    pub fn flat(height: f32, world_size: f32) -> Self {
        // Two samples per side only reach half of the mapped size
        HeightMap {
            values: vec![0.0; 4],
            grid_size: 2,
            world_size: 2.0 * world_size.max(f32::EPSILON),
            min_height: height,
            max_height: height,
        }
    }

    /// Sample a normalized height function on a `grid_size²` grid
    ///
    /// `sample` receives the world position of each grid point.
    pub fn from_fn(
        grid_size: usize,
        world_size: f32,
        min_height: f32,
        max_height: f32,
        mut sample: impl FnMut(Vec2) -> f32,
    ) -> Result<Self> {
        let spacing = world_size / grid_size.max(1) as f32;
        let mut values = Vec::with_capacity(grid_size * grid_size);
        for y in 0..grid_size {
            for x in 0..grid_size {
                values.push(sample(Vec2::new(x as f32, y as f32) * spacing));
            }
        }
        Self::new(values, grid_size, world_size, min_height, max_height)
    }

    /// Samples per side
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Side length the grid is mapped onto, in world units
    pub fn world_size(&self) -> f32 {
        self.world_size
    }

    /// Bilinearly interpolated height at a position relative to the map's
    /// origin
    ///
    /// Positions whose grid cell has no far neighbour, including anything
    /// outside the covered square, have height `0.0`.
    pub fn height_at(&self, position: Vec2) -> f32 {
        let grid = position * (self.grid_size as f32 / self.world_size);
        let cell = grid.floor();

        let last = (self.grid_size - 1) as f32;
        let inside = cell.x >= 0.0 && cell.x < last && cell.y >= 0.0 && cell.y < last;
        if !inside {
            return 0.0;
        }

        let x0 = cell.x as usize;
        let y0 = cell.y as usize;
        let x_fraction = grid.x - cell.x;
        let y_fraction = grid.y - cell.y;

        let value = |x: usize, y: usize| self.values[x + y * self.grid_size];
        let near_row = lerp(value(x0, y0), value(x0 + 1, y0), x_fraction);
        let far_row = lerp(value(x0, y0 + 1), value(x0 + 1, y0 + 1), x_fraction);
        let normalized = lerp(near_row, far_row, y_fraction);

        lerp(self.min_height, self.max_height, normalized)
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}
