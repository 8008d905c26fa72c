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
//! Tagged entity references
//!
//! Gameplay entities live in one fixed-capacity pool per kind. An
//! [`EntityReference`] names one of them by kind and slot index, so code that
//! carries, contains or simulates "some entity" does not need to know which
//! pool it lives in.

use std::fmt;

/// The closed set of gameplay entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityKind {
    /// No entity; the empty sentinel
    #[default]
    None,
    /// Storage box that can hold one entity
    Box,
    /// Small pot that can hold a tree or a raccoon
    SmallPot,
    /// Big decorative pot
    BigPot,
    /// Wandering raccoon
    Raccoon,
    /// Tree sapling
    Tree,
    /// Water drop
    Water,
}

impl EntityKind {
    /// Every kind that refers to a pool
    pub const POOLED: [EntityKind; 6] = [
        EntityKind::Box,
        EntityKind::SmallPot,
        EntityKind::BigPot,
        EntityKind::Raccoon,
        EntityKind::Tree,
        EntityKind::Water,
    ];

    /// Check if the player can lift entities of this kind
    pub fn can_be_picked_up(self) -> bool {
        match self {
            EntityKind::Box
            | EntityKind::SmallPot
            | EntityKind::Raccoon
            | EntityKind::Tree
            | EntityKind::Water => true,
            EntityKind::None | EntityKind::BigPot => false,
        }
    }

    /// Check if entities of this kind fit into a storage box
    pub fn fits_in_box(self) -> bool {
        match self {
            EntityKind::SmallPot
            | EntityKind::Raccoon
            | EntityKind::Tree
            | EntityKind::Water => true,
            EntityKind::None | EntityKind::Box | EntityKind::BigPot => false,
        }
    }

    /// Check if entities of this kind fit into a small pot
    pub fn fits_in_pot(self) -> bool {
        matches!(self, EntityKind::Tree | EntityKind::Raccoon)
    }

    /// Short lowercase name for logs
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::None => "none",
            EntityKind::Box => "box",
            EntityKind::SmallPot => "small_pot",
            EntityKind::BigPot => "big_pot",
            EntityKind::Raccoon => "raccoon",
            EntityKind::Tree => "tree",
            EntityKind::Water => "water",
        }
    }
}

/// Kind plus slot index of a pooled gameplay entity
///
/// Two references are equal iff both fields match. The index is only
/// meaningful for the frame it was read in when the pool swap-removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EntityReference {
    /// Which pool
    pub kind: EntityKind,
    /// Slot in that pool
    pub index: usize,
}

impl EntityReference {
    /// The empty reference
    pub const NONE: EntityReference = EntityReference {
        kind: EntityKind::None,
        index: 0,
    };

    /// Create a reference
    pub fn new(kind: EntityKind, index: usize) -> Self {
        EntityReference { kind, index }
    }

    /// Check if this is the empty reference
    pub fn is_none(&self) -> bool {
        self.kind == EntityKind::None
    }

    /// Check if this refers to an entity
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }
}

impl fmt::Display for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EntityKind::None => write!(f, "none"),
            kind => write!(f, "{}#{}", kind.name(), self.index),
        }
    }
}
