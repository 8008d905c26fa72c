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
//! Fixed-capacity pools and handles
//!
//! Every collection in the simulation is sized once when a scene loads and
//! never grows afterwards. This module provides the three layers used for
//! that:
//!
//! - [`Arena`]: a contiguous push-only buffer with a hard capacity, unordered
//!   swap-remove and whole-pool reset.
//! - [`HandlePool`]: an arena addressed through [`Handle`]s, lightweight
//!   `(tag, index)` references that never own the item.
//! - [`HandleRegistry`]: one `HandlePool` per type, owned by the scene
//!   context and passed by reference to systems that create or dereference
//!   handles.
//!
//! # Handle validity
//!
//! A handle is valid iff its tag is non-zero, the tag matches the pool's
//! current epoch and its index is below the pool's count. Resetting a pool
//! bumps the epoch, so handles made before the reset are rejected instead of
//! silently aliasing new items. A default-constructed handle has tag 0 and is
//! never valid.
//!
//! Swap-removing from an arena moves the last item into the freed slot. Raw
//! indices must not be kept across a removal.
//!
//! # Example
//!
//! ```
//! use sim_core::pool::{Handle, HandleRegistry};
//!
//! #[derive(Debug, PartialEq)]
//! struct Lamp { brightness: f32 }
//!
//! let mut registry = HandleRegistry::new();
//! registry.allocate_for_handle::<Lamp>(8);
//!
//! let lamp = registry.make_handle(Lamp { brightness: 0.5 });
//! assert!(registry.is_handle_valid(lamp));
//! assert_eq!(registry.get(lamp).unwrap().brightness, 0.5);
//!
//! assert!(!registry.is_handle_valid(Handle::<Lamp>::default()));
//! ```

use crate::error::{Result, SimError};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Usage statistics for sizing pools
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Fixed capacity the pool was created with
    pub capacity: usize,
    /// Items currently stored
    pub len: usize,
    /// Highest item count ever reached
    pub peak: usize,
}

impl PoolStats {
    /// Peak usage as a percentage of capacity
    pub fn peak_utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            (self.peak as f64 / self.capacity as f64) * 100.0
        }
    }
}

/// Contiguous fixed-capacity buffer with bump allocation
///
/// The backing storage is reserved once at construction. Pushing past the
/// capacity is a configuration error: [`Arena::push`] panics and
/// [`Arena::try_push`] returns [`SimError::CapacityExceeded`].
pub struct Arena<T> {
    items: Vec<T>,
    capacity: usize,
    peak: usize,
}

impl<T> Arena<T> {
    /// Reserve storage for exactly `capacity` items
    pub fn with_capacity(capacity: usize) -> Self {
        Arena {
            items: Vec::with_capacity(capacity),
            capacity,
            peak: 0,
        }
    }

    /// Fixed capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the arena is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check if another push would exceed the capacity
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Append an item, returning its index
    pub fn try_push(&mut self, item: T) -> Result<usize> {
        if self.is_full() {
            return Err(SimError::CapacityExceeded {
                type_name: std::any::type_name::<T>(),
                capacity: self.capacity,
            });
        }
        let index = self.items.len();
        self.items.push(item);
        self.peak = self.peak.max(self.items.len());
        Ok(index)
    }

    /// Append an item, returning its index
    ///
    /// # Panics
    ///
    /// Panics when the arena is full.
    pub fn push(&mut self, item: T) -> usize {
        assert!(
            !self.is_full(),
            "Arena capacity exceeded: {} holds at most {} items",
            std::any::type_name::<T>(),
            self.capacity
        );
        let index = self.items.len();
        self.items.push(item);
        self.peak = self.peak.max(self.items.len());
        index
    }

    /// Get an item by index
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Get a mutable item by index
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Remove an item by moving the last item into its slot
    ///
    /// O(1), reorders the arena.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn swap_remove(&mut self, index: usize) -> T {
        self.items.swap_remove(index)
    }

    /// Drop every item; the capacity stays reserved
    pub fn flush(&mut self) {
        self.items.clear();
    }

    /// Index of the first item matching `predicate`
    pub fn position(&self, predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.items.iter().position(predicate)
    }

    /// Iterate over stored items in index order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Iterate mutably over stored items in index order
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    /// Stored items as a slice
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Stored items as a mutable slice
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    /// Current usage statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity,
            len: self.items.len(),
            peak: self.peak,
        }
    }
}

impl<T> Index<usize> for Arena<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<T> IndexMut<usize> for Arena<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a Arena<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity)
            .field("items", &self.items)
            .finish()
    }
}

/// Lightweight reference into a [`HandlePool<T>`]
///
/// Eight bytes regardless of `T`. Copying a handle never copies the item.
pub struct Handle<T> {
    tag: u32,
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// A handle that never resolves
    pub const INVALID: Handle<T> = Handle {
        tag: 0,
        index: 0,
        _marker: PhantomData,
    };

    fn new(tag: u32, index: u32) -> Self {
        Handle {
            tag,
            index,
            _marker: PhantomData,
        }
    }

    /// Validity tag; zero means never initialized
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Slot index inside the pool
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Check if this handle was ever initialized
    pub fn is_initialized(&self) -> bool {
        self.tag != 0
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag.hash(state);
        self.index.hash(state);
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::INVALID
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle<{}>({}, tag: {})", short_type_name::<T>(), self.index, self.tag)
    }
}

fn short_type_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

/// Arena addressed through [`Handle`]s
pub struct HandlePool<T> {
    arena: Arena<T>,
    epoch: u32,
}

impl<T> HandlePool<T> {
    /// Create a pool for `capacity` items
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity <= u32::MAX as usize,
            "Handle pools address at most u32::MAX items"
        );
        HandlePool {
            arena: Arena::with_capacity(capacity),
            epoch: 1,
        }
    }

    /// Store `value` and return a handle to it
    pub fn try_make_handle(&mut self, value: T) -> Result<Handle<T>> {
        let index = self.arena.try_push(value)?;
        Ok(Handle::new(self.epoch, index as u32))
    }

    /// Store `value` and return a handle to it
    ///
    /// # Panics
    ///
    /// Panics when the pool is full.
    pub fn make_handle(&mut self, value: T) -> Handle<T> {
        let index = self.arena.push(value);
        Handle::new(self.epoch, index as u32)
    }

    /// Check if `handle` resolves to a live item
    pub fn is_valid(&self, handle: Handle<T>) -> bool {
        handle.tag != 0 && handle.tag == self.epoch && handle.index() < self.arena.len()
    }

    /// Resolve a handle
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        if self.is_valid(handle) {
            self.arena.get(handle.index())
        } else {
            None
        }
    }

    /// Resolve a handle mutably
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        if self.is_valid(handle) {
            self.arena.get_mut(handle.index())
        } else {
            None
        }
    }

    /// Resolve a handle, reporting why it failed
    pub fn try_get(&self, handle: Handle<T>) -> Result<&T> {
        self.get(handle).ok_or(SimError::InvalidHandle {
            type_name: std::any::type_name::<T>(),
            tag: handle.tag,
            index: handle.index,
        })
    }

    /// Handle for the item currently stored at `index`
    pub fn handle_at(&self, index: usize) -> Option<Handle<T>> {
        (index < self.arena.len()).then(|| Handle::new(self.epoch, index as u32))
    }

    /// Iterate over `(handle, item)` pairs in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        let epoch = self.epoch;
        self.arena
            .iter()
            .enumerate()
            .map(move |(i, item)| (Handle::new(epoch, i as u32), item))
    }

    /// Iterate mutably over stored items in slot order
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.arena.iter_mut()
    }

    /// Stored items as a slice, in slot order
    pub fn as_slice(&self) -> &[T] {
        self.arena.as_slice()
    }

    /// Stored items as a mutable slice, in slot order
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.arena.as_mut_slice()
    }

    /// Drop every item and invalidate every outstanding handle
    pub fn reset(&mut self) {
        self.arena.flush();
        self.epoch = self.epoch.checked_add(1).unwrap_or(1);
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Fixed capacity
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Current usage statistics
    pub fn stats(&self) -> PoolStats {
        self.arena.stats()
    }
}

impl<T> Index<Handle<T>> for HandlePool<T> {
    type Output = T;

    fn index(&self, handle: Handle<T>) -> &T {
        assert!(self.is_valid(handle), "Cannot reference uninitialized handle: {:?}", handle);
        &self.arena[handle.index()]
    }
}

impl<T> IndexMut<Handle<T>> for HandlePool<T> {
    fn index_mut(&mut self, handle: Handle<T>) -> &mut T {
        assert!(self.is_valid(handle), "Cannot reference uninitialized handle: {:?}", handle);
        &mut self.arena[handle.index()]
    }
}

impl<T: fmt::Debug> fmt::Debug for HandlePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlePool")
            .field("epoch", &self.epoch)
            .field("arena", &self.arena)
            .finish()
    }
}

/// One [`HandlePool`] per item type, owned by a scene
///
/// Two registries never share storage, so several scenes can be alive at
/// once and reloading a scene cannot leave handles pointing at stale
/// process-wide state.
#[derive(Default)]
pub struct HandleRegistry {
    pools: HashMap<TypeId, Box<dyn Any>>,
}

impl HandleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        HandleRegistry {
            pools: HashMap::new(),
        }
    }

    /// Reserve the pool for `T`
    ///
    /// Allocating again replaces the previous pool; its handles stop
    /// resolving.
    pub fn allocate_for_handle<T: 'static>(&mut self, capacity: usize) {
        let previous_epoch = self.pool::<T>().map(|pool| pool.epoch);
        let mut pool = HandlePool::<T>::with_capacity(capacity);
        if let Some(epoch) = previous_epoch {
            pool.epoch = epoch.checked_add(1).unwrap_or(1);
        }
        log::debug!(
            "allocated handle pool for {} (capacity {})",
            short_type_name::<T>(),
            capacity
        );
        self.pools.insert(TypeId::of::<T>(), Box::new(pool));
    }

    /// The pool for `T`, if allocated
    pub fn pool<T: 'static>(&self) -> Option<&HandlePool<T>> {
        self.pools
            .get(&TypeId::of::<T>())
            .and_then(|pool| pool.downcast_ref::<HandlePool<T>>())
    }

    /// The pool for `T`, if allocated
    pub fn pool_mut<T: 'static>(&mut self) -> Option<&mut HandlePool<T>> {
        self.pools
            .get_mut(&TypeId::of::<T>())
            .and_then(|pool| pool.downcast_mut::<HandlePool<T>>())
    }

    /// Store `value` in the pool for `T`
    pub fn try_make_handle<T: 'static>(&mut self, value: T) -> Result<Handle<T>> {
        self.pool_mut::<T>()
            .ok_or(SimError::PoolNotAllocated(std::any::type_name::<T>()))?
            .try_make_handle(value)
    }

    /// Store `value` in the pool for `T`
    ///
    /// # Panics
    ///
    /// Panics when no pool was allocated for `T` or the pool is full.
    pub fn make_handle<T: 'static>(&mut self, value: T) -> Handle<T> {
        match self.pool_mut::<T>() {
            Some(pool) => pool.make_handle(value),
            None => panic!(
                "No pool allocated for {}; call allocate_for_handle first",
                std::any::type_name::<T>()
            ),
        }
    }

    /// Check if `handle` resolves to a live item
    pub fn is_handle_valid<T: 'static>(&self, handle: Handle<T>) -> bool {
        self.pool::<T>().map_or(false, |pool| pool.is_valid(handle))
    }

    /// Resolve a handle
    pub fn get<T: 'static>(&self, handle: Handle<T>) -> Option<&T> {
        self.pool::<T>()?.get(handle)
    }

    /// Resolve a handle mutably
    pub fn get_mut<T: 'static>(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.pool_mut::<T>()?.get_mut(handle)
    }

    /// Empty the pool for `T`, keeping its capacity
    pub fn reset<T: 'static>(&mut self) {
        if let Some(pool) = self.pool_mut::<T>() {
            pool.reset();
        }
    }

    /// Drop every pool
    pub fn clear(&mut self) {
        self.pools.clear();
    }

    /// Number of allocated pools
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }
}

impl fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("pools", &self.pools.len())
            .finish()
    }
}
