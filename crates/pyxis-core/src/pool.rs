// Copyright 2025 the pyxis contributors
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

//! Generic slot allocation for GPU-owned resources.
//!
//! Every buffer, texture, shader and render target lives in a
//! [`ResourcePool`] and is referenced from the outside only through a
//! [`Handle`]. Callers never hold driver-native objects.

/// A stable identifier for a pooled resource.
///
/// It combines a slot index with a generation count to solve the "ABA
/// problem": when a resource is released its index may be recycled, but the
/// generation is incremented, so stale handles referring to the old resource
/// fail to resolve instead of silently aliasing the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    /// The index of the resource's slot in the pool.
    pub index: u32,
    /// A counter incremented each time the slot index is recycled.
    pub generation: u32,
}

struct Slot<T> {
    generation: u32,
    /// `Some` only while the slot is live.
    payload: Option<T>,
}

/// An ordered collection of resource slots with free-list recycling.
///
/// `acquire` pops a free index when one is available (O(1)) and appends a new
/// slot otherwise. `release` hands the payload back to the caller so its
/// driver-side teardown can run, then pushes the index onto the free list.
///
/// Lookups against dead or out-of-range handles yield `None`; they are never
/// fatal, so the engine keeps running when defensively querying a handle that
/// has already been released.
pub struct ResourcePool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> ResourcePool<T> {
    /// Creates a new, empty pool.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Stores `payload` in a new or recycled slot and returns its handle.
    ///
    /// Recycled slots get their generation bumped so that handles to the
    /// previous occupant no longer resolve.
    pub fn acquire(&mut self, payload: T) -> Handle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.payload = Some(payload);
            Handle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                payload: Some(payload),
            });
            Handle {
                index,
                generation: 0,
            }
        }
    }

    /// Resolves a handle to its payload, or `None` if the handle is dead,
    /// stale, or out of range.
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots.get(handle.index as usize).and_then(|slot| {
            if slot.generation == handle.generation {
                slot.payload.as_ref()
            } else {
                None
            }
        })
    }

    /// Mutable variant of [`ResourcePool::get`].
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots.get_mut(handle.index as usize).and_then(|slot| {
            if slot.generation == handle.generation {
                slot.payload.as_mut()
            } else {
                None
            }
        })
    }

    /// Frees the slot and returns the payload so the caller can run its
    /// driver-side release. No-op (returns `None`) for a handle that is
    /// already released, stale, or out of range.
    pub fn release(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation || slot.payload.is_none() {
            return None;
        }
        let payload = slot.payload.take();
        self.free.push(handle.index);
        payload
    }

    /// Returns the number of live slots (total slots minus free slots).
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Returns `true` if no slot is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all live `(handle, payload)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.payload.as_ref().map(|payload| {
                (
                    Handle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    payload,
                )
            })
        })
    }

    /// Releases every live slot, handing each payload to `teardown`.
    pub fn drain_with(&mut self, mut teardown: impl FnMut(T)) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(payload) = slot.payload.take() {
                self.free.push(index as u32);
                teardown(payload);
            }
        }
    }
}

impl<T> Default for ResourcePool<T> {
    fn default() -> Self {
        Self::new()
    }
}
