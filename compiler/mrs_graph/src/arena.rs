//! Slot + generation storage for modules and attributes.
//!
//! Removing an entry bumps its slot's generation, so a handle kept by an
//! observer list after its target was destroyed resolves to `None` instead
//! of aliasing whatever reuses the slot.

use std::fmt;
use std::marker::PhantomData;

/// Handle into an [`Arena`].
pub trait ArenaId: Copy {
    fn from_parts(slot: u32, generation: u32) -> Self;

    fn slot(self) -> u32;

    fn generation(self) -> u32;
}

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            slot: u32,
            generation: u32,
        }

        impl ArenaId for $name {
            #[inline]
            fn from_parts(slot: u32, generation: u32) -> Self {
                $name { slot, generation }
            }

            #[inline]
            fn slot(self) -> u32 {
                self.slot
            }

            #[inline]
            fn generation(self) -> u32 {
                self.generation
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}v{}"), self.slot, self.generation)
            }
        }
    };
}

arena_id!(
    /// Handle of a module in a [`SimContext`](crate::SimContext).
    ModuleId,
    "m"
);

arena_id!(
    /// Handle of an attribute in a [`SimContext`](crate::SimContext).
    AttrId,
    "a"
);

struct Slot<T> {
    generation: u32,
    data: Option<T>,
}

/// Owning storage addressed by generational handles.
pub struct Arena<I, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
    _id: PhantomData<I>,
}

impl<I: ArenaId, T> Arena<I, T> {
    pub fn new() -> Self {
        Arena {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            _id: PhantomData,
        }
    }

    pub fn insert(&mut self, value: T) -> I {
        self.live += 1;
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.data = Some(value);
            return I::from_parts(slot, entry.generation);
        }
        let slot = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            data: Some(value),
        });
        I::from_parts(slot, 0)
    }

    /// Remove and return the value; stale handles yield `None`.
    pub fn remove(&mut self, id: I) -> Option<T> {
        let entry = self.slots.get_mut(id.slot() as usize)?;
        if entry.generation != id.generation() {
            return None;
        }
        let value = entry.data.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.slot());
        self.live -= 1;
        Some(value)
    }

    #[inline]
    pub fn get(&self, id: I) -> Option<&T> {
        let entry = self.slots.get(id.slot() as usize)?;
        if entry.generation != id.generation() {
            return None;
        }
        entry.data.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        let entry = self.slots.get_mut(id.slot() as usize)?;
        if entry.generation != id.generation() {
            return None;
        }
        entry.data.as_mut()
    }

    #[inline]
    pub fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.slots.iter().enumerate().filter_map(|(slot, entry)| {
            let slot = u32::try_from(slot).ok()?;
            entry
                .data
                .as_ref()
                .map(|data| (I::from_parts(slot, entry.generation), data))
        })
    }
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
