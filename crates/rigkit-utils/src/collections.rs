use bitvec::prelude::*;
use std::ops::{Index, IndexMut};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Push-only storage with a changed bit per slot.
///
/// Rig data lives for the whole session, so unlike a general object pool
/// there is no release/erase path; slots are only ever appended and the
/// changed bits drive incremental matrix updates.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct TrackedStorage<T: Default + std::fmt::Debug + Clone> {
    storage: Vec<T>,
    changed: BitVec,
}

impl<T: Default + Clone + std::fmt::Debug> Default for TrackedStorage<T> {
    fn default() -> Self {
        Self {
            storage: Vec::new(),
            changed: BitVec::new(),
        }
    }
}

#[allow(dead_code)]
impl<T: Default + Clone + std::fmt::Debug> TrackedStorage<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: Vec::with_capacity(capacity),
            changed: BitVec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn push(&mut self, val: T) -> usize {
        let index = self.storage.len();
        self.storage.push(val);
        self.changed.push(true);
        index
    }

    /// Return immutable reference to index.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.storage.get(index)
    }

    /// Returns mutable reference to index.
    /// Sets changed flag to true.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        match self.storage.get_mut(index) {
            Some(v) => {
                self.changed.set(index, true);
                Some(v)
            }
            None => None,
        }
    }

    /// Returns whether any changed flag is set.
    pub fn any_changed(&self) -> bool {
        self.changed.any()
    }

    /// Returns whether flag for object at index is set.
    pub fn get_changed(&self, index: usize) -> bool {
        match self.changed.get(index) {
            None => false,
            Some(changed) => *changed,
        }
    }

    pub fn trigger_changed(&mut self, index: usize) {
        self.changed.set(index, true);
    }

    pub fn trigger_changed_all(&mut self) {
        self.changed.fill(true);
    }

    pub fn reset_changed(&mut self) {
        self.changed.fill(false);
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.storage.iter().enumerate()
    }

    /// Iterates mutably over all slots, flagging every slot as changed.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.changed.fill(true);
        self.storage.iter_mut().enumerate()
    }

    pub fn iter_changed(&self) -> impl Iterator<Item = (usize, &T)> {
        let changed = &self.changed;
        self.storage
            .iter()
            .enumerate()
            .filter(move |(i, _)| changed.get(*i).map(|b| *b).unwrap_or(false))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.storage
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.storage
    }
}

impl<T: Default + Clone + std::fmt::Debug> From<Vec<T>> for TrackedStorage<T> {
    fn from(v: Vec<T>) -> Self {
        let mut changed = BitVec::with_capacity(v.len());
        changed.resize(v.len(), true);
        Self {
            storage: v,
            changed,
        }
    }
}

impl<T: Default + Clone + std::fmt::Debug> Index<usize> for TrackedStorage<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.storage[index]
    }
}

impl<T: Default + Clone + std::fmt::Debug> IndexMut<usize> for TrackedStorage<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        self.changed.set(index, true);
        &mut self.storage[index]
    }
}
