//! Deduplicated objects, written once and shared by offset.

use std::collections::BTreeMap;

use crate::write::{LinkedWriter, Stake};

/// A store of objects that are written once and referred to by [`Stake`].
///
/// Asking for the stake of an object that is already in the pool returns the
/// existing stake. The objects are written in sorted order, so the output
/// does not depend on the order in which they were first requested.
#[derive(Clone, Debug)]
pub struct Pool<K: Ord> {
    objects: BTreeMap<K, Stake>,
}

impl<K: Ord> Default for Pool<K> {
    fn default() -> Self {
        Pool {
            objects: BTreeMap::new(),
        }
    }
}

impl<K: Ord> Pool<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stake for `object`, creating it if this is the first request.
    pub fn stake_for(&mut self, object: K, writer: &mut LinkedWriter) -> Stake {
        *self
            .objects
            .entry(object)
            .or_insert_with(|| writer.new_stake())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, object: &K) -> bool {
        self.objects.contains_key(object)
    }

    /// Place each object's stake and write it, in sorted order.
    pub fn write_all(&self, writer: &mut LinkedWriter, mut write: impl FnMut(&K, &mut LinkedWriter)) {
        for (object, stake) in &self.objects {
            writer.stake_current_with_value(*stake);
            write(object, writer);
        }
    }
}
