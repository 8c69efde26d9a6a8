//! Ordered unit list
//!
//! An insertion-ordered, duplicate-free sequence of units. Used both as a
//! unit's full dependency list and as the global build order.

use std::collections::HashSet;

use crate::core::unit::UnitId;

/// Append-only, membership-checked list of units
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitList {
    order: Vec<UnitId>,
    members: HashSet<UnitId>,
}

impl UnitList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a unit unless it is already present
    ///
    /// Returns `true` if the unit was added.
    pub fn add(&mut self, id: UnitId) -> bool {
        if self.members.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    /// Append every unit from `ids`, keeping first-seen order
    pub fn add_all<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = UnitId>,
    {
        for id in ids {
            self.add(id);
        }
    }

    /// Whether the unit is in the list
    pub fn contains(&self, id: UnitId) -> bool {
        self.members.contains(&id)
    }

    /// Position of the unit in the list
    pub fn position(&self, id: UnitId) -> Option<usize> {
        self.order.iter().position(|&u| u == id)
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.order.iter().copied()
    }

    /// The units as a slice, in insertion order
    pub fn as_slice(&self) -> &[UnitId] {
        &self.order
    }

    /// Number of units
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<'a> IntoIterator for &'a UnitList {
    type Item = UnitId;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, UnitId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter().copied()
    }
}
