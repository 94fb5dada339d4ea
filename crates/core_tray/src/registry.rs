//! Icon registry.
//!
//! Ordered set of the icon windows currently embedded in the host window.
//! The front of the sequence is the most recently docked icon and is laid out
//! leftmost.

use crate::WindowId;
use std::collections::{HashSet, VecDeque};

/// Ordered, duplicate-free set of docked icon windows.
#[derive(Debug, Clone, Default)]
pub struct IconRegistry {
    /// Layout order, front = leftmost.
    order: VecDeque<WindowId>,
    /// Membership index for O(1) duplicate detection.
    members: HashSet<WindowId>,
}

impl IconRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an icon at the front of the sequence.
    ///
    /// Returns `false` (and leaves the order untouched) if the icon is
    /// already registered.
    pub fn insert(&mut self, window: WindowId) -> bool {
        if !self.members.insert(window) {
            return false;
        }
        self.order.push_front(window);
        true
    }

    /// Remove an icon, preserving the relative order of the rest.
    ///
    /// Returns `false` if the icon was not registered.
    pub fn remove(&mut self, window: WindowId) -> bool {
        if !self.members.remove(&window) {
            return false;
        }
        if let Some(pos) = self.order.iter().position(|&w| w == window) {
            self.order.remove(pos);
        }
        true
    }

    /// Check whether an icon is registered.
    pub fn contains(&self, window: WindowId) -> bool {
        self.members.contains(&window)
    }

    /// Icons in layout order.
    pub fn iter(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.order.iter().copied()
    }

    /// Number of registered icons.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if no icon is registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
