//! Unsaved-draft tracking
//!
//! Provides [`UnsavedDrafts`], the set of frame ids that exist locally but
//! have not completed a save or submit.

use crate::types::FrameId;
use std::collections::HashSet;

/// Ids of frames never persisted since creation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UnsavedDrafts {
    ids: HashSet<FrameId>,
}

impl UnsavedDrafts {
    /// Create new empty tracker
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: HashSet::new(),
        }
    }

    /// Mark an id as unsaved
    pub fn mark(&mut self, id: FrameId) -> bool {
        self.ids.insert(id)
    }

    /// Mark an id as saved; returns whether it was unsaved
    #[inline]
    pub fn clear(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }

    /// Check if an id is unsaved
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Number of unsaved drafts
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if nothing is unsaved
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate unsaved ids
    pub fn iter(&self) -> impl Iterator<Item = &FrameId> {
        self.ids.iter()
    }

    /// Forget everything
    pub fn reset(&mut self) {
        self.ids.clear();
    }
}
