//! In-memory frame registry
//!
//! Provides [`FrameRegistry`], the single owner of every frame record on the
//! client. It also owns the unsaved-draft set and the current selection so
//! the three can be kept consistent under one lock.
//!
//! # Invariant
//!
//! An id is in the unsaved set only if the frame exists and is a draft.

use crate::frame::Frame;
use crate::types::{FrameId, FrameStatus};
use crate::unsaved::UnsavedDrafts;
use indexmap::IndexMap;

/// Insertion-ordered frame collection
#[derive(Debug, Default, Clone)]
pub struct FrameRegistry {
    frames: IndexMap<FrameId, Frame>,
    unsaved: UnsavedDrafts,
    selected: Option<FrameId>,
}

impl FrameRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a persisted frame
    pub fn insert(&mut self, frame: Frame) -> Option<Frame> {
        self.frames.insert(frame.id.clone(), frame)
    }

    /// Insert a locally created draft: registry, unsaved set and selection
    pub fn insert_unsaved(&mut self, frame: Frame) {
        let id = frame.id.clone();
        self.frames.insert(id.clone(), frame);
        self.unsaved.mark(id.clone());
        self.selected = Some(id);
    }

    /// Look up by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Frame> {
        self.frames.get(id)
    }

    /// Mutable lookup by id
    #[inline]
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Frame> {
        self.frames.get_mut(id)
    }

    /// Check if id exists
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.frames.contains_key(id)
    }

    /// Remove from registry and unsaved set, clearing the selection if it
    /// pointed here. Preserves the order of the remaining frames.
    pub fn remove(&mut self, id: &str) -> Option<Frame> {
        self.unsaved.clear(id);
        if self.selected.as_ref().is_some_and(|s| s.as_str() == id) {
            self.selected = None;
        }
        self.frames.shift_remove(id)
    }

    /// All frames in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.values()
    }

    /// Frames with the given status
    #[must_use]
    pub fn by_status(&self, status: FrameStatus) -> Vec<&Frame> {
        self.frames.values().filter(|f| f.status == status).collect()
    }

    /// Frames owned by a user
    #[must_use]
    pub fn by_owner(&self, owner_id: &str) -> Vec<&Frame> {
        self.frames
            .values()
            .filter(|f| f.owner_id == owner_id)
            .collect()
    }

    /// Frames not yet archived
    #[must_use]
    pub fn working(&self) -> Vec<&Frame> {
        self.frames.values().filter(|f| f.is_working()).collect()
    }

    /// Archived frames
    #[must_use]
    pub fn archived(&self) -> Vec<&Frame> {
        self.by_status(FrameStatus::Archived)
    }

    /// Select a frame; unknown ids clear the selection
    pub fn select(&mut self, id: Option<&str>) {
        self.selected = id.filter(|id| self.contains(id)).map(FrameId::from);
    }

    /// Selected frame, if any
    #[must_use]
    pub fn selected(&self) -> Option<&Frame> {
        self.selected.as_ref().and_then(|id| self.frames.get(id))
    }

    /// Selected id, if any
    #[must_use]
    pub fn selected_id(&self) -> Option<&FrameId> {
        self.selected.as_ref()
    }

    /// Remove from the unsaved set; returns whether it was unsaved
    pub fn mark_saved(&mut self, id: &str) -> bool {
        self.unsaved.clear(id)
    }

    /// True iff the id is not in the unsaved set
    #[inline]
    #[must_use]
    pub fn is_saved(&self, id: &str) -> bool {
        !self.unsaved.contains(id)
    }

    /// Unsaved-draft set
    #[must_use]
    pub fn unsaved(&self) -> &UnsavedDrafts {
        &self.unsaved
    }

    /// Move a record to a new id, keeping its position, unsaved membership
    /// and selection. Returns false if `old` is absent or `new` is taken.
    pub fn rekey(&mut self, old: &str, new: FrameId) -> bool {
        if old == new.as_str() {
            return self.contains(old);
        }
        if self.contains(new.as_str()) {
            return false;
        }
        let Some(index) = self.frames.get_index_of(old) else {
            return false;
        };
        let Some(mut frame) = self.frames.shift_remove(old) else {
            return false;
        };
        frame.id = new.clone();
        self.frames.shift_insert(index, new.clone(), frame);
        if self.unsaved.clear(old) {
            self.unsaved.mark(new.clone());
        }
        if self.selected.as_ref().is_some_and(|s| s.as_str() == old) {
            self.selected = Some(new);
        }
        true
    }

    /// Replace every saved frame with `frames`, keeping unsaved drafts
    ///
    /// A fetched frame with the same id as an unsaved draft is skipped.
    pub fn replace_saved(&mut self, frames: Vec<Frame>) {
        self.replace_saved_keeping(frames, |_| false);
    }

    /// [`FrameRegistry::replace_saved`], also keeping every frame `keep` accepts
    pub fn replace_saved_keeping(&mut self, frames: Vec<Frame>, keep: impl Fn(&str) -> bool) {
        let unsaved = &self.unsaved;
        self.frames
            .retain(|id, _| unsaved.contains(id.as_str()) || keep(id.as_str()));
        for frame in frames {
            let id = frame.id.as_str();
            if !self.unsaved.contains(id) && !keep(id) {
                self.frames.insert(frame.id.clone(), frame);
            }
        }
        if let Some(id) = &self.selected {
            if !self.frames.contains_key(id) {
                self.selected = None;
            }
        }
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.frames.clear();
        self.unsaved.reset();
        self.selected = None;
    }

    /// Number of frames
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Check that every unsaved id names an existing draft
    #[must_use]
    pub fn unsaved_invariant_holds(&self) -> bool {
        self.unsaved.iter().all(|id| {
            self.frames
                .get(id)
                .is_some_and(|f| f.status == FrameStatus::Draft)
        })
    }
}
