// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Selection bookkeeping for a view.
//!
//! Tracks the selected items plus the three per-view distinguished items
//! (focused, hovered, dropzone). A revision counter bumps on every change
//! so views can cheaply detect staleness. The canvas does not consult the
//! selection; the owning view purges removed items via
//! [`Selection::remove`].

use crate::item::ItemId;

/// The set of selected items plus focus/hover/dropzone state.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    items: Vec<ItemId>,
    focused: Option<ItemId>,
    hovered: Option<ItemId>,
    dropzone: Option<ItemId>,
    revision: u64,
}

impl Selection {
    /// An empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The selected items, in selection order.
    #[must_use]
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// Whether `item` is selected.
    #[must_use]
    pub fn is_selected(&self, item: ItemId) -> bool {
        self.items.contains(&item)
    }

    /// The focused item, if any.
    #[must_use]
    pub fn focused(&self) -> Option<ItemId> {
        self.focused
    }

    /// The hovered item, if any.
    #[must_use]
    pub fn hovered(&self) -> Option<ItemId> {
        self.hovered
    }

    /// The active drop target, if any.
    #[must_use]
    pub fn dropzone(&self) -> Option<ItemId> {
        self.dropzone
    }

    /// Bumped on every change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Add `item` to the selection.
    pub fn select(&mut self, item: ItemId) {
        if !self.items.contains(&item) {
            self.items.push(item);
            self.bump();
        }
    }

    /// Remove `item` from the selection. Hover, dropzone, and focus are
    /// cleared too when they point at it.
    pub fn unselect(&mut self, item: ItemId) {
        let mut changed = false;
        for slot in [&mut self.hovered, &mut self.dropzone, &mut self.focused] {
            if *slot == Some(item) {
                *slot = None;
                changed = true;
            }
        }
        if let Some(index) = self.items.iter().position(|&i| i == item) {
            self.items.remove(index);
            changed = true;
        }
        if changed {
            self.bump();
        }
    }

    /// Unselect every selected item and clear the focus.
    ///
    /// Hover and dropzone state pointing at a selected item goes with it;
    /// pointing at an unselected item it stays.
    pub fn unselect_all(&mut self) {
        while let Some(&item) = self.items.last() {
            self.unselect(item);
        }
        self.set_focused(None);
    }

    /// Focus `item`; focusing selects. `None` clears the focus but keeps
    /// the selection.
    pub fn set_focused(&mut self, item: Option<ItemId>) {
        if let Some(item) = item {
            self.select(item);
        }
        if self.focused != item {
            self.focused = item;
            self.bump();
        }
    }

    /// Track the item under the pointer.
    pub fn set_hovered(&mut self, item: Option<ItemId>) {
        if self.hovered != item {
            self.hovered = item;
            self.bump();
        }
    }

    /// Track the active drop target.
    pub fn set_dropzone(&mut self, item: Option<ItemId>) {
        if self.dropzone != item {
            self.dropzone = item;
            self.bump();
        }
    }

    /// Forget `item` everywhere. Call when the item leaves the canvas.
    pub fn remove(&mut self, item: ItemId) {
        self.unselect(item);
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: u32) -> ItemId {
        ItemId::new(n, 1)
    }

    #[test]
    fn focusing_selects() {
        let mut selection = Selection::new();
        selection.set_focused(Some(item(1)));
        assert!(selection.is_selected(item(1)));
        assert_eq!(selection.focused(), Some(item(1)));

        // Clearing the focus keeps the selection.
        selection.set_focused(None);
        assert!(selection.is_selected(item(1)));
        assert_eq!(selection.focused(), None);
    }

    #[test]
    fn unselect_clears_focus() {
        let mut selection = Selection::new();
        selection.set_focused(Some(item(1)));
        selection.unselect(item(1));
        assert!(!selection.is_selected(item(1)));
        assert_eq!(selection.focused(), None);
    }

    #[test]
    fn revision_bumps_on_changes_only() {
        let mut selection = Selection::new();
        let r0 = selection.revision();
        selection.select(item(1));
        let r1 = selection.revision();
        assert_ne!(r0, r1);

        // Selecting again changes nothing.
        selection.select(item(1));
        assert_eq!(selection.revision(), r1);

        selection.set_hovered(Some(item(2)));
        assert_ne!(selection.revision(), r1);
    }

    #[test]
    fn unselect_clears_hover_and_dropzone() {
        let mut selection = Selection::new();
        selection.select(item(1));
        selection.set_hovered(Some(item(1)));
        selection.set_dropzone(Some(item(1)));

        selection.unselect(item(1));
        assert!(!selection.is_selected(item(1)));
        assert_eq!(selection.hovered(), None);
        assert_eq!(selection.dropzone(), None);
    }

    #[test]
    fn unselect_all_forgets_hovered_and_dropzone_items() {
        let mut selection = Selection::new();
        selection.select(item(1));
        selection.select(item(2));
        selection.set_focused(Some(item(1)));
        selection.set_hovered(Some(item(2)));
        selection.set_dropzone(Some(item(2)));

        selection.unselect_all();
        assert!(selection.items().is_empty());
        assert_eq!(selection.focused(), None);
        assert_eq!(selection.hovered(), None);
        assert_eq!(selection.dropzone(), None);
    }

    #[test]
    fn unselect_all_keeps_hover_on_unselected_items() {
        let mut selection = Selection::new();
        selection.select(item(1));
        selection.set_hovered(Some(item(9)));
        selection.set_dropzone(Some(item(9)));

        selection.unselect_all();
        assert!(selection.items().is_empty());
        assert_eq!(selection.hovered(), Some(item(9)));
        assert_eq!(selection.dropzone(), Some(item(9)));
    }

    #[test]
    fn remove_purges_everywhere() {
        let mut selection = Selection::new();
        selection.select(item(1));
        selection.select(item(2));
        selection.set_focused(Some(item(1)));
        selection.set_hovered(Some(item(1)));
        selection.set_dropzone(Some(item(1)));

        selection.remove(item(1));
        assert!(!selection.is_selected(item(1)));
        assert!(selection.is_selected(item(2)));
        assert_eq!(selection.focused(), None);
        assert_eq!(selection.hovered(), None);
        assert_eq!(selection.dropzone(), None);
    }
}
