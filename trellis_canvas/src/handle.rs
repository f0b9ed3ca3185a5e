// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handles: the grabbable anchor points of an item.

use kurbo::Point;
use trellis_solver::{Position, Solver, Strength};

bitflags::bitflags! {
    /// State bits of a [`Handle`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct HandleFlags: u8 {
        /// The handle can be connected to a port.
        const CONNECTABLE = 0b0000_0001;
        /// The handle can be dragged by the user.
        const MOVABLE     = 0b0000_0010;
        /// The handle is shown to the user.
        const VISIBLE     = 0b0000_0100;
        /// The handle is being moved and is about to connect.
        const GLUED       = 0b0000_1000;
    }
}

impl Default for HandleFlags {
    fn default() -> Self {
        Self::MOVABLE | Self::VISIBLE
    }
}

/// Identifier for a handle, unique within one canvas.
///
/// Allocated by the connections registry; stable across handle list edits
/// (segment splits and merges reorder lists, never ids).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct HandleId(pub(crate) u32);

/// A grabbable anchor on an item, carrying a [`Position`].
///
/// The position is in item-local coordinates; its strength decides how the
/// solver trades the handle off against other variables.
#[derive(Copy, Clone, Debug)]
pub struct Handle {
    pos: Position,
    flags: HandleFlags,
}

impl Handle {
    /// Create a handle at `point` (item coordinates).
    pub fn new(solver: &mut Solver, point: Point, strength: Strength, flags: HandleFlags) -> Self {
        Self {
            pos: Position::new(solver, point, strength),
            flags,
        }
    }

    /// The handle's position.
    pub fn pos(&self) -> Position {
        self.pos
    }

    /// Current coordinates of the handle.
    pub fn point(&self, solver: &Solver) -> Point {
        self.pos.point(solver)
    }

    /// Move the handle.
    pub fn set_point(&self, solver: &mut Solver, point: Point) {
        self.pos.set(solver, point);
    }

    /// All state bits.
    pub fn flags(&self) -> HandleFlags {
        self.flags
    }

    /// Whether the handle may connect to a port.
    pub fn connectable(&self) -> bool {
        self.flags.contains(HandleFlags::CONNECTABLE)
    }

    /// Allow or forbid connecting this handle.
    pub fn set_connectable(&mut self, connectable: bool) {
        self.flags.set(HandleFlags::CONNECTABLE, connectable);
    }

    /// Whether the user may drag the handle.
    pub fn movable(&self) -> bool {
        self.flags.contains(HandleFlags::MOVABLE)
    }

    /// Allow or forbid dragging.
    pub fn set_movable(&mut self, movable: bool) {
        self.flags.set(HandleFlags::MOVABLE, movable);
    }

    /// Whether the handle is shown.
    pub fn visible(&self) -> bool {
        self.flags.contains(HandleFlags::VISIBLE)
    }

    /// Show or hide the handle.
    pub fn set_visible(&mut self, visible: bool) {
        self.flags.set(HandleFlags::VISIBLE, visible);
    }

    /// Whether the handle is mid-drag and snapped onto a port.
    pub fn glued(&self) -> bool {
        self.flags.contains(HandleFlags::GLUED)
    }

    /// Mark the handle as snapped (or not).
    pub fn set_glued(&mut self, glued: bool) {
        self.flags.set(HandleFlags::GLUED, glued);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags() {
        let flags = HandleFlags::default();
        assert!(flags.contains(HandleFlags::MOVABLE));
        assert!(flags.contains(HandleFlags::VISIBLE));
        assert!(!flags.contains(HandleFlags::CONNECTABLE));
        assert!(!flags.contains(HandleFlags::GLUED));
    }

    #[test]
    fn position_round_trip() {
        let mut solver = Solver::new();
        let handle = Handle::new(
            &mut solver,
            Point::new(10.0, 10.0),
            Strength::NORMAL,
            HandleFlags::default(),
        );
        assert_eq!(handle.point(&solver), Point::new(10.0, 10.0));
        handle.set_point(&mut solver, Point::new(20.0, 15.0));
        assert_eq!(handle.point(&solver), Point::new(20.0, 15.0));
    }

    #[test]
    fn flag_toggles() {
        let mut solver = Solver::new();
        let mut handle = Handle::new(
            &mut solver,
            Point::ZERO,
            Strength::NORMAL,
            HandleFlags::default(),
        );
        handle.set_connectable(true);
        assert!(handle.connectable());
        handle.set_movable(false);
        assert!(!handle.movable());
        handle.set_glued(true);
        assert!(handle.glued());
    }
}
