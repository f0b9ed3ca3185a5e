// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contexts handed to items during update and draw.
//!
//! The core never renders on its own; it calls back into a
//! [`Painter`] supplied by the embedding view. The contract is shaped
//! like a cairo context: a current transform that applies to path points
//! as they are added, `save`/`restore` bracketing, and a single `stroke`
//! flushing the accumulated path.

use kurbo::{Point, Rect};

/// The cairo-shaped drawing surface items render through.
///
/// Path points are transformed by the current transform at the moment
/// they are added; `restore` rewinds the transform but keeps the path.
pub trait Painter {
    /// Push the current transform.
    fn save(&mut self);
    /// Pop to the previously saved transform.
    fn restore(&mut self);
    /// Translate the current transform.
    fn translate(&mut self, tx: f64, ty: f64);
    /// Rotate the current transform.
    fn rotate(&mut self, radians: f64);
    /// Start a new sub-path at `point`.
    fn move_to(&mut self, point: Point);
    /// Extend the current sub-path with a line to `point`.
    fn line_to(&mut self, point: Point);
    /// Add a rectangle sub-path.
    fn rect(&mut self, rect: Rect);
    /// Set the stroke width for the next stroke.
    fn set_line_width(&mut self, width: f64);
    /// Stroke and clear the accumulated path.
    fn stroke(&mut self);
}

/// Read-only view state handed to [`draw`](crate::Item::draw).
pub struct DrawContext<'a> {
    /// The surface to render through.
    pub painter: &'a mut dyn Painter,
    /// The item is part of the selection.
    pub selected: bool,
    /// The item has focus.
    pub focused: bool,
    /// The pointer is over the item.
    pub hovered: bool,
    /// The item is the active drop target.
    pub dropzone: bool,
    /// Painting everything, not only the damaged region.
    pub draw_all: bool,
}

impl<'a> DrawContext<'a> {
    /// A context with all view-state flags off.
    pub fn new(painter: &'a mut dyn Painter) -> Self {
        Self {
            painter,
            selected: false,
            focused: false,
            hovered: false,
            dropzone: false,
            draw_all: false,
        }
    }
}

impl core::fmt::Debug for DrawContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DrawContext")
            .field("selected", &self.selected)
            .field("focused", &self.focused)
            .field("hovered", &self.hovered)
            .field("dropzone", &self.dropzone)
            .field("draw_all", &self.draw_all)
            .finish_non_exhaustive()
    }
}

/// Context handed to the update hooks.
///
/// Carries nothing today; it exists so the hook signatures stay stable
/// when per-update state (a measuring context, a style cache) is added.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct UpdateContext {}

impl UpdateContext {
    /// An empty update context.
    pub fn new() -> Self {
        Self::default()
    }
}

/// A painter that records nothing; useful in tests and for items that are
/// updated without being shown.
#[derive(Debug, Default)]
pub struct NullPainter;

impl Painter for NullPainter {
    fn save(&mut self) {}
    fn restore(&mut self) {}
    fn translate(&mut self, _tx: f64, _ty: f64) {}
    fn rotate(&mut self, _radians: f64) {}
    fn move_to(&mut self, _point: Point) {}
    fn line_to(&mut self, _point: Point) {}
    fn rect(&mut self, _rect: Rect) {}
    fn set_line_width(&mut self, _width: f64) {}
    fn stroke(&mut self) {}
}
