// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=trellis_canvas --heading-base-level=0

//! Trellis Canvas: a retained-mode scene for 2D diagramming.
//!
//! The canvas holds [`Item`]s — boxes, lines, custom shapes — in a
//! depth-first [`Tree`], each with a local affine transform. Items carry
//! [`Handle`]s (grabbable anchors) and [`Port`]s (connectable regions);
//! connecting a line's handle to a box's port installs a constraint that
//! keeps the two glued while either side moves, tracked by the
//! [`Connections`] registry which owns the
//! [`Solver`](trellis_solver::Solver).
//!
//! ## The update cycle
//!
//! Mutations mark items dirty; [`Canvas::update_now`] (or the queued
//! [`Canvas::update`]) then runs pre-update hooks deepest-first,
//! recomposes the item-to-canvas matrices, solves the constraints, and
//! runs post-update hooks. Registered [`View`]s are notified of dirty and
//! removed items so they can re-index bounding boxes and repaint.
//!
//! ## Example: two boxes and a line
//!
//! ```
//! use trellis_canvas::{Canvas, Element, Item, Line};
//!
//! let mut canvas = Canvas::new();
//! let a = {
//!     let element = Element::new(canvas.connections_mut(), 40.0, 40.0);
//!     canvas.add(Item::Element(element), None, None)
//! };
//! let line = {
//!     let line = Line::new(canvas.connections_mut());
//!     canvas.add(Item::Line(line), None, None)
//! };
//! canvas.update();
//!
//! // Glue the line's head onto the box's top edge.
//! let head = canvas.item(line).as_line().unwrap().head().0;
//! let top = canvas.item(a).ports()[0].0;
//! canvas.connect(line, head, a, top).unwrap();
//! canvas.update();
//! ```
//!
//! Rendering stays outside: items draw through the [`Painter`] contract
//! and the core never touches a surface itself.

mod canvas;
mod connections;
mod draw;
mod element;
pub mod geometry;
mod handle;
mod item;
mod line;
mod port;
mod segment;
mod selection;
mod tree;

pub use canvas::{Canvas, CanvasEvent, View, ViewId};
pub use connections::{
    ConnectError, Connection, ConnectionEvent, Connections, DisconnectCallback,
};
pub use draw::{DrawContext, NullPainter, Painter, UpdateContext};
pub use element::{Element, NE, NW, SE, SW};
pub use handle::{Handle, HandleFlags, HandleId};
pub use item::{CustomItem, Item, ItemBase, ItemId};
pub use line::{Line, LineError};
pub use port::{LinePort, PointPort, Port, PortId};
pub use segment::SegmentError;
pub use selection::Selection;
pub use tree::Tree;
