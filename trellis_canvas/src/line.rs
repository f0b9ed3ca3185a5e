// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The polyline item.

use kurbo::Point;
use trellis_solver::{ConstraintId, Solver, Strength};

use crate::connections::Connections;
use crate::draw::DrawContext;
use crate::geometry::distance_line_point;
use crate::handle::{Handle, HandleFlags, HandleId};
use crate::item::ItemBase;
use crate::port::{LinePort, Port};

/// Errors from line-specific operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    /// Orthogonal mode needs room for at least two bends.
    #[error("an orthogonal line needs at least three handles")]
    TooFewHandles,
    /// The handle is neither the head nor the tail.
    #[error("handle is not an end handle")]
    NotAnEndHandle,
    /// The item the operation was aimed at is not a line.
    #[error("item is not a line")]
    NotALine,
}

/// A polyline of two or more handles, with a port per segment.
///
/// Both end handles are connectable. In orthogonal mode every segment is
/// kept axis-aligned by alternating equality constraints; `horizontal`
/// flips which axis the first segment follows. Orthogonality and segment
/// editing go through the canvas
/// ([`set_orthogonal`](crate::Canvas::set_orthogonal),
/// [`split_segment`](crate::Canvas::split_segment)) because they touch the
/// connections registry.
#[derive(Debug)]
pub struct Line {
    base: ItemBase,
    line_width: f64,
    fuzziness: f64,
    pub(crate) horizontal: bool,
    pub(crate) orthogonal_constraints: Vec<ConstraintId>,
    head_angle: f64,
    tail_angle: f64,
}

impl Line {
    /// Create a line from (0, 0) to (10, 10).
    pub fn new(connections: &mut Connections) -> Self {
        let mut base = ItemBase::new(connections);
        let flags = HandleFlags::default() | HandleFlags::CONNECTABLE;
        let head = Handle::new(connections.solver_mut(), Point::ZERO, Strength::NORMAL, flags);
        base.add_handle(connections, head);
        let tail = Handle::new(
            connections.solver_mut(),
            Point::new(10.0, 10.0),
            Strength::NORMAL,
            flags,
        );
        base.add_handle(connections, tail);
        let start = base.handles()[0].1.pos();
        let end = base.handles()[1].1.pos();
        base.add_port(connections, Port::Line(LinePort::new(start, end)));

        Self {
            base,
            line_width: 2.0,
            fuzziness: 0.0,
            horizontal: false,
            orthogonal_constraints: Vec::new(),
            head_angle: 0.0,
            tail_angle: 0.0,
        }
    }

    /// The composed base state.
    pub fn base(&self) -> &ItemBase {
        &self.base
    }

    /// The composed base state, mutably.
    pub fn base_mut(&mut self) -> &mut ItemBase {
        &mut self.base
    }

    /// The first handle.
    pub fn head(&self) -> (HandleId, &Handle) {
        let (id, handle) = self.base.handles().first().expect("a line has two handles");
        (*id, handle)
    }

    /// The last handle.
    pub fn tail(&self) -> (HandleId, &Handle) {
        let (id, handle) = self.base.handles().last().expect("a line has two handles");
        (*id, handle)
    }

    /// Given one end handle, the other end.
    pub fn opposite(&self, handle: HandleId) -> Result<HandleId, LineError> {
        let handles = self.base.handles();
        let (first, _) = handles.first().expect("a line has two handles");
        let (last, _) = handles.last().expect("a line has two handles");
        if handle == *first {
            Ok(*last)
        } else if handle == *last {
            Ok(*first)
        } else {
            Err(LineError::NotAnEndHandle)
        }
    }

    /// Stroke width used by [`Line::draw`].
    pub fn line_width(&self) -> f64 {
        self.line_width
    }

    /// Change the stroke width.
    pub fn set_line_width(&mut self, line_width: f64) {
        self.line_width = line_width;
    }

    /// Extra pick margin around the line.
    pub fn fuzziness(&self) -> f64 {
        self.fuzziness
    }

    /// Change the pick margin.
    pub fn set_fuzziness(&mut self, fuzziness: f64) {
        self.fuzziness = fuzziness;
    }

    /// Whether orthogonal constraints are active.
    pub fn orthogonal(&self) -> bool {
        !self.orthogonal_constraints.is_empty()
    }

    /// Whether the first segment runs horizontally in orthogonal mode.
    pub fn horizontal(&self) -> bool {
        self.horizontal
    }

    /// Angle of the first segment, for arrowhead rendering. Updated in
    /// the post-update step.
    pub fn head_angle(&self) -> f64 {
        self.head_angle
    }

    /// Angle of the last segment, for arrowhead rendering.
    pub fn tail_angle(&self) -> f64 {
        self.tail_angle
    }

    /// Distance from `point` to the nearest segment, reduced by the
    /// fuzziness margin.
    pub fn point(&self, solver: &Solver, point: Point) -> f64 {
        let handles = self.base.handles();
        let mut best = f64::INFINITY;
        for pair in handles.windows(2) {
            let start = pair[0].1.pos().point(solver);
            let end = pair[1].1.pos().point(solver);
            let (d, _) = distance_line_point(start, end, point);
            best = best.min(d);
        }
        (best - self.fuzziness).max(0.0)
    }

    pub(crate) fn post_update(&mut self, solver: &Solver) {
        let handles = self.base.handles();
        let p0 = handles[0].1.pos().point(solver);
        let p1 = handles[1].1.pos().point(solver);
        self.head_angle = (p1.y - p0.y).atan2(p1.x - p0.x);
        let last = handles[handles.len() - 1].1.pos().point(solver);
        let prev = handles[handles.len() - 2].1.pos().point(solver);
        self.tail_angle = (prev.y - last.y).atan2(prev.x - last.x);
    }

    /// Default head decoration: start the path at the head.
    fn draw_head(&self, context: &mut DrawContext<'_>) {
        context.painter.move_to(Point::ZERO);
    }

    /// Default tail decoration: finish the path at the tail.
    fn draw_tail(&self, context: &mut DrawContext<'_>) {
        context.painter.line_to(Point::ZERO);
    }

    /// Stroke the polyline, with the head and tail drawn in a coordinate
    /// frame aligned to their segment so decorations need no angle math.
    pub fn draw(&self, solver: &Solver, context: &mut DrawContext<'_>) {
        context.painter.set_line_width(self.line_width);

        let handles = self.base.handles();
        let head = handles[0].1.pos().point(solver);
        context.painter.save();
        context.painter.translate(head.x, head.y);
        context.painter.rotate(self.head_angle);
        self.draw_head(context);
        context.painter.restore();

        for (_, handle) in &handles[1..handles.len() - 1] {
            context.painter.line_to(handle.pos().point(solver));
        }

        let tail = handles[handles.len() - 1].1.pos().point(solver);
        context.painter.save();
        context.painter.translate(tail.x, tail.y);
        context.painter.rotate(self.tail_angle);
        self.draw_tail(context);
        context.painter.restore();

        context.painter.stroke();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_line_shape() {
        let mut connections = Connections::new();
        let line = Line::new(&mut connections);
        let solver = connections.solver();
        assert_eq!(line.base().handles().len(), 2);
        assert_eq!(line.base().ports().len(), 1);
        assert_eq!(line.head().1.point(solver), Point::ZERO);
        assert_eq!(line.tail().1.point(solver), Point::new(10.0, 10.0));
        assert!(line.head().1.connectable());
        assert!(line.tail().1.connectable());
        assert!(!line.orthogonal());
        assert_eq!(line.line_width(), 2.0);
    }

    #[test]
    fn opposite_maps_ends() {
        let mut connections = Connections::new();
        let line = Line::new(&mut connections);
        let (head, _) = line.head();
        let (tail, _) = line.tail();
        assert_eq!(line.opposite(head), Ok(tail));
        assert_eq!(line.opposite(tail), Ok(head));
    }

    #[test]
    fn point_accounts_for_fuzziness() {
        let mut connections = Connections::new();
        let mut line = Line::new(&mut connections);
        line.tail()
            .1
            .set_point(connections.solver_mut(), Point::new(10.0, 0.0));
        let d = line.point(connections.solver(), Point::new(5.0, 2.0));
        assert!((d - 2.0).abs() < 1e-9);

        line.set_fuzziness(1.5);
        let d = line.point(connections.solver(), Point::new(5.0, 2.0));
        assert!((d - 0.5).abs() < 1e-9);

        line.set_fuzziness(3.0);
        assert_eq!(line.point(connections.solver(), Point::new(5.0, 2.0)), 0.0);
    }

    #[test]
    fn post_update_computes_segment_angles() {
        let mut connections = Connections::new();
        let mut line = Line::new(&mut connections);
        line.tail()
            .1
            .set_point(connections.solver_mut(), Point::new(10.0, 0.0));
        line.post_update(connections.solver());
        assert_eq!(line.head_angle(), 0.0);
        // The tail angle looks back along the last segment.
        assert!((line.tail_angle() - core::f64::consts::PI).abs() < 1e-9);
    }
}
