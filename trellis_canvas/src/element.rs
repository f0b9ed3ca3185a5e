// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The rectangular element item.

use kurbo::{Point, Rect};
use trellis_solver::constraints::{self, Term};
use trellis_solver::{Constraint, Solver, Strength, VariableId};

use crate::connections::Connections;
use crate::draw::DrawContext;
use crate::geometry::distance_rectangle_point;
use crate::handle::{Handle, HandleFlags, HandleId};
use crate::item::ItemBase;
use crate::port::{LinePort, Port};

/// Index of the north-west handle.
pub const NW: usize = 0;
/// Index of the north-east handle.
pub const NE: usize = 1;
/// Index of the south-east handle.
pub const SE: usize = 2;
/// Index of the south-west handle.
pub const SW: usize = 3;

/// A rectangular item with a handle on each corner:
///
/// ```text
/// NW +---+ NE
///    |   |
/// SW +---+ SE
/// ```
///
/// The four edges double as line ports (top, right, bottom, left).
/// Internal constraints keep the corners rectangular and enforce a
/// minimum width and height; they are registered with the canvas when the
/// element is added.
#[derive(Debug)]
pub struct Element {
    base: ItemBase,
    min_width: VariableId,
    min_height: VariableId,
    pending: Vec<Constraint>,
}

impl Element {
    /// Create an element of the given size.
    ///
    /// Handles are `VERY_STRONG`, the minimum size variables `REQUIRED`
    /// (both default to 10).
    pub fn new(connections: &mut Connections, width: f64, height: f64) -> Self {
        let mut base = ItemBase::new(connections);
        for _ in 0..4 {
            let handle = Handle::new(
                connections.solver_mut(),
                Point::ZERO,
                Strength::VERY_STRONG,
                HandleFlags::default(),
            );
            base.add_handle(connections, handle);
        }
        let nw = base.handles()[NW].1.pos();
        let ne = base.handles()[NE].1.pos();
        let se = base.handles()[SE].1.pos();
        let sw = base.handles()[SW].1.pos();

        // The edges are the default connection ports.
        base.add_port(connections, Port::Line(LinePort::new(nw, ne)));
        base.add_port(connections, Port::Line(LinePort::new(ne, se)));
        base.add_port(connections, Port::Line(LinePort::new(se, sw)));
        base.add_port(connections, Port::Line(LinePort::new(sw, nw)));

        let solver = connections.solver_mut();
        let min_width = solver.add_variable(10.0, Strength::REQUIRED);
        let min_height = solver.add_variable(10.0, Strength::REQUIRED);

        let pending = vec![
            constraints::horizontal(solver, nw, ne),
            constraints::horizontal(solver, sw, se),
            constraints::vertical(solver, nw, sw),
            constraints::vertical(solver, ne, se),
            constraints::left_of(solver, nw, se, Term::Variable(min_width)),
            constraints::above(solver, nw, se, Term::Variable(min_height)),
        ];

        let element = Self {
            base,
            min_width,
            min_height,
            pending,
        };
        element.set_width(solver, width);
        element.set_height(solver, height);
        element
    }

    /// The composed base state.
    pub fn base(&self) -> &ItemBase {
        &self.base
    }

    /// The composed base state, mutably.
    pub fn base_mut(&mut self) -> &mut ItemBase {
        &mut self.base
    }

    /// Id of a corner handle (`NW`, `NE`, `SE`, `SW`).
    pub fn handle_id(&self, corner: usize) -> HandleId {
        self.base.handles()[corner].0
    }

    /// A corner handle (`NW`, `NE`, `SE`, `SW`).
    pub fn handle(&self, corner: usize) -> &Handle {
        &self.base.handles()[corner].1
    }

    /// Width, the distance between the west and east handles.
    pub fn width(&self, solver: &Solver) -> f64 {
        let nw = self.handle(NW).pos();
        let se = self.handle(SE).pos();
        solver.value(se.x) - solver.value(nw.x)
    }

    /// Resize horizontally by moving the south-east handle.
    pub fn set_width(&self, solver: &mut Solver, width: f64) {
        let nw = self.handle(NW).pos();
        let se = self.handle(SE).pos();
        let x = solver.value(nw.x) + width;
        solver.set_value(se.x, x);
    }

    /// Height, the distance between the north and south handles.
    pub fn height(&self, solver: &Solver) -> f64 {
        let nw = self.handle(NW).pos();
        let se = self.handle(SE).pos();
        solver.value(se.y) - solver.value(nw.y)
    }

    /// Resize vertically by moving the south-east handle.
    pub fn set_height(&self, solver: &mut Solver, height: f64) {
        let nw = self.handle(NW).pos();
        let se = self.handle(SE).pos();
        let y = solver.value(nw.y) + height;
        solver.set_value(se.y, y);
    }

    /// The minimum width the solver will maintain.
    pub fn min_width(&self, solver: &Solver) -> f64 {
        solver.value(self.min_width)
    }

    /// Change the minimum width.
    pub fn set_min_width(&self, solver: &mut Solver, min_width: f64) {
        solver.set_value(self.min_width, min_width);
    }

    /// The minimum height the solver will maintain.
    pub fn min_height(&self, solver: &Solver) -> f64 {
        solver.value(self.min_height)
    }

    /// Change the minimum height.
    pub fn set_min_height(&self, solver: &mut Solver, min_height: f64) {
        solver.set_value(self.min_height, min_height);
    }

    /// Distance from `point` to the element's rectangle.
    pub fn point(&self, solver: &Solver, point: Point) -> f64 {
        let nw = self.handle(NW).pos().point(solver);
        let se = self.handle(SE).pos().point(solver);
        distance_rectangle_point(Rect::new(nw.x, nw.y, se.x, se.y), point)
    }

    /// Elements have no intrinsic rendering; concrete boxes draw in their
    /// own item types.
    pub fn draw(&self, _solver: &Solver, _context: &mut DrawContext<'_>) {}

    pub(crate) fn take_pending_constraints(&mut self) -> Vec<Constraint> {
        core::mem::take(&mut self.pending)
    }

    pub(crate) fn release(&self, solver: &mut Solver) {
        self.base.release(solver);
        solver.remove_variable(self.min_width);
        solver.remove_variable(self.min_height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_accessors_drive_the_south_east_handle() {
        let mut connections = Connections::new();
        let element = Element::new(&mut connections, 20.0, 10.0);
        let solver = connections.solver();
        assert_eq!(element.width(solver), 20.0);
        assert_eq!(element.height(solver), 10.0);
        assert_eq!(
            element.handle(SE).pos().point(solver),
            Point::new(20.0, 10.0)
        );

        let solver = connections.solver_mut();
        element.set_width(solver, 40.0);
        assert_eq!(element.width(solver), 40.0);
    }

    #[test]
    fn four_edge_ports_in_order() {
        let mut connections = Connections::new();
        let element = Element::new(&mut connections, 10.0, 10.0);
        assert_eq!(element.base().ports().len(), 4);
        // Top port spans NW..NE.
        let (_, top) = &element.base().ports()[0];
        let Port::Line(top) = top else {
            panic!("edge ports are line ports");
        };
        assert_eq!(top.start, element.handle(NW).pos());
        assert_eq!(top.end, element.handle(NE).pos());
    }

    #[test]
    fn point_measures_rectangle_distance() {
        let mut connections = Connections::new();
        let element = Element::new(&mut connections, 10.0, 10.0);
        // Corner handles start aligned; only NW and SE are authoritative
        // before the first solve.
        let d = element.point(connections.solver(), Point::new(20.0, 10.0));
        assert_eq!(d, 10.0);
    }
}
