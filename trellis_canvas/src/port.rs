// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ports: the connectable regions of an item.
//!
//! A handle of one item connects to a port of another. Gluing projects a
//! candidate point onto the port, yielding the snapped point and its
//! distance; connecting builds the constraint that keeps the handle on the
//! port across both items' coordinate spaces.

use kurbo::Point;
use trellis_solver::constraints::{LineConstraint, PositionConstraint};
use trellis_solver::{Constraint, MatrixId, MatrixProjection, Position, Relation, Solver};

use crate::geometry::{distance_line_point, distance_point_point};

/// Identifier for a port, unique within one canvas.
///
/// Allocated by the connections registry, like
/// [`HandleId`](crate::HandleId).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PortId(pub(crate) u32);

/// A port defined by a line segment between two positions.
#[derive(Copy, Clone, Debug)]
pub struct LinePort {
    /// Segment start, in item coordinates.
    pub start: Position,
    /// Segment end, in item coordinates.
    pub end: Position,
}

impl LinePort {
    /// A port along the segment `start`–`end`.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// A port defined by a single point.
#[derive(Copy, Clone, Debug)]
pub struct PointPort {
    /// The connection point, in item coordinates.
    pub point: Position,
}

impl PointPort {
    /// A port at `point`.
    pub fn new(point: Position) -> Self {
        Self { point }
    }
}

/// A connectable region on an item.
#[derive(Copy, Clone, Debug)]
pub enum Port {
    /// Connect anywhere along a segment.
    Line(LinePort),
    /// Connect at a fixed point.
    Point(PointPort),
}

impl Port {
    /// Project `point` (in this port's item coordinates) onto the port.
    ///
    /// Returns the snapped point and its distance.
    pub fn glue(&self, solver: &Solver, point: Point) -> (Point, f64) {
        match self {
            Self::Line(port) => {
                let (d, closest) = distance_line_point(
                    port.start.point(solver),
                    port.end.point(solver),
                    point,
                );
                (closest, d)
            }
            Self::Point(port) => {
                let p = port.point.point(solver);
                (p, distance_point_point(p, point))
            }
        }
    }

    /// Build the constraint that glues `handle_pos` (owned by the item with
    /// item-to-canvas matrix `item_i2c`) to this port (owned by the item
    /// with matrix `glue_i2c`).
    ///
    /// Both sides are lifted into canvas space through matrix projections
    /// and coupled there; the result is a single grouped constraint ready
    /// for [`Connections::connect_item`](crate::Connections::connect_item).
    pub fn constraint(
        &self,
        solver: &mut Solver,
        item_i2c: MatrixId,
        handle_pos: Position,
        glue_i2c: MatrixId,
    ) -> Constraint {
        match self {
            Self::Line(port) => {
                let start = MatrixProjection::new(solver, port.start, glue_i2c);
                let end = MatrixProjection::new(solver, port.end, glue_i2c);
                let point = MatrixProjection::new(solver, handle_pos, item_i2c);
                let line = LineConstraint::new(
                    solver,
                    (start.projected(), end.projected()),
                    point.projected(),
                );
                Constraint::multi(vec![
                    Constraint::new(solver, Relation::Projection(start)),
                    Constraint::new(solver, Relation::Projection(end)),
                    Constraint::new(solver, Relation::Projection(point)),
                    Constraint::new(solver, Relation::Line(line)),
                ])
            }
            Self::Point(port) => {
                let origin = MatrixProjection::new(solver, port.point, glue_i2c);
                let point = MatrixProjection::new(solver, handle_pos, item_i2c);
                let position = PositionConstraint::new(origin.projected(), point.projected());
                Constraint::multi(vec![
                    Constraint::new(solver, Relation::Projection(origin)),
                    Constraint::new(solver, Relation::Projection(point)),
                    Constraint::new(solver, Relation::Position(position)),
                ])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_solver::Strength;

    #[test]
    fn line_port_glues_to_closest_point() {
        let mut solver = Solver::new();
        let start = Position::new(&mut solver, Point::ZERO, Strength::NORMAL);
        let end = Position::new(&mut solver, Point::new(100.0, 100.0), Strength::NORMAL);
        let port = Port::Line(LinePort::new(start, end));

        let (p, d) = port.glue(&solver, Point::new(50.0, 50.0));
        assert_eq!(p, Point::new(50.0, 50.0));
        assert_eq!(d, 0.0);

        let (p, d) = port.glue(&solver, Point::new(0.0, 10.0));
        assert_eq!(p, Point::new(5.0, 5.0));
        assert!((d - 7.0710678118654755).abs() < 1e-9);
    }

    #[test]
    fn point_port_glues_to_its_point() {
        let mut solver = Solver::new();
        let point = Position::new(&mut solver, Point::new(10.0, 10.0), Strength::NORMAL);
        let port = Port::Point(PointPort::new(point));
        let (p, d) = port.glue(&solver, Point::new(10.0, 0.0));
        assert_eq!(p, Point::new(10.0, 10.0));
        assert_eq!(d, 10.0);
    }

    #[test]
    fn line_port_constraint_keeps_handle_on_segment() {
        let mut solver = Solver::new();
        let item_i2c = solver.add_matrix(trellis_solver::Matrix::IDENTITY);
        let glue_i2c = solver.add_matrix(trellis_solver::Matrix::IDENTITY);

        let start = Position::new(&mut solver, Point::ZERO, Strength::VERY_STRONG);
        let end = Position::new(&mut solver, Point::new(10.0, 0.0), Strength::VERY_STRONG);
        let handle = Position::new(&mut solver, Point::new(4.0, 3.0), Strength::NORMAL);

        let port = Port::Line(LinePort::new(start, end));
        let constraint = port.constraint(&mut solver, item_i2c, handle, glue_i2c);
        solver.add_constraint(constraint);
        solver.solve().unwrap();

        // The handle was pulled onto the segment at its captured ratio.
        let p = handle.point(&solver);
        assert!((p.y - 0.0).abs() < 1e-6, "handle off the segment: {p:?}");
        assert!((p.x - 4.0).abs() < 1e-6);
    }
}
