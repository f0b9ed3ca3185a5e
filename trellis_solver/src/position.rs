// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinate pairs and matrix projections.
//!
//! A [`Position`] is a pair of solver variables sharing a strength. A
//! [`MatrixProjection`] is the constraint that keeps a projected position
//! equal to a source position pushed through a matrix; it is how item-local
//! coordinates are compared across coordinate spaces.

use kurbo::Point;

use crate::matrix::MatrixId;
use crate::solver::Solver;
use crate::variable::{Strength, VariableId};

/// A point made of two solver variables.
///
/// Positions are cheap copyable id pairs; the coordinates live in the
/// solver. Both variables share the strength given at construction.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Position {
    /// The x coordinate variable.
    pub x: VariableId,
    /// The y coordinate variable.
    pub y: VariableId,
}

impl Position {
    /// Allocate a position at `point` with the given strength.
    pub fn new(solver: &mut Solver, point: Point, strength: Strength) -> Self {
        Self {
            x: solver.add_variable(point.x, strength),
            y: solver.add_variable(point.y, strength),
        }
    }

    /// The current coordinates.
    pub fn point(&self, solver: &Solver) -> Point {
        Point::new(solver.value(self.x), solver.value(self.y))
    }

    /// Move the position to `point`.
    pub fn set(&self, solver: &mut Solver, point: Point) {
        solver.set_value(self.x, point.x);
        solver.set_value(self.y, point.y);
    }

    /// The shared strength of the two coordinates.
    pub fn strength(&self, solver: &Solver) -> Strength {
        solver.strength(self.x)
    }

    /// Whether `var` is one of this position's coordinates.
    pub fn contains(&self, var: VariableId) -> bool {
        self.x == var || self.y == var
    }

    /// Free both coordinate variables.
    ///
    /// Constraints referencing the position must be removed first.
    pub fn release(self, solver: &mut Solver) {
        solver.remove_variable(self.x);
        solver.remove_variable(self.y);
    }
}

/// Keeps a projected position equal to `matrix · source`.
///
/// The projection is bidirectional: moving the source re-projects, moving
/// the projection writes back through the inverse matrix, and a matrix
/// change re-projects from the source. Which direction a solve takes is
/// decided by which side was disturbed most recently.
#[derive(Copy, Clone, Debug)]
pub struct MatrixProjection {
    source: Position,
    projected: Position,
    matrix: MatrixId,
}

impl MatrixProjection {
    /// Create a projection of `source` through `matrix`.
    ///
    /// The projected position is allocated with the source's strength and
    /// initialized to the projection of the source's current coordinates.
    pub fn new(solver: &mut Solver, source: Position, matrix: MatrixId) -> Self {
        let strength = source.strength(solver);
        let projected = Position::new(solver, Point::ZERO, strength);
        let projection = Self {
            source,
            projected,
            matrix,
        };
        let initial = solver.matrix(matrix).transform_point(source.point(solver));
        projected.set(solver, initial);
        projection
    }

    /// The source position (in the matrix's source space).
    pub fn source(&self) -> Position {
        self.source
    }

    /// The projected position (in the matrix's target space).
    pub fn projected(&self) -> Position {
        self.projected
    }

    /// The matrix the projection goes through.
    pub fn matrix(&self) -> MatrixId {
        self.matrix
    }

    pub(crate) fn solve_for(&self, var: VariableId, solver: &mut Solver) {
        if self.source.contains(var) {
            let p = solver
                .matrix(self.matrix)
                .inverse()
                .transform_point(self.projected.point(solver));
            self.source.set(solver, p);
        } else {
            let p = solver
                .matrix(self.matrix)
                .transform_point(self.source.point(solver));
            self.projected.set(solver, p);
        }
    }

    pub(crate) fn for_each_variable(&self, f: &mut dyn FnMut(VariableId)) {
        // Order matters: the projected pair comes first so a fresh
        // projection resolves towards the projected side.
        f(self.projected.x);
        f(self.projected.y);
        f(self.source.x);
        f(self.source.y);
    }
}
