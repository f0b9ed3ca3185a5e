// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The concrete constraint library.
//!
//! Every relation here updates the variable the solver hands it (the
//! weakest) so the relation holds again. Factory helpers at the bottom
//! build the common item-internal constraints between positions.

use crate::constraint::{Constraint, Relation};
use crate::position::Position;
use crate::solver::Solver;
use crate::variable::VariableId;

/// Iteration cap for the equation solver.
const ITER_LIMIT: usize = 1000;

/// Residual tolerance for the equation solver.
const TOLERANCE: f64 = 1e-7;

/// A constant or a variable, used for the `delta` slots of
/// [`EqualsConstraint`] and [`LessThanConstraint`].
#[derive(Copy, Clone, Debug)]
pub enum Term {
    /// A fixed offset.
    Value(f64),
    /// An offset read from (and possibly solved into) a variable.
    Variable(VariableId),
}

impl Term {
    /// The current numeric value of the term.
    pub fn value(&self, solver: &Solver) -> f64 {
        match *self {
            Self::Value(v) => v,
            Self::Variable(var) => solver.value(var),
        }
    }

    /// The variable behind the term, if any.
    pub fn variable(&self) -> Option<VariableId> {
        match *self {
            Self::Value(_) => None,
            Self::Variable(var) => Some(var),
        }
    }
}

impl From<f64> for Term {
    fn from(v: f64) -> Self {
        Self::Value(v)
    }
}

impl From<VariableId> for Term {
    fn from(var: VariableId) -> Self {
        Self::Variable(var)
    }
}

/// `a + delta = b`.
#[derive(Copy, Clone, Debug)]
pub struct EqualsConstraint {
    /// Left-hand side.
    pub a: VariableId,
    /// Right-hand side.
    pub b: VariableId,
    /// Offset between the two.
    pub delta: Term,
}

impl EqualsConstraint {
    /// `a = b` with no offset.
    pub fn new(a: VariableId, b: VariableId) -> Self {
        Self {
            a,
            b,
            delta: Term::Value(0.0),
        }
    }

    /// `a + delta = b`.
    pub fn with_delta(a: VariableId, b: VariableId, delta: impl Into<Term>) -> Self {
        Self {
            a,
            b,
            delta: delta.into(),
        }
    }

    pub(crate) fn solve_for(&self, var: VariableId, solver: &mut Solver) {
        if var == self.a {
            solver.set_value(self.a, solver.value(self.b) - self.delta.value(solver));
        } else if var == self.b {
            solver.set_value(self.b, solver.value(self.a) + self.delta.value(solver));
        } else if self.delta.variable() == Some(var) {
            solver.set_value(var, solver.value(self.b) - solver.value(self.a));
        }
    }

    pub(crate) fn for_each_variable(&self, f: &mut dyn FnMut(VariableId)) {
        f(self.a);
        f(self.b);
        if let Some(var) = self.delta.variable() {
            f(var);
        }
    }
}

/// Keeps `smaller <= bigger - delta`.
///
/// Inactive while the relation already holds; when violated, the variable
/// that was *not* recently moved is pulled to restore it.
#[derive(Copy, Clone, Debug)]
pub struct LessThanConstraint {
    /// The side kept smaller.
    pub smaller: VariableId,
    /// The side kept bigger.
    pub bigger: VariableId,
    /// Minimal gap between the two.
    pub delta: Term,
}

impl LessThanConstraint {
    /// Keep `smaller` below `bigger` with a minimal gap of `delta`.
    pub fn new(smaller: VariableId, bigger: VariableId, delta: impl Into<Term>) -> Self {
        Self {
            smaller,
            bigger,
            delta: delta.into(),
        }
    }

    pub(crate) fn solve_for(&self, var: VariableId, solver: &mut Solver) {
        let delta = self.delta.value(solver);
        if solver.value(self.smaller) > solver.value(self.bigger) - delta {
            if var == self.smaller {
                solver.set_value(self.bigger, solver.value(self.smaller) + delta);
            } else if var == self.bigger {
                solver.set_value(self.smaller, solver.value(self.bigger) - delta);
            } else if self.delta.variable() == Some(var) {
                solver.set_value(var, solver.value(self.bigger) - solver.value(self.smaller));
            }
        }
    }

    pub(crate) fn for_each_variable(&self, f: &mut dyn FnMut(VariableId)) {
        f(self.smaller);
        f(self.bigger);
        if let Some(var) = self.delta.variable() {
            f(var);
        }
    }
}

/// `center = (a + b) / 2`.
#[derive(Copy, Clone, Debug)]
pub struct CenterConstraint {
    /// One end.
    pub a: VariableId,
    /// The other end.
    pub b: VariableId,
    /// The midpoint, updated on solve.
    pub center: VariableId,
}

impl CenterConstraint {
    /// Keep `center` midway between `a` and `b`.
    pub fn new(a: VariableId, b: VariableId, center: VariableId) -> Self {
        Self { a, b, center }
    }

    pub(crate) fn solve_for(&self, _var: VariableId, solver: &mut Solver) {
        let v = (solver.value(self.a) + solver.value(self.b)) / 2.0;
        solver.set_value(self.center, v);
    }

    pub(crate) fn for_each_variable(&self, f: &mut dyn FnMut(VariableId)) {
        f(self.a);
        f(self.b);
        f(self.center);
    }
}

/// Keeps a point on a line at the proportional spot it was captured at.
///
/// The ratio is computed from the axis that is not degenerate at
/// construction time and never changes afterwards; a fully degenerate line
/// uses ratio 0.
#[derive(Copy, Clone, Debug)]
pub struct LineConstraint {
    line: (Position, Position),
    point: Position,
    ratio: f64,
}

impl LineConstraint {
    /// Capture the current ratio of `point` along `line`.
    pub fn new(solver: &Solver, line: (Position, Position), point: Position) -> Self {
        let (start, end) = (line.0.point(solver), line.1.point(solver));
        let p = point.point(solver);
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let ratio = if dx != 0.0 {
            (p.x - start.x) / dx
        } else if dy != 0.0 {
            (p.y - start.y) / dy
        } else {
            0.0
        };
        Self { line, point, ratio }
    }

    /// The captured ratio along the line.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub(crate) fn solve_for(&self, _var: VariableId, solver: &mut Solver) {
        let (start, end) = (self.line.0.point(solver), self.line.1.point(solver));
        let x = start.x + (end.x - start.x) * self.ratio;
        let y = start.y + (end.y - start.y) * self.ratio;
        solver.set_value(self.point.x, x);
        solver.set_value(self.point.y, y);
    }

    pub(crate) fn for_each_variable(&self, f: &mut dyn FnMut(VariableId)) {
        f(self.line.0.x);
        f(self.line.0.y);
        f(self.line.1.x);
        f(self.line.1.y);
        f(self.point.x);
        f(self.point.y);
    }
}

/// Keeps a point at a fixed fraction of a line, offset along the normal.
#[derive(Copy, Clone, Debug)]
pub struct LineAlignConstraint {
    line: (Position, Position),
    point: Position,
    /// 0 is the line start, 1 the end, 0.5 the middle.
    align: f64,
    /// Padding along the segment direction.
    delta: f64,
}

impl LineAlignConstraint {
    /// Keep `point` at fraction `align` of `line`, padded by `delta`.
    pub fn new(line: (Position, Position), point: Position, align: f64, delta: f64) -> Self {
        Self {
            line,
            point,
            align,
            delta,
        }
    }

    pub(crate) fn solve_for(&self, _var: VariableId, solver: &mut Solver) {
        let (start, end) = (self.line.0.point(solver), self.line.1.point(solver));
        let angle = (end.y - start.y).atan2(end.x - start.x);
        let x = start.x + (end.x - start.x) * self.align + self.delta * angle.cos();
        let y = start.y + (end.y - start.y) * self.align + self.delta * angle.sin();
        solver.set_value(self.point.x, x);
        solver.set_value(self.point.y, y);
    }

    pub(crate) fn for_each_variable(&self, f: &mut dyn FnMut(VariableId)) {
        f(self.line.0.x);
        f(self.line.0.y);
        f(self.line.1.x);
        f(self.line.1.y);
        f(self.point.x);
        f(self.point.y);
    }
}

/// Pins `point` to `origin`.
#[derive(Copy, Clone, Debug)]
pub struct PositionConstraint {
    origin: Position,
    point: Position,
}

impl PositionConstraint {
    /// Keep `point` at `origin`.
    pub fn new(origin: Position, point: Position) -> Self {
        Self { origin, point }
    }

    pub(crate) fn solve_for(&self, _var: VariableId, solver: &mut Solver) {
        let origin = self.origin.point(solver);
        solver.set_value(self.point.x, origin.x);
        solver.set_value(self.point.y, origin.y);
    }

    pub(crate) fn for_each_variable(&self, f: &mut dyn FnMut(VariableId)) {
        f(self.origin.x);
        f(self.origin.y);
        f(self.point.x);
        f(self.point.y);
    }
}

/// Solves `f(vars) = 0` for the weakest variable with a secant iteration.
///
/// Convergence failures (iteration cap, zero slope) are logged and leave
/// the variable at the last iterate.
pub struct EquationConstraint {
    f: Box<dyn Fn(&[f64]) -> f64>,
    vars: Vec<VariableId>,
}

impl EquationConstraint {
    /// Build an equation over `vars`; `f` receives the values in the same
    /// order.
    pub fn new(f: impl Fn(&[f64]) -> f64 + 'static, vars: Vec<VariableId>) -> Self {
        Self {
            f: Box::new(f),
            vars,
        }
    }

    pub(crate) fn solve_for(&self, var: VariableId, solver: &mut Solver) {
        let Some(idx) = self.vars.iter().position(|&v| v == var) else {
            return;
        };
        let mut args: Vec<f64> = self.vars.iter().map(|&v| solver.value(v)).collect();
        let root = self.find_root(&mut args, idx);
        if solver.value(var) != root {
            solver.set_value(var, root);
        }
    }

    fn find_root(&self, args: &mut [f64], idx: usize) -> f64 {
        let current = args[idx];
        let mut x0 = if current != 0.0 { current } else { 1.0 };
        let mut x1 = x0 * 1.1;
        let eval = |x: f64, args: &mut [f64]| {
            args[idx] = x;
            (self.f)(args)
        };
        let mut fx0 = eval(x0, args);
        for _ in 0..ITER_LIMIT {
            let fx1 = eval(x1, args);
            if fx1.abs() <= TOLERANCE || x1 == x0 {
                return x1;
            }
            let slope = (fx1 - fx0) / (x1 - x0);
            if slope == 0.0 {
                log::warn!("zero slope while solving equation; not close enough to a root");
                return x1;
            }
            let x2 = x1 - fx1 / slope;
            x0 = x1;
            fx0 = fx1;
            x1 = x2;
        }
        log::warn!("equation failed to converge; exceeded iteration limit");
        x1
    }

    pub(crate) fn for_each_variable(&self, f: &mut dyn FnMut(VariableId)) {
        for &var in &self.vars {
            f(var);
        }
    }
}

impl core::fmt::Debug for EquationConstraint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EquationConstraint")
            .field("vars", &self.vars)
            .finish_non_exhaustive()
    }
}

/// Keeps `v` at a fixed proportion between the two band variables.
#[derive(Copy, Clone, Debug)]
pub struct BalanceConstraint {
    band: (VariableId, VariableId),
    v: VariableId,
    balance: f64,
}

impl BalanceConstraint {
    /// Balance `v` within `band`; when `balance` is `None` the current
    /// proportion is captured.
    pub fn new(
        solver: &Solver,
        band: (VariableId, VariableId),
        v: VariableId,
        balance: Option<f64>,
    ) -> Self {
        let balance = balance.unwrap_or_else(|| {
            let width = solver.value(band.1) - solver.value(band.0);
            if width != 0.0 {
                (solver.value(v) - solver.value(band.0)) / width
            } else {
                0.0
            }
        });
        Self { band, v, balance }
    }

    /// The captured proportion.
    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub(crate) fn solve_for(&self, var: VariableId, solver: &mut Solver) {
        let width = solver.value(self.band.1) - solver.value(self.band.0);
        let value = solver.value(self.band.0) + width * self.balance;
        solver.set_value(var, value);
    }

    pub(crate) fn for_each_variable(&self, f: &mut dyn FnMut(VariableId)) {
        f(self.band.0);
        f(self.band.1);
        f(self.v);
    }
}

/// Keep `p1` and `p2` horizontally aligned (equal y).
pub fn horizontal(solver: &Solver, p1: Position, p2: Position) -> Constraint {
    Constraint::new(solver, Relation::Equals(EqualsConstraint::new(p1.y, p2.y)))
}

/// Keep `p1` and `p2` vertically aligned (equal x).
pub fn vertical(solver: &Solver, p1: Position, p2: Position) -> Constraint {
    Constraint::new(solver, Relation::Equals(EqualsConstraint::new(p1.x, p2.x)))
}

/// Keep `p1` at least `delta` to the left of `p2`.
pub fn left_of(solver: &Solver, p1: Position, p2: Position, delta: impl Into<Term>) -> Constraint {
    Constraint::new(
        solver,
        Relation::LessThan(LessThanConstraint::new(p1.x, p2.x, delta)),
    )
}

/// Keep `p1` at least `delta` above `p2`.
pub fn above(solver: &Solver, p1: Position, p2: Position, delta: impl Into<Term>) -> Constraint {
    Constraint::new(
        solver,
        Relation::LessThan(LessThanConstraint::new(p1.y, p2.y, delta)),
    )
}

/// Keep `point` on `line` at its current proportional spot.
pub fn on_line(solver: &Solver, line: (Position, Position), point: Position) -> Constraint {
    Constraint::new(
        solver,
        Relation::Line(LineConstraint::new(solver, line, point)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{EPSILON, Strength};
    use kurbo::Point;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < EPSILON, "{a} != {b}");
    }

    #[test]
    fn equals_propagates_towards_weakest() {
        let mut solver = Solver::new();
        let a = solver.add_variable(1.0, Strength::NORMAL);
        let b = solver.add_variable(2.0, Strength::NORMAL);
        solver.add_constraint(Constraint::new(
            &solver,
            Relation::Equals(EqualsConstraint::new(a, b)),
        ));
        solver.solve().unwrap();
        assert_close(solver.value(a), 2.0);

        solver.set_value(a, 10.8);
        solver.solve().unwrap();
        assert_close(solver.value(b), 10.8);
    }

    #[test]
    fn equals_with_variable_delta() {
        let mut solver = Solver::new();
        let a = solver.add_variable(0.0, Strength::NORMAL);
        let b = solver.add_variable(0.0, Strength::NORMAL);
        let delta = solver.add_variable(5.0, Strength::REQUIRED);
        solver.add_constraint(Constraint::new(
            &solver,
            Relation::Equals(EqualsConstraint::with_delta(a, b, delta)),
        ));
        solver.set_value(a, 3.0);
        solver.solve().unwrap();
        assert_close(solver.value(b), 8.0);
    }

    #[test]
    fn less_than_inactive_at_exact_boundary() {
        let mut solver = Solver::new();
        let smaller = solver.add_variable(5.0, Strength::NORMAL);
        let bigger = solver.add_variable(10.0, Strength::NORMAL);
        let c = LessThanConstraint::new(smaller, bigger, 5.0);
        c.solve_for(smaller, &mut solver);
        assert_close(solver.value(smaller), 5.0);
        assert_close(solver.value(bigger), 10.0);
    }

    #[test]
    fn less_than_restores_when_violated() {
        let mut solver = Solver::new();
        let smaller = solver.add_variable(10.0, Strength::NORMAL);
        let bigger = solver.add_variable(8.0, Strength::NORMAL);
        let c = LessThanConstraint::new(smaller, bigger, 5.0);
        // The recently moved variable is left alone; the other one moves.
        c.solve_for(smaller, &mut solver);
        assert_close(solver.value(smaller), 10.0);
        assert_close(solver.value(bigger), 15.0);
    }

    #[test]
    fn center_keeps_midpoint() {
        let mut solver = Solver::new();
        let a = solver.add_variable(1.0, Strength::NORMAL);
        let b = solver.add_variable(3.0, Strength::NORMAL);
        let center = solver.add_variable(0.0, Strength::WEAK);
        let c = CenterConstraint::new(a, b, center);
        c.solve_for(center, &mut solver);
        assert_close(solver.value(center), 2.0);
    }

    #[test]
    fn line_ratio_captured_and_reapplied() {
        let mut solver = Solver::new();
        let start = Position::new(&mut solver, Point::ZERO, Strength::NORMAL);
        let end = Position::new(&mut solver, Point::new(30.0, 20.0), Strength::NORMAL);
        let point = Position::new(&mut solver, Point::new(15.0, 4.0), Strength::NORMAL);
        let c = LineConstraint::new(&solver, (start, end), point);
        assert_close(c.ratio(), 0.5);

        end.set(&mut solver, Point::new(40.0, 30.0));
        c.solve_for(point.x, &mut solver);
        assert_eq!(point.point(&solver), Point::new(20.0, 15.0));
    }

    #[test]
    fn degenerate_line_uses_ratio_zero() {
        let mut solver = Solver::new();
        let start = Position::new(&mut solver, Point::new(4.0, 4.0), Strength::NORMAL);
        let end = Position::new(&mut solver, Point::new(4.0, 4.0), Strength::NORMAL);
        let point = Position::new(&mut solver, Point::new(10.0, 10.0), Strength::NORMAL);
        let c = LineConstraint::new(&solver, (start, end), point);
        assert_close(c.ratio(), 0.0);
        c.solve_for(point.x, &mut solver);
        assert_eq!(point.point(&solver), Point::new(4.0, 4.0));
    }

    #[test]
    fn line_align_places_point_at_fraction() {
        let mut solver = Solver::new();
        let start = Position::new(&mut solver, Point::ZERO, Strength::NORMAL);
        let end = Position::new(&mut solver, Point::new(10.0, 0.0), Strength::NORMAL);
        let point = Position::new(&mut solver, Point::ZERO, Strength::WEAK);
        let c = LineAlignConstraint::new((start, end), point, 0.5, 2.0);
        c.solve_for(point.x, &mut solver);
        // Midpoint plus 2 along the (horizontal) direction.
        assert_close(solver.value(point.x), 7.0);
        assert_close(solver.value(point.y), 0.0);
    }

    #[test]
    fn position_pins_point_to_origin() {
        let mut solver = Solver::new();
        let origin = Position::new(&mut solver, Point::new(3.0, 9.0), Strength::NORMAL);
        let point = Position::new(&mut solver, Point::ZERO, Strength::WEAK);
        let c = PositionConstraint::new(origin, point);
        c.solve_for(point.x, &mut solver);
        assert_eq!(point.point(&solver), Point::new(3.0, 9.0));
    }

    #[test]
    fn equation_solves_linear() {
        let mut solver = Solver::new();
        let a = solver.add_variable(0.0, Strength::NORMAL);
        let b = solver.add_variable(4.0, Strength::NORMAL);
        let c = solver.add_variable(5.0, Strength::NORMAL);
        let eq = EquationConstraint::new(|v| v[0] + v[1] - v[2], vec![a, b, c]);
        eq.solve_for(a, &mut solver);
        assert!((solver.value(a) - 1.0).abs() < 1e-6);

        solver.set_value(a, 3.4);
        eq.solve_for(b, &mut solver);
        assert!((solver.value(b) - 1.6).abs() < 1e-6);
    }

    #[test]
    fn balance_keeps_proportion() {
        let mut solver = Solver::new();
        let b1 = solver.add_variable(2.0, Strength::NORMAL);
        let b2 = solver.add_variable(3.0, Strength::NORMAL);
        let v = solver.add_variable(2.3, Strength::WEAK);
        let c = BalanceConstraint::new(&solver, (b1, b2), v, None);
        solver.set_value(v, 2.4);
        c.solve_for(v, &mut solver);
        assert_close(solver.value(v), 2.3);
    }

    #[test]
    fn balance_with_reversed_band() {
        let mut solver = Solver::new();
        let b1 = solver.add_variable(3.0, Strength::NORMAL);
        let b2 = solver.add_variable(2.0, Strength::NORMAL);
        let v = solver.add_variable(2.45, Strength::WEAK);
        let c = BalanceConstraint::new(&solver, (b1, b2), v, None);
        solver.set_value(v, 2.5);
        c.solve_for(v, &mut solver);
        assert_close(solver.value(v), 2.45);
    }
}
