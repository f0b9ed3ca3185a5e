// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The solver: arenas for variables, matrices, and constraints, the dirty
//! bus between them, and the resolution loop.
//!
//! Every mutation goes through the solver so it can keep the bookkeeping
//! honest: changing a variable marks the constraints that reference it,
//! changing a matrix marks the projections that go through it, and
//! [`Solver::solve`] works the marked list off in arrival order. The
//! marked list may grow while it is being worked; a constraint that keeps
//! being re-marked is oscillating, and after 100 re-marks in a single pass
//! the solve is abandoned with a [`JuggleError`].

use core::mem;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::constraint::{Constraint, ConstraintId};
use crate::matrix::{Matrix, MatrixId};
use crate::variable::{EPSILON, Strength, VariableId, VariableSlot};

/// How many times a constraint may be re-marked within one solve before
/// the solver gives up on the pass.
const JUGGLE_LIMIT: usize = 100;

/// Raised when constraints keep marking each other dirty without
/// converging.
///
/// The solver state stays consistent, but the interrupted pass left some
/// relations unsatisfied; the marked list is preserved so a later solve
/// picks them up again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("variable juggling detected: a constraint was re-marked {count} times in one solve")]
pub struct JuggleError {
    /// The oscillating constraint.
    pub constraint: ConstraintId,
    /// How often it was marked when the solver gave up.
    pub count: usize,
}

/// Notification fired by the solver, synchronously, as state changes.
#[derive(Debug, Clone)]
pub enum SolverEvent {
    /// A variable's value moved by more than the tolerance.
    VariableChanged {
        /// The variable.
        variable: VariableId,
        /// Value before the change.
        old: f64,
        /// Value after the change.
        new: f64,
    },
    /// A stored matrix was mutated.
    MatrixChanged {
        /// The matrix.
        matrix: MatrixId,
        /// Coefficients before the change.
        old: Matrix,
    },
    /// A constraint was resolved during [`Solver::solve`].
    ConstraintResolved {
        /// The resolved (top-level) constraint.
        constraint: ConstraintId,
    },
}

/// Token returned by handler registration; pass it back to unregister.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Build a handler id from a raw counter value.
    ///
    /// Registries in dependent crates reuse this token type for their own
    /// handler lists; ids from different registries are unrelated.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw counter value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

type Handler = Box<dyn FnMut(&SolverEvent)>;

/// The constraint solver and owner of all variables and matrices.
pub struct Solver {
    variables: Vec<Option<VariableSlot>>,
    variable_generations: Vec<u32>,
    free_variables: Vec<usize>,

    matrices: Vec<Option<Matrix>>,
    matrix_generations: Vec<u32>,
    free_matrices: Vec<usize>,

    constraints: Vec<Option<Constraint>>,
    constraint_generations: Vec<u32>,
    free_constraints: Vec<usize>,

    var_deps: HashMap<VariableId, SmallVec<[ConstraintId; 4]>>,
    matrix_deps: HashMap<MatrixId, SmallVec<[ConstraintId; 2]>>,

    marked: Vec<ConstraintId>,
    solving: bool,
    in_flight: Option<ConstraintId>,
    deferred: Vec<VariableId>,
    juggle: Option<(ConstraintId, usize)>,

    handlers: Vec<(HandlerId, Handler)>,
    next_handler: u64,
}

impl core::fmt::Debug for Solver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let alive = |v: &[Option<Constraint>]| v.iter().filter(|s| s.is_some()).count();
        f.debug_struct("Solver")
            .field(
                "variables",
                &self.variables.iter().filter(|s| s.is_some()).count(),
            )
            .field(
                "matrices",
                &self.matrices.iter().filter(|s| s.is_some()).count(),
            )
            .field("constraints", &alive(&self.constraints))
            .field("marked", &self.marked.len())
            .field("solving", &self.solving)
            .finish_non_exhaustive()
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    /// Create an empty solver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            variable_generations: Vec::new(),
            free_variables: Vec::new(),
            matrices: Vec::new(),
            matrix_generations: Vec::new(),
            free_matrices: Vec::new(),
            constraints: Vec::new(),
            constraint_generations: Vec::new(),
            free_constraints: Vec::new(),
            var_deps: HashMap::new(),
            matrix_deps: HashMap::new(),
            marked: Vec::new(),
            solving: false,
            in_flight: None,
            deferred: Vec::new(),
            juggle: None,
            handlers: Vec::new(),
            next_handler: 0,
        }
    }

    // --- handlers ---

    /// Register a handler for solver events. Handlers fire synchronously,
    /// in registration order, before the mutating call returns.
    pub fn add_handler(&mut self, handler: impl FnMut(&SolverEvent) + 'static) -> HandlerId {
        self.next_handler += 1;
        let id = HandlerId(self.next_handler);
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Unregister a handler. Returns whether it was registered.
    pub fn remove_handler(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(h, _)| *h != id);
        self.handlers.len() != before
    }

    fn emit(&mut self, event: &SolverEvent) {
        for (_, handler) in &mut self.handlers {
            handler(event);
        }
    }

    // --- variables ---

    /// Allocate a variable with an initial value and strength.
    pub fn add_variable(&mut self, value: f64, strength: Strength) -> VariableId {
        let slot = VariableSlot { value, strength };
        if let Some(idx) = self.free_variables.pop() {
            let generation = self.variable_generations[idx].wrapping_add(1);
            self.variable_generations[idx] = generation;
            self.variables[idx] = Some(slot);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ids use 32-bit indices by design"
            )]
            VariableId::new(idx as u32, generation)
        } else {
            self.variables.push(Some(slot));
            self.variable_generations.push(1);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ids use 32-bit indices by design"
            )]
            VariableId::new((self.variables.len() - 1) as u32, 1)
        }
    }

    /// Free a variable.
    ///
    /// Constraints referencing it must have been removed first.
    pub fn remove_variable(&mut self, var: VariableId) {
        if !self.variable_alive(var) {
            return;
        }
        self.variables[var.idx()] = None;
        self.free_variables.push(var.idx());
        self.var_deps.remove(&var);
    }

    /// Whether `var` refers to a live variable.
    #[must_use]
    pub fn variable_alive(&self, var: VariableId) -> bool {
        self.variables
            .get(var.idx())
            .is_some_and(Option::is_some)
            && self.variable_generations[var.idx()] == var.generation()
    }

    /// The current value of a variable.
    ///
    /// Panics when handed a stale id.
    #[must_use]
    pub fn value(&self, var: VariableId) -> f64 {
        self.variable_slot(var).value
    }

    /// The strength of a variable.
    ///
    /// Panics when handed a stale id.
    #[must_use]
    pub fn strength(&self, var: VariableId) -> Strength {
        self.variable_slot(var).strength
    }

    /// Assign a value. Values closer than the tolerance to the current one
    /// are ignored; a real change marks dependent constraints and notifies.
    pub fn set_value(&mut self, var: VariableId, value: f64) {
        let slot = self.variable_slot_mut(var);
        let old = slot.value;
        if (old - value).abs() > EPSILON {
            slot.value = value;
            self.variable_changed(var, old, value);
        }
    }

    /// Re-notify for a variable without changing its value.
    ///
    /// Used to force downstream constraints to re-solve, e.g. after
    /// geometry was rebuilt around an unchanged coordinate.
    pub fn touch(&mut self, var: VariableId) {
        let value = self.value(var);
        self.variable_changed(var, value, value);
    }

    fn variable_changed(&mut self, var: VariableId, old: f64, new: f64) {
        let deps = match self.var_deps.get(&var) {
            Some(deps) => deps.clone(),
            None => SmallVec::new(),
        };
        for cid in deps {
            if self.in_flight == Some(cid) {
                // The constraint being solved right now; its recency
                // bookkeeping is applied once it is back in the arena.
                self.deferred.push(var);
            } else if let Some(constraint) = self.constraint_slot_mut(cid) {
                constraint.mark_dirty(var);
            }
            self.request_resolve(cid);
        }
        self.emit(&SolverEvent::VariableChanged {
            variable: var,
            old,
            new,
        });
    }

    fn variable_slot(&self, var: VariableId) -> &VariableSlot {
        assert!(self.variable_alive(var), "stale variable id {var:?}");
        self.variables[var.idx()].as_ref().unwrap()
    }

    fn variable_slot_mut(&mut self, var: VariableId) -> &mut VariableSlot {
        assert!(self.variable_alive(var), "stale variable id {var:?}");
        self.variables[var.idx()].as_mut().unwrap()
    }

    // --- matrices ---

    /// Store a matrix, returning its id.
    pub fn add_matrix(&mut self, matrix: Matrix) -> MatrixId {
        if let Some(idx) = self.free_matrices.pop() {
            let generation = self.matrix_generations[idx].wrapping_add(1);
            self.matrix_generations[idx] = generation;
            self.matrices[idx] = Some(matrix);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ids use 32-bit indices by design"
            )]
            MatrixId::new(idx as u32, generation)
        } else {
            self.matrices.push(Some(matrix));
            self.matrix_generations.push(1);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ids use 32-bit indices by design"
            )]
            MatrixId::new((self.matrices.len() - 1) as u32, 1)
        }
    }

    /// Free a stored matrix.
    pub fn remove_matrix(&mut self, id: MatrixId) {
        if !self.matrix_alive(id) {
            return;
        }
        self.matrices[id.idx()] = None;
        self.free_matrices.push(id.idx());
        self.matrix_deps.remove(&id);
    }

    /// Whether `id` refers to a live matrix.
    #[must_use]
    pub fn matrix_alive(&self, id: MatrixId) -> bool {
        self.matrices.get(id.idx()).is_some_and(Option::is_some)
            && self.matrix_generations[id.idx()] == id.generation()
    }

    /// The current value of a stored matrix.
    ///
    /// Panics when handed a stale id.
    #[must_use]
    pub fn matrix(&self, id: MatrixId) -> Matrix {
        assert!(self.matrix_alive(id), "stale matrix id {id:?}");
        self.matrices[id.idx()].unwrap()
    }

    /// Replace a stored matrix. Notifies only when the coefficients
    /// actually differ.
    pub fn set_matrix(&mut self, id: MatrixId, matrix: Matrix) {
        let old = self.matrix(id);
        if matrix.differs(old) {
            self.matrices[id.idx()] = Some(matrix);
            self.matrix_changed(id, old);
        }
    }

    /// Translate a stored matrix; always notifies.
    pub fn translate_matrix(&mut self, id: MatrixId, tx: f64, ty: f64) {
        self.mutate_matrix(id, |m| m.translate(tx, ty));
    }

    /// Rotate a stored matrix; always notifies.
    pub fn rotate_matrix(&mut self, id: MatrixId, radians: f64) {
        self.mutate_matrix(id, |m| m.rotate(radians));
    }

    /// Scale a stored matrix; always notifies.
    pub fn scale_matrix(&mut self, id: MatrixId, sx: f64, sy: f64) {
        self.mutate_matrix(id, |m| m.scale(sx, sy));
    }

    /// Invert a stored matrix in place; always notifies.
    pub fn invert_matrix(&mut self, id: MatrixId) {
        self.mutate_matrix(id, Matrix::invert);
    }

    fn mutate_matrix(&mut self, id: MatrixId, f: impl FnOnce(&mut Matrix)) {
        let old = self.matrix(id);
        let mut matrix = old;
        f(&mut matrix);
        self.matrices[id.idx()] = Some(matrix);
        self.matrix_changed(id, old);
    }

    fn matrix_changed(&mut self, id: MatrixId, old: Matrix) {
        let deps = match self.matrix_deps.get(&id) {
            Some(deps) => deps.clone(),
            None => SmallVec::new(),
        };
        for cid in deps {
            if self.in_flight != Some(cid)
                && let Some(constraint) = self.constraint_slot_mut(cid)
            {
                constraint.matrix_changed(id);
            }
            self.request_resolve(cid);
        }
        self.emit(&SolverEvent::MatrixChanged { matrix: id, old });
    }

    // --- constraints ---

    /// Register a constraint. It is marked for the next solve.
    pub fn add_constraint(&mut self, constraint: Constraint) -> ConstraintId {
        let id = if let Some(idx) = self.free_constraints.pop() {
            let generation = self.constraint_generations[idx].wrapping_add(1);
            self.constraint_generations[idx] = generation;
            self.constraints[idx] = Some(constraint);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ids use 32-bit indices by design"
            )]
            ConstraintId::new(idx as u32, generation)
        } else {
            self.constraints.push(Some(constraint));
            self.constraint_generations.push(1);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ids use 32-bit indices by design"
            )]
            ConstraintId::new((self.constraints.len() - 1) as u32, 1)
        };
        let constraint = self.constraints[id.idx()].as_ref().unwrap();
        let mut vars: SmallVec<[VariableId; 8]> = SmallVec::new();
        constraint.for_each_variable(&mut |v| {
            if !vars.contains(&v) {
                vars.push(v);
            }
        });
        let mut mats: SmallVec<[MatrixId; 4]> = SmallVec::new();
        constraint.for_each_matrix(&mut |m| {
            if !mats.contains(&m) {
                mats.push(m);
            }
        });
        for var in vars {
            let deps = self.var_deps.entry(var).or_default();
            if !deps.contains(&id) {
                deps.push(id);
            }
        }
        for mat in mats {
            let deps = self.matrix_deps.entry(mat).or_default();
            if !deps.contains(&id) {
                deps.push(id);
            }
        }
        self.marked.push(id);
        id
    }

    /// Remove a constraint, returning it. Removing twice has no effect.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> Option<Constraint> {
        if !self.constraint_alive(id) {
            return None;
        }
        let constraint = self.constraints[id.idx()].take()?;
        self.free_constraints.push(id.idx());
        constraint.for_each_variable(&mut |v| {
            let emptied = match self.var_deps.get_mut(&v) {
                Some(deps) => {
                    deps.retain(|c| *c != id);
                    deps.is_empty()
                }
                None => false,
            };
            if emptied {
                self.var_deps.remove(&v);
            }
        });
        constraint.for_each_matrix(&mut |m| {
            let emptied = match self.matrix_deps.get_mut(&m) {
                Some(deps) => {
                    deps.retain(|c| *c != id);
                    deps.is_empty()
                }
                None => false,
            };
            if emptied {
                self.matrix_deps.remove(&m);
            }
        });
        self.marked.retain(|&c| c != id);
        Some(constraint)
    }

    /// Whether `id` refers to a registered constraint.
    #[must_use]
    pub fn constraint_alive(&self, id: ConstraintId) -> bool {
        self.constraints.get(id.idx()).is_some_and(Option::is_some)
            && self.constraint_generations[id.idx()] == id.generation()
    }

    /// Access a registered constraint.
    #[must_use]
    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        if !self.constraint_alive(id) {
            return None;
        }
        self.constraints[id.idx()].as_ref()
    }

    /// Number of registered constraints.
    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.constraints.iter().filter(|s| s.is_some()).count()
    }

    /// The constraints currently marked for resolution, in arrival order.
    #[must_use]
    pub fn marked_constraints(&self) -> &[ConstraintId] {
        &self.marked
    }

    /// Whether a solve pass is in progress.
    #[must_use]
    pub fn solving(&self) -> bool {
        self.solving
    }

    /// Ask for a constraint to be resolved on the next solve.
    ///
    /// Outside a solve the constraint moves to the tail of the marked list
    /// (deduplicated); during a solve it is appended as-is, which is also
    /// how oscillation is detected.
    pub fn request_resolve(&mut self, id: ConstraintId) {
        if !self.solving {
            if let Some(pos) = self.marked.iter().position(|&c| c == id) {
                self.marked.remove(pos);
            }
            self.marked.push(id);
        } else {
            self.marked.push(id);
            if self.juggle.is_none() {
                let count = self.marked.iter().filter(|&&c| c == id).count();
                if count > JUGGLE_LIMIT {
                    self.juggle = Some((id, count));
                }
            }
        }
    }

    fn constraint_slot_mut(&mut self, id: ConstraintId) -> Option<&mut Constraint> {
        if !self.constraint_alive(id) {
            return None;
        }
        self.constraints[id.idx()].as_mut()
    }

    // --- solving ---

    /// Resolve all marked constraints, in the order they were marked.
    ///
    /// Constraints marked as a consequence of earlier resolutions are
    /// picked up within the same pass. On success the marked list is
    /// cleared; on [`JuggleError`] it is left for a later attempt.
    pub fn solve(&mut self) -> Result<(), JuggleError> {
        self.solving = true;
        let result = self.solve_loop();
        if result.is_ok() {
            self.marked.clear();
        }
        self.solving = false;
        result
    }

    fn solve_loop(&mut self) -> Result<(), JuggleError> {
        let mut n = 0;
        while n < self.marked.len() {
            let cid = self.marked[n];
            let resolved = self.solve_constraint(cid);
            if let Some((constraint, count)) = self.juggle.take() {
                return Err(JuggleError { constraint, count });
            }
            if resolved {
                self.emit(&SolverEvent::ConstraintResolved { constraint: cid });
            }
            n += 1;
        }
        Ok(())
    }

    /// Solve one constraint. The slot is taken out of the arena for the
    /// duration so the relation can freely write variables back through
    /// `self`; marks aimed at the in-flight constraint are buffered and
    /// applied on return.
    fn solve_constraint(&mut self, cid: ConstraintId) -> bool {
        if !self.constraint_alive(cid) {
            return false;
        }
        let Some(constraint) = self.constraints[cid.idx()].take() else {
            return false;
        };
        self.in_flight = Some(cid);
        constraint.solve(self);
        self.in_flight = None;
        let deferred = mem::take(&mut self.deferred);
        self.constraints[cid.idx()] = Some(constraint);
        if let Some(slot) = self.constraints[cid.idx()].as_mut() {
            for var in deferred {
                slot.mark_dirty(var);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Relation;
    use crate::constraints::{EqualsConstraint, EquationConstraint};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn equals(solver: &Solver, a: VariableId, b: VariableId) -> Constraint {
        Constraint::new(solver, Relation::Equals(EqualsConstraint::new(a, b)))
    }

    #[test]
    fn add_constraint_marks_it() {
        let mut solver = Solver::new();
        let a = solver.add_variable(0.0, Strength::NORMAL);
        let b = solver.add_variable(2.0, Strength::NORMAL);
        let id = solver.add_constraint(equals(&solver, a, b));
        assert_eq!(solver.constraint_count(), 1);
        assert_eq!(solver.marked_constraints(), &[id]);

        solver.solve().unwrap();
        assert!(solver.marked_constraints().is_empty());
        assert_eq!(solver.value(a), 2.0);
    }

    #[test]
    fn remove_constraint_purges_marked() {
        let mut solver = Solver::new();
        let a = solver.add_variable(0.0, Strength::NORMAL);
        let b = solver.add_variable(2.0, Strength::NORMAL);
        let id = solver.add_constraint(equals(&solver, a, b));
        assert!(solver.remove_constraint(id).is_some());
        assert!(solver.marked_constraints().is_empty());
        assert_eq!(solver.constraint_count(), 0);
        // Removing twice has no effect.
        assert!(solver.remove_constraint(id).is_none());
    }

    #[test]
    fn value_change_marks_dependent_constraints() {
        let mut solver = Solver::new();
        let a = solver.add_variable(1.0, Strength::NORMAL);
        let b = solver.add_variable(2.0, Strength::NORMAL);
        let id = solver.add_constraint(equals(&solver, a, b));
        solver.solve().unwrap();
        assert!(solver.marked_constraints().is_empty());

        solver.set_value(a, 5.0);
        assert_eq!(solver.marked_constraints(), &[id]);

        // A change below the tolerance does not mark.
        solver.solve().unwrap();
        solver.set_value(a, 5.0 + EPSILON / 2.0);
        assert!(solver.marked_constraints().is_empty());
    }

    #[test]
    fn chained_resolution_within_one_pass() {
        // Mirrors the classic chain: solving one constraint marks the
        // next, which is picked up in the same pass.
        let mut solver = Solver::new();
        let a = solver.add_variable(1.0, Strength::NORMAL);
        let b = solver.add_variable(2.0, Strength::NORMAL);
        let c = solver.add_variable(3.0, Strength::NORMAL);
        solver.add_constraint(Constraint::new(
            &solver,
            Relation::Equation(EquationConstraint::new(|v| v[0] + v[1], vec![a, b])),
        ));
        solver.set_value(a, 5.0);
        solver.solve().unwrap();
        assert_eq!(solver.value(b), -5.0);

        solver.add_constraint(Constraint::new(
            &solver,
            Relation::Equation(EquationConstraint::new(|v| v[0] + v[1], vec![b, c])),
        ));
        solver.solve().unwrap();
        assert!((solver.value(b) - -3.0).abs() < 1e-6);

        solver.set_value(a, 10.0);
        solver.solve().unwrap();
        assert!((solver.value(c) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn request_resolve_moves_to_tail_when_idle() {
        let mut solver = Solver::new();
        let a = solver.add_variable(0.0, Strength::NORMAL);
        let b = solver.add_variable(0.0, Strength::NORMAL);
        let c = solver.add_variable(0.0, Strength::NORMAL);
        let c1 = solver.add_constraint(equals(&solver, a, b));
        let c2 = solver.add_constraint(equals(&solver, b, c));
        assert_eq!(solver.marked_constraints(), &[c1, c2]);
        solver.request_resolve(c1);
        assert_eq!(solver.marked_constraints(), &[c2, c1]);
    }

    #[test]
    fn juggling_is_detected() {
        // Two REQUIRED anchors pull a shared pair of variables to
        // different values; the equals chain can never settle.
        let mut solver = Solver::new();
        let a = solver.add_variable(0.0, Strength::NORMAL);
        let b = solver.add_variable(0.0, Strength::NORMAL);
        let c = solver.add_variable(40.0, Strength::REQUIRED);
        let d = solver.add_variable(30.0, Strength::REQUIRED);
        solver.add_constraint(equals(&solver, a, b));
        solver.add_constraint(equals(&solver, a, c));
        solver.add_constraint(equals(&solver, b, d));
        let err = solver.solve().unwrap_err();
        assert!(err.count > JUGGLE_LIMIT);
        // The marked list is kept so a later pass can be attempted.
        assert!(!solver.marked_constraints().is_empty());
        assert!(!solver.solving());
    }

    #[test]
    fn handlers_fire_in_registration_order() {
        let mut solver = Solver::new();
        let a = solver.add_variable(0.0, Strength::NORMAL);
        let order = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&order);
        let second = Rc::clone(&order);
        solver.add_handler(move |event| {
            if matches!(event, SolverEvent::VariableChanged { .. }) {
                first.borrow_mut().push(1);
            }
        });
        let id = solver.add_handler(move |event| {
            if matches!(event, SolverEvent::VariableChanged { .. }) {
                second.borrow_mut().push(2);
            }
        });
        solver.set_value(a, 1.0);
        assert_eq!(*order.borrow(), vec![1, 2]);

        assert!(solver.remove_handler(id));
        solver.set_value(a, 2.0);
        assert_eq!(*order.borrow(), vec![1, 2, 1]);
    }

    #[test]
    fn resolved_notifications_carry_top_level_ids() {
        let mut solver = Solver::new();
        let a = solver.add_variable(0.0, Strength::NORMAL);
        let b = solver.add_variable(1.0, Strength::NORMAL);
        let child = equals(&solver, a, b);
        let multi = Constraint::multi(vec![child]);
        let id = solver.add_constraint(multi);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        solver.add_handler(move |event| {
            if let SolverEvent::ConstraintResolved { constraint } = event {
                sink.borrow_mut().push(*constraint);
            }
        });
        solver.solve().unwrap();
        assert_eq!(*seen.borrow(), vec![id]);
        assert_eq!(solver.value(a), 1.0);
    }

    #[test]
    fn touch_remarks_without_change() {
        let mut solver = Solver::new();
        let a = solver.add_variable(1.0, Strength::NORMAL);
        let b = solver.add_variable(1.0, Strength::NORMAL);
        let id = solver.add_constraint(equals(&solver, a, b));
        solver.solve().unwrap();
        assert!(solver.marked_constraints().is_empty());
        solver.touch(a);
        assert_eq!(solver.marked_constraints(), &[id]);
    }

    #[test]
    fn variable_slots_are_generational() {
        let mut solver = Solver::new();
        let a = solver.add_variable(1.0, Strength::NORMAL);
        solver.remove_variable(a);
        assert!(!solver.variable_alive(a));
        let b = solver.add_variable(2.0, Strength::NORMAL);
        assert!(solver.variable_alive(b));
        assert!(!solver.variable_alive(a), "reused slot must not alias");
    }
}
