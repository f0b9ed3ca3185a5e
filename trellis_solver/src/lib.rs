// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=trellis_solver --heading-base-level=0

//! Trellis Solver: a strength-ranked local constraint solver for 2D scenes.
//!
//! The solver keeps geometric relations (equality, ordering, points on
//! lines, projections between coordinate spaces) true while the underlying
//! values keep changing. It is *local*: rather than solving a global
//! system, each constraint fixes itself by modifying its weakest variable,
//! and changes ripple until everything marked dirty has been visited.
//!
//! ## How it works
//!
//! - A [`Variable`](Solver::add_variable) is a scalar with a [`Strength`].
//!   In any constraint, the variables with the lowest strength are the ones
//!   the solver may modify; ties go to the least recently disturbed one, so
//!   the most recent edit survives.
//! - A [`Constraint`] wraps a [`Relation`] from the library in
//!   [`constraints`]: equality with offsets, less-than with gaps,
//!   midpoints, points on lines, iterated equations, proportional
//!   balances — plus [`MatrixProjection`], which couples two positions
//!   through an observable [`Matrix`].
//! - The [`Solver`] owns the arenas for variables, matrices, and
//!   constraints and acts as the event bus between them: a mutation marks
//!   the constraints that depend on it, and [`Solver::solve`] works the
//!   marked list off in arrival order, picking up constraints marked along
//!   the way.
//! - Cycles that refuse to settle are cut off: a constraint re-marked more
//!   than 100 times in a single pass aborts the solve with a
//!   [`JuggleError`].
//!
//! ## Example
//!
//! ```
//! use trellis_solver::{Constraint, Relation, Solver, Strength};
//! use trellis_solver::constraints::EqualsConstraint;
//!
//! let mut solver = Solver::new();
//! let a = solver.add_variable(1.0, Strength::NORMAL);
//! let b = solver.add_variable(2.0, Strength::NORMAL);
//! solver.add_constraint(Constraint::new(
//!     &solver,
//!     Relation::Equals(EqualsConstraint::new(a, b)),
//! ));
//! solver.solve().unwrap();
//! assert_eq!(solver.value(a), 2.0);
//!
//! // The most recent edit wins; the other side follows.
//! solver.set_value(a, 10.0);
//! solver.solve().unwrap();
//! assert_eq!(solver.value(b), 10.0);
//! ```
//!
//! Change notification is synchronous: handlers registered with
//! [`Solver::add_handler`] observe variable, matrix, and resolution events
//! before the mutating call returns, which is the hook surface an undo
//! engine layers onto.

mod constraint;
pub mod constraints;
mod matrix;
mod position;
mod solver;
mod variable;

pub use constraint::{Constraint, ConstraintId, Relation};
pub use matrix::{Matrix, MatrixId};
pub use position::{MatrixProjection, Position};
pub use solver::{HandlerId, JuggleError, Solver, SolverEvent};
pub use variable::{EPSILON, Strength, VariableId};
