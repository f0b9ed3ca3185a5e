// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The generic constraint wrapper: relation dispatch and the weakest list.
//!
//! A constraint owns a [`Relation`] plus the ordered list of its weakest
//! variables. When one of its variables is disturbed, the variable rotates
//! to the back of the weakest list *if it is currently at the front*;
//! solving always modifies the front. The effect is that the least
//! recently disturbed weakest variable is the one the solver changes, so
//! the most recent edit wins.

use smallvec::SmallVec;

use crate::constraints::{
    BalanceConstraint, CenterConstraint, EqualsConstraint, EquationConstraint,
    LessThanConstraint, LineAlignConstraint, LineConstraint, PositionConstraint,
};
use crate::matrix::MatrixId;
use crate::position::MatrixProjection;
use crate::solver::Solver;
use crate::variable::VariableId;

/// Identifier for a constraint registered in a [`Solver`].
///
/// Generational, like [`VariableId`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ConstraintId(pub(crate) u32, pub(crate) u32);

impl ConstraintId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}

/// The relation a constraint encodes.
#[derive(Debug)]
pub enum Relation {
    /// `a + delta = b`.
    Equals(EqualsConstraint),
    /// `smaller <= bigger - delta`.
    LessThan(LessThanConstraint),
    /// `center = (a + b) / 2`.
    Center(CenterConstraint),
    /// Point kept on a line at a captured ratio.
    Line(LineConstraint),
    /// Point kept at a fraction of a line with normal padding.
    LineAlign(LineAlignConstraint),
    /// Point pinned to an origin position.
    Position(PositionConstraint),
    /// `f(vars) = 0`, solved iteratively.
    Equation(EquationConstraint),
    /// Proportional placement between two band variables.
    Balance(BalanceConstraint),
    /// Projection of a position through a matrix.
    Projection(MatrixProjection),
    /// Several constraints grouped as a single registration.
    Multi(Vec<Constraint>),
}

impl Relation {
    fn solve_for(&self, var: VariableId, solver: &mut Solver) {
        match self {
            Self::Equals(c) => c.solve_for(var, solver),
            Self::LessThan(c) => c.solve_for(var, solver),
            Self::Center(c) => c.solve_for(var, solver),
            Self::Line(c) => c.solve_for(var, solver),
            Self::LineAlign(c) => c.solve_for(var, solver),
            Self::Position(c) => c.solve_for(var, solver),
            Self::Equation(c) => c.solve_for(var, solver),
            Self::Balance(c) => c.solve_for(var, solver),
            Self::Projection(c) => c.solve_for(var, solver),
            Self::Multi(_) => unreachable!("multi constraints solve their children"),
        }
    }

    pub(crate) fn for_each_variable(&self, f: &mut dyn FnMut(VariableId)) {
        match self {
            Self::Equals(c) => c.for_each_variable(f),
            Self::LessThan(c) => c.for_each_variable(f),
            Self::Center(c) => c.for_each_variable(f),
            Self::Line(c) => c.for_each_variable(f),
            Self::LineAlign(c) => c.for_each_variable(f),
            Self::Position(c) => c.for_each_variable(f),
            Self::Equation(c) => c.for_each_variable(f),
            Self::Balance(c) => c.for_each_variable(f),
            Self::Projection(c) => c.for_each_variable(f),
            Self::Multi(children) => {
                for child in children {
                    child.for_each_variable(f);
                }
            }
        }
    }

    pub(crate) fn for_each_matrix(&self, f: &mut dyn FnMut(MatrixId)) {
        match self {
            Self::Projection(c) => f(c.matrix()),
            Self::Multi(children) => {
                for child in children {
                    child.for_each_matrix(f);
                }
            }
            _ => {}
        }
    }
}

/// A registered relation plus its weakest-variable bookkeeping.
#[derive(Debug)]
pub struct Constraint {
    relation: Relation,
    weakest: SmallVec<[VariableId; 6]>,
}

impl Constraint {
    /// Wrap a relation, capturing its weakest variables.
    ///
    /// The weakest list holds the relation's variables of minimal strength,
    /// in declaration order. Grouped (`Multi`) relations keep their
    /// bookkeeping per child.
    pub fn new(solver: &Solver, relation: Relation) -> Self {
        let weakest = match &relation {
            Relation::Multi(_) => SmallVec::new(),
            relation => {
                let mut vars: SmallVec<[VariableId; 8]> = SmallVec::new();
                relation.for_each_variable(&mut |v| vars.push(v));
                let min = vars
                    .iter()
                    .map(|&v| solver.strength(v))
                    .min()
                    .expect("a relation references at least one variable");
                vars.into_iter()
                    .filter(|&v| solver.strength(v) == min)
                    .collect()
            }
        };
        Self { relation, weakest }
    }

    /// Group several constraints into one registration.
    ///
    /// The group is solved as a unit, child by child, and is registered,
    /// marked, and removed through a single [`ConstraintId`].
    pub fn multi(children: Vec<Self>) -> Self {
        Self {
            relation: Relation::Multi(children),
            weakest: SmallVec::new(),
        }
    }

    /// The relation this constraint encodes.
    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    /// The variable the next solve will modify, if any.
    pub fn weakest(&self) -> Option<VariableId> {
        self.weakest.first().copied()
    }

    /// Whether `var` is referenced anywhere in this constraint.
    pub fn references(&self, var: VariableId) -> bool {
        let mut found = false;
        self.for_each_variable(&mut |v| found |= v == var);
        found
    }

    pub(crate) fn for_each_variable(&self, f: &mut dyn FnMut(VariableId)) {
        self.relation.for_each_variable(f);
    }

    pub(crate) fn for_each_matrix(&self, f: &mut dyn FnMut(MatrixId)) {
        self.relation.for_each_matrix(f);
    }

    /// Record that `var` was disturbed.
    pub(crate) fn mark_dirty(&mut self, var: VariableId) {
        if let Relation::Multi(children) = &mut self.relation {
            for child in children {
                if child.references(var) {
                    child.mark_dirty(var);
                }
            }
            return;
        }
        // A projection treats its two coordinate pairs as units: disturbing
        // either source coordinate marks both, anything else marks the
        // projected pair. That is what flips the solve direction.
        if let Relation::Projection(p) = &self.relation {
            let pair = if p.source().contains(var) {
                p.source()
            } else {
                p.projected()
            };
            rotate_if_front(&mut self.weakest, pair.x);
            rotate_if_front(&mut self.weakest, pair.y);
            return;
        }
        rotate_if_front(&mut self.weakest, var);
    }

    /// Record that `matrix` changed: projections through it re-project from
    /// their source.
    pub(crate) fn matrix_changed(&mut self, matrix: MatrixId) {
        if let Relation::Multi(children) = &mut self.relation {
            for child in children {
                child.matrix_changed(matrix);
            }
            return;
        }
        let source = match &self.relation {
            Relation::Projection(p) if p.matrix() == matrix => Some(p.source()),
            _ => None,
        };
        if let Some(source) = source {
            self.mark_dirty(source.x);
        }
    }

    /// Free the projected positions allocated by the projections inside
    /// this constraint.
    ///
    /// Call after removing the constraint from the solver, and only when
    /// the projected positions are not shared with anything still alive.
    /// Glue constraints built per connection qualify; hand-built graphs
    /// sharing a projection do not.
    pub fn release_projected(&self, solver: &mut Solver) {
        match &self.relation {
            Relation::Projection(p) => p.projected().release(solver),
            Relation::Multi(children) => {
                for child in children {
                    child.release_projected(solver);
                }
            }
            _ => {}
        }
    }

    /// Solve the relation by modifying the front of the weakest list.
    pub(crate) fn solve(&self, solver: &mut Solver) {
        match &self.relation {
            Relation::Multi(children) => {
                for child in children {
                    child.solve(solver);
                }
            }
            relation => {
                let Some(&var) = self.weakest.first() else {
                    return;
                };
                relation.solve_for(var, solver);
            }
        }
    }
}

/// Move `var` to the back of the list when it sits at the front.
///
/// Only the front element rotates; disturbing a variable that is already
/// behind others leaves the order alone. The front is therefore always the
/// least recently disturbed weakest variable.
fn rotate_if_front(weakest: &mut SmallVec<[VariableId; 6]>, var: VariableId) {
    if weakest.len() > 1 && weakest.first() == Some(&var) {
        weakest.remove(0);
        weakest.push(var);
    }
}
