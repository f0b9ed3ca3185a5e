// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Variables: observable scalars with a strength, stored in the solver's arena.

/// Tolerance used when comparing variable values.
///
/// Two values closer than this are considered equal; assignments within the
/// tolerance do not notify.
pub const EPSILON: f64 = 1e-6;

/// Importance of a [`Variable`](crate::Solver::add_variable) in a constraint.
///
/// When a constraint is solved, the variables with the *lowest* strength are
/// the ones the solver is allowed to modify. Strengths are plain ordered
/// integers; the named tiers below cover normal use, but nothing stops a
/// caller from picking a value in between.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Strength(pub i32);

impl Strength {
    /// Yields to everything else.
    pub const VERY_WEAK: Self = Self(0);
    /// Weak; used for automatically inserted handles.
    pub const WEAK: Self = Self(10);
    /// The default strength.
    pub const NORMAL: Self = Self(20);
    /// Stronger than user-level edits.
    pub const STRONG: Self = Self(30);
    /// Used for structural geometry such as element corner handles.
    pub const VERY_STRONG: Self = Self(40);
    /// Never modified by the solver.
    pub const REQUIRED: Self = Self(100);
}

impl Default for Strength {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Identifier for a variable in a [`Solver`](crate::Solver).
///
/// A small, copyable generational handle: a slot index plus a generation
/// counter. It stays stable for the lifetime of the variable and becomes
/// invalid when the variable is removed; a reused slot gets a higher
/// generation, so stale ids never alias a live variable.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct VariableId(pub(crate) u32, pub(crate) u32);

impl VariableId {
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

/// Stored state of a single variable.
#[derive(Copy, Clone, Debug)]
pub(crate) struct VariableSlot {
    pub(crate) value: f64,
    pub(crate) strength: Strength,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_ordering() {
        assert!(Strength::VERY_WEAK < Strength::WEAK);
        assert!(Strength::WEAK < Strength::NORMAL);
        assert!(Strength::NORMAL < Strength::STRONG);
        assert!(Strength::STRONG < Strength::VERY_STRONG);
        assert!(Strength::VERY_STRONG < Strength::REQUIRED);
        assert_eq!(Strength::default(), Strength::NORMAL);
    }

    #[test]
    fn custom_strength_between_tiers() {
        let s = Strength(25);
        assert!(Strength::NORMAL < s && s < Strength::STRONG);
    }
}
