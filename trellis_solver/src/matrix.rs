// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Affine matrices with the cairo-style coefficient layout.
//!
//! [`Matrix`] is a plain value; matrices that participate in change
//! notification are stored in the [`Solver`](crate::Solver) arena and
//! addressed by [`MatrixId`]. Mutating a stored matrix through the solver
//! fires handlers and re-marks dependent projection constraints.

use kurbo::{Affine, Point, Vec2};

use crate::variable::EPSILON;

/// A 2D affine transform with coefficients `[xx, yx, xy, yy, x0, y0]`.
///
/// The layout and the operation set follow the cairo matrix conventions:
/// `translate`, `rotate`, and `scale` apply the new operation *before* the
/// existing transform, and [`Matrix::multiply`] composes left-to-right
/// ("apply `self`, then `other`").
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Matrix(Affine);

impl Matrix {
    /// The identity transform.
    pub const IDENTITY: Self = Self(Affine::IDENTITY);

    /// Create a matrix from the six cairo-style coefficients.
    pub const fn new(xx: f64, yx: f64, xy: f64, yy: f64, x0: f64, y0: f64) -> Self {
        Self(Affine::new([xx, yx, xy, yy, x0, y0]))
    }

    /// Create a matrix from a kurbo [`Affine`].
    pub const fn from_affine(affine: Affine) -> Self {
        Self(affine)
    }

    /// The underlying kurbo [`Affine`].
    pub const fn as_affine(self) -> Affine {
        self.0
    }

    /// The coefficients as `[xx, yx, xy, yy, x0, y0]`.
    pub fn coeffs(self) -> [f64; 6] {
        self.0.as_coeffs()
    }

    /// Translate by `(tx, ty)`, applied before the existing transform.
    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.0 = self.0 * Affine::translate(Vec2::new(tx, ty));
    }

    /// Rotate by `radians`, applied before the existing transform.
    pub fn rotate(&mut self, radians: f64) {
        self.0 = self.0 * Affine::rotate(radians);
    }

    /// Scale by `(sx, sy)`, applied before the existing transform.
    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.0 = self.0 * Affine::scale_non_uniform(sx, sy);
    }

    /// Replace this matrix with its inverse.
    ///
    /// The matrix must be invertible; a singular matrix yields non-finite
    /// coefficients.
    pub fn invert(&mut self) {
        self.0 = self.0.inverse();
    }

    /// The inverse as a new matrix, leaving `self` untouched.
    pub fn inverse(self) -> Self {
        Self(self.0.inverse())
    }

    /// Compose two transforms: apply `self` first, then `other`.
    pub fn multiply(self, other: Self) -> Self {
        Self(other.0 * self.0)
    }

    /// Transform a point.
    pub fn transform_point(self, point: Point) -> Point {
        self.0 * point
    }

    /// Transform a distance vector, ignoring the translation part.
    pub fn transform_distance(self, distance: Vec2) -> Vec2 {
        let [xx, yx, xy, yy, _, _] = self.0.as_coeffs();
        Vec2::new(
            xx * distance.x + xy * distance.y,
            yx * distance.x + yy * distance.y,
        )
    }

    /// Whether all coefficients of `self` and `other` are within `eps`.
    pub fn approx_eq(self, other: Self, eps: f64) -> bool {
        self.coeffs()
            .iter()
            .zip(other.coeffs().iter())
            .all(|(a, b)| (a - b).abs() <= eps)
    }

    /// Whether the two matrices differ by more than the solver tolerance.
    pub(crate) fn differs(self, other: Self) -> bool {
        !self.approx_eq(other, EPSILON)
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Affine> for Matrix {
    fn from(affine: Affine) -> Self {
        Self(affine)
    }
}

/// Identifier for a matrix stored in a [`Solver`](crate::Solver).
///
/// Generational, like [`VariableId`](crate::VariableId).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct MatrixId(pub(crate) u32, pub(crate) u32);

impl MatrixId {
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
