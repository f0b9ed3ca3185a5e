// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The item model: the sum type over built-in and custom items, plus the
//! shared base every item composes.
//!
//! An item is a diagrammatic primitive: a local transform, an ordered set
//! of [`Handle`]s, an ordered set of [`Port`]s, a distance function for
//! hit testing, and hooks into the update and draw cycles. Built-in
//! variants cover boxes ([`Element`]) and polylines ([`Line`]); anything
//! else plugs in through the [`CustomItem`] capability trait.

use kurbo::Point;
use trellis_solver::{Constraint, Matrix, MatrixId, Solver};

use crate::connections::Connections;
use crate::draw::{DrawContext, UpdateContext};
use crate::element::Element;
use crate::handle::{Handle, HandleId};
use crate::line::Line;
use crate::port::{Port, PortId};

/// Identifier for an item registered in a [`Canvas`](crate::Canvas).
///
/// Generational: a removed item's id goes stale and is never resurrected
/// by slot reuse.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ItemId(pub(crate) u32, pub(crate) u32);

impl ItemId {
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

/// State every item composes: matrices, handles, and ports.
#[derive(Debug)]
pub struct ItemBase {
    matrix: MatrixId,
    matrix_i2c: MatrixId,
    handles: Vec<(HandleId, Handle)>,
    ports: Vec<(PortId, Port)>,
}

impl ItemBase {
    /// Allocate the base with identity matrices and no handles or ports.
    pub fn new(connections: &mut Connections) -> Self {
        let solver = connections.solver_mut();
        Self {
            matrix: solver.add_matrix(Matrix::IDENTITY),
            matrix_i2c: solver.add_matrix(Matrix::IDENTITY),
            handles: Vec::new(),
            ports: Vec::new(),
        }
    }

    /// The item-local transform.
    pub fn matrix(&self) -> MatrixId {
        self.matrix
    }

    /// The composed item-to-canvas transform, maintained by the canvas.
    pub fn matrix_i2c(&self) -> MatrixId {
        self.matrix_i2c
    }

    /// Handles in their stable order.
    pub fn handles(&self) -> &[(HandleId, Handle)] {
        &self.handles
    }

    /// Ports in their stable order.
    pub fn ports(&self) -> &[(PortId, Port)] {
        &self.ports
    }

    /// Look up a handle by id.
    pub fn handle(&self, id: HandleId) -> Option<&Handle> {
        self.handles.iter().find(|(h, _)| *h == id).map(|(_, h)| h)
    }

    /// Look up a handle by id, mutably.
    pub fn handle_mut(&mut self, id: HandleId) -> Option<&mut Handle> {
        self.handles
            .iter_mut()
            .find(|(h, _)| *h == id)
            .map(|(_, h)| h)
    }

    /// Look up a port by id.
    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.iter().find(|(p, _)| *p == id).map(|(_, p)| p)
    }

    /// Position of a handle in the ordered list.
    pub fn handle_index(&self, id: HandleId) -> Option<usize> {
        self.handles.iter().position(|(h, _)| *h == id)
    }

    /// Position of a port in the ordered list.
    pub fn port_index(&self, id: PortId) -> Option<usize> {
        self.ports.iter().position(|(p, _)| *p == id)
    }

    /// Append a handle, allocating its id.
    pub fn add_handle(&mut self, connections: &mut Connections, handle: Handle) -> HandleId {
        let id = connections.allocate_handle_id();
        self.handles.push((id, handle));
        id
    }

    /// Insert a handle at `index`, allocating its id.
    pub fn insert_handle(
        &mut self,
        connections: &mut Connections,
        index: usize,
        handle: Handle,
    ) -> HandleId {
        let id = connections.allocate_handle_id();
        self.handles.insert(index, (id, handle));
        id
    }

    /// Remove a handle. The handle's variables are not freed; the caller
    /// decides whether the position is still shared.
    pub fn remove_handle(&mut self, id: HandleId) -> Option<Handle> {
        let index = self.handle_index(id)?;
        Some(self.handles.remove(index).1)
    }

    /// Append a port, allocating its id.
    pub fn add_port(&mut self, connections: &mut Connections, port: Port) -> PortId {
        let id = connections.allocate_port_id();
        self.ports.push((id, port));
        id
    }

    /// Insert a port at `index`, allocating its id.
    pub fn insert_port(&mut self, connections: &mut Connections, index: usize, port: Port) -> PortId {
        let id = connections.allocate_port_id();
        self.ports.insert(index, (id, port));
        id
    }

    /// Remove a port.
    pub fn remove_port(&mut self, id: PortId) -> Option<Port> {
        let index = self.port_index(id)?;
        Some(self.ports.remove(index).1)
    }

    /// Free the solver resources the base owns: both matrices and every
    /// handle position.
    ///
    /// Ports built over handle positions own nothing extra; items holding
    /// private positions free those themselves.
    pub fn release(&self, solver: &mut Solver) {
        for (_, handle) in &self.handles {
            handle.pos().release(solver);
        }
        solver.remove_matrix(self.matrix);
        solver.remove_matrix(self.matrix_i2c);
    }
}

/// Capability trait for items defined outside this crate.
///
/// Implementors compose an [`ItemBase`] and answer the item protocol;
/// the default hook implementations do nothing.
pub trait CustomItem: core::fmt::Debug {
    /// The composed base state.
    fn base(&self) -> &ItemBase;

    /// The composed base state, mutably.
    fn base_mut(&mut self) -> &mut ItemBase;

    /// Signed distance from `point` (item coordinates) to the item:
    /// 0 inside, positive outside.
    fn point(&self, solver: &Solver, point: Point) -> f64;

    /// Hook called before matrices are recomposed and constraints solved.
    fn pre_update(&mut self, _solver: &mut Solver, _context: &mut UpdateContext) {}

    /// Hook called after the solve; geometry is consistent here.
    fn post_update(&mut self, _solver: &mut Solver, _context: &mut UpdateContext) {}

    /// Render through the supplied context.
    fn draw(&self, _solver: &Solver, _context: &mut DrawContext<'_>) {}

    /// Constraints to register (owned by this item) when it joins a
    /// canvas.
    fn take_pending_constraints(&mut self) -> Vec<Constraint> {
        Vec::new()
    }

    /// Free owned solver resources. Implementations owning positions or
    /// variables beyond the base must free those too.
    fn release(&self, solver: &mut Solver) {
        self.base().release(solver);
    }
}

/// A scene item.
#[derive(Debug)]
pub enum Item {
    /// A rectangular element with four corner handles and edge ports.
    Element(Element),
    /// A polyline with connectable end handles.
    Line(Line),
    /// An externally defined item.
    Custom(Box<dyn CustomItem>),
}

impl Item {
    /// The composed base state.
    pub fn base(&self) -> &ItemBase {
        match self {
            Self::Element(element) => element.base(),
            Self::Line(line) => line.base(),
            Self::Custom(custom) => custom.base(),
        }
    }

    /// The composed base state, mutably.
    pub fn base_mut(&mut self) -> &mut ItemBase {
        match self {
            Self::Element(element) => element.base_mut(),
            Self::Line(line) => line.base_mut(),
            Self::Custom(custom) => custom.base_mut(),
        }
    }

    /// The item-local transform.
    pub fn matrix(&self) -> MatrixId {
        self.base().matrix()
    }

    /// The composed item-to-canvas transform.
    pub fn matrix_i2c(&self) -> MatrixId {
        self.base().matrix_i2c()
    }

    /// Handles in their stable order.
    pub fn handles(&self) -> &[(HandleId, Handle)] {
        self.base().handles()
    }

    /// Ports in their stable order.
    pub fn ports(&self) -> &[(PortId, Port)] {
        self.base().ports()
    }

    /// Signed distance from `point` (item coordinates) to the item.
    pub fn point(&self, solver: &Solver, point: Point) -> f64 {
        match self {
            Self::Element(element) => element.point(solver, point),
            Self::Line(line) => line.point(solver, point),
            Self::Custom(custom) => custom.point(solver, point),
        }
    }

    pub(crate) fn pre_update(&mut self, solver: &mut Solver, context: &mut UpdateContext) {
        match self {
            Self::Element(_) | Self::Line(_) => {}
            Self::Custom(custom) => custom.pre_update(solver, context),
        }
    }

    pub(crate) fn post_update(&mut self, solver: &mut Solver, context: &mut UpdateContext) {
        match self {
            Self::Element(_) => {}
            Self::Line(line) => line.post_update(solver),
            Self::Custom(custom) => custom.post_update(solver, context),
        }
    }

    /// Render the item.
    pub fn draw(&self, solver: &Solver, context: &mut DrawContext<'_>) {
        match self {
            Self::Element(element) => element.draw(solver, context),
            Self::Line(line) => line.draw(solver, context),
            Self::Custom(custom) => custom.draw(solver, context),
        }
    }

    pub(crate) fn take_pending_constraints(&mut self) -> Vec<Constraint> {
        match self {
            Self::Element(element) => element.take_pending_constraints(),
            Self::Line(_) => Vec::new(),
            Self::Custom(custom) => custom.take_pending_constraints(),
        }
    }

    pub(crate) fn release(&self, solver: &mut Solver) {
        match self {
            Self::Element(element) => element.release(solver),
            Self::Line(line) => line.base().release(solver),
            Self::Custom(custom) => custom.release(solver),
        }
    }

    /// Downcast to an element.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Downcast to an element, mutably.
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Downcast to a line.
    pub fn as_line(&self) -> Option<&Line> {
        match self {
            Self::Line(line) => Some(line),
            _ => None,
        }
    }

    /// Downcast to a line, mutably.
    pub fn as_line_mut(&mut self) -> Option<&mut Line> {
        match self {
            Self::Line(line) => Some(line),
            _ => None,
        }
    }
}
