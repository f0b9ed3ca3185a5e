// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The canvas: item container, update pipeline, and view fan-out.
//!
//! A canvas composes the item arena, the scene [`Tree`], and the
//! [`Connections`] registry (which owns the [`Solver`]). Mutations queue
//! dirty items; [`Canvas::update_now`] runs the update pipeline:
//!
//! 1. extend the dirty set with the ancestors of every dirty item,
//! 2. visit them deepest-first for the pre-update hook,
//! 3. recompose item-to-canvas matrices,
//! 4. solve the constraints,
//! 5. run the post-update hook,
//!
//! and registered views are told what changed so they can re-index and
//! repaint.

use hashbrown::HashSet;
use trellis_solver::constraints::EqualsConstraint;
use trellis_solver::{
    Constraint, ConstraintId, HandlerId, Matrix, Relation, Solver,
};

use crate::connections::{ConnectError, Connections};
use crate::draw::UpdateContext;
use crate::handle::HandleId;
use crate::item::{Item, ItemId};
use crate::line::LineError;
use crate::port::PortId;
use crate::tree::Tree;

/// Notification fired by the canvas, synchronously, as the scene changes.
#[derive(Debug, Clone)]
pub enum CanvasEvent {
    /// An item joined the scene.
    ItemAdded {
        /// The new item.
        item: ItemId,
        /// Its parent, or `None` for a root.
        parent: Option<ItemId>,
    },
    /// An item (and its subtree, child events first) left the scene.
    ItemRemoved {
        /// The removed item.
        item: ItemId,
    },
    /// An item moved to a new parent.
    ItemReparented {
        /// The moved item.
        item: ItemId,
        /// The new parent.
        parent: Option<ItemId>,
    },
    /// An update was requested for an item.
    UpdateRequested {
        /// The dirty item.
        item: ItemId,
        /// Whether the item itself needs an update.
        update: bool,
        /// Whether its matrix needs recomposition.
        matrix: bool,
    },
}

/// What a registered view must implement.
///
/// Views typically maintain a spatial index over the items' bounding
/// boxes and schedule repaints; the canvas only tells them what changed.
pub trait View {
    /// Called with every change notification.
    fn request_update(
        &mut self,
        dirty_items: &[ItemId],
        dirty_matrix_items: &[ItemId],
        removed_items: &[ItemId],
    );
}

/// Token returned by view registration.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ViewId(u64);

type Handler = Box<dyn FnMut(&CanvasEvent)>;

/// Container for items, their tree structure, and their connections.
pub struct Canvas {
    pub(crate) items: Vec<Option<Item>>,
    generations: Vec<u32>,
    free_items: Vec<usize>,
    tree: Tree<ItemId>,
    pub(crate) connections: Connections,
    dirty_items: HashSet<ItemId>,
    dirty_matrix_items: HashSet<ItemId>,
    views: Vec<(ViewId, Box<dyn View>)>,
    next_view: u64,
    handlers: Vec<(HandlerId, Handler)>,
    next_handler: u64,
    updating: bool,
}

impl core::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Canvas")
            .field("items", &self.tree.nodes().len())
            .field("dirty_items", &self.dirty_items.len())
            .field("connections", &self.connections)
            .field("views", &self.views.len())
            .finish_non_exhaustive()
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    /// An empty canvas.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generations: Vec::new(),
            free_items: Vec::new(),
            tree: Tree::new(),
            connections: Connections::new(),
            dirty_items: HashSet::new(),
            dirty_matrix_items: HashSet::new(),
            views: Vec::new(),
            next_view: 0,
            handlers: Vec::new(),
            next_handler: 0,
            updating: false,
        }
    }

    /// The connections registry.
    #[must_use]
    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    /// Mutable access to the connections registry.
    ///
    /// Also the way to the solver while constructing items.
    pub fn connections_mut(&mut self) -> &mut Connections {
        &mut self.connections
    }

    /// The solver.
    #[must_use]
    pub fn solver(&self) -> &Solver {
        self.connections.solver()
    }

    /// Mutable access to the solver.
    pub fn solver_mut(&mut self) -> &mut Solver {
        self.connections.solver_mut()
    }

    // --- item lifecycle ---

    /// Add an item to the canvas, under `parent` (or as a root) at the
    /// optional sibling index. The item's pending internal constraints are
    /// registered under its new id and an update is queued.
    pub fn add(&mut self, item: Item, parent: Option<ItemId>, index: Option<usize>) -> ItemId {
        let id = if let Some(idx) = self.free_items.pop() {
            let generation = self.generations[idx].wrapping_add(1);
            self.generations[idx] = generation;
            self.items[idx] = Some(item);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "item ids use 32-bit indices by design"
            )]
            ItemId::new(idx as u32, generation)
        } else {
            self.items.push(Some(item));
            self.generations.push(1);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "item ids use 32-bit indices by design"
            )]
            ItemId::new((self.items.len() - 1) as u32, 1)
        };
        self.tree.add(id, parent, index);
        let pending = self.items[id.idx()]
            .as_mut()
            .unwrap()
            .take_pending_constraints();
        for constraint in pending {
            self.connections.add_constraint(id, constraint);
        }
        self.emit(&CanvasEvent::ItemAdded { item: id, parent });
        self.request_update(id, true, true);
        id
    }

    /// Remove an item: children first, then its connections (both sides),
    /// then its solver resources, then the tree node.
    ///
    /// Panics when handed a stale id.
    pub fn remove(&mut self, item: ItemId) {
        assert!(self.is_alive(item), "item is not on the canvas");
        let children: Vec<ItemId> = self.tree.get_children(Some(item)).to_vec();
        for child in children.into_iter().rev() {
            self.remove(child);
        }
        self.connections.remove_connections_to_item(item);
        {
            let Self {
                items, connections, ..
            } = self;
            items[item.idx()]
                .as_ref()
                .unwrap()
                .release(connections.solver_mut());
        }
        self.tree.remove(item);
        self.items[item.idx()] = None;
        self.free_items.push(item.idx());
        self.dirty_items.remove(&item);
        self.dirty_matrix_items.remove(&item);
        self.emit(&CanvasEvent::ItemRemoved { item });
        self.notify_views(&[], &[], &[item]);
    }

    /// Move an item (and its subtree) under a new parent.
    pub fn reparent(&mut self, item: ItemId, parent: Option<ItemId>, index: Option<usize>) {
        assert!(self.is_alive(item), "item is not on the canvas");
        self.tree.reparent(item, parent, index);
        self.emit(&CanvasEvent::ItemReparented { item, parent });
        self.request_update(item, true, true);
    }

    /// Whether `item` refers to a live item.
    #[must_use]
    pub fn is_alive(&self, item: ItemId) -> bool {
        self.items.get(item.idx()).is_some_and(Option::is_some)
            && self.generations[item.idx()] == item.generation()
    }

    /// Borrow an item. Panics when handed a stale id.
    #[must_use]
    pub fn item(&self, item: ItemId) -> &Item {
        assert!(self.is_alive(item), "stale item id {item:?}");
        self.items[item.idx()].as_ref().unwrap()
    }

    /// Borrow an item mutably. Panics when handed a stale id.
    pub fn item_mut(&mut self, item: ItemId) -> &mut Item {
        assert!(self.is_alive(item), "stale item id {item:?}");
        self.items[item.idx()].as_mut().unwrap()
    }

    /// Borrow an item together with the solver.
    ///
    /// The split borrow is what item accessors want: read the item's ids,
    /// write values through the solver.
    pub fn item_and_solver_mut(&mut self, item: ItemId) -> (&Item, &mut Solver) {
        assert!(self.is_alive(item), "stale item id {item:?}");
        let Self {
            items, connections, ..
        } = self;
        (
            items[item.idx()].as_ref().unwrap(),
            connections.solver_mut(),
        )
    }

    // --- traversal ---

    /// Every item, in depth-first (render) order.
    #[must_use]
    pub fn get_all_items(&self) -> &[ItemId] {
        self.tree.nodes()
    }

    /// The items at the root of the scene.
    #[must_use]
    pub fn get_root_items(&self) -> &[ItemId] {
        self.tree.get_children(None)
    }

    /// The parent of an item, or `None` for roots.
    #[must_use]
    pub fn get_parent(&self, item: ItemId) -> Option<ItemId> {
        self.tree.get_parent(item)
    }

    /// Direct children of an item.
    #[must_use]
    pub fn get_children(&self, item: ItemId) -> &[ItemId] {
        self.tree.get_children(Some(item))
    }

    /// Parent, grandparent, and so on, nearest first.
    pub fn get_ancestors(&self, item: ItemId) -> impl Iterator<Item = ItemId> + '_ {
        self.tree.get_ancestors(item)
    }

    /// Children, their children, and so on, depth first.
    #[must_use]
    pub fn get_all_children(&self, item: ItemId) -> Vec<ItemId> {
        self.tree.get_all_children(item)
    }

    /// Filter `items` into canvas traversal order.
    pub fn sort(&self, items: impl IntoIterator<Item = ItemId>) -> Vec<ItemId> {
        self.tree.order(items)
    }

    // --- matrices ---

    /// The item-to-canvas matrix, composed fresh from the local matrices
    /// along the parent chain.
    #[must_use]
    pub fn get_matrix_i2c(&self, item: ItemId) -> Matrix {
        let solver = self.connections.solver();
        let mut matrix = solver.matrix(self.item(item).matrix());
        for ancestor in self.tree.get_ancestors(item) {
            matrix = matrix.multiply(solver.matrix(self.item(ancestor).matrix()));
        }
        matrix
    }

    /// The transform from `from`'s space into `to`'s space, built from the
    /// item-to-canvas matrices of the last update.
    #[must_use]
    pub fn matrix_i2i(&self, from: ItemId, to: ItemId) -> Matrix {
        let solver = self.connections.solver();
        let i2c = solver.matrix(self.item(from).matrix_i2c());
        let c2i = solver.matrix(self.item(to).matrix_i2c()).inverse();
        i2c.multiply(c2i)
    }

    // --- connecting ---

    /// Build the glue constraint for connecting `item`'s `handle` to
    /// `port` of `connected`.
    ///
    /// The same constraint shape [`Connections::connect_item`] expects;
    /// exposed so callers can inspect or wrap it first.
    pub fn port_constraint(
        &mut self,
        connected: ItemId,
        port: PortId,
        item: ItemId,
        handle: HandleId,
    ) -> Constraint {
        assert!(self.is_alive(connected), "stale item id {connected:?}");
        assert!(self.is_alive(item), "stale item id {item:?}");
        let Self {
            items, connections, ..
        } = self;
        let glue_item = items[connected.idx()].as_ref().unwrap();
        let host = items[item.idx()].as_ref().unwrap();
        let port_ref = glue_item.base().port(port).expect("no such port");
        let handle_ref = host.base().handle(handle).expect("no such handle");
        port_ref.constraint(
            connections.solver_mut(),
            host.base().matrix_i2c(),
            handle_ref.pos(),
            glue_item.base().matrix_i2c(),
        )
    }

    /// Connect `item`'s `handle` to `port` of `connected` with the port's
    /// own glue constraint.
    pub fn connect(
        &mut self,
        item: ItemId,
        handle: HandleId,
        connected: ItemId,
        port: PortId,
    ) -> Result<Option<ConstraintId>, ConnectError> {
        let constraint = self.port_constraint(connected, port, item, handle);
        self.connections
            .connect_item(item, handle, connected, port, Some(constraint), None)
    }

    // --- line operations ---

    /// Turn orthogonal mode on or off for a line.
    ///
    /// Enabling requires at least three handles.
    pub fn set_orthogonal(&mut self, item: ItemId, orthogonal: bool) -> Result<(), LineError> {
        assert!(self.is_alive(item), "stale item id {item:?}");
        {
            let line = self.item(item).as_line().ok_or(LineError::NotALine)?;
            if orthogonal && line.base().handles().len() < 3 {
                return Err(LineError::TooFewHandles);
            }
        }
        self.update_orthogonal_constraints(item, orthogonal)
    }

    /// Flip which axis the first orthogonal segment follows. Rebuilds the
    /// orthogonal constraints when active.
    pub fn set_horizontal(&mut self, item: ItemId, horizontal: bool) -> Result<(), LineError> {
        assert!(self.is_alive(item), "stale item id {item:?}");
        let orthogonal = {
            let line = self
                .item_mut(item)
                .as_line_mut()
                .ok_or(LineError::NotALine)?;
            line.horizontal = horizontal;
            line.orthogonal()
        };
        self.update_orthogonal_constraints(item, orthogonal)
    }

    /// Drop a line's orthogonal constraints and, when `orthogonal`,
    /// regenerate them from the current handle list.
    pub(crate) fn update_orthogonal_constraints(
        &mut self,
        item: ItemId,
        orthogonal: bool,
    ) -> Result<(), LineError> {
        let old = {
            let line = self
                .item_mut(item)
                .as_line_mut()
                .ok_or(LineError::NotALine)?;
            core::mem::take(&mut line.orthogonal_constraints)
        };
        for constraint in old {
            self.connections.remove_constraint(item, constraint);
        }
        if !orthogonal {
            return Ok(());
        }

        let (pairs, horizontal) = {
            let line = self.item(item).as_line().unwrap();
            let positions: Vec<_> = line
                .base()
                .handles()
                .iter()
                .map(|(_, h)| h.pos())
                .collect();
            let pairs: Vec<_> = positions.windows(2).map(|w| (w[0], w[1])).collect();
            (pairs, line.horizontal())
        };
        let phase = usize::from(horizontal);
        let mut created = Vec::with_capacity(pairs.len());
        for (index, (p0, p1)) in pairs.into_iter().enumerate() {
            let relation = if index % 2 == phase {
                Relation::Equals(EqualsConstraint::new(p0.x, p1.x))
            } else {
                Relation::Equals(EqualsConstraint::new(p0.y, p1.y))
            };
            let constraint = Constraint::new(self.connections.solver(), relation);
            created.push(self.connections.add_constraint(item, constraint));
        }
        self.item_mut(item)
            .as_line_mut()
            .unwrap()
            .orthogonal_constraints = created;
        Ok(())
    }

    // --- update pipeline ---

    /// Queue an update for an item and notify registered views.
    pub fn request_update(&mut self, item: ItemId, update: bool, matrix: bool) {
        if update {
            self.dirty_items.insert(item);
        }
        if matrix {
            self.dirty_matrix_items.insert(item);
        }
        self.emit(&CanvasEvent::UpdateRequested {
            item,
            update,
            matrix,
        });
        match (update, matrix) {
            (true, true) => self.notify_views(&[item], &[item], &[]),
            (true, false) => self.notify_views(&[item], &[], &[]),
            (false, true) => self.notify_views(&[], &[item], &[]),
            (false, false) => {}
        }
    }

    /// Queue a matrix-only update.
    pub fn request_matrix_update(&mut self, item: ItemId) {
        self.request_update(item, false, true);
    }

    /// Run the update pipeline over the queued dirty sets.
    pub fn update(&mut self) {
        let dirty: Vec<ItemId> = self.dirty_items.iter().copied().collect();
        let dirty_matrix: Vec<ItemId> = self.dirty_matrix_items.iter().copied().collect();
        self.update_now(&dirty, &dirty_matrix);
    }

    /// Run the update pipeline over explicit dirty sets.
    ///
    /// Re-entrant calls return immediately. Solver failures (including
    /// juggling) are logged and the cycle completes; the processed items
    /// leave the queued dirty sets either way.
    pub fn update_now(&mut self, dirty_items: &[ItemId], dirty_matrix_items: &[ItemId]) {
        if self.updating {
            return;
        }
        self.updating = true;

        // Ancestors participate: their matrices feed the recomposition.
        let mut expanded: HashSet<ItemId> = HashSet::new();
        for &item in dirty_items {
            if !self.is_alive(item) {
                continue;
            }
            expanded.insert(item);
            for ancestor in self.tree.get_ancestors(item) {
                expanded.insert(ancestor);
            }
        }
        let mut ordered = self.tree.order(expanded.iter().copied());
        ordered.reverse();

        let mut context = UpdateContext::new();
        {
            let Self {
                items, connections, ..
            } = self;
            for &id in &ordered {
                if let Some(item) = items[id.idx()].as_mut() {
                    item.pre_update(connections.solver_mut(), &mut context);
                }
            }
        }

        // Matrix-dirty items drag their whole subtree along; a child's
        // item-to-canvas matrix depends on every ancestor.
        let mut recompose: Vec<ItemId> = Vec::new();
        let mut seen: HashSet<ItemId> = HashSet::new();
        let push = |id: ItemId, out: &mut Vec<ItemId>, seen: &mut HashSet<ItemId>| {
            if seen.insert(id) {
                out.push(id);
            }
        };
        for &item in dirty_items {
            if self.is_alive(item) {
                push(item, &mut recompose, &mut seen);
            }
        }
        for &item in dirty_matrix_items {
            if !self.is_alive(item) {
                continue;
            }
            push(item, &mut recompose, &mut seen);
            for child in self.tree.get_all_children(item) {
                push(child, &mut recompose, &mut seen);
            }
        }
        for &id in &recompose {
            let composed = self.get_matrix_i2c(id);
            let slot = self.item(id).matrix_i2c();
            self.connections.solver_mut().set_matrix(slot, composed);
        }

        if let Err(error) = self.connections.solve() {
            log::error!("canvas update failed to solve constraints: {error}");
        }

        {
            let Self {
                items, connections, ..
            } = self;
            for &id in &ordered {
                if let Some(item) = items[id.idx()].as_mut() {
                    item.post_update(connections.solver_mut(), &mut context);
                }
            }
        }

        for item in dirty_items.iter().chain(dirty_matrix_items) {
            self.dirty_items.remove(item);
            self.dirty_matrix_items.remove(item);
        }
        self.updating = false;
    }

    // --- views and handlers ---

    /// Register a view; it is told about every subsequent change.
    pub fn register_view(&mut self, view: Box<dyn View>) -> ViewId {
        self.next_view += 1;
        let id = ViewId(self.next_view);
        self.views.push((id, view));
        id
    }

    /// Unregister a view, returning it.
    pub fn unregister_view(&mut self, id: ViewId) -> Option<Box<dyn View>> {
        let index = self.views.iter().position(|(v, _)| *v == id)?;
        Some(self.views.remove(index).1)
    }

    fn notify_views(&mut self, dirty: &[ItemId], dirty_matrix: &[ItemId], removed: &[ItemId]) {
        for (_, view) in &mut self.views {
            view.request_update(dirty, dirty_matrix, removed);
        }
    }

    /// Register a handler for canvas events. Handlers fire synchronously,
    /// in registration order, before the mutating call returns.
    pub fn add_handler(&mut self, handler: impl FnMut(&CanvasEvent) + 'static) -> HandlerId {
        self.next_handler += 1;
        let id = HandlerId::from_raw(self.next_handler);
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Unregister a handler. Returns whether it was registered.
    pub fn remove_handler(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(h, _)| *h != id);
        self.handlers.len() != before
    }

    fn emit(&mut self, event: &CanvasEvent) {
        for (_, handler) in &mut self.handlers {
            handler(event);
        }
    }
}
