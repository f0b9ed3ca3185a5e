// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The connections registry: who is connected to whom, through what.
//!
//! Each row links a connecting item's handle to a connected item's port,
//! with the constraint that enforces the glue and an optional callback
//! fired on disconnect. Rows are indexed on all four columns so lookups by
//! handle, by item, or by the connected side stay cheap. The registry owns
//! the [`Solver`]: every constraint in a row is registered there, and rows
//! with a null handle/port carry an item's internal ("free") constraints
//! so they are cleaned up with the item.

use hashbrown::HashMap;
use smallvec::SmallVec;
use trellis_solver::{Constraint, ConstraintId, HandlerId, JuggleError, Solver};

use crate::handle::HandleId;
use crate::item::ItemId;
use crate::port::PortId;

/// Callback invoked when a connection is broken.
pub type DisconnectCallback = Box<dyn FnOnce()>;

/// Errors from connect and reconnect operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    /// The handle already has a connection; disconnect it first.
    #[error("handle is already connected")]
    AlreadyConnected,
    /// No existing connection to update.
    #[error("no connection registered for this handle")]
    NotConnected,
}

/// One row of the registry.
pub struct Connection {
    /// The connecting item (the line).
    pub item: ItemId,
    /// The connecting item's handle; `None` for free constraints.
    pub handle: Option<HandleId>,
    /// The connected item (the box); `None` for free constraints.
    pub connected: Option<ItemId>,
    /// The connected item's port; `None` for free constraints.
    pub port: Option<PortId>,
    /// The constraint keeping the connection in place.
    pub constraint: Option<ConstraintId>,
    pub(crate) callback: Option<DisconnectCallback>,
}

impl core::fmt::Debug for Connection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Connection")
            .field("item", &self.item)
            .field("handle", &self.handle)
            .field("connected", &self.connected)
            .field("port", &self.port)
            .field("constraint", &self.constraint)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Notification fired by the registry, synchronously, as rows change.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// A handle was connected to a port.
    Connected {
        /// The connecting item.
        item: ItemId,
        /// The connecting handle.
        handle: HandleId,
        /// The connected item.
        connected: ItemId,
        /// The connected port.
        port: PortId,
    },
    /// A row was removed (its callback has already run).
    Disconnected {
        /// The connecting item.
        item: ItemId,
        /// The connecting handle, if the row had one.
        handle: Option<HandleId>,
        /// The connected item, if the row had one.
        connected: Option<ItemId>,
        /// The connected port, if the row had one.
        port: Option<PortId>,
    },
    /// A row's port and/or constraint was swapped in place.
    Reconnected {
        /// The connecting item.
        item: ItemId,
        /// The connecting handle.
        handle: HandleId,
    },
    /// A free constraint was registered for an item.
    ConstraintAdded {
        /// The owning item.
        item: ItemId,
        /// The registered constraint.
        constraint: ConstraintId,
    },
    /// A free constraint was removed.
    ConstraintRemoved {
        /// The owning item.
        item: ItemId,
        /// The removed constraint.
        constraint: ConstraintId,
    },
}

type Handler = Box<dyn FnMut(&ConnectionEvent)>;

/// The registry of connections between items, owner of the solver.
pub struct Connections {
    solver: Solver,
    rows: Vec<Option<Connection>>,
    free_rows: Vec<usize>,
    by_item: HashMap<ItemId, SmallVec<[usize; 2]>>,
    by_handle: HashMap<HandleId, usize>,
    by_connected: HashMap<ItemId, SmallVec<[usize; 2]>>,
    by_port: HashMap<PortId, SmallVec<[usize; 1]>>,
    next_handle: u32,
    next_port: u32,
    handlers: Vec<(HandlerId, Handler)>,
    next_handler: u64,
}

impl core::fmt::Debug for Connections {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Connections")
            .field("rows", &self.rows.iter().filter(|r| r.is_some()).count())
            .field("solver", &self.solver)
            .finish_non_exhaustive()
    }
}

impl Default for Connections {
    fn default() -> Self {
        Self::new()
    }
}

impl Connections {
    /// An empty registry with a fresh solver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            solver: Solver::new(),
            rows: Vec::new(),
            free_rows: Vec::new(),
            by_item: HashMap::new(),
            by_handle: HashMap::new(),
            by_connected: HashMap::new(),
            by_port: HashMap::new(),
            next_handle: 0,
            next_port: 0,
            handlers: Vec::new(),
            next_handler: 0,
        }
    }

    /// The solver all connection constraints live in.
    #[must_use]
    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    /// Mutable access to the solver.
    pub fn solver_mut(&mut self) -> &mut Solver {
        &mut self.solver
    }

    /// Resolve all marked constraints.
    pub fn solve(&mut self) -> Result<(), JuggleError> {
        self.solver.solve()
    }

    /// Allocate a canvas-unique handle id.
    pub fn allocate_handle_id(&mut self) -> HandleId {
        let id = HandleId(self.next_handle);
        self.next_handle += 1;
        id
    }

    /// Allocate a canvas-unique port id.
    pub fn allocate_port_id(&mut self) -> PortId {
        let id = PortId(self.next_port);
        self.next_port += 1;
        id
    }

    // --- handlers ---

    /// Register a handler for registry events. Handlers fire
    /// synchronously, in registration order, before the mutating call
    /// returns.
    pub fn add_handler(&mut self, handler: impl FnMut(&ConnectionEvent) + 'static) -> HandlerId {
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

    fn emit(&mut self, event: &ConnectionEvent) {
        for (_, handler) in &mut self.handlers {
            handler(event);
        }
    }

    // --- connecting ---

    /// Connect `item`'s `handle` to `port` of `connected`.
    ///
    /// The constraint, when given, is registered in the solver; the
    /// callback is invoked when the connection is broken. Fails when the
    /// handle already has a row.
    pub fn connect_item(
        &mut self,
        item: ItemId,
        handle: HandleId,
        connected: ItemId,
        port: PortId,
        constraint: Option<Constraint>,
        callback: Option<DisconnectCallback>,
    ) -> Result<Option<ConstraintId>, ConnectError> {
        if self.by_handle.contains_key(&handle) {
            return Err(ConnectError::AlreadyConnected);
        }
        let constraint = constraint.map(|c| self.solver.add_constraint(c));
        self.insert_row(Connection {
            item,
            handle: Some(handle),
            connected: Some(connected),
            port: Some(port),
            constraint,
            callback,
        });
        self.emit(&ConnectionEvent::Connected {
            item,
            handle,
            connected,
            port,
        });
        Ok(constraint)
    }

    /// Break the connections of `item`; with a handle, only that one.
    ///
    /// For every matching row the constraint is removed from the solver
    /// and the callback invoked.
    pub fn disconnect_item(&mut self, item: ItemId, handle: Option<HandleId>) {
        let matching: Vec<usize> = self
            .row_indices_for_item(item)
            .into_iter()
            .filter(|&i| {
                let row = self.rows[i].as_ref().unwrap();
                handle.is_none() || row.handle == handle
            })
            .collect();
        for index in matching {
            self.remove_row(index);
        }
    }

    /// Swap the port and/or constraint of an existing connection.
    ///
    /// The old constraint leaves the solver; the new one (when given) is
    /// registered. The connected item and the callback stay.
    pub fn reconnect_item(
        &mut self,
        item: ItemId,
        handle: HandleId,
        port: Option<PortId>,
        constraint: Option<Constraint>,
    ) -> Result<Option<ConstraintId>, ConnectError> {
        let index = *self
            .by_handle
            .get(&handle)
            .ok_or(ConnectError::NotConnected)?;
        if self.rows[index].as_ref().unwrap().item != item {
            return Err(ConnectError::NotConnected);
        }
        let old_constraint = self.rows[index].as_ref().unwrap().constraint;
        if let Some(old) = old_constraint
            && let Some(removed) = self.solver.remove_constraint(old)
        {
            removed.release_projected(&mut self.solver);
        }
        let new_constraint = constraint.map(|c| self.solver.add_constraint(c));
        {
            let old_port = self.rows[index].as_ref().unwrap().port;
            if let Some(new_port) = port
                && old_port != Some(new_port)
            {
                if let Some(old_port) = old_port
                    && let Some(indices) = self.by_port.get_mut(&old_port)
                {
                    indices.retain(|i| *i != index);
                }
                self.by_port.entry(new_port).or_default().push(index);
                self.rows[index].as_mut().unwrap().port = Some(new_port);
            }
            self.rows[index].as_mut().unwrap().constraint = new_constraint;
        }
        self.emit(&ConnectionEvent::Reconnected { item, handle });
        Ok(new_constraint)
    }

    /// Remove every row that references `item`, on either side.
    pub fn remove_connections_to_item(&mut self, item: ItemId) {
        let mut matching = self.row_indices_for_item(item);
        for &index in self.by_connected.get(&item).into_iter().flatten() {
            if !matching.contains(&index) {
                matching.push(index);
            }
        }
        for index in matching {
            self.remove_row(index);
        }
    }

    // --- free constraints ---

    /// Register a constraint owned by `item` but not tied to a handle.
    ///
    /// Used for an item's internal geometry (an element's rectangle and
    /// minimum size, a line's orthogonality). The row guarantees cleanup
    /// when the item is removed.
    pub fn add_constraint(&mut self, item: ItemId, constraint: Constraint) -> ConstraintId {
        let constraint = self.solver.add_constraint(constraint);
        self.insert_row(Connection {
            item,
            handle: None,
            connected: None,
            port: None,
            constraint: Some(constraint),
            callback: None,
        });
        self.emit(&ConnectionEvent::ConstraintAdded { item, constraint });
        constraint
    }

    /// Remove a free constraint of `item`.
    pub fn remove_constraint(&mut self, item: ItemId, constraint: ConstraintId) {
        if let Some(removed) = self.solver.remove_constraint(constraint) {
            removed.release_projected(&mut self.solver);
        }
        let index = self.row_indices_for_item(item).into_iter().find(|&i| {
            let row = self.rows[i].as_ref().unwrap();
            row.handle.is_none() && row.constraint == Some(constraint)
        });
        if let Some(index) = index {
            self.take_row(index);
            self.emit(&ConnectionEvent::ConstraintRemoved { item, constraint });
        }
    }

    // --- queries ---

    /// The row holding `handle`, if connected. At most one exists.
    #[must_use]
    pub fn get_connection(&self, handle: HandleId) -> Option<&Connection> {
        let index = *self.by_handle.get(&handle)?;
        self.rows[index].as_ref()
    }

    /// Rows matching all the given columns.
    ///
    /// With no filters this iterates every row; with filters the most
    /// selective index seeds the scan.
    pub fn get_connections(
        &self,
        item: Option<ItemId>,
        handle: Option<HandleId>,
        connected: Option<ItemId>,
        port: Option<PortId>,
    ) -> impl Iterator<Item = &Connection> {
        let candidates: Vec<usize> = if let Some(handle) = handle {
            self.by_handle.get(&handle).copied().into_iter().collect()
        } else if let Some(port) = port {
            self.by_port
                .get(&port)
                .map(|v| v.to_vec())
                .unwrap_or_default()
        } else if let Some(item) = item {
            self.row_indices_for_item(item)
        } else if let Some(connected) = connected {
            self.by_connected
                .get(&connected)
                .map(|v| v.to_vec())
                .unwrap_or_default()
        } else {
            (0..self.rows.len())
                .filter(|&i| self.rows[i].is_some())
                .collect()
        };
        candidates.into_iter().filter_map(move |i| {
            let row = self.rows[i].as_ref()?;
            let keep = item.is_none_or(|v| row.item == v)
                && handle.is_none_or(|v| row.handle == Some(v))
                && connected.is_none_or(|v| row.connected == Some(v))
                && port.is_none_or(|v| row.port == Some(v));
            keep.then_some(row)
        })
    }

    // --- internals ---

    fn row_indices_for_item(&self, item: ItemId) -> Vec<usize> {
        self.by_item
            .get(&item)
            .map(|v| v.to_vec())
            .unwrap_or_default()
    }

    fn insert_row(&mut self, row: Connection) {
        let index = match self.free_rows.pop() {
            Some(index) => index,
            None => {
                self.rows.push(None);
                self.rows.len() - 1
            }
        };
        self.by_item.entry(row.item).or_default().push(index);
        if let Some(handle) = row.handle {
            self.by_handle.insert(handle, index);
        }
        if let Some(connected) = row.connected {
            self.by_connected.entry(connected).or_default().push(index);
        }
        if let Some(port) = row.port {
            self.by_port.entry(port).or_default().push(index);
        }
        self.rows[index] = Some(row);
    }

    /// Detach a row from all indices and return it.
    fn take_row(&mut self, index: usize) -> Connection {
        let row = self.rows[index].take().expect("row already removed");
        self.free_rows.push(index);
        if let Some(indices) = self.by_item.get_mut(&row.item) {
            indices.retain(|i| *i != index);
            if indices.is_empty() {
                self.by_item.remove(&row.item);
            }
        }
        if let Some(handle) = row.handle {
            self.by_handle.remove(&handle);
        }
        if let Some(connected) = row.connected {
            if let Some(indices) = self.by_connected.get_mut(&connected) {
                indices.retain(|i| *i != index);
                if indices.is_empty() {
                    self.by_connected.remove(&connected);
                }
            }
        }
        if let Some(port) = row.port {
            if let Some(indices) = self.by_port.get_mut(&port) {
                indices.retain(|i| *i != index);
                if indices.is_empty() {
                    self.by_port.remove(&port);
                }
            }
        }
        row
    }

    /// Remove a row the disconnect way: drop the constraint, run the
    /// callback, notify.
    fn remove_row(&mut self, index: usize) {
        let mut row = self.take_row(index);
        if let Some(constraint) = row.constraint
            && let Some(removed) = self.solver.remove_constraint(constraint)
        {
            removed.release_projected(&mut self.solver);
        }
        if let Some(callback) = row.callback.take() {
            callback();
        }
        self.emit(&ConnectionEvent::Disconnected {
            item: row.item,
            handle: row.handle,
            connected: row.connected,
            port: row.port,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use trellis_solver::constraints::EqualsConstraint;
    use trellis_solver::{Relation, Strength};

    fn item(n: u32) -> ItemId {
        ItemId::new(n, 1)
    }

    fn dummy_constraint(connections: &mut Connections) -> Constraint {
        let solver = connections.solver_mut();
        let a = solver.add_variable(0.0, Strength::NORMAL);
        let b = solver.add_variable(1.0, Strength::NORMAL);
        Constraint::new(solver, Relation::Equals(EqualsConstraint::new(a, b)))
    }

    #[test]
    fn connect_and_lookup() {
        let mut connections = Connections::new();
        let handle = connections.allocate_handle_id();
        let port = connections.allocate_port_id();
        let constraint = dummy_constraint(&mut connections);
        let cid = connections
            .connect_item(item(1), handle, item(2), port, Some(constraint), None)
            .unwrap()
            .unwrap();

        assert!(connections.solver().constraint_alive(cid));
        let row = connections.get_connection(handle).unwrap();
        assert_eq!(row.item, item(1));
        assert_eq!(row.connected, Some(item(2)));
        assert_eq!(row.port, Some(port));
        assert_eq!(row.constraint, Some(cid));
    }

    #[test]
    fn double_connect_fails() {
        let mut connections = Connections::new();
        let handle = connections.allocate_handle_id();
        let port = connections.allocate_port_id();
        connections
            .connect_item(item(1), handle, item(2), port, None, None)
            .unwrap();
        let err = connections
            .connect_item(item(1), handle, item(3), port, None, None)
            .unwrap_err();
        assert_eq!(err, ConnectError::AlreadyConnected);
    }

    #[test]
    fn disconnect_removes_constraint_and_runs_callback_once() {
        let mut connections = Connections::new();
        let handle = connections.allocate_handle_id();
        let port = connections.allocate_port_id();
        let constraint = dummy_constraint(&mut connections);
        let calls = Rc::new(Cell::new(0));
        let callback_calls = Rc::clone(&calls);
        let cid = connections
            .connect_item(
                item(1),
                handle,
                item(2),
                port,
                Some(constraint),
                Some(Box::new(move || callback_calls.set(callback_calls.get() + 1))),
            )
            .unwrap()
            .unwrap();

        connections.disconnect_item(item(1), Some(handle));
        assert_eq!(calls.get(), 1);
        assert!(!connections.solver().constraint_alive(cid));
        assert!(connections.get_connection(handle).is_none());

        // Disconnecting again is a no-op.
        connections.disconnect_item(item(1), Some(handle));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn reconnect_swaps_port_and_constraint() {
        let mut connections = Connections::new();
        let handle = connections.allocate_handle_id();
        let port = connections.allocate_port_id();
        let other_port = connections.allocate_port_id();
        let first = dummy_constraint(&mut connections);
        let old_cid = connections
            .connect_item(item(1), handle, item(2), port, Some(first), None)
            .unwrap()
            .unwrap();

        let second = dummy_constraint(&mut connections);
        let new_cid = connections
            .reconnect_item(item(1), handle, Some(other_port), Some(second))
            .unwrap()
            .unwrap();

        assert!(!connections.solver().constraint_alive(old_cid));
        assert!(connections.solver().constraint_alive(new_cid));
        let row = connections.get_connection(handle).unwrap();
        assert_eq!(row.port, Some(other_port));
        assert_eq!(row.connected, Some(item(2)), "connected side is kept");

        // Port index followed the swap.
        assert_eq!(
            connections
                .get_connections(None, None, None, Some(other_port))
                .count(),
            1
        );
        assert_eq!(
            connections
                .get_connections(None, None, None, Some(port))
                .count(),
            0
        );
    }

    #[test]
    fn reconnect_unknown_handle_fails() {
        let mut connections = Connections::new();
        let handle = connections.allocate_handle_id();
        let err = connections
            .reconnect_item(item(1), handle, None, None)
            .unwrap_err();
        assert_eq!(err, ConnectError::NotConnected);
    }

    #[test]
    fn remove_connections_to_item_hits_both_sides() {
        let mut connections = Connections::new();
        let h1 = connections.allocate_handle_id();
        let h2 = connections.allocate_handle_id();
        let h3 = connections.allocate_handle_id();
        let p = connections.allocate_port_id();
        // 1 -> 2, 2 -> 3, 3 -> 1; removing 2 must drop the first two rows.
        connections
            .connect_item(item(1), h1, item(2), p, None, None)
            .unwrap();
        connections
            .connect_item(item(2), h2, item(3), p, None, None)
            .unwrap();
        connections
            .connect_item(item(3), h3, item(1), p, None, None)
            .unwrap();

        connections.remove_connections_to_item(item(2));
        assert!(connections.get_connection(h1).is_none());
        assert!(connections.get_connection(h2).is_none());
        assert!(connections.get_connection(h3).is_some());
    }

    #[test]
    fn free_constraints_are_rows_without_handles() {
        let mut connections = Connections::new();
        let constraint = dummy_constraint(&mut connections);
        let cid = connections.add_constraint(item(1), constraint);
        assert!(connections.solver().constraint_alive(cid));
        assert_eq!(
            connections.get_connections(Some(item(1)), None, None, None).count(),
            1
        );

        connections.remove_constraint(item(1), cid);
        assert!(!connections.solver().constraint_alive(cid));
        assert_eq!(
            connections.get_connections(Some(item(1)), None, None, None).count(),
            0
        );
    }

    #[test]
    fn free_constraints_go_away_with_the_item() {
        let mut connections = Connections::new();
        let constraint = dummy_constraint(&mut connections);
        let cid = connections.add_constraint(item(1), constraint);
        connections.remove_connections_to_item(item(1));
        assert!(!connections.solver().constraint_alive(cid));
    }

    #[test]
    fn query_intersects_all_given_columns() {
        let mut connections = Connections::new();
        let h1 = connections.allocate_handle_id();
        let h2 = connections.allocate_handle_id();
        let p1 = connections.allocate_port_id();
        let p2 = connections.allocate_port_id();
        connections
            .connect_item(item(1), h1, item(2), p1, None, None)
            .unwrap();
        connections
            .connect_item(item(1), h2, item(2), p2, None, None)
            .unwrap();

        assert_eq!(
            connections.get_connections(Some(item(1)), None, None, None).count(),
            2
        );
        assert_eq!(
            connections
                .get_connections(Some(item(1)), None, Some(item(2)), Some(p2))
                .count(),
            1
        );
        assert_eq!(
            connections
                .get_connections(Some(item(2)), None, None, None)
                .count(),
            0
        );
        assert_eq!(
            connections.get_connections(None, None, Some(item(2)), None).count(),
            2
        );
    }

    #[test]
    fn events_fire_for_connect_and_disconnect() {
        let mut connections = Connections::new();
        let log = Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        connections.add_handler(move |event| {
            let tag = match event {
                ConnectionEvent::Connected { .. } => "connect",
                ConnectionEvent::Disconnected { .. } => "disconnect",
                ConnectionEvent::Reconnected { .. } => "reconnect",
                ConnectionEvent::ConstraintAdded { .. } => "add",
                ConnectionEvent::ConstraintRemoved { .. } => "remove",
            };
            sink.borrow_mut().push(tag);
        });

        let handle = connections.allocate_handle_id();
        let port = connections.allocate_port_id();
        connections
            .connect_item(item(1), handle, item(2), port, None, None)
            .unwrap();
        connections
            .reconnect_item(item(1), handle, None, None)
            .unwrap();
        connections.disconnect_item(item(1), Some(handle));
        assert_eq!(*log.borrow(), vec!["connect", "reconnect", "disconnect"]);
    }
}
