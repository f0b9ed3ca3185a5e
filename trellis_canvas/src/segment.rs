// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Splitting and merging line segments.
//!
//! Both operations edit a line's handle and port lists in place,
//! regenerate its orthogonal constraints, and re-glue any connection that
//! targets the line so incoming handles snap to the nearest surviving
//! port.

use kurbo::Point;
use trellis_solver::Strength;

use crate::canvas::Canvas;
use crate::handle::{Handle, HandleFlags, HandleId};
use crate::item::ItemId;
use crate::line::LineError;
use crate::port::{LinePort, Port, PortId};

/// Errors from segment editing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SegmentError {
    /// The item is not a line.
    #[error("item is not a line")]
    NotALine,
    /// The segment index does not name a segment.
    #[error("segment index out of range")]
    InvalidSegment,
    /// Fewer than two segments were asked for, or the range runs off the
    /// end of the line.
    #[error("invalid segment count")]
    InvalidCount,
    /// A line's last segment cannot be merged away.
    #[error("cannot merge a line with a single segment")]
    SingleSegment,
    /// An orthogonal line keeps at least two segments.
    #[error("cannot merge an orthogonal line down that far")]
    OrthogonalMerge,
}

impl From<LineError> for SegmentError {
    fn from(_: LineError) -> Self {
        Self::NotALine
    }
}

impl Canvas {
    /// Split segment `segment` of a line into `count` equal pieces.
    ///
    /// New handles are `WEAK` so the solver prefers moving them over
    /// user-placed geometry. Returns the created handle and port ids.
    pub fn split_segment(
        &mut self,
        item: ItemId,
        segment: usize,
        count: usize,
    ) -> Result<(Vec<HandleId>, Vec<PortId>), SegmentError> {
        assert!(self.is_alive(item), "stale item id {item:?}");
        {
            let line = self.item(item).as_line().ok_or(SegmentError::NotALine)?;
            if segment >= line.base().ports().len() {
                return Err(SegmentError::InvalidSegment);
            }
            if count < 2 {
                return Err(SegmentError::InvalidCount);
            }
        }

        self.do_split(item, segment, count);

        let orthogonal = self.item(item).as_line().unwrap().orthogonal();
        self.update_orthogonal_constraints(item, orthogonal)?;
        self.recreate_connection_constraints(item);
        self.request_update(item, true, true);

        let line = self.item(item).as_line().unwrap();
        let handles = line.base().handles()[segment + 1..segment + count]
            .iter()
            .map(|(id, _)| *id)
            .collect();
        let ports = line.base().ports()[segment..segment + count - 1]
            .iter()
            .map(|(id, _)| *id)
            .collect();
        Ok((handles, ports))
    }

    fn do_split(&mut self, item: ItemId, segment: usize, count: usize) {
        let (p0, p1, midpoint) = {
            let (item_ref, solver) = self.item_and_solver_mut(item);
            let line = item_ref.as_line().unwrap();
            let handles = line.base().handles();
            let p0 = handles[segment].1.pos();
            let p1 = handles[segment + 1].1.pos();
            let a = p0.point(solver);
            let b = p1.point(solver);
            #[allow(
                clippy::cast_precision_loss,
                reason = "segment counts are tiny"
            )]
            let n = count as f64;
            (
                p0,
                p1,
                Point::new(a.x + (b.x - a.x) / n, a.y + (b.y - a.y) / n),
            )
        };

        let handle = Handle::new(
            self.solver_mut(),
            midpoint,
            Strength::WEAK,
            HandleFlags::default(),
        );
        let new_pos = handle.pos();
        {
            let Self {
                items, connections, ..
            } = self;
            let base = items[item.idx()].as_mut().unwrap().base_mut();
            base.insert_handle(connections, segment + 1, handle);
            let old_port = base.ports()[segment].0;
            base.remove_port(old_port);
            base.insert_port(connections, segment, Port::Line(LinePort::new(p0, new_pos)));
            base.insert_port(
                connections,
                segment + 1,
                Port::Line(LinePort::new(new_pos, p1)),
            );
        }

        if count > 2 {
            self.do_split(item, segment + 1, count - 1);
        }
    }

    /// Merge `count` consecutive segments, starting at `segment`, into
    /// one.
    ///
    /// The interior handles are disconnected, removed, and their
    /// variables freed. Returns the removed handle and port ids.
    pub fn merge_segment(
        &mut self,
        item: ItemId,
        segment: usize,
        count: usize,
    ) -> Result<(Vec<HandleId>, Vec<PortId>), SegmentError> {
        assert!(self.is_alive(item), "stale item id {item:?}");
        let was_orthogonal = {
            let line = self.item(item).as_line().ok_or(SegmentError::NotALine)?;
            let ports = line.base().ports().len();
            if ports < 2 {
                return Err(SegmentError::SingleSegment);
            }
            if line.orthogonal() && ports < 1 + count {
                return Err(SegmentError::OrthogonalMerge);
            }
            if segment >= ports {
                return Err(SegmentError::InvalidSegment);
            }
            if count < 2 || segment + count > ports {
                return Err(SegmentError::InvalidCount);
            }
            line.orthogonal()
        };

        let (deleted_handles, deleted_ports) = {
            let line = self.item(item).as_line().unwrap();
            let handles: Vec<HandleId> = line.base().handles()[segment + 1..segment + count]
                .iter()
                .map(|(id, _)| *id)
                .collect();
            let ports: Vec<PortId> = line.base().ports()[segment..segment + count]
                .iter()
                .map(|(id, _)| *id)
                .collect();
            (handles, ports)
        };

        // Constraints over doomed handles go first, then the rows.
        self.update_orthogonal_constraints(item, false)?;
        for &handle in &deleted_handles {
            self.connections_mut().disconnect_item(item, Some(handle));
        }

        {
            let Self {
                items, connections, ..
            } = self;
            let base = items[item.idx()].as_mut().unwrap().base_mut();
            for &handle_id in &deleted_handles {
                if let Some(handle) = base.remove_handle(handle_id) {
                    handle.pos().release(connections.solver_mut());
                }
            }
            for &port_id in &deleted_ports {
                base.remove_port(port_id);
            }
            let p0 = base.handles()[segment].1.pos();
            let p1 = base.handles()[segment + 1].1.pos();
            base.insert_port(connections, segment, Port::Line(LinePort::new(p0, p1)));
        }

        self.update_orthogonal_constraints(item, was_orthogonal)?;
        self.recreate_connection_constraints(item);
        self.request_update(item, true, true);
        Ok((deleted_handles, deleted_ports))
    }

    /// Re-glue every connection targeting `connected`: each incoming
    /// handle snaps to the closest port and gets a fresh constraint.
    pub(crate) fn recreate_connection_constraints(&mut self, connected: ItemId) {
        let rows: Vec<(ItemId, HandleId)> = self
            .connections()
            .get_connections(None, None, Some(connected), None)
            .filter_map(|row| row.handle.map(|handle| (row.item, handle)))
            .collect();
        for (line_item, handle) in rows {
            let local = {
                let matrix = self.matrix_i2i(line_item, connected);
                let pos = self
                    .item(line_item)
                    .base()
                    .handle(handle)
                    .expect("row references a live handle")
                    .pos();
                matrix.transform_point(pos.point(self.solver()))
            };
            let best = {
                let solver = self.solver();
                let mut best: Option<(PortId, f64)> = None;
                for (port_id, port) in self.item(connected).ports() {
                    let (_, distance) = port.glue(solver, local);
                    if best.is_none_or(|(_, d)| distance < d) {
                        best = Some((*port_id, distance));
                    }
                }
                best.map(|(port, _)| port)
            };
            if let Some(port) = best {
                let constraint = self.port_constraint(connected, port, line_item, handle);
                let _ = self
                    .connections_mut()
                    .reconnect_item(line_item, handle, Some(port), Some(constraint));
            }
        }
    }
}
