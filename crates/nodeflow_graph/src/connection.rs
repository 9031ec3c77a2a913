// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) between an output port and an input port.
//!
//! A connection starts either half-bound (one end attached, the other end
//! being dragged by the user) or fully bound (both ends attached, e.g. when a
//! saved graph is loaded). The dragged end is the *required* side tracked by
//! [`ConnectionState`].
//!
//! Connections refer to their nodes by [`NodeId`] and resolve them through a
//! [`NodeStore`] supplied by the owner for every call that has to reach a
//! node. The owner must call [`Connection::detach_from_nodes`] and then
//! [`Connection::dispose`] when removing a connection; a handle left pointing
//! at a removed node is the owner's bug and is skipped with a warning.

use crate::data::{NodeDataType, Payload};
use crate::geometry::ConnectionGeometry;
use crate::graphics::{GraphicsHandle, WeakGraphicsHandle};
use crate::node::{Node, NodeId, NodeStore};
use crate::port::{PortIndex, PortType};
use crate::state::ConnectionState;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Handle returned by [`Connection::on_updated`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type UpdatedCallback = Box<dyn FnMut(ConnectionId)>;

/// Persisted form of a fully bound connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Input node ID, hyphenated
    pub in_id: String,
    /// Input port index
    pub in_index: i32,
    /// Output node ID, hyphenated
    pub out_id: String,
    /// Output port index
    pub out_index: i32,
}

impl ConnectionRecord {
    /// Convert to a JSON object
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("in_id".to_string(), Value::from(self.in_id.clone()));
        map.insert("in_index".to_string(), Value::from(self.in_index));
        map.insert("out_id".to_string(), Value::from(self.out_id.clone()));
        map.insert("out_index".to_string(), Value::from(self.out_index));
        map
    }

    /// Read from a JSON object
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, ConnectionError> {
        serde_json::from_value(Value::Object(map.clone()))
            .map_err(|e| ConnectionError::MalformedRecord(e.to_string()))
    }

    /// Parse both node IDs as `(in, out)`
    pub fn node_ids(&self) -> Result<(NodeId, NodeId), ConnectionError> {
        let parse = |text: &str| {
            Uuid::parse_str(text)
                .map(NodeId)
                .map_err(|e| ConnectionError::MalformedRecord(format!("bad node id {text:?}: {e}")))
        };
        Ok((parse(&self.in_id)?, parse(&self.out_id)?))
    }
}

/// Arguments for [`Connection::create`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRequest {
    /// One end attached, the opposite end required
    Dangling {
        /// Side the node is attached on
        side: PortType,
        /// Attached node
        node: NodeId,
        /// Attached port
        index: PortIndex,
    },
    /// Both ends attached
    Bound {
        /// Input node
        node_in: NodeId,
        /// Input port
        index_in: PortIndex,
        /// Output node
        node_out: NodeId,
        /// Output port
        index_out: PortIndex,
    },
}

/// A connection between two ports
pub struct Connection {
    id: ConnectionId,
    in_node: Option<NodeId>,
    out_node: Option<NodeId>,
    in_port_index: PortIndex,
    out_port_index: PortIndex,
    state: ConnectionState,
    geometry: ConnectionGeometry,
    graphics: Option<WeakGraphicsHandle>,
    observers: Vec<(ObserverId, UpdatedCallback)>,
    next_observer: u64,
}

impl Connection {
    fn unbound() -> Self {
        Self {
            id: ConnectionId::new(),
            in_node: None,
            out_node: None,
            in_port_index: PortIndex::INVALID,
            out_port_index: PortIndex::INVALID,
            state: ConnectionState::new(),
            geometry: ConnectionGeometry::default(),
            graphics: None,
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    /// Create a half-bound connection anchored at `node` on `side`.
    ///
    /// The opposite side becomes the required side.
    pub fn dangling(side: PortType, node: &Node, index: PortIndex) -> Result<Self, ConnectionError> {
        check_port(node, side, index)?;

        let mut connection = Self::unbound();
        connection.attach(node.id(), side, index);
        connection.state.set_required_side(side.opposite());

        tracing::debug!(
            connection = %connection.id,
            node = %node.id(),
            %side,
            %index,
            "created dangling connection"
        );
        Ok(connection)
    }

    /// Create a fully bound connection
    pub fn new(
        node_in: &Node,
        index_in: PortIndex,
        node_out: &Node,
        index_out: PortIndex,
    ) -> Result<Self, ConnectionError> {
        check_port(node_in, PortType::In, index_in)?;
        check_port(node_out, PortType::Out, index_out)?;

        let mut connection = Self::unbound();
        connection.attach(node_in.id(), PortType::In, index_in);
        connection.attach(node_out.id(), PortType::Out, index_out);

        tracing::debug!(
            connection = %connection.id,
            node_in = %node_in.id(),
            %index_in,
            node_out = %node_out.id(),
            %index_out,
            "created connection"
        );
        Ok(connection)
    }

    /// Create a connection from a request, resolving nodes through `nodes`
    pub fn create(request: ConnectionRequest, nodes: &impl NodeStore) -> Result<Self, ConnectionError> {
        match request {
            ConnectionRequest::Dangling { side, node, index } => {
                Self::dangling(side, resolve(nodes, node)?, index)
            }
            ConnectionRequest::Bound {
                node_in,
                index_in,
                node_out,
                index_out,
            } => Self::new(
                resolve(nodes, node_in)?,
                index_in,
                resolve(nodes, node_out)?,
                index_out,
            ),
        }
    }

    /// Recreate a saved connection
    pub fn restore(record: &ConnectionRecord, nodes: &impl NodeStore) -> Result<Self, ConnectionError> {
        let (node_in, node_out) = record.node_ids()?;
        Self::create(
            ConnectionRequest::Bound {
                node_in,
                index_in: PortIndex(record.in_index),
                node_out,
                index_out: PortIndex(record.out_index),
            },
            nodes,
        )
    }

    /// Connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    fn attach(&mut self, node: NodeId, side: PortType, index: PortIndex) {
        match side {
            PortType::In => {
                self.in_node = Some(node);
                self.in_port_index = index;
            }
            PortType::Out => {
                self.out_node = Some(node);
                self.out_port_index = index;
            }
            PortType::None => unreachable!("cannot attach a connection end to PortType::None"),
        }
    }

    /// Attach `side` to a node port and clear the required side.
    ///
    /// Fires the `updated` observers before returning.
    ///
    /// # Panics
    ///
    /// Panics if `side` is `PortType::None`.
    pub fn bind_port(&mut self, node: NodeId, side: PortType, index: PortIndex) {
        self.attach(node, side, index);
        self.state.set_no_required_side();

        tracing::debug!(connection = %self.id, %node, %side, %index, "bound connection end");
        self.notify_updated();
    }

    /// Detach `side` and mark it as the end being dragged.
    ///
    /// # Panics
    ///
    /// Panics if `side` is `PortType::None`.
    pub fn set_required_side(&mut self, side: PortType) {
        if side == PortType::None {
            unreachable!("cannot require PortType::None");
        }
        self.state.set_required_side(side);
        self.clear_side(side);

        tracing::debug!(connection = %self.id, %side, "connection end released for dragging");
    }

    /// Side still being dragged, `PortType::None` when fully bound
    pub fn required_side(&self) -> PortType {
        self.state.required_side()
    }

    /// Forget the node on `side` without touching the required side
    pub fn clear_side(&mut self, side: PortType) {
        match side {
            PortType::In => {
                self.in_node = None;
                self.in_port_index = PortIndex::INVALID;
            }
            PortType::Out => {
                self.out_node = None;
                self.out_port_index = PortIndex::INVALID;
            }
            PortType::None => {}
        }
    }

    /// Node on a side
    pub fn node(&self, side: PortType) -> Option<NodeId> {
        match side {
            PortType::In => self.in_node,
            PortType::Out => self.out_node,
            PortType::None => None,
        }
    }

    /// Port index on a side, `PortIndex::INVALID` when unbound
    pub fn port_index(&self, side: PortType) -> PortIndex {
        match side {
            PortType::In => self.in_port_index,
            PortType::Out => self.out_port_index,
            PortType::None => PortIndex::INVALID,
        }
    }

    /// Bound ends as `(side, node, index)`, input first
    pub fn bound_ends(&self) -> impl Iterator<Item = (PortType, NodeId, PortIndex)> + '_ {
        [PortType::In, PortType::Out]
            .into_iter()
            .filter_map(move |side| self.node(side).map(|node| (side, node, self.port_index(side))))
    }

    /// Check if both ends are bound
    pub fn is_complete(&self) -> bool {
        self.in_node.is_some() && self.out_node.is_some()
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.in_node == Some(node_id) || self.out_node == Some(node_id)
    }

    /// Remove this connection from the bookkeeping of both end nodes
    pub fn detach_from_nodes(&self, nodes: &mut impl NodeStore) {
        for (side, node_id, index) in self.bound_ends() {
            match nodes.node_mut(node_id) {
                Some(node) => {
                    node.state_mut().erase_connection(side, index, self.id);
                }
                None => {
                    tracing::warn!(connection = %self.id, node = %node_id, "detaching from missing node");
                }
            }
        }
    }

    /// Data type carried by the connection, read from the input end if bound
    pub fn data_type(&self, nodes: &impl NodeStore) -> Option<NodeDataType> {
        let (side, node_id, index) = self.bound_ends().next()?;
        nodes.node(node_id)?.data_model().data_type(side, index)
    }

    /// Deliver a payload to the input end, if bound
    pub fn propagate_data(&self, data: Payload, nodes: &mut impl NodeStore) {
        let Some(node_id) = self.in_node else {
            return;
        };
        match nodes.node_mut(node_id) {
            Some(node) => node.propagate_data(data, self.in_port_index),
            None => {
                tracing::warn!(connection = %self.id, node = %node_id, "propagating into missing node");
            }
        }
    }

    /// Clear the input end's data
    pub fn propagate_empty_data(&self, nodes: &mut impl NodeStore) {
        self.propagate_data(None, nodes);
    }

    /// Attach the scene object drawing this connection.
    ///
    /// A half-bound connection is placed at its anchored port so both ends
    /// start there.
    pub fn set_graphics_proxy(&mut self, proxy: &GraphicsHandle, nodes: &impl NodeStore) {
        self.graphics = Some(Rc::downgrade(proxy));
        let mut graphics = proxy.borrow_mut();

        if self.state.requires_side() {
            let attached = self.required_side().opposite();
            let anchor = self
                .node(attached)
                .and_then(|id| nodes.node(id))
                .and_then(|node| node.port_scene_position(self.port_index(attached), attached));

            if let Some(pos) = anchor {
                self.geometry.set_end_point(PortType::In, pos);
                self.geometry.set_end_point(PortType::Out, pos);
                graphics.set_pos(pos);
            }
        }

        graphics.refresh_layout();
    }

    /// Scene object drawing this connection, if still alive
    pub fn graphics(&self) -> Option<GraphicsHandle> {
        self.graphics.as_ref().and_then(std::rc::Weak::upgrade)
    }

    /// Move the end on `side` to its node's port and repaint.
    ///
    /// Returns `false` when that side is unbound.
    pub fn update_endpoint(&mut self, side: PortType, nodes: &impl NodeStore) -> bool {
        let anchor = self
            .node(side)
            .and_then(|id| nodes.node(id))
            .and_then(|node| node.port_scene_position(self.port_index(side), side));
        let Some(pos) = anchor else {
            return false;
        };

        self.geometry.set_end_point(side, pos);
        if let Some(graphics) = self.graphics() {
            graphics.borrow_mut().refresh_layout();
        }
        true
    }

    /// Interaction state
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Mutable interaction state
    pub fn state_mut(&mut self) -> &mut ConnectionState {
        &mut self.state
    }

    /// End point geometry
    pub fn geometry(&self) -> &ConnectionGeometry {
        &self.geometry
    }

    /// Mutable end point geometry
    pub fn geometry_mut(&mut self) -> &mut ConnectionGeometry {
        &mut self.geometry
    }

    /// Persisted form, `None` until both ends are bound
    pub fn record(&self) -> Option<ConnectionRecord> {
        Some(ConnectionRecord {
            in_id: self.in_node?.to_string(),
            in_index: self.in_port_index.0,
            out_id: self.out_node?.to_string(),
            out_index: self.out_port_index.0,
        })
    }

    /// Persisted form as a JSON object; empty until both ends are bound
    pub fn save(&self) -> Map<String, Value> {
        self.record()
            .map(|record| record.to_map())
            .unwrap_or_default()
    }

    /// Register a callback fired whenever an end gets bound.
    ///
    /// Callbacks run synchronously inside [`Connection::bind_port`] and must
    /// not reach back into this connection.
    pub fn on_updated(&mut self, callback: impl FnMut(ConnectionId) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(callback)));
        id
    }

    /// Unregister a callback
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer, _)| *observer != id);
        self.observers.len() != before
    }

    fn notify_updated(&mut self) {
        let id = self.id;
        for (_, callback) in &mut self.observers {
            callback(id);
        }
    }

    /// Tear the connection down.
    ///
    /// Clears the input end's data and asks both end nodes to repaint. This
    /// runs whether or not [`Connection::detach_from_nodes`] was called, and
    /// consumes the connection so it can only happen once.
    pub fn dispose(self, nodes: &mut impl NodeStore) {
        self.propagate_empty_data(nodes);

        for (_, node_id, _) in self.bound_ends() {
            if let Some(node) = nodes.node_mut(node_id) {
                node.request_visual_refresh();
            }
        }

        tracing::debug!(connection = %self.id, "disposed connection");
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("in_node", &self.in_node)
            .field("in_port_index", &self.in_port_index)
            .field("out_node", &self.out_node)
            .field("out_port_index", &self.out_port_index)
            .field("state", &self.state)
            .field("geometry", &self.geometry)
            .field("has_graphics", &self.graphics().is_some())
            .field("observers", &self.observers.len())
            .finish()
    }
}

fn resolve(nodes: &impl NodeStore, id: NodeId) -> Result<&Node, ConnectionError> {
    nodes.node(id).ok_or(ConnectionError::UnknownNode(id))
}

fn check_port(node: &Node, side: PortType, index: PortIndex) -> Result<(), ConnectionError> {
    if !side.is_side() {
        return Err(ConnectionError::NoSide);
    }
    if !node.has_port(side, index) {
        return Err(ConnectionError::PortOutOfRange {
            node: node.id(),
            side,
            index,
        });
    }
    Ok(())
}

/// Invalid arguments when creating a connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Side must be `In` or `Out`
    #[error("Port side must be In or Out")]
    NoSide,

    /// Port index outside the node's ports
    #[error("Node {node} has no {side} port {index}")]
    PortOutOfRange {
        /// Node
        node: NodeId,
        /// Side
        side: PortType,
        /// Requested index
        index: PortIndex,
    },

    /// Node not in the store
    #[error("Node not found: {0}")]
    UnknownNode(NodeId),

    /// Saved connection could not be read
    #[error("Malformed connection record: {0}")]
    MalformedRecord(String),
}
