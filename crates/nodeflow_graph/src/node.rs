// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node endpoints that connections attach to.
//!
//! A [`Node`] owns its data model, the bookkeeping of which connections sit
//! on each port ([`NodeState`]) and the geometry used to place port anchors
//! in the scene. Connections never own nodes; they hold a [`NodeId`] and
//! resolve it through a [`NodeStore`].

use crate::connection::ConnectionId;
use crate::data::{NodeDataType, Payload};
use crate::port::{PortIndex, PortType};
use egui::emath::TSTransform;
use egui::Pos2;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Behaviour behind a node: its ports and what it does with incoming data
pub trait NodeDataModel: fmt::Debug {
    /// Model name
    fn name(&self) -> &str;

    /// Number of ports on a side
    fn n_ports(&self, side: PortType) -> usize;

    /// Data type declared by a port
    fn data_type(&self, side: PortType, index: PortIndex) -> Option<NodeDataType>;

    /// Receive data on an input port; `None` clears it
    fn set_in_data(&mut self, data: Payload, index: PortIndex);

    /// Current data on an output port
    fn out_data(&self, index: PortIndex) -> Payload;
}

/// Connections attached to each port of a node
#[derive(Debug, Clone, Default)]
pub struct NodeState {
    in_connections: Vec<IndexSet<ConnectionId>>,
    out_connections: Vec<IndexSet<ConnectionId>>,
}

impl NodeState {
    /// Create empty bookkeeping for the model's ports
    pub fn new(model: &dyn NodeDataModel) -> Self {
        Self {
            in_connections: vec![IndexSet::new(); model.n_ports(PortType::In)],
            out_connections: vec![IndexSet::new(); model.n_ports(PortType::Out)],
        }
    }

    fn entries(&self, side: PortType) -> &[IndexSet<ConnectionId>] {
        match side {
            PortType::In => &self.in_connections,
            PortType::Out => &self.out_connections,
            PortType::None => &[],
        }
    }

    fn entries_mut(&mut self, side: PortType) -> Option<&mut Vec<IndexSet<ConnectionId>>> {
        match side {
            PortType::In => Some(&mut self.in_connections),
            PortType::Out => Some(&mut self.out_connections),
            PortType::None => None,
        }
    }

    /// Connections on a port
    pub fn connections(&self, side: PortType, index: PortIndex) -> impl Iterator<Item = ConnectionId> + '_ {
        index
            .slot()
            .and_then(|slot| self.entries(side).get(slot))
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Record a connection on a port
    pub fn set_connection(&mut self, side: PortType, index: PortIndex, id: ConnectionId) -> bool {
        let Some(slot) = index.slot() else {
            return false;
        };
        self.entries_mut(side)
            .and_then(|entries| entries.get_mut(slot))
            .is_some_and(|set| set.insert(id))
    }

    /// Forget a connection on a port; returns whether it was recorded
    pub fn erase_connection(&mut self, side: PortType, index: PortIndex, id: ConnectionId) -> bool {
        let Some(slot) = index.slot() else {
            return false;
        };
        self.entries_mut(side)
            .and_then(|entries| entries.get_mut(slot))
            .is_some_and(|set| set.shift_remove(&id))
    }

    /// Check if any connection sits on a port
    pub fn is_port_connected(&self, side: PortType, index: PortIndex) -> bool {
        self.connections(side, index).next().is_some()
    }

    /// Every connection on the node, inputs first
    pub fn all_connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.in_connections
            .iter()
            .chain(self.out_connections.iter())
            .flat_map(|set| set.iter().copied())
    }
}

/// Port layout of a node in node-local coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeGeometry {
    /// Node width
    pub width: f32,
    /// Height of the caption above the first port
    pub caption_height: f32,
    /// Height of one port entry
    pub entry_height: f32,
    /// Vertical gap between port entries
    pub spacing: f32,
}

impl Default for NodeGeometry {
    fn default() -> Self {
        Self {
            width: 180.0,
            caption_height: 24.0,
            entry_height: 18.0,
            spacing: 4.0,
        }
    }
}

impl NodeGeometry {
    /// Port anchor in node-local coordinates
    pub fn port_node_position(&self, index: PortIndex, side: PortType) -> Option<Pos2> {
        let slot = index.slot()?;
        let step = self.entry_height + self.spacing;
        let y = self.caption_height + step * slot as f32 + step / 2.0;

        match side {
            PortType::In => Some(Pos2::new(0.0, y)),
            PortType::Out => Some(Pos2::new(self.width, y)),
            PortType::None => None,
        }
    }

    /// Port anchor mapped into the scene through the node's transform
    pub fn port_scene_position(
        &self,
        index: PortIndex,
        side: PortType,
        transform: &TSTransform,
    ) -> Option<Pos2> {
        self.port_node_position(index, side)
            .map(|pos| transform.mul_pos(pos))
    }
}

/// A node instance in the graph
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    model: Box<dyn NodeDataModel>,
    state: NodeState,
    geometry: NodeGeometry,
    /// Top-left corner in the scene
    position: Pos2,
    refresh_requests: usize,
}

impl Node {
    /// Create a node around a data model
    pub fn new(model: Box<dyn NodeDataModel>) -> Self {
        let state = NodeState::new(model.as_ref());
        Self {
            id: NodeId::new(),
            model,
            state,
            geometry: NodeGeometry::default(),
            position: Pos2::ZERO,
            refresh_requests: 0,
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Pos2::new(x, y);
        self
    }

    /// Set the port layout
    pub fn with_geometry(mut self, geometry: NodeGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Data model
    pub fn data_model(&self) -> &dyn NodeDataModel {
        self.model.as_ref()
    }

    /// Mutable data model
    pub fn data_model_mut(&mut self) -> &mut dyn NodeDataModel {
        self.model.as_mut()
    }

    /// Connection bookkeeping
    pub fn state(&self) -> &NodeState {
        &self.state
    }

    /// Mutable connection bookkeeping
    pub fn state_mut(&mut self) -> &mut NodeState {
        &mut self.state
    }

    /// Port layout
    pub fn geometry(&self) -> &NodeGeometry {
        &self.geometry
    }

    /// Position in the scene
    pub fn position(&self) -> Pos2 {
        self.position
    }

    /// Move the node
    pub fn set_position(&mut self, position: Pos2) {
        self.position = position;
    }

    /// Transform from node-local to scene coordinates
    pub fn scene_transform(&self) -> TSTransform {
        TSTransform::from_translation(self.position.to_vec2())
    }

    /// Port anchor in the scene
    pub fn port_scene_position(&self, index: PortIndex, side: PortType) -> Option<Pos2> {
        self.geometry
            .port_scene_position(index, side, &self.scene_transform())
    }

    /// Check if `index` addresses a port on `side`
    pub fn has_port(&self, side: PortType, index: PortIndex) -> bool {
        side.is_side() && index.fits(self.model.n_ports(side))
    }

    /// Feed data into an input port
    pub fn propagate_data(&mut self, data: Payload, index: PortIndex) {
        tracing::trace!(node = %self.id, %index, empty = data.is_none(), "propagating data into node");
        self.model.set_in_data(data, index);
    }

    /// Ask the scene to repaint this node
    pub fn request_visual_refresh(&mut self) {
        self.refresh_requests += 1;
    }

    /// Number of repaint requests received so far
    pub fn refresh_requests(&self) -> usize {
        self.refresh_requests
    }
}

/// Lookup of nodes by ID
pub trait NodeStore {
    /// Get a node
    fn node(&self, id: NodeId) -> Option<&Node>;

    /// Get a mutable node
    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node>;
}

impl NodeStore for IndexMap<NodeId, Node> {
    fn node(&self, id: NodeId) -> Option<&Node> {
        self.get(&id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.get_mut(&id)
    }
}
