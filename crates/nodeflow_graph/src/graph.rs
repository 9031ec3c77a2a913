// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph owning nodes and the connections between them.

use crate::connection::{Connection, ConnectionError, ConnectionId, ConnectionRecord};
use crate::data::NodeDataType;
use crate::node::{Node, NodeId};
use crate::port::{PortIndex, PortType};
use egui::Pos2;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

/// A node graph
#[derive(Debug)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Connections between nodes, including the one being dragged
    connections: IndexMap<ConnectionId, Connection>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and its connections
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let attached: Vec<ConnectionId> = self
            .connections_for_node(node_id)
            .map(Connection::id)
            .collect();
        for id in attached {
            self.drop_connection(id);
        }
        self.nodes.swap_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Start dragging a new connection out of a port
    pub fn start_connection(
        &mut self,
        side: PortType,
        node_id: NodeId,
        index: PortIndex,
    ) -> Result<ConnectionId, GraphError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        if side == PortType::In && node.state().is_port_connected(side, index) {
            return Err(GraphError::PortAlreadyConnected {
                node: node_id,
                side,
                index,
            });
        }

        let connection = Connection::dangling(side, node, index)?;
        let id = connection.id();
        node.state_mut().set_connection(side, index, id);
        self.connections.insert(id, connection);
        Ok(id)
    }

    /// Drop the dragged end of a connection onto a port, binding it
    pub fn complete_connection(
        &mut self,
        connection_id: ConnectionId,
        node_id: NodeId,
        index: PortIndex,
    ) -> Result<(), GraphError> {
        let connection = self
            .connections
            .get(&connection_id)
            .ok_or(GraphError::ConnectionNotFound(connection_id))?;
        let side = connection.required_side();
        if side == PortType::None {
            return Err(GraphError::AlreadyComplete(connection_id));
        }
        if connection.node(side.opposite()) == Some(node_id) {
            return Err(GraphError::SelfLoop);
        }

        let node = self
            .nodes
            .get(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        if !node.has_port(side, index) {
            return Err(ConnectionError::PortOutOfRange {
                node: node_id,
                side,
                index,
            }
            .into());
        }
        if side == PortType::In && node.state().is_port_connected(side, index) {
            return Err(GraphError::PortAlreadyConnected {
                node: node_id,
                side,
                index,
            });
        }

        let anchored = connection.data_type(&self.nodes);
        let offered = node.data_model().data_type(side, index);
        match side {
            PortType::In => check_types(anchored, offered)?,
            _ => check_types(offered, anchored)?,
        }

        if let Some(connection) = self.connections.get_mut(&connection_id) {
            connection.state_mut().reset_last_hovered_node();
            connection.bind_port(node_id, side, index);
        }
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.state_mut().set_connection(side, index, connection_id);
        }

        self.push_data(connection_id);
        Ok(())
    }

    /// Connect an output port to an input port directly
    pub fn connect(
        &mut self,
        node_in: NodeId,
        index_in: PortIndex,
        node_out: NodeId,
        index_out: PortIndex,
    ) -> Result<ConnectionId, GraphError> {
        if node_in == node_out {
            return Err(GraphError::SelfLoop);
        }
        let input = self
            .nodes
            .get(&node_in)
            .ok_or(GraphError::NodeNotFound(node_in))?;
        let output = self
            .nodes
            .get(&node_out)
            .ok_or(GraphError::NodeNotFound(node_out))?;

        let connection = Connection::new(input, index_in, output, index_out)?;
        if input.state().is_port_connected(PortType::In, index_in) {
            return Err(GraphError::PortAlreadyConnected {
                node: node_in,
                side: PortType::In,
                index: index_in,
            });
        }
        check_types(
            output.data_model().data_type(PortType::Out, index_out),
            input.data_model().data_type(PortType::In, index_in),
        )?;

        let id = connection.id();
        for (side, node_id, index) in connection.bound_ends() {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.state_mut().set_connection(side, index, id);
            }
        }
        self.connections.insert(id, connection);

        self.push_data(id);
        Ok(id)
    }

    /// Record the node the dragged end is over; `None` when it leaves all nodes
    pub fn hover_connection(
        &mut self,
        connection_id: ConnectionId,
        node_id: Option<NodeId>,
    ) -> Result<(), GraphError> {
        let connection = self
            .connections
            .get_mut(&connection_id)
            .ok_or(GraphError::ConnectionNotFound(connection_id))?;
        if connection.is_complete() {
            return Err(GraphError::AlreadyComplete(connection_id));
        }
        match node_id {
            Some(node_id) if !self.nodes.contains_key(&node_id) => {
                return Err(GraphError::NodeNotFound(node_id));
            }
            Some(node_id) => connection.state_mut().set_last_hovered_node(node_id),
            None => connection.state_mut().reset_last_hovered_node(),
        }
        Ok(())
    }

    /// Pick up one end of a connection so it can be dragged elsewhere
    pub fn detach_end(&mut self, connection_id: ConnectionId, side: PortType) -> Result<(), GraphError> {
        if !side.is_side() {
            return Err(ConnectionError::NoSide.into());
        }
        let connection = self
            .connections
            .get_mut(&connection_id)
            .ok_or(GraphError::ConnectionNotFound(connection_id))?;
        let Some(node_id) = connection.node(side).filter(|_| connection.is_complete()) else {
            return Err(GraphError::Incomplete(connection_id));
        };
        let index = connection.port_index(side);

        connection.propagate_empty_data(&mut self.nodes);
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.state_mut().erase_connection(side, index, connection_id);
        }
        connection.set_required_side(side);
        Ok(())
    }

    /// Remove a connection, clearing its input and repainting its ends
    pub fn remove_connection(&mut self, connection_id: ConnectionId) -> Result<(), GraphError> {
        if self.drop_connection(connection_id) {
            Ok(())
        } else {
            Err(GraphError::ConnectionNotFound(connection_id))
        }
    }

    fn drop_connection(&mut self, connection_id: ConnectionId) -> bool {
        let Some(connection) = self.connections.shift_remove(&connection_id) else {
            return false;
        };
        connection.detach_from_nodes(&mut self.nodes);
        connection.dispose(&mut self.nodes);
        true
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get a mutable connection by ID
    pub fn connection_mut(&mut self, connection_id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Send a node's current output through every connection on that port.
    ///
    /// Returns how many connections carried the data. Connections still being
    /// dragged toward an input are skipped.
    pub fn propagate_output(&mut self, node_id: NodeId, index: PortIndex) -> Result<usize, GraphError> {
        let node = self
            .nodes
            .get(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        let data = node.data_model().out_data(index);
        let targets: Vec<ConnectionId> = node.state().connections(PortType::Out, index).collect();

        let mut delivered = 0;
        for id in targets {
            let Some(connection) = self.connections.get(&id) else {
                continue;
            };
            if connection.node(PortType::In).is_some() {
                connection.propagate_data(data.clone(), &mut self.nodes);
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    fn push_data(&mut self, connection_id: ConnectionId) {
        let Some(connection) = self.connections.get(&connection_id) else {
            return;
        };
        let Some(out_node) = connection.node(PortType::Out) else {
            return;
        };
        let data = self
            .nodes
            .get(&out_node)
            .and_then(|node| node.data_model().out_data(connection.port_index(PortType::Out)));
        connection.propagate_data(data, &mut self.nodes);
    }

    /// Move a node and the connection ends attached to it
    pub fn move_node(&mut self, node_id: NodeId, position: Pos2) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        node.set_position(position);

        for connection in self.connections.values_mut() {
            let sides: Vec<PortType> = connection
                .bound_ends()
                .filter(|(_, node, _)| *node == node_id)
                .map(|(side, _, _)| side)
                .collect();
            for side in sides {
                connection.update_endpoint(side, &self.nodes);
            }
        }
        Ok(())
    }

    /// Save all fully bound connections
    pub fn save(&self) -> Value {
        let connections: Vec<Value> = self
            .connections
            .values()
            .map(Connection::save)
            .filter(|map| !map.is_empty())
            .map(Value::Object)
            .collect();
        json!({ "connections": connections })
    }

    /// Recreate a connection from its saved form
    pub fn restore_connection(&mut self, map: &Map<String, Value>) -> Result<ConnectionId, GraphError> {
        let record = ConnectionRecord::from_map(map)?;
        let (node_in, node_out) = record.node_ids()?;
        self.connect(
            node_in,
            PortIndex(record.in_index),
            node_out,
            PortIndex(record.out_index),
        )
    }

    /// Recreate every connection in a [`Graph::save`] value.
    ///
    /// Either every entry is restored or none is: on the first bad entry the
    /// connections already made by this call are removed again.
    pub fn restore(&mut self, saved: &Value) -> Result<Vec<ConnectionId>, GraphError> {
        let Some(entries) = saved.get("connections").and_then(Value::as_array) else {
            return Err(ConnectionError::MalformedRecord("missing connections array".to_string()).into());
        };

        let mut restored = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(map) = entry.as_object() else {
                tracing::warn!(%entry, "skipping connection entry that is not an object");
                continue;
            };
            match self.restore_connection(map) {
                Ok(id) => restored.push(id),
                Err(err) => {
                    tracing::warn!(%err, rolled_back = restored.len(), "restoring connections failed");
                    for id in restored {
                        self.drop_connection(id);
                    }
                    return Err(err);
                }
            }
        }
        Ok(restored)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

fn check_types(output: Option<NodeDataType>, input: Option<NodeDataType>) -> Result<(), GraphError> {
    match (output, input) {
        (Some(output), Some(input)) if output.can_connect_to(&input) => Ok(()),
        _ => Err(GraphError::IncompatibleTypes),
    }
}

/// Error when editing connections in a graph
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Connection not found
    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// Invalid connection arguments
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Connection has no required side left to bind
    #[error("Connection {0} is already complete")]
    AlreadyComplete(ConnectionId),

    /// Connection still has a dragged end
    #[error("Connection {0} is still being dragged")]
    Incomplete(ConnectionId),

    /// Incompatible data types
    #[error("Incompatible data types")]
    IncompatibleTypes,

    /// Input port is already connected
    #[error("Port already connected: {side} port {index} on {node}")]
    PortAlreadyConnected {
        /// Node
        node: NodeId,
        /// Side
        side: PortType,
        /// Port index
        index: PortIndex,
    },

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,
}
