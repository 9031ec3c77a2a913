// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interaction state carried by a connection.

use crate::node::NodeId;
use crate::port::PortType;

/// Tracks which end of a connection is still unbound
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    /// Side being dragged, `PortType::None` once both ends are bound
    required_side: PortType,
    /// Node the dragged end last passed over
    last_hovered_node: Option<NodeId>,
}

impl ConnectionState {
    /// Create a state with no required side
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a side as required
    pub fn set_required_side(&mut self, side: PortType) {
        self.required_side = side;
    }

    /// Clear the required side
    pub fn set_no_required_side(&mut self) {
        self.required_side = PortType::None;
    }

    /// Get the required side
    pub fn required_side(&self) -> PortType {
        self.required_side
    }

    /// Check if some side is still required
    pub fn requires_side(&self) -> bool {
        self.required_side != PortType::None
    }

    /// Remember the node under the dragged end
    pub fn set_last_hovered_node(&mut self, node: NodeId) {
        self.last_hovered_node = Some(node);
    }

    /// Get the node under the dragged end
    pub fn last_hovered_node(&self) -> Option<NodeId> {
        self.last_hovered_node
    }

    /// Forget the hovered node
    pub fn reset_last_hovered_node(&mut self) {
        self.last_hovered_node = None;
    }
}
