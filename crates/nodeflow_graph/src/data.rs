// SPDX-License-Identifier: MIT OR Apache-2.0
//! Payloads that flow along connections.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Type descriptor declared by a port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeDataType {
    /// Stable type identifier, compared when connecting
    pub id: String,
    /// Display name
    pub name: String,
}

impl NodeDataType {
    /// Create a new type descriptor
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Check if an output of this type can feed an input of `other`
    pub fn can_connect_to(&self, other: &NodeDataType) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for NodeDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// A unit of data produced by an output port
pub trait NodeData: Any + fmt::Debug {
    /// Type of this payload
    fn data_type(&self) -> NodeDataType;

    /// Access for downcasting to the concrete payload
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a payload
pub type NodeDataRef = Rc<dyn NodeData>;

/// A payload slot; `None` is the empty payload
pub type Payload = Option<NodeDataRef>;
