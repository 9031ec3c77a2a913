// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection model for node graph editors.
//!
//! This crate tracks the edges of a visual node graph through their whole
//! lifetime:
//! - Dangling connections dragged out of a port
//! - Binding the dragged end to complete the connection
//! - Re-dragging an end of a finished connection
//! - Data propagation from output ports to input ports
//! - Teardown and saving
//!
//! ## Architecture
//!
//! [`Connection`] is the edge itself. It refers to its two [`Node`]s by
//! [`NodeId`] and reaches them through a [`NodeStore`], so nodes stay owned
//! by the [`Graph`]. Rendering is left to the host scene, which plugs in via
//! [`ConnectionGraphics`].

pub mod port;
pub mod data;
pub mod state;
pub mod geometry;
pub mod graphics;
pub mod node;
pub mod connection;
pub mod graph;

#[cfg(test)]
mod test_support;

pub use port::{PortIndex, PortType};
pub use data::{NodeData, NodeDataRef, NodeDataType, Payload};
pub use state::ConnectionState;
pub use geometry::{ConnectionGeometry, ConnectionStyle};
pub use graphics::{ConnectionGraphics, GraphicsHandle};
pub use node::{Node, NodeDataModel, NodeGeometry, NodeId, NodeState, NodeStore};
pub use connection::{Connection, ConnectionError, ConnectionId, ConnectionRecord, ConnectionRequest, ObserverId};
pub use graph::{Graph, GraphError};
