// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port sides and slot indices.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of a node a port sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PortType {
    /// Input port (left edge of a node)
    In,
    /// Output port (right edge of a node)
    Out,
    /// No side
    #[default]
    None,
}

impl PortType {
    /// Get the side a connection from this side ends on
    pub fn opposite(self) -> Self {
        match self {
            Self::In => Self::Out,
            Self::Out => Self::In,
            Self::None => Self::None,
        }
    }

    /// Check if this is `In` or `Out`
    pub fn is_side(self) -> bool {
        self != Self::None
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => f.write_str("in"),
            Self::Out => f.write_str("out"),
            Self::None => f.write_str("none"),
        }
    }
}

/// Slot index of a port on one side of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortIndex(pub i32);

impl PortIndex {
    /// Sentinel for "no port"
    pub const INVALID: Self = Self(-1);

    /// Check if the index refers to a slot
    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// Get the slot as a `usize`, if valid
    pub fn slot(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    /// Check if the index addresses one of `count` slots
    pub fn fits(self, count: usize) -> bool {
        self.slot().is_some_and(|slot| slot < count)
    }
}

impl Default for PortIndex {
    fn default() -> Self {
        Self::INVALID
    }
}

impl From<i32> for PortIndex {
    fn from(index: i32) -> Self {
        Self(index)
    }
}

impl fmt::Display for PortIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
