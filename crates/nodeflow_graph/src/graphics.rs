// SPDX-License-Identifier: MIT OR Apache-2.0
//! Hook for the scene object that draws a connection.

use egui::Pos2;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Visual representation of a connection, owned by the scene
pub trait ConnectionGraphics {
    /// Place the object's origin in the scene
    fn set_pos(&mut self, pos: Pos2);

    /// Re-read the connection's end points and repaint
    fn refresh_layout(&mut self);
}

/// Owning handle, held by the scene
pub type GraphicsHandle = Rc<RefCell<dyn ConnectionGraphics>>;

/// Non-owning handle, held by the connection
pub type WeakGraphicsHandle = Weak<RefCell<dyn ConnectionGraphics>>;
