// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recording doubles shared by the unit tests.

use crate::data::{NodeData, NodeDataType, Payload};
use crate::graphics::ConnectionGraphics;
use crate::node::NodeDataModel;
use crate::port::{PortIndex, PortType};
use egui::Pos2;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

pub fn float_type() -> NodeDataType {
    NodeDataType::new("float", "Float")
}

pub fn text_type() -> NodeDataType {
    NodeDataType::new("text", "Text")
}

#[derive(Debug)]
pub struct Number(pub f64);

impl NodeData for Number {
    fn data_type(&self) -> NodeDataType {
        float_type()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// What a [`Probe`] has seen, shared with the test after the probe is boxed
#[derive(Debug, Default)]
pub struct ProbeLog {
    pub received: Vec<(Payload, PortIndex)>,
    pub outputs: Vec<Payload>,
}

#[derive(Debug)]
pub struct Probe {
    inputs: usize,
    outputs: usize,
    data_type: NodeDataType,
    log: Rc<RefCell<ProbeLog>>,
}

impl Probe {
    pub fn new(inputs: usize, outputs: usize, data_type: NodeDataType) -> Self {
        let log = ProbeLog {
            received: Vec::new(),
            outputs: vec![None; outputs],
        };
        Self {
            inputs,
            outputs,
            data_type,
            log: Rc::new(RefCell::new(log)),
        }
    }

    pub fn log(&self) -> Rc<RefCell<ProbeLog>> {
        Rc::clone(&self.log)
    }
}

impl NodeDataModel for Probe {
    fn name(&self) -> &str {
        "Probe"
    }

    fn n_ports(&self, side: PortType) -> usize {
        match side {
            PortType::In => self.inputs,
            PortType::Out => self.outputs,
            PortType::None => 0,
        }
    }

    fn data_type(&self, side: PortType, index: PortIndex) -> Option<NodeDataType> {
        index
            .fits(self.n_ports(side))
            .then(|| self.data_type.clone())
    }

    fn set_in_data(&mut self, data: Payload, index: PortIndex) {
        self.log.borrow_mut().received.push((data, index));
    }

    fn out_data(&self, index: PortIndex) -> Payload {
        index
            .slot()
            .and_then(|slot| self.log.borrow().outputs.get(slot).cloned().flatten())
    }
}

#[derive(Debug, Default)]
pub struct RecordingGraphics {
    pub positions: Vec<Pos2>,
    pub refreshes: usize,
}

impl ConnectionGraphics for RecordingGraphics {
    fn set_pos(&mut self, pos: Pos2) {
        self.positions.push(pos);
    }

    fn refresh_layout(&mut self) {
        self.refreshes += 1;
    }
}
