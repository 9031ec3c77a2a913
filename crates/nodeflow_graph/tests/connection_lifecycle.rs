// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end connection scenarios against the public API.

use indexmap::IndexMap;
use nodeflow_graph::{
    Connection, ConnectionError, ConnectionRequest, Graph, Node, NodeData, NodeDataModel,
    NodeDataType, NodeId, NodeStore, Payload, PortIndex, PortType,
};
use serde_json::json;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Route connection lifecycle logs to the test output (`RUST_LOG=nodeflow_graph=debug`)
fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

fn scalar() -> NodeDataType {
    NodeDataType::new("scalar", "Scalar")
}

#[derive(Debug)]
struct Scalar(f32);

impl NodeData for Scalar {
    fn data_type(&self) -> NodeDataType {
        scalar()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Adds a constant to whatever arrives on its input
#[derive(Debug)]
struct AddConstant {
    inputs: usize,
    outputs: usize,
    constant: f32,
    value: Rc<RefCell<Option<f32>>>,
    empty_inputs: Rc<RefCell<usize>>,
}

impl AddConstant {
    fn new(inputs: usize, outputs: usize, constant: f32) -> Self {
        Self {
            inputs,
            outputs,
            constant,
            value: Rc::new(RefCell::new(None)),
            empty_inputs: Rc::new(RefCell::new(0)),
        }
    }
}

impl NodeDataModel for AddConstant {
    fn name(&self) -> &str {
        "AddConstant"
    }

    fn n_ports(&self, side: PortType) -> usize {
        match side {
            PortType::In => self.inputs,
            PortType::Out => self.outputs,
            PortType::None => 0,
        }
    }

    fn data_type(&self, side: PortType, index: PortIndex) -> Option<NodeDataType> {
        index.fits(self.n_ports(side)).then(scalar)
    }

    fn set_in_data(&mut self, data: Payload, _index: PortIndex) {
        match data.as_ref().and_then(|d| d.as_any().downcast_ref::<Scalar>()) {
            Some(Scalar(v)) => *self.value.borrow_mut() = Some(v + self.constant),
            None => {
                *self.value.borrow_mut() = None;
                *self.empty_inputs.borrow_mut() += 1;
            }
        }
    }

    fn out_data(&self, index: PortIndex) -> Payload {
        if !index.fits(self.outputs) {
            return None;
        }
        let value = (*self.value.borrow()).unwrap_or(self.constant);
        Some(Rc::new(Scalar(value)))
    }
}

fn node(inputs: usize, outputs: usize) -> Node {
    Node::new(Box::new(AddConstant::new(inputs, outputs, 1.0)))
}

#[test]
fn test_drag_from_output_then_bind_input() {
    init_tracing();
    let node_a = node(0, 1);
    let node_b = node(2, 0);
    let mut connection = Connection::dangling(PortType::Out, &node_a, PortIndex(0)).unwrap();
    assert_eq!(connection.required_side(), PortType::In);
    assert!(connection.save().is_empty());

    connection.bind_port(node_b.id(), PortType::In, PortIndex(1));

    assert_eq!(connection.required_side(), PortType::None);
    let saved = serde_json::Value::Object(connection.save());
    assert_eq!(
        saved,
        json!({
            "in_id": node_b.id().to_string(),
            "in_index": 1,
            "out_id": node_a.id().to_string(),
            "out_index": 0,
        })
    );
}

#[test]
fn test_direct_construction_accessors() {
    let node_a = node(3, 0);
    let node_b = node(0, 4);
    let connection = Connection::new(&node_a, PortIndex(2), &node_b, PortIndex(3)).unwrap();

    assert_eq!(connection.node(PortType::In), Some(node_a.id()));
    assert_eq!(connection.node(PortType::Out), Some(node_b.id()));
    assert_eq!(connection.port_index(PortType::In), PortIndex(2));
    assert_eq!(connection.port_index(PortType::Out), PortIndex(3));
    assert_eq!(connection.required_side(), PortType::None);
}

#[test]
fn test_unrecognized_arguments_create_nothing() {
    let mut nodes: IndexMap<NodeId, Node> = IndexMap::new();
    let only = node(1, 1);
    let only_id = only.id();
    nodes.insert(only_id, only);

    let none_side = ConnectionRequest::Dangling {
        side: PortType::None,
        node: only_id,
        index: PortIndex(0),
    };
    assert!(matches!(
        Connection::create(none_side, &nodes),
        Err(ConnectionError::NoSide)
    ));

    let unknown = ConnectionRequest::Bound {
        node_in: only_id,
        index_in: PortIndex(0),
        node_out: NodeId::new(),
        index_out: PortIndex(0),
    };
    assert!(matches!(
        Connection::create(unknown, &nodes),
        Err(ConnectionError::UnknownNode(_))
    ));
}

#[test]
fn test_teardown_after_detach() {
    let mut nodes: IndexMap<NodeId, Node> = IndexMap::new();
    let model = AddConstant::new(1, 0, 0.0);
    let empty_inputs = Rc::clone(&model.empty_inputs);
    let input = Node::new(Box::new(model));
    let output = node(0, 1);
    let (input_id, output_id) = (input.id(), output.id());

    let connection = Connection::new(&input, PortIndex(0), &output, PortIndex(0)).unwrap();
    nodes.insert(input_id, input);
    nodes.insert(output_id, output);

    connection.detach_from_nodes(&mut nodes);
    connection.dispose(&mut nodes);

    assert_eq!(nodes.node(input_id).unwrap().refresh_requests(), 1);
    assert_eq!(nodes.node(output_id).unwrap().refresh_requests(), 1);
    assert_eq!(*empty_inputs.borrow(), 1);
}

#[test]
fn test_graph_data_flow() {
    init_tracing();
    let mut graph = Graph::new("flow");
    let source = graph.add_node(node(0, 1));
    let sink_model = AddConstant::new(1, 0, 10.0);
    let sink_value = Rc::clone(&sink_model.value);
    let sink = graph.add_node(Node::new(Box::new(sink_model)));

    let id = graph.start_connection(PortType::In, sink, PortIndex(0)).unwrap();
    assert_eq!(*sink_value.borrow(), None);

    graph.complete_connection(id, source, PortIndex(0)).unwrap();
    assert_eq!(*sink_value.borrow(), Some(11.0));

    graph.remove_connection(id).unwrap();
    assert_eq!(*sink_value.borrow(), None);
    assert_eq!(graph.node(sink).unwrap().refresh_requests(), 1);
    assert_eq!(graph.node(source).unwrap().refresh_requests(), 1);
}
