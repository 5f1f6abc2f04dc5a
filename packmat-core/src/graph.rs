//! Graph Plan - Node Arena and Op Log
//!
//! The graph under construction. Nodes live in an arena addressed by `NodeId`;
//! every mutation is also appended to an ordered op log, which is the
//! compiler's output handed back to the host.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::catalog::NodeSockets;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Node type not available on this host: {0}")]
    UnknownNodeType(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// Stable identity for nodes that must exist at most once per graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKey {
    ShadingModel,
    MaterialOutput,
    Mapping,
    Displacement,
    AoMultiply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketRef {
    pub node: NodeId,
    pub name: String,
    pub direction: SocketDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SocketValue {
    Float(f64),
    Color([f64; 4]),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSocket {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<SocketValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub node_type: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<NodeKey>,
    pub location: [f32; 2],
    pub inputs: Vec<InputSocket>,
    pub outputs: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Node {
    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.iter().any(|s| s.name == name)
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|s| s == name)
    }

    pub fn default_value(&self, input: &str) -> Option<&SocketValue> {
        self.inputs
            .iter()
            .find(|s| s.name == input)
            .and_then(|s| s.default.as_ref())
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub from: SocketRef,
    pub to: SocketRef,
}

/// One step of the emitted plan, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlanOp {
    CreateNode {
        node: NodeId,
        node_type: String,
        label: String,
    },
    Connect {
        from: SocketRef,
        to: SocketRef,
    },
    Disconnect {
        from: SocketRef,
        to: SocketRef,
    },
    SetDefault {
        socket: SocketRef,
        value: SocketValue,
    },
    SetProperty {
        node: NodeId,
        name: String,
        value: String,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphPlan {
    nodes: Vec<Node>,
    links: Vec<Link>,
    ops: Vec<PlanOp>,
}

impl GraphPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node with the given socket set.
    pub fn add_node(
        &mut self,
        node_type: &str,
        sockets: NodeSockets,
        label: &str,
        location: [f32; 2],
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            node_type: node_type.to_string(),
            label: label.to_string(),
            key: None,
            location,
            inputs: sockets
                .inputs
                .iter()
                .map(|name| InputSocket {
                    name: name.to_string(),
                    default: None,
                })
                .collect(),
            outputs: sockets.outputs.iter().map(|s| s.to_string()).collect(),
            properties: BTreeMap::new(),
        });
        self.ops.push(PlanOp::CreateNode {
            node: id,
            node_type: node_type.to_string(),
            label: label.to_string(),
        });
        id
    }

    /// Return the node registered under `key`, creating it with `create` if
    /// there is none yet. The flag is `true` when the node was just created.
    pub fn get_or_create<E>(
        &mut self,
        key: NodeKey,
        create: impl FnOnce(&mut Self) -> Result<NodeId, E>,
    ) -> Result<(NodeId, bool), E> {
        if let Some(id) = self.find(key) {
            return Ok((id, false));
        }
        let id = create(self)?;
        self.assign_key(id, key);
        Ok((id, true))
    }

    /// Register an existing node under `key`.
    pub fn assign_key(&mut self, node: NodeId, key: NodeKey) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.key = Some(key);
        }
    }

    pub fn find(&self, key: NodeKey) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.key == Some(key)).map(|n| n.id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn ops(&self) -> &[PlanOp] {
        &self.ops
    }

    pub fn nodes_of_type<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.iter().filter(move |n| n.node_type == node_type)
    }

    pub fn input(&self, node: NodeId, name: &str) -> Option<SocketRef> {
        self.node(node)
            .filter(|n| n.has_input(name))
            .map(|_| SocketRef {
                node,
                name: name.to_string(),
                direction: SocketDirection::Input,
            })
    }

    pub fn output(&self, node: NodeId, name: &str) -> Option<SocketRef> {
        self.node(node)
            .filter(|n| n.has_output(name))
            .map(|_| SocketRef {
                node,
                name: name.to_string(),
                direction: SocketDirection::Output,
            })
    }

    /// Wire `from` (an output) into `to` (an input). An input accepts a
    /// single link, so any existing link into `to` is removed first.
    pub fn connect(&mut self, from: &SocketRef, to: &SocketRef) {
        debug_assert_eq!(from.direction, SocketDirection::Output);
        debug_assert_eq!(to.direction, SocketDirection::Input);

        self.disconnect(to);
        self.links.push(Link {
            from: from.clone(),
            to: to.clone(),
        });
        self.ops.push(PlanOp::Connect {
            from: from.clone(),
            to: to.clone(),
        });
    }

    /// Remove the link feeding `to`, returning it if there was one.
    pub fn disconnect(&mut self, to: &SocketRef) -> Option<Link> {
        let pos = self.links.iter().position(|l| &l.to == to)?;
        let link = self.links.remove(pos);
        self.ops.push(PlanOp::Disconnect {
            from: link.from.clone(),
            to: link.to.clone(),
        });
        Some(link)
    }

    pub fn incoming(&self, to: &SocketRef) -> Option<&Link> {
        self.links.iter().find(|l| &l.to == to)
    }

    pub fn is_linked(&self, to: &SocketRef) -> bool {
        self.incoming(to).is_some()
    }

    pub fn links_from(&self, node: NodeId) -> impl Iterator<Item = &Link> + '_ {
        self.links.iter().filter(move |l| l.from.node == node)
    }

    pub fn links_into(&self, node: NodeId) -> impl Iterator<Item = &Link> + '_ {
        self.links.iter().filter(move |l| l.to.node == node)
    }

    /// Set the unlinked value of an input socket. Returns `false` if the
    /// socket does not exist.
    pub fn set_default(&mut self, socket: &SocketRef, value: SocketValue) -> bool {
        let Some(input) = self
            .nodes
            .get_mut(socket.node.0)
            .and_then(|n| n.inputs.iter_mut().find(|s| s.name == socket.name))
        else {
            return false;
        };
        input.default = Some(value.clone());
        self.ops.push(PlanOp::SetDefault {
            socket: socket.clone(),
            value,
        });
        true
    }

    pub fn set_property(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.properties.insert(name.to_string(), value.clone());
            self.ops.push(PlanOp::SetProperty {
                node,
                name: name.to_string(),
                value,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASS: NodeSockets = NodeSockets {
        inputs: &["In"],
        outputs: &["Out"],
    };

    #[test]
    fn test_connect_replaces_existing_link() {
        let mut g = GraphPlan::new();
        let a = g.add_node("A", PASS, "a", [0.0, 0.0]);
        let b = g.add_node("B", PASS, "b", [0.0, 0.0]);
        let c = g.add_node("C", PASS, "c", [0.0, 0.0]);

        let into_c = g.input(c, "In").unwrap();
        g.connect(&g.output(a, "Out").unwrap(), &into_c);
        g.connect(&g.output(b, "Out").unwrap(), &into_c);

        assert_eq!(g.links().len(), 1);
        assert_eq!(g.incoming(&into_c).unwrap().from.node, b);
        assert!(g.ops().iter().any(|op| matches!(op, PlanOp::Disconnect { .. })));
    }

    #[test]
    fn test_missing_socket_is_none() {
        let mut g = GraphPlan::new();
        let a = g.add_node("A", PASS, "a", [0.0, 0.0]);
        assert!(g.input(a, "Nope").is_none());
        assert!(g.output(a, "In").is_none());
        assert!(g.input(NodeId(42), "In").is_none());
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut g = GraphPlan::new();
        let (first, created) = g
            .get_or_create::<GraphError>(NodeKey::Displacement, |g| {
                Ok(g.add_node("D", PASS, "Displacement", [0.0, 0.0]))
            })
            .unwrap();
        assert!(created);

        let (second, created) = g
            .get_or_create::<GraphError>(NodeKey::Displacement, |g| {
                Ok(g.add_node("D", PASS, "Displacement", [0.0, 0.0]))
            })
            .unwrap();
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(g.nodes().len(), 1);
    }

    #[test]
    fn test_get_or_create_with_unknown_id() {
        let mut g = GraphPlan::new();
        let (id, created) = g
            .get_or_create::<GraphError>(NodeKey::Mapping, |_| Ok(NodeId(7)))
            .unwrap();
        assert_eq!((id, created), (NodeId(7), true));
        assert!(g.find(NodeKey::Mapping).is_none());
    }

    #[test]
    fn test_set_default_on_missing_socket() {
        let mut g = GraphPlan::new();
        let a = g.add_node("A", PASS, "a", [0.0, 0.0]);
        let bogus = SocketRef {
            node: a,
            name: "Bogus".into(),
            direction: SocketDirection::Input,
        };
        assert!(!g.set_default(&bogus, SocketValue::Float(1.0)));

        let real = g.input(a, "In").unwrap();
        assert!(g.set_default(&real, SocketValue::Float(0.5)));
        assert_eq!(g.node(a).unwrap().default_value("In"), Some(&SocketValue::Float(0.5)));
    }
}
