//! Reconciliation of an observed node inventory with a previous one.

use std::collections::HashMap;

use super::{Node, NodeGroup};

/// Combines a freshly observed inventory with the previous one.
///
/// The result has exactly the nodes of `new`, in the same order, and its
/// expected count. Nodes are matched by IP address: a node whose IP appears
/// in `old` takes the labels and kubelet options recorded there, while a node
/// with an unseen IP keeps its own. Nodes only present in `old` are dropped.
/// When `old` lists an IP more than once, the first entry wins.
///
/// # Examples
///
/// ```
/// use clusterform::{Node, NodeGroup, merge};
///
/// let mut labelled = Node::default();
/// labelled.ip = String::from("10.0.0.1");
/// labelled.labels.insert(String::from("zone"), String::from("a"));
/// let old = NodeGroup { expected_count: 1, nodes: vec![labelled] };
///
/// let mut observed = Node::default();
/// observed.ip = String::from("10.0.0.1");
/// observed.host = String::from("node-1");
/// let new = NodeGroup { expected_count: 1, nodes: vec![observed] };
///
/// let merged = merge(new, &old);
/// assert_eq!(merged.nodes[0].host, "node-1");
/// assert_eq!(merged.nodes[0].labels["zone"], "a");
/// ```
#[must_use]
pub fn merge(new: NodeGroup, old: &NodeGroup) -> NodeGroup {
    let mut known: HashMap<&str, &Node> = HashMap::with_capacity(old.nodes.len());
    for node in &old.nodes {
        known.entry(node.ip.as_str()).or_insert(node);
    }

    let nodes = new
        .nodes
        .into_iter()
        .map(|node| match known.get(node.ip.as_str()) {
            Some(prior) => Node {
                labels: prior.labels.clone(),
                kubelet: prior.kubelet.clone(),
                ..node
            },
            None => node,
        })
        .collect();

    NodeGroup {
        expected_count: new.expected_count,
        nodes,
    }
}
