use crate::graph::{Node, NodeId};
use ahash::{AHashMap, AHashSet};
use std::collections::VecDeque;

/// Breadth-first closure over `child_nodes`, including `start` itself.
///
/// Returns an empty set when `start` is not among `nodes`. Child ids that
/// name no node are ignored; revisits are guarded so cycles terminate.
pub fn descendants_of(start: &str, nodes: &[Node]) -> AHashSet<NodeId> {
    let by_id: AHashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let mut closure = AHashSet::new();
    if !by_id.contains_key(start) {
        return closure;
    }

    let mut queue = VecDeque::from([start]);
    closure.insert(start.to_string());
    while let Some(current) = queue.pop_front() {
        let Some(node) = by_id.get(current) else {
            continue;
        };
        for child in &node.child_nodes {
            if by_id.contains_key(child.as_str()) && closure.insert(child.clone()) {
                queue.push_back(child.as_str());
            }
        }
    }
    closure
}
