//! Renderable projections of the decomposition tree
//!
//! Pure read-only views for the two render surfaces. The list renderer gets
//! indented rows over the expanded portion of the tree; the graph renderer
//! gets the full node/edge snapshot. Neither surface can mutate the tree
//! through these.

use std::collections::HashSet;

use serde::Serialize;

use crate::tree::{DecompositionTree, Edge, Node, NodeId};

/// One row of the linear list view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListRow {
    pub id: NodeId,
    /// Indent level (0 for top-level steps)
    pub depth: usize,
    pub math: String,
    pub explanation: String,
    pub expanded: bool,
    /// True while a substep fetch for this node is outstanding
    pub loading: bool,
}

/// Node/edge snapshot for the graph widget
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphProjection {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Build list rows: roots in sequence order, descending depth-first through
/// expanded nodes only
pub fn list_rows(tree: &DecompositionTree, in_flight: &HashSet<NodeId>) -> Vec<ListRow> {
    let mut rows = Vec::new();
    for root in tree.roots() {
        push_rows(tree, root, in_flight, &mut rows);
    }
    rows
}

fn push_rows(tree: &DecompositionTree, id: &NodeId, in_flight: &HashSet<NodeId>, rows: &mut Vec<ListRow>) {
    let Some(node) = tree.get(id) else {
        return;
    };
    rows.push(ListRow {
        id: node.id.clone(),
        depth: node.depth,
        math: node.math.clone(),
        explanation: node.explanation.clone(),
        expanded: node.expanded,
        loading: in_flight.contains(id),
    });
    if node.expanded {
        for child_id in tree.children_of(id) {
            push_rows(tree, child_id, in_flight, rows);
        }
    }
}

/// Build the graph projection from the current tree
pub fn graph_projection(tree: &DecompositionTree) -> GraphProjection {
    GraphProjection {
        nodes: tree.project_nodes(),
        edges: tree.project_edges(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{EdgeKind, StepContent};

    fn sample_tree() -> DecompositionTree {
        let mut tree = DecompositionTree::new();
        tree.set_root(&[
            StepContent::new("x+1=2", "isolate x"),
            StepContent::new("x=1", "solved"),
        ]);
        tree.expand(
            &NodeId::from("0"),
            &[StepContent::new("x=2-1", "subtract 1"), StepContent::new("x=1", "")],
        )
        .unwrap();
        tree
    }

    #[test]
    fn test_list_rows_follow_expansion() {
        let tree = sample_tree();
        let rows = list_rows(&tree, &HashSet::new());

        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "0-0", "0-1", "1"]);
        assert_eq!(rows[1].depth, 1);
        assert!(rows[0].expanded);
    }

    #[test]
    fn test_list_rows_mark_loading() {
        let tree = sample_tree();
        let mut pending = HashSet::new();
        pending.insert(NodeId::from("1"));

        let rows = list_rows(&tree, &pending);
        let row = rows.iter().find(|r| r.id.as_str() == "1").unwrap();
        assert!(row.loading);
        assert!(!rows[0].loading);
    }

    #[test]
    fn test_graph_projection_has_both_edge_kinds() {
        let tree = sample_tree();
        let graph = graph_projection(&tree);

        assert_eq!(graph.nodes.len(), 4);
        assert!(graph.edges.iter().any(|e| e.kind == EdgeKind::Sequence));
        assert_eq!(
            graph.edges.iter().filter(|e| e.kind == EdgeKind::Decomposition).count(),
            2
        );
    }
}
