//! The decomposition tree state machine
//!
//! Authoritative model for steps and substeps: which nodes exist, which are
//! expanded, and how freshly fetched substeps are grafted on. Parent/child
//! lookup goes through an explicit adjacency map; edges are derived from the
//! node set at projection time and never stored.

use std::collections::HashMap;

use tracing::debug;

use super::error::TreeError;
use super::node::{Edge, Node, NodeId, Position, StepContent};

/// Vertical spacing between top-level steps
const ROOT_SPACING_Y: f64 = 120.0;

/// Horizontal offset of a substep column from its parent
const CHILD_OFFSET_X: f64 = 260.0;

/// Vertical spacing between sibling substeps
const CHILD_SPACING_Y: f64 = 90.0;

/// The step-decomposition tree
///
/// Owns every node exclusively. Mutations happen through the operations
/// below; renderers only ever see snapshots from [`project_nodes`] and
/// [`project_edges`].
///
/// [`project_nodes`]: DecompositionTree::project_nodes
/// [`project_edges`]: DecompositionTree::project_edges
#[derive(Debug, Default)]
pub struct DecompositionTree {
    /// All nodes indexed by id
    nodes: HashMap<NodeId, Node>,
    /// Adjacency map: parent id -> child ids in creation order
    children: HashMap<NodeId, Vec<NodeId>>,
    /// Top-level step ids in sequence order (fixed at creation)
    roots: Vec<NodeId>,
}

impl DecompositionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire tree with a fresh sequence of top-level steps
    ///
    /// Clears all prior nodes and expansion state. One root node is created
    /// per input step, depth 0, ids `"0".."n-1"`. No I/O; callable any number
    /// of times.
    pub fn set_root(&mut self, steps: &[StepContent]) {
        debug!(step_count = steps.len(), "set_root: replacing tree");
        self.nodes.clear();
        self.children.clear();
        self.roots.clear();

        for (idx, step) in steps.iter().enumerate() {
            let id = NodeId::root(idx);
            let position = Position::new(0.0, idx as f64 * ROOT_SPACING_Y);
            self.nodes.insert(
                id.clone(),
                Node::new(id.clone(), step.math.clone(), step.explanation.clone(), 0, position),
            );
            self.roots.push(id);
        }
    }

    /// Attach fetched substeps under a node and mark it expanded
    ///
    /// Fails with [`TreeError::NotFound`] if the node does not exist and
    /// [`TreeError::AlreadyExpanded`] if it was expanded without an
    /// intervening collapse. Either failure leaves the tree unchanged; the
    /// collapse-first rule is what guarantees a re-expansion always replaces
    /// the whole child subtree instead of merging into a stale one.
    pub fn expand(&mut self, id: &NodeId, substeps: &[StepContent]) -> Result<(), TreeError> {
        let parent = self.nodes.get(id).ok_or_else(|| TreeError::NotFound(id.clone()))?;
        if parent.expanded {
            return Err(TreeError::AlreadyExpanded(id.clone()));
        }

        let parent_depth = parent.depth;
        let parent_pos = parent.position;

        let mut child_ids = Vec::with_capacity(substeps.len());
        for (idx, step) in substeps.iter().enumerate() {
            let child_id = id.child(idx);
            let position = Position::new(
                parent_pos.x + CHILD_OFFSET_X,
                parent_pos.y + idx as f64 * CHILD_SPACING_Y,
            );
            self.nodes.insert(
                child_id.clone(),
                Node::new(
                    child_id.clone(),
                    step.math.clone(),
                    step.explanation.clone(),
                    parent_depth + 1,
                    position,
                ),
            );
            child_ids.push(child_id);
        }

        self.children.insert(id.clone(), child_ids);
        // Lookup cannot fail here, checked above
        if let Some(parent) = self.nodes.get_mut(id) {
            parent.expanded = true;
        }

        debug!(%id, substep_count = substeps.len(), "expand: substeps attached");
        Ok(())
    }

    /// Remove all descendants of a node and mark it collapsed
    ///
    /// Descendants are removed, not hidden: this bounds memory and ensures a
    /// later re-expansion cannot resurface stale substeps. Idempotent on an
    /// already-collapsed node.
    pub fn collapse(&mut self, id: &NodeId) -> Result<(), TreeError> {
        if !self.nodes.contains_key(id) {
            return Err(TreeError::NotFound(id.clone()));
        }

        self.remove_descendants(id);
        if let Some(node) = self.nodes.get_mut(id) {
            node.expanded = false;
        }
        Ok(())
    }

    /// Recursively remove everything below a node
    fn remove_descendants(&mut self, id: &NodeId) {
        if let Some(child_ids) = self.children.remove(id) {
            for child_id in child_ids {
                self.remove_descendants(&child_id);
                self.nodes.remove(&child_id);
            }
        }
    }

    /// Update a node's layout position after a user drag
    ///
    /// Pure position update: expansion state and ordering are untouched.
    /// Ownership of the position passes to the user on the first move.
    pub fn move_node(&mut self, id: &NodeId, position: Position) -> Result<(), TreeError> {
        let node = self.nodes.get_mut(id).ok_or_else(|| TreeError::NotFound(id.clone()))?;
        node.position = position;
        node.user_positioned = true;
        Ok(())
    }

    /// Snapshot of all nodes in deterministic order (roots in sequence,
    /// then depth-first through expanded subtrees)
    pub fn project_nodes(&self) -> Vec<Node> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for root in &self.roots {
            self.collect_subtree(root, &mut out);
        }
        out
    }

    fn collect_subtree(&self, id: &NodeId, out: &mut Vec<Node>) {
        if let Some(node) = self.nodes.get(id) {
            out.push(node.clone());
            if let Some(child_ids) = self.children.get(id) {
                for child_id in child_ids {
                    self.collect_subtree(child_id, out);
                }
            }
        }
    }

    /// Snapshot of all edges, regenerated from the current node set
    ///
    /// Sequence edges connect consecutive top-level steps; decomposition
    /// edges connect every parent to its substeps. Both classes coexist in
    /// the projection and are distinguishable by [`EdgeKind`].
    ///
    /// [`EdgeKind`]: super::node::EdgeKind
    pub fn project_edges(&self) -> Vec<Edge> {
        let mut out = Vec::new();
        for (idx, pair) in self.roots.windows(2).enumerate() {
            out.push(Edge::sequence(idx, pair[0].clone(), pair[1].clone()));
        }
        for root in &self.roots {
            self.collect_decomposition_edges(root, &mut out);
        }
        out
    }

    fn collect_decomposition_edges(&self, id: &NodeId, out: &mut Vec<Edge>) {
        if let Some(child_ids) = self.children.get(id) {
            for child_id in child_ids {
                out.push(Edge::decomposition(id.clone(), child_id.clone()));
                self.collect_decomposition_edges(child_id, out);
            }
        }
    }

    /// Path from the root ancestor down to the given node
    ///
    /// Derived from the id's lineage encoding; every ancestor is guaranteed
    /// present while the node itself exists.
    pub fn find_ancestry_path(&self, id: &NodeId) -> Result<Vec<Node>, TreeError> {
        if !self.nodes.contains_key(id) {
            return Err(TreeError::NotFound(id.clone()));
        }
        id.ancestry()
            .iter()
            .map(|ancestor| {
                self.nodes
                    .get(ancestor)
                    .cloned()
                    .ok_or_else(|| TreeError::NotFound(ancestor.clone()))
            })
            .collect()
    }

    /// Get a node by id
    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Child ids of a node in creation order
    pub fn children_of(&self, id: &NodeId) -> &[NodeId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Top-level step ids in sequence order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
