//! Node, edge, and identifier types for the decomposition tree

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between lineage segments in a node id
pub const ID_SEPARATOR: char = '-';

/// Identifier for a node in the decomposition tree
///
/// Encodes lineage: top-level steps are `"0"`, `"1"`, ...; a child id is
/// `parent` + `-` + local index (e.g. `"0-2"` is the third substep of step 0).
/// Ancestry is recoverable from the id alone, but child enumeration always
/// goes through the tree's adjacency map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Id for a top-level step by position among its siblings
    pub fn root(index: usize) -> Self {
        Self(index.to_string())
    }

    /// Id for a child of this node by local index
    pub fn child(&self, local_index: usize) -> Self {
        Self(format!("{}{}{}", self.0, ID_SEPARATOR, local_index))
    }

    /// Parent id, or None for a top-level step
    pub fn parent(&self) -> Option<NodeId> {
        self.0.rfind(ID_SEPARATOR).map(|idx| Self(self.0[..idx].to_string()))
    }

    /// Full lineage from the root ancestor down to (and including) this id
    pub fn ancestry(&self) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut end = 0;
        for (idx, ch) in self.0.char_indices() {
            if ch == ID_SEPARATOR {
                path.push(Self(self.0[..idx].to_string()));
            }
            end = idx + ch.len_utf8();
        }
        path.push(Self(self.0[..end].to_string()));
        path
    }

    /// Depth encoded in the id (0 for top-level steps)
    pub fn depth(&self) -> usize {
        self.0.chars().filter(|c| *c == ID_SEPARATOR).count()
    }

    /// Is this a top-level step id?
    pub fn is_root(&self) -> bool {
        !self.0.contains(ID_SEPARATOR)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// 2-D layout coordinate for the graph view
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One unit of explanation: a step or substep of the submitted solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier, immutable once created
    pub id: NodeId,
    /// Canonical textual/markup representation of the expression
    pub math: String,
    /// Natural-language annotation, may be empty
    pub explanation: String,
    /// 0 for top-level steps, +1 per expansion level
    pub depth: usize,
    /// True once children have been fetched and attached
    pub expanded: bool,
    /// Layout coordinate; deterministic on creation, user-owned after a drag
    pub position: Position,
    /// Set on the first manual move; layout must not reassign after that
    pub user_positioned: bool,
}

impl Node {
    pub fn new(id: NodeId, math: String, explanation: String, depth: usize, position: Position) -> Self {
        Self {
            id,
            math,
            explanation,
            depth,
            expanded: false,
            position,
            user_positioned: false,
        }
    }
}

/// The relation an edge encodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Temporal order between consecutive top-level steps
    Sequence,
    /// Hierarchical refinement created by an expansion
    Decomposition,
}

/// Directed edge between two existing nodes
///
/// Edges are always regenerated from the node set at projection time and
/// never independently mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
}

impl Edge {
    /// Sequence edge between consecutive top-level steps (k -> k+1)
    pub fn sequence(index: usize, source: NodeId, target: NodeId) -> Self {
        Self {
            id: format!("e-{}", index),
            source,
            target,
            kind: EdgeKind::Sequence,
        }
    }

    /// Decomposition edge from a parent to one of its substeps
    pub fn decomposition(source: NodeId, target: NodeId) -> Self {
        Self {
            id: format!("e-{}-{}", source, target),
            source,
            target,
            kind: EdgeKind::Decomposition,
        }
    }
}

/// A `{math, explanation}` pair as produced by the analysis service
///
/// Used for both wire decoding and history persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepContent {
    pub math: String,
    #[serde(default)]
    pub explanation: String,
}

impl StepContent {
    pub fn new(math: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            math: math.into(),
            explanation: explanation.into(),
        }
    }
}
