//! Tree contract errors

use thiserror::Error;

use super::node::NodeId;

/// Errors raised by tree operations
///
/// Both variants are contract violations: callers that track UI state
/// correctly never trigger them. The tree fails loudly and leaves its state
/// unchanged rather than silently corrupting it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("node not found: {0}")]
    NotFound(NodeId),

    #[error("node already expanded: {0} (collapse before re-expanding)")]
    AlreadyExpanded(NodeId),
}
