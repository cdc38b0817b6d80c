//! stepgraph - explorable step-decomposition engine for math solutions
//!
//! Turns a submitted mathematical solution into an explorable, hierarchical
//! breakdown: a top-level sequence of steps, each expandable into
//! finer-grained substeps on demand, projected simultaneously as a linear
//! list and as a node/edge graph. The decomposition itself comes from a
//! remote analysis service; this crate owns the state machine around it.
//!
//! # Core Concepts
//!
//! - **Tree is authoritative**: all nodes and edges live in
//!   [`DecompositionTree`]; renderers only consume snapshots
//! - **Collapse removes**: collapsing deletes descendants instead of hiding
//!   them, so stale substeps can never resurface under a new expansion
//! - **One fetch per node**: a per-node in-flight guard keeps expansion
//!   requests from interleaving
//! - **History without replay**: past analyses restore instantly from a
//!   bounded cache of root steps, never from the service
//!
//! # Modules
//!
//! - [`tree`] - the decomposition tree state machine
//! - [`view`] - event reducer and the list/graph projections
//! - [`client`] - analysis service trait and HTTP implementation
//! - [`history`] - bounded persisted history of past analyses
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod client;
pub mod config;
pub mod history;
pub mod tree;
pub mod view;

// Re-export commonly used types
pub use client::{AnalysisClient, HttpAnalysisClient, ServiceError};
pub use config::{Config, ServiceConfig, StorageConfig};
pub use history::{HISTORY_CAP, HistoryEntry, HistoryStore};
pub use tree::{DecompositionTree, Edge, EdgeKind, Node, NodeId, Position, StepContent, TreeError};
pub use view::{GraphProjection, ListRow, ViewEvent, ViewMode, ViewSync};
