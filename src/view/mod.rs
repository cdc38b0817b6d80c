//! View synchronization layer between the tree and the render surfaces

mod projection;
mod sync;

pub use projection::{GraphProjection, ListRow, graph_projection, list_rows};
pub use sync::{ViewEvent, ViewMode, ViewSync};
