//! Analysis service boundary
//!
//! The decomposition algorithm itself is an opaque remote service. This
//! module owns the narrow interface to it: an object-safe trait so the view
//! layer and tests can substitute fakes, the reqwest implementation, and the
//! markup-normalization pass applied to every response.

use async_trait::async_trait;

mod error;
mod http;
mod normalize;
mod types;

pub use error::ServiceError;
pub use http::HttpAnalysisClient;
pub use normalize::{scrub_markup, scrub_steps};
pub use types::{RawStep, SolutionRequest, SolutionResponse, StepRequest, StepResponse};

use crate::tree::StepContent;

/// Client boundary to the external decomposition service
///
/// Both operations return steps already normalized (markup artifacts
/// stripped); arrays may be empty.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Decompose a full submitted solution into top-level steps
    async fn decompose_solution(&self, solution: &str) -> Result<Vec<StepContent>, ServiceError>;

    /// Decompose one step into finer-grained substeps
    async fn decompose_step(&self, step: &str) -> Result<Vec<StepContent>, ServiceError>;
}
