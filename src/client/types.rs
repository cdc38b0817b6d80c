//! Wire types for the decomposition service
//!
//! Models the two JSON endpoints. Arrays may legitimately be empty; a missing
//! `explanation` decodes as an empty string.

use serde::{Deserialize, Serialize};

/// Request body for `POST decompose-solution`
#[derive(Debug, Serialize)]
pub struct SolutionRequest<'a> {
    pub solution: &'a str,
}

/// Request body for `POST decompose-step`
#[derive(Debug, Serialize)]
pub struct StepRequest<'a> {
    pub step: &'a str,
}

/// A raw step element as the service produces it, before markup cleanup
#[derive(Debug, Clone, Deserialize)]
pub struct RawStep {
    pub math: String,
    #[serde(default)]
    pub explanation: String,
}

/// Response body for `POST decompose-solution`
#[derive(Debug, Deserialize)]
pub struct SolutionResponse {
    pub steps: Vec<RawStep>,
}

/// Response body for `POST decompose-step`
#[derive(Debug, Deserialize)]
pub struct StepResponse {
    pub substeps: Vec<RawStep>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solution_response_deserialize() {
        let json = r#"{
            "steps": [
                {"math": "x+1=2", "explanation": "isolate x"},
                {"math": "x=1"}
            ]
        }"#;

        let response: SolutionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.steps.len(), 2);
        assert_eq!(response.steps[0].math, "x+1=2");
        assert!(response.steps[1].explanation.is_empty());
    }

    #[test]
    fn test_step_response_allows_empty_array() {
        let response: StepResponse = serde_json::from_str(r#"{"substeps": []}"#).unwrap();
        assert!(response.substeps.is_empty());
    }

    #[test]
    fn test_request_bodies_serialize() {
        let body = serde_json::to_value(SolutionRequest { solution: "x+1=2" }).unwrap();
        assert_eq!(body["solution"], "x+1=2");

        let body = serde_json::to_value(StepRequest { step: "x=1" }).unwrap();
        assert_eq!(body["step"], "x=1");
    }
}
