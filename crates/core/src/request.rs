//! Workflow submission payload and its validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Key inside `workflow_params` that may carry an indirect input reference.
pub const INPUT_PARAM_KEY: &str = "input";

/// A workflow submission as accepted from the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub workflow_url: String,
    pub workflow_type: String,
    pub workflow_type_version: String,
    /// Engine-specific parameters; must be a JSON object.
    #[serde(default = "empty_object")]
    pub workflow_params: serde_json::Value,
    /// Free-form labels, stored and returned unchanged.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

/// Workflow languages (and their versions) this service accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedWorkflows {
    pub types: Vec<String>,
    pub versions: Vec<String>,
}

impl RunRequest {
    /// Reject malformed submissions before a run is created.
    pub fn validate(&self, supported: &SupportedWorkflows) -> Result<(), CoreError> {
        if self.workflow_url.trim().is_empty() {
            return Err(CoreError::Validation("workflow_url must not be empty".into()));
        }

        if !supported
            .types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&self.workflow_type))
        {
            return Err(CoreError::Validation(format!(
                "Unsupported workflow_type '{}'. Must be one of: {:?}",
                self.workflow_type, supported.types
            )));
        }

        if !supported.versions.is_empty()
            && !supported.versions.contains(&self.workflow_type_version)
        {
            return Err(CoreError::Validation(format!(
                "Unsupported workflow_type_version '{}'. Must be one of: {:?}",
                self.workflow_type_version, supported.versions
            )));
        }

        if !self.workflow_params.is_object() {
            return Err(CoreError::Validation(
                "workflow_params must be a JSON object".into(),
            ));
        }

        Ok(())
    }

    /// The `input` parameter, if present and a string.
    pub fn input_reference(&self) -> Option<&str> {
        self.workflow_params
            .get(INPUT_PARAM_KEY)
            .and_then(serde_json::Value::as_str)
    }
}
