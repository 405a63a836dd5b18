//! Tool Definition Types
//!
//! Schema-level description of a tool as surfaced to the model. Execution
//! lives with whoever registers the tool (the server for `web_search`, the
//! frontend for `interview`); this crate only carries the contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool definition sent to the model.
///
/// `input_schema` is a JSON Schema (draft-07 style) object describing the
/// tool's arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}
