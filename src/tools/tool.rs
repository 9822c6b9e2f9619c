//! Shared tool value types: declarations handed to the model and results handed back.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Function declaration that describes a tool's interface to the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    name: String,
    description: String,
    /// JSON Schema for parameters
    parameters: Value,
    /// Schema of the successful response, when the source declares one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response: Option<Value>,
}

impl FunctionDeclaration {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            response: None,
        }
    }

    #[must_use]
    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    pub fn response(&self) -> Option<&Value> {
        self.response.as_ref()
    }
}

/// Outcome category of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Error,
    /// An external, user-facing authorization step must complete before the call can run.
    Pending,
}

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    status: ToolStatus,
    data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl ToolResult {
    pub fn success(data: Value) -> Self {
        Self {
            status: ToolStatus::Success,
            data,
            error_message: None,
        }
    }

    /// Error result whose payload is `{"error": message}` so the agent loop can read it inline.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: ToolStatus::Error,
            data: json!({ "error": message }),
            error_message: Some(message),
        }
    }

    /// Pending-authorization result; payload is `{"pending": true, "message": message}`.
    pub fn pending(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Pending,
            data: json!({ "pending": true, "message": message.into() }),
            error_message: None,
        }
    }

    pub fn status(&self) -> ToolStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == ToolStatus::Error
    }

    pub fn is_pending(&self) -> bool {
        self.status == ToolStatus::Pending
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}
