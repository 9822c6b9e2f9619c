//! Tools and toolsets generated from OpenAPI documents.
//!
//! # Core Concepts
//!
//! - [`BaseTool`]: the capability set of a callable tool
//! - [`BaseToolset`]: collections of related tools
//! - [`ToolContext`]: per-invocation context passed to tools
//! - [`ExecutionState`]: key-value storage the caller owns (credential cache, auth responses)
//! - [`openapi`]: compiling documents into [`openapi::RestApiTool`]s
//! - [`auth`]: credential preparation for authenticated operations
//!
//! # Examples
//!
//! ```no_run
//! use std::collections::HashMap;
//! use restkit::tools::openapi::{OpenApiToolSet, ToolsetOptions};
//! use restkit::tools::{BaseTool, DefaultExecutionState, ToolContext};
//! use serde_json::json;
//!
//! # async fn run() -> restkit::RestkitResult<()> {
//! let toolset = OpenApiToolSet::from_file("users", "users.yaml", ToolsetOptions::default())?;
//! let state = DefaultExecutionState::new();
//! let context = ToolContext::builder().with_state(&state).build()?;
//!
//! if let Some(tool) = toolset.get_tool("get_user") {
//!     let args = HashMap::from([("user_id".to_string(), json!("42"))]);
//!     let result = tool.run_async(args, &context).await;
//!     println!("{:?}", result.data());
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod base_tool;
pub mod base_toolset;
mod execution_state;
pub mod openapi;
pub mod tool;
pub mod tool_context;

pub use base_tool::BaseTool;
pub use base_toolset::{BaseToolset, SimpleToolset};
pub use execution_state::{DefaultExecutionState, ExecutionState};
pub use tool::{FunctionDeclaration, ToolResult, ToolStatus};
pub use tool_context::{ToolContext, ToolContextBuilder};
