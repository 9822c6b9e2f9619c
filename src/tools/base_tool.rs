use serde_json::Value;
use std::collections::HashMap;

use crate::compat::{MaybeSend, MaybeSync};
use crate::tools::tool_context::ToolContext;
use crate::tools::{FunctionDeclaration, ToolResult};

/// Capability set every callable tool provides.
///
/// Concrete tools (the generic REST tool, caller-defined tools) implement this
/// trait directly; there is no shared mutable base.
#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
pub trait BaseTool: MaybeSend + MaybeSync {
    /// The name of the tool - must be unique within an agent
    fn name(&self) -> &str;

    /// Human-readable description of what this tool does
    fn description(&self) -> &str;

    /// Describes the tool's interface to the LLM.
    fn declaration(&self) -> FunctionDeclaration;

    /// Executes the tool with the given arguments and context.
    ///
    /// Never fails at the Rust level: errors and pending authorization are
    /// reported through the returned [`ToolResult`].
    async fn run_async(&self, args: HashMap<String, Value>, context: &ToolContext<'_>)
        -> ToolResult;
}
