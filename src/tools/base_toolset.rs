//! Toolset abstractions for grouping related tools.
//!
//! - [`BaseToolset`]: Trait for tool collections with lifecycle management
//! - [`SimpleToolset`]: Basic in-memory collection of tools

use std::sync::Arc;

use super::base_tool::BaseTool;
use crate::{MaybeSend, MaybeSync};

/// Base trait for toolsets - collections of related tools.
///
/// The [`close`](BaseToolset::close) method should be called when the toolset
/// is no longer needed to release resources like HTTP connection pools.
#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
pub trait BaseToolset: MaybeSend + MaybeSync {
    /// Returns all tools in the toolset.
    ///
    /// Clones the `Arc`s, not the tools themselves.
    async fn get_tools(&self) -> Vec<Arc<dyn BaseTool>>;

    /// Performs cleanup and releases resources held by the toolset.
    async fn close(&self);
}

/// Default implementation of `BaseToolset` for simple collections of tools
#[derive(Default)]
pub struct SimpleToolset {
    tools: Vec<Arc<dyn BaseTool>>,
}

impl SimpleToolset {
    pub fn new<T>(tools: T) -> Self
    where
        T: IntoIterator<Item = Arc<dyn BaseTool>>,
    {
        Self {
            tools: tools.into_iter().collect(),
        }
    }

    /// Add a single tool to this toolset.
    pub fn add_tool(&mut self, tool: Arc<dyn BaseTool>) {
        self.tools.push(tool);
    }

    /// Builder-style helper to add a tool while consuming the toolset.
    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn BaseTool>) -> Self {
        self.add_tool(tool);
        self
    }
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl BaseToolset for SimpleToolset {
    async fn get_tools(&self) -> Vec<Arc<dyn BaseTool>> {
        self.tools.clone()
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tool_context::ToolContext;
    use crate::tools::{FunctionDeclaration, ToolResult};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    struct Echo(&'static str);

    #[async_trait::async_trait]
    impl BaseTool for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "echoes its arguments"
        }

        fn declaration(&self) -> FunctionDeclaration {
            FunctionDeclaration::new(self.0, "echoes its arguments", json!({"type": "object"}))
        }

        async fn run_async(
            &self,
            args: HashMap<String, Value>,
            _context: &ToolContext<'_>,
        ) -> ToolResult {
            ToolResult::success(json!(args))
        }
    }

    #[tokio::test]
    async fn simple_toolset_keeps_insertion_order() {
        let mut toolset = SimpleToolset::new([Arc::new(Echo("first")) as Arc<dyn BaseTool>])
            .with_tool(Arc::new(Echo("second")));
        toolset.add_tool(Arc::new(Echo("third")));

        let names: Vec<String> = toolset
            .get_tools()
            .await
            .iter()
            .map(|tool| tool.name().to_string())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        toolset.close().await;
    }
}
