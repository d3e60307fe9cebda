use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod builtins;
pub mod confirm;

pub use confirm::{
    ConfirmableTool, ConfirmationDecision, ConfirmationRequest, ConfirmationSender, ConfirmationVerdict,
};

// ── Tool trait and registry ──────────────────────────────────────────────────

/// Describes a single parameter that a tool accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParam {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// Static metadata about a tool, used by the Prompt Builder's catalog and
/// by the LLM to decide which tool to call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ToolParam>,
}

/// The result returned after a tool runs. `success = false` marks a
/// recoverable failure (bad input, assertion mismatch, rejected write) —
/// it becomes a synthetic observation, not a bubbled error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

impl ToolOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self { success: true, output: output.into() }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self { success: false, output: output.into() }
    }
}

/// Trait implemented by every tool the registry exposes. `execute` takes
/// the parsed argument object straight from the Tool Call Parser (§4.N);
/// individual tools are responsible for validating the shape they expect.
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;
    async fn execute(&self, args: &Value) -> Result<ToolOutput>;

    /// Overridden by tools that also implement `ConfirmableTool`, so the
    /// executor can detect the capability without downcasting.
    fn as_confirmable(&self) -> Option<&dyn ConfirmableTool> {
        None
    }
}

/// Central registry for all available tools. Registration order is
/// immaterial; lookup is first-match-wins on duplicate names.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn list_specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.spec().name == name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.spec().name).collect()
    }
}

/// Wires the concrete catalog named in the Tool Registry component: one
/// shared `ResponseManager`/`VariableStore`/`PersistenceManager` feeding
/// the HTTP/assertion/persistence tools, plus the filesystem and memory
/// tools scoped to `project_root`/`memory`. Registration order is
/// immaterial.
pub fn default_registry(
    project_root: std::path::PathBuf,
    variables: Arc<falcon_workspace::VariableStore>,
    responses: Arc<falcon_workspace::ResponseManager>,
    persistence: Arc<falcon_workspace::PersistenceManager>,
    memory: Arc<falcon_memory::MemoryStore>,
    session_id: String,
) -> ToolRegistry {
    let mut registry = ToolRegistry::default();

    registry.register(Arc::new(builtins::HttpRequestTool {
        client: reqwest::Client::new(),
        variables: variables.clone(),
        responses: responses.clone(),
    }));
    registry.register(Arc::new(builtins::AssertResponseTool { responses: responses.clone() }));
    registry.register(Arc::new(builtins::ExtractJsonTool { responses, variables: variables.clone() }));

    registry.register(Arc::new(builtins::SaveRequestTool { persistence: persistence.clone() }));
    registry.register(Arc::new(builtins::LoadRequestTool { persistence: persistence.clone() }));
    registry.register(Arc::new(builtins::ListRequestsTool { persistence: persistence.clone() }));
    registry.register(Arc::new(builtins::SaveEnvironmentTool { persistence: persistence.clone() }));
    registry.register(Arc::new(builtins::LoadEnvironmentTool { persistence: persistence.clone() }));
    registry.register(Arc::new(builtins::ListEnvironmentsTool { persistence }));

    registry.register(Arc::new(builtins::SetVariableTool { variables: variables.clone() }));
    registry.register(Arc::new(builtins::GetVariableTool { variables: variables.clone() }));
    registry.register(Arc::new(builtins::ListVariablesTool { variables }));

    registry.register(Arc::new(builtins::ReadFileTool { project_root: project_root.clone() }));
    registry.register(Arc::new(builtins::SearchCodeTool { project_root: project_root.clone() }));
    registry.register(Arc::new(builtins::WriteFileTool::new(project_root)));

    registry.register(Arc::new(builtins::RememberTool { memory: memory.clone(), session_id }));
    registry.register(Arc::new(builtins::RecallTool { memory }));

    registry.register(Arc::new(builtins::RunPerformanceTestTool));
    registry.register(Arc::new(builtins::RunSecurityScanTool));
    registry.register(Arc::new(builtins::ValidateSchemaTool));

    registry
}

// ── ToolRegistry tests ───────────────────────────────────────────────────────


#[cfg(test)]
mod default_registry_tests {
    use super::*;
    use falcon_workspace::{PersistenceManager, ResponseManager, VariableStore, WorkspaceLayout};

    #[test]
    fn wires_the_full_default_catalog_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Arc::new(WorkspaceLayout::bootstrap(dir.path().join(".falcon")).unwrap());
        let variables = Arc::new(VariableStore::load(layout.variables_path()).unwrap());
        let responses = Arc::new(ResponseManager::new());
        let persistence = Arc::new(PersistenceManager::new(layout.clone()));
        let memory = Arc::new(falcon_memory::MemoryStore::load(layout.memory_path()).unwrap());

        let registry = default_registry(
            dir.path().to_path_buf(),
            variables,
            responses,
            persistence,
            memory,
            "s1".to_string(),
        );

        let names = registry.names();
        for expected in [
            "http_request",
            "assert_response",
            "extract_json",
            "save_request",
            "load_request",
            "list_requests",
            "save_environment",
            "load_environment",
            "list_environments",
            "set_variable",
            "get_variable",
            "list_variables",
            "read_file",
            "search_code",
            "write_file",
            "remember",
            "recall",
            "run_performance_test",
            "run_security_scan",
            "validate_schema",
        ] {
            assert!(names.contains(&expected.to_string()), "missing tool: {expected}");
        }

        let write_file = registry.get("write_file").unwrap();
        assert!(write_file.as_confirmable().is_some());
    }
}
