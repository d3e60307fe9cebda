//! Variable Store operations exposed as tools.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use falcon_workspace::VariableStore;

use crate::{Tool, ToolOutput, ToolParam, ToolSpec};

pub struct SetVariableTool {
    pub variables: Arc<VariableStore>,
}

#[async_trait]
impl Tool for SetVariableTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "set_variable".to_string(),
            description: "Sets a session (or, with global=true, persisted) variable.".to_string(),
            params: vec![
                ToolParam { name: "name".to_string(), description: "Variable name".to_string(), required: true },
                ToolParam { name: "value".to_string(), description: "Variable value".to_string(), required: true },
                ToolParam { name: "global".to_string(), description: "Persist across sessions (default false)".to_string(), required: false },
            ],
        }
    }

    async fn execute(&self, args: &Value) -> Result<ToolOutput> {
        let name = match args.get("name").and_then(Value::as_str) {
            Some(n) => n,
            None => return Ok(ToolOutput::failed("missing required param: name")),
        };
        let value = match args.get("value").and_then(Value::as_str) {
            Some(v) => v,
            None => return Ok(ToolOutput::failed("missing required param: value")),
        };
        let global = args.get("global").and_then(Value::as_bool).unwrap_or(false);

        if global {
            match self.variables.set_global(name, value) {
                Ok(Some(warning)) => Ok(ToolOutput::ok(format!("set {name} (global); {warning}"))),
                Ok(None) => Ok(ToolOutput::ok(format!("set {name} (global)"))),
                Err(err) => Ok(ToolOutput::failed(err.to_string())),
            }
        } else {
            self.variables.set(name, value);
            Ok(ToolOutput::ok(format!("set {name}")))
        }
    }
}

pub struct GetVariableTool {
    pub variables: Arc<VariableStore>,
}

#[async_trait]
impl Tool for GetVariableTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "get_variable".to_string(),
            description: "Reads a variable's current value.".to_string(),
            params: vec![ToolParam { name: "name".to_string(), description: "Variable name".to_string(), required: true }],
        }
    }

    async fn execute(&self, args: &Value) -> Result<ToolOutput> {
        let name = match args.get("name").and_then(Value::as_str) {
            Some(n) => n,
            None => return Ok(ToolOutput::failed("missing required param: name")),
        };
        match self.variables.get(name) {
            Some(value) => Ok(ToolOutput::ok(value)),
            None => Ok(ToolOutput::failed(format!("variable '{name}' is not set"))),
        }
    }
}

pub struct ListVariablesTool {
    pub variables: Arc<VariableStore>,
}

#[async_trait]
impl Tool for ListVariablesTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "list_variables".to_string(),
            description: "Lists all session and global variable names with their scope.".to_string(),
            params: vec![],
        }
    }

    async fn execute(&self, _args: &Value) -> Result<ToolOutput> {
        let mut entries: Vec<String> = self
            .variables
            .list()
            .into_iter()
            .map(|v| format!("{} ({:?})", v.name, v.scope))
            .collect();
        entries.sort();
        Ok(ToolOutput::ok(entries.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variables() -> Arc<VariableStore> {
        Arc::new(VariableStore::load(tempfile::tempdir().unwrap().path().join("variables.json")).unwrap())
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let variables = variables();
        let set = SetVariableTool { variables: variables.clone() };
        set.execute(&serde_json::json!({ "name": "TOKEN", "value": "abc" })).await.unwrap();

        let get = GetVariableTool { variables };
        let out = get.execute(&serde_json::json!({ "name": "TOKEN" })).await.unwrap();
        assert_eq!(out.output, "abc");
    }

    #[tokio::test]
    async fn get_unset_variable_fails() {
        let get = GetVariableTool { variables: variables() };
        let out = get.execute(&serde_json::json!({ "name": "MISSING" })).await.unwrap();
        assert!(!out.success);
    }
}
