//! Persistence Manager CRUD for named environments (variable bundles).

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use falcon_workspace::{Environment, PersistenceManager};

use crate::{Tool, ToolOutput, ToolParam, ToolSpec};

pub struct SaveEnvironmentTool {
    pub persistence: Arc<PersistenceManager>,
}

#[async_trait]
impl Tool for SaveEnvironmentTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "save_environment".to_string(),
            description: "Saves a named bundle of variables as an environment.".to_string(),
            params: vec![
                ToolParam { name: "name".to_string(), description: "Environment name".to_string(), required: true },
                ToolParam { name: "variables".to_string(), description: "Object of variable name/value pairs".to_string(), required: true },
            ],
        }
    }

    async fn execute(&self, args: &Value) -> Result<ToolOutput> {
        let name = match args.get("name").and_then(Value::as_str) {
            Some(n) => n,
            None => return Ok(ToolOutput::failed("missing required param: name")),
        };
        let mut variables = HashMap::new();
        if let Some(obj) = args.get("variables").and_then(Value::as_object) {
            for (k, v) in obj {
                if let Some(v) = v.as_str() {
                    variables.insert(k.clone(), v.to_string());
                }
            }
        }
        match self.persistence.save_environment(name, &Environment { variables }) {
            Ok(()) => Ok(ToolOutput::ok(format!("saved environment '{name}'"))),
            Err(err) => Ok(ToolOutput::failed(err.to_string())),
        }
    }
}

pub struct LoadEnvironmentTool {
    pub persistence: Arc<PersistenceManager>,
}

#[async_trait]
impl Tool for LoadEnvironmentTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "load_environment".to_string(),
            description: "Loads a named environment's variable bundle.".to_string(),
            params: vec![ToolParam { name: "name".to_string(), description: "Environment name".to_string(), required: true }],
        }
    }

    async fn execute(&self, args: &Value) -> Result<ToolOutput> {
        let name = match args.get("name").and_then(Value::as_str) {
            Some(n) => n,
            None => return Ok(ToolOutput::failed("missing required param: name")),
        };
        match self.persistence.load_environment(name) {
            Ok(env) => Ok(ToolOutput::ok(
                serde_json::to_string(&env.variables).unwrap_or_else(|_| "{}".to_string()),
            )),
            Err(err) => Ok(ToolOutput::failed(err.to_string())),
        }
    }
}

pub struct ListEnvironmentsTool {
    pub persistence: Arc<PersistenceManager>,
}

#[async_trait]
impl Tool for ListEnvironmentsTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "list_environments".to_string(),
            description: "Lists the names of all saved environments.".to_string(),
            params: vec![],
        }
    }

    async fn execute(&self, _args: &Value) -> Result<ToolOutput> {
        match self.persistence.list_environments() {
            Ok(names) => Ok(ToolOutput::ok(names.join(", "))),
            Err(err) => Ok(ToolOutput::failed(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use falcon_workspace::WorkspaceLayout;

    fn persistence() -> (tempfile::TempDir, Arc<PersistenceManager>) {
        let dir = tempfile::tempdir().unwrap();
        let layout = Arc::new(WorkspaceLayout::bootstrap(dir.path().join(".falcon")).unwrap());
        (dir, Arc::new(PersistenceManager::new(layout)))
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let (_dir, persistence) = persistence();
        let save = SaveEnvironmentTool { persistence: persistence.clone() };
        let out = save
            .execute(&serde_json::json!({ "name": "staging", "variables": { "BASE_URL": "http://staging" } }))
            .await
            .unwrap();
        assert!(out.success);

        let load = LoadEnvironmentTool { persistence: persistence.clone() };
        let out = load.execute(&serde_json::json!({ "name": "staging" })).await.unwrap();
        assert!(out.output.contains("staging"));

        let list = ListEnvironmentsTool { persistence };
        let out = list.execute(&serde_json::json!({})).await.unwrap();
        assert_eq!(out.output, "staging");
    }
}
