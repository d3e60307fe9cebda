//! Pulls a value out of the last response body into a variable.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use falcon_workspace::{ResponseManager, VariableStore};

use crate::{Tool, ToolOutput, ToolParam, ToolSpec};

/// Walks a dot-separated path (`data.users.0.id`) through a JSON value.
/// Numeric segments index arrays; everything else indexes objects.
fn walk_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = if let Ok(index) = segment.parse::<usize>() {
            current.as_array()?.get(index)?
        } else {
            current.as_object()?.get(segment)?
        };
    }
    Some(current)
}

pub struct ExtractJsonTool {
    pub responses: Arc<ResponseManager>,
    pub variables: Arc<VariableStore>,
}

#[async_trait]
impl Tool for ExtractJsonTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "extract_json".to_string(),
            description: "Extracts a value from the last response body via a dot path and stores it in a session variable.".to_string(),
            params: vec![
                ToolParam { name: "path".to_string(), description: "Dot path into the response body, e.g. data.id".to_string(), required: true },
                ToolParam { name: "variable_name".to_string(), description: "Name of the session variable to set".to_string(), required: true },
            ],
        }
    }

    async fn execute(&self, args: &Value) -> Result<ToolOutput> {
        let path = match args.get("path").and_then(Value::as_str) {
            Some(p) => p,
            None => return Ok(ToolOutput::failed("missing required param: path")),
        };
        let variable_name = match args.get("variable_name").and_then(Value::as_str) {
            Some(n) => n,
            None => return Ok(ToolOutput::failed("missing required param: variable_name")),
        };

        let response = match self.responses.get() {
            Ok(r) => r,
            Err(err) => return Ok(ToolOutput::failed(err.to_string())),
        };

        let parsed: Value = match serde_json::from_str(&response.body) {
            Ok(v) => v,
            Err(err) => return Ok(ToolOutput::failed(format!("response body is not JSON: {err}"))),
        };

        let extracted = match walk_path(&parsed, path) {
            Some(v) => v,
            None => return Ok(ToolOutput::failed(format!("path '{path}' not found in response"))),
        };

        let rendered = match extracted {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        self.variables.set(variable_name, &rendered);
        Ok(ToolOutput::ok(format!("set {variable_name} = {rendered}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use falcon_workspace::LastResponse;

    fn tool_with_body(body: &str) -> ExtractJsonTool {
        let responses = Arc::new(ResponseManager::new());
        responses.set(LastResponse {
            status: 200,
            headers: HashMap::new(),
            body: body.to_string(),
            duration: Duration::from_millis(1),
        });
        ExtractJsonTool {
            responses,
            variables: Arc::new(VariableStore::load(std::env::temp_dir().join("unused-extract-variables.json")).unwrap()),
        }
    }

    #[tokio::test]
    async fn extracts_nested_field_into_variable() {
        let tool = tool_with_body(r#"{"data":{"id":"abc-123"}}"#);
        let out = tool.execute(&serde_json::json!({ "path": "data.id", "variable_name": "USER_ID" })).await.unwrap();
        assert!(out.success);
        assert_eq!(tool.variables.get("USER_ID"), Some("abc-123".to_string()));
    }

    #[tokio::test]
    async fn extracts_array_index() {
        let tool = tool_with_body(r#"{"items":[{"id":1},{"id":2}]}"#);
        let out = tool.execute(&serde_json::json!({ "path": "items.1.id", "variable_name": "SECOND_ID" })).await.unwrap();
        assert!(out.success);
        assert_eq!(tool.variables.get("SECOND_ID"), Some("2".to_string()));
    }

    #[tokio::test]
    async fn missing_path_fails() {
        let tool = tool_with_body(r#"{"data":{}}"#);
        let out = tool.execute(&serde_json::json!({ "path": "data.missing", "variable_name": "X" })).await.unwrap();
        assert!(!out.success);
    }
}
