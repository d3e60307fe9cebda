//! Checks the last Response Manager entry against expected assertions.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use falcon_workspace::ResponseManager;

use crate::{Tool, ToolOutput, ToolParam, ToolSpec};

pub struct AssertResponseTool {
    pub responses: Arc<ResponseManager>,
}

#[async_trait]
impl Tool for AssertResponseTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "assert_response".to_string(),
            description: "Checks the last HTTP response against an expected status, a body substring, and/or a header value.".to_string(),
            params: vec![
                ToolParam { name: "expected_status".to_string(), description: "Expected numeric status code".to_string(), required: false },
                ToolParam { name: "body_contains".to_string(), description: "Substring the body must contain".to_string(), required: false },
                ToolParam { name: "header_name".to_string(), description: "Header to check".to_string(), required: false },
                ToolParam { name: "header_value".to_string(), description: "Expected value for header_name".to_string(), required: false },
            ],
        }
    }

    async fn execute(&self, args: &Value) -> Result<ToolOutput> {
        let response = match self.responses.get() {
            Ok(r) => r,
            Err(err) => return Ok(ToolOutput::failed(err.to_string())),
        };

        let mut failures = Vec::new();

        if let Some(expected) = args.get("expected_status").and_then(Value::as_u64) {
            if response.status as u64 != expected {
                failures.push(format!("expected status {expected}, got {}", response.status));
            }
        }

        if let Some(needle) = args.get("body_contains").and_then(Value::as_str) {
            if !response.body.contains(needle) {
                failures.push(format!("body did not contain '{needle}'"));
            }
        }

        if let Some(name) = args.get("header_name").and_then(Value::as_str) {
            let expected_value = args.get("header_value").and_then(Value::as_str);
            match response.headers.get(name) {
                Some(actual) => {
                    if let Some(expected_value) = expected_value {
                        if actual != expected_value {
                            failures.push(format!(
                                "header '{name}' was '{actual}', expected '{expected_value}'"
                            ));
                        }
                    }
                }
                None => failures.push(format!("header '{name}' was not present")),
            }
        }

        if failures.is_empty() {
            Ok(ToolOutput::ok(format!("all assertions passed (status {})", response.status)))
        } else {
            Ok(ToolOutput::failed(failures.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use falcon_workspace::LastResponse;

    fn responses_with(status: u16, body: &str) -> Arc<ResponseManager> {
        let manager = Arc::new(ResponseManager::new());
        manager.set(LastResponse {
            status,
            headers: HashMap::new(),
            body: body.to_string(),
            duration: Duration::from_millis(1),
        });
        manager
    }

    #[tokio::test]
    async fn matching_status_and_body_passes() {
        let tool = AssertResponseTool { responses: responses_with(200, "hello world") };
        let args = serde_json::json!({ "expected_status": 200, "body_contains": "hello" });
        let out = tool.execute(&args).await.unwrap();
        assert!(out.success);
    }

    #[tokio::test]
    async fn mismatched_status_fails_with_diagnostic() {
        let tool = AssertResponseTool { responses: responses_with(404, "not found") };
        let args = serde_json::json!({ "expected_status": 200 });
        let out = tool.execute(&args).await.unwrap();
        assert!(!out.success);
        assert!(out.output.contains("expected status 200"));
    }

    #[tokio::test]
    async fn no_response_yet_fails_gracefully() {
        let tool = AssertResponseTool { responses: Arc::new(ResponseManager::new()) };
        let out = tool.execute(&serde_json::json!({})).await.unwrap();
        assert!(!out.success);
    }
}
