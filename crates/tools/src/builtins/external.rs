//! External-collaborator tools: the core only specifies their `Tool`
//! surface (name, params, `ToolOutput`). Their internal algorithms
//! (load generation, vulnerability scanning, schema validation rules)
//! are out of scope for the core and are expected to be swapped for a
//! real backend by an integrator.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::{Tool, ToolOutput, ToolParam, ToolSpec};

pub struct RunPerformanceTestTool;

#[async_trait]
impl Tool for RunPerformanceTestTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "run_performance_test".to_string(),
            description: "Runs a load test against a URL and reports latency/throughput (external collaborator).".to_string(),
            params: vec![
                ToolParam { name: "url".to_string(), description: "Target URL".to_string(), required: true },
                ToolParam { name: "duration_seconds".to_string(), description: "Test duration".to_string(), required: false },
            ],
        }
    }

    async fn execute(&self, args: &Value) -> Result<ToolOutput> {
        let url = match args.get("url").and_then(Value::as_str) {
            Some(u) => u,
            None => return Ok(ToolOutput::failed("missing required param: url")),
        };
        Ok(ToolOutput::failed(format!(
            "run_performance_test is an external collaborator stub; no load-test backend is configured for {url}"
        )))
    }
}

pub struct RunSecurityScanTool;

#[async_trait]
impl Tool for RunSecurityScanTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "run_security_scan".to_string(),
            description: "Runs a vulnerability scan against a URL (external collaborator).".to_string(),
            params: vec![ToolParam { name: "url".to_string(), description: "Target URL".to_string(), required: true }],
        }
    }

    async fn execute(&self, args: &Value) -> Result<ToolOutput> {
        let url = match args.get("url").and_then(Value::as_str) {
            Some(u) => u,
            None => return Ok(ToolOutput::failed("missing required param: url")),
        };
        Ok(ToolOutput::failed(format!(
            "run_security_scan is an external collaborator stub; no scanner backend is configured for {url}"
        )))
    }
}

pub struct ValidateSchemaTool;

#[async_trait]
impl Tool for ValidateSchemaTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "validate_schema".to_string(),
            description: "Validates the last response body against a JSON schema (external collaborator).".to_string(),
            params: vec![ToolParam { name: "schema".to_string(), description: "JSON schema document".to_string(), required: true }],
        }
    }

    async fn execute(&self, _args: &Value) -> Result<ToolOutput> {
        Ok(ToolOutput::failed(
            "validate_schema is an external collaborator stub; no schema validator backend is configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn performance_stub_names_the_missing_backend() {
        let tool = RunPerformanceTestTool;
        let out = tool.execute(&serde_json::json!({ "url": "http://x" })).await.unwrap();
        assert!(!out.success);
        assert!(out.output.contains("external collaborator"));
    }

    #[tokio::test]
    async fn security_scan_requires_url() {
        let tool = RunSecurityScanTool;
        let out = tool.execute(&serde_json::json!({})).await.unwrap();
        assert!(!out.success);
        assert!(out.output.contains("missing required param"));
    }
}
