//! Executes an HTTP call and stores the result in the Response Manager.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use falcon_workspace::{LastResponse, ResponseManager, VariableStore};

use crate::{Tool, ToolOutput, ToolParam, ToolSpec};

pub struct HttpRequestTool {
    pub client: reqwest::Client,
    pub variables: Arc<VariableStore>,
    pub responses: Arc<ResponseManager>,
}

#[async_trait]
impl Tool for HttpRequestTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "http_request".to_string(),
            description: "Executes an HTTP request (method, url, headers, body) after variable substitution and stores the response.".to_string(),
            params: vec![
                ToolParam { name: "method".to_string(), description: "HTTP method, e.g. GET/POST".to_string(), required: true },
                ToolParam { name: "url".to_string(), description: "Request URL, may contain {{VAR}} placeholders".to_string(), required: true },
                ToolParam { name: "headers".to_string(), description: "Object of header name/value pairs".to_string(), required: false },
                ToolParam { name: "body".to_string(), description: "Request body, may contain {{VAR}} placeholders".to_string(), required: false },
            ],
        }
    }

    async fn execute(&self, args: &Value) -> Result<ToolOutput> {
        let method = args
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("missing required param: method"))?;
        let raw_url = args
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("missing required param: url"))?;

        let url = self.variables.substitute(raw_url);
        let body = args
            .get("body")
            .and_then(Value::as_str)
            .map(|b| self.variables.substitute(b))
            .unwrap_or_default();

        let mut headers = HashMap::new();
        if let Some(obj) = args.get("headers").and_then(Value::as_object) {
            for (k, v) in obj {
                if let Some(v) = v.as_str() {
                    headers.insert(k.clone(), self.variables.substitute(v));
                }
            }
        }

        let method = match reqwest::Method::from_bytes(method.to_uppercase().as_bytes()) {
            Ok(m) => m,
            Err(_) => return Ok(ToolOutput::failed(format!("unsupported HTTP method '{method}'"))),
        };

        debug!(method = %method, url = %url, "dispatching http_request");
        let mut request = self.client.request(method, &url);
        for (name, value) in &headers {
            request = request.header(name, value);
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        let started = Instant::now();
        let response = match request.send().await {
            Ok(r) => r,
            Err(err) => {
                warn!(%err, url = %url, "http_request transport failure");
                return Ok(ToolOutput::failed(format!("request failed: {err}")));
            }
        };

        let status = response.status().as_u16();
        let mut response_headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                response_headers.insert(name.to_string(), value.to_string());
            }
        }
        let response_body = response.text().await.unwrap_or_default();
        let duration = started.elapsed();

        self.responses.set(LastResponse {
            status,
            headers: response_headers,
            body: response_body.clone(),
            duration,
        });

        Ok(ToolOutput::ok(format!(
            "{status} in {}ms, {} bytes",
            duration.as_millis(),
            response_body.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_names_required_params() {
        let tool = HttpRequestTool {
            client: reqwest::Client::new(),
            variables: Arc::new(VariableStore::load(std::env::temp_dir().join("unused-variables.json")).unwrap()),
            responses: Arc::new(ResponseManager::new()),
        };
        let spec = tool.spec();
        assert_eq!(spec.name, "http_request");
        assert!(spec.params.iter().any(|p| p.name == "method" && p.required));
        assert!(spec.params.iter().any(|p| p.name == "url" && p.required));
    }

    #[tokio::test]
    async fn unsupported_method_fails_without_network() {
        let tool = HttpRequestTool {
            client: reqwest::Client::new(),
            variables: Arc::new(VariableStore::load(std::env::temp_dir().join("unused-variables-2.json")).unwrap()),
            responses: Arc::new(ResponseManager::new()),
        };
        let args = serde_json::json!({ "method": "NOT A VERB", "url": "http://example.invalid" });
        let out = tool.execute(&args).await.unwrap();
        assert!(!out.success);
    }
}
