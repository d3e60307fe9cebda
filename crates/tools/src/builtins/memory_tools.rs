//! Memory Store `save`/`recall` wrappers, exposed as tools.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use falcon_memory::{MemoryCategory, MemoryStore};

use crate::{Tool, ToolOutput, ToolParam, ToolSpec};

pub struct RememberTool {
    pub memory: Arc<MemoryStore>,
    pub session_id: String,
}

fn parse_category(value: Option<&str>) -> MemoryCategory {
    match value.map(str::to_lowercase).as_deref() {
        Some("preference") => MemoryCategory::Preference,
        Some("endpoint") => MemoryCategory::Endpoint,
        Some("error") => MemoryCategory::Error,
        Some("project") => MemoryCategory::Project,
        _ => MemoryCategory::General,
    }
}

#[async_trait]
impl Tool for RememberTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "remember".to_string(),
            description: "Saves a key/value fact to persistent memory, upserted by key.".to_string(),
            params: vec![
                ToolParam { name: "key".to_string(), description: "Fact key".to_string(), required: true },
                ToolParam { name: "value".to_string(), description: "Fact value".to_string(), required: true },
                ToolParam { name: "category".to_string(), description: "preference|endpoint|error|project|general".to_string(), required: false },
            ],
        }
    }

    async fn execute(&self, args: &Value) -> Result<ToolOutput> {
        let key = match args.get("key").and_then(Value::as_str) {
            Some(k) => k,
            None => return Ok(ToolOutput::failed("missing required param: key")),
        };
        let value = match args.get("value").and_then(Value::as_str) {
            Some(v) => v,
            None => return Ok(ToolOutput::failed("missing required param: value")),
        };
        let category = parse_category(args.get("category").and_then(Value::as_str));

        match self.memory.save(key, value, category, &self.session_id) {
            Ok(()) => Ok(ToolOutput::ok(format!("remembered '{key}'"))),
            Err(err) => Ok(ToolOutput::failed(err.to_string())),
        }
    }
}

pub struct RecallTool {
    pub memory: Arc<MemoryStore>,
}

#[async_trait]
impl Tool for RecallTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "recall".to_string(),
            description: "Searches memory for entries whose key, value, or category matches a query.".to_string(),
            params: vec![ToolParam { name: "query".to_string(), description: "Case-insensitive substring".to_string(), required: true }],
        }
    }

    async fn execute(&self, args: &Value) -> Result<ToolOutput> {
        let query = match args.get("query").and_then(Value::as_str) {
            Some(q) => q,
            None => return Ok(ToolOutput::failed("missing required param: query")),
        };
        let found = self.memory.recall(query);
        if found.is_empty() {
            Ok(ToolOutput::ok("no matching memories".to_string()))
        } else {
            let rendered = found.iter().map(|e| format!("{}={}", e.key, e.value)).collect::<Vec<_>>().join(", ");
            Ok(ToolOutput::ok(rendered))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::load(tempfile::tempdir().unwrap().path().join("memory.json")).unwrap())
    }

    #[tokio::test]
    async fn remember_then_recall_round_trips() {
        let memory = memory();
        let remember = RememberTool { memory: memory.clone(), session_id: "s1".to_string() };
        remember.execute(&serde_json::json!({ "key": "base_url", "value": "http://x" })).await.unwrap();

        let recall = RecallTool { memory };
        let out = recall.execute(&serde_json::json!({ "query": "base" })).await.unwrap();
        assert!(out.output.contains("base_url=http://x"));
    }

    #[tokio::test]
    async fn remember_rejects_secret_shaped_value() {
        let memory = memory();
        let remember = RememberTool { memory, session_id: "s1".to_string() };
        let out = remember
            .execute(&serde_json::json!({ "key": "api_key", "value": "sk-abcdefghijklmnopqrstuvwxyz" }))
            .await
            .unwrap();
        assert!(!out.success);
    }
}
