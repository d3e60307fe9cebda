//! Filesystem tools: read, regex/substring search, and a confirmable write —
//! all scoped to the project root via the workspace containment check.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use walkdir::WalkDir;

use falcon_workspace::ensure_within_workspace;

use crate::confirm::{ConfirmationDecision, ConfirmationRequest, ConfirmationSender};
use crate::{ConfirmableTool, Tool, ToolOutput, ToolParam, ToolSpec};

/// Largest byte offset ≤ `max` that falls on a UTF-8 character boundary.
fn truncate_byte_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

pub struct ReadFileTool {
    pub project_root: PathBuf,
}

#[async_trait]
impl Tool for ReadFileTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "read_file".to_string(),
            description: "Reads the contents of a file within the project root.".to_string(),
            params: vec![
                ToolParam { name: "path".to_string(), description: "Relative path from the project root".to_string(), required: true },
                ToolParam { name: "max_bytes".to_string(), description: "Maximum bytes to read (default 65536)".to_string(), required: false },
            ],
        }
    }

    async fn execute(&self, args: &Value) -> Result<ToolOutput> {
        let rel_path = match args.get("path").and_then(Value::as_str) {
            Some(p) => p,
            None => return Ok(ToolOutput::failed("missing required param: path")),
        };
        let resolved = match ensure_within_workspace(&self.project_root, std::path::Path::new(rel_path)) {
            Ok(p) => p,
            Err(err) => return Ok(ToolOutput::failed(err.to_string())),
        };

        let max_bytes = args.get("max_bytes").and_then(Value::as_u64).unwrap_or(65536) as usize;
        let content = match std::fs::read_to_string(&resolved) {
            Ok(c) => c,
            Err(err) => return Ok(ToolOutput::failed(format!("cannot read '{rel_path}': {err}"))),
        };

        let output = if content.len() > max_bytes {
            let end = truncate_byte_boundary(&content, max_bytes);
            format!("{}…[truncated at {max_bytes} bytes]", &content[..end])
        } else {
            content
        };

        Ok(ToolOutput::ok(output))
    }
}

/// Substring or regex search across files under the project root.
/// Per the Non-goals, this is textual matching only — no AST awareness.
pub struct SearchCodeTool {
    pub project_root: PathBuf,
}

#[async_trait]
impl Tool for SearchCodeTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "search_code".to_string(),
            description: "Searches files under the project root for a substring or regex pattern.".to_string(),
            params: vec![
                ToolParam { name: "pattern".to_string(), description: "Substring or regex to search for".to_string(), required: true },
                ToolParam { name: "regex".to_string(), description: "Treat pattern as a regex (default false)".to_string(), required: false },
                ToolParam { name: "max_results".to_string(), description: "Maximum matches to return (default 50)".to_string(), required: false },
            ],
        }
    }

    async fn execute(&self, args: &Value) -> Result<ToolOutput> {
        let pattern = match args.get("pattern").and_then(Value::as_str) {
            Some(p) => p,
            None => return Ok(ToolOutput::failed("missing required param: pattern")),
        };
        let use_regex = args.get("regex").and_then(Value::as_bool).unwrap_or(false);
        let max_results = args.get("max_results").and_then(Value::as_u64).unwrap_or(50) as usize;

        let compiled = if use_regex {
            match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(err) => return Ok(ToolOutput::failed(format!("invalid regex: {err}"))),
            }
        } else {
            None
        };

        let mut matches = Vec::new();
        for entry in WalkDir::new(&self.project_root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if matches.len() >= max_results {
                break;
            }
            let Ok(content) = std::fs::read_to_string(entry.path()) else { continue };
            for (line_no, line) in content.lines().enumerate() {
                let found = match &compiled {
                    Some(re) => re.is_match(line),
                    None => line.contains(pattern),
                };
                if found {
                    let rel = entry.path().strip_prefix(&self.project_root).unwrap_or(entry.path());
                    matches.push(format!("{}:{}: {}", rel.display(), line_no + 1, line.trim()));
                    if matches.len() >= max_results {
                        break;
                    }
                }
            }
        }

        if matches.is_empty() {
            Ok(ToolOutput::ok("no matches".to_string()))
        } else {
            Ok(ToolOutput::ok(matches.join("\n")))
        }
    }
}

/// A `ConfirmableTool`: proposes a diff and blocks on the Confirmation
/// Manager before writing anything to disk.
pub struct WriteFileTool {
    pub project_root: PathBuf,
    confirmation: Mutex<Option<ConfirmationSender>>,
}

impl WriteFileTool {
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root, confirmation: Mutex::new(None) }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "write_file".to_string(),
            description: "Writes content to a file within the project root after user approval (creates or overwrites).".to_string(),
            params: vec![
                ToolParam { name: "path".to_string(), description: "Relative path from the project root".to_string(), required: true },
                ToolParam { name: "content".to_string(), description: "File content to write".to_string(), required: true },
            ],
        }
    }

    async fn execute(&self, args: &Value) -> Result<ToolOutput> {
        let rel_path = match args.get("path").and_then(Value::as_str) {
            Some(p) => p,
            None => return Ok(ToolOutput::failed("missing required param: path")),
        };
        let new_content = match args.get("content").and_then(Value::as_str) {
            Some(c) => c.to_string(),
            None => return Ok(ToolOutput::failed("missing required param: content")),
        };

        let target = self.project_root.join(rel_path);
        let original_content = std::fs::read_to_string(&target).ok();

        let diff = match &original_content {
            Some(original) => format!("--- {rel_path}\n+++ {rel_path}\n-{original}\n+{new_content}"),
            None => format!("--- /dev/null\n+++ {rel_path}\n+{new_content}"),
        };

        let request = ConfirmationRequest {
            tool_name: "write_file".to_string(),
            target_path: rel_path.to_string(),
            original_content: original_content.clone(),
            new_content: new_content.clone(),
            diff,
        };

        let sender = self.confirmation.lock().unwrap().clone();
        let decision = match sender {
            Some(tx) => {
                let (verdict_tx, verdict_rx) = tokio::sync::oneshot::channel();
                if tx.send((request, verdict_tx)).await.is_err() {
                    ConfirmationDecision::Reject
                } else {
                    verdict_rx.await.unwrap_or(ConfirmationDecision::Reject)
                }
            }
            None => ConfirmationDecision::Reject,
        };

        if decision != ConfirmationDecision::Approve {
            return Ok(ToolOutput::failed("write rejected: no approval received"));
        }

        let resolved_parent = match target.parent() {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                match ensure_within_workspace(&self.project_root, parent.strip_prefix(&self.project_root).unwrap_or(parent)) {
                    Ok(p) => p,
                    Err(err) => return Ok(ToolOutput::failed(err.to_string())),
                }
            }
            None => return Ok(ToolOutput::failed("invalid path")),
        };

        let final_target = resolved_parent.join(target.file_name().unwrap());
        std::fs::write(&final_target, &new_content)?;
        Ok(ToolOutput::ok(format!("wrote {} bytes to {rel_path}", new_content.len())))
    }

    fn as_confirmable(&self) -> Option<&dyn ConfirmableTool> {
        Some(self)
    }
}

#[async_trait]
impl ConfirmableTool for WriteFileTool {
    fn set_confirmation_sender(&self, tx: ConfirmationSender) {
        *self.confirmation.lock().unwrap() = Some(tx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_file_returns_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let tool = ReadFileTool { project_root: dir.path().to_path_buf() };
        let out = tool.execute(&serde_json::json!({ "path": "a.txt" })).await.unwrap();
        assert_eq!(out.output, "hello");
    }

    #[tokio::test]
    async fn read_file_rejects_escape() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("child")).unwrap();
        let tool = ReadFileTool { project_root: dir.path().join("child") };
        let out = tool.execute(&serde_json::json!({ "path": "../../etc/passwd" })).await.unwrap();
        assert!(!out.success);
    }

    #[tokio::test]
    async fn search_code_finds_substring() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}\nlet token = 1;").unwrap();
        let tool = SearchCodeTool { project_root: dir.path().to_path_buf() };
        let out = tool.execute(&serde_json::json!({ "pattern": "token" })).await.unwrap();
        assert!(out.output.contains("a.rs:2"));
    }

    #[tokio::test]
    async fn write_file_without_confirmation_sender_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::new(dir.path().to_path_buf());
        let out = tool
            .execute(&serde_json::json!({ "path": "new.txt", "content": "hi" }))
            .await
            .unwrap();
        assert!(!out.success);
        assert!(!dir.path().join("new.txt").exists());
    }

    #[tokio::test]
    async fn write_file_writes_after_approval() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::new(dir.path().to_path_buf());
        let (tx, mut rx) = tokio::sync::mpsc::channel(1);
        tool.set_confirmation_sender(tx);

        let approver = tokio::spawn(async move {
            let (_request, verdict_tx) = rx.recv().await.unwrap();
            verdict_tx.send(ConfirmationDecision::Approve).unwrap();
        });

        let out = tool
            .execute(&serde_json::json!({ "path": "new.txt", "content": "hi" }))
            .await
            .unwrap();
        approver.await.unwrap();

        assert!(out.success);
        assert_eq!(std::fs::read_to_string(dir.path().join("new.txt")).unwrap(), "hi");
    }

    #[tokio::test]
    async fn write_file_rejected_verdict_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::new(dir.path().to_path_buf());
        let (tx, mut rx) = tokio::sync::mpsc::channel(1);
        tool.set_confirmation_sender(tx);

        let rejecter = tokio::spawn(async move {
            let (_request, verdict_tx) = rx.recv().await.unwrap();
            verdict_tx.send(ConfirmationDecision::Reject).unwrap();
        });

        let out = tool
            .execute(&serde_json::json!({ "path": "new.txt", "content": "hi" }))
            .await
            .unwrap();
        rejecter.await.unwrap();

        assert!(!out.success);
        assert!(!dir.path().join("new.txt").exists());
    }

    #[tokio::test]
    async fn write_file_cancelled_channel_is_treated_as_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::new(dir.path().to_path_buf());
        let (tx, mut rx) = tokio::sync::mpsc::channel(1);
        tool.set_confirmation_sender(tx);

        let dropper = tokio::spawn(async move {
            let (_request, verdict_tx) = rx.recv().await.unwrap();
            drop(verdict_tx);
        });

        let out = tool
            .execute(&serde_json::json!({ "path": "new.txt", "content": "hi" }))
            .await
            .unwrap();
        dropper.await.unwrap();

        assert!(!out.success);
        assert!(!dir.path().join("new.txt").exists());
    }
}
