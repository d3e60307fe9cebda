use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntry {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub summary: String,
    pub topics: BTreeSet<String>,
    pub tools_used: BTreeSet<String>,
    pub turn_count: u32,
}

/// Maintained by the agent across one conversation: started at conversation
/// start, accumulates tool/turn counters as the loop runs, and appended to
/// the unified session history log (one JSON object per line) when closed.
/// `end()` also writes a standalone per-session detail file under the
/// workspace's `sessions/` directory.
pub struct SessionLog {
    history_path: PathBuf,
    sessions_dir: PathBuf,
    session_id: String,
    start_time: DateTime<Utc>,
    topics: BTreeSet<String>,
    tools_used: BTreeSet<String>,
    turn_count: u32,
    first_user_message: Option<String>,
}

impl SessionLog {
    pub fn start(history_path: impl Into<PathBuf>, sessions_dir: impl Into<PathBuf>) -> Self {
        let start_time = Utc::now();
        Self {
            history_path: history_path.into(),
            sessions_dir: sessions_dir.into(),
            session_id: format!("{}-{}", start_time.format("%Y%m%dT%H%M%S"), Uuid::new_v4()),
            start_time,
            topics: BTreeSet::new(),
            tools_used: BTreeSet::new(),
            turn_count: 0,
            first_user_message: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn record_turn(&mut self, user_message: &str) {
        self.turn_count += 1;
        if self.first_user_message.is_none() {
            self.first_user_message = Some(user_message.to_string());
        }
    }

    pub fn record_tool_use(&mut self, tool_name: &str) {
        self.tools_used.insert(tool_name.to_string());
    }

    pub fn record_topic(&mut self, topic: &str) {
        self.topics.insert(topic.to_string());
    }

    /// Appends one JSON object to the history file and writes this
    /// session's standalone detail file (`sessions/session_<ts>.json`).
    /// When `summary` is `None`, builds a deterministic fallback from the
    /// first user message (truncated), the topics, and the tool count.
    pub fn end(&self, summary: Option<String>) -> anyhow::Result<SessionEntry> {
        let summary = summary.unwrap_or_else(|| self.fallback_summary());
        let entry = SessionEntry {
            session_id: self.session_id.clone(),
            start_time: self.start_time,
            end_time: Utc::now(),
            summary,
            topics: self.topics.clone(),
            tools_used: self.tools_used.clone(),
            turn_count: self.turn_count,
        };

        if let Some(parent) = self.history_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.history_path)?;
        writeln!(file, "{}", serde_json::to_string(&entry)?)?;

        std::fs::create_dir_all(&self.sessions_dir)?;
        let detail_path = self.sessions_dir.join(format!("session_{}.json", self.session_id));
        std::fs::write(&detail_path, serde_json::to_string_pretty(&entry)?)?;

        Ok(entry)
    }
}

/// Reads the append-only NDJSON history file and returns the most recent
/// `limit` entries, oldest first. Malformed lines are skipped rather than
/// failing the whole read, since the file is append-only and any prior
/// entry is still meaningful on its own.
pub fn read_recent_sessions(history_path: &std::path::Path, limit: usize) -> Vec<SessionEntry> {
    let Ok(content) = std::fs::read_to_string(history_path) else {
        return Vec::new();
    };
    let entries: Vec<SessionEntry> = content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();
    let start = entries.len().saturating_sub(limit);
    entries[start..].to_vec()
}

impl SessionLog {
    fn fallback_summary(&self) -> String {
        let opener = self
            .first_user_message
            .as_deref()
            .unwrap_or("(no user message)");
        let truncated: String = opener.chars().take(80).collect();
        let topics = if self.topics.is_empty() {
            "no topics".to_string()
        } else {
            self.topics.iter().cloned().collect::<Vec<_>>().join(", ")
        };
        format!(
            "{truncated} — topics: {topics} — {} tool call(s)",
            self.tools_used.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_appends_one_line_per_call() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("history.jsonl");
        let sessions_dir = dir.path().join("sessions");

        let mut log = SessionLog::start(&path, &sessions_dir);
        log.record_turn("hello");
        log.end(Some("first".to_string()))?;

        let mut log2 = SessionLog::start(&path, &sessions_dir);
        log2.record_turn("hi again");
        log2.end(Some("second".to_string()))?;

        let content = std::fs::read_to_string(&path)?;
        assert_eq!(content.lines().count(), 2);
        Ok(())
    }

    #[test]
    fn end_writes_a_standalone_session_detail_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("history.jsonl");
        let sessions_dir = dir.path().join("sessions");

        let mut log = SessionLog::start(&path, &sessions_dir);
        log.record_turn("hello");
        let entry = log.end(Some("first".to_string()))?;

        let detail_path = sessions_dir.join(format!("session_{}.json", entry.session_id));
        assert!(detail_path.is_file());
        let saved: SessionEntry = serde_json::from_str(&std::fs::read_to_string(detail_path)?)?;
        assert_eq!(saved.session_id, entry.session_id);
        Ok(())
    }

    #[test]
    fn fallback_summary_includes_first_message_and_tool_count() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("history.jsonl");
        let sessions_dir = dir.path().join("sessions");

        let mut log = SessionLog::start(&path, &sessions_dir);
        log.record_turn("GET http://x/users and assert 200");
        log.record_tool_use("http_request");
        log.record_tool_use("assert_response");
        let entry = log.end(None)?;

        assert!(entry.summary.contains("GET http://x/users"));
        assert!(entry.summary.contains("2 tool call(s)"));
        Ok(())
    }

    #[test]
    fn turn_count_increments_per_user_turn() {
        let mut log = SessionLog::start(std::env::temp_dir().join("unused.jsonl"), std::env::temp_dir().join("unused-sessions"));
        log.record_turn("one");
        log.record_turn("two");
        assert_eq!(log.turn_count, 2);
    }
}
