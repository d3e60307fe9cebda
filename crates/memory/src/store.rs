use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use tracing::{debug, warn};

use falcon_workspace::{FalconError, SecretDetector};

use crate::schema::{MemoryCategory, MemoryEntry, MemoryFile};
use crate::session_log::SessionEntry;

/// Versioned facts, upserted by key. Loads on construction and tolerates
/// legacy `{}` files by treating them as empty. Every mutation persists
/// atomically (write-whole-file under lock) so the store never holds
/// state the disk disagrees with.
pub struct MemoryStore {
    path: PathBuf,
    entries: RwLock<Vec<MemoryEntry>>,
}

impl MemoryStore {
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<MemoryFile>(&raw)
                .map(|file| file.entries)
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Fails with a `SecretViolation` (and does not mutate the store) when
    /// `isSecret(key, value)` holds. Categories default to `General`.
    pub fn save(
        &self,
        key: &str,
        value: &str,
        category: MemoryCategory,
        session_id: &str,
    ) -> Result<(), FalconError> {
        if SecretDetector::is_secret(key, value) {
            warn!(key, "refused to persist memory entry that looks like a secret");
            return Err(FalconError::SecretViolation(format!(
                "refusing to remember '{key}': value looks like a secret"
            )));
        }

        let entry = MemoryEntry {
            key: key.to_string(),
            value: value.to_string(),
            category,
            timestamp: chrono::Utc::now(),
            source_session_id: session_id.to_string(),
        };

        {
            let mut entries = self.entries.write().unwrap();
            if let Some(existing) = entries.iter_mut().find(|e| e.key == key) {
                *existing = entry;
            } else {
                entries.push(entry);
            }
        }

        self.persist()
            .map_err(|err| FalconError::ToolExecution(err.to_string()))
    }

    /// Substring, case-insensitive match across key, value, and category.
    pub fn recall(&self, query: &str) -> Vec<MemoryEntry> {
        let query = query.to_lowercase();
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|entry| {
                entry.key.to_lowercase().contains(&query)
                    || entry.value.to_lowercase().contains(&query)
                    || format!("{:?}", entry.category).to_lowercase().contains(&query)
            })
            .cloned()
            .collect()
    }

    /// Exact-key removal.
    pub fn forget(&self, key: &str) -> anyhow::Result<bool> {
        let removed = {
            let mut entries = self.entries.write().unwrap();
            let before = entries.len();
            entries.retain(|e| e.key != key);
            entries.len() < before
        };
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn all(&self) -> Vec<MemoryEntry> {
        self.entries.read().unwrap().clone()
    }

    /// A short prompt-injectable block listing the last 3 sessions
    /// (caller-supplied, already truncated to that window) and the
    /// current facts. Empty string when both are empty.
    pub fn get_compact_summary(&self, recent_sessions: &[SessionEntry]) -> String {
        let facts = self.entries.read().unwrap();
        if recent_sessions.is_empty() && facts.is_empty() {
            return String::new();
        }

        let mut block = String::new();
        if !recent_sessions.is_empty() {
            block.push_str("recent sessions:\n");
            for session in recent_sessions {
                block.push_str(&format!("- {}: {}\n", session.session_id, session.summary));
            }
        }
        if !facts.is_empty() {
            block.push_str("facts:\n");
            for entry in facts.iter() {
                block.push_str(&format!("- {}: {}\n", entry.key, entry.value));
            }
        }
        block.trim_end().to_string()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = MemoryFile {
            version: 1,
            entries: self.entries.read().unwrap().clone(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        debug!(path = %self.path.display(), entries = file.entries.len(), "persisted memory store");
        Ok(())
    }
}
