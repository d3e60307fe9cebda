use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::FalconError;
use crate::secrets::SecretDetector;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableScope {
    Session,
    Global,
}

#[derive(Debug, Clone)]
pub struct ScopedVariable {
    pub name: String,
    pub value: String,
    pub scope: VariableScope,
}

/// Session (process-lifetime) and global (persisted) variables, substituted
/// into request text via `{{NAME}}`. Reads and writes are guarded by a
/// single reader/writer lock; persistence failures propagate to the caller
/// while in-memory state stays authoritative for the rest of the session.
pub struct VariableStore {
    session: RwLock<HashMap<String, String>>,
    global: RwLock<HashMap<String, String>>,
    global_path: PathBuf,
}

impl VariableStore {
    pub fn load(global_path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let global_path = global_path.into();
        let global = if let Ok(raw) = fs::read_to_string(&global_path) {
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            HashMap::new()
        };

        Ok(Self {
            session: RwLock::new(HashMap::new()),
            global: RwLock::new(global),
            global_path,
        })
    }

    pub fn set(&self, name: &str, value: &str) {
        self.session
            .write()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    /// Stores in `global`, returning a warning string when the pair looks
    /// like a secret, and persists the whole global map atomically.
    pub fn set_global(&self, name: &str, value: &str) -> anyhow::Result<Option<String>> {
        let warning = if SecretDetector::is_secret(name, value) {
            Some(format!(
                "warning: '{name}' looks like a secret; consider storing it outside version control"
            ))
        } else {
            None
        };

        self.global
            .write()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        self.persist()?;
        Ok(warning)
    }

    pub fn get(&self, name: &str) -> Option<String> {
        if let Some(value) = self.session.read().unwrap().get(name) {
            return Some(value.clone());
        }
        self.global.read().unwrap().get(name).cloned()
    }

    pub fn delete(&self, name: &str) -> anyhow::Result<()> {
        self.session.write().unwrap().remove(name);
        let removed_global = self.global.write().unwrap().remove(name).is_some();
        if removed_global {
            self.persist()?;
        }
        Ok(())
    }

    pub fn list(&self) -> Vec<ScopedVariable> {
        let mut result: Vec<ScopedVariable> = self
            .session
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| ScopedVariable {
                name: k.clone(),
                value: v.clone(),
                scope: VariableScope::Session,
            })
            .collect();
        result.extend(self.global.read().unwrap().iter().map(|(k, v)| ScopedVariable {
            name: k.clone(),
            value: v.clone(),
            scope: VariableScope::Global,
        }));
        result
    }

    /// Replaces every `{{NAME}}` occurrence with its resolved value.
    /// Unresolved placeholders are left intact.
    pub fn substitute(&self, text: &str) -> String {
        PLACEHOLDER
            .replace_all(text, |caps: &regex::Captures| {
                let name = &caps[1];
                self.get(name).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    fn persist(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.global_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let global = self.global.read().unwrap();
        let rendered = serde_json::to_string_pretty(&*global)?;
        fs::write(&self.global_path, rendered)?;
        Ok(())
    }
}

pub fn ensure_within_workspace(workspace_root: &Path, target: &Path) -> Result<PathBuf, FalconError> {
    let canonical_root = workspace_root
        .canonicalize()
        .map_err(FalconError::Io)?;
    let joined = if target.is_absolute() {
        target.to_path_buf()
    } else {
        canonical_root.join(target)
    };
    let canonical_target = joined.canonicalize().map_err(FalconError::Io)?;

    if !canonical_target.starts_with(&canonical_root) {
        return Err(FalconError::ToolExecution(format!(
            "path escapes workspace boundary: {}",
            canonical_target.display()
        )));
    }

    Ok(canonical_target)
}
