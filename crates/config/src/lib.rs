use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Coarse approval behaviour for `ConfirmableTool` execution.
///
/// `Autonomous` never pauses for approval, `Safer` always does, and
/// `Balanced` exempts read-only tools. See the Confirmation Manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalMode {
    Autonomous,
    Balanced,
    Safer,
}

impl Default for ApprovalMode {
    fn default() -> Self {
        ApprovalMode::Balanced
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub workspace_path: String,
    pub framework: String,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            workspace_path: ".falcon".to_string(),
            framework: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub provider: String,
    pub model: String,
    pub base_url: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3.1:8b".to_string(),
            base_url: "http://localhost:11434".to_string(),
        }
    }
}

/// Per-tool call budgets plus the session-wide ceiling. Missing tool names
/// fall back to `default_tool_limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolLimitsSection {
    pub total_limit: u32,
    pub default_tool_limit: u32,
    pub per_tool: std::collections::HashMap<String, u32>,
}

impl Default for ToolLimitsSection {
    fn default() -> Self {
        let mut per_tool = std::collections::HashMap::new();
        per_tool.insert("http_request".to_string(), 25);
        per_tool.insert("run_performance_test".to_string(), 5);
        per_tool.insert("run_security_scan".to_string(), 5);
        per_tool.insert("write_file".to_string(), 20);
        Self {
            total_limit: 200,
            default_tool_limit: 100,
            per_tool,
        }
    }
}

impl ToolLimitsSection {
    pub fn limit_for(&self, tool_name: &str) -> u32 {
        self.per_tool
            .get(tool_name)
            .copied()
            .unwrap_or(self.default_tool_limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub approval_mode: ApprovalMode,
    pub allow_shell: bool,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            approval_mode: ApprovalMode::Balanced,
            allow_shell: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self { port: 4173 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FalconConfig {
    pub agent: AgentSection,
    pub llm: LlmSection,
    pub tools: ToolLimitsSection,
    pub safety: SafetyConfig,
    pub telemetry: TelemetryConfig,
    pub web: WebConfig,
}

impl FalconConfig {
    /// Loads `config.yaml`, falling back to defaults when the file is
    /// absent or unparsable. `OLLAMA_BASE_URL` overrides `llm.base_url`
    /// when set, mirroring the workspace's `.env`-style credential file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = serde_yaml::from_str(&raw)?;
        }

        if let Ok(value) = env::var("OLLAMA_BASE_URL") {
            if !value.is_empty() {
                config.llm.base_url = value;
            }
        }

        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = serde_yaml::to_string(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_balanced_approval() {
        let config = FalconConfig::default();
        assert_eq!(config.safety.approval_mode, ApprovalMode::Balanced);
    }

    #[test]
    fn tool_limit_falls_back_to_default() {
        let limits = ToolLimitsSection::default();
        assert_eq!(limits.limit_for("http_request"), 25);
        assert_eq!(limits.limit_for("read_file"), limits.default_tool_limit);
    }

    #[test]
    fn load_from_missing_path_returns_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = FalconConfig::load_from(dir.path().join("config.yaml"))?;
        assert_eq!(config.llm.provider, "ollama");
        Ok(())
    }

    #[test]
    fn save_then_load_round_trips() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yaml");
        let mut config = FalconConfig::default();
        config.llm.model = "gpt-4o-mini".to_string();
        config.save_to(&path)?;

        let loaded = FalconConfig::load_from(&path)?;
        assert_eq!(loaded.llm.model, "gpt-4o-mini");
        Ok(())
    }
}
