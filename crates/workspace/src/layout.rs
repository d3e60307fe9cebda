use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use crate::schema::{WorkspaceCounts, WorkspaceManifest};

/// Bootstraps and maintains the on-disk `.falcon/` tree. Idempotent: safe
/// to run on upgrades — creates missing subdirectories, never overwrites
/// existing content. The manifest it maintains is advisory; reads must
/// not depend on it for correctness.
pub struct WorkspaceLayout {
    pub root: PathBuf,
}

const SUBDIRS: &[&str] = &[
    "requests",
    "environments",
    "baselines",
    "flows",
    "reports",
    "sessions",
    "logs",
];

impl WorkspaceLayout {
    pub fn bootstrap(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        for subdir in SUBDIRS {
            fs::create_dir_all(root.join(subdir))?;
        }

        let knowledge_base = root.join("knowledge-base.md");
        if !knowledge_base.exists() {
            fs::write(&knowledge_base, "# Falcon knowledge base\n\nNotes the agent accumulates about this project.\n")?;
        }

        let manifest_path = root.join("manifest.json");
        if !manifest_path.exists() {
            let manifest = WorkspaceManifest::default();
            fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
        }

        Ok(Self { root })
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    pub fn requests_dir(&self) -> PathBuf {
        self.root.join("requests")
    }

    pub fn environments_dir(&self) -> PathBuf {
        self.root.join("environments")
    }

    pub fn baselines_dir(&self) -> PathBuf {
        self.root.join("baselines")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn history_path(&self) -> PathBuf {
        self.root.join("history.jsonl")
    }

    pub fn memory_path(&self) -> PathBuf {
        self.root.join("memory.json")
    }

    pub fn variables_path(&self) -> PathBuf {
        self.root.join("variables.json")
    }

    pub fn knowledge_base_path(&self) -> PathBuf {
        self.root.join("knowledge-base.md")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.yaml")
    }

    /// Updates the manifest's counts and timestamp. Best-effort: failures
    /// are logged and swallowed, since the manifest is advisory.
    pub fn update_manifest(&self, counts: WorkspaceCounts) {
        let manifest = WorkspaceManifest {
            counts,
            last_updated: Utc::now(),
        };
        match serde_json::to_string_pretty(&manifest) {
            Ok(rendered) => {
                if let Err(err) = fs::write(self.manifest_path(), rendered) {
                    debug!(?err, "failed to persist workspace manifest");
                }
            }
            Err(err) => debug!(?err, "failed to serialize workspace manifest"),
        }
    }

    pub fn read_manifest(&self) -> WorkspaceManifest {
        fs::read_to_string(self.manifest_path())
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }
}

pub fn exists(root: &Path) -> bool {
    root.join("manifest.json").exists()
}
