use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedRequest {
    pub name: String,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Environment {
    #[serde(flatten)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkspaceCounts {
    pub requests: usize,
    pub environments: usize,
    pub baselines: usize,
    pub variables: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceManifest {
    pub counts: WorkspaceCounts,
    pub last_updated: DateTime<Utc>,
}

impl Default for WorkspaceManifest {
    fn default() -> Self {
        Self {
            counts: WorkspaceCounts::default(),
            last_updated: Utc::now(),
        }
    }
}
