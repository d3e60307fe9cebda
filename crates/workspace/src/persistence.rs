use std::fs;
use std::path::PathBuf;

use crate::error::FalconError;
use crate::layout::WorkspaceLayout;
use crate::schema::{Environment, SavedRequest, WorkspaceCounts};

fn slugify(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// CRUD over the two named collections the workspace persists as typed
/// YAML files: saved requests and environments. Each save rewrites the
/// file in place and refreshes the manifest counts; there is no schema
/// versioning since the shape is stable.
pub struct PersistenceManager {
    requests_dir: PathBuf,
    environments_dir: PathBuf,
    layout: std::sync::Arc<WorkspaceLayout>,
}

impl PersistenceManager {
    pub fn new(layout: std::sync::Arc<WorkspaceLayout>) -> Self {
        Self {
            requests_dir: layout.requests_dir(),
            environments_dir: layout.environments_dir(),
            layout,
        }
    }

    pub fn save_request(&self, request: &SavedRequest) -> anyhow::Result<()> {
        let path = self.requests_dir.join(format!("{}.yaml", slugify(&request.name)));
        fs::write(&path, serde_yaml::to_string(request)?)?;
        self.refresh_manifest()?;
        Ok(())
    }

    pub fn load_request(&self, name: &str) -> Result<SavedRequest, FalconError> {
        let path = self.requests_dir.join(format!("{}.yaml", slugify(name)));
        let raw = fs::read_to_string(&path)
            .map_err(|_| FalconError::NotFound(format!("saved request '{name}'")))?;
        serde_yaml::from_str(&raw).map_err(|err| FalconError::Parse(err.to_string()))
    }

    pub fn list_requests(&self) -> anyhow::Result<Vec<String>> {
        list_slugs(&self.requests_dir)
    }

    pub fn save_environment(&self, name: &str, environment: &Environment) -> anyhow::Result<()> {
        let path = self.environments_dir.join(format!("{}.yaml", slugify(name)));
        fs::write(&path, serde_yaml::to_string(environment)?)?;
        self.refresh_manifest()?;
        Ok(())
    }

    pub fn load_environment(&self, name: &str) -> Result<Environment, FalconError> {
        let path = self.environments_dir.join(format!("{}.yaml", slugify(name)));
        let raw = fs::read_to_string(&path)
            .map_err(|_| FalconError::NotFound(format!("environment '{name}'")))?;
        serde_yaml::from_str(&raw).map_err(|err| FalconError::Parse(err.to_string()))
    }

    pub fn list_environments(&self) -> anyhow::Result<Vec<String>> {
        list_slugs(&self.environments_dir)
    }

    fn refresh_manifest(&self) -> anyhow::Result<()> {
        let counts = WorkspaceCounts {
            requests: self.list_requests()?.len(),
            environments: self.list_environments()?.len(),
            baselines: list_slugs(&self.layout.baselines_dir())?.len(),
            variables: 0,
        };
        self.layout.update_manifest(counts);
        Ok(())
    }
}

fn list_slugs(dir: &std::path::Path) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    if !dir.exists() {
        return Ok(names);
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn new_manager() -> (tempfile::TempDir, PersistenceManager) {
        let dir = tempfile::tempdir().unwrap();
        let layout = Arc::new(WorkspaceLayout::bootstrap(dir.path().join(".falcon")).unwrap());
        (dir, PersistenceManager::new(layout))
    }

    #[test]
    fn save_then_load_request_round_trips() {
        let (_dir, manager) = new_manager();
        let request = SavedRequest {
            name: "get-users".to_string(),
            method: "GET".to_string(),
            url: "{{BASE_URL}}/users".to_string(),
            headers: HashMap::new(),
            body: String::new(),
        };
        manager.save_request(&request).unwrap();
        let loaded = manager.load_request("get-users").unwrap();
        assert_eq!(loaded, request);
    }

    #[test]
    fn load_missing_request_is_not_found() {
        let (_dir, manager) = new_manager();
        let err = manager.load_request("missing").unwrap_err();
        assert!(matches!(err, FalconError::NotFound(_)));
    }

    #[test]
    fn list_requests_reflects_saved_names() {
        let (_dir, manager) = new_manager();
        manager
            .save_request(&SavedRequest {
                name: "a".to_string(),
                method: "GET".to_string(),
                url: "u".to_string(),
                headers: HashMap::new(),
                body: String::new(),
            })
            .unwrap();
        manager
            .save_request(&SavedRequest {
                name: "b".to_string(),
                method: "GET".to_string(),
                url: "u".to_string(),
                headers: HashMap::new(),
                body: String::new(),
            })
            .unwrap();
        assert_eq!(manager.list_requests().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn save_then_load_environment_round_trips() {
        let (_dir, manager) = new_manager();
        let mut variables = HashMap::new();
        variables.insert("BASE_URL".to_string(), "http://x".to_string());
        let environment = Environment { variables };
        manager.save_environment("staging", &environment).unwrap();
        let loaded = manager.load_environment("staging").unwrap();
        assert_eq!(loaded, environment);
    }

    #[test]
    fn save_updates_manifest_counts() {
        let (_dir, manager) = new_manager();
        manager
            .save_request(&SavedRequest {
                name: "x".to_string(),
                method: "GET".to_string(),
                url: "u".to_string(),
                headers: HashMap::new(),
                body: String::new(),
            })
            .unwrap();
        assert_eq!(manager.layout.read_manifest().counts.requests, 1);
    }
}
