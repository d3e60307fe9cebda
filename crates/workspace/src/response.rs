use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use crate::error::FalconError;

#[derive(Debug, Clone)]
pub struct LastResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub duration: Duration,
}

/// Holds at most one "last response" record, shared between the HTTP
/// tool (writer) and assertion/extraction/schema tools (readers). A
/// per-session singleton injected into the registry, never a process
/// global.
#[derive(Default)]
pub struct ResponseManager {
    last: RwLock<Option<LastResponse>>,
}

impl ResponseManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, response: LastResponse) {
        *self.last.write().unwrap() = Some(response);
    }

    pub fn get(&self) -> Result<LastResponse, FalconError> {
        self.last
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| {
                FalconError::ToolExecution(
                    "no HTTP response available — make an http_request first".to_string(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_before_any_write_fails_with_known_diagnostic() {
        let manager = ResponseManager::new();
        let err = manager.get().unwrap_err();
        assert!(err.to_string().contains("make an http_request first"));
    }

    #[test]
    fn write_then_read_returns_the_same_response() {
        let manager = ResponseManager::new();
        manager.set(LastResponse {
            status: 200,
            headers: HashMap::new(),
            body: "ok".to_string(),
            duration: Duration::from_millis(5),
        });
        let response = manager.get().unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "ok");
    }
}
