//! Confirmation Manager: routes approve/reject verdicts from the UI to
//! the tool task blocked on them, and the `ToolExecutor` wrapper that
//! decides, per call and per `ApprovalMode`, whether a `ConfirmableTool`
//! needs a real verdict or can be auto-approved.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, instrument, warn};

use falcon_config::ApprovalMode;
use falcon_tools::{ConfirmationDecision, ConfirmationRequest, ConfirmationSender, ConfirmationVerdict, ToolOutput, ToolRegistry};
use falcon_workspace::FalconError;

pub type ConfirmationReceiver = mpsc::Receiver<(ConfirmationRequest, ConfirmationVerdict)>;

pub fn approval_channel() -> (ConfirmationSender, ConfirmationReceiver) {
    mpsc::channel(16)
}

/// Owns the receiving half of the approval channel. The UI calls `next()`
/// to learn about a pending `confirmation_required` event, presents it to
/// the user, then resolves it by sending through the returned verdict
/// sender. Cancelling — dropping the verdict sender, or the manager being
/// torn down — is observed by the blocked tool as a rejection.
pub struct ConfirmationManager {
    rx: Mutex<ConfirmationReceiver>,
}

impl ConfirmationManager {
    pub fn new(rx: ConfirmationReceiver) -> Self {
        Self { rx: Mutex::new(rx) }
    }

    pub async fn next(&self) -> Option<(ConfirmationRequest, ConfirmationVerdict)> {
        self.rx.lock().await.recv().await
    }
}

/// Immediately approves whatever confirmation request arrives on it. Used
/// under `ApprovalMode::Autonomous`, where the agent never pauses for a
/// human verdict.
fn auto_approve_sender() -> ConfirmationSender {
    let (tx, mut rx) = mpsc::channel::<(ConfirmationRequest, ConfirmationVerdict)>(1);
    tokio::spawn(async move {
        if let Some((_request, verdict)) = rx.recv().await {
            let _ = verdict.send(ConfirmationDecision::Approve);
        }
    });
    tx
}

/// Dispatches `name(args)` against the registry, attaching a confirmation
/// sender to `ConfirmableTool`s per the configured `ApprovalMode` before
/// invocation. Non-confirmable tools run unconditionally.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    approval_mode: ApprovalMode,
    confirmation_tx: Option<ConfirmationSender>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, approval_mode: ApprovalMode) -> Self {
        Self { registry, approval_mode, confirmation_tx: None }
    }

    pub fn with_confirmation(mut self, tx: ConfirmationSender) -> Self {
        self.confirmation_tx = Some(tx);
        self
    }

    #[instrument(skip(self, args))]
    pub async fn execute(&self, name: &str, args: &Value) -> Result<ToolOutput, FalconError> {
        let tool = self.registry.get(name).ok_or_else(|| {
            warn!(tool = name, "dispatch against unregistered tool");
            FalconError::UnknownTool(name.to_string())
        })?;

        if let Some(confirmable) = tool.as_confirmable() {
            match self.approval_mode {
                ApprovalMode::Autonomous => confirmable.set_confirmation_sender(auto_approve_sender()),
                ApprovalMode::Balanced | ApprovalMode::Safer => {
                    if let Some(tx) = &self.confirmation_tx {
                        confirmable.set_confirmation_sender(tx.clone());
                    } else {
                        debug!(tool = name, "no confirmation manager attached; write will default to rejected");
                    }
                }
            }
        }

        tool.execute(args)
            .await
            .map_err(|err| FalconError::ToolExecution(err.to_string()))
    }

    /// Exposes the underlying registry so callers building a prompt or a
    /// parser can read tool specs/names without re-threading them
    /// separately from the executor they already hold.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use falcon_tools::builtins::WriteFileTool;
    use falcon_tools::ToolRegistry;

    fn registry_with_write_file(root: std::path::PathBuf) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::default();
        registry.register(Arc::new(WriteFileTool::new(root)));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn unknown_tool_surfaces_typed_error() {
        let registry = Arc::new(ToolRegistry::default());
        let executor = ToolExecutor::new(registry, ApprovalMode::Balanced);
        let err = executor.execute("does_not_exist", &Value::Null).await.unwrap_err();
        assert!(matches!(err, FalconError::UnknownTool(name) if name == "does_not_exist"));
    }

    #[tokio::test]
    async fn autonomous_mode_auto_approves_confirmable_write() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with_write_file(dir.path().to_path_buf());
        let executor = ToolExecutor::new(registry, ApprovalMode::Autonomous);

        let out = executor
            .execute("write_file", &serde_json::json!({ "path": "a.txt", "content": "hi" }))
            .await
            .unwrap();

        assert!(out.success);
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "hi");
    }

    #[tokio::test]
    async fn balanced_mode_without_manager_rejects_write() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with_write_file(dir.path().to_path_buf());
        let executor = ToolExecutor::new(registry, ApprovalMode::Balanced);

        let out = executor
            .execute("write_file", &serde_json::json!({ "path": "a.txt", "content": "hi" }))
            .await
            .unwrap();

        assert!(!out.success);
        assert!(!dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn balanced_mode_with_manager_approving_writes() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with_write_file(dir.path().to_path_buf());
        let (tx, rx) = approval_channel();
        let executor = ToolExecutor::new(registry, ApprovalMode::Balanced).with_confirmation(tx);
        let manager = Arc::new(ConfirmationManager::new(rx));

        let approver = {
            let manager = manager.clone();
            tokio::spawn(async move {
                let (_request, verdict) = manager.next().await.unwrap();
                verdict.send(ConfirmationDecision::Approve).unwrap();
            })
        };

        let out = executor
            .execute("write_file", &serde_json::json!({ "path": "a.txt", "content": "hi" }))
            .await
            .unwrap();
        approver.await.unwrap();

        assert!(out.success);
    }

    #[tokio::test]
    async fn balanced_mode_with_manager_rejecting_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with_write_file(dir.path().to_path_buf());
        let (tx, rx) = approval_channel();
        let executor = ToolExecutor::new(registry, ApprovalMode::Balanced).with_confirmation(tx);
        let manager = Arc::new(ConfirmationManager::new(rx));

        let rejecter = {
            let manager = manager.clone();
            tokio::spawn(async move {
                let (_request, verdict) = manager.next().await.unwrap();
                verdict.send(ConfirmationDecision::Reject).unwrap();
            })
        };

        let out = executor
            .execute("write_file", &serde_json::json!({ "path": "a.txt", "content": "hi" }))
            .await
            .unwrap();
        rejecter.await.unwrap();

        assert!(!out.success);
        assert!(!dir.path().join("a.txt").exists());
    }

    #[test]
    fn registry_lookup_finds_registered_tool() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with_write_file(dir.path().to_path_buf());
        let executor = ToolExecutor::new(registry, ApprovalMode::Balanced);
        assert!(executor.registry().get("write_file").is_some());
        assert!(executor.registry().get("missing").is_none());
    }
}
