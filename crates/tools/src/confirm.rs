use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::Tool;

/// The proposed effect of a write, surfaced to the UI before anything
/// touches disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub tool_name: String,
    pub target_path: String,
    pub original_content: Option<String>,
    pub new_content: String,
    pub diff: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationDecision {
    Approve,
    Reject,
}

pub type ConfirmationVerdict = oneshot::Sender<ConfirmationDecision>;
pub type ConfirmationSender = mpsc::Sender<(ConfirmationRequest, ConfirmationVerdict)>;

/// A `Tool` whose side effect requires a user-approved verdict before it
/// takes hold. The sender is injected by the registry/executor, not by
/// the tool's own constructor, so the same tool works identically in a
/// test harness with no confirmation channel attached (it degrades to
/// "always rejected").
#[async_trait]
pub trait ConfirmableTool: Tool {
    fn set_confirmation_sender(&self, tx: ConfirmationSender);
}
