//! Notifier port - outbound messages to chat users.
//!
//! Fire-and-forget per call: the engine only learns success or failure
//! of each send, never delivery receipts. A message may carry a claim
//! affordance; whoever acts on it resolves to
//! `TaskExecutionManager::assign(execution, acting_user)`.

use async_trait::async_trait;

use crate::domain::{FlowlineError, TaskExecutionId, UserId};

/// The claim button attached to a task-activation notice. Embeds the
/// execution identity so any recipient's tap maps back to an exclusive
/// assign attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimAction {
    pub task_execution_id: TaskExecutionId,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_to_user(
        &self,
        user: UserId,
        text: &str,
        claim: Option<ClaimAction>,
    ) -> Result<(), FlowlineError>;
}
