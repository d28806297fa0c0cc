use thiserror::Error;

use super::ids::{ProcessExecutionId, ProcessId, TaskExecutionId, TaskId, TeamId};

/// Error kinds of the orchestration engine.
///
/// Every failure here is recoverable by retrying the user action; the
/// handler layer turns these into user-facing messages.
#[derive(Debug, Error)]
pub enum FlowlineError {
    #[error("process not found: {0}")]
    ProcessNotFound(ProcessId),

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("process execution not found: {0}")]
    RunNotFound(ProcessExecutionId),

    #[error("task execution not found: {0}")]
    ExecutionNotFound(TaskExecutionId),

    #[error("team not found: {0}")]
    TeamNotFound(TeamId),

    #[error("circular dependency involving task {0}")]
    CircularDependency(TaskId),

    #[error("prerequisite {prerequisite} of task {task} has no completed execution in this run")]
    PrerequisiteNotMet {
        task: TaskId,
        prerequisite: TaskId,
    },

    #[error("task execution {0} was already claimed")]
    AlreadyClaimed(TaskExecutionId),

    #[error("task execution {0} is not assigned to the caller")]
    NotAssignedToCaller(TaskExecutionId),

    #[error("task {0} has no responsible team with members")]
    NoResponsibleParty(TaskId),

    #[error("invalid join key")]
    InvalidJoinKey,

    #[error("{0}")]
    Validation(String),

    #[error("storage: {0}")]
    Storage(String),

    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

impl FlowlineError {
    /// Expected during cascade fan-out: a dependent with several
    /// prerequisites is probed on every prerequisite completion and
    /// only starts on the last one.
    pub fn is_prerequisite_not_met(&self) -> bool {
        matches!(self, FlowlineError::PrerequisiteNotMet { .. })
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        FlowlineError::Validation(msg.into())
    }
}
