//! Task definition and task-execution records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ProcessExecutionId, ProcessId, TaskExecutionId, TaskId, TeamId, UserId};

/// One node of a process's dependency graph.
///
/// Definition-time entity: identity and fields are immutable once the
/// task is part of a started run. The responsible team may be absent
/// while the process is still being authored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub process_id: ProcessId,
    pub title: String,
    pub description: String,
    pub team: Option<TeamId>,
    pub is_final: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        id: TaskId,
        process_id: ProcessId,
        title: impl Into<String>,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            process_id,
            title: title.into(),
            description: description.into(),
            team: None,
            is_final: false,
            created_at,
        }
    }

    pub fn with_team(mut self, team: TeamId) -> Self {
        self.team = Some(team);
        self
    }

    pub fn final_task(mut self) -> Self {
        self.is_final = true;
        self
    }
}

/// Status of a task execution. Transitions only move forward:
/// Pending -> Assigned -> Completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskExecStatus {
    Pending,
    Assigned,
    Completed,
}

/// One instantiation of a Task within one ProcessExecution.
///
/// Design:
/// - This record is the single source of truth for the execution's
///   state; the owning run's id-sets only hold TaskExecutionIds.
/// - State transitions happen through methods, never by writing the
///   fields directly. The check that guards a transition (status
///   compare, claimant compare) lives in the store so check and set
///   commit under one lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskExecution {
    pub id: TaskExecutionId,
    pub task_id: TaskId,
    pub process_execution_id: ProcessExecutionId,
    pub status: TaskExecStatus,
    pub assignee: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskExecution {
    pub fn new(
        id: TaskExecutionId,
        task_id: TaskId,
        process_execution_id: ProcessExecutionId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            task_id,
            process_execution_id,
            status: TaskExecStatus::Pending,
            assignee: None,
            created_at,
            assigned_at: None,
            completed_at: None,
        }
    }

    /// Record a successful claim. Caller must have verified the
    /// execution is still Pending.
    pub fn assign(&mut self, user: UserId, now: DateTime<Utc>) {
        self.status = TaskExecStatus::Assigned;
        self.assignee = Some(user);
        self.assigned_at = Some(now);
    }

    /// Record completion. Caller must have verified the execution is
    /// Assigned to the completing user.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = TaskExecStatus::Completed;
        self.completed_at = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskExecStatus::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskExecStatus::Completed
    }

    pub fn is_held_by(&self, user: UserId) -> bool {
        self.status == TaskExecStatus::Assigned && self.assignee == Some(user)
    }
}
