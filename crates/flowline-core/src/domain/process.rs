//! Process template and process-execution (run) records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ProcessExecutionId, ProcessId, TaskExecutionId, UserId};

/// A reusable template: a named set of tasks plus the prerequisite
/// edges among them. Created once by its owner; read-only during
/// execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,
    pub name: String,
    pub description: String,
    pub owner: UserId,
    pub created_at: DateTime<Utc>,
}

impl Process {
    pub fn new(
        id: ProcessId,
        name: impl Into<String>,
        description: impl Into<String>,
        owner: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            owner,
            created_at,
        }
    }
}

/// Status of one run. Pending until the first task execution is
/// registered, Running after, Completed when a final task finishes.
/// Failed is reserved for the handler layer; nothing in the engine
/// sets it on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One run of a Process.
///
/// Design:
/// - The three id-sets (pending / in-progress / completed) are
///   disjoint; an execution id lives in exactly one of them at a time.
/// - Membership moves and the status write must be persisted together;
///   the store's `update_run` takes the whole record for that reason.
/// - `completed_at` is written exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessExecution {
    pub id: ProcessExecutionId,
    pub process_id: ProcessId,
    pub status: RunStatus,
    pub pending: Vec<TaskExecutionId>,
    pub in_progress: Vec<TaskExecutionId>,
    pub completed: Vec<TaskExecutionId>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProcessExecution {
    pub fn new(id: ProcessExecutionId, process_id: ProcessId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            process_id,
            status: RunStatus::Pending,
            pending: Vec::new(),
            in_progress: Vec::new(),
            completed: Vec::new(),
            started_at,
            completed_at: None,
        }
    }

    /// Register a freshly created task execution. Idempotent: adding an
    /// id already present anywhere in the run is a no-op. The first
    /// registration moves the run from Pending to Running.
    pub fn add_pending_execution(&mut self, exec: TaskExecutionId) {
        if self.contains(exec) {
            return;
        }
        self.pending.push(exec);
        if self.status == RunStatus::Pending {
            self.status = RunStatus::Running;
        }
    }

    /// Drop an id from the pending set. Idempotent.
    pub fn remove_pending_execution(&mut self, exec: TaskExecutionId) {
        self.pending.retain(|id| *id != exec);
    }

    /// Move an id from pending to in-progress (claim recorded).
    pub fn note_assigned(&mut self, exec: TaskExecutionId) {
        self.pending.retain(|id| *id != exec);
        if !self.in_progress.contains(&exec) {
            self.in_progress.push(exec);
        }
    }

    /// Move an id from in-progress to completed.
    pub fn note_completed(&mut self, exec: TaskExecutionId) {
        self.in_progress.retain(|id| *id != exec);
        if !self.completed.contains(&exec) {
            self.completed.push(exec);
        }
    }

    /// Terminate the run. Returns true on the transition that actually
    /// completed it; later calls leave status and timestamp untouched.
    pub fn mark_completed(&mut self, now: DateTime<Utc>) -> bool {
        if self.completed_at.is_some() {
            return false;
        }
        self.status = RunStatus::Completed;
        self.completed_at = Some(now);
        true
    }

    /// Handler-layer escape hatch for a run that cannot make progress.
    pub fn mark_failed(&mut self, now: DateTime<Utc>) -> bool {
        if self.completed_at.is_some() {
            return false;
        }
        self.status = RunStatus::Failed;
        self.completed_at = Some(now);
        true
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, RunStatus::Completed | RunStatus::Failed)
    }

    pub fn contains(&self, exec: TaskExecutionId) -> bool {
        self.pending.contains(&exec)
            || self.in_progress.contains(&exec)
            || self.completed.contains(&exec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn run() -> ProcessExecution {
        ProcessExecution::new(
            ProcessExecutionId::from_ulid(Ulid::new()),
            ProcessId::from_ulid(Ulid::new()),
            Utc::now(),
        )
    }

    fn exec_id() -> TaskExecutionId {
        TaskExecutionId::from_ulid(Ulid::new())
    }

    #[test]
    fn new_run_is_pending_with_empty_sets() {
        let r = run();
        assert_eq!(r.status, RunStatus::Pending);
        assert!(r.pending.is_empty());
        assert!(r.in_progress.is_empty());
        assert!(r.completed.is_empty());
        assert!(r.completed_at.is_none());
    }

    #[test]
    fn first_registration_moves_run_to_running() {
        let mut r = run();
        r.add_pending_execution(exec_id());
        assert_eq!(r.status, RunStatus::Running);
    }

    #[test]
    fn add_pending_is_idempotent() {
        let mut r = run();
        let e = exec_id();

        r.add_pending_execution(e);
        r.add_pending_execution(e);

        assert_eq!(r.pending.len(), 1);
    }

    #[test]
    fn an_id_lives_in_exactly_one_set() {
        let mut r = run();
        let e = exec_id();

        r.add_pending_execution(e);
        assert_eq!((r.pending.len(), r.in_progress.len(), r.completed.len()), (1, 0, 0));

        r.note_assigned(e);
        assert_eq!((r.pending.len(), r.in_progress.len(), r.completed.len()), (0, 1, 0));

        r.note_completed(e);
        assert_eq!((r.pending.len(), r.in_progress.len(), r.completed.len()), (0, 0, 1));

        // Re-adding a completed id must not resurrect it in pending.
        r.add_pending_execution(e);
        assert!(r.pending.is_empty());
    }

    #[test]
    fn mark_completed_fires_exactly_once() {
        let mut r = run();
        let first = Utc::now();

        assert!(r.mark_completed(first));
        assert!(!r.mark_completed(Utc::now()));

        assert_eq!(r.status, RunStatus::Completed);
        assert_eq!(r.completed_at, Some(first));
        assert!(r.is_terminal());
    }

    #[test]
    fn mark_failed_is_terminal_too() {
        let mut r = run();
        assert!(r.mark_failed(Utc::now()));
        assert!(r.is_terminal());
        assert!(!r.mark_completed(Utc::now()));
    }
}
