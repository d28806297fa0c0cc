//! Store ports - persistence seams for definitions, runs, and teams.
//!
//! Design intent:
//! - The engine decides *what* must be persisted; implementations
//!   decide how. Reads return owned clones.
//! - `try_assign` / `try_complete` are conditional updates: the status
//!   compare, the record write, and the id-set move in the owning run
//!   commit as one unit. Two racing claims on the same execution must
//!   resolve to one winner and one `AlreadyClaimed`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    FlowlineError, Process, ProcessExecution, ProcessExecutionId, ProcessId, Task, TaskExecution,
    TaskExecutionId, TaskId, Team, TeamId, User, UserId,
};

/// Process templates and their runs.
#[async_trait]
pub trait ProcessStore: Send + Sync {
    async fn save_process(&self, process: Process) -> Result<(), FlowlineError>;
    async fn process(&self, id: ProcessId) -> Result<Option<Process>, FlowlineError>;
    async fn processes_by_owner(&self, owner: UserId) -> Result<Vec<Process>, FlowlineError>;

    async fn save_run(&self, run: ProcessExecution) -> Result<(), FlowlineError>;
    async fn run(&self, id: ProcessExecutionId) -> Result<Option<ProcessExecution>, FlowlineError>;
    async fn runs_by_process(
        &self,
        process: ProcessId,
    ) -> Result<Vec<ProcessExecution>, FlowlineError>;

    /// Runs not yet terminal (still pending or running).
    async fn open_runs(&self) -> Result<Vec<ProcessExecution>, FlowlineError>;

    /// Replace the stored run with this record. Status and the three
    /// id-sets land together or not at all.
    async fn update_run(&self, run: ProcessExecution) -> Result<(), FlowlineError>;
}

/// Task definitions, prerequisite edges, and task executions.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn save_task(&self, task: Task) -> Result<(), FlowlineError>;
    async fn task(&self, id: TaskId) -> Result<Option<Task>, FlowlineError>;
    async fn tasks_by_process(&self, process: ProcessId) -> Result<Vec<Task>, FlowlineError>;

    /// Persist an edge: `task` requires `prerequisite`. The caller has
    /// already validated it (self-edge, cycle).
    async fn add_prerequisite(
        &self,
        task: TaskId,
        prerequisite: TaskId,
    ) -> Result<(), FlowlineError>;
    async fn prerequisites_of(&self, task: TaskId) -> Result<Vec<TaskId>, FlowlineError>;
    async fn dependents_of(&self, task: TaskId) -> Result<Vec<TaskId>, FlowlineError>;

    async fn save_execution(&self, execution: TaskExecution) -> Result<(), FlowlineError>;
    async fn execution(
        &self,
        id: TaskExecutionId,
    ) -> Result<Option<TaskExecution>, FlowlineError>;

    /// The at-most-one execution of `task` within `run`.
    async fn execution_for(
        &self,
        run: ProcessExecutionId,
        task: TaskId,
    ) -> Result<Option<TaskExecution>, FlowlineError>;

    /// Everything a user currently or previously held ("my tasks").
    async fn executions_by_user(
        &self,
        user: UserId,
    ) -> Result<Vec<TaskExecution>, FlowlineError>;

    /// Conditional claim. Compare key: status == Pending. On success
    /// the execution becomes Assigned to `user` at `now` and its id
    /// moves pending -> in-progress in the owning run, atomically.
    /// Losers get `AlreadyClaimed`.
    async fn try_assign(
        &self,
        id: TaskExecutionId,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<TaskExecution, FlowlineError>;

    /// Conditional completion. Compare key: status == Assigned and
    /// assignee == `user`. On success the execution becomes Completed
    /// at `now` and its id moves in-progress -> completed in the
    /// owning run, atomically. Otherwise `NotAssignedToCaller`.
    async fn try_complete(
        &self,
        id: TaskExecutionId,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<TaskExecution, FlowlineError>;
}

/// Teams, users, and membership. Consumed read-mostly by dispatch.
#[async_trait]
pub trait TeamDirectory: Send + Sync {
    async fn save_team(&self, team: Team) -> Result<(), FlowlineError>;
    async fn team(&self, id: TeamId) -> Result<Option<Team>, FlowlineError>;
    async fn team_by_join_key(&self, key: &str) -> Result<Option<Team>, FlowlineError>;
    async fn teams(&self) -> Result<Vec<Team>, FlowlineError>;

    async fn save_user(&self, user: User) -> Result<(), FlowlineError>;
    async fn user(&self, id: UserId) -> Result<Option<User>, FlowlineError>;

    /// Idempotent: adding an existing member is a no-op.
    async fn add_member(&self, team: TeamId, user: UserId) -> Result<(), FlowlineError>;
    async fn remove_member(&self, team: TeamId, user: UserId) -> Result<(), FlowlineError>;
    async fn members(&self, team: TeamId) -> Result<Vec<User>, FlowlineError>;
    async fn teams_of(&self, user: UserId) -> Result<Vec<Team>, FlowlineError>;
}
