//! Task-execution state machine, scoped to one process run.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{
    FlowlineError, ProcessExecutionId, Task, TaskExecution, TaskExecutionId, TaskId, UserId,
};
use crate::engine::dispatch::{DeliveryReport, NotificationDispatcher};
use crate::ports::{Clock, IdGenerator, ProcessStore, TaskStore, TeamDirectory};

/// Owns creation, claim, and completion of task executions.
///
/// Exclusivity lives in the store's conditional transitions; this
/// manager adds the prerequisite gate, run-set registration, and the
/// team fan-out.
pub struct TaskExecutionManager {
    processes: Arc<dyn ProcessStore>,
    tasks: Arc<dyn TaskStore>,
    directory: Arc<dyn TeamDirectory>,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl TaskExecutionManager {
    pub fn new(
        processes: Arc<dyn ProcessStore>,
        tasks: Arc<dyn TaskStore>,
        directory: Arc<dyn TeamDirectory>,
        dispatcher: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            processes,
            tasks,
            directory,
            dispatcher,
            clock,
            ids,
        }
    }

    /// Start (or re-trigger) the execution of `task` within `run`.
    ///
    /// Preconditions: every prerequisite of the task has a Completed
    /// execution in the same run; trivially true for roots.
    ///
    /// Idempotent per (run, task): if an execution already exists it is
    /// returned unchanged - except that a still-pending one is
    /// re-dispatched, which is how a task stuck on `NoResponsibleParty`
    /// recovers once a human fixes the team.
    ///
    /// `NoResponsibleParty` is returned *after* the execution has been
    /// created and registered: the pending record survives and the
    /// failure is recoverable, not a rollback trigger.
    pub async fn start(
        &self,
        run: ProcessExecutionId,
        task: TaskId,
    ) -> Result<TaskExecution, FlowlineError> {
        let mut run_record = self
            .processes
            .run(run)
            .await?
            .ok_or(FlowlineError::RunNotFound(run))?;
        if run_record.is_terminal() {
            return Err(FlowlineError::validation(
                "process execution already finished",
            ));
        }
        let task_record = self
            .tasks
            .task(task)
            .await?
            .ok_or(FlowlineError::TaskNotFound(task))?;

        if let Some(existing) = self.tasks.execution_for(run, task).await? {
            debug!(execution = %existing.id, %task, "execution already exists, not duplicating");
            if existing.is_pending() {
                self.dispatch(&task_record, &existing).await?;
            }
            return Ok(existing);
        }

        for prerequisite in self.tasks.prerequisites_of(task).await? {
            let satisfied = self
                .tasks
                .execution_for(run, prerequisite)
                .await?
                .map(|e| e.is_completed())
                .unwrap_or(false);
            if !satisfied {
                return Err(FlowlineError::PrerequisiteNotMet { task, prerequisite });
            }
        }

        let execution = TaskExecution::new(
            self.ids.next_execution_id(),
            task,
            run,
            self.clock.now(),
        );
        self.tasks.save_execution(execution.clone()).await?;
        run_record.add_pending_execution(execution.id);
        self.processes.update_run(run_record).await?;
        info!(execution = %execution.id, %task, %run, "task execution started");

        self.dispatch(&task_record, &execution).await?;
        Ok(execution)
    }

    /// Resolve the responsible team and fan the activation out.
    async fn dispatch(
        &self,
        task: &Task,
        execution: &TaskExecution,
    ) -> Result<DeliveryReport, FlowlineError> {
        let team = task
            .team
            .ok_or(FlowlineError::NoResponsibleParty(task.id))?;
        self.directory
            .team(team)
            .await?
            .ok_or(FlowlineError::TeamNotFound(team))?;
        let members = self.directory.members(team).await?;
        if members.is_empty() {
            return Err(FlowlineError::NoResponsibleParty(task.id));
        }
        Ok(self
            .dispatcher
            .notify_team(task, execution, &members)
            .await)
    }

    /// Exclusive first-come-first-served claim. Exactly one of any
    /// number of racing callers wins; the rest get `AlreadyClaimed`.
    pub async fn assign(
        &self,
        execution: TaskExecutionId,
        user: UserId,
    ) -> Result<TaskExecution, FlowlineError> {
        let claimed = self
            .tasks
            .try_assign(execution, user, self.clock.now())
            .await?;
        info!(%execution, %user, "task execution claimed");
        Ok(claimed)
    }

    /// Completion by the current claimant only. The caller (engine
    /// facade) runs the dependent cascade with the returned record.
    pub async fn complete(
        &self,
        execution: TaskExecutionId,
        user: UserId,
    ) -> Result<TaskExecution, FlowlineError> {
        let completed = self
            .tasks
            .try_complete(execution, user, self.clock.now())
            .await?;
        info!(%execution, %user, "task execution completed");
        Ok(completed)
    }

    pub async fn execution(
        &self,
        id: TaskExecutionId,
    ) -> Result<TaskExecution, FlowlineError> {
        self.tasks
            .execution(id)
            .await?
            .ok_or(FlowlineError::ExecutionNotFound(id))
    }

    /// Everything a user holds or has held ("my tasks").
    pub async fn executions_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<TaskExecution>, FlowlineError> {
        self.tasks.executions_by_user(user).await
    }
}
