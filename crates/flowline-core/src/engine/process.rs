//! Process-run lifecycle: starting runs, the completion cascade,
//! terminal handling.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{
    FlowlineError, ProcessExecution, ProcessExecutionId, ProcessId, TaskExecution,
    TaskExecutionId, TaskId,
};
use crate::engine::dispatch::NotificationDispatcher;
use crate::engine::execution::TaskExecutionManager;
use crate::engine::load_graph;
use crate::observability::RunCounts;
use crate::ports::{Clock, IdGenerator, ProcessStore, TaskStore};

/// Owns ProcessExecution lifecycle and the dependent fan-out.
pub struct ProcessExecutionManager {
    processes: Arc<dyn ProcessStore>,
    tasks: Arc<dyn TaskStore>,
    executions: Arc<TaskExecutionManager>,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl ProcessExecutionManager {
    pub fn new(
        processes: Arc<dyn ProcessStore>,
        tasks: Arc<dyn TaskStore>,
        executions: Arc<TaskExecutionManager>,
        dispatcher: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            processes,
            tasks,
            executions,
            dispatcher,
            clock,
            ids,
        }
    }

    /// Start a new run: validate the definition, create the run
    /// record, seed every root task.
    ///
    /// A root whose team is missing or empty is warn-logged and
    /// skipped, not fatal: its pending execution exists and can be
    /// re-triggered once the team is fixed. Any other failure aborts.
    pub async fn start_process_execution(
        &self,
        process: ProcessId,
    ) -> Result<ProcessExecution, FlowlineError> {
        self.processes
            .process(process)
            .await?
            .ok_or(FlowlineError::ProcessNotFound(process))?;
        let tasks = self.tasks.tasks_by_process(process).await?;
        if tasks.is_empty() {
            return Err(FlowlineError::validation("process has no tasks"));
        }

        let graph = load_graph(self.tasks.as_ref(), &tasks).await?;
        // Ordering doubles as the acyclicity gate.
        graph.order()?;

        let run = ProcessExecution::new(self.ids.next_run_id(), process, self.clock.now());
        let run_id = run.id;
        self.processes.save_run(run).await?;
        info!(run = %run_id, %process, "process execution started");

        for root in graph.roots() {
            match self.executions.start(run_id, root).await {
                Ok(_) => {}
                Err(FlowlineError::NoResponsibleParty(task)) => {
                    warn!(%task, run = %run_id, "root task has no responsible party; left pending");
                }
                Err(err) => return Err(err),
            }
        }

        self.run(run_id).await
    }

    /// Cascade after a completion, processed as an explicit worklist
    /// rather than recursion.
    ///
    /// Final task: terminate the run (once) and tell the owner. In-
    /// flight sibling executions are not cancelled, but no new
    /// dependents are activated on a terminal run.
    ///
    /// Non-final: probe every dependent. `PrerequisiteNotMet` is the
    /// expected outcome for dependents still waiting on other
    /// prerequisites and stays internal; `NoResponsibleParty` is
    /// reported and skipped; anything else aborts.
    pub async fn on_task_completed(
        &self,
        completed: &TaskExecution,
    ) -> Result<(), FlowlineError> {
        let run_id = completed.process_execution_id;
        let mut run = self
            .processes
            .run(run_id)
            .await?
            .ok_or(FlowlineError::RunNotFound(run_id))?;
        let task = self
            .tasks
            .task(completed.task_id)
            .await?
            .ok_or(FlowlineError::TaskNotFound(completed.task_id))?;

        let owner = self
            .processes
            .process(run.process_id)
            .await?
            .ok_or(FlowlineError::ProcessNotFound(run.process_id))?
            .owner;
        self.dispatcher
            .notify_user(owner, &format!("Task completed: {}", task.title))
            .await;

        if task.is_final {
            if run.mark_completed(self.clock.now()) {
                self.processes.update_run(run).await?;
                info!(run = %run_id, task = %task.id, "final task completed, run terminated");
                self.dispatcher
                    .notify_user(owner, "Process execution completed.")
                    .await;
            }
            return Ok(());
        }

        if run.is_terminal() {
            debug!(run = %run_id, task = %task.id, "run already terminal, dependents not activated");
            return Ok(());
        }

        let mut worklist: VecDeque<TaskId> =
            self.tasks.dependents_of(task.id).await?.into();
        while let Some(dependent) = worklist.pop_front() {
            match self.executions.start(run_id, dependent).await {
                Ok(execution) => {
                    debug!(%dependent, execution = %execution.id, "dependent task activated");
                }
                Err(err) if err.is_prerequisite_not_met() => {
                    // Expected: this dependent still waits on another
                    // prerequisite and will be probed again when that
                    // one completes.
                    debug!(%dependent, "dependent not ready yet");
                }
                Err(FlowlineError::NoResponsibleParty(task)) => {
                    warn!(%task, run = %run_id, "dependent has no responsible party; left pending");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Idempotent set maintenance for externally persisted state.
    pub async fn add_pending(
        &self,
        run: ProcessExecutionId,
        execution: TaskExecutionId,
    ) -> Result<(), FlowlineError> {
        let mut record = self
            .processes
            .run(run)
            .await?
            .ok_or(FlowlineError::RunNotFound(run))?;
        record.add_pending_execution(execution);
        self.processes.update_run(record).await
    }

    pub async fn remove_pending(
        &self,
        run: ProcessExecutionId,
        execution: TaskExecutionId,
    ) -> Result<(), FlowlineError> {
        let mut record = self
            .processes
            .run(run)
            .await?
            .ok_or(FlowlineError::RunNotFound(run))?;
        record.remove_pending_execution(execution);
        self.processes.update_run(record).await
    }

    pub async fn run(&self, id: ProcessExecutionId) -> Result<ProcessExecution, FlowlineError> {
        self.processes
            .run(id)
            .await?
            .ok_or(FlowlineError::RunNotFound(id))
    }

    pub async fn runs_by_process(
        &self,
        process: ProcessId,
    ) -> Result<Vec<ProcessExecution>, FlowlineError> {
        self.processes.runs_by_process(process).await
    }

    pub async fn open_runs(&self) -> Result<Vec<ProcessExecution>, FlowlineError> {
        self.processes.open_runs().await
    }

    /// The at-most-one execution of `task` within `run`.
    pub async fn execution_for(
        &self,
        run: ProcessExecutionId,
        task: TaskId,
    ) -> Result<Option<TaskExecution>, FlowlineError> {
        self.tasks.execution_for(run, task).await
    }

    pub async fn counts(&self, run: ProcessExecutionId) -> Result<RunCounts, FlowlineError> {
        Ok(RunCounts::of(&self.run(run).await?))
    }
}
