//! Engine - the orchestration services and their wiring.
//!
//! Components:
//! - **Authoring**: process/task definitions and prerequisite edges
//! - **TeamService**: teams, join keys, membership
//! - **TaskExecutionManager**: start/claim/complete of task executions
//! - **ProcessExecutionManager**: run lifecycle and the dependent cascade
//! - **NotificationDispatcher**: team fan-out with claim affordances

pub mod authoring;
pub mod dispatch;
pub mod execution;
pub mod process;
pub mod teams;

pub use self::authoring::Authoring;
pub use self::dispatch::{DeliveryReport, NotificationDispatcher};
pub use self::execution::TaskExecutionManager;
pub use self::process::ProcessExecutionManager;
pub use self::teams::TeamService;

use std::sync::Arc;

use crate::domain::{
    FlowlineError, ProcessExecution, ProcessId, Task, TaskExecution, TaskExecutionId, UserId,
};
use crate::graph::TaskGraph;
use crate::ports::{Clock, IdGenerator, Notifier, ProcessStore, TaskStore, TeamDirectory};

/// Build a `TaskGraph` for one process from the stored edges.
pub(crate) async fn load_graph(
    store: &dyn TaskStore,
    tasks: &[Task],
) -> Result<TaskGraph, FlowlineError> {
    let mut graph = TaskGraph::new();
    for task in tasks {
        graph.add_task(task.id);
    }
    for task in tasks {
        for prerequisite in store.prerequisites_of(task.id).await? {
            graph.add_prerequisite(task.id, prerequisite);
        }
    }
    Ok(graph)
}

/// All services wired over one set of ports. The handler layer talks
/// to this; tests and the CLI construct it with in-memory adapters.
pub struct Engine {
    pub authoring: Authoring,
    pub teams: TeamService,
    pub executions: Arc<TaskExecutionManager>,
    pub runs: ProcessExecutionManager,
}

impl Engine {
    pub fn new(
        processes: Arc<dyn ProcessStore>,
        tasks: Arc<dyn TaskStore>,
        directory: Arc<dyn TeamDirectory>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let dispatcher = Arc::new(NotificationDispatcher::new(notifier));
        let executions = Arc::new(TaskExecutionManager::new(
            Arc::clone(&processes),
            Arc::clone(&tasks),
            Arc::clone(&directory),
            Arc::clone(&dispatcher),
            Arc::clone(&clock),
            Arc::clone(&ids),
        ));
        let runs = ProcessExecutionManager::new(
            Arc::clone(&processes),
            Arc::clone(&tasks),
            Arc::clone(&executions),
            Arc::clone(&dispatcher),
            Arc::clone(&clock),
            Arc::clone(&ids),
        );
        let authoring = Authoring::new(
            Arc::clone(&processes),
            Arc::clone(&tasks),
            Arc::clone(&directory),
            Arc::clone(&clock),
            Arc::clone(&ids),
        );
        let teams = TeamService::new(directory, clock, ids);
        Self {
            authoring,
            teams,
            executions,
            runs,
        }
    }

    /// Start a new run of `process`, seeding its root tasks.
    pub async fn start_process_execution(
        &self,
        process: ProcessId,
    ) -> Result<ProcessExecution, FlowlineError> {
        self.runs.start_process_execution(process).await
    }

    /// Exclusive claim on a pending task execution.
    pub async fn assign_task_execution(
        &self,
        execution: TaskExecutionId,
        user: UserId,
    ) -> Result<TaskExecution, FlowlineError> {
        self.executions.assign(execution, user).await
    }

    /// Complete a claimed task execution and run the dependent
    /// cascade (activation of satisfied dependents, run termination on
    /// a final task).
    pub async fn complete_task_execution(
        &self,
        execution: TaskExecutionId,
        user: UserId,
    ) -> Result<TaskExecution, FlowlineError> {
        let completed = self.executions.complete(execution, user).await?;
        self.runs.on_task_completed(&completed).await?;
        Ok(completed)
    }
}
