//! Definition-time operations: processes, tasks, prerequisite edges.
//!
//! Everything here happens before a run starts; the records written
//! are read-only during execution.

use std::sync::Arc;

use tracing::info;

use crate::domain::{FlowlineError, Process, ProcessId, Task, TaskId, TeamId, User, UserId};
use crate::engine::load_graph;
use crate::ports::{Clock, IdGenerator, ProcessStore, TaskStore, TeamDirectory};

pub struct Authoring {
    processes: Arc<dyn ProcessStore>,
    tasks: Arc<dyn TaskStore>,
    directory: Arc<dyn TeamDirectory>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl Authoring {
    pub fn new(
        processes: Arc<dyn ProcessStore>,
        tasks: Arc<dyn TaskStore>,
        directory: Arc<dyn TeamDirectory>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            processes,
            tasks,
            directory,
            clock,
            ids,
        }
    }

    pub async fn create_process(
        &self,
        owner: &User,
        name: &str,
        description: &str,
    ) -> Result<Process, FlowlineError> {
        if name.trim().is_empty() {
            return Err(FlowlineError::validation("process name is required"));
        }
        if description.trim().is_empty() {
            return Err(FlowlineError::validation("process description is required"));
        }
        let process = Process::new(
            self.ids.next_process_id(),
            name,
            description,
            owner.id,
            self.clock.now(),
        );
        self.directory.save_user(owner.clone()).await?;
        self.processes.save_process(process.clone()).await?;
        info!(process = %process.id, owner = %owner.id, "process created");
        Ok(process)
    }

    pub async fn create_task(
        &self,
        process: ProcessId,
        title: &str,
        description: &str,
        team: Option<TeamId>,
        is_final: bool,
    ) -> Result<Task, FlowlineError> {
        if title.trim().is_empty() {
            return Err(FlowlineError::validation("task title is required"));
        }
        self.processes
            .process(process)
            .await?
            .ok_or(FlowlineError::ProcessNotFound(process))?;
        if let Some(team_id) = team {
            self.directory
                .team(team_id)
                .await?
                .ok_or(FlowlineError::TeamNotFound(team_id))?;
        }

        let mut task = Task::new(
            self.ids.next_task_id(),
            process,
            title,
            description,
            self.clock.now(),
        );
        task.team = team;
        task.is_final = is_final;
        self.tasks.save_task(task.clone()).await?;
        info!(task = %task.id, %process, "task created");
        Ok(task)
    }

    /// Declare that `task` requires `prerequisite`. Rejects self-edges
    /// and edges that would make the process graph cyclic; the bad
    /// edge is never persisted.
    pub async fn add_prerequisite(
        &self,
        task: TaskId,
        prerequisite: TaskId,
    ) -> Result<(), FlowlineError> {
        let task_record = self
            .tasks
            .task(task)
            .await?
            .ok_or(FlowlineError::TaskNotFound(task))?;
        let prerequisite_record = self
            .tasks
            .task(prerequisite)
            .await?
            .ok_or(FlowlineError::TaskNotFound(prerequisite))?;
        if task_record.process_id != prerequisite_record.process_id {
            return Err(FlowlineError::validation(
                "prerequisite must belong to the same process",
            ));
        }

        let siblings = self
            .tasks
            .tasks_by_process(task_record.process_id)
            .await?;
        let graph = load_graph(self.tasks.as_ref(), &siblings).await?;
        graph.validate_edge(task, prerequisite)?;

        self.tasks.add_prerequisite(task, prerequisite).await
    }

    pub async fn processes_by_owner(&self, owner: UserId) -> Result<Vec<Process>, FlowlineError> {
        self.processes.processes_by_owner(owner).await
    }

    pub async fn tasks_by_process(
        &self,
        process: ProcessId,
    ) -> Result<Vec<Task>, FlowlineError> {
        self.processes
            .process(process)
            .await?
            .ok_or(FlowlineError::ProcessNotFound(process))?;
        self.tasks.tasks_by_process(process).await
    }

    pub async fn prerequisites_of(&self, task: TaskId) -> Result<Vec<TaskId>, FlowlineError> {
        self.tasks.prerequisites_of(task).await
    }

    /// Dependents of a task, resolved to full records.
    pub async fn dependents_of(&self, task: TaskId) -> Result<Vec<Task>, FlowlineError> {
        let mut dependents = Vec::new();
        for id in self.tasks.dependents_of(task).await? {
            let record = self
                .tasks
                .task(id)
                .await?
                .ok_or(FlowlineError::TaskNotFound(id))?;
            dependents.push(record);
        }
        Ok(dependents)
    }
}
