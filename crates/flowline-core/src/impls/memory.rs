//! In-memory store implementation.
//!
//! One `StoreState` behind a single async mutex backs all three store
//! ports. Holding every table under one lock is what makes the
//! conditional transitions (`try_assign` / `try_complete`) atomic: the
//! status compare, the execution write, and the run's id-set move all
//! happen inside one lock acquisition.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{
    FlowlineError, Process, ProcessExecution, ProcessExecutionId, ProcessId, Task, TaskExecStatus,
    TaskExecution, TaskExecutionId, TaskId, Team, TeamId, User, UserId,
};
use crate::ports::{ProcessStore, TaskStore, TeamDirectory};

/// In-memory state (single source of truth for all records).
#[derive(Default)]
struct StoreState {
    processes: HashMap<ProcessId, Process>,
    tasks: HashMap<TaskId, Task>,

    /// Forward edges: task -> its prerequisites.
    prerequisites: HashMap<TaskId, Vec<TaskId>>,

    /// Reverse edges: task -> its dependents. Kept in sync with
    /// `prerequisites`.
    dependents: HashMap<TaskId, Vec<TaskId>>,

    runs: HashMap<ProcessExecutionId, ProcessExecution>,
    executions: HashMap<TaskExecutionId, TaskExecution>,

    teams: HashMap<TeamId, Team>,
    users: HashMap<UserId, User>,

    /// Membership in enrollment order.
    memberships: HashMap<TeamId, Vec<UserId>>,
}

/// In-memory adapter for `ProcessStore` + `TaskStore` + `TeamDirectory`.
#[derive(Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcessStore for InMemoryStore {
    async fn save_process(&self, process: Process) -> Result<(), FlowlineError> {
        let mut state = self.state.lock().await;
        state.processes.insert(process.id, process);
        Ok(())
    }

    async fn process(&self, id: ProcessId) -> Result<Option<Process>, FlowlineError> {
        let state = self.state.lock().await;
        Ok(state.processes.get(&id).cloned())
    }

    async fn processes_by_owner(&self, owner: UserId) -> Result<Vec<Process>, FlowlineError> {
        let state = self.state.lock().await;
        let mut found: Vec<Process> = state
            .processes
            .values()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect();
        found.sort_by_key(|p| p.id);
        Ok(found)
    }

    async fn save_run(&self, run: ProcessExecution) -> Result<(), FlowlineError> {
        let mut state = self.state.lock().await;
        state.runs.insert(run.id, run);
        Ok(())
    }

    async fn run(&self, id: ProcessExecutionId) -> Result<Option<ProcessExecution>, FlowlineError> {
        let state = self.state.lock().await;
        Ok(state.runs.get(&id).cloned())
    }

    async fn runs_by_process(
        &self,
        process: ProcessId,
    ) -> Result<Vec<ProcessExecution>, FlowlineError> {
        let state = self.state.lock().await;
        let mut found: Vec<ProcessExecution> = state
            .runs
            .values()
            .filter(|r| r.process_id == process)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.id);
        Ok(found)
    }

    async fn open_runs(&self) -> Result<Vec<ProcessExecution>, FlowlineError> {
        let state = self.state.lock().await;
        let mut found: Vec<ProcessExecution> = state
            .runs
            .values()
            .filter(|r| !r.is_terminal())
            .cloned()
            .collect();
        found.sort_by_key(|r| r.id);
        Ok(found)
    }

    async fn update_run(&self, run: ProcessExecution) -> Result<(), FlowlineError> {
        let mut state = self.state.lock().await;
        if !state.runs.contains_key(&run.id) {
            return Err(FlowlineError::RunNotFound(run.id));
        }
        state.runs.insert(run.id, run);
        Ok(())
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn save_task(&self, task: Task) -> Result<(), FlowlineError> {
        let mut state = self.state.lock().await;
        state.tasks.insert(task.id, task);
        Ok(())
    }

    async fn task(&self, id: TaskId) -> Result<Option<Task>, FlowlineError> {
        let state = self.state.lock().await;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn tasks_by_process(&self, process: ProcessId) -> Result<Vec<Task>, FlowlineError> {
        let state = self.state.lock().await;
        let mut found: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| t.process_id == process)
            .cloned()
            .collect();
        // ULIDs sort by creation time, so this is authoring order.
        found.sort_by_key(|t| t.id);
        Ok(found)
    }

    async fn add_prerequisite(
        &self,
        task: TaskId,
        prerequisite: TaskId,
    ) -> Result<(), FlowlineError> {
        let mut state = self.state.lock().await;
        let forward = state.prerequisites.entry(task).or_default();
        if !forward.contains(&prerequisite) {
            forward.push(prerequisite);
        }
        let reverse = state.dependents.entry(prerequisite).or_default();
        if !reverse.contains(&task) {
            reverse.push(task);
        }
        Ok(())
    }

    async fn prerequisites_of(&self, task: TaskId) -> Result<Vec<TaskId>, FlowlineError> {
        let state = self.state.lock().await;
        Ok(state.prerequisites.get(&task).cloned().unwrap_or_default())
    }

    async fn dependents_of(&self, task: TaskId) -> Result<Vec<TaskId>, FlowlineError> {
        let state = self.state.lock().await;
        Ok(state.dependents.get(&task).cloned().unwrap_or_default())
    }

    async fn save_execution(&self, execution: TaskExecution) -> Result<(), FlowlineError> {
        let mut state = self.state.lock().await;
        state.executions.insert(execution.id, execution);
        Ok(())
    }

    async fn execution(
        &self,
        id: TaskExecutionId,
    ) -> Result<Option<TaskExecution>, FlowlineError> {
        let state = self.state.lock().await;
        Ok(state.executions.get(&id).cloned())
    }

    async fn execution_for(
        &self,
        run: ProcessExecutionId,
        task: TaskId,
    ) -> Result<Option<TaskExecution>, FlowlineError> {
        let state = self.state.lock().await;
        Ok(state
            .executions
            .values()
            .find(|e| e.process_execution_id == run && e.task_id == task)
            .cloned())
    }

    async fn executions_by_user(
        &self,
        user: UserId,
    ) -> Result<Vec<TaskExecution>, FlowlineError> {
        let state = self.state.lock().await;
        let mut found: Vec<TaskExecution> = state
            .executions
            .values()
            .filter(|e| e.assignee == Some(user))
            .cloned()
            .collect();
        found.sort_by_key(|e| e.id);
        Ok(found)
    }

    async fn try_assign(
        &self,
        id: TaskExecutionId,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<TaskExecution, FlowlineError> {
        let mut state = self.state.lock().await;

        let execution = state
            .executions
            .get_mut(&id)
            .ok_or(FlowlineError::ExecutionNotFound(id))?;
        if execution.status != TaskExecStatus::Pending {
            return Err(FlowlineError::AlreadyClaimed(id));
        }
        execution.assign(user, now);
        let snapshot = execution.clone();

        let run = state
            .runs
            .get_mut(&snapshot.process_execution_id)
            .ok_or(FlowlineError::RunNotFound(snapshot.process_execution_id))?;
        run.note_assigned(id);

        Ok(snapshot)
    }

    async fn try_complete(
        &self,
        id: TaskExecutionId,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<TaskExecution, FlowlineError> {
        let mut state = self.state.lock().await;

        let execution = state
            .executions
            .get_mut(&id)
            .ok_or(FlowlineError::ExecutionNotFound(id))?;
        if !execution.is_held_by(user) {
            return Err(FlowlineError::NotAssignedToCaller(id));
        }
        execution.complete(now);
        let snapshot = execution.clone();

        let run = state
            .runs
            .get_mut(&snapshot.process_execution_id)
            .ok_or(FlowlineError::RunNotFound(snapshot.process_execution_id))?;
        run.note_completed(id);

        Ok(snapshot)
    }
}

#[async_trait]
impl TeamDirectory for InMemoryStore {
    async fn save_team(&self, team: Team) -> Result<(), FlowlineError> {
        let mut state = self.state.lock().await;
        state.teams.insert(team.id, team);
        Ok(())
    }

    async fn team(&self, id: TeamId) -> Result<Option<Team>, FlowlineError> {
        let state = self.state.lock().await;
        Ok(state.teams.get(&id).cloned())
    }

    async fn team_by_join_key(&self, key: &str) -> Result<Option<Team>, FlowlineError> {
        let state = self.state.lock().await;
        Ok(state.teams.values().find(|t| t.join_key == key).cloned())
    }

    async fn teams(&self) -> Result<Vec<Team>, FlowlineError> {
        let state = self.state.lock().await;
        let mut found: Vec<Team> = state.teams.values().cloned().collect();
        found.sort_by_key(|t| t.id);
        Ok(found)
    }

    async fn save_user(&self, user: User) -> Result<(), FlowlineError> {
        let mut state = self.state.lock().await;
        state.users.insert(user.id, user);
        Ok(())
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, FlowlineError> {
        let state = self.state.lock().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn add_member(&self, team: TeamId, user: UserId) -> Result<(), FlowlineError> {
        let mut state = self.state.lock().await;
        if !state.teams.contains_key(&team) {
            return Err(FlowlineError::TeamNotFound(team));
        }
        let members = state.memberships.entry(team).or_default();
        if !members.contains(&user) {
            members.push(user);
        }
        Ok(())
    }

    async fn remove_member(&self, team: TeamId, user: UserId) -> Result<(), FlowlineError> {
        let mut state = self.state.lock().await;
        if let Some(members) = state.memberships.get_mut(&team) {
            members.retain(|m| *m != user);
        }
        Ok(())
    }

    async fn members(&self, team: TeamId) -> Result<Vec<User>, FlowlineError> {
        let state = self.state.lock().await;
        if !state.teams.contains_key(&team) {
            return Err(FlowlineError::TeamNotFound(team));
        }
        let ids = state.memberships.get(&team).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }

    async fn teams_of(&self, user: UserId) -> Result<Vec<Team>, FlowlineError> {
        let state = self.state.lock().await;
        let mut found: Vec<Team> = state
            .memberships
            .iter()
            .filter(|(_, members)| members.contains(&user))
            .filter_map(|(team, _)| state.teams.get(team).cloned())
            .collect();
        found.sort_by_key(|t| t.id);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generate_join_key;
    use ulid::Ulid;

    fn store() -> InMemoryStore {
        InMemoryStore::new()
    }

    fn sample_run() -> ProcessExecution {
        ProcessExecution::new(
            ProcessExecutionId::from_ulid(Ulid::new()),
            ProcessId::from_ulid(Ulid::new()),
            Utc::now(),
        )
    }

    fn sample_execution(run: &ProcessExecution) -> TaskExecution {
        TaskExecution::new(
            TaskExecutionId::from_ulid(Ulid::new()),
            TaskId::from_ulid(Ulid::new()),
            run.id,
            Utc::now(),
        )
    }

    async fn seed_pending(store: &InMemoryStore) -> (ProcessExecution, TaskExecution) {
        let mut run = sample_run();
        let exec = sample_execution(&run);
        run.add_pending_execution(exec.id);
        store.save_run(run.clone()).await.unwrap();
        store.save_execution(exec.clone()).await.unwrap();
        (run, exec)
    }

    #[tokio::test]
    async fn try_assign_moves_execution_and_run_set_together() {
        let store = store();
        let (run, exec) = seed_pending(&store).await;
        let user = UserId::new(1);

        let claimed = store.try_assign(exec.id, user, Utc::now()).await.unwrap();
        assert_eq!(claimed.status, TaskExecStatus::Assigned);
        assert_eq!(claimed.assignee, Some(user));

        let stored_run = store.run(run.id).await.unwrap().unwrap();
        assert!(stored_run.pending.is_empty());
        assert_eq!(stored_run.in_progress, vec![exec.id]);
    }

    #[tokio::test]
    async fn second_assign_loses_with_already_claimed() {
        let store = store();
        let (_, exec) = seed_pending(&store).await;

        store
            .try_assign(exec.id, UserId::new(1), Utc::now())
            .await
            .unwrap();
        let err = store
            .try_assign(exec.id, UserId::new(2), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, FlowlineError::AlreadyClaimed(_)));

        // The winner still holds it.
        let stored = store.execution(exec.id).await.unwrap().unwrap();
        assert_eq!(stored.assignee, Some(UserId::new(1)));
    }

    #[tokio::test]
    async fn concurrent_assigns_produce_exactly_one_winner() {
        let store = Arc::new(store());
        let (_, exec) = seed_pending(&store).await;

        let (a, b) = tokio::join!(
            store.try_assign(exec.id, UserId::new(1), Utc::now()),
            store.try_assign(exec.id, UserId::new(2), Utc::now()),
        );

        assert!(a.is_ok() != b.is_ok(), "exactly one claim must win");
        let winner = if a.is_ok() { UserId::new(1) } else { UserId::new(2) };
        let stored = store.execution(exec.id).await.unwrap().unwrap();
        assert_eq!(stored.assignee, Some(winner));
    }

    #[tokio::test]
    async fn try_complete_requires_the_claimant() {
        let store = store();
        let (run, exec) = seed_pending(&store).await;
        let claimant = UserId::new(1);

        store.try_assign(exec.id, claimant, Utc::now()).await.unwrap();

        let err = store
            .try_complete(exec.id, UserId::new(2), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowlineError::NotAssignedToCaller(_)));

        // Nothing moved.
        let stored_run = store.run(run.id).await.unwrap().unwrap();
        assert_eq!(stored_run.in_progress, vec![exec.id]);
        assert!(stored_run.completed.is_empty());

        let done = store
            .try_complete(exec.id, claimant, Utc::now())
            .await
            .unwrap();
        assert_eq!(done.status, TaskExecStatus::Completed);

        let stored_run = store.run(run.id).await.unwrap().unwrap();
        assert!(stored_run.in_progress.is_empty());
        assert_eq!(stored_run.completed, vec![exec.id]);
    }

    #[tokio::test]
    async fn completing_twice_is_rejected() {
        let store = store();
        let (_, exec) = seed_pending(&store).await;
        let claimant = UserId::new(1);

        store.try_assign(exec.id, claimant, Utc::now()).await.unwrap();
        store.try_complete(exec.id, claimant, Utc::now()).await.unwrap();

        let err = store
            .try_complete(exec.id, claimant, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowlineError::NotAssignedToCaller(_)));
    }

    #[tokio::test]
    async fn prerequisite_edges_maintain_both_directions() {
        let store = store();
        let a = TaskId::from_ulid(Ulid::new());
        let b = TaskId::from_ulid(Ulid::new());

        store.add_prerequisite(b, a).await.unwrap();
        store.add_prerequisite(b, a).await.unwrap(); // idempotent

        assert_eq!(store.prerequisites_of(b).await.unwrap(), vec![a]);
        assert_eq!(store.dependents_of(a).await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn membership_is_idempotent_and_ordered() {
        let store = store();
        let team = Team::new(
            TeamId::from_ulid(Ulid::new()),
            "ops",
            "",
            UserId::new(1),
            generate_join_key(),
            Utc::now(),
        );
        let team_id = team.id;
        store.save_team(team).await.unwrap();

        for id in [1, 2, 1] {
            let user = UserId::new(id);
            store
                .save_user(User::new(user, format!("u{id}"), "", ""))
                .await
                .unwrap();
            store.add_member(team_id, user).await.unwrap();
        }

        let members = store.members(team_id).await.unwrap();
        let ids: Vec<i64> = members.iter().map(|m| m.id.as_i64()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn execution_for_finds_the_pair() {
        let store = store();
        let (run, exec) = seed_pending(&store).await;

        let found = store
            .execution_for(run.id, exec.task_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, exec.id);

        let other_task = TaskId::from_ulid(Ulid::new());
        assert!(store
            .execution_for(run.id, other_task)
            .await
            .unwrap()
            .is_none());
    }
}
