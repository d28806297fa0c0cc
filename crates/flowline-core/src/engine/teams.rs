//! Team directory operations: creation, enrollment, membership.

use std::sync::Arc;

use tracing::info;

use crate::domain::{generate_join_key, FlowlineError, Team, TeamId, User, UserId};
use crate::ports::{Clock, IdGenerator, TeamDirectory};

pub struct TeamService {
    directory: Arc<dyn TeamDirectory>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl TeamService {
    pub fn new(
        directory: Arc<dyn TeamDirectory>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            directory,
            clock,
            ids,
        }
    }

    /// Create a team with a fresh join key. The owner is saved and
    /// enrolled as the first member.
    pub async fn create_team(
        &self,
        owner: &User,
        name: &str,
        description: &str,
    ) -> Result<Team, FlowlineError> {
        if name.trim().is_empty() {
            return Err(FlowlineError::validation("team name is required"));
        }
        let team = Team::new(
            self.ids.next_team_id(),
            name,
            description,
            owner.id,
            generate_join_key(),
            self.clock.now(),
        );
        self.directory.save_user(owner.clone()).await?;
        self.directory.save_team(team.clone()).await?;
        self.directory.add_member(team.id, owner.id).await?;
        info!(team = %team.id, owner = %owner.id, "team created");
        Ok(team)
    }

    /// Replace the join key; anyone holding the old key can no longer
    /// enroll. Existing members are untouched.
    pub async fn rotate_join_key(&self, team: TeamId) -> Result<Team, FlowlineError> {
        let mut record = self
            .directory
            .team(team)
            .await?
            .ok_or(FlowlineError::TeamNotFound(team))?;
        record.join_key = generate_join_key();
        self.directory.save_team(record.clone()).await?;
        Ok(record)
    }

    /// Self-enrollment by join key.
    pub async fn join(&self, user: &User, join_key: &str) -> Result<Team, FlowlineError> {
        let team = self
            .directory
            .team_by_join_key(join_key)
            .await?
            .ok_or(FlowlineError::InvalidJoinKey)?;
        self.directory.save_user(user.clone()).await?;
        self.directory.add_member(team.id, user.id).await?;
        info!(team = %team.id, user = %user.id, "user joined team");
        Ok(team)
    }

    pub async fn team(&self, id: TeamId) -> Result<Team, FlowlineError> {
        self.directory
            .team(id)
            .await?
            .ok_or(FlowlineError::TeamNotFound(id))
    }

    pub async fn teams(&self) -> Result<Vec<Team>, FlowlineError> {
        self.directory.teams().await
    }

    pub async fn members(&self, team: TeamId) -> Result<Vec<User>, FlowlineError> {
        self.directory.members(team).await
    }

    pub async fn remove_member(&self, team: TeamId, user: UserId) -> Result<(), FlowlineError> {
        self.directory.remove_member(team, user).await
    }

    pub async fn teams_of(&self, user: UserId) -> Result<Vec<Team>, FlowlineError> {
        self.directory.teams_of(user).await
    }
}
