//! Teams, users, and the notification delivery record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{TaskExecutionId, TeamId, UserId};

/// Length of a team's self-enrollment key.
pub const JOIN_KEY_LEN: usize = 8;

const JOIN_KEY_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A chat user. Identity comes from the messaging platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    pub fn new(
        id: UserId,
        username: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

/// A named set of users who may claim tasks assigned to it.
///
/// Members enroll themselves with the join key; rotating the key
/// invalidates the old one without touching existing members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub description: String,
    pub owner: UserId,
    pub join_key: String,
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub fn new(
        id: TeamId,
        name: impl Into<String>,
        description: impl Into<String>,
        owner: UserId,
        join_key: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            owner,
            join_key,
            created_at,
        }
    }
}

/// Generate a fresh self-enrollment key.
pub fn generate_join_key() -> String {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    (0..JOIN_KEY_LEN)
        .map(|_| JOIN_KEY_CHARSET[rng.gen_range(0..JOIN_KEY_CHARSET.len())] as char)
        .collect()
}

/// Record of one delivered notice: who was told about which task
/// execution, and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub task_execution_id: Option<TaskExecutionId>,
    pub user_id: UserId,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}
