//! RecordingNotifier - development/test notifier.
//!
//! Appends every send as a `Notification` record instead of talking to
//! a chat platform. Tests inspect the records; failure injection per
//! user exercises the best-effort delivery contract.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::{FlowlineError, Notification, UserId};
use crate::ports::{ClaimAction, Notifier};

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    failing: Arc<Mutex<HashSet<UserId>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `user` fail until cleared.
    pub async fn fail_sends_to(&self, user: UserId) {
        self.failing.lock().await.insert(user);
    }

    pub async fn clear_failures(&self) {
        self.failing.lock().await.clear();
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, user: UserId) -> Vec<Notification> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|n| n.user_id == user)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_to_user(
        &self,
        user: UserId,
        text: &str,
        claim: Option<ClaimAction>,
    ) -> Result<(), FlowlineError> {
        if self.failing.lock().await.contains(&user) {
            return Err(FlowlineError::Delivery(format!(
                "user {user} unreachable"
            )));
        }
        self.sent.lock().await.push(Notification {
            task_execution_id: claim.map(|c| c.task_execution_id),
            user_id: user,
            message: text.to_string(),
            sent_at: Utc::now(),
        });
        Ok(())
    }
}
