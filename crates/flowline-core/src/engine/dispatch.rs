//! Notification fan-out to responsible teams.

use std::sync::Arc;

use tracing::warn;

use crate::domain::{Task, TaskExecution, User, UserId};
use crate::ports::{ClaimAction, Notifier};

/// Outcome of one team fan-out. Failures are per-recipient and never
/// roll back the state transition that triggered the dispatch: a
/// partially-notified team beats a lost task.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub delivered: Vec<UserId>,
    pub failed: Vec<UserId>,
}

impl DeliveryReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fans a task activation out to every member of the responsible team,
/// each message carrying the exclusive claim affordance.
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// One message per member, deliveries running concurrently. Each
    /// send is independent; a failure is warn-logged and recorded in
    /// the report, and the remaining members are still notified.
    pub async fn notify_team(
        &self,
        task: &Task,
        execution: &TaskExecution,
        members: &[User],
    ) -> DeliveryReport {
        let text = format!(
            "Task activated: {}\n{}\nClaim it if you want to take it on.",
            task.title, task.description
        );
        let claim = ClaimAction {
            task_execution_id: execution.id,
        };

        let mut handles = Vec::with_capacity(members.len());
        for member in members {
            let notifier = Arc::clone(&self.notifier);
            let text = text.clone();
            let user = member.id;
            handles.push(tokio::spawn(async move {
                (user, notifier.send_to_user(user, &text, Some(claim)).await)
            }));
        }

        let mut report = DeliveryReport::default();
        for handle in handles {
            match handle.await {
                Ok((user, Ok(()))) => report.delivered.push(user),
                Ok((user, Err(err))) => {
                    warn!(%user, %err, task = %task.id, "task notice not delivered");
                    report.failed.push(user);
                }
                Err(join_err) => {
                    warn!(%join_err, task = %task.id, "notification task panicked");
                }
            }
        }
        report
    }

    /// Best-effort single notice (task/process completion messages to
    /// the process owner). Failures are warn-logged, never escalated.
    pub async fn notify_user(&self, user: UserId, text: &str) {
        if let Err(err) = self.notifier.send_to_user(user, text, None).await {
            warn!(%user, %err, "notice not delivered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ProcessExecutionId, ProcessId, TaskExecution, TaskExecutionId, TaskId,
    };
    use crate::impls::RecordingNotifier;
    use chrono::Utc;
    use ulid::Ulid;

    fn fixtures() -> (Task, TaskExecution) {
        let task = Task::new(
            TaskId::from_ulid(Ulid::new()),
            ProcessId::from_ulid(Ulid::new()),
            "review invoice",
            "check the numbers",
            Utc::now(),
        );
        let execution = TaskExecution::new(
            TaskExecutionId::from_ulid(Ulid::new()),
            task.id,
            ProcessExecutionId::from_ulid(Ulid::new()),
            Utc::now(),
        );
        (task, execution)
    }

    fn member(id: i64) -> User {
        User::new(UserId::new(id), format!("user{id}"), "", "")
    }

    #[tokio::test]
    async fn every_member_gets_one_message_with_the_claim() {
        let notifier = Arc::new(RecordingNotifier::new());
        let dispatcher = NotificationDispatcher::new(notifier.clone());
        let (task, execution) = fixtures();
        let members = vec![member(1), member(2), member(3)];

        let report = dispatcher.notify_team(&task, &execution, &members).await;

        assert!(report.all_delivered());
        assert_eq!(report.delivered.len(), 3);
        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 3);
        for notice in &sent {
            assert_eq!(notice.task_execution_id, Some(execution.id));
            assert!(notice.message.contains("review invoice"));
        }
    }

    #[tokio::test]
    async fn one_failing_recipient_does_not_stop_the_rest() {
        let notifier = Arc::new(RecordingNotifier::new());
        notifier.fail_sends_to(UserId::new(2)).await;
        let dispatcher = NotificationDispatcher::new(notifier.clone());
        let (task, execution) = fixtures();
        let members = vec![member(1), member(2), member(3)];

        let report = dispatcher.notify_team(&task, &execution, &members).await;

        assert_eq!(report.delivered.len(), 2);
        assert_eq!(report.failed, vec![UserId::new(2)]);
        assert_eq!(notifier.sent().await.len(), 2);
    }
}
