//! Status views over execution state.

use serde::{Deserialize, Serialize};

use crate::domain::ProcessExecution;

/// Sizes of a run's three id-sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl RunCounts {
    pub fn of(run: &ProcessExecution) -> Self {
        Self {
            pending: run.pending.len(),
            in_progress: run.in_progress.len(),
            completed: run.completed.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProcessExecutionId, ProcessId, TaskExecutionId};
    use chrono::Utc;
    use ulid::Ulid;

    #[test]
    fn counts_mirror_the_sets() {
        let mut run = ProcessExecution::new(
            ProcessExecutionId::from_ulid(Ulid::new()),
            ProcessId::from_ulid(Ulid::new()),
            Utc::now(),
        );
        let a = TaskExecutionId::from_ulid(Ulid::new());
        let b = TaskExecutionId::from_ulid(Ulid::new());
        run.add_pending_execution(a);
        run.add_pending_execution(b);
        run.note_assigned(b);

        let counts = RunCounts::of(&run);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.in_progress, 1);
        assert_eq!(counts.completed, 0);
        assert_eq!(counts.total(), 2);
    }
}
