//! Domain identifiers (strongly-typed IDs).
//!
//! Engine-owned entities get ULID-backed ids behind a phantom-typed
//! `Id<T>` so a `ProcessId` can never be passed where a `TaskId` is
//! expected. ULIDs sort by creation time and can be generated on any
//! node without coordination.
//!
//! `UserId` is the exception: chat users arrive with an identity
//! assigned by the messaging platform (an i64), so it is a plain
//! newtype rather than something we generate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// Marker trait for each id type.
///
/// Provides the prefix used by Display ("proc-", "task-", ...).
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic id type.
///
/// `T` is a zero-sized marker; it costs nothing at runtime and keeps
/// the id types distinct at compile time.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Marker for Process (definition-time template).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Process {}

impl IdMarker for Process {
    fn prefix() -> &'static str {
        "proc-"
    }
}

/// Marker for Task (one node of a process graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// Marker for ProcessExecution (one run of a process).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Run {}

impl IdMarker for Run {
    fn prefix() -> &'static str {
        "run-"
    }
}

/// Marker for TaskExecution (one run instance of a task).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskExec {}

impl IdMarker for TaskExec {
    fn prefix() -> &'static str {
        "exec-"
    }
}

/// Marker for Team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Team {}

impl IdMarker for Team {
    fn prefix() -> &'static str {
        "team-"
    }
}

/// Identifier of a Process (reusable task-graph template).
pub type ProcessId = Id<Process>;

/// Identifier of a Task within a process definition.
pub type TaskId = Id<Task>;

/// Identifier of a ProcessExecution (one run of a process).
pub type ProcessExecutionId = Id<Run>;

/// Identifier of a TaskExecution (one task instance within a run).
pub type TaskExecutionId = Id<TaskExec>;

/// Identifier of a Team.
pub type TeamId = Id<Team>;

/// Chat-platform user identity. Assigned externally, never generated here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
