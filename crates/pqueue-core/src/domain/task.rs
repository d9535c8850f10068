use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::TaskId;

/// Priority weight. Higher values are served first.
pub type Priority = i64;

/// Priority a task is elevated to while it is being reneged.
///
/// Callers can never insert a task with this priority, so an elevated task is
/// strictly the maximum of the heap.
pub const RENEGE_PRIORITY: Priority = Priority::MAX;

/// Caller-supplied description of the work. Opaque to the queue.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Payload {
    pub name: String,
    pub description: String,
}

impl Payload {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A task owned by a queue.
///
/// Values handed out by the queue are copies; mutating them has no effect on
/// the queue. `heap_index` on a copy is the position the task held when the
/// copy was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    priority: Priority,
    payload: Payload,
    enqueued_at: DateTime<Utc>,
    /// Position in the heap array. `None` once the task has left the heap.
    heap_index: Option<usize>,
}

impl Task {
    pub(crate) fn new(
        id: TaskId,
        priority: Priority,
        payload: Payload,
        enqueued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            priority,
            payload,
            enqueued_at,
            heap_index: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    pub fn heap_index(&self) -> Option<usize> {
        self.heap_index
    }

    /// Time spent in the queue as of `now`. Zero if the clock went backwards.
    pub fn waited(&self, now: DateTime<Utc>) -> Duration {
        (now - self.enqueued_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub(crate) fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub(crate) fn set_description(&mut self, description: String) {
        self.payload.description = description;
    }

    pub(crate) fn set_heap_index(&mut self, index: Option<usize>) {
        self.heap_index = index;
    }

    /// Heap ordering: higher priority first, lower id first among equals.
    ///
    /// Ids are unique, so two distinct tasks never compare equal.
    pub(crate) fn outranks(&self, other: &Task) -> bool {
        self.priority > other.priority || (self.priority == other.priority && self.id < other.id)
    }
}

/// Result of a successful insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enqueued {
    pub task: Task,
    /// Heap-array position right after the insert. Later operations move it.
    pub position: usize,
}

/// A task that left the queue, either served or reneged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub task: Task,
    pub wait: Duration,
}

/// Consistent copy of the queue contents, taken under a single lock.
///
/// `tasks` is in heap-array order, which is NOT priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub tasks: Vec<Task>,
    pub oldest_task_id: Option<TaskId>,
}

impl QueueSnapshot {
    pub fn ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(Task::id).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueStatus {
    InService,
    AtCapacity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSummary {
    pub status: QueueStatus,
    pub name: String,
    pub size: usize,
    pub capacity: usize,
    pub oldest_task_id: Option<TaskId>,
    /// Wait of the oldest task. `None` means the queue is empty.
    pub oldest_wait: Option<Duration>,
}
