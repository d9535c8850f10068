use async_trait::async_trait;

use crate::domain::{
    Enqueued, Payload, Priority, QueueError, QueueSnapshot, Served, StatusSummary, Task, TaskId,
};

/// Queue port.
///
/// This is the only surface the console and the HTTP layer see. Every method
/// is atomic with respect to every other method on the same queue.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn capacity(&self) -> usize;

    /// Enqueue a new task. Fails with `CapacityExceeded` when full.
    async fn insert(&self, priority: Priority, payload: Payload) -> Result<Enqueued, QueueError>;

    /// Remove and return the highest-priority task.
    async fn extract_max(&self) -> Result<Served, QueueError>;

    /// Remove a task by id before it is served.
    async fn renege(&self, id: TaskId) -> Result<Served, QueueError>;

    /// Change the priority of a live task and optionally replace its
    /// description. Nothing changes if either check fails.
    async fn update(
        &self,
        id: TaskId,
        priority: Priority,
        description: Option<String>,
    ) -> Result<Task, QueueError>;

    /// Change the priority of a live task.
    async fn update_priority(&self, id: TaskId, priority: Priority) -> Result<Task, QueueError> {
        self.update(id, priority, None).await
    }

    /// Id of the task with the earliest `enqueued_at`.
    async fn oldest_task_id(&self) -> Result<TaskId, QueueError>;

    /// Live ids in heap-array order. NOT sorted by priority.
    async fn snapshot_ids(&self) -> Vec<TaskId>;

    /// Copies of the live tasks in heap-array order. NOT sorted by priority.
    async fn snapshot_details(&self) -> Vec<Task>;

    /// Tasks and oldest id read under one lock.
    async fn snapshot(&self) -> QueueSnapshot;

    async fn status_summary(&self) -> StatusSummary;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
