//! Domain model (ids, tasks, results, errors).

pub mod errors;
pub mod ids;
pub mod task;

pub use errors::QueueError;
pub use ids::TaskId;
pub use task::{
    Enqueued, Payload, Priority, QueueSnapshot, QueueStatus, RENEGE_PRIORITY, Served,
    StatusSummary, Task,
};
