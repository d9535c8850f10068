//! Errors returned by queue operations.
//!
//! Every variant is recoverable by the caller; none of them leaves the queue
//! in a partially updated state.

use thiserror::Error;

use super::{Priority, TaskId};
use crate::heap::HeapError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Insert attempted while the queue holds `capacity` tasks.
    #[error("the system is working at its peak capacity ({capacity}), please try again later")]
    CapacityExceeded { capacity: usize },

    #[error("queue is empty")]
    Empty,

    /// No live task has this id (never inserted, served, or reneged).
    #[error("id not found: {0}")]
    NotFound(TaskId),

    #[error("priority {0} is reserved for internal use")]
    ReservedPriority(Priority),

    #[error(transparent)]
    Heap(#[from] HeapError),
}
