//! pqueue-core
//!
//! Bounded, mutable-priority task queue engine.
//!
//! # Modules
//! - **domain**: task model, result records, errors
//! - **ports**: `TaskQueue` (what callers program against) and `Clock`
//! - **queue**: `BoundedQueue`, the only owner of the heap engine
//!
//! The heap engine itself is private; callers reach it only through
//! [`queue::BoundedQueue`].

pub mod domain;
mod heap;
pub mod ports;
pub mod queue;

pub use domain::{
    Enqueued, Payload, Priority, QueueError, QueueSnapshot, QueueStatus, Served, StatusSummary,
    Task, TaskId,
};
pub use heap::HeapError;
pub use ports::{Clock, FixedClock, SystemClock, TaskQueue};
pub use queue::BoundedQueue;
