//! Ports - seams between the queue engine and its callers.
//!
//! - [`TaskQueue`]: what presentation layers (console, HTTP) program against.
//! - [`Clock`]: where the queue gets "now" from.

pub mod clock;
pub mod task_queue;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::task_queue::TaskQueue;
