//! Queue module: the bounded, capacity-checked service over the heap engine.

mod bounded;

pub use bounded::BoundedQueue;
