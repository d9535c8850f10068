//! Demo data loader.

use pqueue_core::{Payload, Priority, TaskQueue};
use rand::Rng;
use tracing::{info, warn};

/// Demo priorities are drawn from this range.
pub const SEED_PRIORITIES: std::ops::RangeInclusive<Priority> = 1..=10;

/// Insert `count` demo tasks. Stops at the first rejected insert.
///
/// Returns how many tasks were inserted.
pub async fn seed_demo_tasks(queue: &dyn TaskQueue, count: usize, rng: &mut impl Rng) -> usize {
    let mut inserted = 0;
    for i in (0..count).rev() {
        let priority = rng.gen_range(SEED_PRIORITIES);
        let payload = Payload::new(format!("name{i}"), format!("desc{i}"));
        if let Err(err) = queue.insert(priority, payload).await {
            warn!(error = %err, inserted, requested = count, "seeding stopped early");
            break;
        }
        inserted += 1;
    }
    info!(inserted, queue = queue.name(), "seeded demo tasks");
    inserted
}
