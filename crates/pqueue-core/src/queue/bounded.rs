//! Bounded, id-assigning queue over the heap engine.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Enqueued, Payload, Priority, QueueError, QueueSnapshot, QueueStatus, RENEGE_PRIORITY, Served,
    StatusSummary, Task, TaskId,
};
use crate::heap::PriorityHeap;
use crate::ports::{Clock, SystemClock, TaskQueue};

/// Mutable queue state. Only ever touched while holding the queue lock.
struct BoundedQueueState {
    heap: PriorityHeap,

    /// Next task id to assign. Never decreases.
    next_id: TaskId,
}

impl BoundedQueueState {
    fn new() -> Self {
        Self {
            heap: PriorityHeap::new(),
            next_id: TaskId::new(0),
        }
    }

    fn allocate_id(&mut self) -> TaskId {
        let id = self.next_id;
        self.next_id = id.next();
        id
    }

    /// Earliest `enqueued_at`; the first one in array order wins ties.
    fn oldest(&self) -> Option<&Task> {
        self.heap.iter().min_by_key(|task| task.enqueued_at())
    }

    fn position_of(&self, id: TaskId) -> Result<usize, QueueError> {
        self.heap.position_of(id).ok_or(QueueError::NotFound(id))
    }
}

/// Capacity-checked priority queue shared by every caller of one service.
///
/// Design:
/// - One lock guards the heap and the id counter together. Every operation,
///   queries included, runs entirely under it, so the intermediate states of
///   a renege (elevated priority, shuffled indices) are never observable.
/// - Size is the heap length. There is no second counter to drift.
pub struct BoundedQueue {
    name: String,
    description: String,
    capacity: usize,
    clock: Arc<dyn Clock>,
    state: Mutex<BoundedQueueState>,
}

impl BoundedQueue {
    pub fn new(name: impl Into<String>, description: impl Into<String>, capacity: usize) -> Self {
        Self::with_clock(name, description, capacity, SystemClock)
    }

    pub fn with_clock(
        name: impl Into<String>,
        description: impl Into<String>,
        capacity: usize,
        clock: impl Clock + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            capacity,
            clock: Arc::new(clock),
            state: Mutex::new(BoundedQueueState::new()),
        }
    }

    fn check_priority(priority: Priority) -> Result<(), QueueError> {
        if priority == RENEGE_PRIORITY {
            return Err(QueueError::ReservedPriority(priority));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for BoundedQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    async fn insert(&self, priority: Priority, payload: Payload) -> Result<Enqueued, QueueError> {
        Self::check_priority(priority)?;
        let mut state = self.state.lock().await;
        if state.heap.len() >= self.capacity {
            return Err(QueueError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let id = state.allocate_id();
        let position = state
            .heap
            .push(Task::new(id, priority, payload, self.clock.now()));
        let task = state
            .heap
            .get(position)
            .cloned()
            .ok_or(QueueError::NotFound(id))?;
        Ok(Enqueued { task, position })
    }

    async fn extract_max(&self) -> Result<Served, QueueError> {
        let mut state = self.state.lock().await;
        if state.heap.is_empty() {
            return Err(QueueError::Empty);
        }
        let task = state.heap.pop()?;
        let wait = task.waited(self.clock.now());
        Ok(Served { task, wait })
    }

    async fn renege(&self, id: TaskId) -> Result<Served, QueueError> {
        let mut state = self.state.lock().await;
        let index = state.position_of(id)?;
        let original = state
            .heap
            .get(index)
            .map(Task::priority)
            .ok_or(QueueError::NotFound(id))?;

        // Elevate to the reserved maximum, bubble to the root, pop.
        state.heap.set_priority(index, RENEGE_PRIORITY)?;
        let mut task = state.heap.pop()?;
        debug_assert_eq!(task.id(), id);
        task.set_priority(original);

        let wait = task.waited(self.clock.now());
        Ok(Served { task, wait })
    }

    async fn update(
        &self,
        id: TaskId,
        priority: Priority,
        description: Option<String>,
    ) -> Result<Task, QueueError> {
        Self::check_priority(priority)?;
        let mut state = self.state.lock().await;
        let index = state.position_of(id)?;
        if let Some(description) = description {
            state.heap.set_description(index, description)?;
        }
        state.heap.set_priority(index, priority)?;

        let index = state.position_of(id)?;
        state
            .heap
            .get(index)
            .cloned()
            .ok_or(QueueError::NotFound(id))
    }

    async fn oldest_task_id(&self) -> Result<TaskId, QueueError> {
        let state = self.state.lock().await;
        state.oldest().map(Task::id).ok_or(QueueError::Empty)
    }

    async fn snapshot_ids(&self) -> Vec<TaskId> {
        let state = self.state.lock().await;
        state.heap.iter().map(Task::id).collect()
    }

    async fn snapshot_details(&self) -> Vec<Task> {
        let state = self.state.lock().await;
        state.heap.iter().cloned().collect()
    }

    async fn snapshot(&self) -> QueueSnapshot {
        let state = self.state.lock().await;
        QueueSnapshot {
            tasks: state.heap.iter().cloned().collect(),
            oldest_task_id: state.oldest().map(Task::id),
        }
    }

    async fn status_summary(&self) -> StatusSummary {
        let state = self.state.lock().await;
        let size = state.heap.len();
        let status = if size >= self.capacity {
            QueueStatus::AtCapacity
        } else {
            QueueStatus::InService
        };
        let oldest = state.oldest();
        let now = self.clock.now();
        StatusSummary {
            status,
            name: self.name.clone(),
            size,
            capacity: self.capacity,
            oldest_task_id: oldest.map(Task::id),
            oldest_wait: oldest.map(|task| task.waited(now)),
        }
    }

    async fn len(&self) -> usize {
        self.state.lock().await.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::rstest;

    use super::*;
    use crate::ports::FixedClock;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn queue_with_clock(capacity: usize) -> (BoundedQueue, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(start()));
        let queue = BoundedQueue::with_clock("test", "test queue", capacity, Arc::clone(&clock));
        (queue, clock)
    }

    fn payload(name: &str) -> Payload {
        Payload::new(name, format!("{name} description"))
    }

    async fn assert_heap_consistent(queue: &BoundedQueue) {
        let state = queue.state.lock().await;
        assert!(state.heap.check_invariant());
    }

    #[tokio::test]
    async fn new_queue_is_empty() {
        let queue = BoundedQueue::new("DefaultQueue", "demo", 10);
        assert_eq!(queue.name(), "DefaultQueue");
        assert_eq!(queue.description(), "demo");
        assert_eq!(queue.capacity(), 10);
        assert_eq!(queue.len().await, 0);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn extract_max_serves_in_priority_order() {
        let queue = BoundedQueue::new("test", "", 10);
        for p in [5, 1, 9, 3] {
            queue.insert(p, payload("c")).await.unwrap();
        }

        let mut served = Vec::new();
        while let Ok(s) = queue.extract_max().await {
            served.push(s.task.priority());
        }
        assert_eq!(served, vec![9, 5, 3, 1]);
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test]
    async fn extract_max_on_empty_queue_fails() {
        let queue = BoundedQueue::new("test", "", 1);
        assert_eq!(queue.extract_max().await, Err(QueueError::Empty));
    }

    #[tokio::test]
    async fn extract_max_reports_wait_time() {
        let (queue, clock) = queue_with_clock(4);
        queue.insert(1, payload("a")).await.unwrap();
        clock.advance(TimeDelta::seconds(12));
        let served = queue.extract_max().await.unwrap();
        assert_eq!(served.wait, Duration::from_secs(12));
        assert_eq!(served.task.heap_index(), None);
    }

    #[tokio::test]
    async fn insert_past_capacity_is_rejected() {
        let queue = BoundedQueue::new("test", "", 1);
        queue.insert(10, payload("first")).await.unwrap();

        let err = queue.insert(20, payload("second")).await.unwrap_err();
        assert_eq!(err, QueueError::CapacityExceeded { capacity: 1 });
        assert_eq!(queue.len().await, 1);
        assert_eq!(queue.snapshot_ids().await, vec![TaskId::new(0)]);
    }

    #[tokio::test]
    async fn zero_capacity_rejects_everything() {
        let queue = BoundedQueue::new("test", "", 0);
        assert!(matches!(
            queue.insert(1, payload("a")).await,
            Err(QueueError::CapacityExceeded { capacity: 0 })
        ));
        assert_eq!(queue.status_summary().await.status, QueueStatus::AtCapacity);
    }

    #[tokio::test]
    async fn insert_stamps_id_time_and_position() {
        let (queue, _clock) = queue_with_clock(4);
        let first = queue.insert(1, payload("low")).await.unwrap();
        assert_eq!(first.task.id(), TaskId::new(0));
        assert_eq!(first.task.enqueued_at(), start());
        assert_eq!(first.position, 0);
        assert_eq!(first.task.payload().name, "low");

        // A higher priority task bubbles to the root.
        let second = queue.insert(9, payload("high")).await.unwrap();
        assert_eq!(second.position, 0);
        assert_eq!(second.task.heap_index(), Some(0));

        // A lower one stays at the bottom.
        let third = queue.insert(0, payload("lowest")).await.unwrap();
        assert_eq!(third.position, 2);
    }

    #[rstest]
    #[case::max(Priority::MAX)]
    #[tokio::test]
    async fn reserved_priority_is_rejected(#[case] priority: Priority) {
        let queue = BoundedQueue::new("test", "", 4);
        assert_eq!(
            queue.insert(priority, payload("x")).await,
            Err(QueueError::ReservedPriority(priority))
        );
        assert_eq!(queue.len().await, 0);

        // The failed insert consumed no id.
        let ok = queue.insert(1, payload("y")).await.unwrap();
        assert_eq!(ok.task.id(), TaskId::new(0));
    }

    #[tokio::test]
    async fn extreme_but_allowed_priorities_are_ordered() {
        let queue = BoundedQueue::new("test", "", 4);
        queue.insert(Priority::MIN, payload("min")).await.unwrap();
        queue.insert(Priority::MAX - 1, payload("near max")).await.unwrap();
        queue.insert(0, payload("zero")).await.unwrap();

        let order: Vec<Priority> = [
            queue.extract_max().await.unwrap(),
            queue.extract_max().await.unwrap(),
            queue.extract_max().await.unwrap(),
        ]
        .iter()
        .map(|s| s.task.priority())
        .collect();
        assert_eq!(order, vec![Priority::MAX - 1, 0, Priority::MIN]);
    }

    #[tokio::test]
    async fn ids_are_monotonic_and_never_reused() {
        let queue = BoundedQueue::new("test", "", 3);
        let mut ids = Vec::new();
        for p in [3, 2, 1] {
            ids.push(queue.insert(p, payload("c")).await.unwrap().task.id());
        }
        assert_eq!(ids, vec![TaskId::new(0), TaskId::new(1), TaskId::new(2)]);

        queue.extract_max().await.unwrap();
        queue.renege(TaskId::new(2)).await.unwrap();

        let next = queue.insert(5, payload("c")).await.unwrap();
        assert_eq!(next.task.id(), TaskId::new(3));
        let next = queue.insert(5, payload("c")).await.unwrap();
        assert_eq!(next.task.id(), TaskId::new(4));
    }

    #[tokio::test]
    async fn renege_removes_the_named_task() {
        let queue = BoundedQueue::new("test", "", 10);
        for p in [8, 10, 9] {
            queue.insert(p, payload("c")).await.unwrap();
        }

        let served = queue.extract_max().await.unwrap();
        assert_eq!(served.task.id(), TaskId::new(1));
        assert_eq!(served.task.priority(), 10);

        let reneged = queue.renege(TaskId::new(0)).await.unwrap();
        assert_eq!(reneged.task.id(), TaskId::new(0));
        assert_eq!(reneged.task.priority(), 8);
        assert_eq!(reneged.task.heap_index(), None);
        assert_eq!(queue.snapshot_ids().await, vec![TaskId::new(2)]);

        let last = queue.extract_max().await.unwrap();
        assert_eq!(last.task.id(), TaskId::new(2));
        assert_eq!(last.task.priority(), 9);
    }

    #[tokio::test]
    async fn renege_twice_fails_the_second_time() {
        let queue = BoundedQueue::new("test", "", 10);
        queue.insert(1, payload("a")).await.unwrap();
        queue.insert(2, payload("b")).await.unwrap();

        assert!(queue.renege(TaskId::new(0)).await.is_ok());
        assert_eq!(
            queue.renege(TaskId::new(0)).await,
            Err(QueueError::NotFound(TaskId::new(0)))
        );
        assert_eq!(queue.len().await, 1);
    }

    #[rstest]
    #[case::never_inserted(42)]
    #[case::already_served(0)]
    #[tokio::test]
    async fn renege_unknown_id_is_not_found(#[case] id: u64) {
        let queue = BoundedQueue::new("test", "", 10);
        queue.insert(5, payload("a")).await.unwrap();
        queue.extract_max().await.unwrap();
        queue.insert(1, payload("b")).await.unwrap();

        let id = TaskId::new(id);
        assert_eq!(queue.renege(id).await, Err(QueueError::NotFound(id)));
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn renege_from_every_position_keeps_heap_valid() {
        let priorities = [7, 3, 9, 1, 8, 2, 6, 5, 4, 0];
        for target in 0..priorities.len() as u64 {
            let queue = BoundedQueue::new("test", "", 16);
            for p in priorities {
                queue.insert(p, payload("c")).await.unwrap();
            }
            let reneged = queue.renege(TaskId::new(target)).await.unwrap();
            assert_eq!(reneged.task.priority(), priorities[target as usize]);
            assert_heap_consistent(&queue).await;
            assert!(!queue.snapshot_ids().await.contains(&TaskId::new(target)));
        }
    }

    #[tokio::test]
    async fn renege_reports_wait_time() {
        let (queue, clock) = queue_with_clock(4);
        queue.insert(1, payload("a")).await.unwrap();
        clock.advance(TimeDelta::seconds(3));
        let reneged = queue.renege(TaskId::new(0)).await.unwrap();
        assert_eq!(reneged.wait, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn update_priority_reorders() {
        let queue = BoundedQueue::new("test", "", 10);
        for p in [5, 4, 3] {
            queue.insert(p, payload("c")).await.unwrap();
        }

        let updated = queue.update_priority(TaskId::new(2), 50).await.unwrap();
        assert_eq!(updated.priority(), 50);
        assert_eq!(updated.heap_index(), Some(0));
        assert_heap_consistent(&queue).await;

        queue.update_priority(TaskId::new(0), -1).await.unwrap();
        let order: Vec<TaskId> = vec![
            queue.extract_max().await.unwrap().task.id(),
            queue.extract_max().await.unwrap().task.id(),
            queue.extract_max().await.unwrap().task.id(),
        ];
        assert_eq!(order, vec![TaskId::new(2), TaskId::new(1), TaskId::new(0)]);
    }

    #[tokio::test]
    async fn update_priority_failures_leave_queue_untouched() {
        let queue = BoundedQueue::new("test", "", 10);
        queue.insert(5, payload("a")).await.unwrap();

        assert_eq!(
            queue.update_priority(TaskId::new(9), 1).await,
            Err(QueueError::NotFound(TaskId::new(9)))
        );
        assert_eq!(
            queue.update_priority(TaskId::new(0), RENEGE_PRIORITY).await,
            Err(QueueError::ReservedPriority(RENEGE_PRIORITY))
        );
        assert_eq!(queue.snapshot_details().await[0].priority(), 5);
    }

    #[tokio::test]
    async fn update_can_replace_the_description() {
        let queue = BoundedQueue::new("test", "", 10);
        queue.insert(5, payload("a")).await.unwrap();
        queue.insert(7, payload("b")).await.unwrap();

        let updated = queue
            .update(TaskId::new(0), 9, Some("escalated".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.payload().description, "escalated");
        assert_eq!(updated.payload().name, "a");
        assert_eq!(updated.heap_index(), Some(0));
        assert_heap_consistent(&queue).await;

        let kept = queue.update(TaskId::new(0), 9, None).await.unwrap();
        assert_eq!(kept.payload().description, "escalated");

        assert_eq!(
            queue
                .update(TaskId::new(1), RENEGE_PRIORITY, Some("lost".to_string()))
                .await,
            Err(QueueError::ReservedPriority(RENEGE_PRIORITY))
        );
        let b = queue.snapshot_details().await.into_iter().find(|t| t.id() == TaskId::new(1));
        assert_eq!(b.unwrap().payload().description, "b description");
    }

    #[tokio::test]
    async fn oldest_task_ignores_priority_and_array_order() {
        let (queue, clock) = queue_with_clock(10);
        clock.set(start() + TimeDelta::seconds(10));
        queue.insert(1, payload("late")).await.unwrap();
        clock.set(start());
        queue.insert(2, payload("earliest")).await.unwrap();
        clock.set(start() + TimeDelta::seconds(5));
        queue.insert(100, payload("middle")).await.unwrap();

        assert_eq!(queue.oldest_task_id().await, Ok(TaskId::new(1)));

        queue.renege(TaskId::new(1)).await.unwrap();
        assert_eq!(queue.oldest_task_id().await, Ok(TaskId::new(2)));
    }

    #[tokio::test]
    async fn oldest_task_tie_goes_to_first_in_array() {
        let (queue, _clock) = queue_with_clock(10);
        queue.insert(1, payload("a")).await.unwrap();
        queue.insert(9, payload("b")).await.unwrap();

        // Same timestamp: id 1 sits at the root, so it is scanned first.
        assert_eq!(queue.snapshot_ids().await[0], TaskId::new(1));
        assert_eq!(queue.oldest_task_id().await, Ok(TaskId::new(1)));
    }

    #[tokio::test]
    async fn oldest_task_on_empty_queue_fails() {
        let queue = BoundedQueue::new("test", "", 10);
        assert_eq!(queue.oldest_task_id().await, Err(QueueError::Empty));
    }

    #[tokio::test]
    async fn snapshots_are_in_heap_order_and_detached() {
        let (queue, _clock) = queue_with_clock(10);
        for p in [1, 3, 2] {
            queue.insert(p, payload("c")).await.unwrap();
        }

        assert_eq!(
            queue.snapshot_ids().await,
            vec![TaskId::new(1), TaskId::new(0), TaskId::new(2)]
        );

        let mut details = queue.snapshot_details().await;
        for (i, task) in details.iter().enumerate() {
            assert_eq!(task.heap_index(), Some(i));
        }
        details.clear();
        assert_eq!(queue.len().await, 3);

        let snapshot = queue.snapshot().await;
        assert_eq!(snapshot.ids(), queue.snapshot_ids().await);
        assert_eq!(snapshot.oldest_task_id, Some(TaskId::new(1)));
    }

    #[tokio::test]
    async fn status_summary_tracks_capacity_and_wait() {
        let (queue, clock) = queue_with_clock(2);

        let empty = queue.status_summary().await;
        assert_eq!(empty.status, QueueStatus::InService);
        assert_eq!(empty.size, 0);
        assert_eq!(empty.oldest_task_id, None);
        assert_eq!(empty.oldest_wait, None);

        queue.insert(1, payload("a")).await.unwrap();
        clock.advance(TimeDelta::seconds(10));
        queue.insert(2, payload("b")).await.unwrap();
        clock.advance(TimeDelta::seconds(20));

        let full = queue.status_summary().await;
        assert_eq!(full.status, QueueStatus::AtCapacity);
        assert_eq!(full.name, "test");
        assert_eq!(full.size, 2);
        assert_eq!(full.capacity, 2);
        assert_eq!(full.oldest_task_id, Some(TaskId::new(0)));
        assert_eq!(full.oldest_wait, Some(Duration::from_secs(30)));

        queue.extract_max().await.unwrap();
        assert_eq!(queue.status_summary().await.status, QueueStatus::InService);
    }

    #[tokio::test]
    async fn heap_invariant_survives_mixed_operations() {
        let queue = BoundedQueue::new("test", "", 64);
        let mut rng = StdRng::seed_from_u64(7);
        for step in 0..2_000u64 {
            match rng.gen_range(0..4) {
                0 | 1 => {
                    let _ = queue.insert(rng.gen_range(-5..=5), payload("c")).await;
                }
                2 => {
                    let _ = queue.extract_max().await;
                }
                _ => {
                    let id = TaskId::new(rng.gen_range(0..=step));
                    if rng.gen_bool(0.5) {
                        let _ = queue.renege(id).await;
                    } else {
                        let _ = queue.update_priority(id, rng.gen_range(-5..=5)).await;
                    }
                }
            }
            assert_heap_consistent(&queue).await;
        }
    }

    #[derive(Default)]
    struct Tally {
        inserted: Vec<TaskId>,
        removed: Vec<TaskId>,
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_never_corrupt_the_queue() {
        let queue = Arc::new(BoundedQueue::new("stress", "", 32));

        let mut handles = Vec::new();
        for worker in 0..8u64 {
            let queue = Arc::clone(&queue);
            handles.push(tokio::spawn(async move {
                let mut rng = StdRng::seed_from_u64(worker);
                let mut tally = Tally::default();
                for _ in 0..500 {
                    match rng.gen_range(0..3) {
                        0 => {
                            let priority = rng.gen_range(1..=10);
                            if let Ok(e) = queue.insert(priority, Payload::default()).await {
                                tally.inserted.push(e.task.id());
                            }
                        }
                        1 => {
                            if let Ok(s) = queue.extract_max().await {
                                tally.removed.push(s.task.id());
                            }
                        }
                        _ => {
                            let id = TaskId::new(rng.gen_range(0..2_000));
                            if let Ok(s) = queue.renege(id).await {
                                assert_eq!(s.task.id(), id);
                                tally.removed.push(id);
                            }
                        }
                    }
                    tokio::task::yield_now().await;
                }
                tally
            }));
        }

        let mut inserted = Vec::new();
        let mut removed = Vec::new();
        for handle in handles {
            let tally = handle.await.unwrap();
            inserted.extend(tally.inserted);
            removed.extend(tally.removed);
        }

        let inserted_set: HashSet<TaskId> = inserted.iter().copied().collect();
        let removed_set: HashSet<TaskId> = removed.iter().copied().collect();
        assert_eq!(inserted_set.len(), inserted.len(), "duplicate id assigned");
        assert_eq!(removed_set.len(), removed.len(), "task removed twice");
        assert!(removed_set.is_subset(&inserted_set));

        let remaining: HashSet<TaskId> = queue.snapshot_ids().await.into_iter().collect();
        assert_eq!(queue.len().await, inserted.len() - removed.len());
        assert!(remaining.is_disjoint(&removed_set));
        let accounted: HashSet<TaskId> = remaining.union(&removed_set).copied().collect();
        assert_eq!(accounted, inserted_set);

        assert_heap_consistent(&queue).await;
    }
}
