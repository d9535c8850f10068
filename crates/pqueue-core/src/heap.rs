//! Array-backed binary max-heap with per-task index tracking.
//!
//! Design:
//! - The heap owns its tasks in a `Vec<Task>`; position 0 is the root.
//! - Every swap rewrites `heap_index` on both tasks, so `tasks[t.heap_index] == t`
//!   holds for every live task. This is what makes `fix` and `remove_at`
//!   O(log n) on an arbitrary position.
//! - Ordering is `Task::outranks`: priority desc, then id asc.
//! - There is no capacity here. Capacity is policy and lives in the queue.

use thiserror::Error;

use crate::domain::{Priority, Task, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
    #[error("heap is empty")]
    Empty,

    #[error("heap index {index} out of bounds (len={len})")]
    OutOfBounds { index: usize, len: usize },
}

#[derive(Debug, Default)]
pub(crate) struct PriorityHeap {
    tasks: Vec<Task>,
}

impl PriorityHeap {
    pub(crate) fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn peek(&self) -> Option<&Task> {
        self.tasks.first()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    /// Tasks in heap-array order (not priority order).
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Linear scan for the current position of `id`.
    pub(crate) fn position_of(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id() == id)
    }

    /// Add a task that is not in any heap yet. O(log n).
    ///
    /// Returns the position the task settled at.
    pub(crate) fn push(&mut self, mut task: Task) -> usize {
        debug_assert!(task.heap_index().is_none(), "task is already in a heap");
        let pos = self.tasks.len();
        task.set_heap_index(Some(pos));
        self.tasks.push(task);
        self.sift_up(pos)
    }

    /// Remove and return the root (highest priority). O(log n).
    pub(crate) fn pop(&mut self) -> Result<Task, HeapError> {
        let last = self.tasks.len().checked_sub(1).ok_or(HeapError::Empty)?;
        self.swap(0, last);
        let mut task = self.tasks.pop().ok_or(HeapError::Empty)?;
        task.set_heap_index(None);
        if !self.tasks.is_empty() {
            self.sift_down(0);
        }
        Ok(task)
    }

    /// Restore the heap property around `index` after its priority changed.
    pub(crate) fn fix(&mut self, index: usize) -> Result<(), HeapError> {
        self.check_bounds(index)?;
        if self.sift_up(index) == index {
            self.sift_down(index);
        }
        Ok(())
    }

    /// Remove the task at an arbitrary position. O(log n).
    ///
    /// Renege goes through elevate-then-pop, so only tests call this today.
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn remove_at(&mut self, index: usize) -> Result<Task, HeapError> {
        self.check_bounds(index)?;
        let last = self.tasks.len() - 1;
        self.swap(index, last);
        let mut task = self.tasks.pop().ok_or(HeapError::Empty)?;
        task.set_heap_index(None);
        if index != last {
            self.fix(index)?;
        }
        Ok(task)
    }

    /// Change the priority of the task at `index` and re-heapify.
    pub(crate) fn set_priority(
        &mut self,
        index: usize,
        priority: Priority,
    ) -> Result<(), HeapError> {
        self.check_bounds(index)?;
        self.tasks[index].set_priority(priority);
        self.fix(index)
    }

    /// Replace the description of the task at `index`. Ordering is unaffected.
    pub(crate) fn set_description(
        &mut self,
        index: usize,
        description: String,
    ) -> Result<(), HeapError> {
        self.check_bounds(index)?;
        self.tasks[index].set_description(description);
        Ok(())
    }

    /// Heap property plus index bookkeeping.
    #[cfg(test)]
    pub(crate) fn check_invariant(&self) -> bool {
        self.tasks.iter().enumerate().all(|(i, task)| {
            let indexed = task.heap_index() == Some(i);
            let ordered = i == 0 || !task.outranks(&self.tasks[(i - 1) / 2]);
            indexed && ordered
        })
    }

    fn check_bounds(&self, index: usize) -> Result<(), HeapError> {
        if index < self.tasks.len() {
            Ok(())
        } else {
            Err(HeapError::OutOfBounds {
                index,
                len: self.tasks.len(),
            })
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        self.tasks.swap(i, j);
        self.tasks[i].set_heap_index(Some(i));
        self.tasks[j].set_heap_index(Some(j));
    }

    /// Returns the final position.
    fn sift_up(&mut self, mut pos: usize) -> usize {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.tasks[pos].outranks(&self.tasks[parent]) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
        pos
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.tasks.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.tasks[right].outranks(&self.tasks[left]) {
                right
            } else {
                left
            };
            if !self.tasks[child].outranks(&self.tasks[pos]) {
                break;
            }
            self.swap(pos, child);
            pos = child;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Payload;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn task(id: u64, priority: Priority) -> Task {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Task::new(TaskId::new(id), priority, Payload::default(), at)
    }

    fn heap_of(priorities: &[Priority]) -> PriorityHeap {
        let mut heap = PriorityHeap::new();
        for (id, &p) in priorities.iter().enumerate() {
            heap.push(task(id as u64, p));
        }
        heap
    }

    fn drain_priorities(heap: &mut PriorityHeap) -> Vec<Priority> {
        let mut out = Vec::new();
        while let Ok(task) = heap.pop() {
            out.push(task.priority());
            assert!(heap.check_invariant());
        }
        out
    }

    #[test]
    fn pop_on_empty_heap_fails() {
        let mut heap = PriorityHeap::new();
        assert_eq!(heap.pop(), Err(HeapError::Empty));
    }

    #[test]
    fn push_keeps_max_at_root() {
        let heap = heap_of(&[5, 1, 9, 3]);
        assert!(heap.check_invariant());
        assert_eq!(heap.peek().map(Task::priority), Some(9));
        assert_eq!(heap.len(), 4);
    }

    #[rstest]
    #[case::mixed_input(&[5, 1, 9, 3], &[9, 5, 3, 1])]
    #[case::ascending(&[1, 2, 3, 4, 5, 6], &[6, 5, 4, 3, 2, 1])]
    #[case::descending(&[6, 5, 4, 3, 2, 1], &[6, 5, 4, 3, 2, 1])]
    #[case::negative(&[-3, 0, -10, 7], &[7, 0, -3, -10])]
    #[case::duplicates(&[2, 2, 1, 2], &[2, 2, 2, 1])]
    fn pops_in_priority_order(#[case] input: &[Priority], #[case] expected: &[Priority]) {
        let mut heap = heap_of(input);
        assert_eq!(drain_priorities(&mut heap), expected);
        assert!(heap.is_empty());
    }

    #[test]
    fn ties_are_served_in_id_order() {
        let mut heap = heap_of(&[4, 4, 4, 4, 4]);
        let ids: Vec<u64> = std::iter::from_fn(|| heap.pop().ok())
            .map(|t| t.id().as_u64())
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn push_returns_settled_position() {
        let mut heap = heap_of(&[5, 4]);
        assert_eq!(heap.push(task(2, 1)), 2);
        assert_eq!(heap.push(task(3, 9)), 0);
        assert!(heap.check_invariant());
    }

    #[test]
    fn popped_task_has_no_index() {
        let mut heap = heap_of(&[1, 2]);
        let task = heap.pop().unwrap();
        assert_eq!(task.heap_index(), None);
    }

    #[test]
    fn every_task_knows_its_position() {
        let heap = heap_of(&[3, 8, 1, 9, 4, 7]);
        for (i, task) in heap.iter().enumerate() {
            assert_eq!(task.heap_index(), Some(i));
            assert_eq!(heap.position_of(task.id()), Some(i));
        }
    }

    #[test]
    fn raising_priority_moves_task_up() {
        let mut heap = heap_of(&[10, 8, 6, 4, 2]);
        let pos = heap.position_of(TaskId::new(4)).unwrap();
        heap.set_priority(pos, 100).unwrap();
        assert!(heap.check_invariant());
        assert_eq!(heap.peek().map(Task::id), Some(TaskId::new(4)));
    }

    #[test]
    fn lowering_priority_moves_task_down() {
        let mut heap = heap_of(&[10, 8, 6, 4, 2]);
        heap.set_priority(0, 0).unwrap();
        assert!(heap.check_invariant());
        assert_eq!(heap.peek().map(Task::priority), Some(8));
        assert_eq!(drain_priorities(&mut heap), vec![8, 6, 4, 2, 0]);
    }

    #[test]
    fn fix_rejects_out_of_bounds() {
        let mut heap = heap_of(&[1]);
        assert_eq!(heap.fix(1), Err(HeapError::OutOfBounds { index: 1, len: 1 }));
        assert_eq!(
            heap.set_priority(3, 9),
            Err(HeapError::OutOfBounds { index: 3, len: 1 })
        );
    }

    #[test]
    fn remove_at_last_position() {
        let mut heap = heap_of(&[9, 5, 3]);
        let last = heap.len() - 1;
        let removed = heap.remove_at(last).unwrap();
        assert_eq!(removed.heap_index(), None);
        assert_eq!(heap.len(), 2);
        assert!(heap.check_invariant());
    }

    #[test]
    fn remove_at_every_position_keeps_invariant() {
        let priorities = [7, 3, 9, 1, 8, 2, 6, 5, 4, 0];
        for target in 0..priorities.len() {
            let mut heap = heap_of(&priorities);
            let removed = heap.remove_at(target).unwrap();
            assert!(heap.check_invariant(), "broken after removing position {target}");
            assert_eq!(heap.len(), priorities.len() - 1);
            assert_eq!(heap.position_of(removed.id()), None);
        }
    }

    #[test]
    fn remove_at_may_need_sift_up() {
        // Replacement element coming from the far subtree can outrank the
        // new parent.
        let mut heap = heap_of(&[100, 50, 90, 10, 20, 80, 85]);
        let pos = heap.position_of(TaskId::new(3)).unwrap();
        heap.remove_at(pos).unwrap();
        assert!(heap.check_invariant());
    }

    #[test]
    fn remove_at_rejects_out_of_bounds() {
        let mut heap = PriorityHeap::new();
        assert_eq!(
            heap.remove_at(0),
            Err(HeapError::OutOfBounds { index: 0, len: 0 })
        );
    }

    #[test]
    fn set_description_leaves_order_alone() {
        let mut heap = heap_of(&[4, 9, 1]);
        let before: Vec<TaskId> = heap.iter().map(Task::id).collect();
        heap.set_description(2, "new".to_string()).unwrap();
        assert_eq!(heap.get(2).map(|t| t.payload().description.as_str()), Some("new"));
        assert_eq!(heap.iter().map(Task::id).collect::<Vec<_>>(), before);
        assert_eq!(
            heap.set_description(3, String::new()),
            Err(HeapError::OutOfBounds { index: 3, len: 3 })
        );
    }

    #[test]
    fn position_of_missing_id() {
        let heap = heap_of(&[1, 2, 3]);
        assert_eq!(heap.position_of(TaskId::new(99)), None);
        assert!(heap.get(3).is_none());
    }
}
