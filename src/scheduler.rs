//! Time-ordered task queue for the sampling loop.
//!
//! A minimal absolute-time scheduler: tasks are keyed by monotonic wake
//! instant, with [`TaskKind::CalcMean`] ordered ahead of [`TaskKind::Sample`]
//! at the same instant so a completed window is always flushed before the
//! next tick appends to it. Equal keys otherwise pop in insertion order.
//!
//! The queue is pure state — the run loop in [`crate::monitor`] owns it and
//! does the actual waiting.

use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tokio::time::Instant;

/// The two recurring task kinds of the sampling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Flush the completed window into a mean record.
    CalcMean,
    /// Read all channels and append a raw sample.
    Sample,
}

impl TaskKind {
    /// Tie-break rank at an equal wake instant; lower runs first.
    fn priority(self) -> u8 {
        match self {
            TaskKind::CalcMean => 0,
            TaskKind::Sample => 1,
        }
    }
}

/// A task with an absolute wake time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    /// Absolute wake instant (monotonic clock).
    pub at: Instant,
    /// What to run.
    pub kind: TaskKind,
    seq: u64,
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.kind.priority(), self.seq).cmp(&(
            other.at,
            other.kind.priority(),
            other.seq,
        ))
    }
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Task queue ordered by absolute wake time.
#[derive(Debug, Default)]
pub struct TaskQueue {
    heap: BinaryHeap<Reverse<ScheduledTask>>,
    next_seq: u64,
}

impl TaskQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `kind` at the absolute instant `at`.
    pub fn enter_abs(&mut self, at: Instant, kind: TaskKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(ScheduledTask { at, kind, seq }));
    }

    /// Remove and return the earliest task.
    pub fn pop(&mut self) -> Option<ScheduledTask> {
        self.heap.pop().map(|Reverse(task)| task)
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether no tasks are pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
