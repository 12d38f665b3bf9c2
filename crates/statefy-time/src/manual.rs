//! Deterministic virtual-time scheduler
//!
//! `ManualScheduler` queues work instead of running it. Tests decide when
//! queued work runs (`run_pending`) and when virtual time moves (`advance`).
//! Delayed tasks fire in due-time order, with the shared `ManualClock`
//! stepped to each task's due time before it runs, so elapsed-time checks
//! inside a task observe exactly the delay it was armed with.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use statefy_core::Timestamp;

use crate::{run_isolated, Clock, ManualClock, Scheduler, Task};

/// Delayed task waiting in the timer heap
struct Timer {
    due: Timestamp,
    /// Submission order, breaks ties between equal due times
    seq: u64,
    task: Task,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    // Reversed so the max-heap pops the earliest timer first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct Queue {
    ready: VecDeque<Task>,
    timers: BinaryHeap<Timer>,
    seq: u64,
}

/// Scheduler driven explicitly by the test
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    queue: Mutex<Queue>,
}

impl ManualScheduler {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        ManualScheduler {
            clock,
            queue: Mutex::new(Queue::default()),
        }
    }

    /// The clock this scheduler advances
    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    /// Number of tasks still queued (ready or delayed)
    pub fn pending(&self) -> usize {
        let queue = self.queue.lock();
        queue.ready.len() + queue.timers.len()
    }

    /// Number of delayed tasks not yet due
    pub fn pending_timers(&self) -> usize {
        self.queue.lock().timers.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Run every ready task and every timer already due, including work
    /// those tasks submit while running. Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.next_due() {
            run_isolated(task);
            ran += 1;
        }
        ran
    }

    /// Move virtual time forward by `dt`, firing timers in due order
    /// Returns the number of tasks run.
    pub fn advance(&self, dt: Duration) -> usize {
        let target = self.clock.now() + dt;
        let mut ran = self.run_pending();

        loop {
            let next_due = {
                let queue = self.queue.lock();
                queue.timers.peek().map(|t| t.due)
            };
            match next_due {
                Some(due) if due <= target => {
                    self.clock.sync_to(due);
                    ran += self.run_pending();
                }
                _ => break,
            }
        }

        self.clock.sync_to(target);
        ran + self.run_pending()
    }

    fn next_due(&self) -> Option<Task> {
        let mut queue = self.queue.lock();
        if let Some(task) = queue.ready.pop_front() {
            return Some(task);
        }
        let now = self.clock.now();
        match queue.timers.peek() {
            Some(timer) if timer.due <= now => queue.timers.pop().map(|t| t.task),
            _ => None,
        }
    }
}

impl Scheduler for ManualScheduler {
    fn spawn(&self, task: Task) {
        self.queue.lock().ready.push_back(task);
    }

    fn delay(&self, delay: Duration, task: Task) {
        let due = self.clock.now() + delay;
        let mut queue = self.queue.lock();
        queue.seq += 1;
        let seq = queue.seq;
        queue.timers.push(Timer { due, seq, task });
    }
}
