// src/page/timers.rs

//! Virtual-time callback queue. Every wait in the engine is a task scheduled
//! here; nothing sleeps.
//!
//! A page session is synchronous and owns its clock, so `tokio::time::pause`
//! / `advance` are not used: they need a runtime, apply to the whole runtime
//! rather than one page, and give no handle to cancel a single slot's task.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
pub struct TimerQueue<T> {
    now_ms: u64,
    next_id: u64,
    due: BinaryHeap<Reverse<(u64, u64)>>,
    tasks: HashMap<u64, T>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_id: 0,
            due: BinaryHeap::new(),
            tasks: HashMap::new(),
        }
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Tasks scheduled for the same instant fire in scheduling order.
    pub fn schedule(&mut self, delay_ms: u64, task: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.due.push(Reverse((self.now_ms + delay_ms, id)));
        self.tasks.insert(id, task);
        TimerId(id)
    }

    /// Returns false when the timer already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.tasks.remove(&id.0).is_some()
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Pops the next live task due at or before `until`, moving the clock to its due time.
    pub fn pop_due(&mut self, until: u64) -> Option<(TimerId, T)> {
        while let Some(Reverse((due, id))) = self.due.peek().copied() {
            if due > until {
                return None;
            }
            self.due.pop();
            if let Some(task) = self.tasks.remove(&id) {
                self.now_ms = self.now_ms.max(due);
                return Some((TimerId(id), task));
            }
        }
        None
    }

    pub fn advance_to(&mut self, until: u64) {
        self.now_ms = self.now_ms.max(until);
    }
}
