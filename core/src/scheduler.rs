//! Deferred work, run on the next host tick.
//!
//! Bulk re-population is never run inline with the request that asked
//! for it. Requests are queued and drained by [`TickScheduler::advance`];
//! a second request for a pass that is already queued is dropped.

use crate::types::Tick;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum DeferredTask {
    /// Clear and refill every live container.
    RepopulateAll { log_summary: bool },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickScheduler {
    pub current_tick: Tick,
    pending: VecDeque<DeferredTask>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task. Returns false if an equivalent task is already
    /// pending.
    pub fn schedule(&mut self, task: DeferredTask) -> bool {
        let duplicate = self.pending.iter().any(|queued| match (queued, &task) {
            (DeferredTask::RepopulateAll { .. }, DeferredTask::RepopulateAll { .. }) => true,
        });
        if duplicate {
            return false;
        }
        self.pending.push_back(task);
        true
    }

    /// Advance one tick and hand back everything that was due.
    pub fn advance(&mut self) -> (Tick, Vec<DeferredTask>) {
        self.current_tick += 1;
        (self.current_tick, self.pending.drain(..).collect())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
