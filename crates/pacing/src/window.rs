use std::collections::VecDeque;

use anilike_core_types::OutcomeKind;

/// Bounded ring of recent outcome kinds, newest at the back.
///
/// Oldest entries fall off once capacity is reached, so strategy memory
/// stays finite however long the run.
#[derive(Clone, Debug)]
pub struct OutcomeWindow {
    capacity: usize,
    items: VecDeque<OutcomeKind>,
}

impl OutcomeWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, kind: OutcomeKind) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(kind);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consecutive successes counted back from the newest entry.
    pub fn tail_successes(&self) -> usize {
        self.items
            .iter()
            .rev()
            .take_while(|kind| **kind == OutcomeKind::Success)
            .count()
    }

    pub fn snapshot(&self) -> Vec<OutcomeKind> {
        self.items.iter().copied().collect()
    }
}
