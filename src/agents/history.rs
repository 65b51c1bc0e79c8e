use std::collections::VecDeque;

use crate::planners::PossibleSubgoal;

/// Bounded FIFO of recent subgoal commitments of one agent. Its mode is
/// taken as the agent's current intention.
#[derive(Debug, Clone)]
pub struct SubgoalHistory {
    capacity: usize,
    entries: VecDeque<PossibleSubgoal>,
}

impl SubgoalHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, subgoal: PossibleSubgoal) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_back(subgoal);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Drops commitments that are no longer directly achievable.
    pub fn retain_in(&mut self, viable: &[PossibleSubgoal]) {
        self.entries.retain(|entry| viable.contains(entry));
    }

    pub fn count(&self, subgoal: &PossibleSubgoal) -> usize {
        self.entries.iter().filter(|entry| *entry == subgoal).count()
    }

    /// Every value sharing the highest count, in order of first appearance.
    pub fn mode_candidates(&self) -> Vec<PossibleSubgoal> {
        let mut counted: Vec<(&PossibleSubgoal, usize)> = Vec::new();
        for entry in &self.entries {
            match counted.iter_mut().find(|(value, _)| *value == entry) {
                Some((_, count)) => *count += 1,
                None => counted.push((entry, 1)),
            }
        }

        let max = counted.iter().map(|(_, count)| *count).max().unwrap_or(0);
        counted
            .into_iter()
            .filter(|(_, count)| *count == max)
            .map(|(value, _)| value.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
