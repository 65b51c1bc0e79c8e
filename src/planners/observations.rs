use crate::infra::{Action, AgentId};

/// Append-only log of one agent's committed actions. Entry `i` is the
/// action that took the kitchen from timestep `i` to `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentObservations {
    agent: AgentId,
    actions: Vec<Action>,
}

impl AgentObservations {
    pub fn new(agent: AgentId) -> Self {
        Self {
            agent,
            actions: Vec::new(),
        }
    }

    pub fn with_actions(agent: AgentId, actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            agent,
            actions: actions.into_iter().collect(),
        }
    }

    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// The action observed on the tick that ended at `timestep`.
    pub fn action_ending_at(&self, timestep: usize) -> Option<Action> {
        timestep
            .checked_sub(1)
            .and_then(|i| self.actions.get(i))
            .copied()
    }

    pub fn get(&self, index: usize) -> Option<Action> {
        self.actions.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}
