use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::infra::{Action, AgentId, JointAction};
use crate::state::State;

/// A state reached during search. Identity is the resulting state only, so
/// the explored set collapses equivalent configurations.
#[derive(Debug, Clone)]
pub struct SearchNode {
    parent: Option<Rc<SearchNode>>,
    state: State,
    joint: JointAction,
}

impl SearchNode {
    pub fn root(state: State) -> Self {
        Self {
            parent: None,
            state,
            joint: JointAction::new(),
        }
    }

    pub fn child(parent: Rc<SearchNode>, state: State, joint: JointAction) -> Self {
        Self {
            parent: Some(parent),
            state,
            joint,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// The steps from the root to this node, root excluded.
    pub fn extract_plan(&self) -> Plan {
        let mut steps = Vec::new();
        let mut current = Some(self);
        while let Some(node) = current {
            if node.parent.is_some() {
                steps.push(PlanStep {
                    state: node.state.clone(),
                    joint: node.joint.clone(),
                });
            }
            current = node.parent.as_deref();
        }
        steps.reverse();
        Plan {
            steps,
            final_state: self.state.clone(),
        }
    }
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
    }
}

impl Eq for SearchNode {}

impl Hash for SearchNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.state.hash(state);
    }
}

#[derive(Debug, Clone)]
pub struct PlanStep {
    pub state: State,
    pub joint: JointAction,
}

/// Joint actions leading from a start state to `final_state`.
#[derive(Debug, Clone)]
pub struct Plan {
    steps: Vec<PlanStep>,
    final_state: State,
}

impl Plan {
    pub fn empty(state: State) -> Self {
        Self {
            steps: Vec::new(),
            final_state: state,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn final_state(&self) -> &State {
        &self.final_state
    }

    pub fn push(&mut self, state: State, joint: JointAction) {
        self.final_state = state.clone();
        self.steps.push(PlanStep { state, joint });
    }

    pub fn extend(&mut self, other: Plan) {
        self.steps.extend(other.steps);
        self.final_state = other.final_state;
    }

    /// What `agent` does on the tick that ends at `timestep`.
    pub fn action_at(&self, timestep: usize, agent: AgentId) -> Option<Action> {
        self.steps
            .iter()
            .find(|step| step.state.timestep() == timestep)
            .and_then(|step| step.joint.get(&agent).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::Cookbook;
    use crate::test_support::{OPEN_DIVIDER, StateBuilder};

    #[test]
    fn test_extract_plan_skips_root() {
        let cookbook = Cookbook::compile();
        let root_state = StateBuilder::on_map(OPEN_DIVIDER).with_agent(0, (1, 1)).build();
        let joint: JointAction = [(AgentId(0), Action::MoveRight)].into_iter().collect();

        let next = root_state.try_perform(&cookbook, &joint, false).unwrap();
        let root = Rc::new(SearchNode::root(root_state.clone()));
        let child = SearchNode::child(root.clone(), next.clone(), joint);

        let plan = child.extract_plan();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.action_at(1, AgentId(0)), Some(Action::MoveRight));
        assert_eq!(plan.action_at(2, AgentId(0)), None);
        assert_eq!(plan.final_state(), &next);
        assert!(root.extract_plan().is_empty());
    }

    #[test]
    fn test_node_identity_is_state() {
        let state = StateBuilder::on_map(OPEN_DIVIDER).with_agent(0, (1, 1)).build();
        let a = SearchNode::root(state.clone());
        let joint: JointAction = [(AgentId(0), Action::NoOp)].into_iter().collect();
        let b = SearchNode::child(Rc::new(a.clone()), state.child(), joint);
        assert_eq!(a, b, "same physical state, different action and depth");
    }
}
