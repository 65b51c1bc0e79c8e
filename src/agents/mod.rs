mod history;
mod prap;
mod still;

pub use history::SubgoalHistory;
pub use prap::Prap;
pub use still::Still;

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use tracing::trace;

use crate::error::{KitchenError, Result};
use crate::infra::{Action, AgentId, JointAction};
use crate::planners::{AgentObservations, PlannerContext};
use crate::state::State;

/// A decision maker controlling exactly one agent.
pub trait AgentSolver {
    fn id(&self) -> AgentId;

    /// The action this agent commits to for the next tick.
    fn next_action(&mut self) -> Action;

    /// Fails if `joint` cannot be applied to this solver's view of the
    /// kitchen. Leaves the solver untouched either way.
    fn validate(&self, joint: &JointAction) -> Result<()>;

    /// Feeds the joint action every agent actually performed.
    fn observe(&mut self, joint: &JointAction) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentModel {
    Prap,
    Still,
}

impl AgentModel {
    pub fn build(
        self,
        id: AgentId,
        ctx: Rc<PlannerContext>,
        initial_state: &State,
    ) -> Box<dyn AgentSolver> {
        let core = SolverCore::new(id, ctx, initial_state.clone());
        match self {
            AgentModel::Prap => Box::new(Prap::new(core)),
            AgentModel::Still => Box::new(Still::new(core)),
        }
    }
}

impl FromStr for AgentModel {
    type Err = KitchenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prap" => Ok(AgentModel::Prap),
            "still" => Ok(AgentModel::Still),
            _ => Err(KitchenError::UnknownAgentModel(s.to_string())),
        }
    }
}

impl fmt::Display for AgentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentModel::Prap => write!(f, "prap"),
            AgentModel::Still => write!(f, "still"),
        }
    }
}

/// Bookkeeping shared by every solver: the episode's starting state, the
/// state after all observed ticks, and one action log per agent.
#[derive(Debug)]
pub struct SolverCore {
    id: AgentId,
    ctx: Rc<PlannerContext>,
    initial_state: State,
    current_state: State,
    logs: Vec<AgentObservations>,
}

impl SolverCore {
    pub fn new(id: AgentId, ctx: Rc<PlannerContext>, initial_state: State) -> Self {
        let logs = initial_state.agent_ids().map(AgentObservations::new).collect();
        Self {
            id,
            ctx,
            current_state: initial_state.clone(),
            initial_state,
            logs,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn ctx(&self) -> &PlannerContext {
        &self.ctx
    }

    pub fn initial_state(&self) -> &State {
        &self.initial_state
    }

    pub fn current_state(&self) -> &State {
        &self.current_state
    }

    pub fn logs(&self) -> &[AgentObservations] {
        &self.logs
    }

    /// Every agent in the level except this one, in id order.
    pub fn others(&self) -> Vec<AgentId> {
        self.initial_state
            .agent_ids()
            .filter(|agent| *agent != self.id)
            .collect()
    }

    /// The state after `joint`, without recording it.
    pub fn advance(&self, joint: &JointAction) -> Result<State> {
        let timestep = self.current_state.timestep();
        self.current_state
            .try_perform(self.ctx.cookbook(), joint, true)
            .ok_or(KitchenError::IllegalJointAction { timestep })
    }

    pub fn observe(&mut self, joint: &JointAction) -> Result<()> {
        let next = self.advance(joint)?;
        for log in &mut self.logs {
            let action = joint.get(&log.agent()).copied().unwrap_or(Action::NoOp);
            log.push(action);
        }
        self.current_state = next;
        Ok(())
    }

    /// Whether `agent` could perform `action` if everyone else stood still.
    pub fn is_legal_alone(&self, agent: AgentId, action: Action) -> bool {
        let joint = JointAction::from([(agent, action)]);
        self.current_state
            .try_perform(self.ctx.cookbook(), &joint, false)
            .is_some()
    }

    pub fn random_legal_action(&self) -> Action {
        self.random_legal_action_for(self.id)
    }

    pub fn random_legal_action_for(&self, agent: AgentId) -> Action {
        let action = self.ctx.random_action();
        if self.is_legal_alone(agent, action) {
            action
        } else {
            trace!(agent = %agent, ?action, "Random action not legal, standing still");
            Action::NoOp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::recipes::Cookbook;
    use crate::test_support::{FULL_DIVIDER, StateBuilder};

    fn core() -> SolverCore {
        let state = StateBuilder::on_map(FULL_DIVIDER)
            .with_agent(0, (2, 2))
            .with_agent(1, (4, 2))
            .with_goal("SimpleTomato")
            .build();
        let ctx = PlannerContext::new(Rc::new(Cookbook::compile()), Config::default(), 2);
        SolverCore::new(AgentId(0), Rc::new(ctx), state)
    }

    #[test]
    fn test_parse_agent_model() {
        assert_eq!("prap".parse::<AgentModel>().unwrap(), AgentModel::Prap);
        assert_eq!(" Still ".parse::<AgentModel>().unwrap(), AgentModel::Still);
        assert!(matches!(
            "greedy".parse::<AgentModel>(),
            Err(KitchenError::UnknownAgentModel(_))
        ));
        assert_eq!(AgentModel::Prap.to_string(), "prap");
    }

    #[test]
    fn test_observe_logs_every_agent() {
        let mut core = core();
        let joint = JointAction::from([(AgentId(0), Action::MoveDown)]);
        core.observe(&joint).unwrap();

        assert_eq!(core.current_state().timestep(), 1);
        assert_eq!(core.logs()[0].actions(), &[Action::MoveDown]);
        assert_eq!(core.logs()[1].actions(), &[Action::NoOp]);
        assert_eq!(core.others(), vec![AgentId(1)]);
    }

    #[test]
    fn test_observe_rejects_collisions() {
        let mut core = core();
        let joint = JointAction::from([
            (AgentId(0), Action::MoveRight),
            (AgentId(1), Action::MoveLeft),
        ]);
        assert!(matches!(
            core.observe(&joint),
            Err(KitchenError::IllegalJointAction { timestep: 0 })
        ));
        assert!(core.logs()[0].is_empty());
        assert!(core.advance(&joint).is_err());
        assert_eq!(core.current_state().timestep(), 0);
    }

    #[test]
    fn test_random_legal_action_is_legal() {
        let core = core();
        for _ in 0..20 {
            let action = core.random_legal_action();
            assert!(core.is_legal_alone(AgentId(0), action));
        }
    }
}
