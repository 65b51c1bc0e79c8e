use std::collections::BTreeMap;
use std::mem;
use std::path::Path;
use std::rc::Rc;

use tracing::{debug, info};

use crate::agents::{AgentModel, AgentSolver};
use crate::config::Config;
use crate::error::{KitchenError, Result};
use crate::infra::{Action, AgentId, JointAction};
use crate::planners::PlannerContext;
use crate::recipes::Cookbook;
use crate::state::{LoadedLevel, State, load_level};

/// Driver-facing facade over one episode: owns the live state, one solver
/// per agent and the actions reported for the tick in progress.
pub struct Kitchen {
    ctx: Rc<PlannerContext>,
    state: State,
    solvers: BTreeMap<AgentId, Box<dyn AgentSolver>>,
    pending: JointAction,
}

impl Kitchen {
    pub fn load_level(path: impl AsRef<Path>, agent_count: usize, config: Config) -> Result<Self> {
        let LoadedLevel { state, cookbook } = load_level(path, agent_count)?;
        Ok(Self::from_state(state, cookbook, config))
    }

    pub fn from_state(state: State, cookbook: Rc<Cookbook>, config: Config) -> Self {
        let ctx = PlannerContext::new(cookbook, config, state.agent_count());
        Self {
            ctx: Rc::new(ctx),
            state,
            solvers: BTreeMap::new(),
            pending: JointAction::new(),
        }
    }

    pub fn context(&self) -> &PlannerContext {
        &self.ctx
    }

    pub fn current_state(&self) -> &State {
        &self.state
    }

    pub fn initialize_agent(&mut self, id: AgentId, model: AgentModel) -> Result<()> {
        if self.state.agent_position(id).is_none() {
            return Err(KitchenError::UnknownAgent(id));
        }
        if self.solvers.contains_key(&id) {
            return Err(KitchenError::AgentAlreadyRegistered(id));
        }

        debug!(agent = %id, %model, "Initializing agent");
        let solver = model.build(id, Rc::clone(&self.ctx), &self.state);
        self.solvers.insert(id, solver);
        Ok(())
    }

    pub fn goal_state(&self) -> bool {
        self.state.is_goal_state()
    }

    /// The unit direction the agent wants to move in next.
    pub fn get_next_action(&mut self, id: AgentId) -> Result<(i32, i32)> {
        let solver = self
            .solvers
            .get_mut(&id)
            .ok_or(KitchenError::UnknownAgent(id))?;
        let direction = solver.next_action().direction();
        Ok((direction.x, direction.y))
    }

    /// Records the agent's move for the current tick. Once every agent has
    /// reported, the joint action is committed and fed to all solvers.
    pub fn update(&mut self, id: AgentId, dx: i32, dy: i32) -> Result<()> {
        let action = Action::from_direction(dx, dy).ok_or(KitchenError::InvalidDirection { dx, dy })?;
        if self.state.agent_position(id).is_none() {
            return Err(KitchenError::UnknownAgent(id));
        }

        self.pending.insert(id, action);
        if self.pending.len() < self.state.agent_count() {
            return Ok(());
        }

        let joint = mem::take(&mut self.pending);
        self.commit(&joint)
    }

    fn commit(&mut self, joint: &JointAction) -> Result<()> {
        let timestep = self.state.timestep();
        let next = self
            .state
            .try_perform(self.ctx.cookbook(), joint, true)
            .ok_or(KitchenError::IllegalJointAction { timestep })?;

        for solver in self.solvers.values() {
            solver.validate(joint)?;
        }
        for solver in self.solvers.values_mut() {
            solver.observe(joint)?;
        }
        self.state = next;

        for goal in self.state.goals() {
            if !self.state.recipe_is_possible(self.ctx.cookbook(), goal) {
                return Err(KitchenError::Unsolvable {
                    recipe: goal.name().to_string(),
                });
            }
        }

        if self.state.is_goal_state() {
            info!(timestep = self.state.timestep(), "All goals delivered");
        }
        Ok(())
    }
}
