use crate::agents::{AgentSolver, SolverCore};
use crate::error::Result;
use crate::infra::{Action, AgentId, JointAction};

/// Passive teammate that never moves.
#[derive(Debug)]
pub struct Still {
    core: SolverCore,
}

impl Still {
    pub fn new(core: SolverCore) -> Self {
        Self { core }
    }
}

impl AgentSolver for Still {
    fn id(&self) -> AgentId {
        self.core.id()
    }

    fn next_action(&mut self) -> Action {
        Action::NoOp
    }

    fn validate(&self, joint: &JointAction) -> Result<()> {
        self.core.advance(joint).map(|_| ())
    }

    fn observe(&mut self, joint: &JointAction) -> Result<()> {
        self.core.observe(joint)
    }
}
