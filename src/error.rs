use crate::infra::AgentId;

#[derive(Debug, thiserror::Error)]
pub enum KitchenError {
    #[error("unknown recipe '{0}'")]
    UnknownRecipe(String),

    #[error("unknown agent model '{0}'")]
    UnknownAgentModel(String),

    #[error("level line {line}: {message}")]
    Level { line: usize, message: String },

    #[error("failed to read level: {0}")]
    Io(#[from] std::io::Error),

    #[error("agent {0} is not part of this level")]
    UnknownAgent(AgentId),

    #[error("agent {0} is already initialized")]
    AgentAlreadyRegistered(AgentId),

    #[error("({dx}, {dy}) is not a move direction")]
    InvalidDirection { dx: i32, dy: i32 },

    #[error("joint action at timestep {timestep} could not be applied")]
    IllegalJointAction { timestep: usize },

    #[error("the level is not solvable from the current state: {recipe} can no longer be made")]
    Unsolvable { recipe: String },
}

pub type Result<T> = std::result::Result<T, KitchenError>;
