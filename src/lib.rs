pub mod agents;
pub mod config;
pub mod error;
pub mod infra;
pub mod kitchen;
pub mod planners;
pub mod recipes;
pub mod runner;
pub mod state;

#[cfg(test)]
mod test_support;

// Re-export commonly used types for convenience
pub use agents::{AgentModel, AgentSolver};
pub use config::Config;
pub use error::{KitchenError, Result};
pub use infra::{Action, AgentId, JointAction, Position};
pub use kitchen::Kitchen;
pub use recipes::Cookbook;
pub use state::State;
