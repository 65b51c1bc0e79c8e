use crate::agents::AgentModel;
use crate::infra::JointAction;
use crate::runner::EpisodeOutcome;
use crate::state::State;

/// Trait for observing episode events during a run
pub trait EpisodeObserver {
    /// Called once the level is loaded and every agent is initialized
    fn on_episode_start(&mut self, level: &str, models: &[AgentModel], seed: u64);

    /// Called after each committed joint action with the resulting state
    fn on_tick(&mut self, state: &State, joint: &JointAction);

    /// Called when the episode is solved, aborted or out of ticks
    fn on_episode_finished(&mut self, outcome: &EpisodeOutcome);
}
