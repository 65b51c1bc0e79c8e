use std::io::{self, Write};

use tracing::{info, warn};

use crate::agents::AgentModel;
use crate::infra::{EpisodeObserver, JointAction};
use crate::runner::EpisodeOutcome;
use crate::state::State;

pub struct DefaultObserver {
    draw_map: bool,
}

impl DefaultObserver {
    pub fn new(draw_map: bool) -> Self {
        Self { draw_map }
    }
}

impl Default for DefaultObserver {
    fn default() -> Self {
        Self::new(true)
    }
}

impl EpisodeObserver for DefaultObserver {
    fn on_episode_start(&mut self, level: &str, models: &[AgentModel], seed: u64) {
        info!("Episode on {} started", level);
        info!("- seed: {}", seed);
        let names: Vec<String> = models.iter().map(|m| m.to_string()).collect();
        info!("- agents: {}", names.join(","));
    }

    fn on_tick(&mut self, state: &State, joint: &JointAction) {
        let actions: Vec<String> = joint
            .iter()
            .map(|(agent, action)| format!("{}:{:?}", agent, action))
            .collect();
        info!("tick: {}, actions: [{}]", state.timestep(), actions.join(", "));

        if self.draw_map {
            let _ = writeln!(io::stdout(), "{}", state);
        }
    }

    fn on_episode_finished(&mut self, outcome: &EpisodeOutcome) {
        if let Some(error) = &outcome.error {
            warn!("Episode aborted: {}", error);
        }
        info!(
            "Episode finished, solved: {}, actions: {}, runtime: {} ms",
            outcome.solved, outcome.actions, outcome.runtime_ms
        );
    }
}
