use crate::agents::AgentModel;
use crate::infra::{EpisodeObserver, JointAction};
use crate::runner::EpisodeOutcome;
use crate::state::State;

pub struct CompositeObserver {
    observers: Vec<Box<dyn EpisodeObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Box<dyn EpisodeObserver>>) -> Self {
        Self { observers }
    }
}

impl EpisodeObserver for CompositeObserver {
    fn on_episode_start(&mut self, level: &str, models: &[AgentModel], seed: u64) {
        for observer in &mut self.observers {
            observer.on_episode_start(level, models, seed);
        }
    }

    fn on_tick(&mut self, state: &State, joint: &JointAction) {
        for observer in &mut self.observers {
            observer.on_tick(state, joint);
        }
    }

    fn on_episode_finished(&mut self, outcome: &EpisodeOutcome) {
        for observer in &mut self.observers {
            observer.on_episode_finished(outcome);
        }
    }
}
