use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use tracing::warn;

use crate::agents::AgentModel;
use crate::infra::{EpisodeObserver, JointAction};
use crate::runner::EpisodeOutcome;
use crate::state::State;

/// Appends one outcome record per finished episode to a results file.
pub struct RecordObserver {
    file: File,
}

impl RecordObserver {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl EpisodeObserver for RecordObserver {
    fn on_episode_start(&mut self, _level: &str, _models: &[AgentModel], _seed: u64) {}

    fn on_tick(&mut self, _state: &State, _joint: &JointAction) {}

    fn on_episode_finished(&mut self, outcome: &EpisodeOutcome) {
        if let Err(e) = writeln!(self.file, "{}", outcome.to_record()) {
            warn!("Failed to write outcome record: {}", e);
        }
    }
}
