use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use time::{OffsetDateTime, format_description};
use tracing::{info, warn};

use crate::agents::AgentModel;
use crate::config::Config;
use crate::error::Result;
use crate::infra::{Action, AgentId, EpisodeObserver, JointAction};
use crate::kitchen::Kitchen;
use crate::state::State;

/// Slots reserved for agent models in an outcome record.
const RECORD_MODEL_SLOTS: usize = 4;

/// Everything worth keeping about one finished episode.
#[derive(Debug, Clone)]
pub struct EpisodeOutcome {
    pub level: String,
    pub models: Vec<AgentModel>,
    pub seed: u64,
    pub history_size: usize,
    pub use_property_count_heuristic: bool,
    pub actions: usize,
    pub runtime_ms: u128,
    pub solved: bool,
    pub error: Option<String>,
    pub started_at: OffsetDateTime,
}

impl EpisodeOutcome {
    /// One `;`-separated line: level, agent count, four model slots padded
    /// with `none`, seed, actions, runtime, solved, history size, property
    /// heuristic flag, error text (`None` when clean) and start time.
    pub fn to_record(&self) -> String {
        let mut models: Vec<String> = self.models.iter().map(|m| m.to_string()).collect();
        models.resize(RECORD_MODEL_SLOTS.max(models.len()), "none".to_string());

        let started =
            format_description::parse_borrowed::<2>("[year][month][day]-[hour][minute][second]")
                .ok()
                .and_then(|format| self.started_at.format(&format).ok())
                .unwrap_or_default();
        let error = self
            .error
            .as_deref()
            .map(|e| e.replace(';', ","))
            .unwrap_or_else(|| "None".to_string());

        format!(
            "{};{};{};{};{};{};{};{};{};{};{}",
            self.level,
            self.models.len(),
            models.join(";"),
            self.seed,
            self.actions,
            self.runtime_ms,
            self.solved,
            self.history_size,
            self.use_property_count_heuristic,
            error,
            started
        )
    }
}

fn level_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Sets agents to `NoOp` until the joint action no longer collides.
fn resolve_collisions(state: &State, joint: &mut JointAction) {
    while state.has_collisions(joint) {
        let mut blocked = state.colliding_agents(joint);
        for (agent, action) in joint.iter() {
            let Some(from) = state.agent_position(*agent) else {
                continue;
            };
            let to = from + action.direction();
            if !action.is_noop() && state.agents().values().any(|pos| *pos == to) {
                blocked.insert(*agent);
            }
        }
        if blocked.is_empty() {
            break;
        }
        for agent in blocked {
            warn!("Agent {} was causing a collision and has been adjusted to NoOp", agent);
            joint.insert(agent, Action::NoOp);
        }
    }
}

fn drive(
    level: &Path,
    models: &[AgentModel],
    config: &Config,
    observer: &mut dyn EpisodeObserver,
    actions: &mut usize,
) -> Result<bool> {
    let mut kitchen = Kitchen::load_level(level, models.len(), config.clone())?;
    for (i, model) in models.iter().enumerate() {
        kitchen.initialize_agent(AgentId(i), *model)?;
    }

    while *actions < config.max_ticks {
        if kitchen.goal_state() {
            break;
        }

        let mut joint = JointAction::new();
        for i in 0..models.len() {
            let id = AgentId(i);
            let (dx, dy) = kitchen.get_next_action(id)?;
            let action = Action::from_direction(dx, dy).unwrap_or(Action::NoOp);
            joint.insert(id, action);
        }
        resolve_collisions(kitchen.current_state(), &mut joint);

        for (id, action) in &joint {
            let direction = action.direction();
            kitchen.update(*id, direction.x, direction.y)?;
        }
        *actions += 1;
        observer.on_tick(kitchen.current_state(), &joint);
    }

    Ok(kitchen.goal_state())
}

/// Plays one episode of `level` with one agent per model, up to
/// `config.max_ticks` ticks.
#[tracing::instrument(level = "debug", skip(observer, config), fields(seed = config.seed))]
pub fn run_episode(
    level: &Path,
    models: &[AgentModel],
    config: &Config,
    observer: &mut dyn EpisodeObserver,
) -> EpisodeOutcome {
    let name = level_name(level);
    let started_at = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    observer.on_episode_start(&name, models, config.seed);

    let start = Instant::now();
    let mut actions = 0;
    let result = drive(level, models, config, observer, &mut actions);
    let runtime_ms = start.elapsed().as_millis();

    let (solved, error) = match result {
        Ok(solved) => (solved, None),
        Err(e) => (false, Some(e.to_string())),
    };
    let outcome = EpisodeOutcome {
        level: name,
        models: models.to_vec(),
        seed: config.seed,
        history_size: config.history_size,
        use_property_count_heuristic: config.use_property_count_heuristic,
        actions,
        runtime_ms,
        solved,
        error,
        started_at,
    };
    observer.on_episode_finished(&outcome);
    outcome
}

/// Aggregate of several episodes on one level.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSummary {
    pub level: String,
    pub iterations: usize,
    pub solved: usize,
    pub min_timesteps: Option<usize>,
    pub max_timesteps: Option<usize>,
    pub average_timesteps: f64,
    pub average_runtime_ms: f64,
}

impl BenchmarkSummary {
    fn from_outcomes(level: String, outcomes: &[EpisodeOutcome]) -> Self {
        let solved: Vec<&EpisodeOutcome> = outcomes.iter().filter(|o| o.solved).collect();
        let average = |values: Vec<f64>| {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        };

        Self {
            level,
            iterations: outcomes.len(),
            solved: solved.len(),
            min_timesteps: solved.iter().map(|o| o.actions).min(),
            max_timesteps: solved.iter().map(|o| o.actions).max(),
            average_timesteps: average(solved.iter().map(|o| o.actions as f64).collect()),
            average_runtime_ms: average(solved.iter().map(|o| o.runtime_ms as f64).collect()),
        }
    }

    pub fn completion_rate(&self) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            self.solved as f64 / self.iterations as f64
        }
    }
}

impl fmt::Display for BenchmarkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}; {:.1}%; {:.3}; {}; {}; {:.3}",
            self.level,
            self.completion_rate() * 100.0,
            self.average_timesteps,
            self.min_timesteps.map_or("-".to_string(), |t| t.to_string()),
            self.max_timesteps.map_or("-".to_string(), |t| t.to_string()),
            self.average_runtime_ms
        )
    }
}

/// Runs `iterations` episodes per level. The first episode of each level
/// uses `config.seed`; later seeds are drawn from a generator seeded with it.
pub fn run_benchmark(
    levels: &[PathBuf],
    models: &[AgentModel],
    iterations: usize,
    config: &Config,
    observer: &mut dyn EpisodeObserver,
) -> Vec<BenchmarkSummary> {
    info!(
        "Running benchmarks. Config: {} iterations, {} agents, {} levels",
        iterations,
        models.len(),
        levels.len()
    );

    let mut summaries = Vec::new();
    for level in levels {
        let mut seeds = StdRng::seed_from_u64(config.seed);
        let mut seed = config.seed;
        let mut outcomes = Vec::with_capacity(iterations);

        for _ in 0..iterations {
            let episode_config = config.clone().with_seed(seed);
            outcomes.push(run_episode(level, models, &episode_config, observer));
            seed = seeds.random();
        }

        let summary = BenchmarkSummary::from_outcomes(level_name(level), &outcomes);
        info!("{}", summary);
        summaries.push(summary);
    }

    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::Position;
    use crate::test_support::{OPEN_DIVIDER, StateBuilder};

    struct CountingObserver {
        started: usize,
        ticks: usize,
        finished: Vec<EpisodeOutcome>,
    }

    impl EpisodeObserver for CountingObserver {
        fn on_episode_start(&mut self, _level: &str, _models: &[AgentModel], _seed: u64) {
            self.started += 1;
        }

        fn on_tick(&mut self, _state: &State, _joint: &JointAction) {
            self.ticks += 1;
        }

        fn on_episode_finished(&mut self, outcome: &EpisodeOutcome) {
            self.finished.push(outcome.clone());
        }
    }

    fn counting() -> CountingObserver {
        CountingObserver {
            started: 0,
            ticks: 0,
            finished: Vec::new(),
        }
    }

    fn outcome(solved: bool, actions: usize) -> EpisodeOutcome {
        EpisodeOutcome {
            level: "full-divider_tomato".to_string(),
            models: vec![AgentModel::Prap, AgentModel::Still],
            seed: 3,
            history_size: 6,
            use_property_count_heuristic: false,
            actions,
            runtime_ms: 40,
            solved,
            error: None,
            started_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_record_pads_model_slots() {
        let record = outcome(true, 12).to_record();
        assert_eq!(
            record,
            "full-divider_tomato;2;prap;still;none;none;3;12;40;true;6;false;None;19700101-000000"
        );
    }

    #[test]
    fn test_record_escapes_separator_in_errors() {
        let mut failed = outcome(false, 5);
        failed.error = Some("bad; worse".to_string());
        let record = failed.to_record();
        assert_eq!(record.split(';').count(), 14);
        assert!(record.contains("bad, worse"));
    }

    #[test]
    fn test_summary_only_counts_solved_episodes() {
        let outcomes = vec![outcome(true, 10), outcome(false, 100), outcome(true, 14)];
        let summary = BenchmarkSummary::from_outcomes("level".to_string(), &outcomes);

        assert_eq!(summary.solved, 2);
        assert_eq!(summary.min_timesteps, Some(10));
        assert_eq!(summary.max_timesteps, Some(14));
        assert!((summary.average_timesteps - 12.0).abs() < f64::EPSILON);
        assert!((summary.completion_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_collisions_are_turned_into_noops() {
        let state = StateBuilder::on_map(OPEN_DIVIDER)
            .with_agent(0, (2, 2))
            .with_agent(1, (4, 2))
            .with_agent(2, (2, 4))
            .build();
        let mut joint = JointAction::from([
            (AgentId(0), Action::MoveRight),
            (AgentId(1), Action::MoveLeft),
            (AgentId(2), Action::MoveUp),
        ]);
        resolve_collisions(&state, &mut joint);

        assert_eq!(joint[&AgentId(0)], Action::NoOp);
        assert_eq!(joint[&AgentId(1)], Action::NoOp);
        assert_eq!(joint[&AgentId(2)], Action::MoveUp);
        assert!(!state.has_collisions(&joint));
        assert_eq!(state.agent_position(AgentId(2)), Some(Position::new(2, 4)));
    }

    #[test]
    fn test_missing_level_is_reported_in_outcome() {
        let mut observer = counting();
        let outcome = run_episode(
            Path::new("/nonexistent/level.txt"),
            &[AgentModel::Still],
            &Config::default(),
            &mut observer,
        );

        assert!(!outcome.solved);
        assert!(outcome.error.is_some());
        assert_eq!(outcome.level, "level");
        assert_eq!(observer.started, 1);
        assert_eq!(observer.finished.len(), 1);
        assert_eq!(observer.ticks, 0);
    }

    #[test]
    fn test_prap_solves_demo_level() {
        let level = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/levels/open-divider_tomato.txt");
        let mut observer = counting();
        let outcome = run_episode(
            &level,
            &[AgentModel::Prap],
            &Config::default(),
            &mut observer,
        );

        assert_eq!(outcome.error, None);
        assert!(outcome.solved, "not solved in {} ticks", outcome.actions);
        assert_eq!(observer.ticks, outcome.actions);
    }
}
