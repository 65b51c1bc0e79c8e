use std::env;
use std::str::FromStr;

/// Tuning knobs for one episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub seed: u64,
    /// Length of the per-agent subgoal commitment history.
    pub history_size: usize,
    /// A* gives up once a node is this many ticks past its root.
    pub max_search_depth: usize,
    pub use_property_count_heuristic: bool,
    /// Seed each agent's own history with the cheapest opening subgoal.
    pub use_initial_queue: bool,
    pub max_ticks: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: 0,
            history_size: 6,
            max_search_depth: 100,
            use_property_count_heuristic: false,
            use_initial_queue: true,
            max_ticks: 100,
        }
    }
}

fn get_env_var<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.trim().parse::<T>().ok())
}

impl Config {
    /// Reads `KITCHEN_*` overrides from the environment; anything missing
    /// or unparsable keeps its default.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Self {
            seed: get_env_var("KITCHEN_SEED").unwrap_or(defaults.seed),
            history_size: get_env_var("KITCHEN_HISTORY_SIZE").unwrap_or(defaults.history_size),
            max_search_depth: get_env_var("KITCHEN_MAX_SEARCH_DEPTH")
                .unwrap_or(defaults.max_search_depth),
            use_property_count_heuristic: get_env_var("KITCHEN_PROPERTY_HEURISTIC")
                .unwrap_or(defaults.use_property_count_heuristic),
            use_initial_queue: get_env_var("KITCHEN_INITIAL_QUEUE")
                .unwrap_or(defaults.use_initial_queue),
            max_ticks: get_env_var("KITCHEN_MAX_TICKS").unwrap_or(defaults.max_ticks),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
