use std::env;
use std::path::PathBuf;

use cooking_planner::infra::{CompositeObserver, DefaultObserver, EpisodeObserver, RecordObserver};
use cooking_planner::runner::{run_benchmark, run_episode};
use cooking_planner::{AgentModel, Config};
use dotenv::dotenv;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_LEVEL: &str = "demos/levels/open-divider_salad.txt";

fn get_env_var_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|val| val.parse::<usize>().ok())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cooking_planner=info,warn"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging();

    let config = Config::from_env();
    let models = env::var("KITCHEN_AGENTS")
        .unwrap_or_else(|_| "prap,prap".to_string())
        .split(',')
        .map(|model| model.parse::<AgentModel>())
        .collect::<Result<Vec<_>, _>>()?;
    let iterations = get_env_var_usize("KITCHEN_ITERATIONS").unwrap_or(1);
    let results_file = env::var("KITCHEN_RESULTS_FILE").ok();

    // KITCHEN_LEVELS (comma separated) switches to benchmark mode
    let levels: Vec<PathBuf> = match env::var("KITCHEN_LEVELS") {
        Ok(levels) => levels.split(',').map(|l| PathBuf::from(l.trim())).collect(),
        Err(_) => vec![PathBuf::from(
            env::var("KITCHEN_LEVEL").unwrap_or_else(|_| DEFAULT_LEVEL.to_string()),
        )],
    };
    let benchmark = levels.len() > 1 || iterations > 1;

    let mut observers: Vec<Box<dyn EpisodeObserver>> =
        vec![Box::new(DefaultObserver::new(!benchmark))];
    if let Some(path) = results_file {
        tracing::info!("Appending outcome records to {}", path);
        observers.push(Box::new(RecordObserver::open(path)?));
    }
    let mut observer = CompositeObserver::new(observers);

    if benchmark {
        for summary in run_benchmark(&levels, &models, iterations, &config, &mut observer) {
            println!("{}", summary);
        }
    } else {
        let outcome = run_episode(&levels[0], &models, &config, &mut observer);
        if let Some(error) = outcome.error {
            return Err(error.into());
        }
    }

    Ok(())
}
