mod level;
mod map;
mod transition;
mod world_state;

pub use level::{LoadedLevel, load_level, parse_grid, parse_level};
pub use map::{CellKind, Map};
pub use transition::MergeOutcome;
pub use world_state::State;
