mod composite_observer;
mod default_observer;
mod episode_observer;
mod pathfinding;
mod priority_queue;
mod record_observer;
mod types;

pub use composite_observer::CompositeObserver;
pub use default_observer::DefaultObserver;
pub use episode_observer::EpisodeObserver;
pub use pathfinding::{flood_fill, precompute_reachability};
pub use priority_queue::PriorityQueue;
pub use record_observer::RecordObserver;
pub use types::{Action, AgentId, AgentPair, JointAction, Position};
