mod astar;
mod context;
mod heuristic;
mod hierarchical;
mod observations;
mod search_node;
mod subgoal;

pub use astar::{AStar, Observed};
pub use context::PlannerContext;
pub use heuristic::{Heuristic, SubgoalCountHeuristic};
pub use hierarchical::HierarchicalPlanner;
pub use observations::AgentObservations;
pub use search_node::{Plan, PlanStep, SearchNode};
pub use subgoal::{PossibleSubgoal, subgoals_towards, useful_subgoals};
