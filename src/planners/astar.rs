use std::collections::HashSet;
use std::rc::Rc;

use tracing::trace;

use crate::infra::{AgentId, JointAction, PriorityQueue};
use crate::planners::{
    AgentObservations, Heuristic, Plan, PlannerContext, SearchNode, SubgoalCountHeuristic,
};
use crate::recipes::Recipe;
use crate::state::State;

/// Which observed actions a search must reproduce.
///
/// Without a bound every logged agent must follow its log. With a bound only
/// the listed agents must, until the root's lock marker is reached; from
/// then on everyone must.
#[derive(Debug, Clone, Copy, Default)]
pub struct Observed<'a> {
    pub bound: Option<&'a [AgentId]>,
    pub logs: Option<&'a [AgentObservations]>,
}

impl<'a> Observed<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all(logs: &'a [AgentObservations]) -> Self {
        Self {
            bound: None,
            logs: Some(logs),
        }
    }

    pub fn bound(bound: &'a [AgentId], logs: &'a [AgentObservations]) -> Self {
        Self {
            bound: Some(bound),
            logs: Some(logs),
        }
    }

    fn conforms(&self, root: &State, child: &State, joint: &JointAction) -> bool {
        let Some(logs) = self.logs else {
            return true;
        };
        let all_must_conform = root
            .locked_until()
            .is_some_and(|locked| locked <= child.timestep());

        logs.iter().all(|log| {
            if let Some(bound) = self.bound
                && !all_must_conform
                && !bound.contains(&log.agent())
            {
                return true;
            }
            let Some(observed) = log.action_ending_at(child.timestep()) else {
                return true;
            };
            joint
                .get(&log.agent())
                .is_none_or(|actual| *actual == observed)
        })
    }
}

pub struct AStar;

impl AStar {
    /// Best-first search over joint actions until `goal` is fulfilled.
    ///
    /// Children whose state can no longer produce the goal are pruned.
    /// Returns `None` when the frontier runs dry or a node gets more than
    /// `max_search_depth` ticks past the root.
    #[tracing::instrument(level = "trace", skip_all, fields(goal = %goal, t = root.timestep()))]
    pub fn search(
        ctx: &PlannerContext,
        root: &State,
        goal: &Recipe,
        observed: Observed<'_>,
    ) -> Option<Plan> {
        let cookbook = ctx.cookbook();
        let heuristic =
            SubgoalCountHeuristic::new(ctx.config().use_property_count_heuristic, ctx.agent_count());
        let depth_limit = root.timestep() + ctx.config().max_search_depth;

        let mut frontier = PriorityQueue::new();
        let mut explored: HashSet<Rc<SearchNode>> = HashSet::new();
        frontier.push(0, Rc::new(SearchNode::root(root.clone())));

        while let Some(node) = frontier.pop() {
            if node.state().is_recipe_fulfilled(goal) {
                let plan = node.extract_plan();
                trace!(steps = plan.len(), expanded = explored.len(), "Goal reached");
                return Some(plan);
            }

            if node.state().timestep() > depth_limit {
                trace!(expanded = explored.len(), "Depth limit reached");
                return None;
            }

            explored.insert(node.clone());

            for (state, joint) in Self::expand(ctx, node.state()) {
                if !observed.conforms(root, &state, &joint) {
                    continue;
                }

                let child = Rc::new(SearchNode::child(node.clone(), state, joint));
                if explored.contains(&child) || frontier.contains(&child) {
                    continue;
                }

                if !child.state().recipe_is_possible(cookbook, goal) {
                    explored.insert(child);
                    continue;
                }

                let priority = heuristic.estimate(cookbook, child.state(), goal);
                frontier.push(priority, child);
            }
        }

        trace!(expanded = explored.len(), "Frontier exhausted");
        None
    }

    /// Legal successors under every combination of per-agent actions. Each
    /// agent's action order is shuffled so ties break randomly.
    fn expand(ctx: &PlannerContext, state: &State) -> Vec<(State, JointAction)> {
        let mut joints = vec![JointAction::new()];
        for agent in state.agent_ids() {
            let actions = ctx.shuffled_actions();
            joints = joints
                .into_iter()
                .flat_map(|joint| {
                    actions.into_iter().map(move |action| {
                        let mut next = joint.clone();
                        next.insert(agent, action);
                        next
                    })
                })
                .collect();
        }

        joints
            .into_iter()
            .filter_map(|joint| {
                state
                    .try_perform(ctx.cookbook(), &joint, false)
                    .map(|next| (next, joint))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::config::Config;
    use crate::infra::{Action, Position};
    use crate::recipes::{Cookbook, Ingredient, IngredientKind};
    use crate::state::parse_level;
    use crate::test_support::{FULL_DIVIDER, OPEN_DIVIDER, StateBuilder};

    const TOMATO_ON_DIVIDER: &str = "-------\n\
                                     /  t  -\n\
                                     /  p  -\n\
                                     *  -  -\n\
                                     -  -  -\n\
                                     -  -  -\n\
                                     -------\n\
                                     \n\
                                     SimpleTomato\n\
                                     \n\
                                     2 1\n";

    fn context_for(state: &State, seed: u64) -> PlannerContext {
        let cookbook = Cookbook::compile().prune_with_state(state);
        PlannerContext::new(
            Rc::new(cookbook),
            Config::default().with_seed(seed),
            state.agent_count(),
        )
    }

    fn simple_tomato_level() -> State {
        StateBuilder::on_map(FULL_DIVIDER)
            .with_agent(0, (2, 1))
            .with_ingredient(Ingredient::raw(IngredientKind::Tomato), (3, 1))
            .with_ingredient(Ingredient::plate(), (3, 2))
            .with_goal("SimpleTomato")
            .build()
    }

    /// Replays `plan` from `start` and checks every step is a legal tick.
    fn assert_plan_is_legal(ctx: &PlannerContext, start: &State, plan: &Plan) {
        let mut current = start.clone();
        for step in plan.steps() {
            current = current
                .try_perform(ctx.cookbook(), &step.joint, false)
                .expect("every planned tick is legal");
            assert_eq!(current, step.state);
            assert_eq!(current.timestep(), step.state.timestep());
        }
    }

    #[test]
    fn test_solves_simple_tomato() {
        let state = simple_tomato_level();
        let ctx = context_for(&state, 0);
        let goal = ctx.cookbook().get("SimpleTomato").unwrap().clone();

        let plan = AStar::search(&ctx, &state, &goal, Observed::none()).expect("solvable");

        // Pick up, cut, plate and deliver needs at least nine ticks.
        assert!(plan.len() >= 9, "plan too short: {}", plan.len());
        assert!(plan.len() <= 20, "plan unreasonably long: {}", plan.len());
        assert!(plan.final_state().is_goal_state());
        assert_plan_is_legal(&ctx, &state, &plan);
    }

    /// Length of the shortest legal tick sequence from `start` to a goal state.
    fn shortest_plan_len(cookbook: &Cookbook, start: &State) -> Option<usize> {
        let agents: Vec<AgentId> = start.agent_ids().collect();
        let mut seen = HashSet::from([start.clone()]);
        let mut frontier = VecDeque::from([(start.clone(), 0)]);

        while let Some((state, depth)) = frontier.pop_front() {
            if state.is_goal_state() {
                return Some(depth);
            }
            let mut joints = vec![JointAction::new()];
            for agent in &agents {
                joints = joints
                    .into_iter()
                    .flat_map(|joint| {
                        Action::ALL.into_iter().map(move |action| {
                            let mut next = joint.clone();
                            next.insert(*agent, action);
                            next
                        })
                    })
                    .collect();
            }
            for joint in joints {
                if let Some(next) = state.try_perform(cookbook, &joint, false) {
                    if seen.insert(next.clone()) {
                        frontier.push_back((next, depth + 1));
                    }
                }
            }
        }
        None
    }

    #[test]
    fn test_parsed_level_plan_is_shortest() {
        let level = parse_level(TOMATO_ON_DIVIDER, 1).expect("valid level");
        let goal = level.cookbook.get("SimpleTomato").unwrap().clone();
        let optimum = shortest_plan_len(&level.cookbook, &level.state).expect("solvable");

        for seed in 0..8 {
            let ctx = PlannerContext::new(
                Rc::clone(&level.cookbook),
                Config::default().with_seed(seed),
                level.state.agent_count(),
            );
            let plan = AStar::search(&ctx, &level.state, &goal, Observed::none()).expect("solvable");

            assert_eq!(plan.len(), optimum, "seed {}", seed);
            assert!(plan.final_state().is_goal_state());
            assert!(plan.final_state().is_recipe_fulfilled(&goal));
            assert_plan_is_legal(&ctx, &level.state, &plan);
        }
    }

    #[test]
    fn test_goal_already_fulfilled_gives_empty_plan() {
        let state = simple_tomato_level();
        let ctx = context_for(&state, 0);
        let goal = ctx.cookbook().get("SimpleTomato").unwrap().clone();
        let done = state.clone().with_fulfilled(&goal);

        let plan = AStar::search(&ctx, &done, &goal, Observed::none()).expect("trivial");
        assert!(plan.is_empty());
    }

    #[test]
    fn test_impossible_goal_fails() {
        let state = StateBuilder::on_map(FULL_DIVIDER)
            .with_agent(0, (2, 1))
            .with_ingredient(Ingredient::raw(IngredientKind::Tomato), (3, 1))
            .build();
        let ctx = context_for(&state, 0);
        let goal = Cookbook::compile().get("PlatedCutTomato").unwrap().clone();

        assert!(AStar::search(&ctx, &state, &goal, Observed::none()).is_none());
    }

    #[test]
    fn test_same_seed_same_plan() {
        let state = simple_tomato_level();
        let goal = Cookbook::compile().get("SimpleTomato").unwrap().clone();

        let a = AStar::search(&context_for(&state, 11), &state, &goal, Observed::none()).unwrap();
        let b = AStar::search(&context_for(&state, 11), &state, &goal, Observed::none()).unwrap();
        let joints_a: Vec<_> = a.steps().iter().map(|s| s.joint.clone()).collect();
        let joints_b: Vec<_> = b.steps().iter().map(|s| s.joint.clone()).collect();
        assert_eq!(joints_a, joints_b);
    }

    #[test]
    fn test_plan_follows_observations() {
        let state = StateBuilder::on_map(OPEN_DIVIDER)
            .with_agent(0, (2, 1))
            .with_agent(1, (4, 4))
            .with_ingredient(Ingredient::raw(IngredientKind::Tomato), (3, 0))
            .build();
        let ctx = context_for(&state, 0);
        let goal = ctx.cookbook().get("TomatoMovableIsCut").unwrap().clone();

        let logs = vec![
            AgentObservations::new(AgentId(0)),
            AgentObservations::with_actions(AgentId(1), [Action::MoveDown, Action::MoveLeft]),
        ];
        let bound = [AgentId(1)];
        let plan = AStar::search(&ctx, &state, &goal, Observed::bound(&bound, &logs))
            .expect("cutting is reachable");

        assert_eq!(plan.action_at(1, AgentId(1)), Some(Action::MoveDown));
        assert_eq!(plan.action_at(2, AgentId(1)), Some(Action::MoveLeft));
        assert_eq!(
            plan.steps()[1].state.agent_position(AgentId(1)),
            Some(Position::new(3, 5))
        );
        assert_plan_is_legal(&ctx, &state, &plan);
    }
}
