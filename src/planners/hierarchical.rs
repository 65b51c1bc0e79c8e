use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use tracing::{debug, trace};

use crate::infra::{JointAction, PriorityQueue};
use crate::planners::{AStar, Observed, Plan, PlannerContext, subgoals_towards};
use crate::recipes::Recipe;
use crate::state::State;

/// A partial plan identified by the order in which it achieved subgoals.
#[derive(Debug, Clone)]
struct SubgoalNode {
    plan: Plan,
    order: Vec<String>,
}

impl SubgoalNode {
    fn state(&self) -> &State {
        self.plan.final_state()
    }
}

impl PartialEq for SubgoalNode {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl Eq for SubgoalNode {}

impl Hash for SubgoalNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.order.hash(state);
    }
}

pub struct HierarchicalPlanner;

impl HierarchicalPlanner {
    /// Best-first search over sequences of directly achievable subgoals,
    /// each realised with [`AStar`]. Shorter concatenated plans first.
    ///
    /// Observed actions up to the lock marker (or the end of the logs) are
    /// replayed before planning starts and are part of the returned plan.
    #[tracing::instrument(level = "trace", skip_all, fields(goal = %goal, t = root.timestep()))]
    pub fn search(
        ctx: &PlannerContext,
        root: &State,
        goal: &Recipe,
        observed: Observed<'_>,
    ) -> Option<Plan> {
        let start = SubgoalNode {
            plan: Self::apply_observations(ctx, root, observed)?,
            order: Vec::new(),
        };

        let mut frontier = PriorityQueue::new();
        let mut explored = HashSet::new();
        frontier.push(0, start);

        while let Some(node) = frontier.pop() {
            if node.state().is_recipe_fulfilled(goal) {
                debug!(
                    goal = %goal,
                    steps = node.plan.len(),
                    subgoals = ?node.order,
                    "Hierarchical plan found"
                );
                return Some(node.plan);
            }

            let children = Self::children(ctx, &node, goal, observed);
            explored.insert(node);

            for child in children {
                if explored.contains(&child) || frontier.contains(&child) {
                    continue;
                }
                frontier.push(child.plan.len() as i64, child);
            }
        }

        trace!(goal = %goal, "No hierarchical plan");
        None
    }

    fn children(
        ctx: &PlannerContext,
        node: &SubgoalNode,
        goal: &Recipe,
        observed: Observed<'_>,
    ) -> Vec<SubgoalNode> {
        let cookbook = ctx.cookbook();
        let state = node.state();
        if !state.recipe_is_possible(cookbook, goal) {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut children = Vec::new();

        for subgoal in subgoals_towards(cookbook, state, goal) {
            if !seen.insert(subgoal.recipe_name().to_string()) {
                continue;
            }
            let Some(recipe) = cookbook.recipe(subgoal.recipe_name()) else {
                continue;
            };
            let Some(realisation) = AStar::search(ctx, state, recipe, observed) else {
                continue;
            };
            // Already satisfied subgoals add nothing but a longer order
            if realisation.is_empty() {
                continue;
            }
            if !realisation
                .final_state()
                .recipe_is_possible(cookbook, goal)
            {
                continue;
            }

            let mut plan = node.plan.clone();
            plan.extend(realisation);
            let mut order = node.order.clone();
            order.push(subgoal.recipe_name().to_string());
            children.push(SubgoalNode { plan, order });
        }

        children
    }

    /// Replays logged joint actions from the root's timestep. Unbound
    /// searches replay to the end of the shortest log; bound searches only
    /// replay up to the lock marker.
    fn apply_observations(ctx: &PlannerContext, root: &State, observed: Observed<'_>) -> Option<Plan> {
        let mut plan = Plan::empty(root.clone());
        let Some(logs) = observed.logs else {
            return Some(plan);
        };
        if observed.bound.is_some() && root.locked_until().is_none() {
            return Some(plan);
        }

        let shortest = logs.iter().map(|log| log.len()).min().unwrap_or(0);
        let until = root.locked_until().unwrap_or(shortest).min(shortest);
        let present: Vec<_> = logs
            .iter()
            .filter(|log| root.agent_position(log.agent()).is_some())
            .collect();

        for tick in root.timestep()..until {
            let joint: JointAction = present
                .iter()
                .filter_map(|log| log.get(tick).map(|action| (log.agent(), action)))
                .collect();
            let next = plan
                .final_state()
                .try_perform(ctx.cookbook(), &joint, true)?;
            plan.push(next, joint);
        }

        if !plan.is_empty() {
            trace!(replayed = plan.len(), "Replayed observations");
        }
        Some(plan)
    }
}
