use crate::infra::Position;
use crate::recipes::{Cookbook, Ingredient, Item, Recipe};
use crate::state::{CellKind, State};

pub trait Heuristic {
    fn estimate(&self, cookbook: &Cookbook, state: &State, goal: &Recipe) -> i64;
}

/// Distance-based estimate of how far a state is from making `goal`.
///
/// Per unfulfilled goal it charges for held items that cannot go into the
/// goal, plus the distance needed to bring the first pair of objects that
/// combine into the goal together on a counter. The state's timestep is
/// added so deeper nodes lose ties.
#[derive(Debug, Clone)]
pub struct SubgoalCountHeuristic {
    use_property_count: bool,
    agent_count: i64,
}

impl SubgoalCountHeuristic {
    pub fn new(use_property_count: bool, agent_count: usize) -> Self {
        Self {
            use_property_count,
            agent_count: agent_count.max(1) as i64,
        }
    }

    /// Property bits the goal's ingredients still lack across the kitchen.
    fn missing_properties(goal: &Recipe, state: &State) -> i64 {
        let goal_ingredients: Vec<&Ingredient> = match goal.product().as_ref() {
            Item::Ingredient(ingredient) => vec![ingredient],
            Item::Food(food) => food.ingredients().iter().collect(),
            Item::Station(_) => Vec::new(),
        };

        let total: i64 = goal_ingredients
            .iter()
            .map(|i| i.properties().count() as i64)
            .sum();
        let matched: i64 = goal_ingredients
            .iter()
            .flat_map(|wanted| {
                state
                    .ingredients()
                    .filter(move |have| have.kind() == wanted.kind())
                    .map(move |have| (wanted.properties() & have.properties()).count() as i64)
            })
            .sum();

        total - matched
    }

    fn held_item_penalty(&self, cookbook: &Cookbook, goal: &Recipe, state: &State) -> i64 {
        let mut penalty = 0;
        for (agent, pos) in state.agents() {
            let Some(held) = state.held_item(*agent) else {
                continue;
            };
            if cookbook.can_be_combined_to(held, goal) {
                continue;
            }
            let nearest = state
                .free_counters()
                .map(|counter| counter.distance(pos) as i64)
                .min()
                .unwrap_or(0);
            penalty += nearest * self.agent_count;
        }
        penalty
    }

    /// Counter that is free (or holds one of the two parts) minimising the
    /// combined distance to both parts. Later counters win ties.
    fn meeting_counter(state: &State, p1: Position, p2: Position) -> Option<(Position, i64)> {
        let mut best: Option<(Position, i64)> = None;
        for counter in state.map().positions_of(CellKind::Counter) {
            if *counter != p1 && *counter != p2 && state.item_at(counter).is_some() {
                continue;
            }
            let cost = (p1.distance(counter) + p2.distance(counter)) as i64;
            if best.is_none_or(|(_, best_cost)| cost <= best_cost) {
                best = Some((*counter, cost));
            }
        }
        best
    }

    fn ingredient_distance(&self, cookbook: &Cookbook, goal: &Recipe, state: &State) -> i64 {
        let objects: Vec<_> = state.game_objects().collect();

        for (p1, a) in &objects {
            for (p2, b) in &objects {
                if !cookbook.combines_to(a, b, goal) {
                    continue;
                }
                let Some((counter, mut cost)) = Self::meeting_counter(state, *p1, *p2) else {
                    continue;
                };
                for (agent, pos) in state.agents() {
                    if state.held_item(*agent).is_none() {
                        cost += counter.distance(pos) as i64 / self.agent_count;
                    }
                }
                return cost;
            }
        }

        0
    }
}

impl Heuristic for SubgoalCountHeuristic {
    fn estimate(&self, cookbook: &Cookbook, state: &State, goal: &Recipe) -> i64 {
        let mut estimate = 0;

        if self.use_property_count {
            estimate += Self::missing_properties(goal, state);
        }

        if !state.is_recipe_fulfilled(goal) {
            estimate += self.held_item_penalty(cookbook, goal, state);
            estimate += self.ingredient_distance(cookbook, goal, state);
        }

        estimate + state.timestep() as i64
    }
}
