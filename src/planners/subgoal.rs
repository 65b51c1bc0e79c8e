use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::recipes::{Cookbook, Recipe};
use crate::state::State;

/// A recipe that can be made right now, with the two parts that combine
/// into it. Parts are unordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PossibleSubgoal {
    recipe: String,
    parts: BTreeSet<String>,
}

impl PossibleSubgoal {
    pub fn new(recipe: impl Into<String>, a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            recipe: recipe.into(),
            parts: [a.into(), b.into()].into_iter().collect(),
        }
    }

    pub fn recipe_name(&self) -> &str {
        &self.recipe
    }

    pub fn parts(&self) -> &BTreeSet<String> {
        &self.parts
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.parts.contains(name)
    }
}

impl fmt::Display for PossibleSubgoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.recipe)
    }
}

/// Every ordered pair of game objects with a recipe accepted by `keep`,
/// distinct, in order of first appearance.
fn collect_subgoals(
    cookbook: &Cookbook,
    state: &State,
    mut keep: impl FnMut(&Recipe) -> bool,
) -> Vec<PossibleSubgoal> {
    let objects: Vec<_> = state.game_objects().map(|(_, item)| item).collect();
    let mut seen = HashSet::new();
    let mut subgoals = Vec::new();

    for a in &objects {
        for b in &objects {
            let Some(recipe) = cookbook.combine(a, b) else {
                continue;
            };
            if !keep(recipe) {
                continue;
            }
            let subgoal = PossibleSubgoal::new(recipe.name(), a.name(), b.name());
            if seen.insert(subgoal.clone()) {
                subgoals.push(subgoal);
            }
        }
    }

    subgoals
}

/// Subgoals that can be made now and are a step towards `goal`.
pub fn subgoals_towards(cookbook: &Cookbook, state: &State, goal: &Recipe) -> Vec<PossibleSubgoal> {
    collect_subgoals(cookbook, state, |recipe| cookbook.leads_to(recipe, goal))
}

/// Subgoals that can be made now and lead to some goal that is still
/// possible.
pub fn useful_subgoals(cookbook: &Cookbook, state: &State) -> Vec<PossibleSubgoal> {
    collect_subgoals(cookbook, state, |recipe| {
        state.goals().iter().any(|goal| {
            cookbook.leads_to(recipe, goal) && state.recipe_is_possible(cookbook, goal)
        })
    })
}
