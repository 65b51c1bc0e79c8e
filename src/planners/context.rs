use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::Config;
use crate::infra::Action;
use crate::recipes::Cookbook;

/// Per-episode planning context: the pruned catalog, tuning knobs, the one
/// random source every decision draws from, and the optimal-cost memo.
///
/// Rebuilt whenever a level is loaded, so nothing leaks between episodes.
#[derive(Debug)]
pub struct PlannerContext {
    cookbook: Rc<Cookbook>,
    config: Config,
    agent_count: usize,
    rng: RefCell<StdRng>,
    optimal_costs: RefCell<HashMap<String, Option<usize>>>,
}

impl PlannerContext {
    pub fn new(cookbook: Rc<Cookbook>, config: Config, agent_count: usize) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            cookbook,
            config,
            agent_count,
            rng: RefCell::new(rng),
            optimal_costs: RefCell::new(HashMap::new()),
        }
    }

    pub fn cookbook(&self) -> &Cookbook {
        &self.cookbook
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn agent_count(&self) -> usize {
        self.agent_count
    }

    pub fn random_index(&self, len: usize) -> usize {
        self.rng.borrow_mut().random_range(0..len.max(1))
    }

    /// Uniform in `0..100`.
    pub fn random_percent(&self) -> i64 {
        self.rng.borrow_mut().random_range(0..100)
    }

    pub fn random_unit(&self) -> f64 {
        self.rng.borrow_mut().random::<f64>()
    }

    pub fn random_action(&self) -> Action {
        Action::ALL[self.random_index(Action::ALL.len())]
    }

    pub fn shuffled_actions(&self) -> [Action; 5] {
        let mut actions = Action::ALL;
        actions.shuffle(&mut *self.rng.borrow_mut());
        actions
    }

    /// Memoized cost of the cheapest plan for `recipe`; `compute` runs only
    /// on the first request.
    pub fn optimal_cost(
        &self,
        recipe: &str,
        compute: impl FnOnce() -> Option<usize>,
    ) -> Option<usize> {
        if let Some(cost) = self.optimal_costs.borrow().get(recipe) {
            return *cost;
        }
        let cost = compute();
        self.optimal_costs
            .borrow_mut()
            .insert(recipe.to_string(), cost);
        cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(seed: u64) -> PlannerContext {
        PlannerContext::new(
            Rc::new(Cookbook::compile()),
            Config::default().with_seed(seed),
            2,
        )
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = context(7);
        let b = context(7);
        let draws_a: Vec<usize> = (0..20).map(|_| a.random_index(10)).collect();
        let draws_b: Vec<usize> = (0..20).map(|_| b.random_index(10)).collect();
        assert_eq!(draws_a, draws_b);
        assert_eq!(a.shuffled_actions(), b.shuffled_actions());
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let ctx = context(3);
        let mut actions = ctx.shuffled_actions().to_vec();
        actions.sort();
        assert_eq!(actions, Action::ALL.to_vec());
    }

    #[test]
    fn test_optimal_cost_is_memoized() {
        let ctx = context(0);
        assert_eq!(ctx.optimal_cost("Salad", || Some(12)), Some(12));
        assert_eq!(
            ctx.optimal_cost("Salad", || panic!("must not recompute")),
            Some(12)
        );
        assert_eq!(ctx.optimal_cost("OnionSalad", || None), None);
    }
}
