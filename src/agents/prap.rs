use std::collections::BTreeMap;
use std::iter;

use tracing::{debug, trace, warn};

use crate::agents::{AgentSolver, SolverCore, SubgoalHistory};
use crate::error::Result;
use crate::infra::{Action, AgentId, JointAction};
use crate::planners::{
    AgentObservations, HierarchicalPlanner, Observed, Plan, PlannerContext, PossibleSubgoal,
    useful_subgoals,
};
use crate::state::State;

/// Plan-recognition ad-hoc agent.
///
/// Each tick it infers what its teammates are working on from their
/// observed actions, commits to the subgoal it is most needed for (or the
/// cheapest free one), and arbitrates collisions between the believed
/// actions before answering.
#[derive(Debug)]
pub struct Prap {
    core: SolverCore,
    histories: BTreeMap<AgentId, SubgoalHistory>,
    believed_subgoals: BTreeMap<AgentId, PossibleSubgoal>,
    believed_actions: JointAction,
    noop_streak: usize,
}

impl Prap {
    pub fn new(core: SolverCore) -> Self {
        let history_size = core.ctx().config().history_size;
        let histories = core
            .initial_state()
            .agent_ids()
            .map(|agent| (agent, SubgoalHistory::new(history_size)))
            .collect();

        let mut prap = Self {
            core,
            histories,
            believed_subgoals: BTreeMap::new(),
            believed_actions: JointAction::new(),
            noop_streak: 0,
        };

        if prap.ctx().config().use_initial_queue
            && let Some(subgoal) = prap.best_initial_subgoal()
        {
            let me = prap.core.id();
            let copies = history_size / prap.ctx().agent_count().max(1);
            debug!(agent = %me, subgoal = %subgoal, copies, "Initial commitment");
            for _ in 0..copies {
                prap.history_mut(me).push(subgoal.clone());
            }
        }

        prap
    }

    fn ctx(&self) -> &PlannerContext {
        self.core.ctx()
    }

    fn history_mut(&mut self, agent: AgentId) -> &mut SubgoalHistory {
        let size = self.core.ctx().config().history_size;
        self.histories
            .entry(agent)
            .or_insert_with(|| SubgoalHistory::new(size))
    }

    fn own_history_count(&self, subgoal: &PossibleSubgoal) -> usize {
        self.histories
            .get(&self.core.id())
            .map_or(0, |history| history.count(subgoal))
    }

    fn own_history_is_empty(&self) -> bool {
        self.histories
            .get(&self.core.id())
            .is_none_or(|history| history.is_empty())
    }

    /// The most frequent commitment of `agent`, ties broken at random.
    fn believed_intention(&self, agent: AgentId) -> Option<PossibleSubgoal> {
        let candidates = self.histories.get(&agent)?.mode_candidates();
        if candidates.is_empty() {
            return None;
        }
        let pick = self.ctx().random_index(candidates.len());
        candidates.into_iter().nth(pick)
    }

    fn random_subgoal(&self, direct: &[PossibleSubgoal]) -> PossibleSubgoal {
        direct[self.ctx().random_index(direct.len())].clone()
    }

    fn plan(&self, state: &State, subgoal: &PossibleSubgoal, observed: Observed<'_>) -> Option<Plan> {
        let recipe = self.ctx().cookbook().recipe(subgoal.recipe_name())?;
        HierarchicalPlanner::search(self.ctx(), state, recipe, observed)
    }

    /// Length of the cheapest unobserved plan for `subgoal` from the start
    /// of the episode, memoized per recipe.
    fn optimal_cost(&self, subgoal: &PossibleSubgoal) -> Option<usize> {
        self.ctx().optimal_cost(subgoal.recipe_name(), || {
            self.plan(self.core.initial_state(), subgoal, Observed::none())
                .map(|plan| plan.len())
        })
    }

    fn best_initial_subgoal(&self) -> Option<PossibleSubgoal> {
        let state = self.core.current_state();
        let mut best = None;
        let mut best_cost = usize::MAX;

        for subgoal in useful_subgoals(self.ctx().cookbook(), state) {
            let cost = self.optimal_cost(&subgoal).unwrap_or(usize::MAX);
            if cost <= best_cost {
                best_cost = cost;
                best = Some(subgoal);
            }
        }

        best
    }

    /// The subgoal whose observed realisation deviates least from its
    /// optimal cost, together with that realisation.
    fn best_fitting_subgoal(
        &self,
        agent: AgentId,
        direct: &[PossibleSubgoal],
    ) -> Option<(PossibleSubgoal, Plan)> {
        let current = self.core.current_state();
        let bound = [agent];
        let observed = Observed::bound(&bound, self.core.logs());

        for attempt in 0..2 {
            let mut best: Option<(i64, PossibleSubgoal, Plan)> = None;

            for subgoal in direct {
                if !subgoal
                    .parts()
                    .iter()
                    .any(|part| current.can_agent_reach(part, agent))
                {
                    continue;
                }
                let Some(optimal) = self.optimal_cost(subgoal) else {
                    continue;
                };
                let Some(plan) = self.plan(self.core.initial_state(), subgoal, observed) else {
                    continue;
                };

                let delta = plan.len() as i64 - optimal as i64;
                if best.as_ref().is_none_or(|(best_delta, _, _)| delta < *best_delta) {
                    best = Some((delta, subgoal.clone(), plan));
                }
            }

            if let Some((delta, subgoal, plan)) = best {
                trace!(agent = %agent, subgoal = %subgoal, delta, "Recognized intention");
                return Some((subgoal, plan));
            }
            trace!(agent = %agent, attempt, "No intention recognized");
        }

        None
    }

    /// The plan for `subgoal` if it cannot be done (as quickly) without
    /// this agent.
    fn plan_if_needed(&self, subgoal: &PossibleSubgoal) -> Option<Plan> {
        let me = self.core.id();
        let current = self.core.current_state();
        let with_me = self.plan(current, subgoal, Observed::none())?;

        let held = current.held_item(me);
        if let Some(item) = held
            && subgoal.has_part(item.name())
        {
            return Some(with_me);
        }

        let without = current.without_agent(me, held.is_some());
        if subgoal
            .parts()
            .iter()
            .any(|part| !without.can_any_agent_reach(part))
        {
            return Some(with_me);
        }

        match self.plan(&without, subgoal, Observed::none()) {
            None => Some(with_me),
            Some(without_me)
                if with_me.final_state().timestep() < without_me.final_state().timestep() =>
            {
                Some(with_me)
            }
            Some(_) => None,
        }
    }

    /// Subgoals some agent is committed to and this agent is needed for.
    fn required_plans(&self, others: &[AgentId]) -> Vec<(PossibleSubgoal, Plan)> {
        let cookbook = self.ctx().cookbook();
        let mut required = Vec::new();

        for agent in iter::once(self.core.id()).chain(others.iter().copied()) {
            let Some(subgoal) = self.believed_intention(agent) else {
                continue;
            };
            if let Some(plan) = self.plan_if_needed(&subgoal)
                && plan.final_state().all_goals_possible(cookbook)
            {
                trace!(agent = %agent, subgoal = %subgoal, "Help needed");
                required.push((subgoal, plan));
            }
        }

        required
    }

    /// Cheapest subgoal nobody else is believed to work on; sustained own
    /// commitment makes a subgoal cheaper.
    fn cheapest_free_subgoal(
        &self,
        candidates: Vec<PossibleSubgoal>,
    ) -> Option<(PossibleSubgoal, Plan)> {
        let current = self.core.current_state();
        let observed = Observed::all(self.core.logs());
        let mut best = None;
        let mut best_cost = i64::MAX;

        for subgoal in candidates {
            let Some(plan) = self.plan(current, &subgoal, observed) else {
                continue;
            };
            if !plan.final_state().all_goals_possible(self.ctx().cookbook()) {
                continue;
            }
            let cost = plan.len() as i64 - self.own_history_count(&subgoal) as i64;
            if cost < best_cost {
                best_cost = cost;
                best = Some((subgoal, plan));
            }
        }

        best
    }

    /// Re-plans one agent of every colliding pair, holding the other to its
    /// believed action.
    fn resolve_conflicts(&mut self, direct: &[PossibleSubgoal]) {
        let current = self.core.current_state().clone();
        let collisions = current.collisions(&self.believed_actions);
        if !collisions.iter().any(|pair| pair.contains(self.core.id())) {
            return;
        }

        for pair in collisions {
            let (replanner, other) = if self.ctx().random_unit() >= 0.5 {
                (pair.first, pair.second)
            } else {
                (pair.second, pair.first)
            };

            let mut mock: Vec<AgentObservations> = self.core.logs().to_vec();
            if let Some(action) = self.believed_actions.get(&other)
                && let Some(log) = mock.iter_mut().find(|log| log.agent() == other)
            {
                log.push(*action);
            }

            let subgoal = match self.believed_subgoals.get(&replanner) {
                Some(subgoal) => subgoal.clone(),
                None => self.random_subgoal(direct),
            };
            let bound: Vec<AgentId> = current
                .agent_ids()
                .filter(|agent| *agent != replanner)
                .collect();

            let replanned = self
                .plan(&current, &subgoal, Observed::bound(&bound, &mock))
                .filter(|plan| !plan.is_empty());
            let action = match replanned {
                Some(plan) => plan.action_at(current.timestep() + 1, replanner),
                None => {
                    debug!(agent = %replanner, subgoal = %subgoal, "Replan failed");
                    None
                }
            }
            .unwrap_or_else(|| self.core.random_legal_action_for(replanner));

            debug!(
                replanner = %replanner,
                other = %other,
                ?action,
                "Resolved collision"
            );
            self.believed_actions.insert(replanner, action);
        }
    }
}

impl AgentSolver for Prap {
    fn id(&self) -> AgentId {
        self.core.id()
    }

    #[tracing::instrument(level = "debug", skip(self), fields(agent = %self.core.id(), t = self.core.current_state().timestep()))]
    fn next_action(&mut self) -> Action {
        let me = self.core.id();
        let timestep = self.core.current_state().timestep();

        if self.ctx().random_percent() < self.noop_streak as i64 - self.ctx().agent_count() as i64 {
            debug!(streak = self.noop_streak, "Breaking no-op streak");
            return self.core.random_legal_action();
        }

        let direct = useful_subgoals(self.ctx().cookbook(), self.core.current_state());
        if direct.is_empty() {
            warn!(agent = %me, "No useful subgoal left, acting randomly");
            return self.core.random_legal_action();
        }

        self.history_mut(me).retain_in(&direct);
        self.believed_actions.clear();

        let others = self.core.others();
        for &other in &others {
            self.history_mut(other).retain_in(&direct);
            if let Some((subgoal, plan)) = self.best_fitting_subgoal(other, &direct) {
                let action = plan.action_at(timestep + 1, other).unwrap_or(Action::NoOp);
                self.believed_actions.insert(other, action);
                self.believed_subgoals.insert(other, subgoal.clone());
                self.history_mut(other).push(subgoal);
            } else {
                self.believed_actions.insert(other, Action::NoOp);
            }
        }

        let mut chosen = self
            .required_plans(&others)
            .into_iter()
            .min_by_key(|(_, plan)| plan.len());

        let mut nothing_to_do = false;
        if chosen.is_none() {
            let taken: Vec<PossibleSubgoal> = others
                .iter()
                .filter_map(|agent| self.believed_intention(*agent))
                .collect();
            let candidates: Vec<PossibleSubgoal> = direct
                .iter()
                .filter(|subgoal| !taken.contains(subgoal))
                .cloned()
                .collect();

            if candidates.is_empty() {
                nothing_to_do = true;
            } else {
                chosen = self.cheapest_free_subgoal(candidates);
            }
        }

        if chosen.is_none() && (!nothing_to_do || self.own_history_is_empty()) {
            let subgoal = self.random_subgoal(&direct);
            trace!(subgoal = %subgoal, "Falling back to a random subgoal");
            chosen = self
                .plan(
                    self.core.current_state(),
                    &subgoal,
                    Observed::all(self.core.logs()),
                )
                .map(|plan| (subgoal, plan));
        }

        let planned = chosen.and_then(|(subgoal, plan)| {
            debug!(subgoal = %subgoal, steps = plan.len(), "Committed");
            self.believed_subgoals.insert(me, subgoal.clone());
            self.history_mut(me).push(subgoal);
            plan.action_at(timestep + 1, me)
        });
        let action = planned.unwrap_or_else(|| self.core.random_legal_action());
        self.believed_actions.insert(me, action);

        self.resolve_conflicts(&direct);

        let action = self.believed_actions.get(&me).copied().unwrap_or(action);
        if self.core.is_legal_alone(me, action) {
            action
        } else {
            warn!(agent = %me, ?action, "Planned action is illegal, acting randomly");
            self.core.random_legal_action()
        }
    }

    fn validate(&self, joint: &JointAction) -> Result<()> {
        self.core.advance(joint).map(|_| ())
    }

    fn observe(&mut self, joint: &JointAction) -> Result<()> {
        self.core.observe(joint)?;
        let own = joint.get(&self.core.id()).copied().unwrap_or(Action::NoOp);
        if own.is_noop() {
            self.noop_streak += 1;
        } else {
            self.noop_streak = 0;
        }
        Ok(())
    }
}
