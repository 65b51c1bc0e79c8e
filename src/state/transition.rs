use std::collections::{BTreeSet, HashSet};
use std::rc::Rc;

use tracing::trace;

use crate::infra::{AgentId, AgentPair, JointAction, Position};
use crate::recipes::{Cookbook, Item, StationKind};
use crate::state::{CellKind, State};

/// What happened when an agent pushed its held item into something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Combined with a movable item; the product is held.
    Combined,
    /// Handed in at a delivery station; the recipe is fulfilled.
    Delivered,
    /// Processed on a cutting station; the product stays held.
    Processed,
    /// No recipe, item left on the cutting station.
    Dropped,
    /// No recipe, delivery station ignored the item.
    Ignored,
    Failed,
}

impl MergeOutcome {
    pub fn is_success(self) -> bool {
        self != MergeOutcome::Failed
    }
}

impl State {
    fn target(&self, agent: AgentId, joint: &JointAction) -> Option<(Position, Position)> {
        let from = self.agent_position(agent)?;
        let action = joint.get(&agent)?;
        Some((from, from + action.direction()))
    }

    fn moves(&self, joint: &JointAction) -> Vec<(AgentId, Position, Position)> {
        joint
            .keys()
            .filter_map(|agent| {
                self.target(*agent, joint)
                    .map(|(from, to)| (*agent, from, to))
            })
            .collect()
    }

    /// Vertex and edge conflicts. Stepping into a cell another agent
    /// currently occupies counts as a vertex conflict, even if it leaves.
    pub fn has_collisions(&self, joint: &JointAction) -> bool {
        let moves = self.moves(joint);
        let mut targets = HashSet::new();

        for (agent, _, to) in &moves {
            if !targets.insert(*to) {
                trace!(position = %to, "Vertex conflict");
                return true;
            }
            if self
                .agents
                .iter()
                .any(|(other, pos)| other != agent && *pos == *to)
            {
                trace!(position = %to, "Vertex conflict with standing agent");
                return true;
            }
        }

        for (a, from_a, to_a) in &moves {
            for (b, from_b, to_b) in &moves {
                if a != b && to_a == from_b && to_b == from_a {
                    trace!(from = %from_a, to = %to_a, "Edge conflict");
                    return true;
                }
            }
        }

        false
    }

    /// Pairs of agents that would end in the same cell or swap cells.
    pub fn collisions(&self, joint: &JointAction) -> BTreeSet<AgentPair> {
        let moves = self.moves(joint);
        let mut pairs = BTreeSet::new();

        for (a, from_a, to_a) in &moves {
            for (b, from_b, to_b) in &moves {
                if a == b {
                    continue;
                }
                if to_a == to_b || (to_a == from_b && to_b == from_a) {
                    pairs.insert(AgentPair::new(*a, *b));
                }
            }
        }

        pairs
    }

    pub fn colliding_agents(&self, joint: &JointAction) -> BTreeSet<AgentId> {
        self.collisions(joint)
            .into_iter()
            .flat_map(|pair| [pair.first, pair.second])
            .collect()
    }

    /// Applies one tick of `joint` atomically.
    ///
    /// With `allow_illegal` set, bumping into a counter, trying to pick up a
    /// fixed object or merging without a recipe into a station degrades to a
    /// no-op (or a drop on a cutting station) instead of rejecting the tick.
    /// Collisions are rejected either way.
    pub fn try_perform(
        &self,
        cookbook: &Cookbook,
        joint: &JointAction,
        allow_illegal: bool,
    ) -> Option<State> {
        if self.has_collisions(joint) {
            return None;
        }

        let mut next = self.child();

        for (agent, action) in joint {
            let from = self.agent_position(*agent)?;
            if action.is_noop() {
                continue;
            }
            let to = from + action.direction();

            match self.map.get(&to) {
                None => return None,
                Some(CellKind::Empty) => {
                    if let Some(held) = next.items.remove(&from) {
                        next.items.insert(to, held);
                    }
                    next.agents.insert(*agent, to);
                }
                Some(cell) => {
                    let target = next
                        .items
                        .get(&to)
                        .or_else(|| self.map.station_at(&to))
                        .cloned();
                    let held = next.items.get(&from).cloned();

                    match (target, held) {
                        (Some(target), Some(held)) => {
                            let outcome =
                                next.try_merge(cookbook, &target, &held, from, to, allow_illegal);
                            trace!(agent = %agent, ?outcome, "Merge");
                            if !outcome.is_success() {
                                return None;
                            }
                        }
                        (Some(target), None) => {
                            if target.is_movable() {
                                next.items.remove(&to);
                                next.items.insert(from, target);
                            } else if !allow_illegal {
                                return None;
                            }
                        }
                        (None, Some(held)) => {
                            next.items.remove(&from);
                            next.items.insert(to, held);
                        }
                        (None, None) => {
                            if !(allow_illegal && cell == CellKind::Counter) {
                                return None;
                            }
                        }
                    }
                }
            }
        }

        Some(next)
    }

    fn try_merge(
        &mut self,
        cookbook: &Cookbook,
        target: &Rc<Item>,
        held: &Rc<Item>,
        from: Position,
        to: Position,
        allow_illegal: bool,
    ) -> MergeOutcome {
        if let Some(recipe) = cookbook.combine(target, held) {
            let product = recipe.product().clone();
            let outcome = if target.is_movable() {
                self.items.remove(&to);
                self.items.insert(from, product);
                MergeOutcome::Combined
            } else if target.station() == Some(StationKind::DeliveryStation) {
                self.items.remove(&from);
                self.fulfilled.insert(recipe.name().to_string());
                MergeOutcome::Delivered
            } else if target.station() == Some(StationKind::CuttingStation) {
                self.items.insert(from, product);
                MergeOutcome::Processed
            } else {
                return MergeOutcome::Failed;
            };
            self.locked_until = Some(self.timestep);
            return outcome;
        }

        match target.station() {
            Some(StationKind::CuttingStation) if allow_illegal => {
                self.items.remove(&from);
                self.items.insert(to, held.clone());
                MergeOutcome::Dropped
            }
            Some(StationKind::DeliveryStation) if allow_illegal => MergeOutcome::Ignored,
            _ => MergeOutcome::Failed,
        }
    }
}
