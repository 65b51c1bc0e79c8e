use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::infra::{AgentId, Position};
use crate::state::{CellKind, Map};

/// Breadth-first flood fill from `start`.
///
/// Every visited cell is reachable, including counters and stations, but the
/// fill only continues through empty floor.
pub fn flood_fill(map: &Map, start: Position) -> HashSet<Position> {
    let mut reachable = HashSet::new();
    let mut queued = HashSet::new();
    let mut frontier = VecDeque::new();

    frontier.push_back(start);
    queued.insert(start);

    while let Some(current) = frontier.pop_front() {
        reachable.insert(current);

        if map.get(&current) != Some(CellKind::Empty) {
            continue;
        }

        for neighbor in current.neighbors() {
            if map.get(&neighbor).is_none() {
                continue;
            }
            if queued.insert(neighbor) {
                frontier.push_back(neighbor);
            }
        }
    }

    reachable
}

pub fn precompute_reachability(
    map: &Map,
    agents: &BTreeMap<AgentId, Position>,
) -> BTreeMap<AgentId, HashSet<Position>> {
    agents
        .iter()
        .map(|(agent, start)| (*agent, flood_fill(map, *start)))
        .collect()
}
