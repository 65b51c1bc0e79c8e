use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use tracing::{debug, info};

use crate::error::{KitchenError, Result};
use crate::infra::{AgentId, Position};
use crate::recipes::{Cookbook, Ingredient, IngredientKind, Item};
use crate::state::{CellKind, Map, State};

/// Initial state of a level together with the catalog pruned against it.
#[derive(Debug)]
pub struct LoadedLevel {
    pub state: State,
    pub cookbook: Rc<Cookbook>,
}

pub fn load_level(path: impl AsRef<Path>, agent_count: usize) -> Result<LoadedLevel> {
    let path = path.as_ref();
    info!(path = %path.display(), agent_count, "Loading level");
    let text = fs::read_to_string(path)?;
    parse_level(&text, agent_count)
}

/// Parses the grid section of a level. Letters are counters holding a raw
/// ingredient.
pub fn parse_grid<'a>(
    lines: impl IntoIterator<Item = &'a str>,
) -> Result<(Map, BTreeMap<Position, Rc<Item>>)> {
    let mut cells = Vec::new();
    let mut items = BTreeMap::new();
    let mut width = 0;
    let mut height = 0;

    for (y, line) in lines.into_iter().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            break;
        }
        if height > 0 && line.chars().count() != width {
            return Err(KitchenError::Level {
                line: y + 1,
                message: format!("expected {} columns, found {}", width, line.chars().count()),
            });
        }

        for (x, c) in line.chars().enumerate() {
            let kind = match (CellKind::from_symbol(c), IngredientKind::from_symbol(c)) {
                (Some(kind), _) => kind,
                (None, Some(ingredient)) => {
                    items.insert(
                        Position::new(x as i32, y as i32),
                        Rc::new(Item::from(Ingredient::raw(ingredient))),
                    );
                    CellKind::Counter
                }
                (None, None) => {
                    return Err(KitchenError::Level {
                        line: y + 1,
                        message: format!("unknown cell '{c}'"),
                    });
                }
            };
            cells.push(kind);
        }

        width = line.chars().count();
        height += 1;
    }

    if height == 0 {
        return Err(KitchenError::Level {
            line: 1,
            message: "level has no grid".to_string(),
        });
    }

    Ok((Map::new(width as i32, height as i32, cells), items))
}

fn parse_agent(line: &str, line_number: usize) -> Result<Position> {
    let invalid = || KitchenError::Level {
        line: line_number,
        message: format!("expected 'x y', found '{}'", line.trim()),
    };
    let mut parts = line.split_whitespace().map(str::parse::<i32>);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(x)), Some(Ok(y)), None) => Ok(Position::new(x, y)),
        _ => Err(invalid()),
    }
}

/// Grid, blank line, goal recipe names, blank line, agent start positions.
/// Only the first `agent_count` agent lines are used.
pub fn parse_level(text: &str, agent_count: usize) -> Result<LoadedLevel> {
    let lines: Vec<&str> = text.lines().map(|l| l.trim_end_matches('\r')).collect();
    let (map, items) = parse_grid(lines.iter().copied())?;
    let mut cursor = map.height as usize + 1;

    let cookbook = Cookbook::compile();
    let mut goals = Vec::new();
    while let Some(line) = lines.get(cursor).filter(|l| !l.trim().is_empty()) {
        let recipe = cookbook.get(line.trim()).map_err(|_| KitchenError::Level {
            line: cursor + 1,
            message: format!("unknown goal recipe '{}'", line.trim()),
        })?;
        goals.push(recipe.clone());
        cursor += 1;
    }
    cursor += 1;

    let mut agents = BTreeMap::new();
    while agents.len() < agent_count {
        let Some(line) = lines.get(cursor).filter(|l| !l.trim().is_empty()) else {
            return Err(KitchenError::Level {
                line: cursor + 1,
                message: format!(
                    "level defines {} agent(s), {} requested",
                    agents.len(),
                    agent_count
                ),
            });
        };
        let pos = parse_agent(line, cursor + 1)?;
        if map.get(&pos) != Some(CellKind::Empty) {
            return Err(KitchenError::Level {
                line: cursor + 1,
                message: format!("agent start {pos} is not on empty floor"),
            });
        }
        agents.insert(AgentId(agents.len()), pos);
        cursor += 1;
    }

    let state = State::new(Rc::new(map), items, agents, goals);
    let cookbook = Rc::new(cookbook.prune_with_state(&state));
    debug!(
        goals = state.goals().len(),
        items = state.items().len(),
        recipes = cookbook.len(),
        "Level ready"
    );

    Ok(LoadedLevel { state, cookbook })
}
