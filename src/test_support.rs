//! Shared fixtures for unit tests.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::infra::{AgentId, Position};
use crate::recipes::{Cookbook, Item};
use crate::state::{Map, State, parse_grid};

pub const FULL_DIVIDER: &str = "-------\n\
                                /  -  -\n\
                                /  -  -\n\
                                *  -  -\n\
                                -  -  -\n\
                                -  -  -\n\
                                -------\n";

pub const PARTIAL_DIVIDER: &str = "-------\n\
                                   /  -  -\n\
                                   /  -  -\n\
                                   *  -  -\n\
                                   -  -  -\n\
                                   -     -\n\
                                   -------\n";

pub const OPEN_DIVIDER: &str = "-------\n\
                                /     -\n\
                                /     -\n\
                                *     -\n\
                                -     -\n\
                                -     -\n\
                                -------\n";

pub fn grid(text: &str) -> Map {
    parse_grid(text.lines()).expect("test grid").0
}

/// Fluent construction of hand-made states.
pub struct StateBuilder {
    map: Map,
    items: BTreeMap<Position, Rc<Item>>,
    agents: BTreeMap<AgentId, Position>,
    goals: Vec<String>,
    timestep: usize,
}

impl StateBuilder {
    pub fn on_map(text: &str) -> Self {
        Self {
            map: grid(text),
            items: BTreeMap::new(),
            agents: BTreeMap::new(),
            goals: Vec::new(),
            timestep: 0,
        }
    }

    pub fn with_agent(mut self, id: usize, pos: (i32, i32)) -> Self {
        self.agents.insert(AgentId(id), pos.into());
        self
    }

    pub fn with_agent_holding(self, id: usize, pos: (i32, i32), item: impl Into<Item>) -> Self {
        self.with_agent(id, pos).with_item(item, pos)
    }

    pub fn with_ingredient(self, ingredient: impl Into<Item>, pos: (i32, i32)) -> Self {
        self.with_item(ingredient, pos)
    }

    pub fn with_food_item(self, name: &str, pos: (i32, i32)) -> Self {
        let product = Cookbook::compile()
            .get(name)
            .expect("known recipe")
            .product()
            .as_ref()
            .clone();
        self.with_item(product, pos)
    }

    fn with_item(mut self, item: impl Into<Item>, pos: (i32, i32)) -> Self {
        self.items.insert(pos.into(), Rc::new(item.into()));
        self
    }

    pub fn with_goal(mut self, name: &str) -> Self {
        self.goals.push(name.to_string());
        self
    }

    pub fn at_timestep(mut self, timestep: usize) -> Self {
        self.timestep = timestep;
        self
    }

    pub fn build(self) -> State {
        let cookbook = Cookbook::compile();
        let goals = self
            .goals
            .iter()
            .map(|name| cookbook.get(name).expect("known goal").clone())
            .collect();
        State::new(Rc::new(self.map), self.items, self.agents, goals).with_timestep(self.timestep)
    }
}
