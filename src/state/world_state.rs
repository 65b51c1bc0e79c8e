use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::infra::{AgentId, Position, precompute_reachability};
use crate::recipes::{Cookbook, Ingredient, Item, Recipe};
use crate::state::{CellKind, Map};

/// Immutable snapshot of one kitchen tick.
///
/// Two states are equal when items and agents sit in the same places; the
/// timestep, fulfilled recipes and lock marker are ignored so that search can
/// collapse states reached along different paths.
#[derive(Debug, Clone)]
pub struct State {
    pub(super) timestep: usize,
    pub(super) map: Rc<Map>,
    /// Placed and held items. An item at an agent's position is held by it.
    pub(super) items: BTreeMap<Position, Rc<Item>>,
    pub(super) agents: BTreeMap<AgentId, Position>,
    pub(super) reachability: Rc<BTreeMap<AgentId, HashSet<Position>>>,
    pub(super) fulfilled: BTreeSet<String>,
    pub(super) goals: Rc<[Rc<Recipe>]>,
    pub(super) locked_until: Option<usize>,
}

impl State {
    pub fn new(
        map: Rc<Map>,
        items: BTreeMap<Position, Rc<Item>>,
        agents: BTreeMap<AgentId, Position>,
        goals: Vec<Rc<Recipe>>,
    ) -> Self {
        let reachability = Rc::new(precompute_reachability(&map, &agents));
        Self {
            timestep: 0,
            map,
            items,
            agents,
            reachability,
            fulfilled: BTreeSet::new(),
            goals: goals.into(),
            locked_until: None,
        }
    }

    pub fn with_timestep(mut self, timestep: usize) -> Self {
        self.timestep = timestep;
        self
    }

    pub fn with_fulfilled(mut self, recipe: &Recipe) -> Self {
        self.fulfilled.insert(recipe.name().to_string());
        self
    }

    pub fn timestep(&self) -> usize {
        self.timestep
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn cell(&self, pos: &Position) -> Option<CellKind> {
        self.map.get(pos)
    }

    pub fn items(&self) -> &BTreeMap<Position, Rc<Item>> {
        &self.items
    }

    pub fn item_at(&self, pos: &Position) -> Option<&Rc<Item>> {
        self.items.get(pos)
    }

    pub fn agents(&self) -> &BTreeMap<AgentId, Position> {
        &self.agents
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.agents.keys().copied()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn agent_position(&self, agent: AgentId) -> Option<Position> {
        self.agents.get(&agent).copied()
    }

    pub fn held_item(&self, agent: AgentId) -> Option<&Rc<Item>> {
        self.agents.get(&agent).and_then(|pos| self.items.get(pos))
    }

    pub fn reachable(&self, agent: AgentId) -> Option<&HashSet<Position>> {
        self.reachability.get(&agent)
    }

    pub fn goals(&self) -> &[Rc<Recipe>] {
        &self.goals
    }

    pub fn fulfilled(&self) -> &BTreeSet<String> {
        &self.fulfilled
    }

    pub fn locked_until(&self) -> Option<usize> {
        self.locked_until
    }

    /// Items followed by the fixed stations, each with its position.
    pub fn game_objects(&self) -> impl Iterator<Item = (Position, &Rc<Item>)> {
        self.items
            .iter()
            .map(|(pos, item)| (*pos, item))
            .chain(self.map.stations().iter().map(|(pos, item)| (*pos, item)))
    }

    pub fn ingredients(&self) -> impl Iterator<Item = &Ingredient> {
        self.items.values().filter_map(|item| match item.as_ref() {
            Item::Ingredient(ingredient) => Some(ingredient),
            _ => None,
        })
    }

    /// Counters with nothing on them.
    pub fn free_counters(&self) -> impl Iterator<Item = Position> + '_ {
        self.map
            .positions_of(CellKind::Counter)
            .iter()
            .copied()
            .filter(|pos| !self.items.contains_key(pos))
    }

    /// Copy one tick later. The lock marker is inherited.
    pub fn child(&self) -> State {
        let mut child = self.clone();
        child.timestep += 1;
        child
    }

    pub fn is_recipe_fulfilled(&self, recipe: &Recipe) -> bool {
        self.fulfilled.contains(recipe.name())
            || self
                .game_objects()
                .any(|(_, item)| item == recipe.product())
    }

    pub fn is_goal_state(&self) -> bool {
        self.goals.iter().all(|goal| self.is_recipe_fulfilled(goal))
    }

    pub fn without_agent(&self, agent: AgentId, remove_held_item: bool) -> State {
        let mut copy = self.clone();
        if let Some(pos) = copy.agents.remove(&agent)
            && remove_held_item
        {
            copy.items.remove(&pos);
        }
        copy
    }

    pub fn can_any_agent_reach(&self, part: &str) -> bool {
        self.agents
            .keys()
            .any(|agent| self.can_agent_reach(part, *agent))
    }

    pub fn can_agent_reach(&self, part: &str, agent: AgentId) -> bool {
        let Some(reachable) = self.reachability.get(&agent) else {
            return false;
        };
        self.game_objects()
            .filter(|(_, item)| item.name() == part)
            .any(|(pos, _)| reachable.contains(&pos))
    }

    /// Whether `recipe` is fulfilled, present, or can still be assembled
    /// from what is in the kitchen.
    pub fn recipe_is_possible(&self, cookbook: &Cookbook, recipe: &Recipe) -> bool {
        if self.is_recipe_fulfilled(recipe) {
            return true;
        }

        let part_available = |part: &str| {
            self.game_objects().any(|(_, item)| item.name() == part)
                || cookbook
                    .recipe(part)
                    .is_some_and(|sub| self.recipe_is_possible(cookbook, sub))
        };

        cookbook
            .splits(recipe.name())
            .iter()
            .any(|(a, b)| part_available(a) && part_available(b))
    }

    pub fn all_goals_possible(&self, cookbook: &Cookbook) -> bool {
        self.goals
            .iter()
            .all(|goal| self.recipe_is_possible(cookbook, goal))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items && self.agents == other.agents
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.items.hash(state);
        self.agents.hash(state);
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.map.width as usize;
        let mut chars: Vec<char> = self.map.iter().map(|(_, kind)| kind.symbol()).collect();
        let index = |pos: &Position| pos.y as usize * width + pos.x as usize;

        let mut placeholder = 'A';
        let mut food_labels = Vec::new();
        for (pos, item) in &self.items {
            match item.as_ref() {
                Item::Ingredient(ingredient) => {
                    let symbol = ingredient.kind().symbol();
                    chars[index(pos)] = if ingredient.is_cut() {
                        symbol.to_ascii_uppercase()
                    } else {
                        symbol
                    };
                }
                Item::Food(food) => {
                    chars[index(pos)] = placeholder;
                    food_labels.push((*pos, placeholder, food.name()));
                    placeholder = (placeholder as u8 + 1) as char;
                }
                Item::Station(_) => {}
            }
        }

        let holder = |pos: &Position| self.agents.iter().find(|(_, p)| *p == pos).map(|(a, _)| *a);
        for (agent, pos) in &self.agents {
            chars[index(pos)] = char::from_digit((agent.index() % 10) as u32, 10).unwrap_or('?');
        }

        writeln!(f, "Time Step: {}", self.timestep)?;
        for (pos, item) in &self.items {
            if let (Item::Ingredient(ingredient), Some(agent)) = (item.as_ref(), holder(pos)) {
                writeln!(f, "{} is holding {}", agent, ingredient.name())?;
            }
        }
        for (pos, label, name) in food_labels {
            match holder(&pos) {
                Some(agent) => writeln!(f, "{} is holding {}", agent, name)?,
                None => writeln!(f, "{} is {}", label, name)?,
            }
        }

        let header: String = (0..width).map(|x| x.to_string()).collect();
        writeln!(f, " {header}")?;
        for (y, row) in chars.chunks(width.max(1)).enumerate() {
            let line: String = row.iter().collect();
            writeln!(f, "{y}{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::IngredientKind;
    use crate::test_support::{FULL_DIVIDER, OPEN_DIVIDER, StateBuilder};

    #[test]
    fn test_equality_ignores_timestep_and_fulfilled() {
        let a = StateBuilder::on_map(FULL_DIVIDER)
            .with_agent(0, (1, 1))
            .with_ingredient(Ingredient::plate(), (3, 2))
            .build();
        let b = a.child().child();

        assert_eq!(a, b);
        assert_ne!(a.timestep(), b.timestep());

        let moved = StateBuilder::on_map(FULL_DIVIDER)
            .with_agent(0, (2, 1))
            .with_ingredient(Ingredient::plate(), (3, 2))
            .build();
        assert_ne!(a, moved);
    }

    #[test]
    fn test_hash_agrees_with_equality() {
        use std::collections::hash_map::DefaultHasher;

        fn hash_of(state: &State) -> u64 {
            let mut hasher = DefaultHasher::new();
            state.hash(&mut hasher);
            hasher.finish()
        }

        let a = StateBuilder::on_map(FULL_DIVIDER)
            .with_agent(0, (1, 1))
            .with_ingredient(Ingredient::raw(IngredientKind::Tomato), (3, 1))
            .build();
        let later = a.child();

        let set: HashSet<State> = [a.clone(), later.clone()].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert!(set.contains(&later));
        assert_eq!(hash_of(&a), hash_of(&a.clone()));
        assert_eq!(hash_of(&a), hash_of(&later));
    }

    #[test]
    fn test_held_item_is_item_at_agent_position() {
        let state = StateBuilder::on_map(FULL_DIVIDER)
            .with_agent_holding(0, (1, 1), Ingredient::raw(IngredientKind::Tomato))
            .build();

        let held = state.held_item(AgentId(0)).map(|item| item.name().to_string());
        assert_eq!(held.as_deref(), Some("TomatoMovableCuttable"));
        assert!(state.held_item(AgentId(1)).is_none());
    }

    #[test]
    fn test_game_objects_include_stations() {
        let state = StateBuilder::on_map(FULL_DIVIDER)
            .with_agent(0, (1, 1))
            .with_ingredient(Ingredient::plate(), (3, 2))
            .build();

        let names: Vec<&str> = state.game_objects().map(|(_, item)| item.name()).collect();
        assert_eq!(
            names,
            vec!["PlateMovable", "CuttingStation", "CuttingStation", "DeliveryStation"]
        );
    }

    #[test]
    fn test_reachability_queries() {
        let state = StateBuilder::on_map(FULL_DIVIDER)
            .with_agent(0, (1, 1))
            .with_agent(1, (4, 1))
            .with_ingredient(Ingredient::raw(IngredientKind::Tomato), (6, 1))
            .with_ingredient(Ingredient::plate(), (3, 2))
            .build();

        assert!(state.can_agent_reach("TomatoMovableCuttable", AgentId(1)));
        assert!(!state.can_agent_reach("TomatoMovableCuttable", AgentId(0)));
        assert!(state.can_agent_reach("PlateMovable", AgentId(0)), "divider is shared");
        assert!(state.can_agent_reach("DeliveryStation", AgentId(0)));
        assert!(!state.can_agent_reach("DeliveryStation", AgentId(1)));

        let alone = state.without_agent(AgentId(0), false);
        assert!(!alone.can_any_agent_reach("DeliveryStation"));
        assert!(alone.can_any_agent_reach("TomatoMovableCuttable"));
    }

    #[test]
    fn test_without_agent_can_drop_held_item() {
        let state = StateBuilder::on_map(OPEN_DIVIDER)
            .with_agent_holding(0, (1, 1), Ingredient::plate())
            .with_agent(1, (4, 1))
            .build();

        assert_eq!(state.without_agent(AgentId(0), false).items().len(), 1);
        assert!(state.without_agent(AgentId(0), true).items().is_empty());
        assert_eq!(state.without_agent(AgentId(0), true).agent_count(), 1);
    }

    #[test]
    fn test_recipe_is_possible() {
        let state = StateBuilder::on_map(OPEN_DIVIDER)
            .with_agent(0, (1, 1))
            .with_ingredient(Ingredient::raw(IngredientKind::Tomato), (6, 1))
            .with_ingredient(Ingredient::plate(), (6, 2))
            .with_goal("SimpleTomato")
            .build();
        let cookbook = Cookbook::compile();

        assert!(state.recipe_is_possible(&cookbook, cookbook.get("SimpleTomato").unwrap()));
        assert!(state.recipe_is_possible(&cookbook, cookbook.get("TomatoMovableIsCut").unwrap()));
        assert!(!state.recipe_is_possible(&cookbook, cookbook.get("Salad").unwrap()));
        assert!(state.all_goals_possible(&cookbook));

        let no_plate = StateBuilder::on_map(OPEN_DIVIDER)
            .with_agent(0, (1, 1))
            .with_ingredient(Ingredient::raw(IngredientKind::Tomato), (6, 1))
            .build();
        assert!(!no_plate.recipe_is_possible(&cookbook, cookbook.get("SimpleTomato").unwrap()));
        assert!(no_plate.recipe_is_possible(&cookbook, cookbook.get("TomatoMovableIsCut").unwrap()));
    }

    #[test]
    fn test_fulfilled_recipe_counts_as_possible() {
        let cookbook = Cookbook::compile();
        let salad = cookbook.get("Salad").unwrap();
        let state = StateBuilder::on_map(OPEN_DIVIDER)
            .with_agent(0, (1, 1))
            .build()
            .with_fulfilled(salad);

        assert!(state.is_recipe_fulfilled(salad));
        assert!(state.recipe_is_possible(&cookbook, salad));
    }

    #[test]
    fn test_display_renders_items_and_agents() {
        let state = StateBuilder::on_map(FULL_DIVIDER)
            .with_agent_holding(0, (1, 1), Ingredient::cut(IngredientKind::Tomato))
            .with_ingredient(Ingredient::plate(), (3, 2))
            .build();
        let rendered = state.to_string();

        assert!(rendered.starts_with("Time Step: 0\n"));
        assert!(rendered.contains("0 is holding TomatoMovableIsCut"));
        assert!(rendered.contains(" 0123456\n"));
        assert!(rendered.contains("1/0 -  -\n"), "agent drawn over its item:\n{}", rendered);
        assert!(rendered.contains("2/  p  -\n"));
    }
}
