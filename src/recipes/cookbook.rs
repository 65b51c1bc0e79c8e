use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use tracing::debug;

use crate::error::{KitchenError, Result};
use crate::recipes::item::{FoodItem, Ingredient, IngredientKind, Item, Properties, StationKind};
use crate::state::State;

/// A product plus the set of items it is assembled from. Recipes are
/// identified by their product name.
#[derive(Debug, Clone)]
pub struct Recipe {
    product: Rc<Item>,
    prerequisites: BTreeSet<Rc<Item>>,
}

impl Recipe {
    pub fn new(product: impl Into<Item>, prerequisites: impl IntoIterator<Item = Item>) -> Self {
        Self {
            product: Rc::new(product.into()),
            prerequisites: prerequisites.into_iter().map(Rc::new).collect(),
        }
    }

    fn from_food(food: FoodItem) -> Self {
        let prerequisites: Vec<Item> = food.ingredients().iter().cloned().map(Item::from).collect();
        Self::new(food, prerequisites)
    }

    fn delivered(food: FoodItem) -> Self {
        let mut prerequisites: Vec<Item> =
            food.ingredients().iter().cloned().map(Item::from).collect();
        prerequisites.push(StationKind::DeliveryStation.into());
        Self::new(food, prerequisites)
    }

    pub fn name(&self) -> &str {
        self.product.name()
    }

    pub fn product(&self) -> &Rc<Item> {
        &self.product
    }

    pub fn prerequisites(&self) -> &BTreeSet<Rc<Item>> {
        &self.prerequisites
    }
}

impl PartialEq for Recipe {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Recipe {}

impl Hash for Recipe {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl PartialOrd for Recipe {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Recipe {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name().cmp(other.name())
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Catalog
// ============================================================================

const VEGETABLES: [IngredientKind; 3] = [
    IngredientKind::Tomato,
    IngredientKind::Lettuce,
    IngredientKind::Onion,
];

const DELIVERABLE: [&str; 4] = [
    "PlatedCutTomato",
    "PlatedCutLettuce",
    "PlatedCutTomatoLettuce",
    "PlatedCutTomatoLettuceOnion",
];

/// Player-facing names for delivered dishes.
const SERVED_NAMES: [(&str, &str); 4] = [
    ("PlatedCutTomato", "SimpleTomato"),
    ("PlatedCutLettuce", "SimpleLettuce"),
    ("PlatedCutTomatoLettuce", "Salad"),
    ("PlatedCutTomatoLettuceOnion", "OnionSalad"),
];

fn compile_catalog() -> BTreeMap<String, Rc<Recipe>> {
    let mut recipes = Vec::new();

    for kind in VEGETABLES {
        recipes.push(Recipe::new(
            Ingredient::cut(kind),
            [
                Ingredient::raw(kind).into(),
                StationKind::CuttingStation.into(),
            ],
        ));
    }

    for mask in 1u8..(1 << VEGETABLES.len()) {
        let combo: Vec<IngredientKind> = VEGETABLES
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, kind)| *kind)
            .collect();
        let label: String = combo.iter().map(|kind| kind.name()).collect();
        let cut: Vec<Ingredient> = combo.iter().map(|kind| Ingredient::cut(*kind)).collect();

        if combo.len() > 1 {
            recipes.push(Recipe::from_food(FoodItem::new(
                format!("Cut{label}"),
                Properties::NONE,
                cut.clone(),
            )));
        }

        let plated_name = format!("PlatedCut{label}");
        let properties = if DELIVERABLE.contains(&plated_name.as_str()) {
            Properties::DELIVERABLE
        } else {
            Properties::NONE
        };
        let mut plated = cut;
        plated.push(Ingredient::plate());
        recipes.push(Recipe::from_food(FoodItem::new(plated_name, properties, plated)));
    }

    let delivered: Vec<Recipe> = recipes
        .iter()
        .filter_map(|recipe| match recipe.product().as_ref() {
            Item::Food(food) if food.properties().contains(Properties::DELIVERABLE) => {
                let name = SERVED_NAMES
                    .iter()
                    .find(|(plated, _)| *plated == food.name())
                    .map(|(_, served)| served.to_string())
                    .unwrap_or_else(|| format!("Delivered{}", food.name()));
                Some(Recipe::delivered(food.served_as(name)))
            }
            _ => None,
        })
        .collect();
    recipes.extend(delivered);

    recipes
        .into_iter()
        .map(|recipe| (recipe.name().to_string(), Rc::new(recipe)))
        .collect()
}

fn find_by_prerequisites<'a>(
    recipes: &'a BTreeMap<String, Rc<Recipe>>,
    prerequisites: &BTreeSet<Rc<Item>>,
) -> Option<&'a Rc<Recipe>> {
    recipes
        .values()
        .find(|recipe| recipe.prerequisites() == prerequisites)
}

/// Resolves one half of a split to the single item that stands for it.
fn assemble_part(recipes: &BTreeMap<String, Rc<Recipe>>, part: &[Rc<Item>]) -> Option<Rc<Item>> {
    if let [single] = part {
        return Some(single.clone());
    }

    let wanted: BTreeSet<Rc<Item>> = part.iter().cloned().collect();
    find_by_prerequisites(recipes, &wanted)
        .map(|recipe| recipe.product())
        .filter(|product| product.station().is_none())
        .cloned()
}

/// Structural merge check: what (if anything) two items combine into.
fn merge_product<'a>(
    recipes: &'a BTreeMap<String, Rc<Recipe>>,
    a: &Item,
    b: &Item,
) -> Option<&'a Rc<Recipe>> {
    let both_plated = matches!((a, b), (Item::Food(_), Item::Food(_)))
        && a.contains_plate()
        && b.contains_plate();
    if both_plated
        || a.has_property(Properties::IS_DELIVERED)
        || b.has_property(Properties::IS_DELIVERED)
    {
        return None;
    }

    let mut pieces = a.flatten();
    pieces.extend(b.flatten());
    let plates = pieces
        .iter()
        .filter(|piece| matches!(piece, Item::Ingredient(i) if i.kind() == IngredientKind::Plate))
        .count();
    if plates > 1 {
        return None;
    }

    let wanted: BTreeSet<Rc<Item>> = pieces.into_iter().map(Rc::new).collect();
    find_by_prerequisites(recipes, &wanted)
}

fn assemblable_splits(
    recipes: &BTreeMap<String, Rc<Recipe>>,
    recipe: &Recipe,
) -> Vec<(Rc<Item>, Rc<Item>)> {
    let parts: Vec<Rc<Item>> = recipe.prerequisites().iter().cloned().collect();
    let mut splits = Vec::new();

    let upper: u32 = (1 << parts.len()) - 1;
    for mask in 1..upper {
        let (left, right): (Vec<_>, Vec<_>) = parts
            .iter()
            .enumerate()
            .partition(|(i, _)| mask & (1 << i) != 0);
        let left: Vec<Rc<Item>> = left.into_iter().map(|(_, item)| item.clone()).collect();
        let right: Vec<Rc<Item>> = right.into_iter().map(|(_, item)| item.clone()).collect();

        let (Some(a), Some(b)) = (assemble_part(recipes, &left), assemble_part(recipes, &right))
        else {
            continue;
        };
        if merge_product(recipes, &a, &b).is_none() {
            continue;
        }
        splits.push((a, b));
    }

    splits
}

// ============================================================================
// Cookbook
// ============================================================================

/// Recipe catalog plus the derived "what combines into what" graph.
///
/// Built once per episode and optionally narrowed to a level with
/// [`Cookbook::prune_with_state`].
#[derive(Debug)]
pub struct Cookbook {
    recipes: BTreeMap<String, Rc<Recipe>>,
    /// Ordered item pair -> recipe name; both orders are present.
    adjacency: HashMap<(Rc<Item>, Rc<Item>), String>,
    /// Recipe name -> names of the two parts of every assemblable split.
    splits: BTreeMap<String, Vec<(String, String)>>,
    /// Item -> recipes it is a direct part of.
    consumers: HashMap<Rc<Item>, BTreeSet<String>>,
    leads_to_memo: RefCell<HashSet<(String, String)>>,
}

impl Cookbook {
    pub fn compile() -> Self {
        let recipes = compile_catalog();
        let mut adjacency = HashMap::new();
        let mut splits: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();

        for (name, recipe) in &recipes {
            for (a, b) in assemblable_splits(&recipes, recipe) {
                adjacency
                    .entry((a.clone(), b.clone()))
                    .or_insert_with(|| name.clone());
                adjacency
                    .entry((b.clone(), a.clone()))
                    .or_insert_with(|| name.clone());
                splits
                    .entry(name.clone())
                    .or_default()
                    .push((a.name().to_string(), b.name().to_string()));
            }
        }

        debug!(
            recipes = recipes.len(),
            edges = adjacency.len(),
            "Compiled recipe catalog"
        );
        Self::assemble(recipes, adjacency, splits)
    }

    fn assemble(
        recipes: BTreeMap<String, Rc<Recipe>>,
        adjacency: HashMap<(Rc<Item>, Rc<Item>), String>,
        splits: BTreeMap<String, Vec<(String, String)>>,
    ) -> Self {
        let mut consumers: HashMap<Rc<Item>, BTreeSet<String>> = HashMap::new();
        for ((a, b), name) in &adjacency {
            consumers.entry(a.clone()).or_default().insert(name.clone());
            consumers.entry(b.clone()).or_default().insert(name.clone());
        }

        Self {
            recipes,
            adjacency,
            splits,
            consumers,
            leads_to_memo: RefCell::new(HashSet::new()),
        }
    }

    pub fn recipe(&self, name: &str) -> Option<&Rc<Recipe>> {
        self.recipes.get(name)
    }

    pub fn get(&self, name: &str) -> Result<&Rc<Recipe>> {
        self.recipe(name)
            .ok_or_else(|| KitchenError::UnknownRecipe(name.to_string()))
    }

    pub fn recipes(&self) -> impl Iterator<Item = &Rc<Recipe>> {
        self.recipes.values()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// The recipe produced by combining `a` with `b`, in either order.
    pub fn combine(&self, a: &Rc<Item>, b: &Rc<Item>) -> Option<&Rc<Recipe>> {
        self.adjacency
            .get(&(a.clone(), b.clone()))
            .and_then(|name| self.recipes.get(name))
    }

    pub fn combines_to(&self, a: &Rc<Item>, b: &Rc<Item>, recipe: &Recipe) -> bool {
        self.adjacency
            .get(&(a.clone(), b.clone()))
            .is_some_and(|name| name == recipe.name())
    }

    /// Whether `item` is one of the two direct parts of some split of `recipe`.
    pub fn can_be_combined_to(&self, item: &Rc<Item>, recipe: &Recipe) -> bool {
        self.consumers
            .get(item)
            .is_some_and(|names| names.contains(recipe.name()))
    }

    pub fn splits(&self, recipe: &str) -> &[(String, String)] {
        self.splits.get(recipe).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether achieving `from` is a step towards `to`. Reflexive.
    pub fn leads_to(&self, from: &Recipe, to: &Recipe) -> bool {
        let mut visiting = HashSet::new();
        self.leads_to_inner(from.name(), to.name(), &mut visiting)
    }

    fn leads_to_inner(&self, from: &str, to: &str, visiting: &mut HashSet<String>) -> bool {
        if from == to {
            return true;
        }
        if self
            .leads_to_memo
            .borrow()
            .contains(&(from.to_string(), to.to_string()))
        {
            return true;
        }
        if !visiting.insert(from.to_string()) {
            return false;
        }

        let Some(recipe) = self.recipes.get(from) else {
            return false;
        };
        let next: Vec<String> = self
            .consumers
            .get(recipe.product())
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default();

        for consumer in next {
            if self.leads_to_inner(&consumer, to, visiting) {
                self.leads_to_memo
                    .borrow_mut()
                    .insert((from.to_string(), to.to_string()));
                return true;
            }
        }

        false
    }

    /// Drops every recipe and edge that cannot be assembled from the
    /// ingredient kinds and stations present in `state`.
    pub fn prune_with_state(&self, state: &State) -> Cookbook {
        let objects: Vec<Rc<Item>> = state.game_objects().map(|(_, item)| item.clone()).collect();
        let kinds: BTreeSet<IngredientKind> = objects
            .iter()
            .filter_map(|item| match item.as_ref() {
                Item::Ingredient(ingredient) => Some(ingredient.kind()),
                _ => None,
            })
            .collect();

        let satisfied = |item: &Rc<Item>| {
            objects.contains(item)
                || match &**item {
                    Item::Ingredient(ingredient) => kinds.contains(&ingredient.kind()),
                    Item::Food(food) => food.ingredients().iter().all(|i| kinds.contains(&i.kind())),
                    Item::Station(_) => false,
                }
        };
        let recipe_satisfied =
            |recipe: &Rc<Recipe>| recipe.prerequisites().iter().all(|item| satisfied(item));

        let adjacency = self
            .adjacency
            .iter()
            .filter(|((a, b), _)| satisfied(a) && satisfied(b))
            .map(|(key, name)| (key.clone(), name.clone()))
            .collect();
        let splits = self
            .splits
            .iter()
            .filter(|(name, _)| self.recipes.get(*name).is_some_and(|r| recipe_satisfied(r)))
            .map(|(name, parts)| (name.clone(), parts.clone()))
            .collect();
        let recipes: BTreeMap<String, Rc<Recipe>> = self
            .recipes
            .iter()
            .filter(|(_, recipe)| recipe_satisfied(*recipe))
            .map(|(name, recipe)| (name.clone(), recipe.clone()))
            .collect();

        debug!(
            kept = recipes.len(),
            dropped = self.recipes.len() - recipes.len(),
            "Pruned recipe catalog against level"
        );
        Self::assemble(recipes, adjacency, splits)
    }
}
