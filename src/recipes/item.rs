use std::collections::BTreeSet;
use std::fmt;
use std::ops::{BitAnd, BitOr};

/// Bit-set of item properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Properties(u8);

impl Properties {
    pub const NONE: Properties = Properties(0);
    pub const MOVABLE: Properties = Properties(1);
    pub const CUTTABLE: Properties = Properties(2);
    pub const IS_CUT: Properties = Properties(4);
    pub const DELIVERABLE: Properties = Properties(8);
    pub const IS_DELIVERED: Properties = Properties(16);

    const NAMED: [(Properties, &'static str); 5] = [
        (Properties::MOVABLE, "Movable"),
        (Properties::CUTTABLE, "Cuttable"),
        (Properties::IS_CUT, "IsCut"),
        (Properties::DELIVERABLE, "Deliverable"),
        (Properties::IS_DELIVERED, "IsDelivered"),
    ];

    pub fn contains(self, other: Properties) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn without(self, other: Properties) -> Properties {
        Properties(self.0 & !other.0)
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMED
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
    }
}

impl BitOr for Properties {
    type Output = Properties;

    fn bitor(self, other: Properties) -> Properties {
        Properties(self.0 | other.0)
    }
}

impl BitAnd for Properties {
    type Output = Properties;

    fn bitand(self, other: Properties) -> Properties {
        Properties(self.0 & other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IngredientKind {
    Plate,
    Tomato,
    Onion,
    Lettuce,
}

impl IngredientKind {
    pub fn name(self) -> &'static str {
        match self {
            IngredientKind::Plate => "Plate",
            IngredientKind::Tomato => "Tomato",
            IngredientKind::Onion => "Onion",
            IngredientKind::Lettuce => "Lettuce",
        }
    }

    pub fn symbol(self) -> char {
        match self {
            IngredientKind::Plate => 'p',
            IngredientKind::Tomato => 't',
            IngredientKind::Onion => 'o',
            IngredientKind::Lettuce => 'l',
        }
    }

    pub fn from_symbol(c: char) -> Option<IngredientKind> {
        match c {
            'p' => Some(IngredientKind::Plate),
            't' => Some(IngredientKind::Tomato),
            'o' => Some(IngredientKind::Onion),
            'l' => Some(IngredientKind::Lettuce),
            _ => None,
        }
    }
}

/// Raw or processed ingredient. The name is derived from kind and
/// properties, so equal names mean interchangeable ingredients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ingredient {
    kind: IngredientKind,
    properties: Properties,
    name: String,
}

impl Ingredient {
    pub fn new(kind: IngredientKind, properties: Properties) -> Self {
        let mut name = kind.name().to_string();
        name.extend(properties.names());
        Self {
            kind,
            properties,
            name,
        }
    }

    pub fn plate() -> Self {
        Self::new(IngredientKind::Plate, Properties::MOVABLE)
    }

    pub fn raw(kind: IngredientKind) -> Self {
        match kind {
            IngredientKind::Plate => Self::plate(),
            _ => Self::new(kind, Properties::MOVABLE | Properties::CUTTABLE),
        }
    }

    pub fn cut(kind: IngredientKind) -> Self {
        Self::new(kind, Properties::MOVABLE | Properties::IS_CUT)
    }

    pub fn kind(&self) -> IngredientKind {
        self.kind
    }

    pub fn properties(&self) -> Properties {
        self.properties
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_cut(&self) -> bool {
        self.properties.contains(Properties::IS_CUT)
    }
}

/// Composite of several ingredients, always movable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FoodItem {
    name: String,
    ingredients: BTreeSet<Ingredient>,
    properties: Properties,
}

impl FoodItem {
    pub fn new(
        name: impl Into<String>,
        properties: Properties,
        ingredients: impl IntoIterator<Item = Ingredient>,
    ) -> Self {
        Self {
            name: name.into(),
            ingredients: ingredients.into_iter().collect(),
            properties: properties | Properties::MOVABLE,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> Properties {
        self.properties
    }

    pub fn ingredients(&self) -> &BTreeSet<Ingredient> {
        &self.ingredients
    }

    pub fn has_ingredient(&self, kind: IngredientKind) -> bool {
        self.ingredients.iter().any(|i| i.kind == kind)
    }

    /// The delivered form of this dish under its player-facing name.
    pub fn served_as(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: (self.properties | Properties::IS_DELIVERED).without(Properties::DELIVERABLE),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StationKind {
    CuttingStation,
    DeliveryStation,
}

impl StationKind {
    pub fn name(self) -> &'static str {
        match self {
            StationKind::CuttingStation => "CuttingStation",
            StationKind::DeliveryStation => "DeliveryStation",
        }
    }
}

/// Anything that can take part in a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Item {
    Ingredient(Ingredient),
    Food(FoodItem),
    Station(StationKind),
}

impl Item {
    pub fn name(&self) -> &str {
        match self {
            Item::Ingredient(ingredient) => ingredient.name(),
            Item::Food(food) => food.name(),
            Item::Station(kind) => kind.name(),
        }
    }

    pub fn properties(&self) -> Properties {
        match self {
            Item::Ingredient(ingredient) => ingredient.properties(),
            Item::Food(food) => food.properties(),
            Item::Station(_) => Properties::NONE,
        }
    }

    pub fn has_property(&self, property: Properties) -> bool {
        self.properties().contains(property)
    }

    pub fn is_movable(&self) -> bool {
        self.has_property(Properties::MOVABLE)
    }

    pub fn station(&self) -> Option<StationKind> {
        match self {
            Item::Station(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn contains_plate(&self) -> bool {
        match self {
            Item::Ingredient(ingredient) => ingredient.kind() == IngredientKind::Plate,
            Item::Food(food) => food.has_ingredient(IngredientKind::Plate),
            Item::Station(_) => false,
        }
    }

    /// The prerequisite-level pieces this item stands for: a food item
    /// expands to its ingredients, everything else to itself.
    pub fn flatten(&self) -> Vec<Item> {
        match self {
            Item::Food(food) => food
                .ingredients()
                .iter()
                .cloned()
                .map(Item::Ingredient)
                .collect(),
            other => vec![other.clone()],
        }
    }
}

impl From<Ingredient> for Item {
    fn from(ingredient: Ingredient) -> Self {
        Item::Ingredient(ingredient)
    }
}

impl From<FoodItem> for Item {
    fn from(food: FoodItem) -> Self {
        Item::Food(food)
    }
}

impl From<StationKind> for Item {
    fn from(kind: StationKind) -> Self {
        Item::Station(kind)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredient_names_follow_kind_and_properties() {
        assert_eq!(Ingredient::plate().name(), "PlateMovable");
        assert_eq!(
            Ingredient::raw(IngredientKind::Tomato).name(),
            "TomatoMovableCuttable"
        );
        assert_eq!(
            Ingredient::cut(IngredientKind::Lettuce).name(),
            "LettuceMovableIsCut"
        );
    }

    #[test]
    fn test_structurally_equal_items_are_equal() {
        let a = Item::from(Ingredient::cut(IngredientKind::Onion));
        let b = Item::from(Ingredient::new(
            IngredientKind::Onion,
            Properties::IS_CUT | Properties::MOVABLE,
        ));
        assert_eq!(a, b);
        assert_ne!(a, Item::from(Ingredient::raw(IngredientKind::Onion)));
    }

    #[test]
    fn test_food_item_is_always_movable() {
        let food = FoodItem::new(
            "CutTomatoLettuce",
            Properties::NONE,
            [
                Ingredient::cut(IngredientKind::Tomato),
                Ingredient::cut(IngredientKind::Lettuce),
            ],
        );
        assert!(Item::from(food.clone()).is_movable());
        assert!(!food.has_ingredient(IngredientKind::Plate));
        assert_eq!(Item::from(food).flatten().len(), 2);
    }

    #[test]
    fn test_served_dish_is_delivered_and_no_longer_deliverable() {
        let plated = FoodItem::new(
            "PlatedCutTomato",
            Properties::DELIVERABLE,
            [Ingredient::plate(), Ingredient::cut(IngredientKind::Tomato)],
        );
        let served = plated.served_as("SimpleTomato");

        assert_eq!(served.name(), "SimpleTomato");
        assert!(served.properties().contains(Properties::IS_DELIVERED));
        assert!(!served.properties().contains(Properties::DELIVERABLE));
        assert_eq!(served.ingredients(), plated.ingredients());
    }

    #[test]
    fn test_stations_have_no_properties() {
        let station = Item::from(StationKind::CuttingStation);
        assert!(!station.is_movable());
        assert_eq!(station.name(), "CuttingStation");
        assert_eq!(station.flatten(), vec![station.clone()]);
    }
}
