mod cookbook;
mod item;

pub use cookbook::{Cookbook, Recipe};
pub use item::{FoodItem, Ingredient, IngredientKind, Item, Properties, StationKind};
