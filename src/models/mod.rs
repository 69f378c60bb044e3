mod message;
mod poi;
mod recipe;

pub use message::{FunctionCall, Message, ToolCall};
pub use poi::{LocationInfo, Poi, PoiBusiness, PoiPhoto, SearchResult};
pub use recipe::{Ingredient, MenuData, MenuDish, Recipe, RecipeStep, RecipeSummary};
