mod draft;
mod models;

pub use self::draft::{FoodItemForm, FoodRecipeDraft, IngredientForm, IngredientList, RecipeDraft};
pub use self::models::{BaseRecipe, FoodItem, FoodRecipe, RECIPE_RESTAURANT_KEY};
