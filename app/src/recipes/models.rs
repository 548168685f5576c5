use serde::{Deserialize, Serialize};

use infra::documents::DocMeta;
use infra::entity;
use infra::ids::Id;

use crate::costing::{batch_cost, summarise, CostSummary, Ingredient};
use crate::numbers::{lenient, lenient_optional};
use crate::reference::{Category, City, Restaurant};

/// A standardised preparation (sauce, juice, dough) costed per gram or
/// millilitre of output.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BaseRecipe {
    #[serde(flatten)]
    pub meta: DocMeta<BaseRecipe>,
    pub recipe_title: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(
        rename = "recipeyield",
        default,
        deserialize_with = "lenient_optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub recipe_yield: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub final_yield_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<Id<City>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant: Option<Id<Restaurant>>,
}

/// A dish as sold by one restaurant.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoodRecipe {
    #[serde(flatten)]
    pub meta: DocMeta<FoodRecipe>,
    pub city: Id<City>,
    pub restaurant: Id<Restaurant>,
    pub category: Id<Category>,
    pub recipe_name: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

/// Recipe summary line: the cost price of one dish within a category.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    #[serde(flatten)]
    pub meta: DocMeta<FoodItem>,
    pub recipe_name: String,
    #[serde(deserialize_with = "lenient")]
    pub cost_price: f64,
    pub city_id: Id<City>,
    pub restaurant_id: Id<Restaurant>,
    pub category_id: Id<Category>,
}

entity!(BaseRecipe, "baserecipe");
entity!(FoodRecipe, "recipes");
entity!(FoodItem, "restaurant/fooditems");

/// Base recipes are listed per restaurant under this key.
pub const RECIPE_RESTAURANT_KEY: &str = "restaurant";

// Stored amounts may be stale; costs are always taken from quantity and rate.
fn recomputed(rows: &[Ingredient]) -> Vec<Ingredient> {
    rows.iter().map(Ingredient::recomputed).collect()
}

impl BaseRecipe {
    pub fn summary(&self) -> CostSummary {
        summarise(&recomputed(&self.ingredients), self.recipe_yield)
    }
}

impl FoodRecipe {
    pub fn batch_cost(&self) -> f64 {
        batch_cost(&recomputed(&self.ingredients))
    }
}
