//! Recipe costing: per-row amounts, batch cost and cost per unit of yield.

use serde::{Deserialize, Serialize};

use crate::numbers::{lenient, round2};

/// One line of a recipe. `amount` is always `quantity * rate` to the cent;
/// the `with_*` updaters keep it that way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub ingredient: String,
    pub unit: String,
    #[serde(deserialize_with = "lenient")]
    pub quantity: f64,
    #[serde(deserialize_with = "lenient")]
    pub rate: f64,
    #[serde(deserialize_with = "lenient")]
    pub amount: f64,
}

/// Cost roll-up for one batch of a recipe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostSummary {
    pub batch_cost: f64,
    /// The divisor actually used.
    pub yield_used: f64,
    /// Set when the recipe had no yield, or one below a single unit, and the
    /// divisor was clamped to 1.
    pub yield_clamped: bool,
    pub cost_per_yield: f64,
}

pub fn ingredient_amount(quantity: f64, rate: f64) -> f64 {
    round2(quantity * rate)
}

impl Ingredient {
    pub fn new(ingredient: &str, unit: &str, quantity: f64, rate: f64) -> Self {
        Ingredient {
            ingredient: ingredient.to_string(),
            unit: unit.to_string(),
            quantity,
            rate,
            amount: ingredient_amount(quantity, rate),
        }
    }

    pub fn with_quantity(&self, quantity: f64) -> Self {
        Ingredient::new(&self.ingredient, &self.unit, quantity, self.rate)
    }

    pub fn with_rate(&self, rate: f64) -> Self {
        Ingredient::new(&self.ingredient, &self.unit, self.quantity, rate)
    }

    /// Recomputes `amount` for rows read from the backend, which may have
    /// been stored stale.
    pub fn recomputed(&self) -> Self {
        Ingredient::new(&self.ingredient, &self.unit, self.quantity, self.rate)
    }
}

pub fn batch_cost(rows: &[Ingredient]) -> f64 {
    round2(rows.iter().map(|r| r.amount).sum())
}

pub fn summarise(rows: &[Ingredient], recipe_yield: Option<f64>) -> CostSummary {
    let batch_cost = batch_cost(rows);
    let (yield_used, yield_clamped) = match recipe_yield {
        Some(y) if y >= 1.0 => (y, false),
        _ => (1.0, true),
    };
    CostSummary {
        batch_cost,
        yield_used,
        yield_clamped,
        cost_per_yield: batch_cost / yield_used,
    }
}
