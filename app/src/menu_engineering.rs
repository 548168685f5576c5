//! Menu engineering: profitability and popularity of each menu item, bucketed
//! against thresholds. Nothing derived here is ever stored.

use std::fmt;

use anyhow::{Context, Result};
use log::*;
use serde::{Deserialize, Serialize};

use infra::documents::DocMeta;
use infra::entity;
use infra::ids::Id;
use infra::persistence::Filter;

use crate::crud::Form;
use crate::errors::ValidationError;
use crate::numbers::{lenient, parse_amount, round2};
use crate::reference::{City, Restaurant, RESTAURANT_KEY};
use crate::services::{List, Queryable};

/// Items earning less than this per unit sold are low profit.
pub const PROFIT_THRESHOLD: f64 = 50.0;
/// Items below this popularity percentage are low popularity.
pub const POPULARITY_THRESHOLD: f64 = 30.0;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    pub profit: f64,
    pub popularity: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            profit: PROFIT_THRESHOLD,
            popularity: POPULARITY_THRESHOLD,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Strictly below the threshold is `Low`.
    fn against(value: f64, threshold: f64) -> Self {
        if value < threshold {
            Level::Low
        } else {
            Level::High
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Level::Low => write!(fmt, "Low"),
            Level::High => write!(fmt, "High"),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    #[serde(flatten)]
    pub meta: DocMeta<MenuItem>,
    pub menu_item: String,
    #[serde(deserialize_with = "lenient")]
    pub sold: f64,
    #[serde(deserialize_with = "lenient")]
    pub popularity: f64,
    #[serde(deserialize_with = "lenient")]
    pub cost_price: f64,
    #[serde(deserialize_with = "lenient")]
    pub selling_price: f64,
    #[serde(default)]
    pub menu_item_class: String,
    #[serde(default, alias = "city", skip_serializing_if = "Option::is_none")]
    pub city_id: Option<Id<City>>,
    #[serde(default, alias = "restaurant", skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<Id<Restaurant>>,
}

entity!(MenuItem, "menu");

/// A menu item with its analysis. Money values are to the cent.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineeredItem {
    #[serde(flatten)]
    pub item: MenuItem,
    pub profit: f64,
    pub total_cost: f64,
    pub total_revenue: f64,
    pub cost_percentage: f64,
    pub total_profit: f64,
    pub profit_category: Level,
    pub popularity_category: Level,
}

pub fn classify(item: &MenuItem, thresholds: &Thresholds) -> EngineeredItem {
    let profit = item.selling_price - item.cost_price;
    let total_cost = item.cost_price * item.sold;
    let total_revenue = item.selling_price * item.sold;
    let cost_percentage = if total_revenue == 0.0 {
        0.0
    } else {
        total_cost / total_revenue * 100.0
    };
    EngineeredItem {
        item: item.clone(),
        profit: round2(profit),
        total_cost: round2(total_cost),
        total_revenue: round2(total_revenue),
        cost_percentage: round2(cost_percentage),
        total_profit: round2(total_revenue - total_cost),
        profit_category: Level::against(profit, thresholds.profit),
        popularity_category: Level::against(item.popularity, thresholds.popularity),
    }
}

pub fn classify_all(items: &[MenuItem], thresholds: &Thresholds) -> Vec<EngineeredItem> {
    items.iter().map(|i| classify(i, thresholds)).collect()
}

/// Fetches a restaurant's menu and classifies it.
pub fn engineer<B>(
    backend: &B,
    restaurant: &Id<Restaurant>,
    thresholds: &Thresholds,
) -> Result<Vec<EngineeredItem>>
where
    B: Queryable<List<MenuItem>>,
{
    let req = List::matching(Filter::by(RESTAURANT_KEY, restaurant));
    let items = backend
        .query(req)
        .with_context(|| format!("menu for restaurant {}", restaurant))?;
    debug!("Classifying {} menu items with {:?}", items.len(), thresholds);
    Ok(classify_all(&items, thresholds))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuItemForm {
    pub city_id: Option<Id<City>>,
    pub restaurant_id: Option<Id<Restaurant>>,
    pub menu_item: String,
    pub sold: String,
    pub popularity: String,
    pub cost_price: String,
    pub selling_price: String,
    pub menu_item_class: String,
}

impl Form for MenuItemForm {
    type Record = MenuItem;

    fn to_record(&self) -> Result<MenuItem, ValidationError> {
        let fields = [
            &self.menu_item,
            &self.sold,
            &self.popularity,
            &self.cost_price,
            &self.selling_price,
            &self.menu_item_class,
        ];
        let (city_id, restaurant_id) = match (&self.city_id, &self.restaurant_id) {
            (Some(c), Some(r)) if fields.iter().all(|f| !f.trim().is_empty()) => (c, r),
            _ => return Err(ValidationError::Incomplete("All fields are required")),
        };
        Ok(MenuItem {
            meta: DocMeta::default(),
            menu_item: self.menu_item.trim().to_string(),
            sold: parse_amount("Sold", &self.sold)?,
            popularity: parse_amount("Popularity", &self.popularity)?,
            cost_price: parse_amount("Cost Price", &self.cost_price)?,
            selling_price: parse_amount("Selling Price", &self.selling_price)?,
            menu_item_class: self.menu_item_class.trim().to_string(),
            city_id: Some(city_id.clone()),
            restaurant_id: Some(restaurant_id.clone()),
        })
    }

    fn with_record(&self, record: &MenuItem) -> Self {
        MenuItemForm {
            city_id: record.city_id.clone(),
            restaurant_id: record.restaurant_id.clone(),
            menu_item: record.menu_item.clone(),
            sold: record.sold.to_string(),
            popularity: record.popularity.to_string(),
            cost_price: record.cost_price.to_string(),
            selling_price: record.selling_price.to_string(),
            menu_item_class: record.menu_item_class.clone(),
        }
    }

    /// Keeps the selected restaurant for the next entry.
    fn reset(&self) -> Self {
        MenuItemForm {
            city_id: self.city_id.clone(),
            restaurant_id: self.restaurant_id.clone(),
            ..MenuItemForm::default()
        }
    }
}
