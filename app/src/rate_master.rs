//! Rate master: purchase rates normalised into the per-unit, yield-adjusted
//! rates that recipes are costed with.

use serde::{Deserialize, Serialize};

use infra::documents::DocMeta;
use infra::entity;
use infra::ids::Id;

use crate::crud::Form;
use crate::errors::ValidationError;
use crate::numbers::{lenient, lenient_optional, parse_amount, parse_optional, round2};
use crate::reference::{City, Restaurant};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RateMasterEntry {
    #[serde(flatten)]
    pub meta: DocMeta<RateMasterEntry>,
    #[serde(alias = "city")]
    pub city_id: Id<City>,
    #[serde(alias = "restaurant")]
    pub restaurant_id: Id<Restaurant>,
    pub system_item_name: String,
    pub recipe_item_name: String,
    pub unit: String,
    #[serde(deserialize_with = "lenient")]
    pub purchase_rate: f64,
    #[serde(rename = "packingUOM", deserialize_with = "lenient")]
    pub packing_uom: f64,
    #[serde(default, deserialize_with = "lenient_optional")]
    pub conversion: Option<f64>,
    #[serde(rename = "yield", deserialize_with = "lenient")]
    pub item_yield: f64,
    #[serde(default, deserialize_with = "lenient_optional")]
    pub yield_final_rate: Option<f64>,
    #[serde(default)]
    pub category: String,
}

entity!(RateMasterEntry, "ratemasterentry");

/// How the yield-adjusted rate is computed from the conversion.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// From the conversion as displayed, already rounded to cents.
    Chained,
    /// From the unrounded conversion; only the results are rounded.
    FullPrecision,
}

impl Default for Rounding {
    fn default() -> Self {
        Rounding::Chained
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Derived {
    pub conversion: Option<f64>,
    pub yield_final_rate: Option<f64>,
}

/// conversion = purchase_rate / packing_uom and
/// yield_final_rate = conversion * 100 / yield, both to the cent. A zero
/// divisor leaves the affected values blank.
pub fn derive(
    purchase_rate: f64,
    packing_uom: f64,
    item_yield: f64,
    rounding: Rounding,
) -> Derived {
    if packing_uom == 0.0 {
        return Derived::default();
    }
    let exact = purchase_rate / packing_uom;
    let conversion = round2(exact);
    let base = match rounding {
        Rounding::Chained => conversion,
        Rounding::FullPrecision => exact,
    };
    let yield_final_rate = if item_yield == 0.0 {
        None
    } else {
        Some(round2(base * 100.0 / item_yield))
    };
    Derived {
        conversion: Some(conversion),
        yield_final_rate,
    }
}

impl RateMasterEntry {
    /// Derived values as they should be for the stored inputs.
    pub fn rederived(&self, rounding: Rounding) -> Self {
        let d = derive(self.purchase_rate, self.packing_uom, self.item_yield, rounding);
        RateMasterEntry {
            conversion: d.conversion,
            yield_final_rate: d.yield_final_rate,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    SystemItemName,
    RecipeItemName,
    Unit,
    PurchaseRate,
    PackingUom,
    Yield,
    Category,
}

/// The entry form, as typed. Derived values follow the numeric inputs on
/// every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateMasterForm {
    pub city_id: Option<Id<City>>,
    pub restaurant_id: Option<Id<Restaurant>>,
    pub system_item_name: String,
    pub recipe_item_name: String,
    pub unit: String,
    pub purchase_rate: String,
    pub packing_uom: String,
    pub item_yield: String,
    pub category: String,
    pub derived: Derived,
    pub rounding: Rounding,
}

impl RateMasterForm {
    pub fn new(rounding: Rounding) -> Self {
        RateMasterForm {
            rounding,
            ..RateMasterForm::default()
        }
    }

    pub fn set(mut self, field: Field, value: &str) -> Self {
        let value = value.to_string();
        match field {
            Field::SystemItemName => self.system_item_name = value,
            Field::RecipeItemName => self.recipe_item_name = value,
            Field::Unit => self.unit = value,
            Field::Category => self.category = value,
            Field::PurchaseRate => self.purchase_rate = value,
            Field::PackingUom => self.packing_uom = value,
            Field::Yield => self.item_yield = value,
        }
        let derived = self.rederive();
        RateMasterForm { derived, ..self }
    }

    // Partial input blanks only what depends on it.
    fn rederive(&self) -> Derived {
        let number = |field, input: &str| parse_optional(field, input).ok().and_then(|v| v);
        let purchase = number("Purchase Rate", &self.purchase_rate);
        let packing = number("Packing UOM", &self.packing_uom);
        let item_yield = number("Yield", &self.item_yield);
        match (purchase, packing) {
            (Some(p), Some(u)) => {
                let full = derive(p, u, item_yield.unwrap_or(0.0), self.rounding);
                Derived {
                    yield_final_rate: item_yield.and(full.yield_final_rate),
                    ..full
                }
            }
            _ => Derived::default(),
        }
    }
}

impl Form for RateMasterForm {
    type Record = RateMasterEntry;

    fn to_record(&self) -> Result<RateMasterEntry, ValidationError> {
        let incomplete = ValidationError::Incomplete("All fields are required");
        let (city_id, restaurant_id) = match (&self.city_id, &self.restaurant_id) {
            (Some(c), Some(r)) => (c.clone(), r.clone()),
            _ => return Err(incomplete),
        };
        let texts = [
            &self.system_item_name,
            &self.recipe_item_name,
            &self.unit,
            &self.category,
        ];
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(incomplete);
        }
        let purchase_rate = parse_amount("Purchase Rate", &self.purchase_rate)?;
        let packing_uom = parse_amount("Packing UOM", &self.packing_uom)?;
        let item_yield = parse_amount("Yield", &self.item_yield)?;
        let entry = RateMasterEntry {
            meta: DocMeta::default(),
            city_id,
            restaurant_id,
            system_item_name: self.system_item_name.trim().to_string(),
            recipe_item_name: self.recipe_item_name.trim().to_string(),
            unit: self.unit.trim().to_string(),
            purchase_rate,
            packing_uom,
            conversion: None,
            item_yield,
            yield_final_rate: None,
            category: self.category.trim().to_string(),
        };
        Ok(entry.rederived(self.rounding))
    }

    fn with_record(&self, record: &RateMasterEntry) -> Self {
        RateMasterForm {
            city_id: Some(record.city_id.clone()),
            restaurant_id: Some(record.restaurant_id.clone()),
            system_item_name: record.system_item_name.clone(),
            recipe_item_name: record.recipe_item_name.clone(),
            unit: record.unit.clone(),
            purchase_rate: record.purchase_rate.to_string(),
            packing_uom: record.packing_uom.to_string(),
            item_yield: record.item_yield.to_string(),
            category: record.category.clone(),
            derived: Derived {
                conversion: record.conversion,
                yield_final_rate: record.yield_final_rate,
            },
            rounding: self.rounding,
        }
    }

    fn reset(&self) -> Self {
        RateMasterForm::new(self.rounding)
    }
}
