//! Bulk import of spreadsheet rows. The sheet is parsed elsewhere into a JSON
//! array of flat objects keyed by column header; headers are matched loosely
//! so that "Menu Item", "menuItem" and "menu_item" name the same column.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use log::*;
use serde_json::Value;

use infra::ids::Id;

use crate::costing::Ingredient;
use crate::crud::Form;
use crate::errors::ValidationError;
use crate::menu_engineering::{MenuItem, MenuItemForm};
use crate::rate_master::{Field, RateMasterEntry, RateMasterForm, Rounding};
use crate::recipes::IngredientForm;
use crate::reference::{City, Restaurant};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRecord {
    cells: BTreeMap<String, String>,
}

fn normalise(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl FlatRecord {
    pub fn from_pairs<'a, I: IntoIterator<Item = (&'a str, &'a str)>>(pairs: I) -> Self {
        let cells = pairs
            .into_iter()
            .map(|(k, v)| (normalise(k), v.to_string()))
            .collect();
        FlatRecord { cells }
    }

    /// The cell under `header`, or "" when the column is absent.
    pub fn get(&self, header: &str) -> &str {
        self.cells
            .get(&normalise(header))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn from_json(row: usize, value: Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => anyhow::bail!("row {} is not an object: {}", row, other),
        };
        let cells = map
            .into_iter()
            .map(|(k, v)| {
                let cell = match v {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (normalise(&k), cell)
            })
            .collect();
        Ok(FlatRecord { cells })
    }
}

/// Reads a JSON array of flat records.
pub fn parse_records(json: &str) -> Result<Vec<FlatRecord>> {
    let rows: Vec<Value> = serde_json::from_str(json).context("parse import rows")?;
    rows.into_iter()
        .enumerate()
        .map(|(i, v)| FlatRecord::from_json(i + 1, v))
        .collect()
}

/// Where imported rows belong, for records that carry their location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportContext {
    pub city: Option<Id<City>>,
    pub restaurant: Option<Id<Restaurant>>,
    pub rounding: Rounding,
}

pub trait FromFlat: Sized {
    fn from_flat(record: &FlatRecord, context: &ImportContext) -> Result<Self, ValidationError>;
}

impl FromFlat for Ingredient {
    fn from_flat(record: &FlatRecord, _: &ImportContext) -> Result<Self, ValidationError> {
        IngredientForm {
            ingredient: record.get("ingredient").to_string(),
            unit: record.get("unit").to_string(),
            quantity: record.get("quantity").to_string(),
            rate: record.get("rate").to_string(),
        }
        .parse()
    }
}

impl FromFlat for MenuItem {
    fn from_flat(record: &FlatRecord, context: &ImportContext) -> Result<Self, ValidationError> {
        MenuItemForm {
            city_id: context.city.clone(),
            restaurant_id: context.restaurant.clone(),
            menu_item: record.get("menuItem").to_string(),
            sold: record.get("sold").to_string(),
            popularity: record.get("popularity").to_string(),
            cost_price: record.get("costPrice").to_string(),
            selling_price: record.get("sellingPrice").to_string(),
            menu_item_class: record.get("menuItemClass").to_string(),
        }
        .to_record()
    }
}

impl FromFlat for RateMasterEntry {
    fn from_flat(record: &FlatRecord, context: &ImportContext) -> Result<Self, ValidationError> {
        let columns = [
            (Field::SystemItemName, "systemItemName"),
            (Field::RecipeItemName, "recipeItemName"),
            (Field::Unit, "unit"),
            (Field::PurchaseRate, "purchaseRate"),
            (Field::PackingUom, "packingUOM"),
            (Field::Yield, "yield"),
            (Field::Category, "category"),
        ];
        let form = RateMasterForm {
            city_id: context.city.clone(),
            restaurant_id: context.restaurant.clone(),
            ..RateMasterForm::new(context.rounding)
        };
        columns
            .iter()
            .fold(form, |form, (field, header)| form.set(*field, record.get(header)))
            .to_record()
    }
}

/// Converts every record, failing on the first bad row.
pub fn rows<T: FromFlat>(
    records: &[FlatRecord],
    context: &ImportContext,
) -> Result<Vec<T>, ValidationError> {
    let parsed = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            T::from_flat(r, context).map_err(|reason| ValidationError::Row {
                row: i + 1,
                reason: Box::new(reason),
            })
        })
        .collect::<Result<Vec<T>, _>>()?;
    debug!("Converted {} imported rows", parsed.len());
    Ok(parsed)
}

#[cfg(test)]
mod test {
    use super::*;
    use maplit::btreemap;

    fn context() -> ImportContext {
        ImportContext {
            city: Some("pune".parse().expect("id")),
            restaurant: Some("r1".parse().expect("id")),
            rounding: Rounding::Chained,
        }
    }

    #[test]
    fn headers_match_loosely() {
        let record = FlatRecord::from_pairs(vec![("Menu Item", "Vada Pav"), ("SOLD", "120")]);
        assert_eq!(record.get("menuItem"), "Vada Pav");
        assert_eq!(record.get("menu_item"), "Vada Pav");
        assert_eq!(record.get("sold"), "120");
        assert_eq!(record.get("popularity"), "");
    }

    #[test]
    fn parses_spreadsheet_json() {
        let records = parse_records(
            r#"[{"Ingredient": "Lemon", "Unit": "kg", "Quantity": 2, "Rate": "15.5"}]"#,
        )
        .expect("parse");
        let expected = btreemap! {
            "ingredient".to_string() => "Lemon".to_string(),
            "unit".to_string() => "kg".to_string(),
            "quantity".to_string() => "2".to_string(),
            "rate".to_string() => "15.5".to_string(),
        };
        assert_eq!(records, vec![FlatRecord { cells: expected }]);

        let rows = rows::<Ingredient>(&records, &ImportContext::default()).expect("rows");
        assert_eq!(rows[0].amount, 31.0);
    }

    #[test]
    fn rejects_rows_that_are_not_objects() {
        assert!(parse_records("[1, 2]").is_err());
        assert!(parse_records("{}").is_err());
    }

    #[test]
    fn menu_rows_take_the_selected_restaurant() {
        let records = vec![FlatRecord::from_pairs(vec![
            ("menuItem", "Vada Pav"),
            ("sold", "120"),
            ("popularity", "40"),
            ("costPrice", "6"),
            ("sellingPrice", "20"),
            ("menuItemClass", "Snacks"),
        ])];
        let items = rows::<MenuItem>(&records, &context()).expect("rows");
        assert_eq!(items[0].restaurant_id, context().restaurant);
        assert_eq!(items[0].selling_price, 20.0);
    }

    #[test]
    fn bad_rows_are_reported_by_number() {
        let good = FlatRecord::from_pairs(vec![
            ("ingredient", "Salt"),
            ("unit", "g"),
            ("quantity", "5"),
            ("rate", "0.02"),
        ]);
        let bad = FlatRecord::from_pairs(vec![("ingredient", "Salt")]);
        let err = rows::<Ingredient>(&[good, bad], &ImportContext::default()).expect_err("bad");
        assert_eq!(err.to_string(), "Row 2: Please fill all ingredient details.");
    }

    #[test]
    fn rate_master_rows_are_derived_on_import() {
        let record = FlatRecord::from_pairs(vec![
            ("System Item Name", "TOMATO 4KG"),
            ("Recipe Item Name", "Tomato"),
            ("Unit", "kg"),
            ("Purchase Rate", "100"),
            ("Packing UOM", "4"),
            ("Yield", "50"),
            ("Category", "Vegetables"),
        ]);
        let entries = rows::<RateMasterEntry>(&[record], &context()).expect("rows");
        assert_eq!(entries[0].conversion, Some(25.0));
        assert_eq!(entries[0].yield_final_rate, Some(50.0));
    }
}
