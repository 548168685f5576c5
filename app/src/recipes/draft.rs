//! Recipe editing sessions. Rows live only in the draft until the recipe is
//! submitted; every row edit recomputes that row's amount.

use infra::documents::DocMeta;
use infra::ids::Id;

use super::models::{BaseRecipe, FoodItem, FoodRecipe};
use crate::costing::{ingredient_amount, summarise, CostSummary, Ingredient};
use crate::crud::Form;
use crate::errors::ValidationError;
use crate::numbers::{parse_amount, parse_optional};
use crate::reference::{Category, City, Restaurant};

/// The add-ingredient row form, as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngredientForm {
    pub ingredient: String,
    pub unit: String,
    pub quantity: String,
    pub rate: String,
}

impl IngredientForm {
    pub fn from_row(row: &Ingredient) -> Self {
        IngredientForm {
            ingredient: row.ingredient.clone(),
            unit: row.unit.clone(),
            quantity: row.quantity.to_string(),
            rate: row.rate.to_string(),
        }
    }

    /// The amount shown beside the form while typing, once both numbers
    /// parse.
    pub fn amount_preview(&self) -> Option<f64> {
        let quantity = parse_amount("Quantity", &self.quantity).ok()?;
        let rate = parse_amount("Rate", &self.rate).ok()?;
        Some(ingredient_amount(quantity, rate))
    }

    pub fn parse(&self) -> Result<Ingredient, ValidationError> {
        let blank = [&self.ingredient, &self.unit, &self.quantity, &self.rate]
            .iter()
            .any(|f| f.trim().is_empty());
        if blank {
            return Err(ValidationError::Incomplete(
                "Please fill all ingredient details.",
            ));
        }
        let quantity = parse_amount("Quantity", &self.quantity)?;
        let rate = parse_amount("Rate", &self.rate)?;
        Ok(Ingredient::new(
            self.ingredient.trim(),
            self.unit.trim(),
            quantity,
            rate,
        ))
    }
}

/// Rows of a recipe being edited, and the row form that feeds them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngredientList {
    pub rows: Vec<Ingredient>,
    pub form: IngredientForm,
    /// Row the form is currently editing in place.
    pub editing_row: Option<usize>,
}

impl IngredientList {
    pub fn from_rows(rows: &[Ingredient]) -> Self {
        IngredientList {
            rows: rows.iter().map(Ingredient::recomputed).collect(),
            ..IngredientList::default()
        }
    }

    pub fn with_form(self, form: IngredientForm) -> Self {
        IngredientList { form, ..self }
    }

    /// Appends the form as a new row, or replaces the row being edited.
    pub fn commit_row(self) -> Result<Self, ValidationError> {
        let row = self.form.parse()?;
        let mut rows = self.rows;
        match self.editing_row {
            Some(i) if i < rows.len() => rows[i] = row,
            Some(i) => return Err(ValidationError::NoSuchRow(i)),
            None => rows.push(row),
        }
        Ok(IngredientList {
            rows,
            form: IngredientForm::default(),
            editing_row: None,
        })
    }

    pub fn edit_row(self, index: usize) -> Result<Self, ValidationError> {
        let form = self
            .rows
            .get(index)
            .map(IngredientForm::from_row)
            .ok_or(ValidationError::NoSuchRow(index))?;
        Ok(IngredientList {
            form,
            editing_row: Some(index),
            ..self
        })
    }

    /// Removing the row under edit also abandons the edit.
    pub fn remove_row(self, index: usize) -> Result<Self, ValidationError> {
        if index >= self.rows.len() {
            return Err(ValidationError::NoSuchRow(index));
        }
        let mut rows = self.rows;
        rows.remove(index);
        let (form, editing_row) = match self.editing_row {
            Some(i) if i == index => (IngredientForm::default(), None),
            Some(i) if i > index => (self.form, Some(i - 1)),
            other => (self.form, other),
        };
        Ok(IngredientList {
            rows,
            form,
            editing_row,
        })
    }

    pub fn set_quantity(self, index: usize, input: &str) -> Result<Self, ValidationError> {
        let quantity = parse_amount("Quantity", input)?;
        self.replace_row(index, |row| row.with_quantity(quantity))
    }

    pub fn set_rate(self, index: usize, input: &str) -> Result<Self, ValidationError> {
        let rate = parse_amount("Rate", input)?;
        self.replace_row(index, |row| row.with_rate(rate))
    }

    fn replace_row<F: FnOnce(&Ingredient) -> Ingredient>(
        self,
        index: usize,
        f: F,
    ) -> Result<Self, ValidationError> {
        let mut rows = self.rows;
        let row = rows.get_mut(index).ok_or(ValidationError::NoSuchRow(index))?;
        *row = f(&*row);
        Ok(IngredientList { rows, ..self })
    }
}

/// A base recipe being entered or viewed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeDraft {
    pub title: String,
    pub recipe_yield: String,
    pub ingredients: IngredientList,
    pub city: Option<Id<City>>,
    pub restaurant: Option<Id<Restaurant>>,
}

impl RecipeDraft {
    pub fn for_restaurant(city: Option<Id<City>>, restaurant: Option<Id<Restaurant>>) -> Self {
        RecipeDraft {
            city,
            restaurant,
            ..RecipeDraft::default()
        }
    }

    pub fn try_map_ingredients<F>(self, f: F) -> Result<Self, ValidationError>
    where
        F: FnOnce(IngredientList) -> Result<IngredientList, ValidationError>,
    {
        let ingredients = f(self.ingredients)?;
        Ok(RecipeDraft {
            ingredients,
            ..self
        })
    }

    /// Batch cost and cost per unit of yield, as currently typed. A yield
    /// that does not parse counts as absent.
    pub fn summary(&self) -> CostSummary {
        let recipe_yield = parse_optional("Yield", &self.recipe_yield).unwrap_or(None);
        summarise(&self.ingredients.rows, recipe_yield)
    }
}

impl Form for RecipeDraft {
    type Record = BaseRecipe;

    fn to_record(&self) -> Result<BaseRecipe, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() || self.ingredients.rows.is_empty() {
            return Err(ValidationError::Incomplete(
                "Please enter a Recipe Title and at least one ingredient.",
            ));
        }
        let recipe_yield = parse_optional("Yield", &self.recipe_yield)?;
        let summary = summarise(&self.ingredients.rows, recipe_yield);
        Ok(BaseRecipe {
            meta: DocMeta::default(),
            recipe_title: title.to_string(),
            ingredients: self.ingredients.rows.clone(),
            recipe_yield,
            final_yield_rate: Some(summary.cost_per_yield),
            city: self.city.clone(),
            restaurant: self.restaurant.clone(),
        })
    }

    fn with_record(&self, record: &BaseRecipe) -> Self {
        RecipeDraft {
            title: record.recipe_title.clone(),
            recipe_yield: record
                .recipe_yield
                .map(|y| y.to_string())
                .unwrap_or_default(),
            ingredients: IngredientList::from_rows(&record.ingredients),
            city: record.city.clone(),
            restaurant: record.restaurant.clone(),
        }
    }

    fn reset(&self) -> Self {
        RecipeDraft::for_restaurant(self.city.clone(), self.restaurant.clone())
    }
}

/// A dish being entered against a city, restaurant and category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoodRecipeDraft {
    pub city: Option<Id<City>>,
    pub restaurant: Option<Id<Restaurant>>,
    pub category: Option<Id<Category>>,
    pub recipe_name: String,
    pub ingredients: IngredientList,
}

impl FoodRecipeDraft {
    pub fn try_map_ingredients<F>(self, f: F) -> Result<Self, ValidationError>
    where
        F: FnOnce(IngredientList) -> Result<IngredientList, ValidationError>,
    {
        let ingredients = f(self.ingredients)?;
        Ok(FoodRecipeDraft {
            ingredients,
            ..self
        })
    }
}

impl Form for FoodRecipeDraft {
    type Record = FoodRecipe;

    fn to_record(&self) -> Result<FoodRecipe, ValidationError> {
        let name = self.recipe_name.trim();
        match (&self.city, &self.restaurant, &self.category) {
            (Some(city), Some(restaurant), Some(category))
                if !name.is_empty() && !self.ingredients.rows.is_empty() =>
            {
                Ok(FoodRecipe {
                    meta: DocMeta::default(),
                    city: city.clone(),
                    restaurant: restaurant.clone(),
                    category: category.clone(),
                    recipe_name: name.to_string(),
                    ingredients: self.ingredients.rows.clone(),
                })
            }
            _ => Err(ValidationError::Incomplete(
                "Please fill all fields including City and Restaurant.",
            )),
        }
    }

    fn with_record(&self, record: &FoodRecipe) -> Self {
        FoodRecipeDraft {
            city: Some(record.city.clone()),
            restaurant: Some(record.restaurant.clone()),
            category: Some(record.category.clone()),
            recipe_name: record.recipe_name.clone(),
            ingredients: IngredientList::from_rows(&record.ingredients),
        }
    }

    /// Keeps the location so several dishes can be entered in a row.
    fn reset(&self) -> Self {
        FoodRecipeDraft {
            city: self.city.clone(),
            restaurant: self.restaurant.clone(),
            category: self.category.clone(),
            ..FoodRecipeDraft::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoodItemForm {
    pub recipe_name: String,
    pub cost_price: String,
    pub city_id: Option<Id<City>>,
    pub restaurant_id: Option<Id<Restaurant>>,
    pub category_id: Option<Id<Category>>,
}

impl Form for FoodItemForm {
    type Record = FoodItem;

    fn to_record(&self) -> Result<FoodItem, ValidationError> {
        let incomplete = ValidationError::Incomplete("Please fill all fields.");
        let name = self.recipe_name.trim();
        let (city_id, restaurant_id, category_id) =
            match (&self.city_id, &self.restaurant_id, &self.category_id) {
                (Some(c), Some(r), Some(k)) if !name.is_empty() => (c, r, k),
                _ => return Err(incomplete),
            };
        let cost_price = match parse_optional("Cost Price", &self.cost_price)? {
            Some(price) => price,
            None => return Err(incomplete),
        };
        Ok(FoodItem {
            meta: DocMeta::default(),
            recipe_name: name.to_string(),
            cost_price,
            city_id: city_id.clone(),
            restaurant_id: restaurant_id.clone(),
            category_id: category_id.clone(),
        })
    }

    fn with_record(&self, record: &FoodItem) -> Self {
        FoodItemForm {
            recipe_name: record.recipe_name.clone(),
            cost_price: record.cost_price.to_string(),
            city_id: Some(record.city_id.clone()),
            restaurant_id: Some(record.restaurant_id.clone()),
            category_id: Some(record.category_id.clone()),
        }
    }

    fn reset(&self) -> Self {
        FoodItemForm::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn id<T: infra::ids::Entity>(s: &str) -> Id<T> {
        s.parse().expect("id")
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn row_form(ingredient: &str, unit: &str, quantity: &str, rate: &str) -> IngredientForm {
        IngredientForm {
            ingredient: ingredient.into(),
            unit: unit.into(),
            quantity: quantity.into(),
            rate: rate.into(),
        }
    }

    fn lemon_juice() -> RecipeDraft {
        let draft = RecipeDraft {
            title: "Lemon juice".into(),
            recipe_yield: "10".into(),
            ..RecipeDraft::default()
        };
        draft
            .try_map_ingredients(|l| l.with_form(row_form("Lemon", "kg", "2", "15.5")).commit_row())
            .and_then(|d| {
                d.try_map_ingredients(|l| {
                    l.with_form(row_form("Sugar", "kg", "0.25", "38")).commit_row()
                })
            })
            .expect("rows")
    }

    #[test]
    fn row_form_requires_every_field() {
        let err = row_form("Lemon", "", "2", "15.5").parse().expect_err("blank unit");
        assert_eq!(err.to_string(), "Please fill all ingredient details.");
    }

    #[test]
    fn row_form_rejects_non_numeric_rates() {
        let err = row_form("Lemon", "kg", "2", "fifteen")
            .parse()
            .expect_err("bad rate");
        match err {
            ValidationError::NotANumber { field, .. } => assert_eq!(field, "Rate"),
            other => panic!("Unexpected error: {:?}", other),
        }
        assert_eq!(row_form("Lemon", "kg", "2", "x").amount_preview(), None);
        assert_eq!(row_form("Lemon", "kg", "2", "15.5").amount_preview(), Some(31.0));
    }

    #[test]
    fn committed_rows_carry_amounts() {
        let draft = lemon_juice();
        let amounts = draft
            .ingredients
            .rows
            .iter()
            .map(|r| r.amount)
            .collect::<Vec<_>>();
        assert_eq!(amounts, vec![31.0, 9.5]);
        let summary = draft.summary();
        assert!(close(summary.batch_cost, 40.5));
        assert!(close(summary.cost_per_yield, 4.05));
        assert_eq!(draft.ingredients.form, IngredientForm::default());
    }

    #[test]
    fn editing_a_row_replaces_it_in_place() {
        let draft = lemon_juice()
            .try_map_ingredients(|l| l.edit_row(0))
            .expect("edit");
        assert_eq!(draft.ingredients.form.ingredient, "Lemon");
        assert_eq!(draft.ingredients.form.quantity, "2");
        let draft = draft
            .try_map_ingredients(|l| {
                let form = IngredientForm {
                    quantity: "3".into(),
                    ..l.form.clone()
                };
                l.with_form(form).commit_row()
            })
            .expect("commit");
        assert_eq!(draft.ingredients.rows.len(), 2);
        assert!(close(draft.ingredients.rows[0].amount, 46.5));
        assert_eq!(draft.ingredients.editing_row, None);
    }

    #[test]
    fn removing_rows_keeps_the_edit_target_aligned() {
        let list = lemon_juice().ingredients.edit_row(1).expect("edit");
        let list = list.remove_row(0).expect("remove");
        assert_eq!(list.editing_row, Some(0));
        assert_eq!(list.rows[0].ingredient, "Sugar");
        let list = list.remove_row(0).expect("remove");
        assert_eq!(list.editing_row, None);
        assert!(list.rows.is_empty());
        assert_eq!(list.remove_row(0), Err(ValidationError::NoSuchRow(0)));
    }

    #[test]
    fn viewer_edits_recompute_amounts() {
        let list = lemon_juice().ingredients;
        let list = list.set_quantity(0, "4").expect("quantity");
        assert!(close(list.rows[0].amount, 62.0));
        let list = list.set_rate(1, "40").expect("rate");
        assert!(close(list.rows[1].amount, 10.0));
        assert!(list.clone().set_rate(1, "abc").is_err());
        assert_eq!(
            list.set_quantity(7, "1").map(|_| ()),
            Err(ValidationError::NoSuchRow(7))
        );
    }

    #[test]
    fn submit_requires_title_and_rows() {
        let err = RecipeDraft {
            title: "Gravy".into(),
            ..RecipeDraft::default()
        }
        .to_record()
        .expect_err("no rows");
        assert_eq!(
            err.to_string(),
            "Please enter a Recipe Title and at least one ingredient."
        );
    }

    #[test]
    fn submit_computes_final_yield_rate() {
        let record = lemon_juice().to_record().expect("record");
        assert_eq!(record.recipe_yield, Some(10.0));
        let rate = record.final_yield_rate.expect("rate");
        assert!(close(rate, 4.05));
    }

    #[test]
    fn reset_keeps_the_restaurant() {
        let draft = RecipeDraft {
            restaurant: Some(id("r1")),
            ..lemon_juice()
        };
        let blank = draft.reset();
        assert_eq!(blank.restaurant, Some(id::<Restaurant>("r1")));
        assert!(blank.title.is_empty());
        assert!(blank.ingredients.rows.is_empty());
    }

    #[test]
    fn food_recipe_needs_its_location() {
        let draft = FoodRecipeDraft {
            recipe_name: "Misal".into(),
            city: Some(id("pune")),
            ..FoodRecipeDraft::default()
        }
        .try_map_ingredients(|l| l.with_form(row_form("Sprouts", "kg", "1", "80")).commit_row())
        .expect("row");
        let err = draft.to_record().expect_err("no restaurant");
        assert_eq!(
            err.to_string(),
            "Please fill all fields including City and Restaurant."
        );

        let draft = FoodRecipeDraft {
            restaurant: Some(id("r1")),
            category: Some(id("k1")),
            ..draft
        };
        let record = draft.to_record().expect("record");
        assert!(close(record.batch_cost(), 80.0));
        assert_eq!(draft.reset().category, Some(id::<Category>("k1")));
    }

    #[test]
    fn food_item_requires_all_fields() {
        let form = FoodItemForm {
            recipe_name: "Poha".into(),
            cost_price: "".into(),
            city_id: Some(id("pune")),
            restaurant_id: Some(id("r1")),
            category_id: Some(id("k1")),
        };
        assert_eq!(
            form.to_record().map(|_| ()),
            Err(ValidationError::Incomplete("Please fill all fields."))
        );
        let form = FoodItemForm {
            cost_price: "18.5".into(),
            ..form
        };
        assert_eq!(form.to_record().expect("record").cost_price, 18.5);
    }
}
