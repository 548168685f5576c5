use serde::{Deserialize, Deserializer, Serialize};

use infra::documents::DocMeta;
use infra::entity;
use infra::ids::Id;

use crate::crud::Form;
use crate::errors::ValidationError;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct City {
    #[serde(flatten)]
    pub meta: DocMeta<City>,
    pub name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    #[serde(flatten)]
    pub meta: DocMeta<Restaurant>,
    pub name: String,
    pub city_id: Option<Id<City>>,
    #[serde(default, deserialize_with = "category_ids")]
    pub categories: Vec<Id<Category>>,
}

/// A restaurant's categories arrive either as ids or as populated documents.
#[derive(Deserialize)]
#[serde(untagged)]
enum CategoryRef {
    Id(Id<Category>),
    Doc {
        #[serde(rename = "_id")]
        id: Id<Category>,
    },
}

fn category_ids<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Id<Category>>, D::Error> {
    let refs = Option::<Vec<CategoryRef>>::deserialize(deserializer)?;
    Ok(refs
        .unwrap_or_default()
        .into_iter()
        .map(|r| match r {
            CategoryRef::Id(id) | CategoryRef::Doc { id } => id,
        })
        .collect())
}

/// A menu or recipe grouping, drawn from a predefined list and attached to
/// restaurants.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Category {
    #[serde(flatten)]
    pub meta: DocMeta<Category>,
    pub name: String,
}

entity!(City, "cities");
entity!(Restaurant, "restaurants");
entity!(Category, "categories");

/// Query keys used to list children of a selection.
pub const CITY_KEY: &str = "cityId";
pub const RESTAURANT_KEY: &str = "restaurantId";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestaurantForm {
    pub city_id: Option<Id<City>>,
    pub name: String,
    pub categories: Vec<Id<Category>>,
}

impl RestaurantForm {
    /// Picking a category twice keeps one copy.
    pub fn add_category(mut self, category: Id<Category>) -> Self {
        if !self.categories.contains(&category) {
            self.categories.push(category);
        }
        self
    }

    pub fn remove_category(mut self, category: &Id<Category>) -> Self {
        self.categories.retain(|c| c != category);
        self
    }
}

impl Form for RestaurantForm {
    type Record = Restaurant;

    fn to_record(&self) -> Result<Restaurant, ValidationError> {
        let name = self.name.trim();
        match self.city_id.as_ref() {
            Some(city_id) if !name.is_empty() && !self.categories.is_empty() => Ok(Restaurant {
                meta: DocMeta::default(),
                name: name.to_string(),
                city_id: Some(city_id.clone()),
                categories: self.categories.clone(),
            }),
            _ => Err(ValidationError::Incomplete(
                "Please enter City ID, Restaurant Name, and at least one category.",
            )),
        }
    }

    fn with_record(&self, record: &Restaurant) -> Self {
        RestaurantForm {
            city_id: record.city_id.clone(),
            name: record.name.clone(),
            categories: record.categories.clone(),
        }
    }

    fn reset(&self) -> Self {
        RestaurantForm::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn id<T: infra::ids::Entity>(s: &str) -> Id<T> {
        s.parse().expect("id")
    }

    #[test]
    fn categories_are_not_duplicated() {
        let form = RestaurantForm::default()
            .add_category(id("veg"))
            .add_category(id("bar"))
            .add_category(id("veg"));
        assert_eq!(form.categories, vec![id::<Category>("veg"), id("bar")]);
        let form = form.remove_category(&id("veg"));
        assert_eq!(form.categories, vec![id::<Category>("bar")]);
    }

    #[test]
    fn restaurant_needs_city_name_and_a_category() {
        let form = RestaurantForm {
            city_id: Some(id("pune")),
            name: "Cafe Goodluck".into(),
            categories: vec![],
        };
        assert!(form.to_record().is_err());

        let form = form.add_category(id("breakfast"));
        let record = form.to_record().expect("valid");
        assert_eq!(record.name, "Cafe Goodluck");
        assert_eq!(record.categories, vec![id::<Category>("breakfast")]);
    }

    #[test]
    fn reads_backend_restaurants() {
        let r: Restaurant = serde_json::from_str(
            r#"{"_id": "r1", "name": "Vaishali", "cityId": "c1", "categories": ["k1", "k2"]}"#,
        )
        .expect("from_str");
        assert_eq!(r.city_id, Some(id::<City>("c1")));
        assert_eq!(r.categories.len(), 2);
    }

    #[test]
    fn reads_populated_categories_and_writes_ids() {
        let r: Restaurant = serde_json::from_str(
            r#"{
                "_id": "r1",
                "name": "Vaishali",
                "cityId": "c1",
                "categories": [{"_id": "k1", "name": "Breakfast"}, "k2"]
            }"#,
        )
        .expect("from_str");
        assert_eq!(r.categories, vec![id::<Category>("k1"), id("k2")]);

        let form = RestaurantForm::default().with_record(&r);
        assert_eq!(form.categories, r.categories);

        let json = serde_json::to_value(&r).expect("to_value");
        assert_eq!(json["categories"], serde_json::json!(["k1", "k2"]));
    }

    #[test]
    fn null_categories_read_as_empty() {
        let r: Restaurant =
            serde_json::from_str(r#"{"_id": "r1", "name": "Vaishali", "categories": null}"#)
                .expect("from_str");
        assert!(r.categories.is_empty());
        assert_eq!(r.city_id, None);
    }
}
