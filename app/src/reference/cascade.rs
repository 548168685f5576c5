//! City, restaurant and category/recipe selection as an immutable state
//! machine. Every selection change bumps the generation of the levels below
//! it, and a fetch result is applied only if it still carries the current
//! generation for its level.

use log::*;

use infra::documents::HasMeta;
use infra::ids::Id;

use super::models::{Category, City, Restaurant};
use crate::recipes::BaseRecipe;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

/// A fetch the caller must perform and hand back to `Cascade::apply`.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch {
    Restaurants {
        city: Id<City>,
        generation: Generation,
    },
    Categories {
        restaurant: Id<Restaurant>,
        generation: Generation,
    },
    Recipes {
        restaurant: Id<Restaurant>,
        generation: Generation,
    },
}

impl Fetch {
    pub fn generation(&self) -> Generation {
        match self {
            Fetch::Restaurants { generation, .. }
            | Fetch::Categories { generation, .. }
            | Fetch::Recipes { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    Restaurants(Vec<Restaurant>),
    Categories(Vec<Category>),
    Recipes(Vec<BaseRecipe>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cascade {
    pub cities: Vec<City>,
    pub restaurants: Vec<Restaurant>,
    pub categories: Vec<Category>,
    pub recipes: Vec<BaseRecipe>,
    pub city: Option<Id<City>>,
    pub restaurant: Option<Id<Restaurant>>,
    pub category: Option<Id<Category>>,
    pub error: Option<String>,
    restaurant_gen: Generation,
    children_gen: Generation,
    counter: u64,
}

impl Cascade {
    pub fn new() -> Self {
        Cascade::default()
    }

    pub fn set_cities(self, cities: Vec<City>) -> Self {
        Cascade { cities, ..self }
    }

    pub fn with_error(self, error: String) -> Self {
        Cascade {
            error: Some(error),
            ..self
        }
    }

    fn next_generation(&mut self) -> Generation {
        self.counter += 1;
        Generation(self.counter)
    }

    /// Clears the restaurant and everything below it. Picking no city issues
    /// no fetch, but still invalidates any that are in flight.
    pub fn select_city(mut self, city: Option<Id<City>>) -> (Self, Option<Fetch>) {
        let restaurant_gen = self.next_generation();
        let children_gen = self.next_generation();
        let fetch = city.clone().map(|city| Fetch::Restaurants {
            city,
            generation: restaurant_gen,
        });
        let next = Cascade {
            restaurants: Vec::new(),
            categories: Vec::new(),
            recipes: Vec::new(),
            city,
            restaurant: None,
            category: None,
            error: None,
            restaurant_gen,
            children_gen,
            ..self
        };
        (next, fetch)
    }

    /// Clears the category and the restaurant's lists; fetches both lists
    /// under one generation.
    pub fn select_restaurant(mut self, restaurant: Option<Id<Restaurant>>) -> (Self, Vec<Fetch>) {
        let children_gen = self.next_generation();
        let fetches = match restaurant.as_ref() {
            Some(r) => vec![
                Fetch::Categories {
                    restaurant: r.clone(),
                    generation: children_gen,
                },
                Fetch::Recipes {
                    restaurant: r.clone(),
                    generation: children_gen,
                },
            ],
            None => Vec::new(),
        };
        let next = Cascade {
            categories: Vec::new(),
            recipes: Vec::new(),
            restaurant,
            category: None,
            error: None,
            children_gen,
            ..self
        };
        (next, fetches)
    }

    pub fn select_category(self, category: Option<Id<Category>>) -> Self {
        Cascade { category, ..self }
    }

    pub fn is_current(&self, fetch: &Fetch) -> bool {
        let current = match fetch {
            Fetch::Restaurants { .. } => self.restaurant_gen,
            Fetch::Categories { .. } | Fetch::Recipes { .. } => self.children_gen,
        };
        fetch.generation() == current
    }

    /// Applies the outcome of `fetch`. Stale outcomes are dropped whether they
    /// succeeded or not; a failure leaves the cleared lists as they are.
    pub fn apply(self, fetch: &Fetch, outcome: Result<Loaded, String>) -> Self {
        if !self.is_current(fetch) {
            debug!("Dropping stale result for {:?}", fetch);
            return self;
        }
        match outcome {
            Err(error) => self.with_error(error),
            Ok(Loaded::Restaurants(restaurants)) => Cascade {
                restaurants,
                ..self
            },
            Ok(Loaded::Categories(categories)) => Cascade { categories, ..self },
            Ok(Loaded::Recipes(recipes)) => Cascade { recipes, ..self },
        }
    }

    pub fn selected_restaurant(&self) -> Option<&Restaurant> {
        let id = self.restaurant.as_ref()?;
        self.restaurants.iter().find(|r| r.id() == Some(id))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use infra::documents::DocMeta;

    fn id<T: infra::ids::Entity>(s: &str) -> Id<T> {
        s.parse().expect("id")
    }

    fn restaurant(rid: &str, name: &str) -> Restaurant {
        Restaurant {
            meta: DocMeta::new_with_id(id(rid)),
            name: name.into(),
            city_id: None,
            categories: vec![],
        }
    }

    fn category(cid: &str, name: &str) -> Category {
        Category {
            meta: DocMeta::new_with_id(id(cid)),
            name: name.into(),
        }
    }

    fn with_restaurant_selected() -> Cascade {
        let (state, fetch) = Cascade::new().select_city(Some(id("pune")));
        let fetch = fetch.expect("fetch");
        let state = state.apply(
            &fetch,
            Ok(Loaded::Restaurants(vec![restaurant("r1", "Vaishali")])),
        );
        let (state, fetches) = state.select_restaurant(Some(id("r1")));
        fetches.iter().fold(state, |state, f| match f {
            Fetch::Categories { .. } => state.apply(
                f,
                Ok(Loaded::Categories(vec![category("k1", "Breakfast")])),
            ),
            _ => state.apply(f, Ok(Loaded::Recipes(vec![]))),
        })
    }

    #[test]
    fn selecting_a_city_requests_its_restaurants() {
        let (state, fetch) = Cascade::new().select_city(Some(id("pune")));
        match fetch {
            Some(Fetch::Restaurants { ref city, .. }) => assert_eq!(city, &id::<City>("pune")),
            other => panic!("Unexpected fetch: {:?}", other),
        }
        assert_eq!(state.city, Some(id("pune")));
    }

    #[test]
    fn selecting_a_restaurant_requests_categories_and_recipes() {
        let (state, fetches) = Cascade::new().select_restaurant(Some(id("r1")));
        assert_eq!(fetches.len(), 2);
        assert!(fetches.iter().all(|f| state.is_current(f)));
    }

    #[test]
    fn changing_city_clears_downstream_selection() {
        let state = with_restaurant_selected().select_category(Some(id("k1")));
        assert_eq!(state.categories.len(), 1);
        assert_eq!(
            state.selected_restaurant().map(|r| r.name.as_str()),
            Some("Vaishali")
        );

        let (state, _) = state.select_city(Some(id("mumbai")));
        assert_eq!(state.restaurant, None);
        assert_eq!(state.category, None);
        assert!(state.restaurants.is_empty());
        assert!(state.categories.is_empty());
        assert!(state.recipes.is_empty());
    }

    #[test]
    fn stale_responses_do_not_overwrite_newer_state() {
        let (state, old) = Cascade::new().select_city(Some(id("pune")));
        let old = old.expect("fetch");
        let (state, new) = state.select_city(Some(id("mumbai")));
        let new = new.expect("fetch");

        let state = state.apply(
            &old,
            Ok(Loaded::Restaurants(vec![restaurant("r1", "Vaishali")])),
        );
        assert!(state.restaurants.is_empty());

        let state = state.apply(
            &new,
            Ok(Loaded::Restaurants(vec![restaurant("r2", "Britannia")])),
        );
        assert_eq!(state.restaurants.len(), 1);
        assert_eq!(state.restaurants[0].name, "Britannia");
    }

    #[test]
    fn stale_child_fetches_are_dropped_after_a_city_change() {
        let (state, _) = Cascade::new().select_city(Some(id("pune")));
        let (state, fetches) = state.select_restaurant(Some(id("r1")));
        let (state, _) = state.select_city(Some(id("mumbai")));
        let state = fetches.iter().fold(state, |state, f| {
            state.apply(f, Ok(Loaded::Categories(vec![category("k1", "Bar")])))
        });
        assert!(state.categories.is_empty());
    }

    #[test]
    fn stale_failures_are_ignored_too() {
        let (state, old) = Cascade::new().select_city(Some(id("pune")));
        let (state, _) = state.select_city(Some(id("goa")));
        let state = state.apply(&old.expect("fetch"), Err("Failed to fetch data".into()));
        assert_eq!(state.error, None);
    }

    #[test]
    fn failure_reports_without_restoring_cleared_state() {
        let state = with_restaurant_selected();
        let (state, fetches) = state.select_restaurant(Some(id("r1")));
        let state = state.apply(&fetches[0], Err("Failed to fetch data".into()));
        assert_eq!(state.error.as_deref(), Some("Failed to fetch data"));
        assert!(state.categories.is_empty());
        assert_eq!(state.restaurant, Some(id("r1")));
    }

    #[test]
    fn deselecting_city_invalidates_in_flight_fetches() {
        let (state, fetch) = Cascade::new().select_city(Some(id("pune")));
        let (state, none) = state.select_city(None);
        assert!(none.is_none());
        assert!(!state.is_current(&fetch.expect("fetch")));
    }
}
