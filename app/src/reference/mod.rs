mod cascade;
mod models;

use anyhow::Result;
use log::*;

use infra::documents::HasMeta;
use infra::ids::Id;
use infra::persistence::Filter;

use crate::errors::{user_message, Operation};
use crate::recipes::{BaseRecipe, RECIPE_RESTAURANT_KEY};
use crate::services::{Get, List, Queryable};

pub use self::cascade::{Cascade, Fetch, Generation, Loaded};
pub use self::models::{
    Category, City, Restaurant, RestaurantForm, CITY_KEY, RESTAURANT_KEY,
};

/// Drives a `Cascade` against a backend, one round trip per fetch.
pub struct Resolver<'a, B> {
    backend: &'a B,
}

impl<'a, B> Resolver<'a, B>
where
    B: Queryable<List<City>>
        + Queryable<List<Restaurant>>
        + Queryable<Get<Restaurant>>
        + Queryable<List<Category>>
        + Queryable<List<BaseRecipe>>,
{
    pub fn new(backend: &'a B) -> Self {
        Resolver { backend }
    }

    pub fn load_cities(&self, state: Cascade) -> Cascade {
        match Queryable::<List<City>>::query(self.backend, List::all()) {
            Ok(cities) => state.set_cities(cities),
            Err(e) => {
                warn!("Loading cities failed: {:#}", e);
                state.with_error(user_message(Operation::Fetch, &e))
            }
        }
    }

    pub fn select_city(&self, state: Cascade, city: Option<Id<City>>) -> Cascade {
        let (state, fetch) = state.select_city(city);
        fetch.iter().fold(state, |state, f| self.complete(state, f))
    }

    pub fn select_restaurant(
        &self,
        state: Cascade,
        restaurant: Option<Id<Restaurant>>,
    ) -> Cascade {
        let (state, fetches) = state.select_restaurant(restaurant);
        fetches.iter().fold(state, |state, f| self.complete(state, f))
    }

    /// Runs `fetch` and applies its outcome, whatever the state has become in
    /// the meantime.
    pub fn complete(&self, state: Cascade, fetch: &Fetch) -> Cascade {
        let outcome = self
            .run(fetch)
            .map_err(|e| user_message(Operation::Fetch, &e));
        state.apply(fetch, outcome)
    }

    pub fn run(&self, fetch: &Fetch) -> Result<Loaded> {
        debug!("Running {:?}", fetch);
        match fetch {
            Fetch::Restaurants { city, .. } => {
                let req = List::matching(Filter::by(CITY_KEY, city));
                let restaurants =
                    Queryable::<List<Restaurant>>::query(self.backend, req)?;
                Ok(Loaded::Restaurants(restaurants))
            }
            Fetch::Categories { restaurant, .. } => {
                let req = Get(restaurant.clone());
                let owner = Queryable::<Get<Restaurant>>::query(self.backend, req)?;
                let wanted = match owner {
                    Some(owner) => owner.categories,
                    None => return Ok(Loaded::Categories(Vec::new())),
                };
                let all = Queryable::<List<Category>>::query(self.backend, List::all())?;
                let categories = wanted
                    .iter()
                    .filter_map(|id| all.iter().find(|c| c.id() == Some(id)).cloned())
                    .collect();
                Ok(Loaded::Categories(categories))
            }
            Fetch::Recipes { restaurant, .. } => {
                let req = List::matching(Filter::by(RECIPE_RESTAURANT_KEY, restaurant));
                let recipes = Queryable::<List<BaseRecipe>>::query(self.backend, req)?;
                Ok(Loaded::Recipes(recipes))
            }
        }
    }
}
