use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::*;
use serde::Deserialize;
use structopt::StructOpt;

use backoffice::config::{Config as Settings, EnvLogger, Overrides};
use backoffice::errors::{user_message, Operation};
use backoffice::import::{self, FromFlat, ImportContext};
use backoffice::menu_engineering::{engineer, MenuItem};
use backoffice::numbers::{format2, parse_amount};
use backoffice::rate_master::{derive, RateMasterEntry};
use backoffice::recipes::{BaseRecipe, RECIPE_RESTAURANT_KEY};
use backoffice::reference::{City, Restaurant, CITY_KEY, RESTAURANT_KEY};
use backoffice::services::{Commandable, Get, List, Queryable, Upload};
use backoffice::session::SessionStore;
use backoffice::users::User;
use infra::documents::HasMeta;
use infra::ids::Id;
use infra::persistence::Filter;
use infra::rest::RestStorage;

#[derive(Debug, StructOpt)]
#[structopt(name = "rb", about = "Restaurant back-office CLI")]
struct Opt {
    /// Configuration file
    #[structopt(parse(from_os_str))]
    config: PathBuf,
    #[structopt(subcommand)]
    command: Commands,
}

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(name = "cities", about = "List cities")]
    Cities,
    #[structopt(name = "restaurants", about = "List a city's restaurants")]
    Restaurants { city: Id<City> },
    #[structopt(name = "recipes", about = "List a restaurant's base recipes with costs")]
    Recipes { restaurant: Id<Restaurant> },
    #[structopt(name = "cost", about = "Show the costing of one base recipe")]
    Cost { recipe: Id<BaseRecipe> },
    #[structopt(name = "rates", about = "List a restaurant's rate master")]
    Rates { restaurant: Id<Restaurant> },
    #[structopt(name = "derive-rate", about = "Compute conversion and yield final rate")]
    DeriveRate {
        purchase_rate: String,
        packing_uom: String,
        #[structopt(name = "yield")]
        item_yield: String,
    },
    #[structopt(name = "menu", about = "Classify a restaurant's menu")]
    Menu { restaurant: Id<Restaurant> },
    #[structopt(name = "import", about = "Upload rows from a JSON export of a spreadsheet")]
    Import {
        #[structopt(possible_values = &["menu", "rates"])]
        kind: String,
        #[structopt(parse(from_os_str))]
        file: PathBuf,
        #[structopt(long)]
        city: Id<City>,
        #[structopt(long)]
        restaurant: Id<Restaurant>,
    },
    #[structopt(name = "users", about = "List users")]
    Users,
    #[structopt(name = "login", about = "Store a session token")]
    Login { username: String, token: String },
    #[structopt(name = "logout", about = "Forget the session token")]
    Logout,
}

#[derive(Deserialize, Debug)]
struct Config {
    #[serde(flatten)]
    backoffice: backoffice::config::Config,
    #[serde(default)]
    env_logger: EnvLogger,
}

type Office = backoffice::BackOffice<RestStorage>;

fn main() -> Result<()> {
    let opt = Opt::from_args();

    let mut config_buf = String::new();
    File::open(&opt.config)
        .and_then(|mut f| f.read_to_string(&mut config_buf))
        .with_context(|| format!("read {:?}", opt.config))?;
    let config: Config = toml::from_str(&config_buf).context("parse config")?;

    config.env_logger.builder().init();

    let settings = config
        .backoffice
        .apply_overrides(&Overrides::from_env()?);
    debug!("Config: {:?}", settings);
    let sessions = SessionStore::new(&settings.session.token_file);

    let op = match opt.command {
        Commands::Import { .. } => Operation::Upload,
        _ => Operation::Fetch,
    };
    if let Err(e) = run(&settings, &sessions, opt.command) {
        error!("{:#}", e);
        eprintln!("{}", user_message(op, &e));
        std::process::exit(1);
    }

    Ok(())
}

fn blank_or(value: Option<f64>) -> String {
    value.map(format2).unwrap_or_default()
}

fn run(settings: &Settings, sessions: &SessionStore, command: Commands) -> Result<()> {
    let connect = || backoffice::BackOffice::new(settings);
    match command {
        Commands::Login { username, token } => {
            let session = sessions.login(&username, &token)?;
            println!("Logged in as {} at {}", session.username, session.issued_at);
        }
        Commands::Logout => {
            if sessions.logout()? {
                println!("Logged out");
            } else {
                println!("Not logged in");
            }
        }
        Commands::DeriveRate {
            purchase_rate,
            packing_uom,
            item_yield,
        } => {
            let d = derive(
                parse_amount("Purchase Rate", &purchase_rate)?,
                parse_amount("Packing UOM", &packing_uom)?,
                parse_amount("Yield", &item_yield)?,
                settings.rate_master.rounding,
            );
            println!("conversion: {}", blank_or(d.conversion));
            println!("yield final rate: {}", blank_or(d.yield_final_rate));
        }
        Commands::Cities => {
            let office = connect()?;
            let backend = office.backend();
            let cities = Queryable::<List<City>>::query(backend, List::all())?;
            for city in cities {
                println!("{}: {}", id_or_blank(city.id()), city.name);
            }
        }
        Commands::Restaurants { city } => {
            let office = connect()?;
            let backend = office.backend();
            let req = List::matching(Filter::by(CITY_KEY, &city));
            for r in Queryable::<List<Restaurant>>::query(backend, req)? {
                println!("{}: {} ({} categories)", id_or_blank(r.id()), r.name, r.categories.len());
            }
        }
        Commands::Recipes { restaurant } => {
            let office = connect()?;
            let backend = office.backend();
            let req = List::matching(Filter::by(RECIPE_RESTAURANT_KEY, &restaurant));
            for recipe in Queryable::<List<BaseRecipe>>::query(backend, req)? {
                let summary = recipe.summary();
                println!(
                    "{}: {} batch {} per unit {}",
                    id_or_blank(recipe.id()),
                    recipe.recipe_title,
                    format2(summary.batch_cost),
                    format2(summary.cost_per_yield)
                );
            }
        }
        Commands::Cost { recipe } => {
            let office = connect()?;
            let backend = office.backend();
            let found = Queryable::<Get<BaseRecipe>>::query(backend, Get(recipe.clone()))?;
            let recipe = found.ok_or_else(|| anyhow::anyhow!("no recipe {}", recipe))?;
            println!("{}", recipe.recipe_title);
            for row in recipe.ingredients.iter().map(|r| r.recomputed()) {
                println!(
                    "  {} {} {} x {} = {}",
                    row.ingredient,
                    row.unit,
                    row.quantity,
                    format2(row.rate),
                    format2(row.amount)
                );
            }
            let summary = recipe.summary();
            println!("batch cost: {}", format2(summary.batch_cost));
            println!("cost per unit of yield: {}", format2(summary.cost_per_yield));
            if summary.yield_clamped {
                warn!("{} has no usable yield; costed per batch", recipe.recipe_title);
            }
        }
        Commands::Rates { restaurant } => {
            let office = connect()?;
            let backend = office.backend();
            let req = List::matching(Filter::by(RESTAURANT_KEY, &restaurant));
            for e in Queryable::<List<RateMasterEntry>>::query(backend, req)? {
                println!(
                    "{} / {} [{}] {} per {} -> {} -> {}",
                    e.system_item_name,
                    e.recipe_item_name,
                    e.unit,
                    format2(e.purchase_rate),
                    e.packing_uom,
                    blank_or(e.conversion),
                    blank_or(e.yield_final_rate)
                );
            }
        }
        Commands::Menu { restaurant } => {
            let office = connect()?;
            let items = engineer(office.backend(), &restaurant, &office.settings().thresholds)?;
            let json = serde_json::to_string_pretty(&items).context("encode menu")?;
            println!("{}", json);
        }
        Commands::Import {
            kind,
            file,
            city,
            restaurant,
        } => {
            let mut src = String::new();
            File::open(&file)
                .and_then(|mut f| f.read_to_string(&mut src))
                .with_context(|| format!("read {:?}", file))?;
            let records = import::parse_records(&src)?;
            let office = connect()?;
            let context = ImportContext {
                city: Some(city),
                restaurant: Some(restaurant),
                rounding: office.settings().rounding,
            };
            let count = match kind.as_str() {
                "menu" => upload::<MenuItem>(&office, &records, &context)?,
                _ => upload::<RateMasterEntry>(&office, &records, &context)?,
            };
            println!("Uploaded {} rows", count);
        }
        Commands::Users => {
            let office = connect()?;
            let backend = office.backend();
            for user in Queryable::<List<User>>::query(backend, List::all())? {
                println!("{}: {} ({})", id_or_blank(user.id()), user.username, user.role);
            }
        }
    }
    Ok(())
}

fn upload<T>(
    office: &Office,
    records: &[import::FlatRecord],
    context: &ImportContext,
) -> Result<usize>
where
    T: FromFlat + infra::ids::Entity + serde::Serialize,
{
    let rows = import::rows::<T>(records, context)?;
    let count = rows.len();
    Commandable::<Upload<T>>::execute(office.backend(), Upload(rows))?;
    Ok(count)
}

fn id_or_blank<T: infra::ids::Entity>(id: Option<&Id<T>>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}
