//! Restaurant back-office: recipe costing, rate master, menu engineering and
//! the reference data they hang off, over the back-office REST API.

use anyhow::{Context, Result};
use log::*;

use infra::rest::RestStorage;

pub mod config;
pub mod costing;
pub mod crud;
pub mod errors;
pub mod import;
pub mod menu_engineering;
pub mod numbers;
pub mod rate_master;
pub mod recipes;
pub mod reference;
pub mod services;
pub mod session;
pub mod users;

use crate::menu_engineering::Thresholds;
use crate::rate_master::Rounding;
use crate::services::Backend;
use crate::session::SessionStore;

/// Policy knobs the calculators take from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Settings {
    pub thresholds: Thresholds,
    pub rounding: Rounding,
}

impl Settings {
    pub fn from_config(config: &config::Config) -> Self {
        Settings {
            thresholds: config.menu_engineering,
            rounding: config.rate_master.rounding,
        }
    }
}

#[derive(Debug)]
pub struct BackOffice<S> {
    backend: Backend<S>,
    settings: Settings,
}

impl BackOffice<RestStorage> {
    /// Connects to the configured backend, sending the stored session token
    /// if there is one.
    pub fn new(config: &config::Config) -> Result<Self> {
        let sessions = SessionStore::new(&config.session.token_file);
        let token = sessions.token().context("load session")?;
        if token.is_none() {
            debug!("No session at {:?}", sessions.path());
        }
        let storage = config.backend.build()?.with_token(token);
        info!("Back office at {}", config.backend.url);
        Ok(BackOffice::with_storage(storage, Settings::from_config(config)))
    }
}

impl<S> BackOffice<S> {
    pub fn with_storage(storage: S, settings: Settings) -> Self {
        BackOffice {
            backend: Backend::new(storage),
            settings,
        }
    }

    pub fn backend(&self) -> &Backend<S> {
        &self.backend
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl<S> Clone for BackOffice<S> {
    fn clone(&self) -> Self {
        BackOffice {
            backend: self.backend.clone(),
            settings: self.settings,
        }
    }
}
