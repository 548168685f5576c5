use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use log::*;
use serde::{Deserialize, Serialize};

use infra::rest::RestStorage;

use crate::menu_engineering::Thresholds;
use crate::rate_master::Rounding;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:4040/api/";
pub const ENV_PREFIX: &str = "BACKOFFICE_";

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub menu_engineering: Thresholds,
    pub rate_master: RateMasterConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub timeout_secs: Option<u64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub token_file: PathBuf,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RateMasterConfig {
    pub rounding: Rounding,
}

/// Settings taken from `BACKOFFICE_*` environment variables, eg:
/// `BACKOFFICE_BACKEND_URL`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub backend_url: Option<String>,
    pub token_file: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            url: DEFAULT_BACKEND_URL.to_string(),
            timeout_secs: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            token_file: PathBuf::from(".backoffice-session.json"),
        }
    }
}

impl BackendConfig {
    pub fn build(&self) -> Result<RestStorage> {
        debug!("Build storage from {:?}", self);
        let timeout = self.timeout_secs.map(Duration::from_secs);
        let storage = RestStorage::new(&self.url, timeout)
            .with_context(|| format!("backend at {:?}", self.url))?;
        Ok(storage)
    }
}

impl Overrides {
    pub fn from_env() -> Result<Self> {
        let overrides = envy::prefixed(ENV_PREFIX)
            .from_env::<Overrides>()
            .context("read environment overrides")?;
        Ok(overrides)
    }
}

impl Config {
    pub fn from_toml(src: &str) -> Result<Self> {
        let config = toml::from_str(src).context("parse config")?;
        Ok(config)
    }

    pub fn apply_overrides(self, overrides: &Overrides) -> Self {
        let backend = match overrides.backend_url.as_ref() {
            Some(url) => BackendConfig {
                url: url.clone(),
                ..self.backend
            },
            None => self.backend,
        };
        let session = match overrides.token_file.as_ref() {
            Some(token_file) => SessionConfig {
                token_file: token_file.clone(),
            },
            None => self.session,
        };
        Config {
            backend,
            session,
            ..self
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct EnvLogger {
    level: Option<LogLevel>,
    modules: HashMap<String, LogLevel>,
    timestamp_nanos: bool,
}

impl EnvLogger {
    pub fn builder(&self) -> env_logger::Builder {
        let mut b = env_logger::Builder::from_default_env();
        if let Some(level) = self.level {
            b.filter_level(level.to_filter());
        }

        for (module, level) in self.modules.iter() {
            b.filter_module(module, level.to_filter());
        }

        if self.timestamp_nanos {
            b.format_timestamp_nanos();
        }

        b
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml("").expect("parse");
        assert_eq!(config.backend.url, DEFAULT_BACKEND_URL);
        assert_eq!(config.menu_engineering, Thresholds::default());
        assert_eq!(config.rate_master.rounding, Rounding::Chained);
    }

    #[test]
    fn reads_every_section() {
        let config = Config::from_toml(
            r#"
            [backend]
            url = "https://backoffice.example/api"
            timeout_secs = 5

            [session]
            token_file = "/tmp/token.json"

            [menu_engineering]
            profit = 60.0

            [rate_master]
            rounding = "full_precision"
            "#,
        )
        .expect("parse");
        assert_eq!(config.backend.timeout_secs, Some(5));
        assert_eq!(config.session.token_file, PathBuf::from("/tmp/token.json"));
        assert_eq!(config.menu_engineering.profit, 60.0);
        assert_eq!(config.menu_engineering.popularity, 30.0);
        assert_eq!(config.rate_master.rounding, Rounding::FullPrecision);
        assert!(config.backend.build().is_ok());
    }

    #[test]
    fn overrides_replace_only_what_they_name() {
        let config = Config::from_toml("[backend]\ntimeout_secs = 3\n").expect("parse");
        let overrides = Overrides {
            backend_url: Some("http://10.0.0.2:4040/api/".into()),
            token_file: None,
        };
        let config = config.apply_overrides(&overrides);
        assert_eq!(config.backend.url, "http://10.0.0.2:4040/api/");
        assert_eq!(config.backend.timeout_secs, Some(3));
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn overrides_are_read_with_a_prefix() {
        let vars = vec![
            ("BACKOFFICE_BACKEND_URL".to_string(), "http://api/".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ];
        let overrides = envy::prefixed(ENV_PREFIX)
            .from_iter::<_, Overrides>(vars)
            .expect("from_iter");
        assert_eq!(overrides.backend_url.as_deref(), Some("http://api/"));
        assert_eq!(overrides.token_file, None);
    }

    #[test]
    fn logger_section_parses() {
        let logger: EnvLogger = toml::from_str(
            "level = \"info\"\ntimestamp_nanos = true\n[modules]\nbackoffice = \"debug\"\n",
        )
        .expect("parse");
        assert_eq!(logger.level, Some(LogLevel::Info));
        assert_eq!(logger.modules.get("backoffice"), Some(&LogLevel::Debug));
    }
}
