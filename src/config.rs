use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use ::config::{Config, Environment, File};
use serde::Deserialize;

const CONFIG_FILE: &str = "lease_scraper";
const ENV_PREFIX: &str = "LEASE";

/// Where to scrape from. Required only by the commands that scrape.
#[derive(Debug, Clone)]
pub struct Upstream {
    pub home_page: String,
    pub api_base: String,
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Page whose inline script carries the API key. Only `run` and
    /// `serve` need it.
    #[serde(default)]
    pub home_page: Option<String>,
    /// Base URL of the leasing API, e.g. `https://api.example.com/v1`.
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Daily fire time for the scheduler, `HH:MM` in UTC.
    #[serde(default = "default_schedule_at")]
    pub schedule_at: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/lease.sqlite")
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_schedule_at() -> String {
    "00:00".to_string()
}

impl Settings {
    /// Optional `lease_scraper.toml` in the working directory, then `LEASE_*`
    /// environment variables on top.
    pub fn load() -> Result<Self> {
        let raw = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read configuration")?;
        Self::from_config(raw)
    }

    fn from_config(raw: Config) -> Result<Self> {
        let settings: Settings = raw.try_deserialize().context("Invalid configuration")?;
        settings.schedule_time()?;
        Ok(settings)
    }

    pub fn upstream(&self) -> Result<Upstream> {
        match (&self.home_page, &self.api_base) {
            (Some(home_page), Some(api_base)) => Ok(Upstream {
                home_page: home_page.clone(),
                api_base: api_base.clone(),
            }),
            _ => anyhow::bail!("LEASE_HOME_PAGE and LEASE_API_BASE must be set to scrape"),
        }
    }

    pub fn schedule_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.schedule_at, "%H:%M")
            .with_context(|| format!("schedule_at must be HH:MM, got {:?}", self.schedule_at))
    }
}
