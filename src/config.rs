use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::{net::SocketAddr, time::Duration};
use validator::Validate;

use crate::database::DatabaseConfig;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub weather: WeatherConfig,
    #[validate(nested)]
    pub training: TrainingConfig,
    #[validate(nested)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WeatherConfig {
    #[validate(length(min = 1))]
    pub base_url: String,
    #[validate(length(min = 1, message = "set OPENWEATHER_API_KEY or WXP__WEATHER__API_KEY"))]
    pub api_key: String,
    #[validate(range(min = 1))]
    pub http_timeout_seconds: u64,
    #[validate(range(min = 1))]
    pub cache_ttl_seconds: u64,
}

impl WeatherConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TrainingConfig {
    #[validate(length(min = 1))]
    pub reference_cities: Vec<String>,
    #[serde(default = "default_true")]
    pub train_on_startup: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct HistoryConfig {
    #[validate(length(min = 1))]
    pub database_url: String,
    #[validate(range(min = 1))]
    pub max_connections: u32,
}

impl HistoryConfig {
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database_url.clone(),
            max_connections: self.max_connections,
            ..DatabaseConfig::default()
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// `config/default.toml`, then `OPENWEATHER_API_KEY`, then `WXP__SECTION__KEY`.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(
                Env::raw()
                    .only(&["OPENWEATHER_API_KEY"])
                    .map(|_| "weather.api_key".into()),
            )
            .merge(Env::prefixed("WXP__").split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Self = figment.extract().context("failed to read configuration")?;
        cfg.validate().context("invalid configuration")?;
        Ok(cfg)
    }
}
