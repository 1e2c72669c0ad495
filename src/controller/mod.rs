use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::database::Database;
use crate::engine::PredictionEngine;
use crate::repo::Repositories;
use crate::weather::{CachingWeatherSource, OpenWeatherClient, WeatherSource};

/// Shared handles passed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub engine: Arc<PredictionEngine>,
    pub repos: Arc<Repositories>,
}

impl AppState {
    /// Wire the OpenWeatherMap client, its cache and the engine.
    pub fn new(cfg: Config, db: &Database) -> Result<Self> {
        let client = OpenWeatherClient::new(
            cfg.weather.base_url.clone(),
            cfg.weather.api_key.clone(),
            cfg.weather.http_timeout(),
        )?;
        let weather: Arc<dyn WeatherSource> =
            Arc::new(CachingWeatherSource::new(client, cfg.weather.cache_ttl()));

        let engine = Arc::new(PredictionEngine::new(
            weather,
            cfg.training.reference_cities.clone(),
        ));

        Ok(Self::from_parts(cfg, engine, Repositories::new(db)))
    }

    pub fn from_parts(cfg: Config, engine: Arc<PredictionEngine>, repos: Repositories) -> Self {
        Self {
            cfg,
            engine,
            repos: Arc::new(repos),
        }
    }
}
