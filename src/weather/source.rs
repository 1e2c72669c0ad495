use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tracing::warn;

use super::{aqi_from_pm25, select_daily, TtlCache, WeatherError, WeatherProvider, WeatherSource};
use crate::domain::{ForecastDay, WeatherObservation};

/// `WeatherSource` backed by a provider, with separate TTL caches for
/// current conditions and forecasts.
pub struct CachingWeatherSource<P> {
    provider: Arc<P>,
    current: TtlCache<WeatherObservation>,
    forecast: TtlCache<Vec<ForecastDay>>,
}

impl<P: WeatherProvider + 'static> CachingWeatherSource<P> {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

    pub fn new(provider: P, ttl: Duration) -> Self {
        Self {
            provider: Arc::new(provider),
            current: TtlCache::new(ttl),
            forecast: TtlCache::new(ttl),
        }
    }

    async fn load_current(provider: Arc<P>, city: String) -> Result<WeatherObservation, WeatherError> {
        let c = provider.current(&city).await?;

        let aqi = match provider.pm25(c.coord).await {
            Ok(pm25) => aqi_from_pm25(pm25),
            Err(e) => {
                warn!(%city, error = %e, "air quality unavailable, reporting AQI 0");
                0
            }
        };

        Ok(WeatherObservation {
            city,
            temp: c.temp,
            humidity: c.humidity,
            pressure: c.pressure,
            wind_speed: c.wind_speed,
            feels_like: c.feels_like,
            clouds: c.clouds,
            visibility: c.visibility,
            description: c.description,
            icon: c.icon,
            aqi,
        })
    }

    async fn load_forecast(provider: Arc<P>, city: String) -> Result<Vec<ForecastDay>, WeatherError> {
        let entries = provider.forecast(&city).await?;
        Ok(select_daily(&entries))
    }
}

#[async_trait]
impl<P: WeatherProvider + 'static> WeatherSource for CachingWeatherSource<P> {
    async fn fetch_current(&self, city: &str) -> Option<WeatherObservation> {
        let (provider, owned) = (self.provider.clone(), city.to_string());
        match self
            .current
            .get_or_try_fetch(city, move || Self::load_current(provider, owned))
            .await
        {
            Ok(obs) => Some(obs),
            Err(e) => {
                warn!(city, error = %e, "current conditions unavailable");
                None
            }
        }
    }

    async fn fetch_forecast(&self, city: &str) -> Vec<ForecastDay> {
        let (provider, owned) = (self.provider.clone(), city.to_string());
        match self
            .forecast
            .get_or_try_fetch(city, move || Self::load_forecast(provider, owned))
            .await
        {
            Ok(days) => days,
            Err(e) => {
                warn!(city, error = %e, "forecast unavailable");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::{Coordinates, CurrentConditions, ForecastEntry};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubProvider {
        current_calls: AtomicUsize,
        forecast_calls: AtomicUsize,
        pm25: Option<f64>,
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        async fn current(&self, city: &str) -> Result<CurrentConditions, WeatherError> {
            self.current_calls.fetch_add(1, Ordering::SeqCst);
            if city == "Nowhere" {
                return Err(WeatherError::Status {
                    endpoint: "current conditions",
                    status: reqwest::StatusCode::NOT_FOUND,
                });
            }
            Ok(CurrentConditions {
                coord: Coordinates { lat: 19.0, lon: 72.8 },
                temp: 29.0,
                humidity: 70.0,
                pressure: 1010.0,
                wind_speed: 4.1,
                feels_like: 32.0,
                clouds: 20.0,
                visibility: 6000.0,
                description: "haze".to_string(),
                icon: "50d".to_string(),
            })
        }

        async fn pm25(&self, _coord: Coordinates) -> Result<f64, WeatherError> {
            self.pm25.ok_or(WeatherError::MissingField {
                endpoint: "air pollution",
                field: "list",
            })
        }

        async fn forecast(&self, _city: &str) -> Result<Vec<ForecastEntry>, WeatherError> {
            self.forecast_calls.fetch_add(1, Ordering::SeqCst);
            let noon = NaiveDate::from_ymd_opt(2026, 10, 20)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap();
            Ok(vec![ForecastEntry {
                timestamp: noon,
                temp: 30.0,
                description: "clear sky".to_string(),
                icon: "01d".to_string(),
            }])
        }
    }

    fn source(pm25: Option<f64>) -> CachingWeatherSource<StubProvider> {
        CachingWeatherSource::new(
            StubProvider {
                pm25,
                ..Default::default()
            },
            CachingWeatherSource::<StubProvider>::DEFAULT_TTL,
        )
    }

    #[tokio::test]
    async fn test_current_derives_aqi_and_caches() {
        let src = source(Some(12.0));

        let obs = src.fetch_current("Mumbai").await.unwrap();
        assert_eq!(obs.city, "Mumbai");
        assert_eq!(obs.aqi, 50);
        assert_eq!(obs.humidity, 70.0);

        src.fetch_current("Mumbai").await.unwrap();
        assert_eq!(src.provider.current_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pollution_failure_degrades_aqi() {
        let obs = source(None).fetch_current("Mumbai").await.unwrap();
        assert_eq!(obs.aqi, 0);
        assert_eq!(obs.temp, 29.0);
    }

    #[tokio::test]
    async fn test_not_found_is_absent_and_not_cached() {
        let src = source(Some(5.0));
        assert!(src.fetch_current("Nowhere").await.is_none());
        assert!(src.fetch_current("Nowhere").await.is_none());
        assert_eq!(src.provider.current_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_forecast_cached_separately() {
        let src = source(Some(5.0));
        src.fetch_current("Mumbai").await.unwrap();

        let days = src.fetch_forecast("Mumbai").await;
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].day_name, "Tue");

        src.fetch_forecast("Mumbai").await;
        assert_eq!(src.provider.forecast_calls.load(Ordering::SeqCst), 1);
        assert_eq!(src.provider.current_calls.load(Ordering::SeqCst), 1);
    }
}
