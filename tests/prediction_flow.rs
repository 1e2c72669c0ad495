//! End-to-end tests: HTTP API over a mocked OpenWeatherMap.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use weather_predictor::{api, config::Config, controller::AppState, database::Database};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PANEL: [&str; 6] = ["Delhi", "Mumbai", "Chennai", "Kolkata", "Pune", "Jaipur"];

fn current_payload(i: usize) -> Value {
    let i = i as f64;
    json!({
        "coord": { "lat": 10.0 + i, "lon": 70.0 + i },
        "weather": [{ "description": "haze", "icon": "50d" }],
        "main": {
            "temp": 20.0 + 2.0 * i,
            "feels_like": 21.0 + 2.0 * i,
            "humidity": 80.0 - 5.0 * i,
            "pressure": 1015.0 - i
        },
        "visibility": 4000.0 + 500.0 * i,
        "wind": { "speed": 1.5 + 0.5 * i },
        "clouds": { "all": 10.0 * i }
    })
}

fn forecast_payload() -> Value {
    let list: Vec<Value> = (0..40)
        .map(|slot| {
            let day = 20 + slot / 8;
            let hour = (slot % 8) * 3;
            json!({
                "dt_txt": format!("2026-10-{day:02} {hour:02}:00:00"),
                "main": { "temp": 25.0 + hour as f64 / 3.0 },
                "weather": [{ "description": "clear sky", "icon": "01d" }]
            })
        })
        .collect();
    json!({ "list": list })
}

async fn mock_openweather() -> MockServer {
    let server = MockServer::start().await;

    for (i, city) in PANEL.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", *city))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_payload(i)))
            .expect(1)
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Atlantis"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "cod": "404", "message": "city not found" })),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/air_pollution"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{ "components": { "pm2_5": 12.0 } }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_payload()))
        .mount(&server)
        .await;

    server
}

async fn app(server: &MockServer) -> (Router, AppState) {
    let panel = PANEL
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let toml = format!(
        r#"
        [server]
        host = "127.0.0.1"
        port = 0
        request_timeout_secs = 30

        [weather]
        base_url = "{}"
        api_key = "test-key"
        http_timeout_seconds = 5
        cache_ttl_seconds = 600

        [training]
        reference_cities = [{panel}]
        train_on_startup = false

        [history]
        database_url = "sqlite::memory:"
        max_connections = 1
        "#,
        server.uri()
    );
    let cfg = Config::from_figment(Figment::from(Toml::string(&toml))).unwrap();

    let db = Database::new(&cfg.history.database()).await.unwrap();
    let state = AppState::new(cfg.clone(), &db).unwrap();
    (api::router(state.clone(), &cfg), state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn predict(city: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(format!("city={city}")))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_predict_trains_once_and_serves_from_cache() {
    let server = mock_openweather().await;
    let (app, state) = app(&server).await;
    assert!(!state.engine.is_trained().await);

    let (status, body) = send(&app, predict("Chennai")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(state.engine.is_trained().await);

    assert_eq!(body["actual_temp"], 24.0);
    assert_eq!(body["city_data"]["aqi"], 50);
    assert_eq!(body["city_data"]["description"], "haze");
    let best = body["best_model"].as_str().unwrap();
    assert_eq!(body["predicted_temp"], body["predictions"][best]);

    let forecast = body["forecast"].as_array().unwrap();
    assert_eq!(forecast.len(), 5);
    assert_eq!(forecast[0]["date"], "2026-10-20");
    assert_eq!(forecast[0]["day_name"], "Tue");
    assert!(forecast.iter().all(|d| d["temp"] == 29.0));

    // Panel observations are reused for /compare; each city is fetched once
    let (status, body) = send(&app, get("/compare")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), PANEL.len());
    for (row, city) in rows.iter().zip(PANEL) {
        assert_eq!(row["city"], city);
        assert!(row["error"].as_f64().unwrap() >= 0.0);
    }

    server.verify().await;
}

#[tokio::test]
async fn test_unknown_city_is_bad_gateway_and_not_recorded() {
    let server = mock_openweather().await;
    let (app, _) = app(&server).await;

    let (status, body) = send(&app, predict("Atlantis")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "WeatherUnavailable");

    let (_, body) = send(&app, get("/history")).await;
    assert!(body["history"].as_array().unwrap().is_empty());
    assert_eq!(body["stats"]["total_predictions"], 0);
    assert_eq!(body["stats"]["avg_error"], 0.0);
}

#[tokio::test]
async fn test_history_accumulates_predictions() {
    let server = mock_openweather().await;
    let (app, _) = app(&server).await;

    for city in ["Delhi", "Pune", "Delhi"] {
        let (status, _) = send(&app, predict(city)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, get("/history?city=Delhi")).await;
    assert_eq!(status, StatusCode::OK);
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| r["city"] == "Delhi" && r["actual_temp"] == 20.0));
    assert!(history[0]["id"].as_i64() > history[1]["id"].as_i64());

    let stats = &body["stats"];
    assert_eq!(stats["total_predictions"], 3);
    assert_eq!(stats["cities_predicted"], 2);
    assert!(stats["min_error"].as_f64().unwrap() <= stats["max_error"].as_f64().unwrap());

    let (_, body) = send(&app, get("/healthz")).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["trained"], true);
}
