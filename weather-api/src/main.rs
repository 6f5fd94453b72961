//! Weather Lambda - Serves recorded daily temperatures.
//!
//! Endpoints:
//! - GET /weather?location=&date= - Temperature for a location on a day
//! - GET /health - Liveness check

use std::sync::Arc;

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde_json::json;
use shared::http::{error_response, json_response, query_as, respond, route_path};
use shared::models::{validated, LocationDateQuery};
use shared::{Config, DynamoStore, TemperatureReport, WeatherRepository};
use tracing::info;
use tracing_subscriber::EnvFilter;

const NOT_FOUND_MESSAGE: &str = "Weather data not found for the specified location and date";

/// Application state
struct AppState {
    weather: Arc<dyn WeatherRepository>,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        Ok(Self {
            weather: Arc::new(DynamoStore::connect(&config).await),
        })
    }
}

async fn get_temperature(state: &AppState, event: &Request) -> shared::Result<TemperatureReport> {
    let query: LocationDateQuery = validated(query_as(event)?)?;
    let date = query.date()?;

    state
        .weather
        .get_reading(&query.location, date)
        .await?
        .map(TemperatureReport::from)
        .ok_or_else(|| shared::Error::NotFound(NOT_FOUND_MESSAGE.to_string()))
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let path = route_path(&event);
    let method = event.method().as_str();
    info!(method, path, "Weather request");

    match (method, path) {
        ("GET", "/weather") => respond(
            200,
            get_temperature(&state, &event).await,
            "Failed to retrieve weather data",
        ),
        ("GET", "/health") => json_response(200, &json!({"status": "ok", "service": "weather"})),
        (_, "/weather" | "/health") => error_response(405, "Method not allowed"),
        _ => error_response(404, "Not found"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lambda_http::RequestExt;
    use rust_decimal_macros::dec;
    use shared::{MemoryStore, WeatherReading};
    use std::collections::HashMap;

    async fn state() -> Arc<AppState> {
        let store = MemoryStore::new();
        store
            .put_reading(&WeatherReading {
                location: "Toronto".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 1, 8).unwrap(),
                temp: dec!(-9),
            })
            .await
            .unwrap();
        Arc::new(AppState {
            weather: Arc::new(store),
        })
    }

    fn get(path: &str, query: &[(&str, &str)]) -> Request {
        let params: HashMap<String, String> = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        lambda_http::http::Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::Empty)
            .unwrap()
            .with_query_string_parameters(params)
    }

    fn body(response: &Response<Body>) -> serde_json::Value {
        serde_json::from_slice(response.body().as_ref()).unwrap()
    }

    #[tokio::test]
    async fn test_get_temperature() {
        let response = handler(
            state().await,
            get("/api/weather", &[("location", "Toronto"), ("date", "2026-01-08")]),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            body(&response),
            json!({"location": "Toronto", "date": "2026-01-08", "temperature": -9.0})
        );
    }

    #[tokio::test]
    async fn test_missing_reading() {
        let response = handler(
            state().await,
            get("/weather", &[("location", "Toronto"), ("date", "2026-01-09")]),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), 404);
        assert_eq!(body(&response)["error"], NOT_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn test_validation() {
        let response = handler(state().await, get("/weather", &[("date", "08/01/2026")]))
            .await
            .unwrap();
        assert_eq!(response.status(), 422);

        let json = body(&response);
        assert_eq!(json["errors"]["location"][0], "The location field is required.");
        assert_eq!(json["errors"]["date"][0], "The date field must match the format Y-m-d.");
    }

    #[tokio::test]
    async fn test_routing() {
        let response = handler(state().await, get("/health", &[])).await.unwrap();
        assert_eq!(body(&response)["service"], "weather");

        let response = handler(state().await, get("/forecast", &[])).await.unwrap();
        assert_eq!(response.status(), 404);
    }
}
