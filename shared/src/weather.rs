//! Temperature lookups against the weather API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use tracing::debug;

use crate::models::{TemperatureReport, DATE_FORMAT};
use crate::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the booking functions get the day's temperature for a location.
#[async_trait]
pub trait TemperatureSource: Send + Sync {
    /// `Ok(None)` when no reading exists for that day.
    async fn temperature(&self, location: &str, date: NaiveDate) -> Result<Option<Decimal>>;
}

/// HTTP client for the weather API's `GET /weather` endpoint.
#[derive(Clone)]
pub struct WeatherClient {
    base_url: String,
    client: reqwest::Client,
}

impl WeatherClient {
    /// `base_url` includes any stage prefix, e.g. `https://host/api`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl TemperatureSource for WeatherClient {
    async fn temperature(&self, location: &str, date: NaiveDate) -> Result<Option<Decimal>> {
        let date = date.format(DATE_FORMAT).to_string();
        let response = self
            .client
            .get(format!("{}/weather", self.base_url))
            .query(&[("location", location), ("date", date.as_str())])
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Weather request failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(location, date = %date, "No weather reading");
                Ok(None)
            }
            status if status.is_success() => {
                let report: TemperatureReport = response
                    .json()
                    .await
                    .map_err(|e| Error::Upstream(format!("Invalid weather response: {}", e)))?;
                Ok(Some(report.temperature))
            }
            status => Err(Error::Upstream(format!("Weather API returned {}", status))),
        }
    }
}
