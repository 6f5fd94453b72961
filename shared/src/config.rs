//! Configuration management for Lambda functions.

use std::env;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::pricing::DEFAULT_COMFORT_TARGET;
use crate::{Error, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// AWS region
    pub aws_region: String,
    /// DynamoDB table holding rooms, keyed by (location, roomName)
    pub rooms_table: String,
    /// DynamoDB table holding bookings, keyed by (locationDate, roomName)
    pub bookings_table: String,
    /// DynamoDB table holding daily temperatures, keyed by (location, date)
    pub weather_table: String,
    /// Cognito user pool used to verify bearer tokens
    pub cognito_user_pool_id: Option<String>,
    /// Base URL of the weather API, including any `/api` prefix
    pub weather_service_url: String,
    /// Comfort temperature the surcharge is measured from
    pub comfort_target: Decimal,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let comfort_target = match lookup("COMFORT_TARGET_TEMPERATURE") {
            Some(raw) => Decimal::from_str(raw.trim()).map_err(|e| {
                Error::Config(format!("COMFORT_TARGET_TEMPERATURE '{}' is not a number: {}", raw, e))
            })?,
            None => DEFAULT_COMFORT_TARGET,
        };

        Ok(Self {
            aws_region: var("AWS_REGION", "us-east-1"),
            rooms_table: var("DYNAMODB_ROOM_TABLE", "conference-booking-rooms-dev"),
            bookings_table: var("DYNAMODB_BOOKING_TABLE", "conference-booking-bookings-dev"),
            weather_table: var("DYNAMODB_WEATHER_TABLE", "conference-booking-weather-dev"),
            cognito_user_pool_id: lookup("COGNITO_USER_POOL_ID").filter(|id| !id.is_empty()),
            weather_service_url: var("WEATHER_SERVICE_URL", "http://localhost:8001/api")
                .trim_end_matches('/')
                .to_string(),
            comfort_target,
        })
    }

    /// Token issuer for the configured user pool.
    pub fn cognito_issuer(&self) -> Option<String> {
        self.cognito_user_pool_id.as_ref().map(|pool| {
            format!("https://cognito-idp.{}.amazonaws.com/{}", self.aws_region, pool)
        })
    }

    /// JWKS endpoint for the configured user pool.
    pub fn cognito_jwks_url(&self) -> Option<String> {
        self.cognito_issuer()
            .map(|issuer| format!("{}/.well-known/jwks.json", issuer))
    }
}
