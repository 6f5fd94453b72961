//! Shared data models.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::pricing::PriceQuote;
use crate::{Error, Result};

/// Calendar date format used in keys, query strings and bodies.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const DATE_FORMAT_MESSAGE: &str = "The date field must match the format Y-m-d.";

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| Error::invalid_field("date", DATE_FORMAT_MESSAGE))
}

fn validate_date(value: &str) -> std::result::Result<(), ValidationError> {
    if NaiveDate::parse_from_str(value, DATE_FORMAT).is_ok() {
        return Ok(());
    }
    let mut error = ValidationError::new("date_format");
    error.message = Some(Cow::Borrowed(DATE_FORMAT_MESSAGE));
    Err(error)
}

/// Partition key of the bookings table.
pub fn location_date_key(location: &str, date: NaiveDate) -> String {
    format!("{}_{}", location, date.format(DATE_FORMAT))
}

/// Run derived validation, converting failures into a 422.
pub fn validated<T: Validate>(value: T) -> Result<T> {
    value.validate()?;
    Ok(value)
}

/// A bookable conference room.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub location: String,
    pub room_name: String,
    /// Base price per day, before any weather surcharge
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// A confirmed room booking for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// `{location}_{date}`
    pub location_date: String,
    pub room_name: String,
    pub location: String,
    pub date: NaiveDate,
    /// Cognito subject of the user who booked
    pub user_id: String,
    /// Total charged, surcharge included
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_price: Decimal,
    pub weather_charge_percentage: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub weather_charge: Decimal,
    /// Temperature the price was quoted at, if one was available
    #[serde(with = "rust_decimal::serde::float_option")]
    pub temperature: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Build a booking that charges exactly what the breakdown quoted.
    pub fn from_breakdown(
        breakdown: &PriceBreakdown,
        user_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            location_date: location_date_key(&breakdown.location, breakdown.date),
            room_name: breakdown.room_name.clone(),
            location: breakdown.location.clone(),
            date: breakdown.date,
            user_id: user_id.into(),
            price: breakdown.total_price,
            base_price: breakdown.base_price,
            weather_charge_percentage: breakdown.weather_charge_percentage,
            weather_charge: breakdown.weather_charge,
            temperature: breakdown.temperature,
            booking_id: Some(Uuid::new_v4()),
            created_at,
        }
    }
}

/// Recorded temperature for a location on a given day.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub location: String,
    pub date: NaiveDate,
    pub temp: Decimal,
}

/// Weather API response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReport {
    pub location: String,
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub temperature: Decimal,
}

impl From<WeatherReading> for TemperatureReport {
    fn from(reading: WeatherReading) -> Self {
        Self {
            location: reading.location,
            date: reading.date,
            temperature: reading.temp,
        }
    }
}

/// `?location=` query.
#[derive(Debug, Deserialize, Validate)]
pub struct LocationQuery {
    #[serde(default)]
    #[validate(length(min = 1, message = "The location field is required."))]
    pub location: String,
}

/// `?location=&date=` query.
#[derive(Debug, Deserialize, Validate)]
pub struct LocationDateQuery {
    #[serde(default)]
    #[validate(length(min = 1, message = "The location field is required."))]
    pub location: String,
    #[serde(default)]
    #[validate(custom(function = "validate_date"))]
    pub date: String,
}

impl LocationDateQuery {
    pub fn date(&self) -> Result<NaiveDate> {
        parse_date(&self.date)
    }
}

/// Identifies one room on one day; used to quote, create and cancel bookings.
#[derive(Debug, Deserialize, Validate)]
pub struct BookingRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "The location field is required."))]
    pub location: String,
    #[serde(default)]
    #[validate(custom(function = "validate_date"))]
    pub date: String,
    #[serde(default)]
    #[serde(rename = "roomName")]
    #[validate(length(min = 1, message = "The roomName field is required."))]
    pub room_name: String,
}

impl BookingRequest {
    pub fn date(&self) -> Result<NaiveDate> {
        parse_date(&self.date)
    }
}

/// `GET /bookings` filter.
#[derive(Debug, Default, Deserialize)]
pub struct BookingsFilter {
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
}

/// Price preview returned to the front end before a booking is confirmed.
///
/// Field names are part of the front-end contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBreakdown {
    pub room_name: String,
    pub location: String,
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_price: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub temperature: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub temperature_difference: Option<Decimal>,
    pub weather_charge_percentage: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub weather_charge: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
}

impl PriceBreakdown {
    /// Breakdown for a room on a date. Without a quote the base price is charged as-is.
    pub fn new(room: &Room, date: NaiveDate, quote: Option<&PriceQuote>) -> Self {
        let (temperature, temperature_difference, weather_charge_percentage, weather_charge, total_price) =
            match quote {
                Some(q) => (
                    Some(q.temperature),
                    Some(q.difference),
                    q.charge_percentage,
                    q.additional_charge,
                    q.total_price,
                ),
                None => (None, None, 0, Decimal::ZERO, room.price),
            };

        Self {
            room_name: room.room_name.clone(),
            location: room.location.clone(),
            date,
            base_price: room.price,
            temperature,
            temperature_difference,
            weather_charge_percentage,
            weather_charge,
            total_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::PricingEngine;
    use rust_decimal_macros::dec;

    fn room() -> Room {
        Room {
            location: "London".to_string(),
            room_name: "Thames Meeting Room".to_string(),
            price: dec!(300),
        }
    }

    #[test]
    fn test_location_date_key() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(location_date_key("New York", date), "New York_2026-01-05");
    }

    #[test]
    fn test_booking_request_validation() {
        let request: BookingRequest = serde_json::from_str("{}").unwrap();
        let err = validated(request).unwrap_err();
        let Error::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.contains_key("location"));
        assert!(fields.contains_key("date"));
        assert!(fields.contains_key("roomName"));
    }

    #[test]
    fn test_booking_request_rejects_bad_date() {
        let request: BookingRequest = serde_json::from_str(
            r#"{"location":"London","date":"25/12/2025","roomName":"Thames Meeting Room"}"#,
        )
        .unwrap();
        let Error::Validation(fields) = validated(request).unwrap_err() else {
            panic!("expected validation error");
        };
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["date"], vec![DATE_FORMAT_MESSAGE.to_string()]);
    }

    #[test]
    fn test_booking_request_valid() {
        let request: BookingRequest = serde_json::from_str(
            r#"{"location":"London","date":"2025-12-25","roomName":"Thames Meeting Room"}"#,
        )
        .unwrap();
        let request = validated(request).unwrap();
        assert_eq!(request.date().unwrap(), NaiveDate::from_ymd_opt(2025, 12, 25).unwrap());
    }

    #[test]
    fn test_price_breakdown_json_contract() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let quote = PricingEngine::new().quote(dec!(300), dec!(16));
        let breakdown = PriceBreakdown::new(&room(), date, Some(&quote));

        let json = serde_json::to_value(&breakdown).unwrap();
        assert_eq!(json["room_name"], "Thames Meeting Room");
        assert_eq!(json["date"], "2026-02-01");
        assert_eq!(json["base_price"].as_f64(), Some(300.0));
        assert_eq!(json["temperature"].as_f64(), Some(16.0));
        assert_eq!(json["temperature_difference"].as_f64(), Some(5.0));
        assert_eq!(json["weather_charge_percentage"], 20);
        assert_eq!(json["weather_charge"].as_f64(), Some(60.0));
        assert_eq!(json["total_price"].as_f64(), Some(360.0));
    }

    #[test]
    fn test_price_breakdown_without_temperature() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let breakdown = PriceBreakdown::new(&room(), date, None);
        assert_eq!(breakdown.total_price, dec!(300));
        assert_eq!(breakdown.weather_charge_percentage, 0);

        let json = serde_json::to_value(&breakdown).unwrap();
        assert!(json["temperature"].is_null());
        assert!(json["temperature_difference"].is_null());
    }

    #[test]
    fn test_booking_from_breakdown() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let quote = PricingEngine::new().quote(dec!(300), dec!(41));
        let breakdown = PriceBreakdown::new(&room(), date, Some(&quote));
        let booking = Booking::from_breakdown(&breakdown, "user-1", Utc::now());

        assert_eq!(booking.location_date, "London_2026-02-01");
        assert_eq!(booking.price, dec!(450));
        assert_eq!(booking.base_price, dec!(300));
        assert_eq!(booking.weather_charge, dec!(150));
        assert_eq!(booking.temperature, Some(dec!(41)));

        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["roomName"], "Thames Meeting Room");
        assert_eq!(json["locationDate"], "London_2026-02-01");
        assert_eq!(json["userId"], "user-1");
    }
}
