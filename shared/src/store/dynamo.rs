//! DynamoDB-backed repositories.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{BookingRepository, RoomRepository, WeatherRepository, BOOKING_CONFLICT, BOOKING_NOT_FOUND};
use crate::config::Config;
use crate::models::{parse_date, Booking, Room, WeatherReading, DATE_FORMAT};
use crate::{Error, Result};

type Item = HashMap<String, AttributeValue>;

/// Rooms, bookings and weather tables behind one DynamoDB client.
#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
    rooms_table: String,
    bookings_table: String,
    weather_table: String,
}

impl DynamoStore {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            rooms_table: config.rooms_table.clone(),
            bookings_table: config.bookings_table.clone(),
            weather_table: config.weather_table.clone(),
        }
    }

    /// Build a client from the ambient AWS configuration in the configured region.
    pub async fn connect(config: &Config) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .load()
            .await;
        Self::new(Client::new(&sdk_config), config)
    }
}

fn store_error<E: std::error::Error>(operation: &str, err: E) -> Error {
    Error::Store(format!("{} failed: {}", operation, DisplayErrorContext(err)))
}

fn s(value: impl Into<String>) -> AttributeValue {
    AttributeValue::S(value.into())
}

fn n(value: Decimal) -> AttributeValue {
    AttributeValue::N(value.normalize().to_string())
}

fn string_attr(item: &Item, name: &str) -> Result<String> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| Error::Store(format!("item is missing string attribute '{}'", name)))
}

fn number_attr(item: &Item, name: &str) -> Result<Option<Decimal>> {
    match item.get(name) {
        None | Some(AttributeValue::Null(_)) => Ok(None),
        Some(AttributeValue::N(raw)) => Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .map(Some)
            .map_err(|e| Error::Store(format!("attribute '{}' is not a number: {}", name, e))),
        Some(_) => Err(Error::Store(format!("attribute '{}' is not a number", name))),
    }
}

fn required_number(item: &Item, name: &str) -> Result<Decimal> {
    number_attr(item, name)?
        .ok_or_else(|| Error::Store(format!("item is missing number attribute '{}'", name)))
}

fn room_from_item(item: &Item) -> Result<Room> {
    Ok(Room {
        location: string_attr(item, "location")?,
        room_name: string_attr(item, "roomName")?,
        price: required_number(item, "price")?,
    })
}

fn room_to_item(room: &Room) -> Item {
    HashMap::from([
        ("location".to_string(), s(&room.location)),
        ("roomName".to_string(), s(&room.room_name)),
        ("price".to_string(), n(room.price)),
    ])
}

/// Bookings written before surcharges were recorded only carry `price`.
fn booking_from_item(item: &Item) -> Result<Booking> {
    let price = required_number(item, "price")?;
    let date = parse_date(&string_attr(item, "date")?)
        .map_err(|_| Error::Store("booking has an invalid date".to_string()))?;
    let created_at = DateTime::parse_from_rfc3339(&string_attr(item, "createdAt")?)
        .map_err(|e| Error::Store(format!("booking has an invalid createdAt: {}", e)))?
        .with_timezone(&Utc);
    let weather_charge_percentage = number_attr(item, "weatherChargePercentage")?
        .and_then(|p| p.to_u32())
        .unwrap_or(0);
    let booking_id = item
        .get("bookingId")
        .and_then(|v| v.as_s().ok())
        .and_then(|id| Uuid::parse_str(id).ok());

    Ok(Booking {
        location_date: string_attr(item, "locationDate")?,
        room_name: string_attr(item, "roomName")?,
        location: string_attr(item, "location")?,
        date,
        user_id: string_attr(item, "userId")?,
        price,
        base_price: number_attr(item, "basePrice")?.unwrap_or(price),
        weather_charge_percentage,
        weather_charge: number_attr(item, "weatherCharge")?.unwrap_or(Decimal::ZERO),
        temperature: number_attr(item, "temperature")?,
        booking_id,
        created_at,
    })
}

fn booking_to_item(booking: &Booking) -> Item {
    let mut item = HashMap::from([
        ("locationDate".to_string(), s(&booking.location_date)),
        ("roomName".to_string(), s(&booking.room_name)),
        ("location".to_string(), s(&booking.location)),
        ("date".to_string(), s(booking.date.format(DATE_FORMAT).to_string())),
        ("userId".to_string(), s(&booking.user_id)),
        ("price".to_string(), n(booking.price)),
        ("basePrice".to_string(), n(booking.base_price)),
        (
            "weatherChargePercentage".to_string(),
            n(Decimal::from(booking.weather_charge_percentage)),
        ),
        ("weatherCharge".to_string(), n(booking.weather_charge)),
        ("createdAt".to_string(), s(booking.created_at.to_rfc3339())),
    ]);
    if let Some(temperature) = booking.temperature {
        item.insert("temperature".to_string(), n(temperature));
    }
    if let Some(id) = booking.booking_id {
        item.insert("bookingId".to_string(), s(id.to_string()));
    }
    item
}

fn reading_from_item(item: &Item) -> Result<WeatherReading> {
    let date = parse_date(&string_attr(item, "date")?)
        .map_err(|_| Error::Store("weather reading has an invalid date".to_string()))?;
    Ok(WeatherReading {
        location: string_attr(item, "location")?,
        date,
        temp: required_number(item, "temp")?,
    })
}

#[async_trait]
impl RoomRepository for DynamoStore {
    #[instrument(skip(self))]
    async fn rooms_by_location(&self, location: &str) -> Result<Vec<Room>> {
        let items: Vec<Item> = self
            .client
            .query()
            .table_name(&self.rooms_table)
            // "location" is a DynamoDB reserved word
            .key_condition_expression("#loc = :location")
            .expression_attribute_names("#loc", "location")
            .expression_attribute_values(":location", s(location))
            .into_paginator()
            .items()
            .send()
            .collect::<std::result::Result<Vec<_>, _>>()
            .await
            .map_err(|e| store_error("Query rooms", e))?;

        debug!("Found {} rooms", items.len());
        items.iter().map(room_from_item).collect()
    }

    async fn get_room(&self, location: &str, room_name: &str) -> Result<Option<Room>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.rooms_table)
            .key("location", s(location))
            .key("roomName", s(room_name))
            .send()
            .await
            .map_err(|e| store_error("GetItem room", e))?;

        output.item.as_ref().map(room_from_item).transpose()
    }

    async fn put_room(&self, room: &Room) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.rooms_table)
            .set_item(Some(room_to_item(room)))
            .send()
            .await
            .map_err(|e| store_error("PutItem room", e))?;
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for DynamoStore {
    #[instrument(skip(self))]
    async fn list_bookings(&self, user_id: Option<&str>) -> Result<Vec<Booking>> {
        let (filter, values) = match user_id {
            Some(user_id) => (
                Some("userId = :userId".to_string()),
                Some(HashMap::from([(":userId".to_string(), s(user_id))])),
            ),
            None => (None, None),
        };

        let items: Vec<Item> = self
            .client
            .scan()
            .table_name(&self.bookings_table)
            .set_filter_expression(filter)
            .set_expression_attribute_values(values)
            .into_paginator()
            .items()
            .send()
            .collect::<std::result::Result<Vec<_>, _>>()
            .await
            .map_err(|e| store_error("Scan bookings", e))?;

        items.iter().map(booking_from_item).collect()
    }

    async fn bookings_on(&self, location_date: &str) -> Result<Vec<Booking>> {
        let items: Vec<Item> = self
            .client
            .query()
            .table_name(&self.bookings_table)
            .key_condition_expression("locationDate = :locationDate")
            .expression_attribute_values(":locationDate", s(location_date))
            .into_paginator()
            .items()
            .send()
            .collect::<std::result::Result<Vec<_>, _>>()
            .await
            .map_err(|e| store_error("Query bookings", e))?;

        items.iter().map(booking_from_item).collect()
    }

    async fn get_booking(&self, location_date: &str, room_name: &str) -> Result<Option<Booking>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.bookings_table)
            .key("locationDate", s(location_date))
            .key("roomName", s(room_name))
            .send()
            .await
            .map_err(|e| store_error("GetItem booking", e))?;

        output.item.as_ref().map(booking_from_item).transpose()
    }

    #[instrument(skip(self, booking), fields(location_date = %booking.location_date, room = %booking.room_name))]
    async fn create_booking(&self, booking: &Booking) -> Result<()> {
        let result = self
            .client
            .put_item()
            .table_name(&self.bookings_table)
            .set_item(Some(booking_to_item(booking)))
            .condition_expression("attribute_not_exists(locationDate)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Err(Error::Conflict(BOOKING_CONFLICT.to_string()))
            }
            Err(e) => Err(store_error("PutItem booking", e)),
        }
    }

    async fn delete_booking(&self, location_date: &str, room_name: &str, user_id: &str) -> Result<()> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.bookings_table)
            .key("locationDate", s(location_date))
            .key("roomName", s(room_name))
            .condition_expression("userId = :userId")
            .expression_attribute_values(":userId", s(user_id))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Err(Error::NotFound(BOOKING_NOT_FOUND.to_string()))
            }
            Err(e) => Err(store_error("DeleteItem booking", e)),
        }
    }
}

#[async_trait]
impl WeatherRepository for DynamoStore {
    async fn get_reading(&self, location: &str, date: NaiveDate) -> Result<Option<WeatherReading>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.weather_table)
            .key("location", s(location))
            .key("date", s(date.format(DATE_FORMAT).to_string()))
            .send()
            .await
            .map_err(|e| store_error("GetItem weather", e))?;

        output.item.as_ref().map(reading_from_item).transpose()
    }

    async fn put_reading(&self, reading: &WeatherReading) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.weather_table)
            .item("location", s(&reading.location))
            .item("date", s(reading.date.format(DATE_FORMAT).to_string()))
            .item("temp", n(reading.temp))
            .send()
            .await
            .map_err(|e| store_error("PutItem weather", e))?;
        Ok(())
    }
}
