//! Persistence for rooms, bookings and weather readings.
//!
//! Handlers depend on the repository traits only. [`DynamoStore`] backs the
//! deployed functions; [`MemoryStore`] backs local runs and tests.

mod dynamo;
mod memory;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{Booking, Room, WeatherReading};
use crate::Result;

#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// All rooms at a location, ordered by name.
    async fn rooms_by_location(&self, location: &str) -> Result<Vec<Room>>;

    async fn get_room(&self, location: &str, room_name: &str) -> Result<Option<Room>>;

    /// Insert or replace a room.
    async fn put_room(&self, room: &Room) -> Result<()>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Every booking, optionally restricted to one user.
    async fn list_bookings(&self, user_id: Option<&str>) -> Result<Vec<Booking>>;

    /// Bookings sharing a `{location}_{date}` key.
    async fn bookings_on(&self, location_date: &str) -> Result<Vec<Booking>>;

    async fn get_booking(&self, location_date: &str, room_name: &str) -> Result<Option<Booking>>;

    /// Store a new booking. Fails with [`crate::Error::Conflict`] if the room
    /// is already booked for that day.
    async fn create_booking(&self, booking: &Booking) -> Result<()>;

    /// Remove a booking held by `user_id`. Fails with
    /// [`crate::Error::NotFound`] if no such booking exists for that user,
    /// which also covers a booking replaced after the caller checked it.
    async fn delete_booking(&self, location_date: &str, room_name: &str, user_id: &str) -> Result<()>;
}

#[async_trait]
pub trait WeatherRepository: Send + Sync {
    async fn get_reading(&self, location: &str, date: NaiveDate) -> Result<Option<WeatherReading>>;

    /// Insert or replace the reading for (location, date).
    async fn put_reading(&self, reading: &WeatherReading) -> Result<()>;
}

/// Message reported when a room is already taken for the day.
pub const BOOKING_CONFLICT: &str = "Room is already booked for this date";

pub const BOOKING_NOT_FOUND: &str = "Booking not found";
