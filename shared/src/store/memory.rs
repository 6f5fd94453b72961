//! In-process repositories for local runs and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::{BookingRepository, RoomRepository, WeatherRepository, BOOKING_CONFLICT, BOOKING_NOT_FOUND};
use crate::models::{Booking, Room, WeatherReading};
use crate::{Error, Result};

type Key = (String, String);

/// Keeps every table in ordered maps keyed the same way as DynamoDB.
#[derive(Default)]
pub struct MemoryStore {
    rooms: RwLock<BTreeMap<Key, Room>>,
    bookings: RwLock<BTreeMap<Key, Booking>>,
    weather: RwLock<BTreeMap<(String, NaiveDate), WeatherReading>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `rooms`.
    pub async fn with_rooms(rooms: impl IntoIterator<Item = Room>) -> Self {
        let store = Self::new();
        {
            let mut table = store.rooms.write().await;
            for room in rooms {
                table.insert((room.location.clone(), room.room_name.clone()), room);
            }
        }
        store
    }
}

#[async_trait]
impl RoomRepository for MemoryStore {
    async fn rooms_by_location(&self, location: &str) -> Result<Vec<Room>> {
        let rooms = self.rooms.read().await;
        Ok(rooms
            .values()
            .filter(|room| room.location == location)
            .cloned()
            .collect())
    }

    async fn get_room(&self, location: &str, room_name: &str) -> Result<Option<Room>> {
        let rooms = self.rooms.read().await;
        Ok(rooms.get(&(location.to_string(), room_name.to_string())).cloned())
    }

    async fn put_room(&self, room: &Room) -> Result<()> {
        let mut rooms = self.rooms.write().await;
        rooms.insert((room.location.clone(), room.room_name.clone()), room.clone());
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn list_bookings(&self, user_id: Option<&str>) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .filter(|booking| user_id.map_or(true, |id| booking.user_id == id))
            .cloned()
            .collect())
    }

    async fn bookings_on(&self, location_date: &str) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .filter(|booking| booking.location_date == location_date)
            .cloned()
            .collect())
    }

    async fn get_booking(&self, location_date: &str, room_name: &str) -> Result<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .get(&(location_date.to_string(), room_name.to_string()))
            .cloned())
    }

    async fn create_booking(&self, booking: &Booking) -> Result<()> {
        let mut bookings = self.bookings.write().await;
        let key = (booking.location_date.clone(), booking.room_name.clone());
        if bookings.contains_key(&key) {
            return Err(Error::Conflict(BOOKING_CONFLICT.to_string()));
        }
        bookings.insert(key, booking.clone());
        Ok(())
    }

    async fn delete_booking(&self, location_date: &str, room_name: &str, user_id: &str) -> Result<()> {
        let mut bookings = self.bookings.write().await;
        let key = (location_date.to_string(), room_name.to_string());
        match bookings.get(&key) {
            Some(booking) if booking.user_id == user_id => {
                bookings.remove(&key);
                Ok(())
            }
            _ => Err(Error::NotFound(BOOKING_NOT_FOUND.to_string())),
        }
    }
}

#[async_trait]
impl WeatherRepository for MemoryStore {
    async fn get_reading(&self, location: &str, date: NaiveDate) -> Result<Option<WeatherReading>> {
        let weather = self.weather.read().await;
        Ok(weather.get(&(location.to_string(), date)).cloned())
    }

    async fn put_reading(&self, reading: &WeatherReading) -> Result<()> {
        let mut weather = self.weather.write().await;
        weather.insert((reading.location.clone(), reading.date), reading.clone());
        Ok(())
    }
}
