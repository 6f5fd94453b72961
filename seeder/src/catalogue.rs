//! Demo data: the room catalogue and a season of random temperatures.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rand::Rng;
use rust_decimal::Decimal;
use shared::{Room, RoomRepository, WeatherReading, WeatherRepository};
use tracing::{error, info};

/// Rooms per city with their daily base price.
pub const ROOMS: &[(&str, &[(&str, u32)])] = &[
    (
        "New York",
        &[
            ("Manhattan Conference Hall", 500),
            ("Broadway Meeting Room", 250),
            ("Central Park Suite", 150),
            ("Empire Board Room", 100),
        ],
    ),
    (
        "London",
        &[
            ("Westminster Hall", 550),
            ("Thames Meeting Room", 300),
            ("Piccadilly Suite", 200),
            ("Oxford Board Room", 120),
        ],
    ),
    (
        "Tokyo",
        &[
            ("Shibuya Conference Center", 600),
            ("Ginza Meeting Room", 350),
            ("Akihabara Suite", 180),
            ("Roppongi Board Room", 100),
        ],
    ),
    (
        "Sydney",
        &[
            ("Harbour View Hall", 520),
            ("Opera House Meeting Room", 280),
            ("Bondi Suite", 150),
            ("Darling Board Room", 90),
        ],
    ),
    (
        "Paris",
        &[
            ("Champs-Élysées Hall", 580),
            ("Louvre Meeting Room", 320),
            ("Montmartre Suite", 220),
            ("Seine Board Room", 110),
        ],
    ),
    (
        "Berlin",
        &[
            ("Brandenburg Hall", 480),
            ("Alexanderplatz Meeting Room", 260),
            ("Charlottenburg Suite", 170),
            ("Kreuzberg Board Room", 95),
        ],
    ),
    (
        "Singapore",
        &[
            ("Marina Bay Conference Center", 650),
            ("Orchard Meeting Room", 380),
            ("Sentosa Suite", 210),
            ("Raffles Board Room", 130),
        ],
    ),
    (
        "Toronto",
        &[
            ("CN Tower Hall", 510),
            ("Harbourfront Meeting Room", 290),
            ("Distillery Suite", 160),
            ("Yorkville Board Room", 100),
        ],
    ),
];

/// Inclusive range of generated temperatures, in °C.
pub const TEMPERATURE_RANGE: (i32, i32) = (-10, 35);

/// Outcome of one seeding run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub written: usize,
    pub failed: usize,
}

/// Every day from 15 Dec 2025 through 30 Mar 2026.
pub fn seed_dates() -> Result<Vec<NaiveDate>> {
    let start = NaiveDate::from_ymd_opt(2025, 12, 15).context("invalid season start")?;
    let end = NaiveDate::from_ymd_opt(2026, 3, 30).context("invalid season end")?;
    Ok(start.iter_days().take_while(|date| *date <= end).collect())
}

pub fn rooms() -> impl Iterator<Item = Room> {
    ROOMS.iter().flat_map(|(location, rooms)| {
        rooms.iter().map(move |(name, price)| Room {
            location: location.to_string(),
            room_name: name.to_string(),
            price: Decimal::from(*price),
        })
    })
}

pub async fn seed_rooms(repo: &dyn RoomRepository) -> SeedReport {
    info!("Seeding rooms...");
    let mut report = SeedReport::default();

    for room in rooms() {
        match repo.put_room(&room).await {
            Ok(()) => report.written += 1,
            Err(e) => {
                error!(location = %room.location, room = %room.room_name, error = %e, "Failed to insert room");
                report.failed += 1;
            }
        }
    }

    info!(written = report.written, failed = report.failed, "Seeded rooms");
    report
}

pub async fn seed_weather<R: Rng>(repo: &dyn WeatherRepository, rng: &mut R) -> Result<SeedReport> {
    info!("Seeding weather data...");
    let dates = seed_dates()?;
    let (low, high) = TEMPERATURE_RANGE;
    let mut report = SeedReport::default();

    for (location, _) in ROOMS {
        for date in &dates {
            let reading = WeatherReading {
                location: location.to_string(),
                date: *date,
                temp: Decimal::from(rng.gen_range(low..=high)),
            };

            match repo.put_reading(&reading).await {
                Ok(()) => report.written += 1,
                Err(e) => {
                    error!(location, %date, error = %e, "Failed to insert weather reading");
                    report.failed += 1;
                }
            }
        }
        info!(location, "Completed seeding");
    }

    info!(written = report.written, failed = report.failed, "Seeded weather readings");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::MemoryStore;

    #[test]
    fn test_seed_dates_cover_the_season() {
        let dates = seed_dates().unwrap();
        assert_eq!(dates.len(), 106);
        assert_eq!(dates.first(), NaiveDate::from_ymd_opt(2025, 12, 15).as_ref());
        assert_eq!(dates.last(), NaiveDate::from_ymd_opt(2026, 3, 30).as_ref());
    }

    #[test]
    fn test_catalogue_shape() {
        assert_eq!(ROOMS.len(), 8);
        assert!(ROOMS.iter().all(|(_, rooms)| rooms.len() == 4));
        assert_eq!(rooms().count(), 32);
    }

    #[tokio::test]
    async fn test_seed_rooms() {
        let store = MemoryStore::new();
        let report = seed_rooms(&store).await;
        assert_eq!(report, SeedReport { written: 32, failed: 0 });

        let hall = store
            .get_room("New York", "Manhattan Conference Hall")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hall.price, Decimal::from(500));
        assert_eq!(store.rooms_by_location("Paris").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_seed_weather() {
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(7);
        let report = seed_weather(&store, &mut rng).await.unwrap();
        assert_eq!(report, SeedReport { written: 8 * 106, failed: 0 });

        for date in seed_dates().unwrap() {
            let reading = store.get_reading("Toronto", date).await.unwrap().unwrap();
            assert!(reading.temp >= Decimal::from(-10) && reading.temp <= Decimal::from(35));
        }
    }

    /// Rejects every reading for one city.
    struct FlakyWeather {
        inner: MemoryStore,
        broken: &'static str,
    }

    #[async_trait]
    impl WeatherRepository for FlakyWeather {
        async fn get_reading(&self, location: &str, date: NaiveDate) -> shared::Result<Option<WeatherReading>> {
            self.inner.get_reading(location, date).await
        }

        async fn put_reading(&self, reading: &WeatherReading) -> shared::Result<()> {
            if reading.location == self.broken {
                return Err(shared::Error::Store("throttled".to_string()));
            }
            self.inner.put_reading(reading).await
        }
    }

    #[tokio::test]
    async fn test_seed_weather_counts_failures() {
        let repo = FlakyWeather {
            inner: MemoryStore::new(),
            broken: "Berlin",
        };
        let mut rng = StdRng::seed_from_u64(1);
        let report = seed_weather(&repo, &mut rng).await.unwrap();
        assert_eq!(report.failed, 106);
        assert_eq!(report.written, 7 * 106);
    }
}
