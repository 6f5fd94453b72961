//! Shared library for the conference booking Lambda functions.
//!
//! Pricing, models, storage, authentication and HTTP helpers used by the
//! booking API, the weather API and the seeder.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod pricing;
pub mod store;
pub mod weather;

pub use auth::{extract_user_from_context, AuthenticatedUser, CognitoClaims, TokenVerifier};
pub use config::Config;
pub use error::{Error, Result};
pub use models::{Booking, BookingRequest, PriceBreakdown, Room, TemperatureReport, WeatherReading};
pub use pricing::{PriceQuote, PricingEngine, PricingError};
pub use store::{BookingRepository, DynamoStore, MemoryStore, RoomRepository, WeatherRepository};
pub use weather::{TemperatureSource, WeatherClient};
