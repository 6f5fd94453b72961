//! Rooms Lambda - Public room catalogue and availability.
//!
//! Endpoints:
//! - GET /rooms?location= - All rooms at a location
//! - GET /rooms/available?location=&date= - Rooms not yet booked that day
//! - GET /health - Liveness check

use std::collections::HashSet;
use std::sync::Arc;

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::Serialize;
use serde_json::json;
use shared::http::{error_response, json_response, query_as, respond, route_path};
use shared::models::{location_date_key, validated, LocationDateQuery, LocationQuery};
use shared::{BookingRepository, Config, DynamoStore, Room, RoomRepository};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// `GET /rooms` response
#[derive(Debug, Serialize)]
struct RoomsResponse {
    location: String,
    rooms: Vec<Room>,
}

/// `GET /rooms/available` response
#[derive(Debug, Serialize)]
struct AvailabilityResponse {
    location: String,
    date: String,
    available_rooms: Vec<Room>,
    total_rooms: usize,
    available_count: usize,
}

/// Application state
struct AppState {
    rooms: Arc<dyn RoomRepository>,
    bookings: Arc<dyn BookingRepository>,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let store = Arc::new(DynamoStore::connect(&config).await);

        Ok(Self {
            rooms: store.clone(),
            bookings: store,
        })
    }
}

async fn list_rooms(state: &AppState, event: &Request) -> shared::Result<RoomsResponse> {
    let query: LocationQuery = validated(query_as(event)?)?;
    let rooms = state.rooms.rooms_by_location(&query.location).await?;
    debug!(location = %query.location, count = rooms.len(), "Listed rooms");

    Ok(RoomsResponse {
        location: query.location,
        rooms,
    })
}

async fn available_rooms(state: &AppState, event: &Request) -> shared::Result<AvailabilityResponse> {
    let query: LocationDateQuery = validated(query_as(event)?)?;
    let date = query.date()?;

    let rooms = state.rooms.rooms_by_location(&query.location).await?;
    let booked: HashSet<String> = state
        .bookings
        .bookings_on(&location_date_key(&query.location, date))
        .await?
        .into_iter()
        .map(|booking| booking.room_name)
        .collect();

    let total_rooms = rooms.len();
    let available_rooms: Vec<Room> = rooms
        .into_iter()
        .filter(|room| !booked.contains(&room.room_name))
        .collect();

    Ok(AvailabilityResponse {
        location: query.location,
        date: query.date,
        available_count: available_rooms.len(),
        available_rooms,
        total_rooms,
    })
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let path = route_path(&event);
    let method = event.method().as_str();
    info!(method, path, "Rooms request");

    match (method, path) {
        ("GET", "/rooms") => respond(200, list_rooms(&state, &event).await, "Failed to retrieve rooms"),
        ("GET", "/rooms/available") => respond(
            200,
            available_rooms(&state, &event).await,
            "Failed to retrieve available rooms",
        ),
        ("GET", "/health") => json_response(200, &json!({"status": "ok", "service": "booking"})),
        (_, "/rooms" | "/rooms/available" | "/health") => error_response(405, "Method not allowed"),
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
