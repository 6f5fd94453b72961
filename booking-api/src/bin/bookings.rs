//! Bookings Lambda - Weather-priced room bookings for signed-in users.
//!
//! Endpoints:
//! - GET /bookings?userId= - List bookings
//! - GET /bookings/price-breakdown?location=&date=&roomName= - Quote a room for a day
//! - POST /bookings - Book a room
//! - DELETE /bookings - Cancel one of your bookings
//! - GET /health - Liveness check
//!
//! Every /bookings route requires a Cognito token.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde::Serialize;
use serde_json::json;
use shared::http::{
    bearer_token, error_response, failure_response, json_response, query_as, respond, route_path, ErrorBody,
};
use shared::models::{location_date_key, validated, BookingsFilter};
use shared::parse_body;
use shared::store::{BOOKING_CONFLICT, BOOKING_NOT_FOUND};
use shared::{
    extract_user_from_context, AuthenticatedUser, Booking, BookingRepository, BookingRequest, Config, DynamoStore,
    PriceBreakdown, PricingEngine, Room, RoomRepository, TemperatureSource, TokenVerifier, WeatherClient,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// `GET /bookings` response
#[derive(Debug, Serialize)]
struct BookingsResponse {
    bookings: Vec<Booking>,
    count: usize,
}

/// `POST /bookings` response
#[derive(Debug, Serialize)]
struct BookingCreated {
    message: &'static str,
    booking: Booking,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

/// Application state
struct AppState {
    rooms: Arc<dyn RoomRepository>,
    bookings: Arc<dyn BookingRepository>,
    temperatures: Arc<dyn TemperatureSource>,
    verifier: Option<TokenVerifier>,
    engine: PricingEngine,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let store = Arc::new(DynamoStore::connect(&config).await);
        let weather = WeatherClient::new(config.weather_service_url.as_str())?;

        let verifier = match (config.cognito_issuer(), config.cognito_jwks_url()) {
            (Some(issuer), Some(jwks_url)) => Some(TokenVerifier::cognito(issuer, jwks_url, reqwest::Client::new())),
            _ => {
                warn!("COGNITO_USER_POOL_ID not set, bearer tokens cannot be verified");
                None
            }
        };

        Ok(Self {
            rooms: store.clone(),
            bookings: store,
            temperatures: Arc::new(weather),
            verifier,
            engine: PricingEngine::with_target(config.comfort_target),
        })
    }
}

/// Resolve the caller, preferring claims an API Gateway authorizer already validated.
async fn authenticate(state: &AppState, event: &Request) -> shared::Result<AuthenticatedUser> {
    let context_claims = event
        .request_context_ref()
        .and_then(|ctx| ctx.authorizer())
        .and_then(|authorizer| authorizer.fields.get("claims"));
    if let Some(claims) = context_claims {
        return extract_user_from_context(claims);
    }

    let token = bearer_token(event)
        .ok_or_else(|| shared::Error::Auth("Authorization token required".to_string()))?;
    let verifier = state
        .verifier
        .as_ref()
        .ok_or_else(|| shared::Error::Config("Cognito configuration missing".to_string()))?;

    verifier.verify(token).await
}

fn auth_failure(err: shared::Error) -> Result<Response<Body>, Error> {
    warn!(error = %err, "Authentication failed");
    match err {
        shared::Error::Config(_) => error_response(500, "Cognito configuration missing"),
        // Signing keys could not be loaded, so the token cannot be trusted
        shared::Error::Upstream(detail) => json_response(401, &ErrorBody::with_message("Invalid token", detail)),
        other => failure_response(&other, "Authentication failed"),
    }
}

async fn find_room(state: &AppState, location: &str, room_name: &str) -> shared::Result<Room> {
    state
        .rooms
        .get_room(location, room_name)
        .await?
        .ok_or_else(|| shared::Error::NotFound("Room not found".to_string()))
}

/// Price a room for a day. A missing or unreachable temperature charges the base price.
async fn quote_room(state: &AppState, room: &Room, date: NaiveDate) -> PriceBreakdown {
    let quote = match state.temperatures.temperature(&room.location, date).await {
        Ok(Some(temperature)) => Some(state.engine.quote(room.price, temperature)),
        Ok(None) => {
            warn!(location = %room.location, %date, "No temperature reading, charging base price");
            None
        }
        Err(e) => {
            warn!(location = %room.location, %date, error = %e, "Weather lookup failed, charging base price");
            None
        }
    };

    PriceBreakdown::new(room, date, quote.as_ref())
}

async fn list_bookings(state: &AppState, event: &Request) -> shared::Result<BookingsResponse> {
    let filter: BookingsFilter = query_as(event)?;
    let user_id = filter.user_id.as_deref().filter(|id| !id.is_empty());
    let bookings = state.bookings.list_bookings(user_id).await?;

    Ok(BookingsResponse {
        count: bookings.len(),
        bookings,
    })
}

async fn price_breakdown(state: &AppState, event: &Request) -> shared::Result<PriceBreakdown> {
    let request: BookingRequest = validated(query_as(event)?)?;
    let date = request.date()?;
    let room = find_room(state, &request.location, &request.room_name).await?;

    Ok(quote_room(state, &room, date).await)
}

async fn create_booking(
    state: &AppState,
    user: &AuthenticatedUser,
    request: BookingRequest,
) -> shared::Result<BookingCreated> {
    let request = validated(request)?;
    let date = request.date()?;
    let room = find_room(state, &request.location, &request.room_name).await?;

    let key = location_date_key(&room.location, date);
    if state.bookings.get_booking(&key, &room.room_name).await?.is_some() {
        return Err(shared::Error::Conflict(BOOKING_CONFLICT.to_string()));
    }

    let breakdown = quote_room(state, &room, date).await;
    let booking = Booking::from_breakdown(&breakdown, user.user_id.as_str(), Utc::now());
    state.bookings.create_booking(&booking).await?;

    info!(
        location_date = %booking.location_date,
        room = %booking.room_name,
        user_id = %booking.user_id,
        price = %booking.price,
        "Booking created"
    );

    Ok(BookingCreated {
        message: "Booking created successfully",
        booking,
    })
}

async fn cancel_booking(
    state: &AppState,
    user: &AuthenticatedUser,
    request: BookingRequest,
) -> shared::Result<MessageResponse> {
    let request = validated(request)?;
    let key = location_date_key(&request.location, request.date()?);

    let booking = state
        .bookings
        .get_booking(&key, &request.room_name)
        .await?
        .ok_or_else(|| shared::Error::NotFound(BOOKING_NOT_FOUND.to_string()))?;

    if booking.user_id != user.user_id {
        return Err(shared::Error::Unauthorized(
            "You do not have permission to cancel this booking".to_string(),
        ));
    }

    state
        .bookings
        .delete_booking(&key, &request.room_name, &user.user_id)
        .await?;
    info!(location_date = %key, room = %request.room_name, user_id = %user.user_id, "Booking cancelled");

    Ok(MessageResponse {
        message: "Booking cancelled successfully",
    })
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let path = route_path(&event);
    let method = event.method().as_str();
    info!(method, path, "Bookings request");

    match (method, path) {
        ("GET", "/health") => return json_response(200, &json!({"status": "ok", "service": "booking"})),
        ("GET" | "POST" | "DELETE", "/bookings") | ("GET", "/bookings/price-breakdown") => {}
        (_, "/bookings" | "/bookings/price-breakdown" | "/health") => {
            return error_response(405, "Method not allowed")
        }
        _ => return error_response(404, "Not found"),
    }

    let user = match authenticate(&state, &event).await {
        Ok(user) => user,
        Err(err) => return auth_failure(err),
    };

    match (method, path) {
        ("GET", "/bookings") => respond(200, list_bookings(&state, &event).await, "Failed to retrieve bookings"),
        ("GET", "/bookings/price-breakdown") => respond(
            200,
            price_breakdown(&state, &event).await,
            "Failed to calculate price breakdown",
        ),
        ("POST", "/bookings") => {
            let request: BookingRequest = parse_body!(event.body());
            respond(201, create_booking(&state, &user, request).await, "Failed to create booking")
        }
        ("DELETE", "/bookings") => {
            let request: BookingRequest = parse_body!(event.body());
            respond(200, cancel_booking(&state, &user, request).await, "Failed to cancel booking")
        }
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
