//! Router configuration for the booking server.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{availability, bookings, slots};
use axum::{
    routing::{get, post},
    Router,
};

/// Build the complete Axum router.
///
/// - Health checks
/// - Provider-side endpoints (service registration, slot publication)
/// - Availability queries
/// - Reservation and lifecycle endpoints
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Provider side: declare what can be booked
        .route("/services", post(slots::register_service))
        .route("/slots", post(slots::publish_slot))
        // Availability queries
        .route(
            "/providers/:id/availability",
            get(availability::provider_availability),
        )
        .route(
            "/services/:id/availability",
            get(availability::service_availability),
        )
        // Reservation and lifecycle
        .route("/bookings", post(bookings::reserve_and_book))
        .route("/bookings/:id/status", post(bookings::advance_status))
        .route("/bookings/:id/cancel", post(bookings::cancel))
        .route(
            "/bookings/:id/chat-eligibility",
            get(bookings::chat_eligibility),
        )
        .route(
            "/bookings/:id/review-eligibility",
            get(bookings::review_eligibility),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .with_state(state)
}
