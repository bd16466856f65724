//! Reservation and booking lifecycle endpoints.
//!
//! The actor identity arrives as an opaque `x-actor-id` header, resolved
//! once here at the boundary; business logic only ever sees an
//! [`ActorId`].

use crate::error::AppError;
use crate::server::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use carebook_core::types::{
    ActorId, Address, Booking, BookingDraft, BookingId, BookingStatus, ClientId, Money,
    ProviderId, SegmentRef, ServiceDuration, ServiceId, TimeSlotId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Actor Resolution
// ============================================================================

const ACTOR_HEADER: &str = "x-actor-id";

/// Resolves the canonical actor identity from the request headers.
///
/// In production this sits behind the marketplace's session layer; the
/// engine only needs the resolved opaque identity.
fn resolve_actor(headers: &HeaderMap) -> Result<ActorId, AppError> {
    let raw = headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("missing x-actor-id header"))?;

    let uuid = raw
        .parse::<Uuid>()
        .map_err(|_| AppError::unauthorized("malformed x-actor-id header"))?;

    Ok(ActorId::from_uuid(uuid))
}

// ============================================================================
// Request / Response Types
// ============================================================================

/// Address payload
#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    /// Street address, first line
    pub line1: String,
    /// Street address, second line
    pub line2: Option<String>,
    /// City
    pub city: String,
    /// State or region
    pub region: String,
    /// Postal code
    pub postal_code: String,
}

/// Reserve-and-book request body
#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    /// Slot containing the wanted segment
    pub time_slot_id: Uuid,
    /// 0-based segment position
    pub segment_index: u32,
    /// Service being booked
    pub service_id: Uuid,
    /// Provider delivering it
    pub provider_id: Uuid,
    /// Client placing the booking
    pub client_id: Uuid,
    /// Expected appointment length in minutes
    pub duration_minutes: u32,
    /// Where the service takes place
    pub address: AddressRequest,
    /// Free-form instructions for the provider
    pub special_instructions: Option<String>,
    /// Agreed price in cents
    pub total_price_cents: u64,
}

/// Booking as returned to clients
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    /// Booking identifier
    pub id: Uuid,
    /// Service being delivered
    pub service_id: Uuid,
    /// Provider delivering it
    pub provider_id: Uuid,
    /// Client receiving it
    pub client_id: Uuid,
    /// Slot containing the consumed segment
    pub time_slot_id: Uuid,
    /// Consumed segment position
    pub segment_index: u32,
    /// Scheduled start instant
    pub start: DateTime<Utc>,
    /// Appointment length in minutes
    pub duration_minutes: u32,
    /// Current lifecycle status
    pub status: BookingStatus,
    /// Agreed price in cents
    pub total_price_cents: u64,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: *booking.id.as_uuid(),
            service_id: *booking.service_id.as_uuid(),
            provider_id: *booking.provider_id.as_uuid(),
            client_id: *booking.client_id.as_uuid(),
            time_slot_id: *booking.segment.time_slot_id.as_uuid(),
            segment_index: booking.segment.segment_index,
            start: booking.start,
            duration_minutes: booking.duration.as_minutes(),
            status: booking.status,
            total_price_cents: booking.total_price.cents(),
        }
    }
}

/// Status advance request body
#[derive(Debug, Deserialize)]
pub struct AdvanceStatusRequest {
    /// Requested target status
    pub target: BookingStatus,
}

/// Eligibility response
#[derive(Debug, Serialize)]
pub struct EligibilityResponse {
    /// Whether the capability is currently enabled
    pub eligible: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Reserve a segment and create its booking (one logical transaction).
///
/// Returns 409 when the segment was lost to a concurrent claimant and
/// 410 when the hold expired before commit; both mean the client should
/// refresh availability and pick another segment.
pub async fn reserve_and_book(
    State(state): State<AppState>,
    Json(request): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let segment = SegmentRef::new(
        TimeSlotId::from_uuid(request.time_slot_id),
        request.segment_index,
    );
    let draft = BookingDraft {
        service_id: ServiceId::from_uuid(request.service_id),
        provider_id: ProviderId::from_uuid(request.provider_id),
        client_id: ClientId::from_uuid(request.client_id),
        duration: ServiceDuration::minutes(request.duration_minutes),
        address: Address {
            line1: request.address.line1,
            line2: request.address.line2,
            city: request.address.city,
            region: request.address.region,
            postal_code: request.address.postal_code,
        },
        special_instructions: request.special_instructions,
        total_price: Money::from_cents(request.total_price_cents),
    };

    let booking = state.service.reserve_and_book(segment, draft).await?;

    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// Advance a booking through its lifecycle.
pub async fn advance_status(
    Path(booking_id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AdvanceStatusRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let actor = resolve_actor(&headers)?;
    let booking = state
        .service
        .advance_status(BookingId::from_uuid(booking_id), request.target, actor)
        .await?;

    Ok(Json(booking.into()))
}

/// Cancel a booking.
pub async fn cancel(
    Path(booking_id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BookingResponse>, AppError> {
    let actor = resolve_actor(&headers)?;
    let booking = state
        .service
        .cancel(BookingId::from_uuid(booking_id), actor)
        .await?;

    Ok(Json(booking.into()))
}

/// Whether chat is currently enabled for the booking.
pub async fn chat_eligibility(
    Path(booking_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<EligibilityResponse>, AppError> {
    let eligible = state
        .service
        .is_chat_eligible(BookingId::from_uuid(booking_id))
        .await?;
    Ok(Json(EligibilityResponse { eligible }))
}

/// Whether the booking can be reviewed.
pub async fn review_eligibility(
    Path(booking_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<EligibilityResponse>, AppError> {
    let eligible = state
        .service
        .is_review_eligible(BookingId::from_uuid(booking_id))
        .await?;
    Ok(Json(EligibilityResponse { eligible }))
}
