//! Availability query endpoints.
//!
//! Read-only and safe to poll; clients are expected to refresh
//! periodically to pick up other clients' claims.

use crate::error::AppError;
use crate::server::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use carebook_core::availability::{AvailabilityByDate, AvailabilityQuery, DateRange};
use carebook_core::types::{ProviderId, SegmentState, ServiceId};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request / Response Types
// ============================================================================

/// Date range query parameters (inclusive)
#[derive(Debug, Deserialize)]
pub struct RangeParams {
    /// First day included
    pub from: NaiveDate,
    /// Last day included
    pub to: NaiveDate,
}

/// One segment as seen by the client
#[derive(Debug, Serialize)]
pub struct SegmentView {
    /// 0-based position inside the slot
    pub segment_index: u32,
    /// Segment start (wall clock)
    pub start_time: NaiveTime,
    /// Segment end (wall clock)
    pub end_time: NaiveTime,
    /// "free", "held", or "booked"
    pub state: &'static str,
}

/// One published slot with its segments
#[derive(Debug, Serialize)]
pub struct SlotView {
    /// Slot identifier (used to address segments when booking)
    pub time_slot_id: Uuid,
    /// Provider owning the slot
    pub provider_id: Uuid,
    /// Service the slot was declared for
    pub service_id: Uuid,
    /// Window start (wall clock)
    pub start_time: NaiveTime,
    /// Window end (wall clock)
    pub end_time: NaiveTime,
    /// Derived segments with their current state
    pub segments: Vec<SegmentView>,
}

/// One day of availability
#[derive(Debug, Serialize)]
pub struct DayView {
    /// Calendar day
    pub date: NaiveDate,
    /// Slots on that day, ordered by start time
    pub slots: Vec<SlotView>,
}

/// Availability listing response
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    /// Days with at least one slot, in ascending order
    pub days: Vec<DayView>,
}

fn to_response(listing: AvailabilityByDate) -> AvailabilityResponse {
    let days = listing
        .into_iter()
        .map(|(date, slots)| DayView {
            date,
            slots: slots
                .into_iter()
                .map(|availability| SlotView {
                    time_slot_id: *availability.slot.id.as_uuid(),
                    provider_id: *availability.slot.provider_id.as_uuid(),
                    service_id: *availability.slot.service_id.as_uuid(),
                    start_time: availability.slot.start_time,
                    end_time: availability.slot.end_time,
                    segments: availability
                        .segments
                        .iter()
                        .map(|segment| SegmentView {
                            segment_index: segment.segment_index,
                            start_time: segment.start_time,
                            end_time: segment.end_time,
                            state: match segment.state {
                                SegmentState::Free => "free",
                                SegmentState::Held { .. } => "held",
                                SegmentState::Booked { .. } => "booked",
                            },
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    AvailabilityResponse { days }
}

// ============================================================================
// Handlers
// ============================================================================

/// Get a provider's availability inside a date range.
///
/// # Example
///
/// ```bash
/// curl 'http://localhost:8080/api/providers/<uuid>/availability?from=2025-06-02&to=2025-06-08'
/// ```
pub async fn provider_availability(
    Path(provider_id): Path<Uuid>,
    Query(range): Query<RangeParams>,
    State(state): State<AppState>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let listing = state
        .service
        .list_availability(
            AvailabilityQuery::Provider(ProviderId::from_uuid(provider_id)),
            DateRange::new(range.from, range.to),
        )
        .await?;

    Ok(Json(to_response(listing)))
}

/// Get a service's availability inside a date range, across providers.
pub async fn service_availability(
    Path(service_id): Path<Uuid>,
    Query(range): Query<RangeParams>,
    State(state): State<AppState>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let listing = state
        .service
        .list_availability(
            AvailabilityQuery::Service(ServiceId::from_uuid(service_id)),
            DateRange::new(range.from, range.to),
        )
        .await?;

    Ok(Json(to_response(listing)))
}
