//! Provider-side endpoints: service registration and slot publication.

use crate::error::AppError;
use crate::server::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use carebook_core::types::{
    ProviderId, ServiceDuration, ServiceId, TimeSlot, TimeSlotId,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to register a service's appointment duration
#[derive(Debug, Deserialize)]
pub struct RegisterServiceRequest {
    /// Existing service identifier, or absent to mint one
    pub service_id: Option<Uuid>,
    /// Fixed appointment length in minutes
    pub duration_minutes: u32,
}

/// Response carrying the registered service id
#[derive(Debug, Serialize)]
pub struct RegisterServiceResponse {
    /// The registered service
    pub service_id: Uuid,
}

/// Register a service so providers can publish slots for it.
pub async fn register_service(
    State(state): State<AppState>,
    Json(request): Json<RegisterServiceRequest>,
) -> Result<(StatusCode, Json<RegisterServiceResponse>), AppError> {
    if request.duration_minutes == 0 {
        return Err(AppError::validation("duration_minutes must be positive"));
    }

    let service_id = request
        .service_id
        .map_or_else(ServiceId::new, ServiceId::from_uuid);

    state
        .availability
        .register_service(service_id, ServiceDuration::minutes(request.duration_minutes))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(RegisterServiceResponse {
            service_id: *service_id.as_uuid(),
        }),
    ))
}

/// Request to publish an availability window
#[derive(Debug, Deserialize)]
pub struct PublishSlotRequest {
    /// Provider declaring availability
    pub provider_id: Uuid,
    /// Service offered during the window
    pub service_id: Uuid,
    /// Calendar day
    pub date: NaiveDate,
    /// Window start (wall clock)
    pub start_time: NaiveTime,
    /// Window end (wall clock, same day)
    pub end_time: NaiveTime,
}

/// Response carrying the published slot id
#[derive(Debug, Serialize)]
pub struct PublishSlotResponse {
    /// The published slot
    pub time_slot_id: Uuid,
}

/// Publish a provider availability window.
pub async fn publish_slot(
    State(state): State<AppState>,
    Json(request): Json<PublishSlotRequest>,
) -> Result<(StatusCode, Json<PublishSlotResponse>), AppError> {
    let slot = TimeSlot::new(
        TimeSlotId::new(),
        ProviderId::from_uuid(request.provider_id),
        ServiceId::from_uuid(request.service_id),
        request.date,
        request.start_time,
        request.end_time,
    );
    let time_slot_id = *slot.id.as_uuid();

    state.availability.publish_slot(slot).await?;

    Ok((
        StatusCode::CREATED,
        Json(PublishSlotResponse { time_slot_id }),
    ))
}
