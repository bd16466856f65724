//! HTTP error mapping for the booking API.
//!
//! Engine errors carry enough context to pick a status on their own;
//! handlers only add the boundary failures the engine never sees
//! (missing actor header, malformed payloads).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use carebook_core::error::EngineError;
use serde::Serialize;

/// Error returned by every handler, rendered as a JSON body.
///
/// Most values come from [`EngineError`] through the `From` impl below;
/// the constructors cover the two failures that originate at the HTTP
/// boundary itself.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// The request carried no usable actor identity (401).
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// The payload failed validation before reaching the engine (422).
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    /// The HTTP status this error renders as
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The stable machine-readable code clients branch on
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl From<EngineError> for AppError {
    fn from(error: EngineError) -> Self {
        let (status, code) = match &error {
            // Rejected before any state was touched
            EngineError::InvalidWindow { .. } | EngineError::InvalidDraft { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
            }

            // Lost a race; the client should refresh and pick another segment
            EngineError::SegmentUnavailable { .. } => {
                (StatusCode::CONFLICT, "SEGMENT_UNAVAILABLE")
            }

            // The booking attempt outlived its hold
            EngineError::ReservationExpired { .. } | EngineError::HoldExpired { .. } => {
                (StatusCode::GONE, "RESERVATION_EXPIRED")
            }

            // State machine violations
            EngineError::IllegalTransition { .. } => (StatusCode::CONFLICT, "ILLEGAL_TRANSITION"),
            EngineError::SlotAlreadyPublished { .. } => (StatusCode::CONFLICT, "ALREADY_PUBLISHED"),

            // A participant the booking does not know
            EngineError::Unauthorized { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),

            EngineError::PaymentNotCompleted { .. } => {
                (StatusCode::PAYMENT_REQUIRED, "PAYMENT_REQUIRED")
            }

            EngineError::UnknownService { .. }
            | EngineError::SlotNotFound { .. }
            | EngineError::BookingNotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        };

        Self::new(status, code, error.to_string())
    }
}

/// JSON error body returned to clients
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = self.code,
                message = %self.message,
                "request failed"
            );
        } else {
            tracing::debug!(
                status = %self.status,
                code = self.code,
                message = %self.message,
                "request rejected"
            );
        }

        let body = Json(ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        });

        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carebook_core::types::{BookingId, BookingStatus, SegmentRef, TimeSlotId};

    #[test]
    fn test_lost_race_maps_to_conflict() {
        let error = EngineError::SegmentUnavailable {
            segment: SegmentRef::new(TimeSlotId::new(), 0),
        };
        let mapped = AppError::from(error);
        assert_eq!(mapped.status(), StatusCode::CONFLICT);
        assert_eq!(mapped.code(), "SEGMENT_UNAVAILABLE");
    }

    #[test]
    fn test_expired_reservation_maps_to_gone() {
        let error = EngineError::ReservationExpired {
            segment: SegmentRef::new(TimeSlotId::new(), 1),
        };
        assert_eq!(AppError::from(error).status(), StatusCode::GONE);
    }

    #[test]
    fn test_wrong_actor_maps_to_forbidden_not_unauthorized() {
        // 401 is reserved for requests with no usable identity at all
        let error = EngineError::Unauthorized {
            actor: carebook_core::types::ActorId::new(),
            booking_id: BookingId::new(),
        };
        assert_eq!(AppError::from(error).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_state_machine_violation_maps_to_conflict() {
        let error = EngineError::IllegalTransition {
            from: BookingStatus::Pending,
            to: BookingStatus::InProgress,
        };
        let mapped = AppError::from(error);
        assert_eq!(mapped.status(), StatusCode::CONFLICT);
        assert_eq!(mapped.code(), "ILLEGAL_TRANSITION");
    }
}
