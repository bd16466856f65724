//! Error taxonomy for the booking engine.
//!
//! Every failure is per-request: nothing here is fatal to the process,
//! and all variants leave shared state consistent when surfaced.

use crate::types::{
    ActorId, BookingId, BookingStatus, HoldId, SegmentRef, ServiceId, TimeSlotId,
};
use thiserror::Error;

/// Errors surfaced by the availability store, the reservation
/// coordinator, and the booking lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The availability window or service duration cannot produce segments
    #[error("invalid window: {reason}")]
    InvalidWindow {
        /// What made the window unusable
        reason: String,
    },

    /// The segment is held or booked by someone else (lost a race)
    #[error("segment {segment} is unavailable")]
    SegmentUnavailable {
        /// The contested segment
        segment: SegmentRef,
    },

    /// The hold lapsed between booking creation and commit
    #[error("reservation on segment {segment} expired before it could be committed")]
    ReservationExpired {
        /// The segment whose hold lapsed
        segment: SegmentRef,
    },

    /// The hold token is expired, already consumed, or superseded
    #[error("hold {hold_id} is no longer valid")]
    HoldExpired {
        /// The stale hold
        hold_id: HoldId,
    },

    /// The requested status change is not in the transition table
    #[error("illegal transition from {from} to {to}")]
    IllegalTransition {
        /// Current booking status
        from: BookingStatus,
        /// Requested target status
        to: BookingStatus,
    },

    /// The actor is neither the booking's client nor its provider,
    /// or lacks the role the transition requires
    #[error("actor {actor} may not act on booking {booking_id}")]
    Unauthorized {
        /// The rejected actor
        actor: ActorId,
        /// The booking they tried to act on
        booking_id: BookingId,
    },

    /// Confirmation requires a completed payment under the active policy
    #[error("payment for booking {booking_id} is not completed")]
    PaymentNotCompleted {
        /// The unpaid booking
        booking_id: BookingId,
    },

    /// The booking draft failed validation before any state was touched
    #[error("invalid booking draft: {reason}")]
    InvalidDraft {
        /// What was wrong with the draft
        reason: String,
    },

    /// No duration registered for the service
    #[error("unknown service {service_id}")]
    UnknownService {
        /// The unregistered service
        service_id: ServiceId,
    },

    /// The time slot does not exist (or was archived)
    #[error("time slot {time_slot_id} not found")]
    SlotNotFound {
        /// The missing slot
        time_slot_id: TimeSlotId,
    },

    /// A slot with this identifier was already published
    #[error("time slot {time_slot_id} is already published")]
    SlotAlreadyPublished {
        /// The duplicate slot
        time_slot_id: TimeSlotId,
    },

    /// The booking does not exist
    #[error("booking {booking_id} not found")]
    BookingNotFound {
        /// The missing booking
        booking_id: BookingId,
    },
}

impl EngineError {
    /// Shorthand for a draft validation failure
    #[must_use]
    pub fn invalid_draft(reason: impl Into<String>) -> Self {
        Self::InvalidDraft {
            reason: reason.into(),
        }
    }

    /// Shorthand for an invalid window
    #[must_use]
    pub fn invalid_window(reason: impl Into<String>) -> Self {
        Self::InvalidWindow {
            reason: reason.into(),
        }
    }
}
