//! Domain events emitted by the booking lifecycle.
//!
//! Events are values, produced by state transitions and handed to an
//! [`EventSink`] for external collaborators: chat enablement,
//! notifications, review eligibility. The engine itself never consumes
//! them back.

use crate::types::{ActorRole, BookingId, ClientId, ProviderId, SegmentRef, TransactionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Domain events describing booking state changes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingEvent {
    /// A reservation was committed and a booking created in `Pending`
    BookingCreated {
        /// The new booking
        booking_id: BookingId,
        /// Client who booked
        client_id: ClientId,
        /// Provider being booked
        provider_id: ProviderId,
        /// The consumed segment
        segment: SegmentRef,
        /// Scheduled start
        start: DateTime<Utc>,
        /// When the booking was created
        created_at: DateTime<Utc>,
    },

    /// A booking moved to `Confirmed`
    BookingConfirmed {
        /// The confirmed booking
        booking_id: BookingId,
        /// When it was confirmed
        confirmed_at: DateTime<Utc>,
    },

    /// A booking moved to `InProgress`
    BookingStarted {
        /// The started booking
        booking_id: BookingId,
        /// When the provider marked it underway
        started_at: DateTime<Utc>,
    },

    /// A booking moved to `Completed`
    BookingCompleted {
        /// The completed booking
        booking_id: BookingId,
        /// When the service finished
        completed_at: DateTime<Utc>,
    },

    /// A booking moved to `Cancelled`; its segment returns to the pool
    BookingCancelled {
        /// The cancelled booking
        booking_id: BookingId,
        /// The freed segment
        segment: SegmentRef,
        /// Which participant cancelled
        cancelled_by: ActorRole,
        /// When it was cancelled
        cancelled_at: DateTime<Utc>,
    },

    /// A refund was requested for a cancelled booking's transaction
    RefundRequested {
        /// The cancelled booking
        booking_id: BookingId,
        /// The transaction being refunded
        transaction_id: TransactionId,
    },
}

/// Outlet for domain events.
///
/// Implementations must be cheap and non-blocking; delivery guarantees
/// belong to the collaborator behind the sink, not to the engine.
pub trait EventSink: Send + Sync {
    /// Publish a single event
    fn publish(&self, event: BookingEvent);
}

/// Sink that logs every event through `tracing`.
///
/// The default production sink until a real notification/chat
/// collaborator is wired in.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: BookingEvent) {
        tracing::info!(event = ?event, "domain event");
    }
}
