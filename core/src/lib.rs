//! # Carebook Core
//!
//! Availability and booking reservation engine for a caregiving-services
//! marketplace.
//!
//! ## Core Concepts
//!
//! - **TimeSlot**: a provider-declared availability window for a service
//!   on a date
//! - **Segment**: a fixed-duration subdivision of a time slot, the atomic
//!   unit of booking
//! - **Hold**: a time-limited, provisional claim on a segment during the
//!   booking-in-progress window
//! - **Booking**: a committed intent to consume one segment, tracked
//!   through a status lifecycle
//! - **Transaction**: the payment record associated with a booking
//!
//! ## Architecture Principles
//!
//! - Functional core, imperative shell: transition validation is pure;
//!   the service shell performs the writes and side effects
//! - One atomic compare-and-set (`claim_segment`) carries the whole
//!   mutual-exclusion guarantee
//! - Explicit compensation where no transaction spans two stores
//!   (booking creation vs. hold commit), backstopped by a sweeper
//! - Dependency injection via `Arc<dyn Trait>` seams (clock, stores,
//!   payment gateway, event sink)
//!
//! ## Example
//!
//! ```ignore
//! use carebook_core::prelude::*;
//!
//! let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//! let service = BookingService::new(
//!     InMemoryAvailabilityStore::shared(clock.clone()),
//!     InMemoryBookingRepository::shared(),
//!     MockPaymentGateway::shared(),
//!     Arc::new(TracingEventSink),
//!     clock,
//!     EngineConfig::default(),
//! );
//!
//! let booking = service.reserve_and_book(segment, draft).await?;
//! service.advance_status(booking.id, BookingStatus::Confirmed, actor).await?;
//! ```

pub mod availability;
pub mod environment;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod payment;
pub mod repository;
pub mod reservation;
pub mod segments;
pub mod service;
pub mod types;

/// Convenience re-exports for engine consumers
pub mod prelude {
    pub use crate::availability::{
        AvailabilityByDate, AvailabilityQuery, AvailabilityStore, DateRange,
        InMemoryAvailabilityStore, SegmentClaim, SlotAvailability,
    };
    pub use crate::environment::{Clock, SystemClock};
    pub use crate::error::EngineError;
    pub use crate::events::{BookingEvent, EventSink, TracingEventSink};
    pub use crate::lifecycle::{BookingLifecycle, ConfirmationPolicy};
    pub use crate::payment::{MockPaymentGateway, PaymentError, PaymentGateway};
    pub use crate::repository::{BookingRepository, InMemoryBookingRepository};
    pub use crate::reservation::ReservationCoordinator;
    pub use crate::segments::derive_segments;
    pub use crate::service::{BookingService, EngineConfig};
    pub use crate::types::{
        ActorId, ActorRole, Address, Booking, BookingDraft, BookingId, BookingStatus, ClientId,
        HoldToken, Money, ProviderId, Segment, SegmentRef, SegmentState, ServiceDuration,
        ServiceId, TimeSlot, TimeSlotId, Transaction, TransactionId, TransactionStatus,
    };
}
