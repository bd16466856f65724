//! End-to-end reservation flow tests.
//!
//! Exercises the full claim → book → lifecycle path through the façade,
//! including hold expiry, mid-flow rollback, and cancellation side
//! effects.
//!
//! Run with: `cargo test --test reservation_flow_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use carebook_core::prelude::*;
use carebook_testing::{
    draft_for, future_slot, gateway::AuthorizeOutcome, MockClock, RecordingEventSink,
    ScriptedPaymentGateway,
};
use chrono::Duration;
use std::sync::Arc;

struct Harness {
    clock: Arc<MockClock>,
    availability: Arc<dyn AvailabilityStore>,
    repository: Arc<dyn BookingRepository>,
    gateway: Arc<ScriptedPaymentGateway>,
    sink: Arc<RecordingEventSink>,
    service: BookingService,
    slot: TimeSlot,
    client_id: ClientId,
}

async fn harness_with(config: EngineConfig) -> Harness {
    let clock = Arc::new(MockClock::starting_now());
    let availability: Arc<dyn AvailabilityStore> =
        Arc::new(InMemoryAvailabilityStore::new(clock.clone()));
    let repository: Arc<dyn BookingRepository> = Arc::new(InMemoryBookingRepository::new());
    let gateway = Arc::new(ScriptedPaymentGateway::new());
    let sink = Arc::new(RecordingEventSink::new());

    let service = BookingService::new(
        availability.clone(),
        repository.clone(),
        gateway.clone(),
        sink.clone(),
        clock.clone(),
        config,
    );

    let service_id = ServiceId::new();
    availability
        .register_service(service_id, ServiceDuration::minutes(60))
        .await;
    let slot = future_slot(ProviderId::new(), service_id, clock.now());
    availability.publish_slot(slot.clone()).await.unwrap();

    Harness {
        clock,
        availability,
        repository,
        gateway,
        sink,
        service,
        slot,
        client_id: ClientId::new(),
    }
}

async fn harness() -> Harness {
    harness_with(EngineConfig::default()).await
}

fn segment(h: &Harness, index: u32) -> SegmentRef {
    SegmentRef::new(h.slot.id, index)
}

async fn segment_states(h: &Harness) -> Vec<SegmentState> {
    let listing = h
        .service
        .list_availability(
            AvailabilityQuery::Provider(h.slot.provider_id),
            DateRange::new(h.slot.date, h.slot.date),
        )
        .await
        .unwrap();
    listing[&h.slot.date][0]
        .segments
        .iter()
        .map(|segment| segment.state)
        .collect()
}

/// The canonical scenario: a 09:00-11:00 slot with a 60-minute service
/// produces two segments; booking segment 0 leaves segment 1 claimable
/// and segment 0 unclaimable.
#[tokio::test]
async fn test_booked_segment_stays_booked_and_sibling_stays_open() {
    let h = harness().await;

    let states = segment_states(&h).await;
    assert_eq!(states, vec![SegmentState::Free, SegmentState::Free]);

    let draft = draft_for(&h.slot, h.client_id, ServiceDuration::minutes(60));
    let booking = h
        .service
        .reserve_and_book(segment(&h, 0), draft)
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);

    let states = segment_states(&h).await;
    assert_eq!(
        states[0],
        SegmentState::Booked {
            booking_id: booking.id
        }
    );
    assert_eq!(states[1], SegmentState::Free);

    // Segment 0 cannot be reclaimed while the booking is active
    let err = h
        .availability
        .claim_segment(segment(&h, 0), ClientId::new(), Duration::minutes(5))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SegmentUnavailable { .. }));

    // Segment 1 remains claimable
    h.availability
        .claim_segment(segment(&h, 1), ClientId::new(), Duration::minutes(5))
        .await
        .unwrap();
}

/// A booked segment stays consumed through every active status.
#[tokio::test]
async fn test_active_booking_blocks_reclaim_at_every_stage() {
    let h = harness().await;
    let provider = ActorId::from(h.slot.provider_id);

    let booking = h
        .service
        .reserve_and_book(
            segment(&h, 0),
            draft_for(&h.slot, h.client_id, ServiceDuration::minutes(60)),
        )
        .await
        .unwrap();

    for target in [
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
        BookingStatus::Completed,
    ] {
        let err = h
            .availability
            .claim_segment(segment(&h, 0), ClientId::new(), Duration::minutes(5))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SegmentUnavailable { .. }));

        h.service
            .advance_status(booking.id, target, provider)
            .await
            .unwrap();
    }
}

/// A hold that is never committed becomes claimable by a different
/// holder once its expiry passes.
#[tokio::test]
async fn test_abandoned_hold_expires_and_frees_the_segment() {
    let h = harness().await;

    h.availability
        .claim_segment(segment(&h, 1), ClientId::new(), Duration::minutes(5))
        .await
        .unwrap();

    // Still held before the expiry
    let err = h
        .availability
        .claim_segment(segment(&h, 1), ClientId::new(), Duration::minutes(5))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SegmentUnavailable { .. }));

    h.clock.advance(Duration::minutes(5));

    // Lazily reclaimed on the next access
    h.availability
        .claim_segment(segment(&h, 1), ClientId::new(), Duration::minutes(5))
        .await
        .unwrap();
}

/// The sweeper reclaims lapsed holds without waiting for an access.
#[tokio::test]
async fn test_sweeper_reclaims_orphaned_holds() {
    let h = harness().await;

    h.availability
        .claim_segment(segment(&h, 0), ClientId::new(), Duration::minutes(5))
        .await
        .unwrap();
    h.availability
        .claim_segment(segment(&h, 1), ClientId::new(), Duration::minutes(5))
        .await
        .unwrap();

    assert_eq!(h.availability.sweep_expired_holds().await, 0);

    h.clock.advance(Duration::minutes(6));
    assert_eq!(h.availability.sweep_expired_holds().await, 2);

    let states = segment_states(&h).await;
    assert_eq!(states, vec![SegmentState::Free, SegmentState::Free]);
}

/// A hold that lapses between booking creation and commit rolls the
/// whole reservation back: no booking survives and the segment frees.
#[tokio::test]
async fn test_lapsed_hold_rolls_the_reservation_back() {
    let h = harness_with(EngineConfig {
        // Zero-length holds lapse immediately, forcing the mid-flow
        // expiry path deterministically.
        hold_duration: Duration::zero(),
        ..EngineConfig::default()
    })
    .await;

    let err = h
        .service
        .reserve_and_book(
            segment(&h, 0),
            draft_for(&h.slot, h.client_id, ServiceDuration::minutes(60)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ReservationExpired { .. }));

    // The partially-created booking was deleted
    assert!(h
        .repository
        .find_active_by_segment(segment(&h, 0))
        .await
        .is_none());

    // And the segment is claimable again
    h.availability
        .claim_segment(segment(&h, 0), ClientId::new(), Duration::minutes(5))
        .await
        .unwrap();
}

/// Draft validation failures release the hold and create nothing.
#[tokio::test]
async fn test_rejected_draft_releases_the_hold() {
    let h = harness().await;

    let mut draft = draft_for(&h.slot, h.client_id, ServiceDuration::minutes(60));
    draft.address.line1 = String::new();

    let err = h
        .service
        .reserve_and_book(segment(&h, 0), draft)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDraft { .. }));

    // Mismatched duration is rejected the same way
    let err = h
        .service
        .reserve_and_book(
            segment(&h, 0),
            draft_for(&h.slot, h.client_id, ServiceDuration::minutes(30)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDraft { .. }));

    let states = segment_states(&h).await;
    assert_eq!(states[0], SegmentState::Free);
}

/// Cancelling a pending booking frees the segment, cancels the booking,
/// and refunds the captured authorization - nothing more.
#[tokio::test]
async fn test_pending_cancellation_frees_the_segment_and_refunds() {
    let h = harness().await;

    let booking = h
        .service
        .reserve_and_book(
            segment(&h, 0),
            draft_for(&h.slot, h.client_id, ServiceDuration::minutes(60)),
        )
        .await
        .unwrap();

    let cancelled = h
        .service
        .cancel(booking.id, ActorId::from(h.client_id))
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let states = segment_states(&h).await;
    assert_eq!(states[0], SegmentState::Free);

    // The mock authorization completed, so exactly one refund went out
    assert_eq!(h.gateway.refunded().len(), 1);

    // Another client can now book the same segment
    h.service
        .reserve_and_book(
            segment(&h, 0),
            draft_for(&h.slot, ClientId::new(), ServiceDuration::minutes(60)),
        )
        .await
        .unwrap();
}

/// Cancelling a confirmed booking frees its segment for the next
/// claimant.
#[tokio::test]
async fn test_confirmed_cancellation_frees_the_segment() {
    let h = harness().await;
    let provider = ActorId::from(h.slot.provider_id);

    let booking = h
        .service
        .reserve_and_book(
            segment(&h, 0),
            draft_for(&h.slot, h.client_id, ServiceDuration::minutes(60)),
        )
        .await
        .unwrap();
    h.service
        .advance_status(booking.id, BookingStatus::Confirmed, provider)
        .await
        .unwrap();

    h.service.cancel(booking.id, provider).await.unwrap();

    h.availability
        .claim_segment(segment(&h, 0), ClientId::new(), Duration::minutes(5))
        .await
        .unwrap();
}

/// A failed authorization leaves the booking pending with no refund on
/// later cancellation.
#[tokio::test]
async fn test_declined_payment_keeps_the_booking_pending() {
    let h = harness().await;
    h.gateway
        .script(AuthorizeOutcome::Decline("card declined".to_string()));

    let booking = h
        .service
        .reserve_and_book(
            segment(&h, 0),
            draft_for(&h.slot, h.client_id, ServiceDuration::minutes(60)),
        )
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);

    let transaction = h.repository.transaction_for(booking.id).await.unwrap();
    assert_eq!(transaction.unwrap().status, TransactionStatus::Failed);

    // Confirmation is blocked until payment completes
    let err = h
        .service
        .advance_status(
            booking.id,
            BookingStatus::Confirmed,
            ActorId::from(h.slot.provider_id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PaymentNotCompleted { .. }));

    // Cancelling refunds nothing: the payment never captured
    h.service
        .cancel(booking.id, ActorId::from(h.client_id))
        .await
        .unwrap();
    assert!(h.gateway.refunded().is_empty());
}

/// Full happy-path lifecycle with eligibility flags along the way.
#[tokio::test]
async fn test_full_lifecycle_walk() {
    let h = harness().await;
    let provider = ActorId::from(h.slot.provider_id);

    let booking = h
        .service
        .reserve_and_book(
            segment(&h, 0),
            draft_for(&h.slot, h.client_id, ServiceDuration::minutes(60)),
        )
        .await
        .unwrap();
    assert!(!h.service.is_chat_eligible(booking.id).await.unwrap());

    let confirmed = h
        .service
        .advance_status(booking.id, BookingStatus::Confirmed, provider)
        .await
        .unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert!(h.service.is_chat_eligible(booking.id).await.unwrap());
    assert!(!h.service.is_review_eligible(booking.id).await.unwrap());

    // Re-issuing the same confirmation is a no-op success
    h.service
        .advance_status(booking.id, BookingStatus::Confirmed, provider)
        .await
        .unwrap();

    h.clock.advance(Duration::days(1) + Duration::hours(9));
    let started = h
        .service
        .advance_status(booking.id, BookingStatus::InProgress, provider)
        .await
        .unwrap();
    assert_eq!(started.status, BookingStatus::InProgress);
    assert!(h.service.is_chat_eligible(booking.id).await.unwrap());

    let completed = h
        .service
        .advance_status(booking.id, BookingStatus::Completed, provider)
        .await
        .unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
    assert!(!h.service.is_chat_eligible(booking.id).await.unwrap());
    assert!(h.service.is_review_eligible(booking.id).await.unwrap());

    // Terminal: no further transitions
    let err = h
        .service
        .cancel(booking.id, ActorId::from(h.client_id))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::IllegalTransition { .. }));

    // The domain event stream saw the whole journey in order
    let events = h.sink.events();
    let kinds: Vec<&'static str> = events
        .iter()
        .map(|event| match event {
            BookingEvent::BookingCreated { .. } => "created",
            BookingEvent::BookingConfirmed { .. } => "confirmed",
            BookingEvent::BookingStarted { .. } => "started",
            BookingEvent::BookingCompleted { .. } => "completed",
            BookingEvent::BookingCancelled { .. } => "cancelled",
            BookingEvent::RefundRequested { .. } => "refund",
        })
        .collect();
    assert_eq!(kinds, vec!["created", "confirmed", "started", "completed"]);
}

/// Strangers cannot drive someone else's booking.
#[tokio::test]
async fn test_foreign_actor_is_rejected() {
    let h = harness().await;

    let booking = h
        .service
        .reserve_and_book(
            segment(&h, 0),
            draft_for(&h.slot, h.client_id, ServiceDuration::minutes(60)),
        )
        .await
        .unwrap();

    let err = h
        .service
        .cancel(booking.id, ActorId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized { .. }));
}
