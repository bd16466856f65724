//! Reservation coordinator: the claim → validate → book → commit flow.
//!
//! The only component allowed to turn a hold into a booking. There is no
//! ambient transaction spanning the availability store and the booking
//! repository, so the window between booking creation and hold commit is
//! covered by an explicit compensating rollback; the expiry sweeper
//! backstops the rollback if it is interrupted.

use crate::availability::{AvailabilityStore, SegmentClaim};
use crate::environment::Clock;
use crate::error::EngineError;
use crate::repository::BookingRepository;
use crate::types::{Booking, BookingDraft, BookingId, SegmentRef};
use std::sync::Arc;

/// Orchestrates a single reservation attempt end to end
pub struct ReservationCoordinator {
    availability: Arc<dyn AvailabilityStore>,
    repository: Arc<dyn BookingRepository>,
    clock: Arc<dyn Clock>,
    hold_duration: chrono::Duration,
}

impl ReservationCoordinator {
    /// Creates a new coordinator.
    ///
    /// `hold_duration` bounds how long a claimed segment stays reserved
    /// for a booking attempt before the store reclaims it.
    #[must_use]
    pub fn new(
        availability: Arc<dyn AvailabilityStore>,
        repository: Arc<dyn BookingRepository>,
        clock: Arc<dyn Clock>,
        hold_duration: chrono::Duration,
    ) -> Self {
        Self {
            availability,
            repository,
            clock,
            hold_duration,
        }
    }

    /// Reserve a segment and create its `Pending` booking.
    ///
    /// Flow:
    /// 1. claim the segment (abort immediately on a lost race, so the
    ///    caller can offer alternatives),
    /// 2. validate the draft against the claimed segment's facts,
    /// 3. create the booking in `Pending`,
    /// 4. commit the hold; if it lapsed meanwhile, roll the booking back
    ///    and surface `ReservationExpired`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::SegmentUnavailable`]: lost the race for the
    ///   segment; nothing was created.
    /// - [`EngineError::InvalidDraft`]: draft rejected; the hold is
    ///   released and nothing was created.
    /// - [`EngineError::ReservationExpired`]: the hold timed out before
    ///   commit; the partially-created booking was rolled back.
    pub async fn reserve_and_create_booking(
        &self,
        segment: SegmentRef,
        draft: BookingDraft,
    ) -> Result<Booking, EngineError> {
        // Step 1: the atomic claim. SegmentUnavailable surfaces untouched.
        let claim = self
            .availability
            .claim_segment(segment, draft.client_id, self.hold_duration)
            .await?;

        // Step 2: validation. The claim is the only state to undo here.
        if let Err(error) = Self::validate_draft(&draft, &claim, self.clock.now()) {
            self.availability.release_hold(&claim.token).await;
            return Err(error);
        }

        // Step 3: create the Pending booking with its hold linkage.
        let booking = Booking::from_draft(
            BookingId::new(),
            draft,
            segment,
            claim.start,
            self.clock.now(),
        );
        if let Err(error) = self.repository.insert(booking.clone()).await {
            self.availability.release_hold(&claim.token).await;
            return Err(error);
        }

        // Step 4: commit. A lapsed hold means another client may already
        // have the segment; the booking we just created must go.
        if let Err(error) = self.availability.commit_hold(&claim.token, booking.id).await {
            tracing::warn!(
                booking_id = %booking.id,
                segment = %segment,
                error = %error,
                "hold lapsed before commit; rolling reservation back"
            );
            self.repository.remove(booking.id).await;
            self.availability.release_hold(&claim.token).await;
            return Err(EngineError::ReservationExpired { segment });
        }

        tracing::info!(
            booking_id = %booking.id,
            client_id = %booking.client_id,
            provider_id = %booking.provider_id,
            segment = %segment,
            start = %booking.start,
            "reservation committed"
        );

        Ok(booking)
    }

    fn validate_draft(
        draft: &BookingDraft,
        claim: &SegmentClaim,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), EngineError> {
        if !draft.address.is_complete() {
            return Err(EngineError::invalid_draft(
                "address is missing street, city, or postal code",
            ));
        }

        if draft.provider_id != claim.provider_id {
            return Err(EngineError::invalid_draft(
                "draft provider does not own the requested segment",
            ));
        }

        if draft.service_id != claim.service_id {
            return Err(EngineError::invalid_draft(
                "draft service does not match the slot's service",
            ));
        }

        if draft.duration != claim.duration {
            return Err(EngineError::invalid_draft(format!(
                "draft duration {} does not match the service duration {}",
                draft.duration, claim.duration
            )));
        }

        if claim.start <= now {
            return Err(EngineError::invalid_draft(
                "the requested segment is not in the future",
            ));
        }

        Ok(())
    }
}
