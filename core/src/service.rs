//! Booking service façade.
//!
//! Composes the availability store, the reservation coordinator, the
//! booking lifecycle, and the payment collaborator behind the four
//! operations callers use: list availability, reserve-and-book, advance
//! status, cancel. This is the imperative shell around the pure
//! lifecycle: all writes and all cancellation side effects happen here.

use crate::availability::{AvailabilityByDate, AvailabilityQuery, AvailabilityStore, DateRange};
use crate::environment::Clock;
use crate::error::EngineError;
use crate::events::{BookingEvent, EventSink};
use crate::lifecycle::{self, BookingLifecycle, ConfirmationPolicy, Step};
use crate::payment::PaymentGateway;
use crate::repository::BookingRepository;
use crate::reservation::ReservationCoordinator;
use crate::types::{
    ActorId, Booking, BookingDraft, BookingId, BookingStatus, SegmentRef, Transaction,
    TransactionId, TransactionStatus,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Engine tuning knobs
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// How long a claimed segment stays held for a booking attempt
    pub hold_duration: chrono::Duration,
    /// How often the background sweeper reclaims orphaned holds
    pub sweep_interval: Duration,
    /// Who may confirm a pending booking
    pub confirmation_policy: ConfirmationPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hold_duration: chrono::Duration::minutes(5),
            sweep_interval: Duration::from_secs(60),
            confirmation_policy: ConfirmationPolicy::default(),
        }
    }
}

/// The engine façade
pub struct BookingService {
    availability: Arc<dyn AvailabilityStore>,
    repository: Arc<dyn BookingRepository>,
    gateway: Arc<dyn PaymentGateway>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    lifecycle: BookingLifecycle,
    coordinator: ReservationCoordinator,
    sweep_interval: Duration,
}

impl BookingService {
    /// Wires the engine together
    #[must_use]
    pub fn new(
        availability: Arc<dyn AvailabilityStore>,
        repository: Arc<dyn BookingRepository>,
        gateway: Arc<dyn PaymentGateway>,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let coordinator = ReservationCoordinator::new(
            availability.clone(),
            repository.clone(),
            clock.clone(),
            config.hold_duration,
        );

        Self {
            availability,
            repository,
            gateway,
            sink,
            clock,
            lifecycle: BookingLifecycle::new(config.confirmation_policy),
            coordinator,
            sweep_interval: config.sweep_interval,
        }
    }

    /// List availability grouped by date.
    ///
    /// Safe to poll; reflects every claim committed before the call
    /// started.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownService`] for an unregistered
    /// service selector.
    pub async fn list_availability(
        &self,
        query: AvailabilityQuery,
        range: DateRange,
    ) -> Result<AvailabilityByDate, EngineError> {
        self.availability.list_availability(query, range).await
    }

    /// Reserve a segment, create its booking, and request payment
    /// authorization.
    ///
    /// The reservation is one logical transaction; payment authorization
    /// happens after the segment is committed, and a declined
    /// authorization leaves the booking `Pending` with a failed
    /// transaction on record rather than tearing the reservation down.
    ///
    /// # Errors
    ///
    /// Propagates the coordinator's errors: `SegmentUnavailable`,
    /// `InvalidDraft`, `ReservationExpired`.
    pub async fn reserve_and_book(
        &self,
        segment: SegmentRef,
        draft: BookingDraft,
    ) -> Result<Booking, EngineError> {
        let booking = self
            .coordinator
            .reserve_and_create_booking(segment, draft)
            .await?;

        self.sink.publish(BookingEvent::BookingCreated {
            booking_id: booking.id,
            client_id: booking.client_id,
            provider_id: booking.provider_id,
            segment: booking.segment,
            start: booking.start,
            created_at: booking.created_at,
        });

        match self
            .gateway
            .authorize(booking.id, booking.total_price)
            .await
        {
            Ok(transaction) => {
                self.repository
                    .attach_transaction(booking.id, transaction)
                    .await?;
            }
            Err(error) => {
                // The segment stays committed: dropping it here would
                // reopen the race the hold just won. The client retries
                // payment or cancels.
                tracing::warn!(
                    booking_id = %booking.id,
                    error = %error,
                    "payment authorization failed; booking stays pending"
                );
                let failed = Transaction::new(
                    TransactionId::new(),
                    booking.id,
                    booking.total_price,
                    TransactionStatus::Failed,
                );
                self.repository
                    .attach_transaction(booking.id, failed)
                    .await?;
            }
        }

        Ok(booking)
    }

    /// Advance a booking through its lifecycle.
    ///
    /// Idempotent for re-issued forward transitions. A transition to
    /// `Cancelled` additionally frees the booking's segment and requests
    /// a refund if a transaction exists.
    ///
    /// # Errors
    ///
    /// Propagates the lifecycle's `IllegalTransition`, `Unauthorized`,
    /// and `PaymentNotCompleted`, plus `BookingNotFound`.
    pub async fn advance_status(
        &self,
        booking_id: BookingId,
        target: BookingStatus,
        actor: ActorId,
    ) -> Result<Booking, EngineError> {
        let booking = self.repository.get(booking_id).await?;
        let transaction = self.repository.transaction_for(booking_id).await?;
        let now = self.clock.now();

        let role = match self
            .lifecycle
            .evaluate(&booking, target, actor, transaction.as_ref(), now)?
        {
            Step::Idempotent => return Ok(booking),
            Step::Advance { role } => role,
        };

        // Single atomic status write; a concurrent winner shows up as a
        // compare-and-set miss.
        let updated = match self
            .repository
            .update_status(booking_id, booking.status, target)
            .await
        {
            Ok(updated) => updated,
            Err(EngineError::IllegalTransition { .. }) => {
                // Lost a race with another caller; re-read and honor
                // idempotence if they advanced to the same target.
                let current = self.repository.get(booking_id).await?;
                if current.status == target && target != BookingStatus::Cancelled {
                    return Ok(current);
                }
                return Err(EngineError::IllegalTransition {
                    from: current.status,
                    to: target,
                });
            }
            Err(error) => return Err(error),
        };

        if target == BookingStatus::Cancelled {
            self.compensate_cancellation(&updated, transaction).await;
        }

        for event in BookingLifecycle::events_for(&updated, target, role, now) {
            self.sink.publish(event);
        }

        tracing::info!(
            booking_id = %booking_id,
            from = %booking.status,
            to = %target,
            "booking status advanced"
        );

        Ok(updated)
    }

    /// Cancel a booking (sugar for advancing to `Cancelled`).
    ///
    /// # Errors
    ///
    /// Same as [`Self::advance_status`].
    pub async fn cancel(
        &self,
        booking_id: BookingId,
        actor: ActorId,
    ) -> Result<Booking, EngineError> {
        self.advance_status(booking_id, BookingStatus::Cancelled, actor)
            .await
    }

    /// Whether chat is enabled for this booking.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BookingNotFound`] if the booking does not
    /// exist.
    pub async fn is_chat_eligible(&self, booking_id: BookingId) -> Result<bool, EngineError> {
        let booking = self.repository.get(booking_id).await?;
        Ok(lifecycle::is_chat_eligible(booking.status))
    }

    /// Whether the booking can be reviewed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BookingNotFound`] if the booking does not
    /// exist.
    pub async fn is_review_eligible(&self, booking_id: BookingId) -> Result<bool, EngineError> {
        let booking = self.repository.get(booking_id).await?;
        Ok(lifecycle::is_review_eligible(booking.status))
    }

    /// Spawn the background reconciliation sweeper.
    ///
    /// Frees holds orphaned past their expiry, covering crashed clients
    /// and interrupted rollbacks. Runs until the handle is aborted.
    #[must_use]
    pub fn spawn_hold_sweeper(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.sweep_interval);
            // The first tick fires immediately; skip it so a fresh server
            // does not sweep before anything can have expired.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let freed = self.availability.sweep_expired_holds().await;
                if freed > 0 {
                    tracing::debug!(freed, "hold sweeper pass complete");
                }
            }
        })
    }

    async fn compensate_cancellation(&self, booking: &Booking, transaction: Option<Transaction>) {
        // Free the segment so another client can book it.
        self.availability.release_segment(booking.segment).await;

        // Refund if a captured payment exists. Refund failures are
        // logged, not surfaced: the cancellation itself already happened.
        if let Some(transaction) = transaction.filter(Transaction::is_completed) {
            match self.gateway.refund(transaction.id).await {
                Ok(status) => {
                    let updated = Transaction { status, ..transaction };
                    if let Err(error) = self
                        .repository
                        .attach_transaction(booking.id, updated)
                        .await
                    {
                        tracing::error!(
                            booking_id = %booking.id,
                            error = %error,
                            "failed to record refund outcome"
                        );
                    }
                    self.sink.publish(BookingEvent::RefundRequested {
                        booking_id: booking.id,
                        transaction_id: transaction.id,
                    });
                }
                Err(error) => {
                    tracing::error!(
                        booking_id = %booking.id,
                        transaction_id = %transaction.id,
                        error = %error,
                        "refund request failed"
                    );
                }
            }
        }
    }
}
