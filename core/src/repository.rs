//! Booking and transaction persistence seam.
//!
//! Bookings are never deleted once committed; `remove` exists solely for
//! the reservation coordinator's compensating rollback while a booking
//! is still being assembled.

use crate::error::EngineError;
use crate::types::{Booking, BookingId, BookingStatus, SegmentRef, Transaction};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Owner of durable booking records and their payment transactions
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a freshly created booking.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidDraft`] if the identifier is already
    /// taken.
    async fn insert(&self, booking: Booking) -> Result<(), EngineError>;

    /// Fetch a booking by id.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BookingNotFound`] if it does not exist.
    async fn get(&self, booking_id: BookingId) -> Result<Booking, EngineError>;

    /// Atomically move a booking from `expected` to `target`.
    ///
    /// The compare-and-set makes concurrent `advance_status` calls safe:
    /// exactly one writer wins per transition.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BookingNotFound`] if the booking does not
    /// exist, or [`EngineError::IllegalTransition`] if its current status
    /// is no longer `expected`.
    async fn update_status(
        &self,
        booking_id: BookingId,
        expected: BookingStatus,
        target: BookingStatus,
    ) -> Result<Booking, EngineError>;

    /// Delete a partially-created booking (compensation only).
    async fn remove(&self, booking_id: BookingId);

    /// Attach or replace the booking's payment transaction.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BookingNotFound`] if the booking does not
    /// exist.
    async fn attach_transaction(
        &self,
        booking_id: BookingId,
        transaction: Transaction,
    ) -> Result<(), EngineError>;

    /// Fetch the booking's payment transaction, if any.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BookingNotFound`] if the booking does not
    /// exist.
    async fn transaction_for(
        &self,
        booking_id: BookingId,
    ) -> Result<Option<Transaction>, EngineError>;

    /// Find the booking (if any) currently consuming a segment.
    ///
    /// A booking consumes its segment while `Pending`, `Confirmed`, or
    /// `InProgress`; this is the mutual-exclusion audit used in tests.
    async fn find_active_by_segment(&self, segment: SegmentRef) -> Option<Booking>;
}

#[derive(Debug, Default)]
struct RepositoryInner {
    bookings: HashMap<BookingId, Booking>,
    transactions: HashMap<BookingId, Transaction>,
}

/// In-memory booking repository
#[derive(Debug, Default)]
pub struct InMemoryBookingRepository {
    inner: RwLock<RepositoryInner>,
}

impl InMemoryBookingRepository {
    /// Creates an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<dyn BookingRepository> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: Booking) -> Result<(), EngineError> {
        let mut inner = self.inner.write().await;
        if inner.bookings.contains_key(&booking.id) {
            return Err(EngineError::invalid_draft(format!(
                "booking {} already exists",
                booking.id
            )));
        }
        inner.bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn get(&self, booking_id: BookingId) -> Result<Booking, EngineError> {
        let inner = self.inner.read().await;
        inner
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or(EngineError::BookingNotFound { booking_id })
    }

    async fn update_status(
        &self,
        booking_id: BookingId,
        expected: BookingStatus,
        target: BookingStatus,
    ) -> Result<Booking, EngineError> {
        let mut inner = self.inner.write().await;
        let Some(booking) = inner.bookings.get_mut(&booking_id) else {
            return Err(EngineError::BookingNotFound { booking_id });
        };

        if booking.status != expected {
            return Err(EngineError::IllegalTransition {
                from: booking.status,
                to: target,
            });
        }

        booking.status = target;
        Ok(booking.clone())
    }

    async fn remove(&self, booking_id: BookingId) {
        let mut inner = self.inner.write().await;
        inner.bookings.remove(&booking_id);
        inner.transactions.remove(&booking_id);
    }

    async fn attach_transaction(
        &self,
        booking_id: BookingId,
        transaction: Transaction,
    ) -> Result<(), EngineError> {
        let mut inner = self.inner.write().await;
        if !inner.bookings.contains_key(&booking_id) {
            return Err(EngineError::BookingNotFound { booking_id });
        }
        inner.transactions.insert(booking_id, transaction);
        Ok(())
    }

    async fn transaction_for(
        &self,
        booking_id: BookingId,
    ) -> Result<Option<Transaction>, EngineError> {
        let inner = self.inner.read().await;
        if !inner.bookings.contains_key(&booking_id) {
            return Err(EngineError::BookingNotFound { booking_id });
        }
        Ok(inner.transactions.get(&booking_id).copied())
    }

    async fn find_active_by_segment(&self, segment: SegmentRef) -> Option<Booking> {
        let inner = self.inner.read().await;
        inner
            .bookings
            .values()
            .find(|booking| booking.segment == segment && booking.status.consumes_segment())
            .cloned()
    }
}
