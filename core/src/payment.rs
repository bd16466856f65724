//! Payment collaborator seam.
//!
//! The engine never talks to a processor directly; it consumes this
//! trait, reads the resulting [`Transaction`] status to gate
//! confirmation, and requests refunds on cancellation. Production
//! deployments plug in a real gateway integration here.

use crate::types::{BookingId, Money, Transaction, TransactionId, TransactionStatus};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Payment gateway result
pub type GatewayResult<T> = Result<T, PaymentError>;

/// Errors surfaced by the payment collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// The processor rejected the authorization
    #[error("payment declined: {reason}")]
    Declined {
        /// Decline reason from the processor
        reason: String,
    },

    /// The gateway did not answer within its timeout
    #[error("payment gateway timed out")]
    Timeout,

    /// The gateway could not be reached or returned a transport error
    #[error("payment gateway unavailable: {message}")]
    Unavailable {
        /// Transport-level detail
        message: String,
    },

    /// The transaction to refund is unknown to the gateway
    #[error("unknown transaction {transaction_id}")]
    UnknownTransaction {
        /// The missing transaction
        transaction_id: TransactionId,
    },
}

/// Abstraction over payment processors.
///
/// Both calls are bounded by the gateway's own timeout; the engine
/// treats a timeout as a failed authorization, never as a hang.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Authorize payment for a booking.
    ///
    /// # Errors
    ///
    /// Returns an error if the processor declines, times out, or is
    /// unreachable.
    async fn authorize(&self, booking_id: BookingId, amount: Money)
        -> GatewayResult<Transaction>;

    /// Refund a previously authorized transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is unknown or the gateway
    /// fails.
    async fn refund(&self, transaction_id: TransactionId) -> GatewayResult<TransactionStatus>;
}

/// Mock payment gateway (always authorizes) for development and demos.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockPaymentGateway;

impl MockPaymentGateway {
    /// Creates a new mock payment gateway
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn authorize(
        &self,
        booking_id: BookingId,
        amount: Money,
    ) -> GatewayResult<Transaction> {
        let transaction =
            Transaction::new(TransactionId::new(), booking_id, amount, TransactionStatus::Completed);

        tracing::info!(
            booking_id = %booking_id,
            amount = amount.cents(),
            transaction_id = %transaction.id,
            "mock payment authorized"
        );

        Ok(transaction)
    }

    async fn refund(&self, transaction_id: TransactionId) -> GatewayResult<TransactionStatus> {
        tracing::info!(transaction_id = %transaction_id, "mock refund processed");
        Ok(TransactionStatus::Refunded)
    }
}
