//! Scripted payment gateway for exercising failure paths.

use async_trait::async_trait;
use carebook_core::payment::{GatewayResult, PaymentError, PaymentGateway};
use carebook_core::types::{
    BookingId, Money, Transaction, TransactionId, TransactionStatus,
};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Outcome the gateway should produce for the next authorization
#[derive(Clone, Debug)]
pub enum AuthorizeOutcome {
    /// Authorize and capture in full
    Complete,
    /// Record the authorization as still pending
    Pending,
    /// Decline with the given reason
    Decline(String),
    /// Simulate a gateway timeout
    Timeout,
}

/// A gateway that plays back a queue of scripted outcomes.
///
/// When the queue runs dry it authorizes in full, so happy-path tests
/// need no setup.
#[derive(Debug, Default)]
pub struct ScriptedPaymentGateway {
    outcomes: Mutex<VecDeque<AuthorizeOutcome>>,
    refunds: Mutex<Vec<TransactionId>>,
}

impl ScriptedPaymentGateway {
    /// Creates a gateway with an empty script (authorizes everything)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the outcome for the next authorization
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a previous test panic).
    #[allow(clippy::unwrap_used)]
    pub fn script(&self, outcome: AuthorizeOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    /// Transactions refunded so far, in order
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a previous test panic).
    #[allow(clippy::unwrap_used)]
    pub fn refunded(&self) -> Vec<TransactionId> {
        self.refunds.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedPaymentGateway {
    #[allow(clippy::unwrap_used)]
    async fn authorize(
        &self,
        booking_id: BookingId,
        amount: Money,
    ) -> GatewayResult<Transaction> {
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(AuthorizeOutcome::Complete);

        match outcome {
            AuthorizeOutcome::Complete => Ok(Transaction::new(
                TransactionId::new(),
                booking_id,
                amount,
                TransactionStatus::Completed,
            )),
            AuthorizeOutcome::Pending => Ok(Transaction::new(
                TransactionId::new(),
                booking_id,
                amount,
                TransactionStatus::Pending,
            )),
            AuthorizeOutcome::Decline(reason) => Err(PaymentError::Declined { reason }),
            AuthorizeOutcome::Timeout => Err(PaymentError::Timeout),
        }
    }

    #[allow(clippy::unwrap_used)]
    async fn refund(&self, transaction_id: TransactionId) -> GatewayResult<TransactionStatus> {
        self.refunds.lock().unwrap().push(transaction_id);
        Ok(TransactionStatus::Refunded)
    }
}
