//! Booking lifecycle state machine.
//!
//! Transition table:
//!
//! | From       | To          | Allowed actor        | Precondition                       |
//! |------------|-------------|----------------------|------------------------------------|
//! | Pending    | Confirmed   | per policy           | completed payment (default policy) |
//! | Pending    | Cancelled   | client or provider   | none                               |
//! | Confirmed  | InProgress  | provider             | scheduled start reached (warns)    |
//! | Confirmed  | Cancelled   | client or provider   | none                               |
//! | InProgress | Completed   | provider             | none                               |
//! | Completed, Cancelled | - | -                    | terminal                           |
//!
//! Re-issuing `Confirmed`, `InProgress`, or `Completed` on a booking
//! already in that status is a no-op success, which tolerates retries
//! from an unreliable caller. The evaluation itself is pure; the service
//! shell performs the writes and the cancellation side effects.

use crate::error::EngineError;
use crate::events::BookingEvent;
use crate::types::{ActorId, ActorRole, Booking, BookingStatus, Transaction};
use chrono::{DateTime, Utc};
use smallvec::{smallvec, SmallVec};

/// Who may move a booking from `Pending` to `Confirmed`.
///
/// The engine never infers the rule from call ordering; deployments pick
/// one policy explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConfirmationPolicy {
    /// Confirmation requires a completed payment, whichever participant
    /// asks. The authoritative default.
    #[default]
    PaymentGates,
    /// The provider may confirm without payment (legacy manual flow);
    /// everyone else still needs the payment gate.
    ProviderOverride,
}

/// Outcome of evaluating a requested transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// The booking is already in the target status; report success
    /// without writing
    Idempotent,
    /// The transition is legal; apply it
    Advance {
        /// The role the acting participant plays on this booking
        role: ActorRole,
    },
}

/// Validates and describes booking status transitions
#[derive(Clone, Copy, Debug, Default)]
pub struct BookingLifecycle {
    policy: ConfirmationPolicy,
}

impl BookingLifecycle {
    /// Creates a lifecycle with the given confirmation policy
    #[must_use]
    pub const fn new(policy: ConfirmationPolicy) -> Self {
        Self { policy }
    }

    /// Returns the active confirmation policy
    #[must_use]
    pub const fn policy(&self) -> ConfirmationPolicy {
        self.policy
    }

    /// Evaluates a requested transition without touching any state.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Unauthorized`] if the actor is not a participant
    ///   or lacks the role the transition requires.
    /// - [`EngineError::PaymentNotCompleted`] if confirmation is payment
    ///   gated and no completed transaction exists.
    /// - [`EngineError::IllegalTransition`] for anything outside the
    ///   table, including attempts to leave a terminal state.
    pub fn evaluate(
        &self,
        booking: &Booking,
        target: BookingStatus,
        actor: ActorId,
        transaction: Option<&Transaction>,
        now: DateTime<Utc>,
    ) -> Result<Step, EngineError> {
        let Some(role) = booking.role_of(actor) else {
            return Err(EngineError::Unauthorized {
                actor,
                booking_id: booking.id,
            });
        };

        // Retry tolerance: re-issuing a forward transition already taken
        if booking.status == target
            && matches!(
                target,
                BookingStatus::Confirmed | BookingStatus::InProgress | BookingStatus::Completed
            )
        {
            return Ok(Step::Idempotent);
        }

        match (booking.status, target) {
            (BookingStatus::Pending, BookingStatus::Confirmed) => {
                self.check_confirmation_gate(booking, role, transaction)?;
                Ok(Step::Advance { role })
            }

            (BookingStatus::Pending | BookingStatus::Confirmed, BookingStatus::Cancelled) => {
                Ok(Step::Advance { role })
            }

            (BookingStatus::Confirmed, BookingStatus::InProgress) => {
                if role != ActorRole::Provider {
                    return Err(EngineError::Unauthorized {
                        actor,
                        booking_id: booking.id,
                    });
                }
                // Policy-enforced, not hard-blocked: an early start is
                // allowed but surfaced to operators.
                if now < booking.start {
                    let early_by = booking.start - now;
                    tracing::warn!(
                        booking_id = %booking.id,
                        early_by_minutes = early_by.num_minutes(),
                        "booking started before its scheduled time"
                    );
                }
                Ok(Step::Advance { role })
            }

            (BookingStatus::InProgress, BookingStatus::Completed) => {
                if role != ActorRole::Provider {
                    return Err(EngineError::Unauthorized {
                        actor,
                        booking_id: booking.id,
                    });
                }
                Ok(Step::Advance { role })
            }

            (from, to) => Err(EngineError::IllegalTransition { from, to }),
        }
    }

    /// Builds the domain events an applied transition emits
    #[must_use]
    pub fn events_for(
        booking: &Booking,
        target: BookingStatus,
        role: ActorRole,
        now: DateTime<Utc>,
    ) -> SmallVec<[BookingEvent; 2]> {
        match target {
            BookingStatus::Confirmed => smallvec![BookingEvent::BookingConfirmed {
                booking_id: booking.id,
                confirmed_at: now,
            }],
            BookingStatus::InProgress => smallvec![BookingEvent::BookingStarted {
                booking_id: booking.id,
                started_at: now,
            }],
            BookingStatus::Completed => smallvec![BookingEvent::BookingCompleted {
                booking_id: booking.id,
                completed_at: now,
            }],
            BookingStatus::Cancelled => smallvec![BookingEvent::BookingCancelled {
                booking_id: booking.id,
                segment: booking.segment,
                cancelled_by: role,
                cancelled_at: now,
            }],
            // Bookings are created Pending; there is no transition into it
            BookingStatus::Pending => SmallVec::new(),
        }
    }

    fn check_confirmation_gate(
        &self,
        booking: &Booking,
        role: ActorRole,
        transaction: Option<&Transaction>,
    ) -> Result<(), EngineError> {
        let payment_completed = transaction.is_some_and(Transaction::is_completed);

        match self.policy {
            ConfirmationPolicy::PaymentGates => {
                if payment_completed {
                    Ok(())
                } else {
                    Err(EngineError::PaymentNotCompleted {
                        booking_id: booking.id,
                    })
                }
            }
            ConfirmationPolicy::ProviderOverride => {
                if payment_completed || role == ActorRole::Provider {
                    Ok(())
                } else {
                    Err(EngineError::PaymentNotCompleted {
                        booking_id: booking.id,
                    })
                }
            }
        }
    }
}

/// Chat is enabled while the service is confirmed or underway
#[must_use]
pub const fn is_chat_eligible(status: BookingStatus) -> bool {
    matches!(status, BookingStatus::Confirmed | BookingStatus::InProgress)
}

/// Reviews open once the service is completed
#[must_use]
pub const fn is_review_eligible(status: BookingStatus) -> bool {
    matches!(status, BookingStatus::Completed)
}
