//! Domain types for the availability and booking engine.
//!
//! Value objects, entities, and status enums shared by the availability
//! store, the reservation coordinator, and the booking lifecycle.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from a `Uuid`
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a care provider
    ProviderId
}

uuid_id! {
    /// Unique identifier for an offered service
    ServiceId
}

uuid_id! {
    /// Unique identifier for a client (care seeker)
    ClientId
}

uuid_id! {
    /// Unique identifier for a booking
    BookingId
}

uuid_id! {
    /// Unique identifier for a provider availability window
    TimeSlotId
}

uuid_id! {
    /// Unique identifier for a segment hold
    HoldId
}

uuid_id! {
    /// Unique identifier for a payment transaction
    TransactionId
}

/// Canonical actor identity, resolved once at the API boundary.
///
/// Business logic never compares multiple identifier fields; it asks the
/// booking which role (if any) this opaque identity plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(Uuid);

impl ActorId {
    /// Creates a new random `ActorId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an `ActorId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ClientId> for ActorId {
    fn from(id: ClientId) -> Self {
        Self(*id.as_uuid())
    }
}

impl From<ProviderId> for ActorId {
    fn from(id: ProviderId) -> Self {
        Self(*id.as_uuid())
    }
}

/// The role an actor plays on a specific booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorRole {
    /// The client who placed the booking
    Client,
    /// The provider delivering the service
    Provider,
}

// ============================================================================
// Money
// ============================================================================

/// An agreed price in whole cents; floating point never touches money.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole dollars
    ///
    /// # Panics
    ///
    /// Panics if `dollars * 100` overflows `u64`.
    #[must_use]
    #[allow(clippy::panic)]
    pub const fn from_dollars(dollars: u64) -> Self {
        match dollars.checked_mul(100) {
            Some(cents) => Self(cents),
            None => panic!("dollar amount too large"),
        }
    }

    /// The amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Durations and Expiry
// ============================================================================

/// A service's fixed appointment length in whole minutes
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceDuration(u32);

impl ServiceDuration {
    /// Creates a new `ServiceDuration`
    #[must_use]
    pub const fn minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    /// Returns the duration in minutes
    #[must_use]
    pub const fn as_minutes(&self) -> u32 {
        self.0
    }

    /// Returns the duration as a chrono `Duration`
    #[must_use]
    pub fn to_chrono(self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.0))
    }
}

impl fmt::Display for ServiceDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}min", self.0)
    }
}

/// Wrapper for hold expiry with ordering and comparison
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HoldExpiry(DateTime<Utc>);

impl HoldExpiry {
    /// Creates a new `HoldExpiry`
    #[must_use]
    pub const fn new(expiry: DateTime<Utc>) -> Self {
        Self(expiry)
    }

    /// Checks if the hold has lapsed at the given instant
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.0
    }
}

impl fmt::Display for HoldExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

// ============================================================================
// Availability Entities
// ============================================================================

/// A provider's declared availability window for one service on one date.
///
/// Times are same-day wall clock, interpreted as UTC. The window itself is
/// never mutated after publication; only its derived segments change state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Unique slot identifier
    pub id: TimeSlotId,
    /// Provider declaring the window
    pub provider_id: ProviderId,
    /// Service offered during the window
    pub service_id: ServiceId,
    /// Calendar day of the window
    pub date: NaiveDate,
    /// Window start (wall clock)
    pub start_time: NaiveTime,
    /// Window end (wall clock, same day)
    pub end_time: NaiveTime,
    /// True only when the whole window was consumed as a single unit
    /// (legacy non-segmented path)
    pub is_booked: bool,
}

impl TimeSlot {
    /// Creates a new unbooked `TimeSlot`
    #[must_use]
    pub const fn new(
        id: TimeSlotId,
        provider_id: ProviderId,
        service_id: ServiceId,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            id,
            provider_id,
            service_id,
            date,
            start_time,
            end_time,
            is_booked: false,
        }
    }
}

/// Addressing unit for segment claims: one fixed-duration subdivision of
/// one time slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentRef {
    /// The slot the segment belongs to
    pub time_slot_id: TimeSlotId,
    /// 0-based position inside the slot
    pub segment_index: u32,
}

impl SegmentRef {
    /// Creates a new `SegmentRef`
    #[must_use]
    pub const fn new(time_slot_id: TimeSlotId, segment_index: u32) -> Self {
        Self {
            time_slot_id,
            segment_index,
        }
    }
}

impl fmt::Display for SegmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.time_slot_id, self.segment_index)
    }
}

/// Booking state of a single segment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentState {
    /// Open for claiming
    Free,
    /// Provisionally claimed while a booking attempt is in flight
    Held {
        /// Identifies the hold so only its owner can commit or release it
        hold_id: HoldId,
        /// Client that claimed the segment
        holder: ClientId,
        /// When the hold lapses back to free
        expires_at: HoldExpiry,
    },
    /// Committed to a booking
    Booked {
        /// The booking consuming this segment
        booking_id: BookingId,
    },
}

impl SegmentState {
    /// Checks whether the segment is claimable at the given instant
    /// (free, or held past its expiry)
    #[must_use]
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Free => true,
            Self::Held { expires_at, .. } => expires_at.is_expired(now),
            Self::Booked { .. } => false,
        }
    }
}

/// A derived, fixed-duration subdivision of a `TimeSlot`.
///
/// Segments are a projection: `start_time` and `end_time` are always
/// re-derivable from the slot window, the segment index, and the service
/// duration. Only `state` is genuinely owned by the availability store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// The slot this segment subdivides
    pub time_slot_id: TimeSlotId,
    /// 0-based, deterministic position inside the slot
    pub segment_index: u32,
    /// Segment start (wall clock)
    pub start_time: NaiveTime,
    /// Segment end (wall clock)
    pub end_time: NaiveTime,
    /// Current booking state
    pub state: SegmentState,
}

/// A time-limited, provisional claim on a segment.
///
/// Returned by `claim_segment`; consumed by `commit_hold` or
/// `release_hold`. The store invalidates it automatically once
/// `expires_at` passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldToken {
    /// Identifies this hold
    pub hold_id: HoldId,
    /// The held segment
    pub segment: SegmentRef,
    /// When the hold lapses
    pub expires_at: HoldExpiry,
}

// ============================================================================
// Booking Entities
// ============================================================================

/// Service address where the care takes place
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Street address, first line
    pub line1: String,
    /// Street address, second line
    pub line2: Option<String>,
    /// City
    pub city: String,
    /// State or region
    pub region: String,
    /// Postal code
    pub postal_code: String,
}

impl Address {
    /// Checks that the fields a provider needs to reach the client are present
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.line1.trim().is_empty()
            && !self.city.trim().is_empty()
            && !self.postal_code.trim().is_empty()
    }
}

/// Booking lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    /// Created, awaiting confirmation
    Pending,
    /// Confirmed (payment cleared or provider accepted)
    Confirmed,
    /// Service underway
    InProgress,
    /// Service delivered
    Completed,
    /// Cancelled by a participant (soft-terminal)
    Cancelled,
}

impl BookingStatus {
    /// Checks whether the status is terminal
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Checks whether a booking in this status still consumes its segment
    #[must_use]
    pub const fn consumes_segment(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::InProgress)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Caller-supplied booking details, validated by the reservation
/// coordinator before any booking is created
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDraft {
    /// Service being booked
    pub service_id: ServiceId,
    /// Provider delivering the service
    pub provider_id: ProviderId,
    /// Client placing the booking
    pub client_id: ClientId,
    /// Expected appointment length; must match the service's declared duration
    pub duration: ServiceDuration,
    /// Where the service takes place
    pub address: Address,
    /// Free-form instructions for the provider
    pub special_instructions: Option<String>,
    /// Agreed price
    pub total_price: Money,
}

/// A committed intent to consume one segment, tracked through its lifecycle.
///
/// Never deleted once committed; only transitioned to `Cancelled`. The
/// single exception is the compensating delete while a reservation is
/// still being assembled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier
    pub id: BookingId,
    /// Service being delivered
    pub service_id: ServiceId,
    /// Provider delivering it
    pub provider_id: ProviderId,
    /// Client receiving it
    pub client_id: ClientId,
    /// The segment this booking consumes
    pub segment: SegmentRef,
    /// Scheduled start instant
    pub start: DateTime<Utc>,
    /// Appointment length
    pub duration: ServiceDuration,
    /// Where the service takes place
    pub address: Address,
    /// Free-form instructions for the provider
    pub special_instructions: Option<String>,
    /// Agreed price
    pub total_price: Money,
    /// Current lifecycle status
    pub status: BookingStatus,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Creates a new `Pending` booking from a validated draft
    #[must_use]
    pub fn from_draft(
        id: BookingId,
        draft: BookingDraft,
        segment: SegmentRef,
        start: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            service_id: draft.service_id,
            provider_id: draft.provider_id,
            client_id: draft.client_id,
            segment,
            start,
            duration: draft.duration,
            address: draft.address,
            special_instructions: draft.special_instructions,
            total_price: draft.total_price,
            status: BookingStatus::Pending,
            created_at,
        }
    }

    /// Resolves which role (if any) the given actor plays on this booking
    #[must_use]
    pub fn role_of(&self, actor: ActorId) -> Option<ActorRole> {
        if actor.as_uuid() == self.client_id.as_uuid() {
            Some(ActorRole::Client)
        } else if actor.as_uuid() == self.provider_id.as_uuid() {
            Some(ActorRole::Provider)
        } else {
            None
        }
    }
}

// ============================================================================
// Payment Entities
// ============================================================================

/// Payment record status, owned by the payment collaborator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Authorization requested, outcome unknown
    Pending,
    /// Funds captured
    Completed,
    /// Authorization rejected
    Failed,
    /// Fully refunded
    Refunded,
    /// Partially refunded
    PartiallyRefunded,
}

/// Payment record associated (at most 1:1) with a booking.
///
/// The engine only reads `status` to gate lifecycle transitions; all
/// writes come from the payment collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction identifier
    pub id: TransactionId,
    /// The booking this payment is for
    pub booking_id: BookingId,
    /// Amount authorized
    pub amount: Money,
    /// Current payment status
    pub status: TransactionStatus,
}

impl Transaction {
    /// Creates a new `Transaction`
    #[must_use]
    pub const fn new(
        id: TransactionId,
        booking_id: BookingId,
        amount: Money,
        status: TransactionStatus,
    ) -> Self {
        Self {
            id,
            booking_id,
            amount,
            status,
        }
    }

    /// Checks whether the payment has cleared
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.status, TransactionStatus::Completed)
    }
}
