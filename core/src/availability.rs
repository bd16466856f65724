//! Availability store: time slots, derived segments, and atomic claims.
//!
//! This component owns every segment state transition. The whole
//! mutual-exclusion guarantee rests on `claim_segment` being a single
//! compare-and-set against the backing store; callers never get a
//! read-then-write window.
//!
//! Holds expire automatically: the store treats a lapsed hold as free on
//! the next access, and [`AvailabilityStore::sweep_expired_holds`] lets a
//! background task reclaim them eagerly.

use crate::environment::Clock;
use crate::error::EngineError;
use crate::segments::{derive_segments, segment_count, segment_window};
use crate::types::{
    BookingId, ClientId, HoldExpiry, HoldId, HoldToken, ProviderId, Segment, SegmentRef,
    SegmentState, ServiceDuration, ServiceId, TimeSlot, TimeSlotId,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================================================
// Query Types
// ============================================================================

/// Selector for availability listings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AvailabilityQuery {
    /// All slots declared by one provider
    Provider(ProviderId),
    /// All slots for one service, across providers
    Service(ServiceId),
}

/// Inclusive calendar date range
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    /// First day included
    pub from: NaiveDate,
    /// Last day included
    pub to: NaiveDate,
}

impl DateRange {
    /// Creates a new inclusive range
    #[must_use]
    pub const fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// Checks whether a date falls inside the range
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

/// One slot with its segments, as seen at query time
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotAvailability {
    /// The declared window
    pub slot: TimeSlot,
    /// Derived segments with their current claim state
    pub segments: Vec<Segment>,
}

/// Availability grouped by date, dates in ascending order
pub type AvailabilityByDate = BTreeMap<NaiveDate, Vec<SlotAvailability>>;

/// A successful claim: the hold token plus the segment facts the
/// reservation coordinator validates the draft against
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentClaim {
    /// Token consumed by `commit_hold` / `release_hold`
    pub token: HoldToken,
    /// Provider owning the slot
    pub provider_id: ProviderId,
    /// Service the slot was declared for
    pub service_id: ServiceId,
    /// Absolute start of the claimed segment
    pub start: DateTime<Utc>,
    /// Length of the claimed segment
    pub duration: ServiceDuration,
}

// ============================================================================
// Store Trait
// ============================================================================

/// Owner of all time slot and segment state.
///
/// Operations on the same `(time_slot_id, segment_index)` pair are
/// totally ordered; different segments proceed fully in parallel.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Register a service's fixed appointment duration.
    ///
    /// Slots can only be published for registered services; the duration
    /// determines segment derivation.
    async fn register_service(&self, service_id: ServiceId, duration: ServiceDuration);

    /// Publish a provider availability window.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWindow`] for an unusable window,
    /// [`EngineError::UnknownService`] for an unregistered service, or
    /// [`EngineError::SlotAlreadyPublished`] for a duplicate identifier.
    async fn publish_slot(&self, slot: TimeSlot) -> Result<(), EngineError>;

    /// List availability in a date range, grouped by date.
    ///
    /// Side-effect-free read; segment state reflects all claims committed
    /// before the call started, with lapsed holds shown as free.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownService`] if a service selector is
    /// not registered.
    async fn list_availability(
        &self,
        query: AvailabilityQuery,
        range: DateRange,
    ) -> Result<AvailabilityByDate, EngineError>;

    /// Atomically claim a free segment for `holder`.
    ///
    /// A single compare-and-set: exactly one of N concurrent claims on
    /// the same segment succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SegmentUnavailable`] if the segment is
    /// held or booked (lost the race), or [`EngineError::SlotNotFound`]
    /// if the slot does not exist.
    async fn claim_segment(
        &self,
        segment: SegmentRef,
        holder: ClientId,
        hold_duration: chrono::Duration,
    ) -> Result<SegmentClaim, EngineError>;

    /// Release a hold back to free.
    ///
    /// Idempotent; a no-op if the hold already expired, was released, or
    /// was committed.
    async fn release_hold(&self, token: &HoldToken);

    /// Commit a held segment to a booking.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::HoldExpired`] if the token lapsed, was
    /// superseded, or was already consumed.
    async fn commit_hold(&self, token: &HoldToken, booking_id: BookingId)
        -> Result<(), EngineError>;

    /// Return a segment to free regardless of current state
    /// (cancellation path). Idempotent.
    async fn release_segment(&self, segment: SegmentRef);

    /// Reclaim every lapsed hold now instead of lazily on access.
    ///
    /// Returns how many holds were freed. Used by the background
    /// reconciliation sweeper.
    async fn sweep_expired_holds(&self) -> usize;

    /// Drop slots whose date is before `before`. Returns how many were
    /// archived.
    async fn archive_past_slots(&self, before: NaiveDate) -> usize;
}

// ============================================================================
// In-Memory Implementation
// ============================================================================

/// Per-slot record: the declared window plus one state cell per segment.
///
/// Times are never stored per segment; they are re-derived from the
/// window so the persisted shape cannot drift from the formula.
#[derive(Clone, Debug)]
struct SlotEntry {
    slot: TimeSlot,
    duration: ServiceDuration,
    states: Vec<SegmentState>,
}

#[derive(Debug, Default)]
struct StoreInner {
    services: HashMap<ServiceId, ServiceDuration>,
    slots: HashMap<TimeSlotId, SlotEntry>,
}

/// In-memory availability store.
///
/// All mutation happens inside one write-lock section, which makes
/// claim/commit/release linearizable per segment. Suitable as the
/// short-TTL hold store and as the slot store for single-node
/// deployments; the trait is the seam for a durable backend.
pub struct InMemoryAvailabilityStore {
    clock: Arc<dyn Clock>,
    inner: RwLock<StoreInner>,
}

impl InMemoryAvailabilityStore {
    /// Creates an empty store using the given clock for hold expiry
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: RwLock::new(StoreInner::default()),
        }
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(clock: Arc<dyn Clock>) -> Arc<dyn AvailabilityStore> {
        Arc::new(Self::new(clock))
    }

    fn matches(query: AvailabilityQuery, slot: &TimeSlot) -> bool {
        match query {
            AvailabilityQuery::Provider(provider_id) => slot.provider_id == provider_id,
            AvailabilityQuery::Service(service_id) => slot.service_id == service_id,
        }
    }

    /// Presents a stored state with lapsed holds normalized to free
    fn visible_state(state: SegmentState, now: DateTime<Utc>) -> SegmentState {
        match state {
            SegmentState::Held { expires_at, .. } if expires_at.is_expired(now) => {
                SegmentState::Free
            }
            other => other,
        }
    }
}

#[async_trait]
impl AvailabilityStore for InMemoryAvailabilityStore {
    async fn register_service(&self, service_id: ServiceId, duration: ServiceDuration) {
        let mut inner = self.inner.write().await;
        inner.services.insert(service_id, duration);
    }

    async fn publish_slot(&self, slot: TimeSlot) -> Result<(), EngineError> {
        let mut inner = self.inner.write().await;

        let Some(&duration) = inner.services.get(&slot.service_id) else {
            return Err(EngineError::UnknownService {
                service_id: slot.service_id,
            });
        };

        if inner.slots.contains_key(&slot.id) {
            return Err(EngineError::SlotAlreadyPublished {
                time_slot_id: slot.id,
            });
        }

        // Validates the window before anything is stored
        let count = segment_count(slot.start_time, slot.end_time, duration)?;

        tracing::debug!(
            time_slot_id = %slot.id,
            provider_id = %slot.provider_id,
            date = %slot.date,
            segments = count,
            "slot published"
        );

        inner.slots.insert(
            slot.id,
            SlotEntry {
                slot,
                duration,
                states: vec![SegmentState::Free; count as usize],
            },
        );

        Ok(())
    }

    async fn list_availability(
        &self,
        query: AvailabilityQuery,
        range: DateRange,
    ) -> Result<AvailabilityByDate, EngineError> {
        let now = self.clock.now();
        let inner = self.inner.read().await;

        if let AvailabilityQuery::Service(service_id) = query {
            if !inner.services.contains_key(&service_id) {
                return Err(EngineError::UnknownService { service_id });
            }
        }

        let mut by_date: AvailabilityByDate = BTreeMap::new();
        for entry in inner.slots.values() {
            if !Self::matches(query, &entry.slot) || !range.contains(entry.slot.date) {
                continue;
            }

            let mut segments = derive_segments(&entry.slot, entry.duration)?;
            for segment in &mut segments {
                let stored = entry.states[segment.segment_index as usize];
                segment.state = Self::visible_state(stored, now);
            }

            by_date
                .entry(entry.slot.date)
                .or_default()
                .push(SlotAvailability {
                    slot: entry.slot.clone(),
                    segments,
                });
        }

        // Deterministic ordering within a date
        for slots in by_date.values_mut() {
            slots.sort_by_key(|availability| (availability.slot.start_time, availability.slot.id));
        }

        Ok(by_date)
    }

    async fn claim_segment(
        &self,
        segment: SegmentRef,
        holder: ClientId,
        hold_duration: chrono::Duration,
    ) -> Result<SegmentClaim, EngineError> {
        let now = self.clock.now();
        let mut inner = self.inner.write().await;

        let Some(entry) = inner.slots.get_mut(&segment.time_slot_id) else {
            return Err(EngineError::SlotNotFound {
                time_slot_id: segment.time_slot_id,
            });
        };

        // Legacy whole-window bookings consume every segment at once
        if entry.slot.is_booked {
            return Err(EngineError::SegmentUnavailable { segment });
        }

        let index = segment.segment_index as usize;
        let Some(state) = entry.states.get_mut(index) else {
            return Err(EngineError::SegmentUnavailable { segment });
        };

        // The compare-and-set: only a free (or lapsed-hold) segment may
        // transition to held, and we are still inside the write lock.
        if !state.is_claimable(now) {
            return Err(EngineError::SegmentUnavailable { segment });
        }

        let hold_id = HoldId::new();
        let expires_at = HoldExpiry::new(now + hold_duration);
        *state = SegmentState::Held {
            hold_id,
            holder,
            expires_at,
        };

        let (start_time, _) = segment_window(entry.slot.start_time, segment.segment_index, entry.duration);
        let start = entry.slot.date.and_time(start_time).and_utc();

        tracing::debug!(
            segment = %segment,
            holder = %holder,
            hold_id = %hold_id,
            expires_at = %expires_at,
            "segment claimed"
        );

        Ok(SegmentClaim {
            token: HoldToken {
                hold_id,
                segment,
                expires_at,
            },
            provider_id: entry.slot.provider_id,
            service_id: entry.slot.service_id,
            start,
            duration: entry.duration,
        })
    }

    async fn release_hold(&self, token: &HoldToken) {
        let mut inner = self.inner.write().await;

        let Some(entry) = inner.slots.get_mut(&token.segment.time_slot_id) else {
            return;
        };
        let Some(state) = entry.states.get_mut(token.segment.segment_index as usize) else {
            return;
        };

        // Only this token's own hold is released; anything else
        // (committed, superseded, already free) is left alone.
        if matches!(state, SegmentState::Held { hold_id, .. } if *hold_id == token.hold_id) {
            *state = SegmentState::Free;
            tracing::debug!(segment = %token.segment, hold_id = %token.hold_id, "hold released");
        }
    }

    async fn commit_hold(
        &self,
        token: &HoldToken,
        booking_id: BookingId,
    ) -> Result<(), EngineError> {
        let now = self.clock.now();
        let mut inner = self.inner.write().await;

        let Some(entry) = inner.slots.get_mut(&token.segment.time_slot_id) else {
            return Err(EngineError::HoldExpired {
                hold_id: token.hold_id,
            });
        };
        let Some(state) = entry.states.get_mut(token.segment.segment_index as usize) else {
            return Err(EngineError::HoldExpired {
                hold_id: token.hold_id,
            });
        };

        match *state {
            SegmentState::Held {
                hold_id,
                expires_at,
                ..
            } if hold_id == token.hold_id => {
                if expires_at.is_expired(now) {
                    // Lapsed: free the cell so the next claimant wins
                    *state = SegmentState::Free;
                    return Err(EngineError::HoldExpired {
                        hold_id: token.hold_id,
                    });
                }
                *state = SegmentState::Booked { booking_id };
                tracing::debug!(
                    segment = %token.segment,
                    booking_id = %booking_id,
                    "hold committed"
                );
                Ok(())
            }
            // Superseded, already committed, or already freed
            _ => Err(EngineError::HoldExpired {
                hold_id: token.hold_id,
            }),
        }
    }

    async fn release_segment(&self, segment: SegmentRef) {
        let mut inner = self.inner.write().await;

        let Some(entry) = inner.slots.get_mut(&segment.time_slot_id) else {
            return;
        };

        entry.slot.is_booked = false;
        if let Some(state) = entry.states.get_mut(segment.segment_index as usize) {
            if !matches!(state, SegmentState::Free) {
                *state = SegmentState::Free;
                tracing::debug!(segment = %segment, "segment released");
            }
        }
    }

    async fn sweep_expired_holds(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.inner.write().await;

        let mut freed = 0;
        for entry in inner.slots.values_mut() {
            for state in &mut entry.states {
                if matches!(state, SegmentState::Held { expires_at, .. } if expires_at.is_expired(now))
                {
                    *state = SegmentState::Free;
                    freed += 1;
                }
            }
        }

        if freed > 0 {
            tracing::info!(freed, "expired holds reclaimed");
        }
        freed
    }

    async fn archive_past_slots(&self, before: NaiveDate) -> usize {
        let mut inner = self.inner.write().await;

        let stale: Vec<TimeSlotId> = inner
            .slots
            .values()
            .filter(|entry| entry.slot.date < before)
            .map(|entry| entry.slot.id)
            .collect();

        for id in &stale {
            inner.slots.remove(id);
        }

        if !stale.is_empty() {
            tracing::info!(archived = stale.len(), "past slots archived");
        }
        stale.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::environment::SystemClock;
    use crate::types::ProviderId;
    use chrono::{NaiveDate, NaiveTime};

    fn store() -> InMemoryAvailabilityStore {
        InMemoryAvailabilityStore::new(Arc::new(SystemClock))
    }

    async fn published_slot(store: &InMemoryAvailabilityStore) -> TimeSlot {
        let service_id = ServiceId::new();
        store
            .register_service(service_id, ServiceDuration::minutes(60))
            .await;

        let slot = TimeSlot::new(
            TimeSlotId::new(),
            ProviderId::new(),
            service_id,
            NaiveDate::from_ymd_opt(2099, 3, 9).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
        );
        store.publish_slot(slot.clone()).await.unwrap();
        slot
    }

    #[tokio::test]
    async fn test_claim_succeeds_once_per_segment() {
        let store = store();
        let slot = published_slot(&store).await;
        let segment = SegmentRef::new(slot.id, 0);

        let claim = store
            .claim_segment(segment, ClientId::new(), chrono::Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(claim.token.segment, segment);
        assert_eq!(claim.duration, ServiceDuration::minutes(60));

        let err = store
            .claim_segment(segment, ClientId::new(), chrono::Duration::minutes(5))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::SegmentUnavailable { segment });
    }

    #[tokio::test]
    async fn test_commit_then_reclaim_fails_but_sibling_stays_claimable() {
        let store = store();
        let slot = published_slot(&store).await;
        let segment = SegmentRef::new(slot.id, 0);

        let claim = store
            .claim_segment(segment, ClientId::new(), chrono::Duration::minutes(5))
            .await
            .unwrap();
        store
            .commit_hold(&claim.token, BookingId::new())
            .await
            .unwrap();

        let err = store
            .claim_segment(segment, ClientId::new(), chrono::Duration::minutes(5))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::SegmentUnavailable { segment });

        // Segment 1 is unaffected
        store
            .claim_segment(
                SegmentRef::new(slot.id, 1),
                ClientId::new(),
                chrono::Duration::minutes(5),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_release_hold_is_idempotent_and_commit_safe() {
        let store = store();
        let slot = published_slot(&store).await;
        let segment = SegmentRef::new(slot.id, 0);
        let booking_id = BookingId::new();

        let claim = store
            .claim_segment(segment, ClientId::new(), chrono::Duration::minutes(5))
            .await
            .unwrap();
        store.commit_hold(&claim.token, booking_id).await.unwrap();

        // Releasing an already-committed hold is a no-op
        store.release_hold(&claim.token).await;
        store.release_hold(&claim.token).await;

        let listing = store
            .list_availability(
                AvailabilityQuery::Provider(slot.provider_id),
                DateRange::new(slot.date, slot.date),
            )
            .await
            .unwrap();
        let segments = &listing[&slot.date][0].segments;
        assert_eq!(segments[0].state, SegmentState::Booked { booking_id });
    }

    #[tokio::test]
    async fn test_released_segment_becomes_claimable_again() {
        let store = store();
        let slot = published_slot(&store).await;
        let segment = SegmentRef::new(slot.id, 0);

        let claim = store
            .claim_segment(segment, ClientId::new(), chrono::Duration::minutes(5))
            .await
            .unwrap();
        store
            .commit_hold(&claim.token, BookingId::new())
            .await
            .unwrap();

        store.release_segment(segment).await;

        store
            .claim_segment(segment, ClientId::new(), chrono::Duration::minutes(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stale_token_cannot_commit() {
        let store = store();
        let slot = published_slot(&store).await;
        let segment = SegmentRef::new(slot.id, 0);

        let first = store
            .claim_segment(segment, ClientId::new(), chrono::Duration::minutes(5))
            .await
            .unwrap();
        store.release_hold(&first.token).await;

        // Someone else claims after the release
        let second = store
            .claim_segment(segment, ClientId::new(), chrono::Duration::minutes(5))
            .await
            .unwrap();

        let err = store
            .commit_hold(&first.token, BookingId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::HoldExpired { .. }));

        // The live hold still commits
        store
            .commit_hold(&second.token, BookingId::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_slot_and_out_of_range_index_are_rejected() {
        let store = store();
        let slot = published_slot(&store).await;

        let missing = SegmentRef::new(TimeSlotId::new(), 0);
        let err = store
            .claim_segment(missing, ClientId::new(), chrono::Duration::minutes(5))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SlotNotFound { .. }));

        // 9:00-11:00 with 60-minute segments has indexes 0 and 1 only
        let out_of_range = SegmentRef::new(slot.id, 2);
        let err = store
            .claim_segment(out_of_range, ClientId::new(), chrono::Duration::minutes(5))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SegmentUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_legacy_whole_window_slot_rejects_claims() {
        let store = store();
        let service_id = ServiceId::new();
        store
            .register_service(service_id, ServiceDuration::minutes(60))
            .await;

        let mut slot = TimeSlot::new(
            TimeSlotId::new(),
            ProviderId::new(),
            service_id,
            NaiveDate::from_ymd_opt(2099, 3, 9).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        );
        slot.is_booked = true;
        store.publish_slot(slot.clone()).await.unwrap();

        let err = store
            .claim_segment(
                SegmentRef::new(slot.id, 0),
                ClientId::new(),
                chrono::Duration::minutes(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SegmentUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_stored_segments_round_trip_to_the_formula() {
        let store = store();
        let slot = published_slot(&store).await;

        let listing = store
            .list_availability(
                AvailabilityQuery::Provider(slot.provider_id),
                DateRange::new(slot.date, slot.date),
            )
            .await
            .unwrap();

        let listed = &listing[&slot.date][0].segments;
        let derived = derive_segments(&slot, ServiceDuration::minutes(60)).unwrap();

        assert_eq!(listed.len(), derived.len());
        for (seen, expected) in listed.iter().zip(&derived) {
            assert_eq!(seen.segment_index, expected.segment_index);
            assert_eq!(seen.start_time, expected.start_time);
            assert_eq!(seen.end_time, expected.end_time);
        }
    }

    #[tokio::test]
    async fn test_archive_drops_only_past_slots() {
        let store = store();
        let service_id = ServiceId::new();
        store
            .register_service(service_id, ServiceDuration::minutes(30))
            .await;

        let provider_id = ProviderId::new();
        let old = TimeSlot::new(
            TimeSlotId::new(),
            provider_id,
            service_id,
            NaiveDate::from_ymd_opt(2020, 1, 6).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        );
        let upcoming = TimeSlot::new(
            TimeSlotId::new(),
            provider_id,
            service_id,
            NaiveDate::from_ymd_opt(2099, 1, 6).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        );
        store.publish_slot(old.clone()).await.unwrap();
        store.publish_slot(upcoming.clone()).await.unwrap();

        let archived = store
            .archive_past_slots(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
            .await;
        assert_eq!(archived, 1);

        let listing = store
            .list_availability(
                AvailabilityQuery::Provider(provider_id),
                DateRange::new(
                    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                    NaiveDate::from_ymd_opt(2099, 12, 31).unwrap(),
                ),
            )
            .await
            .unwrap();
        assert_eq!(listing.len(), 1);
        assert!(listing.contains_key(&upcoming.date));
    }
}
