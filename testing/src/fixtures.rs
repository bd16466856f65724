//! Fixture builders for slots and booking drafts.

use carebook_core::types::{
    Address, BookingDraft, ClientId, Money, ProviderId, ServiceDuration, ServiceId, TimeSlot,
    TimeSlotId,
};
use chrono::{DateTime, Duration, NaiveTime, Utc};

/// A complete, deliverable address
#[must_use]
pub fn address() -> Address {
    Address {
        line1: "12 Maple St".to_string(),
        line2: None,
        city: "Springfield".to_string(),
        region: "IL".to_string(),
        postal_code: "62704".to_string(),
    }
}

/// A 09:00-11:00 slot on the day after `now`, so every segment is
/// future-dated relative to the test clock
#[must_use]
pub fn future_slot(
    provider_id: ProviderId,
    service_id: ServiceId,
    now: DateTime<Utc>,
) -> TimeSlot {
    let date = (now + Duration::days(1)).date_naive();
    TimeSlot::new(
        TimeSlotId::new(),
        provider_id,
        service_id,
        date,
        NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
        NaiveTime::from_hms_opt(11, 0, 0).unwrap_or_default(),
    )
}

/// A valid draft matching the given slot's provider and service
#[must_use]
pub fn draft_for(slot: &TimeSlot, client_id: ClientId, duration: ServiceDuration) -> BookingDraft {
    BookingDraft {
        service_id: slot.service_id,
        provider_id: slot.provider_id,
        client_id,
        duration,
        address: address(),
        special_instructions: Some("ring the side doorbell".to_string()),
        total_price: Money::from_dollars(80),
    }
}
