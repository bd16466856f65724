//! Segment derivation: turning an availability window into bookable units.
//!
//! Pure and deterministic. Identical inputs always yield identical output,
//! so segments can be recomputed on demand instead of stored, and any
//! persisted copy can be verified against the formula.

use crate::error::EngineError;
use crate::types::{Segment, SegmentState, ServiceDuration, TimeSlot};
use chrono::NaiveTime;

/// Returns how many whole segments of `duration` fit in the window.
///
/// Any remainder shorter than `duration` at the end of the window is
/// dropped, never offered as a partial segment.
///
/// # Errors
///
/// Returns [`EngineError::InvalidWindow`] if `end <= start` or the
/// duration is zero.
pub fn segment_count(
    start: NaiveTime,
    end: NaiveTime,
    duration: ServiceDuration,
) -> Result<u32, EngineError> {
    if end <= start {
        return Err(EngineError::invalid_window(format!(
            "window end {end} is not after start {start}"
        )));
    }
    if duration.as_minutes() == 0 {
        return Err(EngineError::invalid_window(
            "service duration must be greater than zero",
        ));
    }

    let window_minutes = (end - start).num_minutes();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = (window_minutes / i64::from(duration.as_minutes())) as u32;
    Ok(count)
}

/// Returns the wall-clock window of the segment at `index`.
///
/// The caller is responsible for `index` being within the slot's segment
/// count; this only applies the formula
/// `start = slot_start + index * duration`.
#[must_use]
pub fn segment_window(
    slot_start: NaiveTime,
    index: u32,
    duration: ServiceDuration,
) -> (NaiveTime, NaiveTime) {
    let offset = chrono::Duration::minutes(i64::from(index) * i64::from(duration.as_minutes()));
    let start = slot_start + offset;
    let end = start + duration.to_chrono();
    (start, end)
}

/// Derives the ordered segment list for a slot.
///
/// Segments are contiguous, non-overlapping, each exactly `duration`
/// long, and never extend past the window end. All are returned in the
/// `Free` state; live claim state is overlaid by the availability store.
///
/// # Errors
///
/// Returns [`EngineError::InvalidWindow`] if the window is empty,
/// inverted, or the duration is zero.
pub fn derive_segments(
    slot: &TimeSlot,
    duration: ServiceDuration,
) -> Result<Vec<Segment>, EngineError> {
    let count = segment_count(slot.start_time, slot.end_time, duration)?;

    let segments = (0..count)
        .map(|index| {
            let (start_time, end_time) = segment_window(slot.start_time, index, duration);
            Segment {
                time_slot_id: slot.id,
                segment_index: index,
                start_time,
                end_time,
                state: SegmentState::Free,
            }
        })
        .collect();

    Ok(segments)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ProviderId, ServiceId, TimeSlotId};
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn slot(start: (u32, u32), end: (u32, u32)) -> TimeSlot {
        TimeSlot::new(
            TimeSlotId::new(),
            ProviderId::new(),
            ServiceId::new(),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        )
    }

    #[test]
    fn test_two_hour_window_with_hour_service_yields_two_segments() {
        let slot = slot((9, 0), (11, 0));
        let segments = derive_segments(&slot, ServiceDuration::minutes(60)).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(
            segments[0].start_time,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
        assert_eq!(
            segments[0].end_time,
            NaiveTime::from_hms_opt(10, 0, 0).unwrap()
        );
        assert_eq!(
            segments[1].start_time,
            NaiveTime::from_hms_opt(10, 0, 0).unwrap()
        );
        assert_eq!(
            segments[1].end_time,
            NaiveTime::from_hms_opt(11, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_trailing_remainder_is_dropped() {
        // 9:00-10:30 with a 60-minute service: the 30-minute tail is not offered
        let slot = slot((9, 0), (10, 30));
        let segments = derive_segments(&slot, ServiceDuration::minutes(60)).unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(
            segments[0].end_time,
            NaiveTime::from_hms_opt(10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let slot = slot((11, 0), (9, 0));
        let err = derive_segments(&slot, ServiceDuration::minutes(60)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidWindow { .. }));
    }

    #[test]
    fn test_empty_window_is_rejected() {
        let slot = slot((9, 0), (9, 0));
        let err = derive_segments(&slot, ServiceDuration::minutes(30)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidWindow { .. }));
    }

    #[test]
    fn test_zero_duration_is_rejected() {
        let slot = slot((9, 0), (11, 0));
        let err = derive_segments(&slot, ServiceDuration::minutes(0)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidWindow { .. }));
    }

    proptest! {
        /// Segments are contiguous, non-overlapping, each exactly
        /// `duration` long, and the count matches the floor formula.
        #[test]
        fn test_derived_segments_partition_the_window(
            start_minute in 0u32..=(12 * 60),
            window_minutes in 1u32..=(10 * 60),
            duration_minutes in 1u32..=240,
        ) {
            let start = NaiveTime::from_hms_opt(start_minute / 60, start_minute % 60, 0).unwrap();
            let end = start + chrono::Duration::minutes(i64::from(window_minutes));
            // Keep the window inside one day; wrap-around windows are not valid slots
            prop_assume!(end > start);

            let slot = TimeSlot::new(
                TimeSlotId::new(),
                ProviderId::new(),
                ServiceId::new(),
                NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                start,
                end,
            );
            let duration = ServiceDuration::minutes(duration_minutes);
            let segments = derive_segments(&slot, duration).unwrap();

            prop_assert_eq!(segments.len() as u32, window_minutes / duration_minutes);

            let mut cursor = start;
            for (index, segment) in segments.iter().enumerate() {
                prop_assert_eq!(segment.segment_index as usize, index);
                prop_assert_eq!(segment.start_time, cursor);
                prop_assert_eq!(
                    (segment.end_time - segment.start_time).num_minutes(),
                    i64::from(duration_minutes)
                );
                prop_assert!(segment.end_time <= end);
                cursor = segment.end_time;
            }
        }

        /// Re-deriving yields identical output (restartable, no hidden state).
        #[test]
        fn test_derivation_is_deterministic(
            window_minutes in 1u32..=(8 * 60),
            duration_minutes in 1u32..=180,
        ) {
            let start = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
            let end = start + chrono::Duration::minutes(i64::from(window_minutes));
            prop_assume!(end > start);

            let slot = TimeSlot::new(
                TimeSlotId::new(),
                ProviderId::new(),
                ServiceId::new(),
                NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                start,
                end,
            );
            let duration = ServiceDuration::minutes(duration_minutes);

            let first = derive_segments(&slot, duration).unwrap();
            let second = derive_segments(&slot, duration).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
