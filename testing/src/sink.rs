//! Event sink that records everything it receives.

use carebook_core::events::{BookingEvent, EventSink};
use std::sync::Mutex;

/// Collects published domain events for assertions
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<BookingEvent>>,
}

impl RecordingEventSink {
    /// Creates an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in order
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a previous test panic).
    #[allow(clippy::unwrap_used)]
    pub fn events(&self) -> Vec<BookingEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingEventSink {
    #[allow(clippy::unwrap_used)]
    fn publish(&self, event: BookingEvent) {
        self.events.lock().unwrap().push(event);
    }
}
