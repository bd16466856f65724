//! Application state for the booking HTTP server.

use carebook_core::availability::AvailabilityStore;
use carebook_core::service::BookingService;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via Arc) for each request.
#[derive(Clone)]
pub struct AppState {
    /// The booking engine façade
    pub service: Arc<BookingService>,
    /// Direct store access for the provider-side endpoints
    /// (service registration, slot publication)
    pub availability: Arc<dyn AvailabilityStore>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(service: Arc<BookingService>, availability: Arc<dyn AvailabilityStore>) -> Self {
        Self {
            service,
            availability,
        }
    }
}
