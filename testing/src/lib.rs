//! # Carebook Testing
//!
//! Test utilities for the engine: a controllable clock so hold expiry can
//! be driven without sleeping, a scripted payment gateway for failure
//! paths, an event sink that records what it saw, and fixture builders
//! for slots and drafts.

pub mod clock;
pub mod fixtures;
pub mod gateway;
pub mod sink;

pub use clock::MockClock;
pub use fixtures::{address, draft_for, future_slot};
pub use gateway::ScriptedPaymentGateway;
pub use sink::RecordingEventSink;
