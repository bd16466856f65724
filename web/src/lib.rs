//! # Carebook Web
//!
//! HTTP server exposing the booking engine: availability queries,
//! reserve-and-book, lifecycle transitions, and eligibility checks.
//!
//! The binary in `main.rs` wires the in-memory engine together; the
//! library surface exists so integration tests can build the same router
//! against controlled dependencies.

pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use config::Config;
pub use server::{build_router, AppState};
