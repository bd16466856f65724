//! Server and engine configuration.
//!
//! Everything comes from environment variables with defaults suitable
//! for local development; log filtering is handled separately through
//! `RUST_LOG`.

use carebook_core::lifecycle::ConfirmationPolicy;
use carebook_core::service::EngineConfig;
use std::env;
use std::time::Duration;

/// Full configuration for the booking server
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind settings
    pub server: ServerConfig,
    /// Engine tuning
    pub engine: EngineSettings,
}

/// HTTP bind settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind (`HOST`, default 0.0.0.0)
    pub host: String,
    /// Port to bind (`PORT`, default 8080)
    pub port: u16,
}

/// Engine tuning loaded from the environment
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Segment hold TTL in seconds (`HOLD_DURATION_SECS`, default 300)
    pub hold_duration_secs: u64,
    /// Hold sweeper interval in seconds (`SWEEP_INTERVAL_SECS`, default 60)
    pub sweep_interval_secs: u64,
    /// Confirmation policy (`CONFIRMATION_POLICY`: "payment-gates" or
    /// "provider-override", default payment-gates)
    pub confirmation_policy: ConfirmationPolicy,
}

impl Config {
    /// Reads the configuration from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8080),
            },
            engine: EngineSettings {
                hold_duration_secs: env::var("HOLD_DURATION_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
                sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
                confirmation_policy: match env::var("CONFIRMATION_POLICY").as_deref() {
                    Ok("provider-override") => ConfirmationPolicy::ProviderOverride,
                    _ => ConfirmationPolicy::PaymentGates,
                },
            },
        }
    }
}

impl EngineSettings {
    /// Converts the settings into the engine's config type
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            hold_duration: chrono::Duration::seconds(self.hold_duration_secs as i64),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            confirmation_policy: self.confirmation_policy,
        }
    }
}
