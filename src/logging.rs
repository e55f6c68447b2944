//! Logging setup for the provider binary.
//!
//! All logs are written to **stderr**: stdout carries the handshake line the
//! host reads to find the gRPC address.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `hemmer_provider_vercel=trace`)
//!
//! ```bash
//! # Show every project domain call
//! RUST_LOG=hemmer_provider_vercel=trace ./hemmer-provider-vercel
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// The level used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Initialize logging, defaulting to `info` when `RUST_LOG` is not set.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging() -> bool {
    init_logging_with_default(DEFAULT_LOG_LEVEL)
}

/// Initialize logging with a custom default level.
///
/// Unlike `tracing_subscriber::fmt().init()`, this does not panic when a
/// subscriber is already set, so tests and embedders may call it freely.
pub fn init_logging_with_default(default_level: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process, so
    // initialization itself is not exercised here.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_LEVEL).is_ok());
        assert!(EnvFilter::try_new("hemmer_provider_vercel=trace").is_ok());
        assert!(EnvFilter::try_new("warn,hemmer_provider_vercel=debug").is_ok());
    }
}
