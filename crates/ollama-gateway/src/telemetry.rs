// ollama-gateway/src/telemetry.rs

use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global fmt subscriber. `RUST_LOG` selects the filter, `info` otherwise.
///
/// Fails when a global subscriber is already installed, e.g. by a host binary or an
/// earlier call.
pub fn init_tracing() -> Result<(), SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
