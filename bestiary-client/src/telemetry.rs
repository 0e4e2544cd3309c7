//! Logging setup for the `bestiary` binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ClientError, ClientResult};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "bestiary=info,warn";

/// Install a stderr fmt subscriber filtered by `RUST_LOG`.
///
/// stdout stays reserved for command output.
pub fn init_tracing() -> ClientResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| ClientError::Telemetry(e.to_string()))?;

    tracing::debug!(filter = DEFAULT_FILTER, "Tracing initialized");
    Ok(())
}
