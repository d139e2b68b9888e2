//! Subscriber setup for the `tracing` events emitted by this crate

use crate::error::{ForecastError, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_directive` (e.g. `"sales_forecast=info"`).
/// Fails if a global subscriber is already set or the directive does not parse.
pub fn init_logging(default_directive: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|err| ForecastError::Config(format!("Invalid log filter: {}", err)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|err| ForecastError::Config(format!("Logging already initialised: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // Either this call or an earlier test's installs the subscriber
        let _ = init_logging("sales_forecast=debug");
        assert!(matches!(
            init_logging("sales_forecast=debug"),
            Err(ForecastError::Config(_))
        ));
    }
}
