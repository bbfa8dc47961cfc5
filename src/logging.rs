//! Tracing subscriber setup for the binaries.

use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor an explicit filter is given.
pub const DEFAULT_FILTER: &str = "warn,iot_alarm_gateway=info";

/// Install the global fmt subscriber.
///
/// `filter` takes precedence over `RUST_LOG`. Calling this twice is harmless;
/// the second call leaves the first subscriber in place.
pub fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_logging(Some("debug"));
        init_logging(None);
        tracing::info!("still logging");
    }
}
