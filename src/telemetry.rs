//! Telemetry initialization.
//!
//! Controlled by `CAIRN_LOG`:
//! - unset → no-op (tracing disabled, zero overhead)
//! - `"stderr"` → JSON events to stderr
//! - `"pretty"` → human-readable events to stderr
//!
//! In both enabled modes the level filter comes from `RUST_LOG`, falling
//! back to `info`.

use tracing_subscriber::EnvFilter;

/// Environment variable selecting the telemetry mode.
pub const LOG_ENV: &str = "CAIRN_LOG";

/// Where events go, as selected by [`LOG_ENV`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogMode {
    Off,
    Json,
    Pretty,
}

impl LogMode {
    /// Interpret a `CAIRN_LOG` value. Unrecognized values disable logging.
    #[must_use]
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("stderr" | "json") => Self::Json,
            Some("pretty") => Self::Pretty,
            _ => Self::Off,
        }
    }
}

/// Hold this in `main()` until exit.
///
/// Events are written synchronously, so there is nothing to flush; the
/// guard keeps the call site shaped for exporters that need shutdown.
pub struct TelemetryGuard {
    mode: LogMode,
}

impl TelemetryGuard {
    /// The mode telemetry was initialized with.
    #[must_use]
    pub const fn mode(&self) -> LogMode {
        self.mode
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if self.mode != LogMode::Off {
            tracing::trace!("telemetry shutting down");
        }
    }
}

/// Initialize telemetry based on `CAIRN_LOG`.
#[must_use]
pub fn init() -> TelemetryGuard {
    let value = std::env::var(LOG_ENV).ok();
    let mode = LogMode::from_env_value(value.as_deref());
    match mode {
        LogMode::Off => {}
        LogMode::Json => init_json(),
        LogMode::Pretty => init_pretty(),
    }
    TelemetryGuard { mode }
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// JSON events to stderr via tracing-subscriber's JSON formatter.
fn init_json() {
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    tracing_subscriber::registry()
        .with(filter())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
        )
        .init();
}

fn init_pretty() {
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    tracing_subscriber::registry()
        .with(filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_env_value() {
        assert_eq!(LogMode::from_env_value(None), LogMode::Off);
        assert_eq!(LogMode::from_env_value(Some("")), LogMode::Off);
        assert_eq!(LogMode::from_env_value(Some("stderr")), LogMode::Json);
        assert_eq!(LogMode::from_env_value(Some("pretty")), LogMode::Pretty);
        assert_eq!(LogMode::from_env_value(Some("loud")), LogMode::Off);
    }
}
