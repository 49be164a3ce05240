//! Structured logging integration for events
//!
//! Engine events are forwarded to `tracing` at the level the event itself
//! reports, with its metadata as structured fields.

use roller_events::{AppEvent, RolloutEvent};
use tracing::{debug, error, info, warn, Level};

/// Log an `AppEvent` using the tracing infrastructure
pub fn log_event_with_tracing(event: &AppEvent) {
    let meta = event.meta();
    let source = meta.source.as_str();
    let correlation = meta.correlation_id.as_deref().unwrap_or("-");
    let fields = event.log_fields();
    let kind = event.log_target();

    // Denials carry their failure context; keep it readable in plain logs.
    if let AppEvent::Rollout(RolloutEvent::UpdateDenied { failure, .. }) = event {
        debug!(
            source,
            event_id = %meta.event_id,
            correlation,
            code = ?failure.code,
            retryable = failure.retryable,
            "update denied: {}",
            failure.message
        );
        return;
    }

    let event_id = meta.event_id;
    match meta.tracing_level() {
        Level::ERROR => error!(source, kind, %event_id, correlation, %fields, "event"),
        Level::WARN => warn!(source, kind, %event_id, correlation, %fields, "event"),
        Level::INFO => info!(source, kind, %event_id, correlation, %fields, "event"),
        _ => debug!(source, kind, %event_id, correlation, %fields, "event"),
    }
}

/// Initialize tracing. JSON output mode keeps stdout clean for results, so
/// logs always go to stderr.
pub fn init_tracing(json_logs: bool, debug_enabled: bool, default_level: &str) {
    let default_filter = if debug_enabled {
        "debug".to_string()
    } else {
        format!("warn,rollerctl={default_level}")
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }
}
