//! Observability subsystem for cfbench
//!
//! - Structured logging (JSON, one line per event)
//! - Per-session operation counters
//! - Begin/complete scopes around lifecycle phases
//!
//! ```ignore
//! use cfbench::observability::{log_event_with_fields, Event, Severity};
//!
//! log_event_with_fields(Severity::Warn, Event::OptionsFallback, &[("namespace", "t3")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::{
    Event, SCOPE_SESSION_CLOSE, SCOPE_SESSION_OPEN, SCOPE_WORKLOAD_LOAD, SCOPE_WORKLOAD_RUN,
};
pub use logger::{Logger, Severity, LOG_LEVEL_ENV};
pub use metrics::{MetricsSnapshot, OperationMetrics};
pub use scope::ObservationScope;

/// Log a typed event
pub fn log_event(severity: Severity, event: Event) {
    Logger::log(severity, event.as_str(), &[]);
}

/// Log a typed event with fields
pub fn log_event_with_fields(severity: Severity, event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity, event.as_str(), fields);
}
