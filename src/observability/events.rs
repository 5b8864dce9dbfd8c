//! Observable events for cfbench
//!
//! Events are explicit and typed. Scoped events (`<NAME>_BEGIN`,
//! `<NAME>_COMPLETE`) are emitted through `ObservationScope` using the
//! scope names below.

use std::fmt;

/// Scope name for session open
pub const SCOPE_SESSION_OPEN: &str = "SESSION_OPEN";
/// Scope name for the final session close
pub const SCOPE_SESSION_CLOSE: &str = "SESSION_CLOSE";
/// Scope name for the workload load phase
pub const SCOPE_WORKLOAD_LOAD: &str = "WORKLOAD_LOAD";
/// Scope name for the workload run phase
pub const SCOPE_WORKLOAD_RUN: &str = "WORKLOAD_RUN";

/// Observable events in cfbench
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Benchmark configuration loaded
    ConfigLoaded,
    /// Options file parsed
    OptionsFileLoaded,

    // Session lifecycle
    /// Existing session joined by another client
    SessionJoined,
    /// Client released its reference, session stays open
    SessionReleased,
    /// `close` called with no outstanding `open`
    SessionCloseUnmatched,
    /// Close-time failure while releasing engine resources
    SessionShutdownFailed,

    // Namespace registry
    /// Name manifest loaded at open
    ManifestLoaded,
    /// Name manifest written at close
    ManifestSaved,
    /// Namespace created on first reference
    NamespaceCreated,
    /// Options resolution fell back from an explicit declaration
    OptionsFallback,

    // Facade
    /// Stored record buffer ended mid-tuple
    RecordTruncated,
    /// Engine or codec failure mapped to an ERROR status
    OperationFailed,
    /// Update targeted a key with no existing record
    UpdateMissingKey,

    // Workload
    /// Worker thread started
    WorkerStarted,
    /// Worker thread progress marker
    WorkerProgress,
    /// Worker thread finished
    WorkerFinished,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::OptionsFileLoaded => "OPTIONS_FILE_LOADED",

            Event::SessionJoined => "SESSION_JOINED",
            Event::SessionReleased => "SESSION_RELEASED",
            Event::SessionCloseUnmatched => "SESSION_CLOSE_UNMATCHED",
            Event::SessionShutdownFailed => "SESSION_SHUTDOWN_FAILED",

            Event::ManifestLoaded => "MANIFEST_LOADED",
            Event::ManifestSaved => "MANIFEST_SAVED",
            Event::NamespaceCreated => "NAMESPACE_CREATED",
            Event::OptionsFallback => "OPTIONS_FALLBACK",

            Event::RecordTruncated => "RECORD_TRUNCATED",
            Event::OperationFailed => "OPERATION_FAILED",
            Event::UpdateMissingKey => "UPDATE_MISSING_KEY",

            Event::WorkerStarted => "WORKER_STARTED",
            Event::WorkerProgress => "WORKER_PROGRESS",
            Event::WorkerFinished => "WORKER_FINISHED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_strings_are_screaming_snake_case() {
        let events = [
            Event::ConfigLoaded,
            Event::NamespaceCreated,
            Event::OptionsFallback,
            Event::RecordTruncated,
            Event::WorkerFinished,
        ];
        for event in events {
            let s = event.as_str();
            assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'), "{}", s);
            assert_eq!(event.to_string(), s);
        }
    }
}
