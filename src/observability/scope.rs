//! ObservationScope for automatic begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` on `complete`
//! - Logs `{name}_FAILED` on `fail`
//! - Logs `{name}_INCOMPLETE` if dropped without either

use std::cell::Cell;
use std::time::Instant;

use super::logger::{Logger, Severity};

/// A scope that automatically logs begin and complete events
///
/// ```ignore
/// let scope = ObservationScope::with_fields("SESSION_OPEN", &[("dir", "/tmp/db")]);
/// // ... do work ...
/// scope.complete();
/// ```
///
/// Every closing line repeats the scope fields and adds `elapsed_ms`.
pub struct ObservationScope<'a> {
    name: &'a str,
    completed: Cell<bool>,
    fields: Vec<(&'a str, String)>,
    started: Instant,
}

impl<'a> ObservationScope<'a> {
    /// Create a new observation scope
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Create a new observation scope with fields repeated on every line
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        let event = format!("{}_BEGIN", name);
        Logger::info(&event, fields);

        Self {
            name,
            completed: Cell::new(false),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            started: Instant::now(),
        }
    }

    /// Mark the scope as successfully completed
    pub fn complete(self) {
        self.finish(Outcome::Complete, &[]);
    }

    /// Mark the scope as successfully completed with additional fields
    pub fn complete_with_fields(self, extra_fields: &[(&str, &str)]) {
        self.finish(Outcome::Complete, extra_fields);
    }

    /// Mark the scope as failed with a reason
    pub fn fail(self, reason: &str) {
        self.finish(Outcome::Failed, &[("reason", reason)]);
    }

    /// Check if the scope has been completed
    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }

    fn finish(&self, outcome: Outcome, extra_fields: &[(&str, &str)]) {
        self.completed.set(true);
        let elapsed = self.started.elapsed().as_millis().to_string();

        let mut fields: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        fields.extend_from_slice(extra_fields);
        fields.push(("elapsed_ms", &elapsed));

        Logger::log(outcome.severity(), &outcome.event_name(self.name), &fields);
    }
}

/// How a scope ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Complete,
    Failed,
    Incomplete,
}

impl Outcome {
    fn severity(self) -> Severity {
        match self {
            Outcome::Complete => Severity::Info,
            Outcome::Failed => Severity::Error,
            Outcome::Incomplete => Severity::Warn,
        }
    }

    fn event_name(self, scope: &str) -> String {
        let suffix = match self {
            Outcome::Complete => "COMPLETE",
            Outcome::Failed => "FAILED",
            Outcome::Incomplete => "INCOMPLETE",
        };
        format!("{}_{}", scope, suffix)
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed.get() {
            self.finish(
                Outcome::Incomplete,
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}
