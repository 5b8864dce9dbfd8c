//! Options resolution for namespaces created on first use
//!
//! First match wins:
//! 1. the options file declares the namespace: its options, verbatim
//! 2. the options file declares `default`: a deep copy of default's options
//! 3. `ColumnFamilyOptions::baseline()`
//!
//! With an options file in effect, levels 2 and 3 log a WARN. Without one
//! the baseline is the normal path and is logged at INFO.

use std::fmt;

use serde::Serialize;

use crate::engine::{ColumnFamilyOptions, OptionsFile, DEFAULT_COLUMN_FAMILY};
use crate::observability::{log_event_with_fields, Event, Severity};

/// Which resolution level produced the options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionsOrigin {
    Declared,
    CopiedFromDefault,
    Baseline,
}

impl OptionsOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionsOrigin::Declared => "declared",
            OptionsOrigin::CopiedFromDefault => "copied_from_default",
            OptionsOrigin::Baseline => "baseline",
        }
    }
}

impl fmt::Display for OptionsOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub options: ColumnFamilyOptions,
    pub origin: OptionsOrigin,
    /// Severity `OPTIONS_FALLBACK` was logged at; `None` for declared options
    pub fallback: Option<Severity>,
}

#[derive(Debug, Clone, Default)]
pub struct OptionsResolver {
    file: Option<OptionsFile>,
}

impl OptionsResolver {
    pub fn new(file: Option<OptionsFile>) -> Self {
        Self { file }
    }

    pub fn options_file(&self) -> Option<&OptionsFile> {
        self.file.as_ref()
    }

    /// Options for a namespace about to be created
    pub fn resolve(&self, name: &str) -> ResolvedOptions {
        self.resolve_with(name, log_event_with_fields)
    }

    /// Like `resolve`, handing the fallback event to `log` instead of the
    /// process logger
    pub(crate) fn resolve_with<F>(&self, name: &str, log: F) -> ResolvedOptions
    where
        F: FnOnce(Severity, Event, &[(&str, &str)]),
    {
        let mut resolved = self.lookup(name);

        if resolved.origin != OptionsOrigin::Declared {
            let severity = if self.file.is_some() {
                Severity::Warn
            } else {
                Severity::Info
            };
            log(
                severity,
                Event::OptionsFallback,
                &[("namespace", name), ("origin", resolved.origin.as_str())],
            );
            resolved.fallback = Some(severity);
        }

        resolved
    }

    fn lookup(&self, name: &str) -> ResolvedOptions {
        let file = match &self.file {
            Some(file) => file,
            None => return Self::baseline(),
        };

        if let Some(declared) = file.column_family(name) {
            return ResolvedOptions {
                options: declared.options.clone(),
                origin: OptionsOrigin::Declared,
                fallback: None,
            };
        }

        if let Some(default) = file.column_family(DEFAULT_COLUMN_FAMILY) {
            return ResolvedOptions {
                options: default.options.clone(),
                origin: OptionsOrigin::CopiedFromDefault,
                fallback: None,
            };
        }

        Self::baseline()
    }

    fn baseline() -> ResolvedOptions {
        ResolvedOptions {
            options: ColumnFamilyOptions::baseline(),
            origin: OptionsOrigin::Baseline,
            fallback: None,
        }
    }
}
