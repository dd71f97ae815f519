//! Observability channel for irregularities that are absorbed instead of raised.
//!
//! Duplicate registrations, container-kind mismatches and the optional-field
//! escape hatch never fail a call. They are reported here so a caller can see
//! them: through `tracing` by default, into a buffer with [`CollectingSink`],
//! or to any `Fn(&Diagnostic)` callback.

use std::fmt;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A different fragment was already registered under this name; the first one won.
    DuplicateComponent { name: String },
    /// A container-typed field held a value of another kind and was left unchecked.
    ContainerKindMismatch { field: String, expected: String, actual: &'static str },
    TupleArityMismatch { field: String, expected: usize, actual: usize },
    /// Two map keys coerced to the same key; the later entry replaced the earlier one.
    MapKeyCollision { field: String, key: String },
    /// Top-level optional field skipped by the validator.
    UncheckedField { field: String, declared: String },
    /// Input key with no matching declaration; dropped.
    UnknownField { record: String, field: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DuplicateComponent { name } => {
                write!(f, "schema component `{name}` already registered with a different fragment; keeping the first")
            }
            Diagnostic::ContainerKindMismatch { field, expected, actual } => {
                write!(f, "{field}: '{actual}' left unchecked against container '{expected}'")
            }
            Diagnostic::TupleArityMismatch { field, expected, actual } => {
                write!(f, "{field}: tuple of {actual} item(s) left unchecked, declared arity {expected}")
            }
            Diagnostic::MapKeyCollision { field, key } => {
                write!(f, "{field}: map key `{key}` given more than once after coercion; keeping the last")
            }
            Diagnostic::UncheckedField { field, declared } => {
                write!(f, "{field}: '{declared}' not coerced (optional field)")
            }
            Diagnostic::UnknownField { record, field } => {
                write!(f, "{record}: undeclared field `{field}` dropped")
            }
        }
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Default sink: duplicates at `warn`, everything else at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::DuplicateComponent { name } => {
                tracing::warn!(component = %name, "{diagnostic}");
            }
            _ => tracing::debug!("{diagnostic}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct CollectingSink {
    seen: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.seen.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).push(diagnostic);
    }
}

impl<F> DiagnosticSink for F
where
    F: Fn(&Diagnostic) + Send + Sync,
{
    fn report(&self, diagnostic: Diagnostic) {
        self(&diagnostic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        sink.report(Diagnostic::DuplicateComponent { name: "A".into() });
        sink.report(Diagnostic::UnknownField { record: "A".into(), field: "x".into() });
        let seen = sink.take();
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0], Diagnostic::DuplicateComponent { .. }));
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn closures_are_sinks() {
        let count = AtomicUsize::new(0);
        let sink = |_: &Diagnostic| {
            count.fetch_add(1, Ordering::SeqCst);
        };
        sink.report(Diagnostic::DuplicateComponent { name: "A".into() });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn display_mentions_field() {
        let d = Diagnostic::ContainerKindMismatch {
            field: "tags".into(),
            expected: "list[string]".into(),
            actual: "string",
        };
        assert_eq!(d.to_string(), "tags: 'string' left unchecked against container 'list[string]'");
    }
}
