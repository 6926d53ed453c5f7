use std::fmt;
use std::sync::Mutex;

use serde::Serialize;

use crate::events::{EventWriter, SessionEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSource {
    Models,
    Presets,
    Enhance,
    Session,
}

impl DiagnosticSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticSource::Models => "models",
            DiagnosticSource::Presets => "presets",
            DiagnosticSource::Enhance => "enhance",
            DiagnosticSource::Session => "session",
        }
    }
}

/// A user-visible message describing a recovered failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub source: DiagnosticSource,
    pub message: String,
}

impl Diagnostic {
    pub fn new(source: DiagnosticSource, message: impl Into<String>) -> Self {
        Self {
            source,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub trait DiagnosticSink {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Prints diagnostics to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl DiagnosticSink for ConsoleSink {
    fn report(&self, diagnostic: &Diagnostic) {
        eprintln!("{}", diagnostic.message);
    }
}

/// Keeps every reported diagnostic in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.is_empty())
            .unwrap_or(true)
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: &Diagnostic) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(diagnostic.clone());
        }
    }
}

impl DiagnosticSink for EventWriter {
    fn report(&self, diagnostic: &Diagnostic) {
        if let Err(err) = self.emit(&SessionEvent::from(diagnostic)) {
            eprintln!("failed to record diagnostic event: {err:#}");
        }
    }
}

impl<T: DiagnosticSink> DiagnosticSink for Option<T> {
    fn report(&self, diagnostic: &Diagnostic) {
        if let Some(sink) = self {
            sink.report(diagnostic);
        }
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &T {
    fn report(&self, diagnostic: &Diagnostic) {
        (**self).report(diagnostic);
    }
}

/// Forwards each diagnostic to two sinks, first then second.
#[derive(Debug, Clone, Copy)]
pub struct Fanout<A, B>(pub A, pub B);

impl<A: DiagnosticSink, B: DiagnosticSink> DiagnosticSink for Fanout<A, B> {
    fn report(&self, diagnostic: &Diagnostic) {
        self.0.report(diagnostic);
        self.1.report(diagnostic);
    }
}
