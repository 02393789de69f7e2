mod message;
mod printer;


pub use message::{Category, Diagnostic, DiagnosticKind, Location, Severity};
pub use printer::DiagnosticsPrinter;

use crate::source_map::SourceMap;

/// An ordered collection of diagnostics.
///
/// Analysis is fail-fast per compilation unit, so a collection usually holds
/// one entry; the resolver gathers one per failing package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    messages: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.messages.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.messages.iter().filter(|d| d.is_error()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter()
    }

    pub fn first(&self) -> Option<&Diagnostic> {
        self.messages.first()
    }

    /// Resolve every span against `map`.
    pub fn locate(self, map: &SourceMap) -> Self {
        Self {
            messages: self.messages.into_iter().map(|d| d.locate(map)).collect(),
        }
    }

    pub fn render_text(&self) -> String {
        let rendered: Vec<_> = self.messages.iter().map(Diagnostic::render_text).collect();
        rendered.join("\n")
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.messages.iter().map(Diagnostic::to_json).collect())
    }

    pub fn printer(&self) -> DiagnosticsPrinter<'_, '_> {
        DiagnosticsPrinter::new(self)
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            messages: vec![diagnostic],
        }
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}
