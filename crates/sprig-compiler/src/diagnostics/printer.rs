//! Builder-pattern printer for rendering diagnostics with source snippets.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};

use super::{Diagnostic, Diagnostics, Severity};
use crate::source_map::SourceMap;

pub struct DiagnosticsPrinter<'d, 'm> {
    diagnostics: &'d Diagnostics,
    source_map: Option<&'m SourceMap>,
    colored: bool,
}

impl<'d, 'm> DiagnosticsPrinter<'d, 'm> {
    pub fn new(diagnostics: &'d Diagnostics) -> Self {
        Self {
            diagnostics,
            source_map: None,
            colored: false,
        }
    }

    pub fn source_map(mut self, map: &'m SourceMap) -> Self {
        self.source_map = Some(map);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        for (i, diag) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                w.write_char('\n')?;
            }
            match self.snippet_report(diag, &renderer) {
                Some(report) => write!(w, "{report}")?,
                None => write!(w, "{}", diag.render_text())?,
            }
        }
        Ok(())
    }

    fn snippet_report(&self, diag: &Diagnostic, renderer: &Renderer) -> Option<String> {
        let map = self.source_map?;
        let span = diag.span()?;
        let segment = map.segment(span.start().into())?;
        let range = widen_empty(segment.local_range(span), segment.content.len());

        let title = format!("[{}]: {}", diag.code(), diag.message());
        let label = match (diag.get_param("expected"), diag.get_param("got")) {
            (Some(expected), Some(got)) => format!("expected `{expected}`, found `{got}`"),
            _ => diag.get_param("offender").unwrap_or_default().to_string(),
        };

        let snippet = Snippet::source(segment.content)
            .line_start(1)
            .path(segment.path)
            .annotation(AnnotationKind::Primary.span(range.clone()).label(label.as_str()));

        let level = severity_to_level(diag.severity());
        let mut report: Vec<Group> = vec![level.primary_title(title.as_str()).element(snippet)];

        if let Some(hint) = diag.hint() {
            report.push(
                Level::HELP.secondary_title(hint).element(
                    Snippet::source(segment.content)
                        .line_start(1)
                        .path(segment.path)
                        .annotation(AnnotationKind::Context.span(range)),
                ),
            );
        }

        Some(renderer.render(&report).to_string())
    }
}

fn severity_to_level(severity: Severity) -> Level<'static> {
    match severity {
        Severity::Error => Level::ERROR,
        Severity::Warning => Level::WARNING,
    }
}

fn widen_empty(range: std::ops::Range<usize>, limit: usize) -> std::ops::Range<usize> {
    if range.start == range.end {
        return range.start..(range.start + 1).min(limit);
    }
    range
}
