//! Test utilities: run snippets through the pipeline stages.

use crate::analyze::{Analysis, analyze};
use crate::codegen::{GenerateConfig, generate};
use crate::diagnostics::Diagnostic;
use crate::macros::MacroTable;
use crate::resolve::PackageMetadata;
use crate::source_map::SourceMap;
use crate::syntax::{Program, parse};

/// Display path used when locating diagnostics of a snippet.
pub const SNIPPET: &str = "test.sprig";

pub fn parse_ok(source: &str) -> Program {
    match parse(source) {
        Ok(program) => program,
        Err(e) => panic!("expected `{source}` to parse, got: {}", e.render_text()),
    }
}

pub fn analyze_ok(source: &str) -> (Program, Analysis) {
    let program = parse_ok(source);
    let mut macros = MacroTable::new();
    match analyze(&program, &PackageMetadata::default().types, &mut macros) {
        Ok(analysis) => (program, analysis),
        Err(e) => panic!("expected `{source}` to analyze, got: {}", e.render_text()),
    }
}

/// The diagnostic analysis stops at, located in [`SNIPPET`].
pub fn analyze_err(source: &str) -> Diagnostic {
    let program = parse_ok(source);
    let mut macros = MacroTable::new();
    match analyze(&program, &PackageMetadata::default().types, &mut macros) {
        Ok(_) => panic!("expected `{source}` to be rejected"),
        Err(e) => e.locate(&SourceMap::single(SNIPPET, source)),
    }
}

/// Generate with four-space indentation so snapshots stay readable.
pub fn go_with(source: &str, metadata: &PackageMetadata) -> Result<String, Diagnostic> {
    let program = parse_ok(source);
    let mut macros = MacroTable::new();
    let analysis = match analyze(&program, &metadata.types, &mut macros) {
        Ok(analysis) => analysis,
        Err(e) => panic!("expected `{source}` to analyze, got: {}", e.render_text()),
    };
    let config = GenerateConfig::new().indent("    ");
    generate(&program, &analysis, metadata, &macros, &config)
}

pub fn go(source: &str) -> String {
    match go_with(source, &PackageMetadata::default()) {
        Ok(go) => go,
        Err(e) => panic!("expected `{source}` to generate, got: {}", e.render_text()),
    }
}

/// Body of `func main()`, dedented one level.
pub fn go_main(source: &str) -> String {
    let go = go(source);
    let Some((_, body)) = go.split_once("func main() {\n") else {
        panic!("no `func main` in:\n{go}");
    };
    body.trim_end()
        .strip_suffix('}')
        .unwrap_or(body)
        .lines()
        .map(|line| line.strip_prefix("    ").unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
}
