use std::fs;
use std::path::PathBuf;

use sprig_compiler::{Diagnostics, Session, SourceMap};
use tracing::info;

use crate::cli::Cli;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Compiler(#[from] sprig_compiler::Error),

    /// Failure inside the combined unit; the map locates the snippets.
    #[error("compilation failed")]
    Unit {
        diagnostics: Diagnostics,
        source_map: SourceMap,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn run(cli: &Cli) -> Result<(), CompileError> {
    let go = compile(cli)?;
    match &cli.output {
        Some(path) => {
            fs::write(path, &go).map_err(|source| CompileError::Write {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), bytes = go.len(), "wrote Go source");
        }
        None => print!("{go}"),
    }
    Ok(())
}

pub fn compile(cli: &Cli) -> Result<String, CompileError> {
    let session = Session::new(cli.session_config());
    let resolution = session.resolve(&cli.input)?;
    info!(
        entry = %resolution.entry,
        packages = resolution.compile_order.len(),
        "resolved"
    );
    session
        .compile(&resolution)
        .map_err(|diagnostic| CompileError::Unit {
            diagnostics: diagnostic.into(),
            source_map: resolution.source_map.clone(),
        })
}

/// Text written to stderr for a failed run.
pub fn report(err: &CompileError, colored: bool) -> String {
    let rendered = match err {
        CompileError::Unit {
            diagnostics,
            source_map,
        } => diagnostics
            .printer()
            .source_map(source_map)
            .colored(colored)
            .render(),
        CompileError::Compiler(err) => match err.diagnostics() {
            Some(diagnostics) => diagnostics.printer().colored(colored).render(),
            None => format!("error: {err}"),
        },
        CompileError::Write { .. } => format!("error: {err}"),
    };
    format!("{rendered}\n")
}
