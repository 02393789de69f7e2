//! Sprig compiler: analysis, package resolution and Go generation.
//!
//! This crate provides the compilation pipeline for Sprig programs:
//! - `syntax` - reader producing the program tree
//! - `analyze` - scoped symbol table, type inference and checking
//! - `resolve` - package discovery, cycle detection, compile order
//! - `codegen` - lowering to Go source
//! - `macros` - macro table and expansion
//! - `diagnostics` - error reporting
//! - `session` - configuration and the macro table threaded through stages

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod analyze;
pub mod codegen;
pub mod diagnostics;
pub mod forms;
pub mod macros;
pub mod resolve;
pub mod session;
pub mod source_map;
pub mod syntax;

#[cfg(test)]
pub mod test_utils;

use std::path::PathBuf;

pub use analyze::{Analysis, PackageTypes, analyze};
pub use codegen::{GenerateConfig, generate};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, DiagnosticsPrinter, Severity};
pub use macros::{MacroRegistry, MacroTable};
pub use resolve::{PackageMetadata, Resolution, ResolveConfig, resolve};
pub use session::{Session, SessionConfig};
pub use source_map::SourceMap;

/// Errors that can occur while compiling a program.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("compilation failed with {} errors", .0.error_count())]
    Diagnostics(Diagnostics),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Diagnostics carried by this error, if any.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::Diagnostics(diagnostics) => Some(diagnostics),
            Self::Io { .. } => None,
        }
    }
}

impl From<Diagnostic> for Error {
    fn from(diagnostic: Diagnostic) -> Self {
        Self::Diagnostics(Diagnostics::from(diagnostic))
    }
}

impl From<Diagnostics> for Error {
    fn from(diagnostics: Diagnostics) -> Self {
        Self::Diagnostics(diagnostics)
    }
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, Error>;
