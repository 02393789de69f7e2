//! Go code generation.
//!
//! Lowers an analyzed program into a single Go source file: a `package`
//! clause, the import block, record type declarations, and `func main()`
//! holding the lowered top level.

mod collections;
mod config;
mod convert;
mod emitter;
mod fold;
mod lower;

#[cfg(test)]
mod codegen_tests;

pub use config::GenerateConfig;

use tracing::debug;

use crate::analyze::Analysis;
use crate::diagnostics::Diagnostic;
use crate::macros::MacroRegistry;
use crate::resolve::PackageMetadata;
use crate::syntax::Program;

use emitter::Emitter;

/// Lower `program` to Go.
///
/// `analysis` must come from analyzing this same program. `metadata` names
/// the inlined local packages; pass `PackageMetadata::default()` for a unit
/// that was not produced by the resolver.
pub fn generate(
    program: &Program,
    analysis: &Analysis,
    metadata: &PackageMetadata,
    macros: &dyn MacroRegistry,
    config: &GenerateConfig,
) -> Result<String, Diagnostic> {
    let output = Emitter::new(analysis, metadata, macros, config).emit(program)?;
    debug!(bytes = output.len(), "generated Go source");
    Ok(output)
}
