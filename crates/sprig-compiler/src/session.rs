//! Compilation session: resolve, analyze and generate under one
//! configuration.

use std::path::Path;

use tracing::debug;

use crate::analyze::analyze;
use crate::codegen::{GenerateConfig, generate};
use crate::diagnostics::Diagnostic;
use crate::macros::MacroTable;
use crate::resolve::{PackageMetadata, Resolution, ResolveConfig, resolve};
use crate::source_map::SourceMap;
use crate::syntax;
use crate::Result;

#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    pub resolve: ResolveConfig,
    pub generate: GenerateConfig,
}

/// Entry point for compiling Sprig programs.
///
/// Macros registered on the session are visible to every compilation;
/// macros a program defines stay local to that compilation.
#[derive(Clone, Debug, Default)]
pub struct Session {
    config: SessionConfig,
    macros: MacroTable,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            macros: MacroTable::new(),
        }
    }

    pub fn with_macros(mut self, macros: MacroTable) -> Self {
        self.macros = macros;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Discover and combine the packages reachable from `entry`.
    pub fn resolve(&self, entry: &Path) -> Result<Resolution> {
        resolve(entry, &self.config.resolve)
    }

    /// Compile a resolved program. Diagnostics are located through the
    /// resolution's source map.
    pub fn compile(&self, resolution: &Resolution) -> std::result::Result<String, Diagnostic> {
        self.compile_unit(
            &resolution.combined_source,
            &resolution.source_map,
            &resolution.metadata,
        )
    }

    /// Resolve and compile in one step.
    pub fn compile_file(&self, entry: &Path) -> Result<String> {
        let resolution = self.resolve(entry)?;
        Ok(self.compile(&resolution)?)
    }

    /// Compile a standalone unit that imports no local packages. `display`
    /// names it in diagnostics.
    pub fn compile_source(&self, display: &str, source: &str) -> Result<String> {
        let map = SourceMap::single(display, source);
        Ok(self.compile_unit(source, &map, &PackageMetadata::default())?)
    }

    fn compile_unit(
        &self,
        source: &str,
        map: &SourceMap,
        metadata: &PackageMetadata,
    ) -> std::result::Result<String, Diagnostic> {
        let locate = |diagnostic: Diagnostic| diagnostic.locate(map);
        let program = syntax::parse(source).map_err(locate)?;
        let mut macros = self.macros.clone();
        let analysis = analyze(&program, &metadata.types, &mut macros).map_err(locate)?;
        debug!(
            forms = program.forms.len(),
            bindings = analysis.bindings().len(),
            "analyzed unit"
        );
        generate(&program, &analysis, metadata, &macros, &self.config.generate).map_err(locate)
    }
}
