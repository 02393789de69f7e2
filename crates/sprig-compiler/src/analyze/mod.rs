//! Semantic analysis: type inference and checking over one compilation unit.
//!
//! - [`scope`]: the scoped symbol table
//! - `analyzer`: form dispatch, definitions, functions, calls
//! - `annotations`: type annotation syntax
//! - `collections`: array/map literals and collection primitives
//! - `records`: record declaration, construction and field access
//! - `modules`: `import`, `export` and `macro` forms
//!
//! Analysis is fail-fast: the first diagnostic aborts the unit.

mod analyzer;
mod annotations;
mod collections;
mod modules;
mod records;
pub mod scope;

#[cfg(test)]
mod analyzer_tests;

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use sprig_core::{Type, TypeScheme};

use crate::diagnostics::Diagnostic;
use crate::macros::MacroRegistry;
use crate::syntax::{Node, NodeId, Program};

pub use scope::{Binding, BindingKind, ScopeError, Scopes};

/// Exported type schemes of local packages, as seen by a compilation unit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PackageTypes {
    /// Import path as written → package key.
    pub paths: IndexMap<String, String>,
    /// Package key → exported name → scheme.
    pub schemes: IndexMap<String, IndexMap<String, TypeScheme>>,
}

impl PackageTypes {
    pub fn package_for(&self, import_path: &str) -> Option<&str> {
        self.paths.get(import_path).map(String::as_str)
    }

    pub fn scheme(&self, package: &str, name: &str) -> Option<&TypeScheme> {
        self.schemes.get(package)?.get(name)
    }
}

/// Everything the analyzer learned about a unit.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub(crate) bindings: IndexMap<String, Type>,
    pub(crate) records: IndexMap<String, Type>,
    pub(crate) exports: IndexSet<String>,
    pub(crate) types: HashMap<NodeId, Type>,
    pub(crate) def_types: HashMap<NodeId, Type>,
    pub(crate) expansions: HashMap<NodeId, Node>,
    pub(crate) top_level_defs: usize,
    pub(crate) next_id: u32,
}

impl Analysis {
    /// Top-level value bindings in definition order.
    pub fn bindings(&self) -> &IndexMap<String, Type> {
        &self.bindings
    }

    pub fn records(&self) -> &IndexMap<String, Type> {
        &self.records
    }

    pub fn exports(&self) -> &IndexSet<String> {
        &self.exports
    }

    pub fn type_of(&self, id: NodeId) -> Option<&Type> {
        self.types.get(&id)
    }

    /// Type bound by the `def` form with this id.
    pub fn def_type(&self, id: NodeId) -> Option<&Type> {
        self.def_types.get(&id)
    }

    /// Expansion recorded for the macro invocation with this id.
    pub fn expansion(&self, id: NodeId) -> Option<&Node> {
        self.expansions.get(&id)
    }

    pub fn top_level_defs(&self) -> usize {
        self.top_level_defs
    }

    /// First node id not used by the program or any recorded expansion.
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Scheme of a top-level value or record.
    pub fn scheme(&self, name: &str) -> Option<TypeScheme> {
        self.bindings
            .get(name)
            .or_else(|| self.records.get(name))
            .map(TypeScheme::generalize)
    }
}

/// Analyze one compilation unit.
pub fn analyze(
    program: &Program,
    packages: &PackageTypes,
    macros: &mut dyn MacroRegistry,
) -> Result<Analysis, Diagnostic> {
    let mut analyzer = analyzer::Analyzer::new(program.next_id, packages, macros);
    for form in &program.forms {
        analyzer.top_level(form)?;
    }
    analyzer.finish()
}
