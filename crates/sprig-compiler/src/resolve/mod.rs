//! Package resolution.
//!
//! Starting from an entry file, discover the local packages it imports
//! (directories under the module root holding source files), order them so
//! dependencies come first, reject circular imports, and combine everything
//! into one compilation unit. Exported names of each package get a type
//! scheme from analyzing the package on its own.

mod graph;
mod scan;


use std::ops::Range;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use sprig_core::TypeScheme;
use tracing::debug;

use crate::analyze::{PackageTypes, analyze};
use crate::diagnostics::{Diagnostic, Diagnostics, Location};
use crate::macros::MacroTable;
use crate::source_map::{SourceMap, line_col};
use crate::syntax;
use crate::{Error, Result};

pub use graph::{PackageGraph, PackageId, PackageNode};
pub use scan::SourceFile;

#[derive(Debug, Clone)]
pub struct ResolveConfig {
    /// Source file extension, without the dot.
    pub extension: String,
    /// File marking the module root.
    pub module_marker: String,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            extension: "sprig".to_string(),
            module_marker: "go.mod".to_string(),
        }
    }
}

/// What later stages need to know about the inlined packages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PackageMetadata {
    pub types: PackageTypes,
    /// Import paths served by inlined packages; never emitted as Go imports.
    pub ignore_imports: IndexSet<String>,
    /// Package key → exported names.
    pub exports: IndexMap<String, IndexSet<String>>,
    /// Package key → byte range of its files in the combined source.
    pub ranges: IndexMap<String, Range<usize>>,
}

impl PackageMetadata {
    /// Package key for an import path, if it names a local package.
    pub fn package_for(&self, import_path: &str) -> Option<&str> {
        self.types.package_for(import_path)
    }

    pub fn exports_of(&self, package: &str) -> Option<&IndexSet<String>> {
        self.exports.get(package)
    }

    pub fn scheme(&self, package: &str, name: &str) -> Option<&TypeScheme> {
        self.types.scheme(package, name)
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub module_root: PathBuf,
    /// Display path of the entry file.
    pub entry: String,
    pub combined_source: String,
    pub source_map: SourceMap,
    /// Package keys, dependencies first. The entry is not included.
    pub compile_order: Vec<String>,
    pub metadata: PackageMetadata,
}

/// Resolve the program rooted at `entry`.
pub fn resolve(entry: &Path, config: &ResolveConfig) -> Result<Resolution> {
    Resolver::new(entry, config)?.run()
}

struct Resolver<'c> {
    config: &'c ResolveConfig,
    root: PathBuf,
    module_path: Option<String>,
    entry: PathBuf,
    /// Import path as written → package key, for every local import seen.
    paths: IndexMap<String, String>,
}

impl<'c> Resolver<'c> {
    fn new(entry: &Path, config: &'c ResolveConfig) -> Result<Self> {
        let entry = std::path::absolute(entry).map_err(|e| Error::io(entry, e))?;
        let start = entry.parent().unwrap_or(Path::new("/"));
        let root = scan::find_module_root(start, &config.module_marker)?;
        debug!(
            root = %root.dir.display(),
            module = ?root.module_path,
            "module root"
        );
        Ok(Self {
            config,
            root: root.dir,
            module_path: root.module_path,
            entry,
            paths: IndexMap::new(),
        })
    }

    fn run(mut self) -> Result<Resolution> {
        let entry_display = scan::display_path(&self.root, &self.entry);
        let entry_file = scan::read_source(&self.entry, entry_display.clone())?;
        let entry_dir = self.entry.parent().map(Path::to_path_buf).unwrap_or_default();
        let entry_node = self.package_node(entry_display.clone(), entry_dir, vec![entry_file])?;

        let mut graph = PackageGraph::new(entry_node);
        let order = graph.traverse(|key| self.load_package(key))?;
        let compile_order: Vec<String> = order.iter().map(|&id| graph.node(id).key.clone()).collect();
        debug!(order = ?compile_order, "compile order");

        let mut combined_source = String::new();
        let mut source_map = SourceMap::new();
        let mut metadata = PackageMetadata::default();
        for &id in &order {
            let node = graph.node(id);
            let start = combined_source.len();
            for file in &node.files {
                source_map.append(&mut combined_source, &file.display, &file.content);
            }
            metadata
                .ranges
                .insert(node.key.clone(), start..combined_source.len());
            metadata.exports.insert(node.key.clone(), node.exports.clone());
        }
        for file in &graph.node(PackageId::ENTRY).files {
            source_map.append(&mut combined_source, &file.display, &file.content);
        }

        metadata.ignore_imports = self.paths.keys().cloned().collect();
        metadata.types.paths = self.paths;

        let mut failures = Diagnostics::new();
        for &id in &order {
            let node = graph.node(id);
            if node.exports.is_empty() {
                continue;
            }
            match package_schemes(node, &metadata.types) {
                Ok(schemes) => {
                    debug!(package = %node.key, schemes = schemes.len(), "extracted type schemes");
                    metadata.types.schemes.insert(node.key.clone(), schemes);
                }
                Err(diagnostic) => failures.push(diagnostic),
            }
        }
        if !failures.is_empty() {
            return Err(failures.into());
        }

        Ok(Resolution {
            module_root: self.root,
            entry: entry_display,
            combined_source,
            source_map,
            compile_order,
            metadata,
        })
    }

    fn load_package(&mut self, key: &str) -> Result<PackageNode> {
        let dir = self.root.join(key);
        let mut files = Vec::new();
        for path in scan::source_files(&dir, &self.config.extension)? {
            if path == self.entry {
                continue;
            }
            let display = scan::display_path(&self.root, &path);
            files.push(scan::read_source(&path, display)?);
        }
        debug!(package = key, files = files.len(), "scanned package");
        self.package_node(key.to_string(), dir, files)
    }

    fn package_node(
        &mut self,
        key: String,
        dir: PathBuf,
        files: Vec<SourceFile>,
    ) -> Result<PackageNode> {
        let mut imports = IndexMap::new();
        let mut exports = IndexSet::new();
        for file in &files {
            for spec in &file.imports {
                let Some(target) = self.local_package(&spec.path)? else {
                    continue;
                };
                imports.entry(target).or_insert_with(|| {
                    let (line, col) = line_col(&file.content, spec.span.start().into());
                    Location {
                        file: file.display.clone(),
                        line,
                        col,
                    }
                });
            }
            exports.extend(file.exports.iter().cloned());
        }
        Ok(PackageNode {
            key,
            dir,
            files,
            imports,
            exports,
        })
    }

    /// Package key for `import_path` when it names a directory under the
    /// root that directly holds source files.
    fn local_package(&mut self, import_path: &str) -> Result<Option<String>> {
        if let Some(key) = self.paths.get(import_path) {
            return Ok(Some(key.clone()));
        }
        let relative = match &self.module_path {
            Some(module) => import_path
                .strip_prefix(module.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(import_path),
            None => import_path,
        };
        if relative.starts_with('/') {
            return Ok(None);
        }
        let segments: Vec<&str> = relative
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        if segments.is_empty() || segments.contains(&"..") {
            return Ok(None);
        }

        let key = segments.join("/");
        let dir = self.root.join(&key);
        if !dir.is_dir() || scan::source_files(&dir, &self.config.extension)?.is_empty() {
            return Ok(None);
        }
        self.paths.insert(import_path.to_string(), key.clone());
        Ok(Some(key))
    }
}

/// Analyze one package's files as their own unit and extract schemes for
/// its exported names.
fn package_schemes(
    node: &PackageNode,
    types: &PackageTypes,
) -> std::result::Result<IndexMap<String, TypeScheme>, Diagnostic> {
    let mut unit = String::new();
    let mut map = SourceMap::new();
    for file in &node.files {
        map.append(&mut unit, &file.display, &file.content);
    }
    let analysis = syntax::parse(&unit)
        .and_then(|program| analyze(&program, types, &mut MacroTable::new()))
        .map_err(|diagnostic| diagnostic.locate(&map))?;

    Ok(node
        .exports
        .iter()
        .filter_map(|name| Some((name.clone(), analysis.scheme(name)?)))
        .collect())
}
