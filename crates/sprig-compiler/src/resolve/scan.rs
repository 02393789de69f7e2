//! Filesystem access for the resolver: module root discovery, package
//! directory listings and the top-level forms of each file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::forms::{self, ImportSpec};
use crate::source_map::SourceMap;
use crate::syntax;
use crate::{Error, Result};

/// One source file, read and scanned for `import` and `export` forms.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Root-relative path with `/` separators.
    pub display: String,
    pub content: String,
    pub imports: Vec<ImportSpec>,
    pub exports: Vec<String>,
}

pub(super) struct ModuleRoot {
    pub dir: PathBuf,
    /// Path declared by `module X` in the marker file.
    pub module_path: Option<String>,
}

/// Walk upward from `start` to the first directory holding `marker`.
/// Without one, `start` itself is the root.
pub(super) fn find_module_root(start: &Path, marker: &str) -> Result<ModuleRoot> {
    for dir in start.ancestors() {
        let candidate = dir.join(marker);
        if candidate.is_file() {
            let text = fs::read_to_string(&candidate).map_err(|e| Error::io(&candidate, e))?;
            return Ok(ModuleRoot {
                dir: dir.to_path_buf(),
                module_path: module_directive(&text),
            });
        }
    }
    Ok(ModuleRoot {
        dir: start.to_path_buf(),
        module_path: None,
    })
}

fn module_directive(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = rest.split("//").next()?.trim().trim_matches('"');
        (!path.is_empty()).then(|| path.to_string())
    })
}

/// Source files directly inside `dir`, sorted by path.
pub(super) fn source_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub(super) fn read_source(path: &Path, display: String) -> Result<SourceFile> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let locate = |diagnostic: Diagnostic| diagnostic.locate(&SourceMap::single(&display, &content));

    let program = syntax::parse(&content).map_err(locate)?;
    let mut imports = Vec::new();
    let mut exports = Vec::new();
    for form in &program.forms {
        let args = form.as_list().map_or(&[][..], |items| &items[1..]);
        match form.head_symbol() {
            Some("import") => {
                let specs = forms::import_specs(args).map_err(|reason| {
                    locate(
                        Diagnostic::new(DiagnosticKind::MalformedImport, form.span)
                            .param("reason", reason),
                    )
                })?;
                imports.extend(specs);
            }
            Some("export") => {
                exports.extend(args.iter().filter_map(|a| a.as_symbol()).map(str::to_string));
            }
            _ => {}
        }
    }

    Ok(SourceFile {
        display,
        content,
        imports,
        exports,
    })
}

/// `path` relative to `root`, joined with `/`.
pub(super) fn display_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    parts.join("/")
}
