//! Core emitter struct, file layout and statement lowering.

use indexmap::IndexMap;
use sprig_core::utils::{go_ident, go_quote};
use sprig_core::{PrimitiveKind, Type};
use tracing::trace;

use super::GenerateConfig;
use super::fold;
use crate::analyze::Analysis;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::forms;
use crate::macros::{self, MacroRegistry};
use crate::resolve::PackageMetadata;
use crate::syntax::{Node, NodeIdGen, Program};

pub(super) type GenResult<T> = Result<T, Diagnostic>;

/// Go emitter for one analyzed compilation unit.
pub(super) struct Emitter<'a> {
    pub(super) analysis: &'a Analysis,
    pub(super) metadata: &'a PackageMetadata,
    pub(super) macros: &'a dyn MacroRegistry,
    pub(super) config: &'a GenerateConfig,

    /// Import qualifier -> import path
    pub(super) qualifiers: IndexMap<String, String>,
    /// Go import path -> alias
    imports: IndexMap<String, Option<String>>,
    /// Set once `Symbol` appears in a value or a type
    pub(super) uses_symbol: bool,
    /// Ids for expansions the analyzer did not record
    pub(super) ids: NodeIdGen,
}

impl<'a> Emitter<'a> {
    pub fn new(
        analysis: &'a Analysis,
        metadata: &'a PackageMetadata,
        macros: &'a dyn MacroRegistry,
        config: &'a GenerateConfig,
    ) -> Self {
        Self {
            analysis,
            metadata,
            macros,
            config,
            qualifiers: IndexMap::new(),
            imports: IndexMap::new(),
            uses_symbol: false,
            ids: NodeIdGen::starting_at(analysis.next_id()),
        }
    }

    pub fn emit(mut self, program: &Program) -> GenResult<String> {
        self.collect_imports(program)?;
        let body = self.main_body(program)?;

        let analysis = self.analysis;
        let mut records = Vec::new();
        for record in analysis.records().values() {
            if let Type::Record { name, fields } = record {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{} {}", go_ident(&f.name), self.go_type(&f.ty)))
                    .collect();
                records.push((go_ident(name), fields));
            }
        }

        let mut out = format!("package {}\n", self.config.package_name);
        if !self.imports.is_empty() {
            out.push_str("\nimport (\n");
            for (path, alias) in &self.imports {
                let spec = match alias {
                    Some(alias) => format!("{} {}", go_ident(alias), go_quote(path)),
                    None => go_quote(path),
                };
                out.push_str(&format!("{}{spec}\n", self.config.indent));
            }
            out.push_str(")\n");
        }
        if self.uses_symbol {
            out.push_str("\ntype Symbol string\n");
        }
        for (name, fields) in &records {
            out.push_str(&format!("\ntype {name} struct {{\n"));
            for line in self.indented(fields) {
                out.push_str(&line);
                out.push('\n');
            }
            out.push_str("}\n");
        }
        out.push_str("\nfunc main() {\n");
        for line in self.indented(&body) {
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("}\n");
        Ok(out)
    }

    /// Record qualifiers for `pkg/name` lookups and the Go import block.
    /// Paths served by inlined packages are not imported.
    fn collect_imports(&mut self, program: &Program) -> GenResult<()> {
        for form in &program.forms {
            if !form.is_form("import") {
                continue;
            }
            let args = form.as_list().map_or(&[][..], |items| &items[1..]);
            let specs = forms::import_specs(args).map_err(|reason| {
                Diagnostic::new(DiagnosticKind::MalformedImport, form.span).param("reason", reason)
            })?;
            for spec in specs {
                self.qualifiers
                    .insert(spec.qualifier().to_string(), spec.path.clone());
                if self.metadata.ignore_imports.contains(&spec.path) {
                    continue;
                }
                self.imports.entry(spec.path).or_insert(spec.alias);
            }
        }
        trace!(imports = self.imports.len(), "collected imports");
        Ok(())
    }

    /// Top-level statements, with each local package's namespace value
    /// placed right after that package's inlined definitions.
    fn main_body(&mut self, program: &Program) -> GenResult<Vec<String>> {
        let metadata = self.metadata;
        let mut namespaces = metadata
            .ranges
            .iter()
            .filter(|(key, _)| metadata.exports_of(key).is_some_and(|e| !e.is_empty()))
            .peekable();

        let mut lines = Vec::new();
        for form in &program.forms {
            let start = usize::from(form.span.start());
            while let Some((key, _)) = namespaces.next_if(|(_, range)| range.end <= start) {
                lines.extend(self.namespace(key));
            }
            lines.extend(self.top_level(form)?);
        }
        for (key, _) in namespaces {
            lines.extend(self.namespace(key));
        }
        Ok(lines)
    }

    fn top_level(&mut self, form: &Node) -> GenResult<Vec<String>> {
        match form.head_symbol() {
            Some("import" | "export") => Ok(Vec::new()),
            Some("def") => {
                let mut lines = self.def(form)?;
                // A lone definition would be an unused variable in Go.
                if self.analysis.top_level_defs() == 1
                    && let Some(name) = def_name(form)
                {
                    lines.push(format!("_ = {}", go_ident(name)));
                }
                Ok(lines)
            }
            _ => self.stmt(form),
        }
    }

    /// `lib := struct { f T }{f: f}` so `lib.f` resolves.
    fn namespace(&mut self, package: &str) -> Vec<String> {
        let metadata = self.metadata;
        let analysis = self.analysis;
        let Some(exports) = metadata.exports_of(package) else {
            return Vec::new();
        };
        let fields: Vec<(String, String)> = exports
            .iter()
            .filter_map(|name| {
                let ty = analysis.bindings().get(name)?;
                Some((go_ident(name), self.go_type(ty)))
            })
            .collect();
        if fields.is_empty() {
            return Vec::new();
        }

        let ns = namespace_ident(package);
        let decls: Vec<String> = fields.iter().map(|(n, t)| format!("{n} {t}")).collect();
        let inits: Vec<String> = fields.iter().map(|(n, _)| format!("{n}: {n}")).collect();
        vec![
            format!(
                "{ns} := struct {{\n{}\n}}{{{}}}",
                self.indented(&decls).join("\n"),
                inits.join(", ")
            ),
            format!("_ = {ns}"),
        ]
    }

    /// Lower `node` in statement position.
    pub(super) fn stmt(&mut self, node: &Node) -> GenResult<Vec<String>> {
        let Some(items) = node.as_list() else {
            return self.expr_stmt(node);
        };
        match node.head_symbol() {
            Some("def") => self.def(node),
            Some("if") => self.if_stmt(node),
            Some("do") => {
                let mut inner = Vec::new();
                for expr in &items[1..] {
                    inner.extend(self.stmt(expr)?);
                }
                if inner.is_empty() {
                    return Ok(inner);
                }
                let mut lines = vec!["{".to_string()];
                lines.extend(self.indented(&inner));
                lines.push("}".to_string());
                Ok(lines)
            }
            Some("record" | "macro" | "import" | "export") => Ok(Vec::new()),
            Some(name) if forms::is_macro_name(name) => {
                let expanded = self.expansion(node, name, &items[1..])?;
                self.stmt(&expanded)
            }
            _ => self.expr_stmt(node),
        }
    }

    fn expr_stmt(&mut self, node: &Node) -> GenResult<Vec<String>> {
        if node.as_symbol() == Some("nil") {
            return Ok(Vec::new());
        }
        let expr = self.lower(node)?;
        if self.is_call(node) {
            Ok(vec![expr])
        } else {
            Ok(vec![format!("_ = {expr}")])
        }
    }

    /// Function application, which Go accepts as a statement.
    fn is_call(&self, node: &Node) -> bool {
        let Some((head, _)) = node.as_list().and_then(<[Node]>::split_first) else {
            return false;
        };
        let Some(name) = head.as_symbol() else {
            return true;
        };
        !(forms::is_reserved(name)
            || forms::is_macro_name(name)
            || self.is_construction(node, name))
    }

    pub(super) fn is_construction(&self, node: &Node, name: &str) -> bool {
        self.analysis.records().contains_key(name)
            && self
                .analysis
                .type_of(node.id)
                .is_none_or(|ty| matches!(ty, Type::Record { name: n, .. } if n == name))
    }

    /// `var x T = v` for static types, `x := v` otherwise. Function values
    /// are declared first so their body can refer to them.
    pub(super) fn def(&mut self, node: &Node) -> GenResult<Vec<String>> {
        let args = node.as_list().map_or(&[][..], |items| &items[1..]);
        let (Some(name), Some(value)) = (def_name(node), args.last()) else {
            return Err(Diagnostic::new(DiagnosticKind::MalformedDef, node.span)
                .param("reason", "expected `(def name value)` or `(def name: Type value)`"));
        };
        let name = go_ident(name);
        let analysis = self.analysis;
        let ty = analysis.def_type(node.id);

        if value.is_form("fn") {
            let go_ty = ty.map_or_else(|| "any".to_string(), |ty| self.go_type(ty));
            let func = self.lower(value)?;
            return Ok(vec![format!("var {name} {go_ty}"), format!("{name} = {func}")]);
        }

        let expr = self.lower(value)?;
        match ty {
            Some(ty) if !is_dynamic(ty) => {
                Ok(vec![format!("var {name} {} = {expr}", self.go_type(ty))])
            }
            _ => Ok(vec![format!("{name} := {expr}")]),
        }
    }

    fn if_stmt(&mut self, node: &Node) -> GenResult<Vec<String>> {
        let (cond, then, otherwise) = if_parts(node)?;
        let cond = self.condition(cond)?;
        let then = self.branch(then)?;

        let mut lines = vec![format!("if {cond} {{")];
        lines.extend(self.indented(&then));
        if let Some(otherwise) = otherwise {
            let otherwise = self.branch(otherwise)?;
            lines.push("} else {".to_string());
            lines.extend(self.indented(&otherwise));
        }
        lines.push("}".to_string());
        Ok(lines)
    }

    /// Statements of an `if` branch. A `do` branch is already a Go block.
    fn branch(&mut self, node: &Node) -> GenResult<Vec<String>> {
        if !node.is_form("do") {
            return self.stmt(node);
        }
        let mut lines = Vec::new();
        for expr in &node.as_list().unwrap_or_default()[1..] {
            lines.extend(self.stmt(expr)?);
        }
        Ok(lines)
    }

    /// Statements ending in `return`: the body of a function or of an
    /// immediately invoked block yielding `ty`.
    pub(super) fn returning(&mut self, node: &Node, ty: &Type) -> GenResult<Vec<String>> {
        if ty.is_void() {
            let mut lines = self.stmt(node)?;
            lines.push("return nil".to_string());
            return Ok(lines);
        }
        let items = node.as_list().unwrap_or_default();
        match node.head_symbol() {
            Some("do") => {
                let Some((last, init)) = items[1..].split_last() else {
                    return Ok(vec!["return nil".to_string()]);
                };
                let mut lines = Vec::new();
                for expr in init {
                    lines.extend(self.stmt(expr)?);
                }
                lines.extend(self.returning(last, ty)?);
                Ok(lines)
            }
            Some("if") => {
                let (cond, then, otherwise) = if_parts(node)?;
                let cond = self.condition(cond)?;
                let then = self.returning(then, ty)?;
                let mut lines = vec![format!("if {cond} {{")];
                lines.extend(self.indented(&then));
                match otherwise {
                    Some(otherwise) => {
                        let otherwise = self.returning(otherwise, ty)?;
                        lines.push("} else {".to_string());
                        lines.extend(self.indented(&otherwise));
                        lines.push("}".to_string());
                    }
                    None => {
                        lines.push("}".to_string());
                        lines.push(format!("return {}", self.zero_value(ty)));
                    }
                }
                Ok(lines)
            }
            Some(name) if forms::is_macro_name(name) => {
                let expanded = self.expansion(node, name, &items[1..])?;
                self.returning(&expanded, ty)
            }
            _ => Ok(vec![format!("return {}", self.lower(node)?)]),
        }
    }

    /// `func() T { ... }()`
    pub(super) fn iife(&mut self, ty: &Type, body: &[String]) -> String {
        format!(
            "func() {} {{\n{}\n}}()",
            self.go_type(ty),
            self.indented(body).join("\n")
        )
    }

    /// Condition text, folded to a literal when the tree decides it.
    pub(super) fn condition(&mut self, cond: &Node) -> GenResult<String> {
        match fold::fold_bool(cond) {
            Some(value) => Ok(value.to_string()),
            None => self.lower(cond),
        }
    }

    /// The expansion the analyzer recorded for this invocation, or a fresh
    /// one from the registry.
    pub(super) fn expansion(&mut self, node: &Node, name: &str, args: &[Node]) -> GenResult<Node> {
        if let Some(expanded) = self.analysis.expansion(node.id) {
            return Ok(expanded.clone());
        }
        let macros = self.macros;
        let Some(mac) = macros.get_macro(name) else {
            return Err(Diagnostic::new(DiagnosticKind::UnresolvedMacro, node.span)
                .param("name", name));
        };
        trace!(name, "expanding macro without a recorded expansion");
        macros::expand(mac, args, node.span, &mut self.ids).map_err(|e| e.to_diagnostic(node.span))
    }

    /// Go spelling of `ty`, noting uses of `Symbol`.
    pub(super) fn go_type(&mut self, ty: &Type) -> String {
        if mentions_symbol(ty) {
            self.uses_symbol = true;
        }
        ty.to_go()
    }

    /// Zero value returned when a bounds check fails.
    pub(super) fn zero_value(&self, ty: &Type) -> String {
        match ty {
            Type::Primitive { kind } => match kind {
                PrimitiveKind::Int | PrimitiveKind::Float => "0".to_string(),
                PrimitiveKind::String | PrimitiveKind::Symbol => "\"\"".to_string(),
                PrimitiveKind::Bool => "false".to_string(),
                PrimitiveKind::Void => "nil".to_string(),
            },
            Type::Record { name, .. } => format!("{}{{}}", go_ident(name)),
            _ => "nil".to_string(),
        }
    }

    /// Indent every line one level. Multi-line entries are split first.
    pub(super) fn indented(&self, lines: &[String]) -> Vec<String> {
        lines
            .iter()
            .flat_map(|line| line.lines())
            .map(|line| format!("{}{line}", self.config.indent))
            .collect()
    }
}

/// Name bound by a `def` form, without the annotation colon.
fn def_name(node: &Node) -> Option<&str> {
    let label = node.as_list()?.get(1)?.as_symbol()?;
    Some(label.strip_suffix(':').unwrap_or(label))
}

pub(super) fn if_parts(node: &Node) -> GenResult<(&Node, &Node, Option<&Node>)> {
    match node.as_list().unwrap_or_default() {
        [_, cond, then] => Ok((cond, then, None)),
        [_, cond, then, otherwise] => Ok((cond, then, Some(otherwise))),
        _ => Err(Diagnostic::new(DiagnosticKind::MalformedIf, node.span)
            .param("reason", "expected `(if cond then else?)`")),
    }
}

/// Types Go cannot spell precisely are bound with `:=`.
pub(super) fn is_dynamic(ty: &Type) -> bool {
    ty.contains_unknown() || !ty.free_generics().is_empty()
}

fn mentions_symbol(ty: &Type) -> bool {
    match ty {
        Type::Primitive { kind } => *kind == PrimitiveKind::Symbol,
        Type::List { element } => mentions_symbol(element),
        Type::Map { key, value } => mentions_symbol(key) || mentions_symbol(value),
        Type::Function { params, ret } => params.iter().any(mentions_symbol) || mentions_symbol(ret),
        Type::Record { fields, .. } => fields.iter().any(|f| mentions_symbol(&f.ty)),
        Type::Generic { .. } | Type::Unknown { .. } => false,
    }
}

/// Go name of the namespace value for a local package: its whole key with
/// path separators as underscores, so `a/util` and `b/util` stay distinct.
pub(super) fn namespace_ident(package: &str) -> String {
    let flat: String = package
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    go_ident(&flat)
}
