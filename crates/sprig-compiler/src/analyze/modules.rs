//! `import`, `export`, `macro` and macro invocation.

use indexmap::IndexSet;
use sprig_core::Type;
use tracing::trace;

use super::analyzer::{AnalyzeResult, Analyzer};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::forms;
use crate::macros::{self, MAX_EXPANSION_DEPTH, Macro};
use crate::syntax::Node;

impl Analyzer<'_> {
    /// Top-level `import`. Registers each qualifier for `pkg/name` lookups.
    pub(super) fn import(&mut self, node: &Node) -> AnalyzeResult<()> {
        let args = node.as_list().map_or(&[][..], |items| &items[1..]);
        let specs = forms::import_specs(args).map_err(|reason| {
            Diagnostic::new(DiagnosticKind::MalformedImport, node.span).param("reason", reason)
        })?;
        for spec in specs {
            self.qualifiers
                .insert(spec.qualifier().to_string(), spec.path.clone());
        }
        self.out.types.insert(node.id, Type::void());
        Ok(())
    }

    /// Top-level `export`. Names are checked against top-level definitions
    /// once the whole unit has been seen.
    pub(super) fn export(&mut self, node: &Node) -> AnalyzeResult<()> {
        let args = node.as_list().map_or(&[][..], |items| &items[1..]);
        if args.is_empty() {
            return Err(Diagnostic::new(DiagnosticKind::MalformedExport, node.span)
                .param("reason", "expected at least one name"));
        }
        for arg in args {
            let name = arg
                .as_symbol()
                .filter(|name| forms::split_qualified(name).is_none())
                .ok_or_else(|| {
                    Diagnostic::new(DiagnosticKind::MalformedExport, arg.span)
                        .param("reason", "exported names must be plain symbols")
                        .offender(arg)
                })?;
            self.pending_exports.push((name.to_string(), arg.span));
        }
        self.out.types.insert(node.id, Type::void());
        Ok(())
    }

    /// `(macro name! [params] body)`
    pub(super) fn macro_decl(&mut self, node: &Node, args: &[Node]) -> AnalyzeResult<Type> {
        let malformed = |reason: &str| {
            Diagnostic::new(DiagnosticKind::MalformedMacro, node.span).param("reason", reason)
        };
        let [name_node, params, body] = args else {
            return Err(malformed("expected `(macro name! [params] body)`"));
        };
        let Some(name) = name_node.as_symbol() else {
            return Err(malformed("the macro name must be a symbol"));
        };
        let Some(stem) = name.strip_suffix('!').filter(|stem| !stem.is_empty()) else {
            return Err(malformed("macro names must end in `!`").offender(name_node));
        };
        if forms::is_reserved(stem) {
            return Err(Diagnostic::new(DiagnosticKind::ReservedMacroName, name_node.span)
                .param("name", name));
        }
        let Some(params) = params.as_array() else {
            return Err(malformed("parameters must be a `[...]` vector"));
        };

        let mut names = Vec::new();
        let mut rest = None;
        let mut seen = IndexSet::new();
        let mut iter = params.iter();
        while let Some(param) = iter.next() {
            let Some(param_name) = param.as_symbol() else {
                return Err(malformed("parameters must be symbols").offender(param));
            };
            let is_rest = param_name == "&";
            let param_name = if is_rest {
                let Some(rest_name) = iter.next().and_then(Node::as_symbol) else {
                    return Err(malformed("`&` must be followed by a parameter name"));
                };
                if iter.next().is_some() {
                    return Err(malformed("the `&` parameter must be last"));
                }
                rest_name
            } else {
                param_name
            };
            if !seen.insert(param_name) {
                return Err(malformed("parameter names must be distinct").offender(param_name));
            }
            if is_rest {
                rest = Some(param_name.to_string());
            } else {
                names.push(param_name.to_string());
            }
        }

        let mac = Macro {
            name: name.to_string(),
            params: names,
            rest,
            body: body.clone(),
        };
        self.macros.register(name, mac).map_err(|_| {
            Diagnostic::new(DiagnosticKind::DuplicateMacro, name_node.span).param("name", name)
        })?;
        trace!(name, "macro registered");
        Ok(Type::void())
    }

    /// `(name! args ...)`: expand through the registry, then analyze the
    /// expansion in place of the invocation.
    pub(super) fn invoke_macro(
        &mut self,
        node: &Node,
        name: &str,
        args: &[Node],
    ) -> AnalyzeResult<Type> {
        if self.expansion_depth >= MAX_EXPANSION_DEPTH {
            return Err(Diagnostic::new(DiagnosticKind::MacroRecursionLimit, node.span)
                .param("name", name)
                .param("limit", MAX_EXPANSION_DEPTH));
        }
        let Some(mac) = self.macros.get_macro(name) else {
            return Err(Diagnostic::new(DiagnosticKind::UnresolvedMacro, node.span)
                .param("name", name));
        };
        let expanded = macros::expand(mac, args, node.span, &mut self.ids)
            .map_err(|e| e.to_diagnostic(node.span))?;

        self.expansion_depth += 1;
        let result = self.infer(&expanded);
        self.expansion_depth -= 1;
        let ty = result?;
        self.out.expansions.insert(node.id, expanded);
        Ok(ty)
    }
}
