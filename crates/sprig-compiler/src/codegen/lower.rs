//! Expression lowering.

use sprig_core::Type;
use sprig_core::utils::{go_ident, go_quote};

use super::emitter::{Emitter, GenResult, is_dynamic, namespace_ident};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::forms::{self, OperatorKind};
use crate::syntax::{Atom, Node, NodeKind};

impl Emitter<'_> {
    /// Lower `node` in expression position.
    pub(super) fn lower(&mut self, node: &Node) -> GenResult<String> {
        match &node.kind {
            NodeKind::Atom(atom) => self.atom(node, atom),
            NodeKind::Array(items) => self.array(node, items),
            NodeKind::List(items) => self.form(node, items),
        }
    }

    fn atom(&mut self, node: &Node, atom: &Atom) -> GenResult<String> {
        let name = match atom {
            Atom::Int(n) => return Ok(n.to_string()),
            Atom::Float(x) => return Ok(format!("{x:?}")),
            Atom::Str(s) => return Ok(go_quote(s)),
            Atom::Symbol(name) => name.as_str(),
        };
        if forms::is_keyword_literal(name) {
            return Ok(name.to_string());
        }
        if forms::is_symbol_literal(name) {
            self.uses_symbol = true;
            return Ok(format!("Symbol({})", go_quote(&name[1..])));
        }
        if let Some((qualifier, member)) = forms::split_qualified(name) {
            return self.qualified(node, qualifier, member);
        }
        Ok(go_ident(name))
    }

    /// `pkg/member`. Members of inlined packages go through the package's
    /// namespace value and must be exported.
    fn qualified(&mut self, node: &Node, qualifier: &str, member: &str) -> GenResult<String> {
        let metadata = self.metadata;
        let package = self
            .qualifiers
            .get(qualifier)
            .and_then(|path| metadata.package_for(path));
        let Some(package) = package else {
            return Ok(format!("{}.{}", go_ident(qualifier), go_ident(member)));
        };

        let exported = metadata
            .exports_of(package)
            .is_some_and(|exports| exports.contains(member));
        if !exported {
            return Err(Diagnostic::new(DiagnosticKind::NotExported, node.span)
                .param("symbol", member)
                .param("package", package));
        }
        Ok(format!("{}.{}", namespace_ident(package), go_ident(member)))
    }

    fn form(&mut self, node: &Node, items: &[Node]) -> GenResult<String> {
        let Some((head, args)) = items.split_first() else {
            return Ok("nil".to_string());
        };
        let Some(name) = head.as_symbol() else {
            return self.apply(node, head, args);
        };

        match name {
            "def" => {
                let body = self.returning(node, &Type::void())?;
                Ok(self.iife(&Type::void(), &body))
            }
            "if" | "do" => {
                if name == "do" && args.is_empty() {
                    return Ok("nil".to_string());
                }
                let ty = self.type_of(node);
                let body = self.returning(node, &ty)?;
                Ok(self.iife(&ty, &body))
            }
            "fn" => self.func(node, args),
            "map" => self.map_literal(node, args),
            "record" | "macro" | "import" | "export" => Ok("nil".to_string()),
            "." => self.field_access(node, args),
            "get" | "slice" | "len" | "append" | "empty?" => self.collection_op(name, args),
            _ => {
                if let Some(kind) = forms::operator_kind(name) {
                    return self.operator(name, kind, args);
                }
                if forms::is_macro_name(name) {
                    let expanded = self.expansion(node, name, args)?;
                    return self.lower(&expanded);
                }
                if self.is_construction(node, name) {
                    return self.construct(name, args);
                }
                self.apply(node, head, args)
            }
        }
    }

    /// Analyzed type of `node`, `Unknown` when none was recorded.
    pub(super) fn type_of(&self, node: &Node) -> Type {
        self.analysis
            .type_of(node.id)
            .cloned()
            .unwrap_or(Type::unknown(0))
    }

    /// `func(p T, ...) R { ... }`
    fn func(&mut self, node: &Node, args: &[Node]) -> GenResult<String> {
        let [params, _, _, body] = args else {
            return Err(Diagnostic::new(DiagnosticKind::MalformedFn, node.span)
                .param("reason", "expected `(fn [p: T ...] -> R body)`"));
        };
        let names: Vec<String> = params
            .as_array()
            .unwrap_or_default()
            .chunks(2)
            .filter_map(|pair| pair[0].as_symbol()?.strip_suffix(':'))
            .map(go_ident)
            .collect();
        let (param_types, ret) = match self.type_of(node) {
            Type::Function { params, ret } => (params, *ret),
            _ => (vec![Type::unknown(0); names.len()], Type::unknown(0)),
        };

        let mut signature = Vec::with_capacity(names.len());
        for (name, ty) in names.iter().zip(&param_types) {
            signature.push(format!("{name} {}", self.go_type(ty)));
        }
        let body = self.returning(body, &ret)?;
        Ok(format!(
            "func({}) {} {{\n{}\n}}",
            signature.join(", "),
            self.go_type(&ret),
            self.indented(&body).join("\n")
        ))
    }

    /// N-ary operators fold left: `(+ a b c)` is `((a + b) + c)`.
    fn operator(&mut self, op: &str, kind: OperatorKind, args: &[Node]) -> GenResult<String> {
        if kind == OperatorKind::Not {
            return match args {
                [arg] => Ok(format!("!{}", self.lower(arg)?)),
                _ => Ok("true".to_string()),
            };
        }
        let Some((first, rest)) = args.split_first().filter(|_| args.len() >= 2) else {
            let default = match (kind, op) {
                (OperatorKind::Arithmetic, _) => "0",
                (OperatorKind::Logical, "and") => "true",
                _ => "false",
            };
            return Ok(default.to_string());
        };

        let go_op = forms::go_operator(op);
        let mut acc = self.lower(first)?;
        for arg in rest {
            acc = format!("({acc} {go_op} {})", self.lower(arg)?);
        }
        Ok(acc)
    }

    /// Call. Numeric literals passed as `any` get an explicit Go type,
    /// concrete arguments are converted to generic parameter types, and a
    /// generic result the call site pins down is converted back.
    fn apply(&mut self, node: &Node, head: &Node, args: &[Node]) -> GenResult<String> {
        let analysis = self.analysis;
        let params = match analysis.type_of(head.id) {
            Some(Type::Function { params, .. }) => params.as_slice(),
            _ => &[],
        };
        let callee = self.lower(head)?;
        let mut lowered = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let arg_text = self.lower(arg)?;
            let param = params.get(i);
            let untyped = param.is_some_and(is_dynamic);
            let arg_text = match &arg.kind {
                NodeKind::Atom(Atom::Int(_)) if untyped => format!("int64({arg_text})"),
                NodeKind::Atom(Atom::Float(_)) if untyped => format!("float64({arg_text})"),
                _ => arg_text,
            };
            lowered.push(match (param, analysis.type_of(arg.id)) {
                (Some(param), Some(arg_ty)) if !is_dynamic(arg_ty) => {
                    self.convert(arg_text, arg_ty, param)
                }
                _ => arg_text,
            });
        }
        let call = format!("{callee}({})", lowered.join(", "));

        if let Some(Type::Function { ret, .. }) = analysis.type_of(head.id)
            && !ret.free_generics().is_empty()
            && let Some(result) = analysis.type_of(node.id)
            && !is_dynamic(result)
            && !result.is_void()
        {
            return Ok(self.convert(call, ret, result));
        }
        Ok(call)
    }

    /// `Name{f: v, ...}`
    fn construct(&mut self, name: &str, args: &[Node]) -> GenResult<String> {
        let analysis = self.analysis;
        let values = match args {
            [values] => values.as_array().unwrap_or_default(),
            _ => &[],
        };
        let fields = match analysis.records().get(name) {
            Some(Type::Record { fields, .. }) => fields.as_slice(),
            _ => &[],
        };

        let mut inits = Vec::with_capacity(values.len());
        for (field, value) in fields.iter().zip(values) {
            inits.push(format!("{}: {}", go_ident(&field.name), self.lower(value)?));
        }
        Ok(format!("{}{{{}}}", go_ident(name), inits.join(", ")))
    }

    /// `value.field`
    fn field_access(&mut self, node: &Node, args: &[Node]) -> GenResult<String> {
        let [value, field] = args else {
            return Err(Diagnostic::new(DiagnosticKind::MalformedFieldAccess, node.span)
                .param("reason", "expected `(. value field)`"));
        };
        let Some(field) = field.as_symbol() else {
            return Err(Diagnostic::new(DiagnosticKind::MalformedFieldAccess, field.span)
                .param("reason", "the field name must be a symbol")
                .offender(field));
        };
        Ok(format!("{}.{}", self.lower(value)?, go_ident(field)))
    }
}
