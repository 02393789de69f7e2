use indexmap::IndexMap;
use rowan::TextRange;
use sprig_core::{Bindings, Type};
use tracing::trace;

use super::scope::{Binding, BindingKind, ScopeError, Scopes};
use super::{Analysis, PackageTypes};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::forms::{self, OperatorKind};
use crate::macros::MacroRegistry;
use crate::syntax::{Atom, Node, NodeIdGen, NodeKind};

pub(super) type AnalyzeResult<T> = Result<T, Diagnostic>;

pub(crate) struct Analyzer<'a> {
    pub(super) scopes: Scopes,
    pub(super) macros: &'a mut dyn MacroRegistry,
    pub(super) packages: &'a PackageTypes,
    /// Import qualifier → import path, filled as `import` forms are seen.
    pub(super) qualifiers: IndexMap<String, String>,
    pub(super) ids: NodeIdGen,
    pub(super) expansion_depth: usize,
    pub(super) pending_exports: Vec<(String, TextRange)>,
    next_unknown: u32,
    pub(super) out: Analysis,
}

/// Parameter or field list entry: `name: Type`.
pub(super) struct TypedName {
    pub name: String,
    pub ty: Type,
    pub span: TextRange,
}

#[derive(Clone, Copy)]
pub(super) enum TypedListContext {
    Parameters,
    Fields,
}

impl<'a> Analyzer<'a> {
    pub(crate) fn new(
        next_id: u32,
        packages: &'a PackageTypes,
        macros: &'a mut dyn MacroRegistry,
    ) -> Self {
        Self {
            scopes: Scopes::new(),
            macros,
            packages,
            qualifiers: IndexMap::new(),
            ids: NodeIdGen::starting_at(next_id),
            expansion_depth: 0,
            pending_exports: Vec::new(),
            next_unknown: 0,
            out: Analysis::default(),
        }
    }

    pub(crate) fn top_level(&mut self, form: &Node) -> AnalyzeResult<()> {
        match form.head_symbol() {
            Some("import") => self.import(form),
            Some("export") => self.export(form),
            _ => self.infer(form).map(drop),
        }
    }

    pub(crate) fn finish(mut self) -> AnalyzeResult<Analysis> {
        for (name, span) in std::mem::take(&mut self.pending_exports) {
            if !self.scopes.globals().contains_key(&name) {
                return Err(Diagnostic::new(DiagnosticKind::UndefinedSymbol, span)
                    .param("name", &name)
                    .suggestion("exported names must be defined at the top level"));
            }
            self.out.exports.insert(name);
        }
        self.out.next_id = self.ids.peek();
        trace!(
            bindings = self.out.bindings.len(),
            exports = self.out.exports.len(),
            "analysis finished"
        );
        Ok(self.out)
    }

    pub(super) fn fresh_unknown(&mut self) -> Type {
        let id = self.next_unknown;
        self.next_unknown += 1;
        Type::unknown(id)
    }

    /// Infer the type of `node` and record it under the node's id.
    pub(super) fn infer(&mut self, node: &Node) -> AnalyzeResult<Type> {
        let ty = match &node.kind {
            NodeKind::Atom(atom) => self.atom(node, atom)?,
            NodeKind::Array(items) => self.array(items)?,
            NodeKind::List(items) => self.form(node, items)?,
        };
        self.out.types.insert(node.id, ty.clone());
        Ok(ty)
    }

    /// Run `f` inside a fresh scope.
    pub(super) fn scoped<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> AnalyzeResult<T>,
    ) -> AnalyzeResult<T> {
        self.scopes.enter_scope();
        let result = f(self);
        self.scopes.exit_scope();
        result
    }

    pub(super) fn define(&mut self, name: &str, binding: Binding) -> AnalyzeResult<()> {
        let span = binding.span;
        self.scopes.define(name, binding).map_err(|e| match e {
            ScopeError::Duplicate { name, .. } => {
                Diagnostic::new(DiagnosticKind::DuplicateSymbol, span).param("name", name)
            }
            ScopeError::Undefined(name) => {
                Diagnostic::new(DiagnosticKind::UndefinedSymbol, span).param("name", name)
            }
        })
    }

    fn atom(&mut self, node: &Node, atom: &Atom) -> AnalyzeResult<Type> {
        let name = match atom {
            Atom::Int(_) => return Ok(Type::int()),
            Atom::Float(_) => return Ok(Type::float()),
            Atom::Str(_) => return Ok(Type::string()),
            Atom::Symbol(name) => name.as_str(),
        };

        match name {
            "true" | "false" => return Ok(Type::bool()),
            "nil" => return Ok(Type::void()),
            _ => {}
        }
        if forms::is_symbol_literal(name) {
            return Ok(Type::symbol());
        }
        if let Some((qualifier, member)) = forms::split_qualified(name) {
            return self.qualified(node, qualifier, member);
        }

        let binding = self.scopes.lookup(name).map_err(|_| {
            Diagnostic::new(DiagnosticKind::UndefinedSymbol, node.span).param("name", name)
        })?;
        if binding.kind == BindingKind::Record {
            return Err(
                Diagnostic::new(DiagnosticKind::MalformedConstruction, node.span)
                    .param("record", name)
                    .param("reason", "a record name is not a value")
                    .suggestion(format!("construct it with `({name} [values ...])`")),
            );
        }
        Ok(binding.ty.clone())
    }

    /// `pkg/member`: typed from the package's exported schemes when `pkg` is
    /// a local package, `Unknown` otherwise. Visibility is checked by the
    /// generator.
    fn qualified(&mut self, node: &Node, qualifier: &str, member: &str) -> AnalyzeResult<Type> {
        let Some(path) = self.qualifiers.get(qualifier) else {
            return Err(Diagnostic::new(DiagnosticKind::UndefinedSymbol, node.span)
                .param("name", qualifier)
                .suggestion(format!(
                    "import the package before referring to `{qualifier}/{member}`"
                )));
        };
        let packages = self.packages;
        let known = packages
            .package_for(path)
            .and_then(|package| packages.scheme(package, member))
            .map(|scheme| scheme.ty.clone());
        match known {
            Some(ty) => Ok(ty),
            None => Ok(self.fresh_unknown()),
        }
    }

    fn form(&mut self, node: &Node, items: &[Node]) -> AnalyzeResult<Type> {
        let Some((head, args)) = items.split_first() else {
            return Err(Diagnostic::new(DiagnosticKind::EmptyForm, node.span));
        };
        let Some(name) = head.as_symbol() else {
            return self.apply(head, args);
        };

        match name {
            "def" => self.def(node, args),
            "if" => self.if_form(node, args),
            "fn" => self.fn_form(node, args),
            "do" => self.do_form(args),
            "map" => self.map_literal(node, args),
            "record" => self.record_decl(node, args),
            "." => self.field_access(node, args),
            "get" | "slice" | "len" | "append" | "empty?" => {
                self.collection_op(node, name, args)
            }
            "macro" => self.macro_decl(node, args),
            "import" => Err(Diagnostic::new(DiagnosticKind::MalformedImport, node.span)
                .param("reason", "imports are only allowed at the top level")),
            "export" => Err(Diagnostic::new(DiagnosticKind::MalformedExport, node.span)
                .param("reason", "exports are only allowed at the top level")),
            _ => {
                if let Some(kind) = forms::operator_kind(name) {
                    return self.operator(node, name, kind, args);
                }
                if forms::is_macro_name(name) {
                    return self.invoke_macro(node, name, args);
                }
                if let Ok(binding) = self.scopes.lookup(name)
                    && binding.kind == BindingKind::Record
                {
                    let record = binding.ty.clone();
                    return self.construct(node, name, record, args);
                }
                self.apply(head, args)
            }
        }
    }

    fn def(&mut self, node: &Node, args: &[Node]) -> AnalyzeResult<Type> {
        let (name_node, annotation, value) = match args {
            [name, value] => (name, None, value),
            [name, annotation, value] => (name, Some(annotation), value),
            _ => {
                return Err(Diagnostic::new(DiagnosticKind::MalformedDef, node.span)
                    .param("reason", "expected `(def name value)` or `(def name: Type value)`"));
            }
        };
        let label = name_node.as_symbol().ok_or_else(|| {
            Diagnostic::new(DiagnosticKind::MalformedDef, name_node.span)
                .param("reason", "the defined name must be a symbol")
                .offender(name_node)
        })?;
        let name = match (annotation, label.strip_suffix(':')) {
            (Some(_), Some(name)) => name,
            (Some(_), None) => {
                return Err(Diagnostic::new(DiagnosticKind::MalformedDef, name_node.span)
                    .param("reason", "annotated names are written `name:`")
                    .offender(name_node));
            }
            (None, Some(_)) => {
                return Err(Diagnostic::new(DiagnosticKind::MalformedDef, node.span)
                    .param("reason", format!("`{label}` needs both a type and a value")));
            }
            (None, None) => label,
        };
        self.check_binding_name(name, name_node, DiagnosticKind::MalformedDef)?;

        let declared = annotation.map(|a| self.annotation(a)).transpose()?;

        let bound = if value.is_form("fn") {
            // Bind the signature first so the body can recurse.
            let value_args = value.as_list().map_or(&[][..], |items| &items[1..]);
            let signature = self.fn_signature(value, value_args)?;
            if let Some(declared) = &declared
                && !declared.is_assignable_from(&signature)
            {
                return Err(mismatch(
                    DiagnosticKind::TypeMismatch,
                    value.span,
                    declared,
                    &signature,
                ));
            }
            let bound = declared.unwrap_or(signature);
            self.define(name, Binding::value(bound.clone(), name_node.span))?;
            self.infer(value)?;
            bound
        } else {
            let actual = self.infer(value)?;
            let bound = match declared {
                Some(declared) => {
                    if !declared.is_assignable_from(&actual) {
                        return Err(mismatch(
                            DiagnosticKind::TypeMismatch,
                            value.span,
                            &declared,
                            &actual,
                        )
                        .offender(value));
                    }
                    declared
                }
                None => actual,
            };
            self.define(name, Binding::value(bound.clone(), name_node.span))?;
            bound
        };

        trace!(name, ty = %bound, "def");
        self.out.def_types.insert(node.id, bound.clone());
        if self.scopes.is_global() {
            self.out.top_level_defs += 1;
            self.out.bindings.insert(name.to_string(), bound);
        }
        Ok(Type::void())
    }

    pub(super) fn check_binding_name(
        &self,
        name: &str,
        node: &Node,
        kind: DiagnosticKind,
    ) -> AnalyzeResult<()> {
        let reason = if name.is_empty() {
            "the name is empty"
        } else if forms::is_reserved(name) || forms::is_keyword_literal(name) {
            "the name is reserved"
        } else if forms::split_qualified(name).is_some() {
            "qualified names cannot be defined"
        } else if name.starts_with(':') || name.starts_with('\'') || name.ends_with('!') {
            "the name is not a valid identifier"
        } else {
            return Ok(());
        };
        Err(Diagnostic::new(kind, node.span)
            .param("reason", reason)
            .offender(name))
    }

    fn if_form(&mut self, node: &Node, args: &[Node]) -> AnalyzeResult<Type> {
        let (cond, then, otherwise) = match args {
            [cond, then] => (cond, then, None),
            [cond, then, otherwise] => (cond, then, Some(otherwise)),
            _ => {
                return Err(Diagnostic::new(DiagnosticKind::MalformedIf, node.span)
                    .param("reason", "expected `(if cond then else?)`"));
            }
        };

        let cond_ty = self.infer(cond)?;
        if cond_ty.unify(&Type::bool()).is_err() {
            return Err(Diagnostic::new(DiagnosticKind::NonBooleanCondition, cond.span)
                .expected(Type::bool())
                .got(&cond_ty)
                .offender(cond));
        }

        // Each branch is its own block in Go.
        let then_ty = self.scoped(|this| this.infer(then))?;
        let Some(otherwise) = otherwise else {
            return Ok(Type::void());
        };
        let else_ty = self.scoped(|this| this.infer(otherwise))?;
        then_ty
            .unify(&else_ty)
            .map_err(|_| mismatch(DiagnosticKind::BranchTypeMismatch, otherwise.span, &then_ty, &else_ty))
    }

    /// Split `(fn [params] -> Ret body)` into its parts, checking the shape.
    fn fn_parts<'n>(
        &self,
        node: &Node,
        args: &'n [Node],
    ) -> AnalyzeResult<(&'n [Node], &'n Node, &'n Node)> {
        match args {
            [params, arrow, ret, body] if arrow.as_symbol() == Some("->") => {
                let params = params.as_array().ok_or_else(|| {
                    Diagnostic::new(DiagnosticKind::MalformedFn, params.span)
                        .param("reason", "parameters must be a `[...]` vector")
                        .offender(params)
                })?;
                Ok((params, ret, body))
            }
            [params, ..] if params.as_array().is_some() && args.len() <= 3 => {
                Err(Diagnostic::new(DiagnosticKind::MissingTypeAnnotation, node.span)
                    .param("what", "the return type"))
            }
            _ => Err(Diagnostic::new(DiagnosticKind::MalformedFn, node.span)
                .param("reason", "expected `(fn [p: T ...] -> R body)`")),
        }
    }

    /// Function type from the annotations alone, body unchecked.
    fn fn_signature(&mut self, node: &Node, args: &[Node]) -> AnalyzeResult<Type> {
        let (params, ret, _) = self.fn_parts(node, args)?;
        let params = self.typed_list(params, TypedListContext::Parameters)?;
        let ret = self.annotation(ret)?;
        Ok(Type::function(params.into_iter().map(|p| p.ty).collect(), ret))
    }

    fn fn_form(&mut self, node: &Node, args: &[Node]) -> AnalyzeResult<Type> {
        let (params, ret, body) = self.fn_parts(node, args)?;
        let params = self.typed_list(params, TypedListContext::Parameters)?;
        let ret = self.annotation(ret)?;

        let param_types: Vec<Type> = params.iter().map(|p| p.ty.clone()).collect();
        let body_ty = self.scoped(|this| {
            for param in params {
                this.define(&param.name, Binding::value(param.ty, param.span))?;
            }
            this.infer(body)
        })?;

        if !ret.is_void() && !ret.is_assignable_from(&body_ty) {
            return Err(mismatch(
                DiagnosticKind::ReturnTypeMismatch,
                body.span,
                &ret,
                &body_ty,
            ));
        }
        Ok(Type::function(param_types, ret))
    }

    /// Parse `[name: Type ...]`.
    pub(super) fn typed_list(
        &mut self,
        items: &[Node],
        context: TypedListContext,
    ) -> AnalyzeResult<Vec<TypedName>> {
        let missing = |label: &Node, text: &str| match context {
            TypedListContext::Parameters => {
                Diagnostic::new(DiagnosticKind::MissingTypeAnnotation, label.span)
                    .param("what", format!("parameter `{text}`"))
                    .offender(label)
            }
            TypedListContext::Fields => Diagnostic::new(DiagnosticKind::MalformedRecord, label.span)
                .param("reason", format!("field `{text}` needs a type: `{text}: Type`"))
                .offender(label),
        };

        let mut out = Vec::new();
        let mut rest = items;
        while let Some((label, tail)) = rest.split_first() {
            let text = label.to_string();
            let name = label
                .as_symbol()
                .and_then(|s| s.strip_suffix(':'))
                .filter(|n| !n.is_empty())
                .ok_or_else(|| missing(label, &text))?;
            let Some((ty_node, tail)) = tail.split_first() else {
                return Err(missing(label, name));
            };
            let ty = self.annotation(ty_node)?;
            out.push(TypedName {
                name: name.to_string(),
                ty,
                span: label.span,
            });
            rest = tail;
        }
        Ok(out)
    }

    fn do_form(&mut self, args: &[Node]) -> AnalyzeResult<Type> {
        self.scoped(|this| {
            let mut last = Type::void();
            for expr in args {
                last = this.infer(expr)?;
            }
            Ok(last)
        })
    }

    fn operator(
        &mut self,
        node: &Node,
        op: &str,
        kind: OperatorKind,
        args: &[Node],
    ) -> AnalyzeResult<Type> {
        let arity_ok = match kind {
            OperatorKind::Arithmetic | OperatorKind::Logical => args.len() >= 2,
            OperatorKind::Relational | OperatorKind::Equality => args.len() == 2,
            OperatorKind::Not => args.len() == 1,
        };
        if !arity_ok {
            let expected = match kind {
                OperatorKind::Arithmetic | OperatorKind::Logical => "at least 2",
                OperatorKind::Relational | OperatorKind::Equality => "2",
                OperatorKind::Not => "1",
            };
            return Err(Diagnostic::new(DiagnosticKind::ArityMismatch, node.span)
                .param("form", op)
                .param("expected_count", expected)
                .param("found", args.len()));
        }

        match kind {
            OperatorKind::Arithmetic | OperatorKind::Relational => {
                let mut acc = self.fresh_unknown();
                for arg in args {
                    let ty = self.infer(arg)?;
                    let numeric = ty.is_numeric() || ty.is_unknown();
                    acc = match acc.unify(&ty) {
                        Ok(unified) if numeric => unified,
                        _ => {
                            let expected = if acc.is_unknown() {
                                "int or float".to_string()
                            } else {
                                acc.to_string()
                            };
                            return Err(Diagnostic::new(DiagnosticKind::NonNumericOperand, arg.span)
                                .param("op", op)
                                .expected(expected)
                                .got(&ty)
                                .offender(arg));
                        }
                    };
                }
                match kind {
                    OperatorKind::Arithmetic => Ok(acc),
                    _ => Ok(Type::bool()),
                }
            }
            OperatorKind::Equality => {
                let left = self.infer(&args[0])?;
                let right = self.infer(&args[1])?;
                let ty = left.unify(&right).map_err(|_| {
                    Diagnostic::new(DiagnosticKind::EqualityOperandMismatch, args[1].span)
                        .param("op", op)
                        .expected(&left)
                        .got(&right)
                        .offender(&args[1])
                })?;
                if !ty.is_comparable() {
                    return Err(Diagnostic::new(DiagnosticKind::EqualityOperandMismatch, args[0].span)
                        .param("op", op)
                        .expected("a comparable type")
                        .got(&ty)
                        .offender(&args[0])
                        .suggestion("compare lists, maps and functions through their elements"));
                }
                Ok(Type::bool())
            }
            OperatorKind::Logical | OperatorKind::Not => {
                for arg in args {
                    let ty = self.infer(arg)?;
                    if ty.unify(&Type::bool()).is_err() {
                        return Err(Diagnostic::new(DiagnosticKind::NonBooleanOperand, arg.span)
                            .param("op", op)
                            .expected(Type::bool())
                            .got(&ty)
                            .offender(arg));
                    }
                }
                Ok(Type::bool())
            }
        }
    }

    /// Function application. Generic parameters are bound from the argument
    /// types and substituted into the result.
    fn apply(&mut self, head: &Node, args: &[Node]) -> AnalyzeResult<Type> {
        let callee = head.to_string();
        let callee_ty = self.infer(head)?;
        let (params, ret) = match callee_ty {
            Type::Function { params, ret } => (params, ret),
            Type::Unknown { .. } => {
                for arg in args {
                    self.infer(arg)?;
                }
                return Ok(self.fresh_unknown());
            }
            other => {
                return Err(Diagnostic::new(DiagnosticKind::NotCallable, head.span)
                    .param("callee", &callee)
                    .got(&other));
            }
        };

        if params.len() != args.len() {
            return Err(Diagnostic::new(DiagnosticKind::ArgumentCountMismatch, head.span)
                .param("callee", &callee)
                .param("expected_count", params.len())
                .param("found", args.len()));
        }

        let mut bindings = Bindings::new();
        for (position, (param, arg)) in params.iter().zip(args).enumerate() {
            let arg_ty = self.infer(arg)?;
            let argument_error = |expected: &Type, got: &Type| {
                mismatch(DiagnosticKind::ArgumentTypeMismatch, arg.span, expected, got)
                    .param("callee", &callee)
                    .param("position", position + 1)
                    .offender(arg)
            };
            param
                .bind_generics(&arg_ty, &mut bindings)
                .map_err(|e| argument_error(e.expected(), e.found()))?;
            let expected = param.substitute(&bindings);
            if !expected.is_assignable_from(&arg_ty) {
                return Err(argument_error(&expected, &arg_ty));
            }
        }
        Ok(ret.substitute(&bindings))
    }
}

/// Type mismatch between two records is reported as a record mismatch.
pub(super) fn mismatch(
    kind: DiagnosticKind,
    span: TextRange,
    expected: &Type,
    got: &Type,
) -> Diagnostic {
    let kind = if expected.is_record() && got.is_record() {
        DiagnosticKind::RecordTypeMismatch
    } else {
        kind
    };
    Diagnostic::new(kind, span).expected(expected).got(got)
}
