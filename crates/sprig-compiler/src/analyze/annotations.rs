//! Type annotation syntax: `int`, `'T`, `[T]`, `(map K V)`, `(fn [P ...] R)`
//! and declared record names.

use sprig_core::{PrimitiveKind, Type};

use super::analyzer::{AnalyzeResult, Analyzer};
use super::scope::BindingKind;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::syntax::{Node, NodeKind};

impl Analyzer<'_> {
    pub(super) fn annotation(&mut self, node: &Node) -> AnalyzeResult<Type> {
        match &node.kind {
            NodeKind::Atom(_) => {
                let Some(name) = node.as_symbol() else {
                    return Err(unknown_type(node));
                };
                if let Some(kind) = PrimitiveKind::from_name(name) {
                    return Ok(Type::primitive(kind));
                }
                if let Some(generic) = name.strip_prefix('\'')
                    && !generic.is_empty()
                {
                    return Ok(Type::generic(generic));
                }
                match self.scopes.lookup(name) {
                    Ok(binding) if binding.kind == BindingKind::Record => Ok(binding.ty.clone()),
                    _ => Err(unknown_type(node)),
                }
            }
            NodeKind::Array(items) => match items.as_slice() {
                [element] => Ok(Type::list(self.annotation(element)?)),
                _ => Err(unknown_type(node)),
            },
            NodeKind::List(items) => match items.as_slice() {
                [head, key, value] if head.as_symbol() == Some("map") => {
                    let key = self.annotation(key)?;
                    let value = self.annotation(value)?;
                    Ok(Type::map(key, value))
                }
                [head, params, ret] if head.as_symbol() == Some("fn") => {
                    let Some(params) = params.as_array() else {
                        return Err(unknown_type(node));
                    };
                    let params = params
                        .iter()
                        .map(|p| self.annotation(p))
                        .collect::<AnalyzeResult<Vec<_>>>()?;
                    Ok(Type::function(params, self.annotation(ret)?))
                }
                _ => Err(unknown_type(node)),
            },
        }
    }
}

fn unknown_type(node: &Node) -> Diagnostic {
    Diagnostic::new(DiagnosticKind::UnknownType, node.span).param("name", node)
}
