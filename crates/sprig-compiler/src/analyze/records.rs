use indexmap::IndexSet;
use sprig_core::{RecordField, Type};

use super::analyzer::{AnalyzeResult, Analyzer, TypedListContext, mismatch};
use super::scope::Binding;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::syntax::Node;

impl Analyzer<'_> {
    /// `(record Name [field: Type ...])`
    pub(super) fn record_decl(&mut self, node: &Node, args: &[Node]) -> AnalyzeResult<Type> {
        let malformed = |reason: String| {
            Diagnostic::new(DiagnosticKind::MalformedRecord, node.span).param("reason", reason)
        };
        let [name_node, fields] = args else {
            return Err(malformed(
                "expected `(record Name [field: Type ...])`".to_string(),
            ));
        };
        let Some(name) = name_node.as_symbol() else {
            return Err(malformed("the record name must be a symbol".to_string()));
        };
        self.check_binding_name(name, name_node, DiagnosticKind::MalformedRecord)?;
        let Some(fields) = fields.as_array() else {
            return Err(malformed("fields must be a `[field: Type ...]` vector".to_string()));
        };

        let fields = self.typed_list(fields, TypedListContext::Fields)?;
        let mut seen = IndexSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(malformed(format!("field `{}` is declared twice", field.name)));
            }
        }

        let record = Type::record(
            name,
            fields
                .into_iter()
                .map(|f| RecordField {
                    name: f.name,
                    ty: f.ty,
                })
                .collect(),
        );
        self.define(name, Binding::record(record.clone(), name_node.span))?;
        self.out.records.insert(name.to_string(), record);
        Ok(Type::void())
    }

    /// `(Name [v1 v2 ...])`: one value per field, in declaration order.
    pub(super) fn construct(
        &mut self,
        node: &Node,
        name: &str,
        record: Type,
        args: &[Node],
    ) -> AnalyzeResult<Type> {
        let malformed = |reason: String| {
            Diagnostic::new(DiagnosticKind::MalformedConstruction, node.span)
                .param("record", name)
                .param("reason", reason)
        };
        let Type::Record { fields, .. } = &record else {
            return Err(malformed("not a record type".to_string()));
        };
        let values = match args {
            [values] => values.as_array(),
            _ => None,
        };
        let Some(values) = values else {
            return Err(malformed(format!("expected `({name} [values ...])`")));
        };
        if values.len() != fields.len() {
            return Err(malformed(format!(
                "expected {} field value(s), found {}",
                fields.len(),
                values.len()
            )));
        }

        for (field, value) in fields.iter().zip(values) {
            let ty = self.infer(value)?;
            if !field.ty.is_assignable_from(&ty) {
                return Err(
                    mismatch(DiagnosticKind::TypeMismatch, value.span, &field.ty, &ty)
                        .param("field", &field.name)
                        .offender(value),
                );
            }
        }
        Ok(record)
    }

    /// `(. value field)`
    pub(super) fn field_access(&mut self, node: &Node, args: &[Node]) -> AnalyzeResult<Type> {
        let (value, field) = match args {
            [value, field] => match field.as_symbol() {
                Some(field) => (value, field),
                None => {
                    return Err(Diagnostic::new(DiagnosticKind::MalformedFieldAccess, field.span)
                        .param("reason", "the field name must be a symbol")
                        .offender(field));
                }
            },
            _ => {
                return Err(Diagnostic::new(DiagnosticKind::MalformedFieldAccess, node.span)
                    .param("reason", "expected `(. value field)`"));
            }
        };

        match self.infer(value)? {
            record @ Type::Record { .. } => match record.field(field) {
                Some(ty) => Ok(ty.clone()),
                None => Err(Diagnostic::new(DiagnosticKind::UnknownField, node.span)
                    .param("record", &record)
                    .param("field", field)),
            },
            Type::Unknown { .. } => Ok(self.fresh_unknown()),
            other => Err(Diagnostic::new(DiagnosticKind::RecordTypeMismatch, value.span)
                .expected("a record")
                .got(&other)
                .offender(value)),
        }
    }
}
