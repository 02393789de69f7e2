//! Array and map literals plus the collection primitives
//! `get`, `slice`, `len`, `append` and `empty?`.

use sprig_core::Type;

use super::analyzer::{AnalyzeResult, Analyzer, mismatch};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::syntax::Node;

impl Analyzer<'_> {
    /// `[e ...]`: all elements unify. `[]` has an unknown element type.
    pub(super) fn array(&mut self, items: &[Node]) -> AnalyzeResult<Type> {
        let mut element = self.fresh_unknown();
        for item in items {
            let ty = self.infer(item)?;
            element = element.unify(&ty).map_err(|e| {
                Diagnostic::new(DiagnosticKind::HeterogeneousArray, item.span)
                    .expected(e.expected())
                    .got(e.found())
                    .offender(item)
            })?;
        }
        Ok(Type::list(element))
    }

    /// `(map [k v k v ...])`
    pub(super) fn map_literal(&mut self, node: &Node, args: &[Node]) -> AnalyzeResult<Type> {
        let malformed = |reason: &str| {
            Diagnostic::new(DiagnosticKind::MalformedMap, node.span).param("reason", reason)
        };
        let [entries] = args else {
            return Err(malformed("expected a single `[key value ...]` vector"));
        };
        let Some(items) = entries.as_array() else {
            return Err(malformed("entries must be a `[key value ...]` vector"));
        };
        if items.len() % 2 != 0 {
            return Err(malformed("every key needs a value"));
        }

        let mut key = self.fresh_unknown();
        let mut value = self.fresh_unknown();
        for pair in items.chunks(2) {
            for (slot, part, item) in [(&mut key, "key", &pair[0]), (&mut value, "value", &pair[1])] {
                let ty = self.infer(item)?;
                *slot = slot.unify(&ty).map_err(|e| {
                    Diagnostic::new(DiagnosticKind::HeterogeneousMap, item.span)
                        .param("part", part)
                        .expected(e.expected())
                        .got(e.found())
                        .offender(item)
                })?;
            }
        }
        Ok(Type::map(key, value))
    }

    pub(super) fn collection_op(
        &mut self,
        node: &Node,
        op: &str,
        args: &[Node],
    ) -> AnalyzeResult<Type> {
        let expected_count = match op {
            "get" | "slice" | "append" => 2,
            _ => 1,
        };
        if args.len() != expected_count {
            return Err(Diagnostic::new(DiagnosticKind::ArityMismatch, node.span)
                .param("form", op)
                .param("expected_count", expected_count)
                .param("found", args.len()));
        }

        let seq = &args[0];
        let seq_ty = self.infer(seq)?;
        let not_indexable = |got: &Type| {
            Diagnostic::new(DiagnosticKind::NotIndexable, seq.span)
                .param("op", op)
                .got(got)
                .offender(seq)
        };

        match op {
            "get" | "slice" => {
                let index = &args[1];
                let index_ty = self.infer(index)?;
                match &seq_ty {
                    Type::List { element } => {
                        if index_ty.unify(&Type::int()).is_err() {
                            return Err(Diagnostic::new(DiagnosticKind::NonNumericIndex, index.span)
                                .param("op", op)
                                .expected(Type::int())
                                .got(&index_ty)
                                .offender(index));
                        }
                        if op == "get" {
                            Ok((**element).clone())
                        } else {
                            Ok(seq_ty.clone())
                        }
                    }
                    Type::Map { key, value } if op == "get" => {
                        if !key.is_assignable_from(&index_ty) {
                            return Err(mismatch(DiagnosticKind::TypeMismatch, index.span, key, &index_ty)
                                .offender(index));
                        }
                        Ok((**value).clone())
                    }
                    Type::Unknown { .. } => Ok(self.fresh_unknown()),
                    other => Err(not_indexable(other)),
                }
            }
            "append" => {
                let tail = &args[1];
                let tail_ty = self.infer(tail)?;
                for (ty, operand) in [(&seq_ty, seq), (&tail_ty, tail)] {
                    if !matches!(ty, Type::List { .. } | Type::Unknown { .. }) {
                        return Err(Diagnostic::new(DiagnosticKind::NotIndexable, operand.span)
                            .param("op", op)
                            .got(ty)
                            .offender(operand));
                    }
                }
                seq_ty.unify(&tail_ty).map_err(|_| {
                    mismatch(DiagnosticKind::TypeMismatch, tail.span, &seq_ty, &tail_ty).offender(tail)
                })
            }
            _ => {
                let sized = match &seq_ty {
                    Type::List { .. } | Type::Map { .. } | Type::Unknown { .. } => true,
                    ty => ty == &Type::string(),
                };
                if !sized {
                    return Err(not_indexable(&seq_ty));
                }
                match op {
                    "len" => Ok(Type::int()),
                    _ => Ok(Type::bool()),
                }
            }
        }
    }
}
