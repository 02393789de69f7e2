//! Sequence and map literals, and the collection primitives.

use sprig_core::Type;

use super::emitter::{Emitter, GenResult};
use super::fold;
use crate::syntax::Node;

impl Emitter<'_> {
    /// `[]T{a, b}`
    pub(super) fn array(&mut self, node: &Node, items: &[Node]) -> GenResult<String> {
        let ty = match self.type_of(node) {
            ty @ Type::List { .. } => ty,
            _ => Type::list(Type::unknown(0)),
        };
        let mut lowered = Vec::with_capacity(items.len());
        for item in items {
            lowered.push(self.lower(item)?);
        }
        Ok(format!("{}{{{}}}", self.go_type(&ty), lowered.join(", ")))
    }

    /// `map[K]V{k: v, ...}`
    pub(super) fn map_literal(&mut self, node: &Node, args: &[Node]) -> GenResult<String> {
        let ty = match self.type_of(node) {
            ty @ Type::Map { .. } => ty,
            _ => Type::map(Type::unknown(0), Type::unknown(0)),
        };
        let items = args.first().and_then(Node::as_array).unwrap_or_default();
        let mut entries = Vec::with_capacity(items.len() / 2);
        for pair in items.chunks(2) {
            if let [key, value] = pair {
                entries.push(format!("{}: {}", self.lower(key)?, self.lower(value)?));
            }
        }
        Ok(format!("{}{{{}}}", self.go_type(&ty), entries.join(", ")))
    }

    pub(super) fn collection_op(&mut self, op: &str, args: &[Node]) -> GenResult<String> {
        match op {
            "len" => match args {
                [] => Ok("0".to_string()),
                [seq, ..] => Ok(format!("int64(len({}))", self.lower(seq)?)),
            },
            "append" => {
                let Some((first, rest)) = args.split_first() else {
                    return Ok("[]any{}".to_string());
                };
                let mut acc = self.lower(first)?;
                for tail in rest {
                    acc = format!("append({acc}, {}...)", self.lower(tail)?);
                }
                Ok(acc)
            }
            "empty?" => match args {
                [] => Ok("true".to_string()),
                [seq, ..] => match fold::literal_len(seq) {
                    Some(len) => Ok((len == 0).to_string()),
                    None => Ok(format!("(len({}) == 0)", self.lower(seq)?)),
                },
            },
            _ => self.indexed(op == "slice", args),
        }
    }

    /// `get`/`slice` on a list: a bounds-checked block falling back to the
    /// element's zero value or an empty slice. `get` on a map indexes it.
    fn indexed(&mut self, slice: bool, args: &[Node]) -> GenResult<String> {
        let [seq, index] = args else {
            return Ok(if slice { "[]any{}" } else { "nil" }.to_string());
        };
        let seq_ty = self.type_of(seq);
        if !slice && matches!(seq_ty, Type::Map { .. }) {
            return Ok(format!("{}[{}]", self.lower(seq)?, self.lower(index)?));
        }

        let list_ty = match seq_ty {
            ty @ Type::List { .. } => ty,
            _ => Type::list(Type::unknown(0)),
        };
        let element = match &list_ty {
            Type::List { element } => (**element).clone(),
            _ => Type::unknown(0),
        };
        let guard = match (fold::literal_len(seq), fold::fold_int(index)) {
            (Some(len), Some(index)) => (i64::try_from(len).is_ok_and(|len| len > index)).to_string(),
            _ => "int64(len(__seq)) > __idx".to_string(),
        };
        let (result_ty, access, fallback) = if slice {
            let empty = format!("{}{{}}", self.go_type(&list_ty));
            (list_ty, "__seq[__idx:]", empty)
        } else {
            let zero = self.zero_value(&element);
            (element, "__seq[__idx]", zero)
        };

        let body = vec![
            format!("__seq := {}", self.lower(seq)?),
            format!("__idx := int64({})", self.lower(index)?),
            format!("if {guard} {{"),
            format!("{}return {access}", self.config.indent),
            "}".to_string(),
            format!("return {fallback}"),
        ];
        Ok(self.iife(&result_ty, &body))
    }
}
