//! Type representation for the analyzer and the Go lowering.
//!
//! `Type` is a closed sum type. Every operation over it (unification,
//! assignability, generic binding, the Go mapping) matches exhaustively, so a
//! new variant cannot be silently ignored anywhere.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Generic parameter name → bound type, in binding order.
pub type Bindings = IndexMap<String, Type>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Int,
    Float,
    String,
    Bool,
    Symbol,
    Void,
}

impl PrimitiveKind {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "int" => Self::Int,
            "float" => Self::Float,
            "string" => Self::String,
            "bool" => Self::Bool,
            "symbol" => Self::Symbol,
            "void" => Self::Void,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Symbol => "symbol",
            Self::Void => "void",
        }
    }

    pub fn go_name(self) -> &'static str {
        match self {
            Self::Int => "int64",
            Self::Float => "float64",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Symbol => "Symbol",
            Self::Void => "any",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordField {
    pub name: String,
    pub ty: Type,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Primitive {
        kind: PrimitiveKind,
    },
    List {
        element: Box<Type>,
    },
    Map {
        key: Box<Type>,
        value: Box<Type>,
    },
    Function {
        params: Vec<Type>,
        ret: Box<Type>,
    },
    /// Generic parameter, written `'T` in annotations.
    Generic {
        name: String,
    },
    /// Unification placeholder. Never reaches a `TypeScheme`.
    Unknown {
        id: u32,
    },
    /// Nominal record type. Two records are equal when their names are.
    Record {
        name: String,
        fields: Vec<RecordField>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UnifyError {
    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    Mismatch { expected: Type, found: Type },
}

impl UnifyError {
    pub fn mismatch(expected: &Type, found: &Type) -> Self {
        Self::Mismatch {
            expected: expected.clone(),
            found: found.clone(),
        }
    }

    pub fn expected(&self) -> &Type {
        match self {
            Self::Mismatch { expected, .. } => expected,
        }
    }

    pub fn found(&self) -> &Type {
        match self {
            Self::Mismatch { found, .. } => found,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Primitive { kind: a }, Type::Primitive { kind: b }) => a == b,
            (Type::List { element: a }, Type::List { element: b }) => a == b,
            (Type::Map { key: ka, value: va }, Type::Map { key: kb, value: vb }) => {
                ka == kb && va == vb
            }
            (
                Type::Function {
                    params: pa,
                    ret: ra,
                },
                Type::Function {
                    params: pb,
                    ret: rb,
                },
            ) => pa == pb && ra == rb,
            (Type::Generic { name: a }, Type::Generic { name: b }) => a == b,
            (Type::Unknown { id: a }, Type::Unknown { id: b }) => a == b,
            (Type::Record { name: a, .. }, Type::Record { name: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for Type {}

impl Type {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Type::Primitive { kind }
    }

    pub fn int() -> Self {
        Self::primitive(PrimitiveKind::Int)
    }

    pub fn float() -> Self {
        Self::primitive(PrimitiveKind::Float)
    }

    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String)
    }

    pub fn bool() -> Self {
        Self::primitive(PrimitiveKind::Bool)
    }

    pub fn symbol() -> Self {
        Self::primitive(PrimitiveKind::Symbol)
    }

    pub fn void() -> Self {
        Self::primitive(PrimitiveKind::Void)
    }

    pub fn list(element: Type) -> Self {
        Type::List {
            element: Box::new(element),
        }
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn function(params: Vec<Type>, ret: Type) -> Self {
        Type::Function {
            params,
            ret: Box::new(ret),
        }
    }

    pub fn generic(name: impl Into<String>) -> Self {
        Type::Generic { name: name.into() }
    }

    pub fn unknown(id: u32) -> Self {
        Type::Unknown { id }
    }

    pub fn record(name: impl Into<String>, fields: Vec<RecordField>) -> Self {
        Type::Record {
            name: name.into(),
            fields,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown { .. })
    }

    pub fn is_void(&self) -> bool {
        matches!(
            self,
            Type::Primitive {
                kind: PrimitiveKind::Void
            }
        )
    }

    pub fn is_bool(&self) -> bool {
        matches!(
            self,
            Type::Primitive {
                kind: PrimitiveKind::Bool
            }
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Type::Primitive {
                kind: PrimitiveKind::Int | PrimitiveKind::Float
            }
        )
    }

    /// True if Go's `==` accepts values of this type.
    pub fn is_comparable(&self) -> bool {
        match self {
            Type::Primitive { .. } | Type::Generic { .. } | Type::Unknown { .. } => true,
            Type::List { .. } | Type::Map { .. } | Type::Function { .. } => false,
            Type::Record { fields, .. } => fields.iter().all(|f| f.ty.is_comparable()),
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Type::Record { .. })
    }

    /// True if an `Unknown` occurs anywhere inside this type.
    pub fn contains_unknown(&self) -> bool {
        match self {
            Type::Unknown { .. } => true,
            Type::Primitive { .. } | Type::Generic { .. } | Type::Record { .. } => false,
            Type::List { element } => element.contains_unknown(),
            Type::Map { key, value } => key.contains_unknown() || value.contains_unknown(),
            Type::Function { params, ret } => {
                params.iter().any(Type::contains_unknown) || ret.contains_unknown()
            }
        }
    }

    /// Field type of a record, if this is a record with that field.
    pub fn field(&self, name: &str) -> Option<&Type> {
        match self {
            Type::Record { fields, .. } => fields.iter().find(|f| f.name == name).map(|f| &f.ty),
            _ => None,
        }
    }

    /// Merge two types into their most specific common type.
    ///
    /// `Unknown` absorbs: the result is the other operand. Lists, maps and
    /// functions unify component-wise and propagate the first inner failure.
    pub fn unify(&self, other: &Type) -> Result<Type, UnifyError> {
        match (self, other) {
            (Type::Unknown { .. }, _) => Ok(other.clone()),
            (_, Type::Unknown { .. }) => Ok(self.clone()),
            _ if self == other => Ok(self.clone()),
            (Type::List { element: a }, Type::List { element: b }) => Ok(Type::list(a.unify(b)?)),
            (Type::Map { key: ka, value: va }, Type::Map { key: kb, value: vb }) => {
                let key = ka.unify(kb)?;
                let value = va.unify(vb)?;
                Ok(Type::map(key, value))
            }
            (
                Type::Function {
                    params: pa,
                    ret: ra,
                },
                Type::Function {
                    params: pb,
                    ret: rb,
                },
            ) => {
                if pa.len() != pb.len() {
                    return Err(UnifyError::mismatch(self, other));
                }
                let params = pa
                    .iter()
                    .zip(pb)
                    .map(|(a, b)| a.unify(b))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Type::function(params, ra.unify(rb)?))
            }
            _ => Err(UnifyError::mismatch(self, other)),
        }
    }

    /// One-directional compatibility: can a `source` value be used where
    /// `self` is expected?
    pub fn is_assignable_from(&self, source: &Type) -> bool {
        match (self, source) {
            (Type::Unknown { .. }, _) | (_, Type::Unknown { .. }) => true,
            (Type::Generic { .. }, _) => true,
            (Type::Primitive { kind: a }, Type::Primitive { kind: b }) => a == b,
            (Type::List { element: a }, Type::List { element: b }) => a.is_assignable_from(b),
            (Type::Map { key: ka, value: va }, Type::Map { key: kb, value: vb }) => {
                ka.is_assignable_from(kb) && va.is_assignable_from(vb)
            }
            (
                Type::Function {
                    params: pa,
                    ret: ra,
                },
                Type::Function {
                    params: pb,
                    ret: rb,
                },
            ) => {
                pa.len() == pb.len()
                    && pa.iter().zip(pb).all(|(a, b)| a.is_assignable_from(b))
                    && ra.is_assignable_from(rb)
            }
            (Type::Record { name: a, .. }, Type::Record { name: b, .. }) => a == b,
            _ => false,
        }
    }

    /// Match a declared parameter type against an argument type, recording
    /// what each generic stands for. A generic seen twice must unify with its
    /// earlier binding.
    pub fn bind_generics(&self, actual: &Type, bindings: &mut Bindings) -> Result<(), UnifyError> {
        match (self, actual) {
            (Type::Generic { name }, _) => {
                let bound = match bindings.get(name) {
                    Some(previous) => previous.unify(actual)?,
                    None => actual.clone(),
                };
                bindings.insert(name.clone(), bound);
                Ok(())
            }
            (Type::List { element: p }, Type::List { element: a }) => p.bind_generics(a, bindings),
            (Type::Map { key: pk, value: pv }, Type::Map { key: ak, value: av }) => {
                pk.bind_generics(ak, bindings)?;
                pv.bind_generics(av, bindings)
            }
            (
                Type::Function {
                    params: pp,
                    ret: pr,
                },
                Type::Function {
                    params: ap,
                    ret: ar,
                },
            ) if pp.len() == ap.len() => {
                for (p, a) in pp.iter().zip(ap) {
                    p.bind_generics(a, bindings)?;
                }
                pr.bind_generics(ar, bindings)
            }
            _ => Ok(()),
        }
    }

    /// Replace bound generics. Unbound generics are left in place.
    pub fn substitute(&self, bindings: &Bindings) -> Type {
        match self {
            Type::Generic { name } => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            Type::List { element } => Type::list(element.substitute(bindings)),
            Type::Map { key, value } => Type::map(key.substitute(bindings), value.substitute(bindings)),
            Type::Function { params, ret } => Type::function(
                params.iter().map(|p| p.substitute(bindings)).collect(),
                ret.substitute(bindings),
            ),
            Type::Primitive { .. } | Type::Unknown { .. } | Type::Record { .. } => self.clone(),
        }
    }

    /// Generic parameter names occurring in this type, sorted and deduplicated.
    pub fn free_generics(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        self.collect_generics(&mut names);
        names.into_iter().collect()
    }

    fn collect_generics(&self, names: &mut BTreeSet<String>) {
        match self {
            Type::Generic { name } => {
                names.insert(name.clone());
            }
            Type::List { element } => element.collect_generics(names),
            Type::Map { key, value } => {
                key.collect_generics(names);
                value.collect_generics(names);
            }
            Type::Function { params, ret } => {
                for p in params {
                    p.collect_generics(names);
                }
                ret.collect_generics(names);
            }
            Type::Primitive { .. } | Type::Unknown { .. } | Type::Record { .. } => {}
        }
    }

    /// Go spelling of this type. Generics and unknowns become `any`.
    pub fn to_go(&self) -> String {
        match self {
            Type::Primitive { kind } => kind.go_name().to_string(),
            Type::List { element } => format!("[]{}", element.to_go()),
            Type::Map { key, value } => format!("map[{}]{}", key.to_go(), value.to_go()),
            Type::Function { params, ret } => {
                let params: Vec<_> = params.iter().map(Type::to_go).collect();
                format!("func({}) {}", params.join(", "), ret.to_go())
            }
            Type::Generic { .. } | Type::Unknown { .. } => "any".to_string(),
            Type::Record { name, .. } => crate::utils::go_ident(name),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive { kind } => f.write_str(kind.name()),
            Type::List { element } => write!(f, "[{element}]"),
            Type::Map { key, value } => write!(f, "(map {key} {value})"),
            Type::Function { params, ret } => {
                f.write_str("(fn [")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, "] {ret})")
            }
            Type::Generic { name } => write!(f, "'{name}"),
            Type::Unknown { id } => write!(f, "?{id}"),
            Type::Record { name, .. } => f.write_str(name),
        }
    }
}

/// Type of an exported symbol plus the generic parameters it quantifies over.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeScheme {
    pub generics: Vec<String>,
    pub ty: Type,
}

impl TypeScheme {
    /// Close over every generic in `ty`. Leftover unknowns are turned into
    /// generics named after their id so no placeholder escapes the package.
    pub fn generalize(ty: &Type) -> Self {
        let ty = close_unknowns(ty);
        Self {
            generics: ty.free_generics(),
            ty,
        }
    }

    pub fn is_polymorphic(&self) -> bool {
        !self.generics.is_empty()
    }
}

fn close_unknowns(ty: &Type) -> Type {
    match ty {
        Type::Unknown { id } => Type::generic(format!("_{id}")),
        Type::List { element } => Type::list(close_unknowns(element)),
        Type::Map { key, value } => Type::map(close_unknowns(key), close_unknowns(value)),
        Type::Function { params, ret } => {
            Type::function(params.iter().map(close_unknowns).collect(), close_unknowns(ret))
        }
        Type::Primitive { .. } | Type::Generic { .. } | Type::Record { .. } => ty.clone(),
    }
}

impl fmt::Display for TypeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generics.is_empty() {
            return write!(f, "{}", self.ty);
        }
        f.write_str("(forall [")?;
        for (i, name) in self.generics.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "'{name}")?;
        }
        write!(f, "] {})", self.ty)
    }
}
