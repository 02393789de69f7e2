//! Scoped symbol table.
//!
//! A stack of frames mapping names to bindings. Definitions are checked for
//! duplicates against the innermost frame only, so inner frames may shadow
//! outer ones. The global frame is never popped.

use indexmap::IndexMap;
use rowan::TextRange;
use sprig_core::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Value,
    /// A `record` declaration; the name is usable as a type and a constructor.
    Record,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub ty: Type,
    pub kind: BindingKind,
    /// Where the name was defined.
    pub span: TextRange,
}

impl Binding {
    pub fn value(ty: Type, span: TextRange) -> Self {
        Self {
            ty,
            kind: BindingKind::Value,
            span,
        }
    }

    pub fn record(ty: Type, span: TextRange) -> Self {
        Self {
            ty,
            kind: BindingKind::Record,
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("`{name}` is already defined in this scope")]
    Duplicate { name: String, previous: TextRange },

    #[error("`{0}` is not defined")]
    Undefined(String),
}

#[derive(Debug, Clone)]
pub struct Scopes {
    frames: Vec<IndexMap<String, Binding>>,
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

impl Scopes {
    pub fn new() -> Self {
        Self {
            frames: vec![IndexMap::new()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.frames.push(IndexMap::new());
    }

    /// # Panics
    /// If called without a matching [`Scopes::enter_scope`].
    pub fn exit_scope(&mut self) {
        assert!(
            self.frames.len() > 1,
            "exit_scope without matching enter_scope"
        );
        self.frames.pop();
    }

    /// Number of frames above the global one.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn is_global(&self) -> bool {
        self.frames.len() == 1
    }

    pub fn define(&mut self, name: &str, binding: Binding) -> Result<(), ScopeError> {
        let frame = self
            .frames
            .last_mut()
            .expect("global frame is never popped");
        if let Some(previous) = frame.get(name) {
            return Err(ScopeError::Duplicate {
                name: name.to_string(),
                previous: previous.span,
            });
        }
        frame.insert(name.to_string(), binding);
        Ok(())
    }

    /// Innermost binding for `name`.
    pub fn lookup(&self, name: &str) -> Result<&Binding, ScopeError> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .ok_or_else(|| ScopeError::Undefined(name.to_string()))
    }

    pub fn globals(&self) -> &IndexMap<String, Binding> {
        &self.frames[0]
    }
}
