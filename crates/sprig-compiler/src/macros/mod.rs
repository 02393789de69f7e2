//! Macro collaborator: storage of macro definitions and pure expansion.
//!
//! Expansion is substitution on the syntax tree. Every node it produces gets
//! a fresh id; nodes coming from the macro body take the invocation's span so
//! diagnostics point at the call site, while arguments keep their own spans.


use indexmap::IndexMap;
use rowan::TextRange;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::syntax::{Atom, Node, NodeIdGen, NodeKind};

/// Nested expansions deeper than this are reported instead of followed.
pub const MAX_EXPANSION_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub name: String,
    pub params: Vec<String>,
    /// Collects the remaining arguments, written `& rest` in the parameter list.
    pub rest: Option<String>,
    pub body: Node,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MacroError {
    #[error("macro `{0}` is already defined")]
    Duplicate(String),

    #[error("macro `{name}` expects {expected} argument(s), found {found}")]
    ArgumentCount {
        name: String,
        expected: String,
        found: usize,
    },
}

impl MacroError {
    /// Diagnostic for a failed invocation at `site`.
    pub fn to_diagnostic(&self, site: TextRange) -> Diagnostic {
        match self {
            MacroError::Duplicate(name) => {
                Diagnostic::new(DiagnosticKind::DuplicateMacro, site).param("name", name)
            }
            MacroError::ArgumentCount {
                name,
                expected,
                found,
            } => Diagnostic::new(DiagnosticKind::ArgumentCountMismatch, site)
                .param("callee", name)
                .param("expected_count", expected)
                .param("found", found),
        }
    }
}

/// Name → macro lookup consulted by the analyzer and the generator.
pub trait MacroRegistry {
    fn has_macro(&self, name: &str) -> bool;

    fn get_macro(&self, name: &str) -> Option<&Macro>;

    /// Fails if `name` is already registered.
    fn register(&mut self, name: &str, mac: Macro) -> Result<(), MacroError>;
}

/// In-memory registry, the default collaborator.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    macros: IndexMap<String, Macro>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.macros.keys().map(String::as_str)
    }
}

impl MacroRegistry for MacroTable {
    fn has_macro(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    fn get_macro(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    fn register(&mut self, name: &str, mac: Macro) -> Result<(), MacroError> {
        if self.macros.contains_key(name) {
            return Err(MacroError::Duplicate(name.to_string()));
        }
        self.macros.insert(name.to_string(), mac);
        Ok(())
    }
}

/// Substitute `args` into the body of `mac`.
pub fn expand(
    mac: &Macro,
    args: &[Node],
    site: TextRange,
    ids: &mut NodeIdGen,
) -> Result<Node, MacroError> {
    let arity_ok = match mac.rest {
        Some(_) => args.len() >= mac.params.len(),
        None => args.len() == mac.params.len(),
    };
    if !arity_ok {
        let expected = match mac.rest {
            Some(_) => format!("at least {}", mac.params.len()),
            None => mac.params.len().to_string(),
        };
        return Err(MacroError::ArgumentCount {
            name: mac.name.clone(),
            expected,
            found: args.len(),
        });
    }

    let (fixed, rest) = args.split_at(mac.params.len());
    let expander = Expander {
        bound: mac.params.iter().map(String::as_str).zip(fixed).collect(),
        rest: mac.rest.as_deref().map(|name| (name, rest)),
        site,
    };
    Ok(expander.substitute(&mac.body, ids))
}

struct Expander<'a> {
    bound: IndexMap<&'a str, &'a Node>,
    rest: Option<(&'a str, &'a [Node])>,
    site: TextRange,
}

impl Expander<'_> {
    fn substitute(&self, node: &Node, ids: &mut NodeIdGen) -> Node {
        match &node.kind {
            NodeKind::Atom(Atom::Symbol(name)) => {
                if let Some(arg) = self.bound.get(name.as_str()) {
                    return renumber(arg, ids);
                }
                if let Some((rest_name, rest)) = self.rest
                    && rest_name == name.as_str()
                {
                    let items = rest.iter().map(|n| renumber(n, ids)).collect();
                    return Node::new(ids.fresh(), self.site, NodeKind::Array(items));
                }
                Node::new(ids.fresh(), self.site, node.kind.clone())
            }
            NodeKind::Atom(_) => Node::new(ids.fresh(), self.site, node.kind.clone()),
            NodeKind::List(items) => {
                let items = self.substitute_items(items, ids);
                Node::new(ids.fresh(), self.site, NodeKind::List(items))
            }
            NodeKind::Array(items) => {
                let items = self.substitute_items(items, ids);
                Node::new(ids.fresh(), self.site, NodeKind::Array(items))
            }
        }
    }

    /// A rest parameter in item position splices its arguments in place.
    fn substitute_items(&self, items: &[Node], ids: &mut NodeIdGen) -> Vec<Node> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            if let Some((rest_name, rest)) = self.rest
                && item.as_symbol() == Some(rest_name)
            {
                out.extend(rest.iter().map(|n| renumber(n, ids)));
                continue;
            }
            out.push(self.substitute(item, ids));
        }
        out
    }
}

/// Deep copy with fresh ids, keeping spans.
fn renumber(node: &Node, ids: &mut NodeIdGen) -> Node {
    let kind = match &node.kind {
        NodeKind::List(items) => NodeKind::List(items.iter().map(|n| renumber(n, ids)).collect()),
        NodeKind::Array(items) => {
            NodeKind::Array(items.iter().map(|n| renumber(n, ids)).collect())
        }
        NodeKind::Atom(atom) => NodeKind::Atom(atom.clone()),
    };
    Node::new(ids.fresh(), node.span, kind)
}
