//! Syntax tree and reader.
//!
//! The tree has four shapes: `Program` (top-level forms), `List`
//! (parenthesized form), `Array` (bracketed literal sequence) and `Atom`
//! (symbol, string or number). Analysis and lowering depend only on this
//! shape.

mod lexer;
mod reader;


use std::fmt;

use rowan::TextRange;

pub use lexer::{Token, TokenKind, lex, token_text};
pub use reader::{MAX_NESTING, parse};

/// Identity of a node, unique within one compilation unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Allocator for fresh node ids. Macro expansion continues numbering where
/// the reader stopped.
#[derive(Clone, Debug, Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn starting_at(next: u32) -> Self {
        Self { next }
    }

    pub fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    pub fn peek(&self) -> u32 {
        self.next
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Atom {
    Symbol(String),
    Str(String),
    Int(i64),
    Float(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    List(Vec<Node>),
    Array(Vec<Node>),
    Atom(Atom),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub span: TextRange,
    pub kind: NodeKind,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub forms: Vec<Node>,
    /// First id not used by any node of this program.
    pub next_id: u32,
}

impl Node {
    pub fn new(id: NodeId, span: TextRange, kind: NodeKind) -> Self {
        Self { id, span, kind }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Atom(Atom::Symbol(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match &self.kind {
            NodeKind::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match &self.kind {
            NodeKind::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Atom(Atom::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match &self.kind {
            NodeKind::Atom(Atom::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// Head symbol of a list form, e.g. `def` for `(def x 1)`.
    pub fn head_symbol(&self) -> Option<&str> {
        self.as_list()?.first()?.as_symbol()
    }

    pub fn is_form(&self, head: &str) -> bool {
        self.head_symbol() == Some(head)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn items(f: &mut fmt::Formatter<'_>, items: &[Node]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        match &self.kind {
            NodeKind::List(list) => {
                f.write_str("(")?;
                items(f, list)?;
                f.write_str(")")
            }
            NodeKind::Array(array) => {
                f.write_str("[")?;
                items(f, array)?;
                f.write_str("]")
            }
            NodeKind::Atom(Atom::Symbol(s)) => f.write_str(s),
            NodeKind::Atom(Atom::Str(s)) => write!(f, "{s:?}"),
            NodeKind::Atom(Atom::Int(n)) => write!(f, "{n}"),
            NodeKind::Atom(Atom::Float(x)) => write!(f, "{x:?}"),
        }
    }
}
