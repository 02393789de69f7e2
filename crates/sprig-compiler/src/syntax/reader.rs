//! Recursive-descent reader building the syntax tree from tokens.
//!
//! Stops at the first error. Nesting depth is bounded so deeply nested input
//! cannot exhaust the stack.

use rowan::TextRange;

use super::lexer::{Token, TokenKind, lex, token_text};
use super::{Atom, Node, NodeIdGen, NodeKind, Program};
use crate::diagnostics::{Diagnostic, DiagnosticKind};

pub const MAX_NESTING: usize = 512;

type ReadResult<T> = Result<T, Diagnostic>;

/// Read `source` into a [`Program`]. Node ids start at zero.
pub fn parse(source: &str) -> ReadResult<Program> {
    let tokens = lex(source)
        .into_iter()
        .filter(|t| !t.kind.is_trivia())
        .collect();
    let mut reader = Reader {
        source,
        tokens,
        pos: 0,
        ids: NodeIdGen::default(),
        depth: 0,
    };

    let mut forms = Vec::new();
    while let Some(token) = reader.peek() {
        if matches!(token.kind, TokenKind::RParen | TokenKind::RBracket) {
            return Err(reader.unexpected(token));
        }
        forms.push(reader.node()?);
    }

    Ok(Program {
        forms,
        next_id: reader.ids.peek(),
    })
}

struct Reader<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    ids: NodeIdGen,
    depth: usize,
}

impl<'s> Reader<'s> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn text(&self, token: &Token) -> &'s str {
        token_text(self.source, token)
    }

    fn unexpected(&self, token: Token) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::UnexpectedToken, token.span)
            .param("token", self.text(&token))
    }

    fn node(&mut self) -> ReadResult<Node> {
        let Some(token) = self.bump() else {
            let end = TextRange::empty((self.source.len() as u32).into());
            return Err(Diagnostic::new(DiagnosticKind::UnexpectedToken, end)
                .param("token", "end of input"));
        };

        match token.kind {
            TokenKind::LParen => {
                let (items, span) = self.sequence(token, TokenKind::RParen, ")")?;
                if items.is_empty() {
                    return Err(Diagnostic::new(DiagnosticKind::EmptyForm, span));
                }
                Ok(self.make(span, NodeKind::List(items)))
            }
            TokenKind::LBracket => {
                let (items, span) = self.sequence(token, TokenKind::RBracket, "]")?;
                Ok(self.make(span, NodeKind::Array(items)))
            }
            TokenKind::RParen | TokenKind::RBracket => Err(self.unexpected(token)),
            TokenKind::Str => {
                let text = self.text(&token);
                let value = unescape(&text[1..text.len() - 1]).map_err(|reason| {
                    Diagnostic::new(DiagnosticKind::InvalidLiteral, token.span)
                        .param("text", text)
                        .param("reason", reason)
                })?;
                Ok(self.make(token.span, NodeKind::Atom(Atom::Str(value))))
            }
            TokenKind::Int => {
                let text = self.text(&token);
                let value = text.parse::<i64>().map_err(|e| {
                    Diagnostic::new(DiagnosticKind::InvalidLiteral, token.span)
                        .param("text", text)
                        .param("reason", e)
                })?;
                Ok(self.make(token.span, NodeKind::Atom(Atom::Int(value))))
            }
            TokenKind::Float => {
                let text = self.text(&token);
                let value = text.parse::<f64>().map_err(|e| {
                    Diagnostic::new(DiagnosticKind::InvalidLiteral, token.span)
                        .param("text", text)
                        .param("reason", e)
                })?;
                Ok(self.make(token.span, NodeKind::Atom(Atom::Float(value))))
            }
            TokenKind::Symbol => {
                let name = self.text(&token).to_string();
                Ok(self.make(token.span, NodeKind::Atom(Atom::Symbol(name))))
            }
            TokenKind::Garbage if self.text(&token).starts_with('"') => Err(Diagnostic::new(
                DiagnosticKind::UnclosedDelimiter,
                token.span,
            )
            .param("delimiter", "\"")),
            TokenKind::Garbage | TokenKind::Whitespace | TokenKind::Comment => {
                Err(self.unexpected(token))
            }
        }
    }

    /// Read items up to the matching `close` token. Returns the items and the
    /// span from the opening to the closing delimiter.
    fn sequence(
        &mut self,
        open: Token,
        close: TokenKind,
        close_text: &str,
    ) -> ReadResult<(Vec<Node>, TextRange)> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(Diagnostic::new(DiagnosticKind::NestingTooDeep, open.span)
                .param("limit", MAX_NESTING));
        }

        let mut items = Vec::new();
        loop {
            let Some(token) = self.peek() else {
                return Err(Diagnostic::new(DiagnosticKind::UnclosedDelimiter, open.span)
                    .param("delimiter", close_text));
            };
            if token.kind == close {
                self.pos += 1;
                self.depth -= 1;
                return Ok((items, open.span.cover(token.span)));
            }
            if matches!(token.kind, TokenKind::RParen | TokenKind::RBracket) {
                return Err(self.unexpected(token).expected(close_text));
            }
            items.push(self.node()?);
        }
    }

    fn make(&mut self, span: TextRange, kind: NodeKind) -> Node {
        Node::new(self.ids.fresh(), span, kind)
    }
}

fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => return Err(format!("unknown escape `\\{other}`")),
            None => return Err("dangling `\\`".to_string()),
        }
    }
    Ok(out)
}
