//! Special form names, operator tables and import-form parsing shared by the
//! analyzer, the resolver and the generator.

use rowan::TextRange;

use crate::syntax::Node;

pub const SPECIAL_FORMS: &[&str] = &[
    "def", "if", "fn", "do", "map", "record", ".", "get", "slice", "len", "append", "empty?",
    "import", "export", "macro",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    /// `+ - * /`: at least two numeric operands of one type.
    Arithmetic,
    /// `< > <= >=`: exactly two numeric operands, yields `bool`.
    Relational,
    /// `= !=`: exactly two operands of identical type, yields `bool`.
    Equality,
    /// `and or`: at least two `bool` operands.
    Logical,
    /// `not`: exactly one `bool` operand.
    Not,
}

pub fn operator_kind(op: &str) -> Option<OperatorKind> {
    Some(match op {
        "+" | "-" | "*" | "/" => OperatorKind::Arithmetic,
        "<" | ">" | "<=" | ">=" => OperatorKind::Relational,
        "=" | "!=" => OperatorKind::Equality,
        "and" | "or" => OperatorKind::Logical,
        "not" => OperatorKind::Not,
        _ => return None,
    })
}

/// Go spelling of a binary operator.
pub fn go_operator(op: &str) -> &str {
    match op {
        "=" => "==",
        "and" => "&&",
        "or" => "||",
        _ => op,
    }
}

/// Special forms and operators cannot be redefined or used as macro stems.
pub fn is_reserved(name: &str) -> bool {
    SPECIAL_FORMS.contains(&name) || operator_kind(name).is_some()
}

pub fn is_keyword_literal(name: &str) -> bool {
    matches!(name, "true" | "false" | "nil")
}

/// `name!` invokes a macro.
pub fn is_macro_name(name: &str) -> bool {
    name.len() > 1 && name.ends_with('!')
}

/// `:name` symbol literal.
pub fn is_symbol_literal(name: &str) -> bool {
    name.len() > 1 && name.starts_with(':')
}

/// Split `pkg/member` into its parts. The division operator is not a
/// qualified name.
pub fn split_qualified(name: &str) -> Option<(&str, &str)> {
    let (qualifier, member) = name.split_once('/')?;
    if qualifier.is_empty() || member.is_empty() {
        return None;
    }
    Some((qualifier, member))
}

/// One path named by an `import` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub path: String,
    pub alias: Option<String>,
    pub span: TextRange,
}

impl ImportSpec {
    /// Name the importing code uses: the alias, else the last path segment.
    pub fn qualifier(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => self.path.rsplit('/').next().unwrap_or(&self.path),
        }
    }
}

/// Parse the operands of `(import "path")` or
/// `(import [["path" alias] "other/path" ...])`.
pub fn import_specs(args: &[Node]) -> Result<Vec<ImportSpec>, String> {
    let [arg] = args else {
        return Err(format!("expected one operand, found {}", args.len()));
    };
    if let Some(path) = arg.as_str() {
        return Ok(vec![spec(path, None, arg.span)?]);
    }
    let Some(items) = arg.as_array() else {
        return Err("expected a path string or a `[...]` vector of imports".to_string());
    };

    let mut specs = Vec::with_capacity(items.len());
    for item in items {
        if let Some(path) = item.as_str() {
            specs.push(spec(path, None, item.span)?);
            continue;
        }
        match item.as_array() {
            Some([path, alias]) => {
                let path = path
                    .as_str()
                    .ok_or_else(|| "import path must be a string".to_string())?;
                let alias = alias
                    .as_symbol()
                    .filter(|a| split_qualified(a).is_none())
                    .ok_or_else(|| "import alias must be a plain symbol".to_string())?;
                specs.push(spec(path, Some(alias), item.span)?);
            }
            _ => return Err("each import must be `\"path\"` or `[\"path\" alias]`".to_string()),
        }
    }
    Ok(specs)
}

fn spec(path: &str, alias: Option<&str>, span: TextRange) -> Result<ImportSpec, String> {
    if path.is_empty() {
        return Err("import path is empty".to_string());
    }
    Ok(ImportSpec {
        path: path.to_string(),
        alias: alias.map(str::to_string),
        span,
    })
}
