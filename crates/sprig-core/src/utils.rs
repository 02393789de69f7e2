const GO_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

pub fn is_go_keyword(s: &str) -> bool {
    GO_KEYWORDS.contains(&s)
}

/// Rewrite a Sprig identifier into the Go identifier alphabet.
///
/// Hyphens become underscores; names colliding with a Go keyword get a
/// trailing underscore.
///
/// # Examples
/// ```
/// use sprig_core::utils::go_ident;
/// assert_eq!(go_ident("to-upper"), "to_upper");
/// assert_eq!(go_ident("type"), "type_");
/// ```
pub fn go_ident(name: &str) -> String {
    let ident = name.replace('-', "_");
    if is_go_keyword(&ident) {
        return format!("{ident}_");
    }
    ident
}

/// Quote a string as a Go interpreted string literal.
///
/// # Examples
/// ```
/// use sprig_core::utils::go_quote;
/// assert_eq!(go_quote("a\"b"), r#""a\"b""#);
/// ```
pub fn go_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
