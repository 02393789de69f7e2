//! Structural constant folding over literal sequences and integers.
//!
//! Only shapes whose value is visible in the tree are folded: `true`,
//! `false`, `(empty? [..])`, and comparisons between integer literals and
//! `(len [..])`.

use crate::syntax::Node;

/// Length of a literal sequence.
pub(super) fn literal_len(node: &Node) -> Option<usize> {
    node.as_array().map(<[Node]>::len)
}

pub(super) fn fold_int(node: &Node) -> Option<i64> {
    if let Some(n) = node.as_int() {
        return Some(n);
    }
    match node.as_list()? {
        [head, seq] if head.as_symbol() == Some("len") => i64::try_from(literal_len(seq)?).ok(),
        _ => None,
    }
}

pub(super) fn fold_bool(node: &Node) -> Option<bool> {
    match node.as_symbol() {
        Some("true") => return Some(true),
        Some("false") => return Some(false),
        _ => {}
    }
    let (head, args) = node.as_list()?.split_first()?;
    match (head.as_symbol()?, args) {
        ("empty?", [seq]) => literal_len(seq).map(|len| len == 0),
        (op, [left, right]) => {
            let (left, right) = (fold_int(left)?, fold_int(right)?);
            match op {
                "=" => Some(left == right),
                "!=" => Some(left != right),
                "<" => Some(left < right),
                ">" => Some(left > right),
                "<=" => Some(left <= right),
                ">=" => Some(left >= right),
                _ => None,
            }
        }
        _ => None,
    }
}
