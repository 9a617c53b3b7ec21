//! Shallow sanity checks for extracted code.
//!
//! These are character counts, not a lexer. Braces or parentheses inside
//! string literals, character literals and comments are counted like any
//! other, so `printf("{");` is reported as unbalanced and a body whose
//! literals happen to cancel out passes. Treat a passing outcome as "not
//! obviously truncated", never as "syntactically valid".

use crate::data::ValidationOutcome;

const FENCE_MARKER: &str = "```";

/// Checks one code body. Nothing calls this automatically; callers decide
/// whether a failing outcome rejects the file.
pub fn validate(code: &str) -> ValidationOutcome {
    if code.trim().is_empty() {
        return ValidationOutcome::fail("Empty code");
    }

    let braces = imbalance(code, '{', '}');
    if braces != 0 {
        return ValidationOutcome::fail(format!("Unbalanced braces: {:+}", braces));
    }

    let parens = imbalance(code, '(', ')');
    if parens != 0 {
        return ValidationOutcome::fail(format!("Unbalanced parentheses: {:+}", parens));
    }

    if code.contains(FENCE_MARKER) {
        return ValidationOutcome::fail("Code contains markdown fence markers");
    }

    ValidationOutcome::pass()
}

/// Count of `open` minus count of `close`
fn imbalance(code: &str, open: char, close: char) -> i64 {
    code.chars().fold(0i64, |acc, c| {
        if c == open {
            acc + 1
        } else if c == close {
            acc - 1
        } else {
            acc
        }
    })
}
