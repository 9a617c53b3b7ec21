use crate::data::FILENAME_PATTERN;
use regex::Regex;
use std::sync::OnceLock;

/// How many leading lines of a body may declare its filename
const HEADER_LINES: usize = 3;

/// Comment idioms tried on each line, strictest first
fn header_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // /* zone.c */  or  /* File: zone.c */
            format!(r"^\s*/\*+\s*(?i:file\s*:\s*)?({FILENAME_PATTERN})\s*\*+/"),
            // // zone.c  or  // file: zone.c
            format!(r"^\s*//+\s*(?i:file\s*:\s*)?({FILENAME_PATTERN})\s*$"),
            // any filename somewhere after a comment marker on the same line
            format!(r"(?:/\*|//|^\s*\*)[^\n]*?\b({FILENAME_PATTERN})"),
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
    })
}

/// Looks for a filename declared in a comment on one of the first three lines of `body`.
///
/// The first line that yields a filename wins; later lines are not consulted.
/// Returns `None` when nothing is declared.
pub fn inspect(body: &str) -> Option<String> {
    body.lines()
        .take(HEADER_LINES)
        .find_map(filename_in_comment)
}

fn filename_in_comment(line: &str) -> Option<String> {
    header_patterns().iter().find_map(|re| {
        re.captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}
