use super::fence_scanner::scan_regions;
use crate::data::{SectionMatch, FILENAME_PATTERN};
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// Characters of context kept on each side of a mention
const CONTEXT_WINDOW: usize = 100;

fn section_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            r"(?i)(?:\b(?:here\s+is|here's|the|modified|fixed|updated|corrected|complete|new)\s+)*[`*_]*({FILENAME_PATTERN})[`*_]*\s*:"
        );
        Regex::new(&pattern).expect("valid regex")
    })
}

/// Finds prose lines that introduce a file, such as "Here is the updated zone.c:".
///
/// Text inside code fences is skipped. Each snippet is up to [`CONTEXT_WINDOW`]
/// characters either side of the mention, for display only.
pub fn locate_sections(text: &str) -> Vec<SectionMatch> {
    let fenced: Vec<Range<usize>> = scan_regions(text).into_iter().map(|r| r.span).collect();

    section_re()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if fenced.iter().any(|span| span.contains(&whole.start())) {
                return None;
            }
            let name = caps.get(1)?;
            Some(SectionMatch {
                filename: name.as_str().to_string(),
                snippet: snippet_around(text, name.range()).to_string(),
            })
        })
        .collect()
}

fn snippet_around(text: &str, mention: Range<usize>) -> &str {
    let start = text[..mention.start]
        .char_indices()
        .rev()
        .nth(CONTEXT_WINDOW - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let end = text[mention.end..]
        .char_indices()
        .nth(CONTEXT_WINDOW)
        .map(|(idx, _)| mention.end + idx)
        .unwrap_or(text.len());
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_descriptor_sentences_in_order() {
        let text = "Here is the updated zone.c:\n```c\nint a;\n```\nAnd the fixed cmd.h:\n```c\nint b;\n```";
        let found = locate_sections(text);
        let names: Vec<_> = found.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(names, vec!["zone.c", "cmd.h"]);
    }

    #[test]
    fn accepts_markdown_emphasis_around_filename() {
        let found = locate_sections("**host.c**:\nsome text");
        assert_eq!(found[0].filename, "host.c");
    }

    #[test]
    fn ignores_mentions_inside_fences() {
        let text = "```c\n// see world.c:\nint a;\n```";
        assert!(locate_sections(text).is_empty());
    }

    #[test]
    fn requires_trailing_colon() {
        assert!(locate_sections("I changed view.c and nothing else.").is_empty());
    }

    #[test]
    fn snippet_is_clipped_to_document() {
        let found = locate_sections("sv_main.c:");
        assert_eq!(found[0].snippet, "sv_main.c:");
    }

    #[test]
    fn snippet_window_is_symmetric() {
        let text = format!("{} model.c:{}", "a".repeat(150), "b".repeat(150));
        let found = locate_sections(&text);
        let snippet = &found[0].snippet;
        assert_eq!(snippet.len(), 100 + "model.c".len() + 100);
        assert!(snippet.starts_with('a'));
        assert!(snippet.ends_with('b'));
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        let text = format!("{}keys.c:", "é".repeat(120));
        let found = locate_sections(&text);
        assert_eq!(found[0].snippet.chars().count(), 100 + "keys.c".len() + 1);
    }
}
