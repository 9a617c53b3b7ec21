use crate::data::{is_source_filename, CodeBlock};
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// Language tags that mark a fence as native source
const ACCEPTED_LANGUAGES: &[&str] = &["c", "h", "cc", "cpp", "c++", "cxx", "hpp", "objc"];

/// A paired fence found in the text, regardless of its language tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedRegion {
    /// Byte range from the start of the opening line to the end of the closing line
    pub span: Range<usize>,
    /// Everything after the fence marker on the opening line, trimmed
    pub info: String,
    /// Text between the fence lines, trimmed
    pub body: String,
}

#[derive(Debug, PartialEq, Eq)]
enum FenceTag {
    Accepted { hint: Option<String> },
    Rejected,
}

struct Line<'a> {
    start: usize,
    end: usize,
    text: &'a str,
}

fn opening_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[ \t]*(`{3,}|~{3,})(.*)$").expect("valid regex"))
}

/// Returns the code blocks in `text` that look like native source, in document order.
///
/// Fences tagged with other languages are skipped, as are blocks whose body is blank.
/// An opening fence with no closing marker before the end of the text produces nothing.
pub fn scan(text: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();

    for region in scan_regions(text) {
        let hint = match classify_info(&region.info) {
            FenceTag::Accepted { hint } => hint,
            FenceTag::Rejected => {
                tracing::trace!(info = %region.info, "ignoring fence with unrelated language tag");
                continue;
            }
        };

        if region.body.is_empty() {
            tracing::trace!("ignoring empty code fence");
            continue;
        }

        blocks.push(CodeBlock::new(hint, region.body));
    }

    blocks
}

/// Returns every paired fence in `text`, whatever its language tag.
pub fn scan_regions(text: &str) -> Vec<FencedRegion> {
    let lines = split_lines(text);
    let mut regions = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        let Some((marker, info)) = parse_opening(lines[idx].text) else {
            idx += 1;
            continue;
        };

        let Some((close_idx, body_end)) = find_closing(&lines[idx + 1..], marker)
            .map(|(offset, body_end)| (idx + 1 + offset, body_end))
        else {
            // unpaired opener; later fences may still pair up
            idx += 1;
            continue;
        };

        let body_start = lines[idx].end;
        regions.push(FencedRegion {
            span: lines[idx].start..lines[close_idx].end,
            info: info.trim().to_string(),
            body: text[body_start..body_end].trim().to_string(),
        });

        idx = close_idx + 1;
    }

    regions
}

fn split_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for raw in text.split_inclusive('\n') {
        let start = offset;
        offset += raw.len();
        lines.push(Line {
            start,
            end: offset,
            text: raw.trim_end_matches(['\n', '\r']),
        });
    }
    lines
}

/// Returns the fence marker and the info string of an opening fence line.
fn parse_opening(line: &str) -> Option<(&str, &str)> {
    let caps = opening_fence_re().captures(line)?;
    let marker = caps.get(1)?.as_str();
    let info = caps.get(2).map(|m| m.as_str()).unwrap_or("");

    // ```foo``` on one line is inline code, not a fence
    if marker.starts_with('`') && info.contains('`') {
        return None;
    }

    Some((marker, info))
}

/// Finds the first line that closes the fence and the byte offset where the body ends.
///
/// A closer is either a line made only of the fence character, or a fence run
/// glued to the end of a code line (`return 0;}```).
fn find_closing(lines: &[Line<'_>], opener: &str) -> Option<(usize, usize)> {
    lines.iter().enumerate().find_map(|(offset, line)| {
        if is_closing(line.text, opener) {
            return Some((offset, line.start));
        }
        trailing_closer(line.text, opener).map(|at| (offset, line.start + at))
    })
}

fn is_closing(line: &str, opener: &str) -> bool {
    let trimmed = line.trim();
    let Some(fence_char) = opener.chars().next() else {
        return false;
    };
    trimmed.len() >= opener.len() && trimmed.chars().all(|c| c == fence_char)
}

/// Byte offset of a fence run that follows code on the same line.
///
/// Runs at the start of a line are left alone so a stray ```` ```c ```` stays in the body.
fn trailing_closer(line: &str, opener: &str) -> Option<usize> {
    let fence = *opener.as_bytes().first()?;
    let bytes = line.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] != fence {
            pos += 1;
            continue;
        }
        let run_end = bytes[pos..]
            .iter()
            .position(|&b| b != fence)
            .map_or(bytes.len(), |n| pos + n);
        if run_end - pos >= opener.len() && !line[..pos].trim().is_empty() {
            return Some(pos);
        }
        pos = run_end;
    }

    None
}

fn classify_info(info: &str) -> FenceTag {
    let mut tokens = info.split_whitespace();
    let Some(first) = tokens.next() else {
        return FenceTag::Accepted { hint: None };
    };

    if is_accepted_language(first) {
        let hint = tokens.next().map(clean_token).filter(|t| is_source_filename(t));
        return FenceTag::Accepted {
            hint: hint.map(str::to_string),
        };
    }

    // ```zone.c with no language tag
    let bare = clean_token(first);
    if is_source_filename(bare) {
        return FenceTag::Accepted {
            hint: Some(bare.to_string()),
        };
    }

    FenceTag::Rejected
}

fn is_accepted_language(tag: &str) -> bool {
    ACCEPTED_LANGUAGES
        .iter()
        .any(|lang| lang.eq_ignore_ascii_case(tag))
}

fn clean_token(token: &str) -> &str {
    token.trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | ':' | ',' | '(' | ')' | '[' | ']'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_untagged_and_c_blocks_in_order() {
        let text = "Intro\n```\nint a;\n```\nmiddle\n```c\nint b;\n```\n";
        let blocks = scan(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].body, "int a;");
        assert_eq!(blocks[1].body, "int b;");
        assert!(blocks.iter().all(|b| b.hint.is_none()));
    }

    #[test]
    fn captures_filename_after_language_tag() {
        let blocks = scan("```c zone.c\nvoid Z_Free(void *p) {}\n```");
        assert_eq!(blocks[0].hint.as_deref(), Some("zone.c"));
    }

    #[test]
    fn bare_filename_on_fence_is_a_hint() {
        let blocks = scan("```cmd.c\nvoid Cmd_Init(void) {}\n```");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].hint.as_deref(), Some("cmd.c"));
    }

    #[test]
    fn non_source_token_after_tag_is_not_a_hint() {
        let blocks = scan("```cpp title\nint x;\n```");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].hint, None);
    }

    #[test]
    fn skips_unrelated_languages() {
        let text = "```bash\nmake -j8\n```\n```json\n{\"a\": 1}\n```\n```python\nprint(1)\n```";
        assert!(scan(text).is_empty());
    }

    #[test]
    fn rejected_fence_does_not_leak_its_closer() {
        let text = "```sh\nls\n```\n```c\nint x;\n```";
        let blocks = scan(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body, "int x;");
    }

    #[test]
    fn discards_blank_bodies() {
        assert!(scan("```c\n   \n\n```").is_empty());
    }

    #[test]
    fn unterminated_fence_yields_nothing() {
        assert!(scan("Here:\n```c\nint main(void) {\n  return 0;\n").is_empty());
    }

    #[test]
    fn inner_opener_with_info_stays_in_body() {
        let text = "```c\nint a;\n```c\nint b;\n```";
        let blocks = scan(text);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].body.contains("```c"));
    }

    #[test]
    fn tilde_fences_need_matching_closer() {
        let text = "~~~c\nint a;\n```\nstill inside\n~~~";
        let blocks = scan(text);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].body.contains("still inside"));
    }

    #[test]
    fn inline_triple_backticks_are_not_fences() {
        assert!(scan("```c code``` here\nint x;\n```").is_empty());
    }

    #[test]
    fn regions_cover_fence_lines() {
        let text = "a\n```sh\nls\n```\nb";
        let regions = scan_regions(text);
        assert_eq!(regions.len(), 1);
        assert_eq!(&text[regions[0].span.clone()], "```sh\nls\n```\n");
        assert_eq!(regions[0].info, "sh");
    }

    #[test]
    fn closer_glued_to_last_code_line() {
        let blocks = scan("Here:\n```c\nint main(){return 0;}```\n\nThanks!");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body, "int main(){return 0;}");
    }

    #[test]
    fn glued_closer_ignores_trailing_text() {
        let text = "```c\nint a;\n```\n```c\nint b;``` trailing\n";
        let blocks = scan(text);
        let bodies: Vec<_> = blocks.iter().map(|b| b.body.as_str()).collect();
        assert_eq!(bodies, vec!["int a;", "int b;"]);
    }

    #[test]
    fn glued_closer_must_match_opener_length() {
        let blocks = scan("````c\nint a; ```\nint b;````\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body, "int a; ```\nint b;");
    }

    #[test]
    fn glued_closer_span_ends_with_its_line() {
        let text = "```sh\nls```\nafter";
        let regions = scan_regions(text);
        assert_eq!(&text[regions[0].span.clone()], "```sh\nls```\n");
        assert_eq!(regions[0].body, "ls");
    }

    #[test]
    fn handles_crlf_line_endings() {
        let blocks = scan("```c\r\nint x;\r\n```\r\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body, "int x;");
    }
}
