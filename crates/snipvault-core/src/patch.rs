//! Unified patch line classifier.

use serde::{Deserialize, Serialize};

/// Kind of a rendered patch line. Hunk headers render as context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Context,
    Addition,
    Deletion,
}

/// One typed line of a unified patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchLine {
    pub kind: LineKind,
    /// Line text without its prefix (the full header for `@@` lines).
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_line: Option<u32>,
}

impl PatchLine {
    pub fn is_header(&self) -> bool {
        self.kind == LineKind::Context
            && self.old_line.is_none()
            && self.new_line.is_none()
            && self.content.starts_with("@@")
    }
}

/// Start lines from a `@@ -a,b +c,d @@` header.
fn hunk_start(header: &str) -> Option<(u32, u32)> {
    let mut parts = header.split_whitespace().skip(1);
    let old = parts.next()?.strip_prefix('-')?;
    let new = parts.next()?.strip_prefix('+')?;
    let start = |range: &str| range.split(',').next()?.parse::<u32>().ok();
    Some((start(old)?, start(new)?))
}

/// Classify each line of a patch by its first character.
///
/// Lines that match none of `@@`, ` `, `+`, `-` (such as the
/// "\ No newline at end of file" marker) are dropped.
pub fn parse_patch(patch: &str) -> Vec<PatchLine> {
    let mut lines = Vec::new();
    // `None` once a counter would pass `u32::MAX`.
    let mut old_line = Some(0u32);
    let mut new_line = Some(0u32);
    let step = |n: Option<u32>| n.and_then(|n| n.checked_add(1));

    for raw in patch.lines() {
        if raw.starts_with("@@") {
            if let Some((old, new)) = hunk_start(raw) {
                old_line = Some(old);
                new_line = Some(new);
            }
            lines.push(PatchLine {
                kind: LineKind::Context,
                content: raw.to_string(),
                old_line: None,
                new_line: None,
            });
            continue;
        }

        let mut chars = raw.chars();
        let line = match chars.next() {
            Some(' ') => {
                let line = PatchLine {
                    kind: LineKind::Context,
                    content: chars.as_str().to_string(),
                    old_line,
                    new_line,
                };
                old_line = step(old_line);
                new_line = step(new_line);
                line
            }
            Some('+') => {
                let line = PatchLine {
                    kind: LineKind::Addition,
                    content: chars.as_str().to_string(),
                    old_line: None,
                    new_line,
                };
                new_line = step(new_line);
                line
            }
            Some('-') => {
                let line = PatchLine {
                    kind: LineKind::Deletion,
                    content: chars.as_str().to_string(),
                    old_line,
                    new_line: None,
                };
                old_line = step(old_line);
                line
            }
            _ => continue,
        };
        lines.push(line);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_content(lines: &[PatchLine]) -> Vec<(LineKind, &str)> {
        lines.iter().map(|l| (l.kind, l.content.as_str())).collect()
    }

    #[test]
    fn test_four_line_patch() {
        let lines = parse_patch("@@ -1,2 +1,3 @@\n unchanged\n-removed line\n+added line");
        assert_eq!(
            kinds_and_content(&lines),
            vec![
                (LineKind::Context, "@@ -1,2 +1,3 @@"),
                (LineKind::Context, "unchanged"),
                (LineKind::Deletion, "removed line"),
                (LineKind::Addition, "added line"),
            ]
        );
        assert!(lines[0].is_header());
    }

    #[test]
    fn test_line_numbers_follow_hunks() {
        let patch = "@@ -10,3 +20,3 @@ fn main\n a\n-b\n+c\n d\n@@ -40 +50 @@\n-x";
        let lines = parse_patch(patch);
        let numbers: Vec<_> = lines.iter().map(|l| (l.old_line, l.new_line)).collect();
        assert_eq!(
            numbers,
            vec![
                (None, None),
                (Some(10), Some(20)),
                (Some(11), None),
                (None, Some(21)),
                (Some(12), Some(22)),
                (None, None),
                (Some(40), None),
            ]
        );
    }

    #[test]
    fn test_unknown_lines_are_dropped() {
        let lines = parse_patch("@@ -1 +1 @@\n-a\n+b\n\\ No newline at end of file\n\ngarbage");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_empty_patch() {
        assert!(parse_patch("").is_empty());
    }

    #[test]
    fn test_line_numbers_stop_at_u32_max() {
        let lines = parse_patch("@@ -4294967295 +1 @@\n ctx\n more\n-gone");
        let numbers: Vec<_> = lines.iter().map(|l| (l.old_line, l.new_line)).collect();
        assert_eq!(
            numbers,
            vec![
                (None, None),
                (Some(u32::MAX), Some(1)),
                (None, Some(2)),
                (None, None),
            ]
        );
        assert_eq!(lines[3].kind, LineKind::Deletion);
        assert!(!lines[2].is_header());
    }

    #[test]
    fn test_parsing_is_stable() {
        let patch = "@@ -1,2 +1,2 @@\n same\n-old\n+new";
        assert_eq!(parse_patch(patch), parse_patch(patch));
    }
}
