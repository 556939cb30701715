//! Minimal unified-diff helpers for patch text from the files API.
//!
//! GitHub's per-file `patch` field contains only `@@` hunks, no file
//! headers, so this scanner only needs the hunk positions plus a couple of
//! heuristics for binary patches and fence-escaping.

/// New-file span covered by one `@@` hunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkSpan {
    /// 1-based first line of the hunk in the new file.
    pub new_start: u32,
    /// Number of new-file lines the hunk covers (0 for pure deletions).
    pub new_lines: u32,
}

/// Extracts new-file spans from every `@@` header in a patch.
/// Lines that are not hunk headers are ignored.
pub fn hunk_spans(patch: &str) -> Vec<HunkSpan> {
    let mut spans = Vec::new();
    for line in patch.lines() {
        if !line.starts_with("@@") {
            continue;
        }
        if let Some((_, right)) = line
            .trim_start_matches('@')
            .trim_end_matches('@')
            .trim()
            .split_once('+')
        {
            let (start, len) = split_nums(right.split(' ').next().unwrap_or(right));
            spans.push(HunkSpan {
                new_start: start,
                new_lines: len,
            });
        }
    }
    spans
}

/// Splits "12,7" or "12" into (start, len). A missing length means 1.
fn split_nums(s: &str) -> (u32, u32) {
    let s = s.trim();
    if let Some((a, b)) = s.split_once(',') {
        (a.parse().unwrap_or(0), b.parse().unwrap_or(0))
    } else {
        (s.parse().unwrap_or(0), 1)
    }
}

/// Simple heuristic to detect binary patches or messages in unified diff.
pub fn looks_like_binary_patch(s: &str) -> bool {
    s.contains("GIT binary patch")
        || s.starts_with("Binary files ")
        || (s.starts_with("Files ") && s.contains(" differ"))
}

/// Breaks triple backticks inside a patch so it cannot escape the prompt's
/// code fences.
pub fn defang_fences(patch: &str) -> String {
    patch.replace("```", "`` `")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers_with_and_without_lengths() {
        let patch = "@@ -1,4 +2,6 @@ fn main() {\n+a\n context\n@@ -20 +30 @@\n-b\n";
        let spans = hunk_spans(patch);
        assert_eq!(
            spans,
            vec![
                HunkSpan {
                    new_start: 2,
                    new_lines: 6
                },
                HunkSpan {
                    new_start: 30,
                    new_lines: 1
                },
            ]
        );
    }

    #[test]
    fn ignores_non_header_lines() {
        let patch = "+added\n-removed\n context\n\\ No newline at end of file\n";
        assert!(hunk_spans(patch).is_empty());
    }

    #[test]
    fn binary_heuristics() {
        assert!(looks_like_binary_patch("Binary files a/x.png and b/x.png differ"));
        assert!(looks_like_binary_patch("GIT binary patch\nliteral 5"));
        assert!(!looks_like_binary_patch("@@ -1 +1 @@\n-a\n+b\n"));
    }

    #[test]
    fn fences_are_defanged() {
        let patch = "+```rust\n+let x = 1;\n+```\n";
        let safe = defang_fences(patch);
        assert!(!safe.contains("```"));
    }
}
