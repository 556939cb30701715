//! Parsing of the model's review output.
//!
//! The model is asked for `FILE:`/`LINE:`/`SEVERITY:`/`COMMENT:` blocks
//! separated by `---` lines. Malformed blocks are skipped individually;
//! if nothing parses, the raw text is preserved as a fallback so the
//! review is never silently lost.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "critical" => Severity::High,
            "low" | "info" | "nit" => Severity::Low,
            _ => Severity::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Severity::High => "🔴",
            Severity::Medium => "🟡",
            Severity::Low => "🟢",
        }
    }
}

/// One inline finding anchored to a file and line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewFinding {
    pub path: String,
    pub line: u64,
    pub severity: Severity,
    pub body: String,
}

/// Parse result for a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedReview {
    /// At least one block parsed; these become inline comments.
    Structured(Vec<ReviewFinding>),
    /// Nothing matched the contract; the raw reply is posted as-is.
    Fallback(String),
}

pub fn parse_review(raw: &str) -> ParsedReview {
    let text = strip_outer_fence(raw);
    if text.trim().eq_ignore_ascii_case("no findings") {
        return ParsedReview::Structured(Vec::new());
    }

    let mut findings = Vec::new();
    for block in split_blocks(text) {
        if let Some(f) = parse_block(block) {
            findings.push(f);
        }
    }

    if findings.is_empty() {
        ParsedReview::Fallback(text.trim().to_string())
    } else {
        ParsedReview::Structured(findings)
    }
}

/// Models sometimes wrap the whole reply in a code fence; unwrap it.
fn strip_outer_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line.
    match inner.split_once('\n') {
        Some((first, body)) if !first.trim().contains(' ') => body,
        _ => inner,
    }
}

fn split_blocks(text: &str) -> impl Iterator<Item = &str> {
    let mut blocks = Vec::new();
    let mut start = 0usize;
    let mut offset = 0usize;
    for line in text.split_inclusive('\n') {
        if line.trim() == "---" {
            blocks.push(&text[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    if start < text.len() {
        blocks.push(&text[start..]);
    }
    blocks.into_iter().filter(|b| !b.trim().is_empty())
}

fn parse_block(block: &str) -> Option<ReviewFinding> {
    let mut path: Option<String> = None;
    let mut line_no: Option<u64> = None;
    let mut severity = Severity::Medium;
    let mut body = String::new();
    let mut in_comment = false;

    for line in block.lines() {
        if in_comment {
            body.push_str(line);
            body.push('\n');
            continue;
        }
        let trimmed = line.trim();
        if let Some(v) = trimmed.strip_prefix("FILE:") {
            path = Some(v.trim().trim_matches('`').to_string());
        } else if let Some(v) = trimmed.strip_prefix("LINE:") {
            line_no = v.trim().parse().ok();
        } else if let Some(v) = trimmed.strip_prefix("SEVERITY:") {
            severity = Severity::parse(v);
        } else if let Some(v) = trimmed.strip_prefix("COMMENT:") {
            in_comment = true;
            let inline = v.trim();
            if !inline.is_empty() {
                body.push_str(inline);
                body.push('\n');
            }
        }
    }

    let path = path?;
    let line = line_no?;
    let body = body.trim().to_string();
    if path.is_empty() || line == 0 || body.is_empty() {
        return None;
    }
    Some(ReviewFinding {
        path,
        line,
        severity,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = "\
FILE: src/main.rs
LINE: 12
SEVERITY: high
COMMENT:
This unwraps a user-controlled value and will panic on bad input.
---
FILE: src/config.rs
LINE: 4
SEVERITY: low
COMMENT: Prefer a constant here.
---
";

    #[test]
    fn parses_well_formed_blocks() {
        let ParsedReview::Structured(findings) = parse_review(REPLY) else {
            panic!("expected structured review");
        };
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].path, "src/main.rs");
        assert_eq!(findings[0].line, 12);
        assert_eq!(findings[0].severity, Severity::High);
        assert!(findings[0].body.starts_with("This unwraps"));
        assert_eq!(findings[1].severity, Severity::Low);
        assert_eq!(findings[1].body, "Prefer a constant here.");
    }

    #[test]
    fn skips_malformed_blocks_but_keeps_the_rest() {
        let reply = "\
FILE: a.rs
SEVERITY: high
COMMENT: missing the line marker
---
FILE: b.rs
LINE: 3
COMMENT: fine
---
";
        let ParsedReview::Structured(findings) = parse_review(reply) else {
            panic!("expected structured review");
        };
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path, "b.rs");
        assert_eq!(findings[0].severity, Severity::Medium);
    }

    #[test]
    fn unstructured_reply_falls_back_to_raw_text() {
        let reply = "The change looks reasonable overall, though the error\nhandling in the loader could be tightened.";
        assert_eq!(
            parse_review(reply),
            ParsedReview::Fallback(reply.to_string())
        );
    }

    #[test]
    fn no_findings_sentinel_yields_an_empty_structured_review() {
        assert_eq!(
            parse_review("NO FINDINGS\n"),
            ParsedReview::Structured(Vec::new())
        );
    }

    #[test]
    fn outer_code_fence_is_stripped() {
        let fenced = format!("```\n{REPLY}```");
        let ParsedReview::Structured(findings) = parse_review(&fenced) else {
            panic!("expected structured review");
        };
        assert_eq!(findings.len(), 2);
    }

    #[test]
    fn unknown_severity_defaults_to_medium() {
        assert_eq!(Severity::parse("blocker?"), Severity::Medium);
        assert_eq!(Severity::parse("HIGH"), Severity::High);
        assert_eq!(Severity::parse(" nit "), Severity::Low);
    }

    #[test]
    fn zero_line_numbers_are_rejected() {
        let reply = "FILE: a.rs\nLINE: 0\nCOMMENT: bad anchor\n";
        assert!(matches!(parse_review(reply), ParsedReview::Fallback(_)));
    }
}
