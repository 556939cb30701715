//! Prompt composition with a hard length ceiling.
//!
//! Sections are assembled per file in collection order; when the composed
//! text would exceed `MAX_PROMPT_LENGTH`, whole file sections are evicted
//! largest-first. A section is never cut mid-content, so whatever remains
//! is always a well-formed diff block.

use crate::collect::{ChangedFile, CollectedChanges, FileContext};
use crate::diff::defang_fences;

/// Patches longer than this are replaced by a placeholder note.
const MAX_PATCH_CHARS: usize = 5_000;

/// Language whose directive is omitted (the model's default).
const DEFAULT_LANGUAGE: &str = "english";

const INSTRUCTIONS: &str = "\
You are a senior software engineer reviewing a pull request.
Analyze the code changes below. Look for:
1. Bugs: logic errors, edge cases, likely runtime failures.
2. Security problems: injection, unsafe configuration, leaked secrets.
3. Readability and maintainability issues.
4. Violations of common best practices for the language or framework.
Be specific and actionable; reference files and line numbers from the
numbered context where available. If the code is fine, say so briefly.
";

const OUTPUT_CONTRACT: &str = "\
Report each finding as one block in exactly this format, blocks separated
by a line containing only three dashes:

FILE: <repo-relative path>
LINE: <1-based line number in the new version of the file>
SEVERITY: high | medium | low
COMMENT:
<your feedback in Markdown, may span multiple lines>
---

Emit nothing before the first block and nothing after the last separator.
If there is nothing worth reporting, reply with the single line:
NO FINDINGS
";

/// Final composed prompt plus the files evicted to fit the ceiling.
#[derive(Debug, Clone)]
pub struct ComposedPrompt {
    pub text: String,
    /// Paths whose sections were evicted by the length ceiling.
    pub evicted: Vec<String>,
}

/// Renders the review prompt, enforcing `max_len` (in characters) by
/// whole-section eviction, largest content first. `custom_instructions`
/// (from the repository's own config) replace the built-in instructions;
/// the output contract is appended either way so replies stay parseable.
pub fn compose_prompt(
    changes: &CollectedChanges,
    output_language: &str,
    max_len: usize,
    custom_instructions: Option<&str>,
) -> ComposedPrompt {
    let mut base = String::from(custom_instructions.unwrap_or(INSTRUCTIONS));
    if !base.ends_with('\n') {
        base.push('\n');
    }
    if let Some(directive) = language_directive(output_language) {
        base.push('\n');
        base.push_str(&directive);
        base.push('\n');
    }
    base.push('\n');
    base.push_str(OUTPUT_CONTRACT);
    base.push_str("\n# Changed files\n\n");

    let mut sections: Vec<(String, String)> = changes
        .files
        .iter()
        .map(|f| (f.path.clone(), file_section(f)))
        .collect();

    let note = "_Some changed files were omitted to fit the size limit._\n";
    let base_chars = base.chars().count();
    let note_chars = note.chars().count();
    let mut evicted: Vec<String> = Vec::new();

    loop {
        let sections_chars: usize = sections.iter().map(|(_, s)| s.chars().count()).sum();
        let note_needed = !evicted.is_empty() || !changes.omitted.is_empty();
        let total = base_chars + sections_chars + if note_needed { note_chars } else { 0 };
        if total <= max_len || sections.is_empty() {
            break;
        }
        let (largest, _) = sections
            .iter()
            .enumerate()
            .max_by_key(|(_, (_, s))| s.chars().count())
            .map(|(i, (_, s))| (i, s.chars().count()))
            .unwrap_or((0, 0));
        let (path, _) = sections.remove(largest);
        evicted.push(path);
    }

    let mut text = base;
    for (_, section) in &sections {
        text.push_str(section);
    }
    if !evicted.is_empty() || !changes.omitted.is_empty() {
        text.push_str(note);
    }

    ComposedPrompt { text, evicted }
}

/// The directive appended for non-default output languages. The default
/// (or unset) language yields no directive at all, keeping the prompt
/// byte-identical to the unconfigured case.
fn language_directive(output_language: &str) -> Option<String> {
    let lang = output_language.trim();
    if lang.is_empty() || lang.eq_ignore_ascii_case(DEFAULT_LANGUAGE) {
        return None;
    }
    Some(format!(
        "Write every COMMENT body in {lang}. Keep the FILE/LINE/SEVERITY markers in English."
    ))
}

/// One self-contained section per changed file: header, diff, context.
fn file_section(file: &ChangedFile) -> String {
    let mut s = format!("### File: {} ({})\n\n", file.path, file.kind.as_str());

    if file.patch.is_empty() {
        s.push_str("_No textual diff available._\n\n");
    } else if file.patch.chars().count() > MAX_PATCH_CHARS {
        s.push_str("_Patch omitted: change too large to include._\n\n");
    } else {
        s.push_str("```diff\n");
        s.push_str(&defang_fences(&file.patch));
        s.push_str("\n```\n\n");
    }

    match &file.context {
        FileContext::None => {}
        FileContext::Full(numbered) => {
            s.push_str("Current file content (numbered):\n```\n");
            s.push_str(numbered);
            s.push_str("```\n\n");
        }
        FileContext::Windowed(snippets) => {
            s.push_str("Context around the changed hunks (numbered):\n");
            for snip in snippets {
                s.push_str("```\n");
                s.push_str(&snip.text);
                s.push_str("```\n");
            }
            s.push('\n');
        }
    }

    s.push_str("---\n\n");
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::ChangeKind;

    fn file(path: &str, patch_len: usize) -> ChangedFile {
        ChangedFile {
            path: path.into(),
            patch: format!("@@ -1,1 +1,1 @@\n{}", "+x\n".repeat(patch_len / 3 + 1)),
            kind: ChangeKind::Modified,
            context: FileContext::None,
        }
    }

    fn changes(files: Vec<ChangedFile>) -> CollectedChanges {
        CollectedChanges {
            files,
            omitted: Vec::new(),
            degraded: Vec::new(),
        }
    }

    #[test]
    fn every_file_appears_exactly_once_under_the_ceiling() {
        let c = changes(vec![file("a.rs", 50), file("b.rs", 50), file("c.rs", 50)]);
        let p = compose_prompt(&c, "english", 200_000, None);
        for path in ["a.rs", "b.rs", "c.rs"] {
            assert_eq!(p.text.matches(&format!("### File: {path} ")).count(), 1);
        }
        assert!(p.evicted.is_empty());
    }

    #[test]
    fn ceiling_evicts_whole_sections_largest_first() {
        let c = changes(vec![file("small.rs", 60), file("huge.rs", 3000)]);
        let base = compose_prompt(&changes(vec![]), "english", 200_000, None)
            .text
            .chars()
            .count();
        let max = base + 400;
        let p = compose_prompt(&c, "english", max, None);

        assert!(p.text.chars().count() <= max);
        assert_eq!(p.evicted, vec!["huge.rs".to_string()]);
        assert!(p.text.contains("### File: small.rs"));
        assert!(!p.text.contains("### File: huge.rs"));
        // Eviction is disclosed to the model.
        assert!(p.text.contains("omitted to fit the size limit"));
    }

    #[test]
    fn prompt_never_exceeds_the_ceiling() {
        let c = changes(vec![file("a.rs", 2000), file("b.rs", 2000), file("c.rs", 2000)]);
        for max in [4_000usize, 5_000, 8_000] {
            let p = compose_prompt(&c, "english", max, None);
            assert!(
                p.text.chars().count() <= max,
                "len {} > max {max}",
                p.text.chars().count()
            );
        }
    }

    #[test]
    fn default_language_is_byte_identical_to_unset() {
        let c = changes(vec![file("a.rs", 40)]);
        let lower = compose_prompt(&c, "english", 200_000, None);
        let upper = compose_prompt(&c, "English", 200_000, None);
        let blank = compose_prompt(&c, "", 200_000, None);
        assert_eq!(lower.text, upper.text);
        assert_eq!(lower.text, blank.text);
        assert!(!lower.text.contains("COMMENT body in"));
    }

    #[test]
    fn non_default_language_adds_a_directive() {
        let c = changes(vec![file("a.rs", 40)]);
        let p = compose_prompt(&c, "Chinese", 200_000, None);
        assert!(p.text.contains("Write every COMMENT body in Chinese."));
    }

    #[test]
    fn custom_instructions_replace_the_builtin_ones_but_keep_the_contract() {
        let c = changes(vec![file("a.rs", 40)]);
        let p = compose_prompt(&c, "english", 200_000, Some("Only check for SQL injection."));
        assert!(p.text.starts_with("Only check for SQL injection.\n"));
        assert!(!p.text.contains("senior software engineer"));
        assert!(p.text.contains("FILE: <repo-relative path>"));
    }

    #[test]
    fn oversized_patches_become_placeholders() {
        let mut f = file("big.rs", 10);
        f.patch = "+x\n".repeat(3_000);
        let p = compose_prompt(&changes(vec![f]), "english", 200_000, None);
        assert!(p.text.contains("change too large to include"));
        assert!(!p.text.contains("+x\n+x"));
    }

    #[test]
    fn backticks_in_patches_stay_fenced() {
        let mut f = file("fence.md", 10);
        f.patch = "@@ -1 +1 @@\n+```rust\n+let x = 1;\n+```".into();
        let p = compose_prompt(&changes(vec![f]), "english", 200_000, None);
        let section = p.text.split("### File: fence.md").nth(1).unwrap();
        // Only the composer's own fences survive inside the section.
        assert_eq!(section.matches("```").count(), 2);
    }

    #[test]
    fn pre_omitted_files_trigger_the_note_without_eviction() {
        let mut c = changes(vec![file("a.rs", 40)]);
        c.omitted.push("z.rs".into());
        let p = compose_prompt(&c, "english", 200_000, None);
        assert!(p.evicted.is_empty());
        assert!(p.text.contains("omitted to fit the size limit"));
    }
}
