//! Normalization of raw model output into a single conventional-commit
//! subject line.

use regex::Regex;
use std::sync::LazyLock;

/// Canonical conventional-commit types
const CANONICAL_TYPES: &[&str] = &[
    "feat", "fix", "refactor", "docs", "style", "test", "chore", "perf", "ci", "build", "revert",
];

static REASONING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<think(?:ing)?>.*?</think(?:ing)?>").expect("static regex must compile")
});

static TYPED_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>[A-Za-z][A-Za-z-]*)(?P<scope>\([^)]*\))?!?:\s*(?P<subject>.*)$")
        .expect("static regex must compile")
});

/// Maps a raw type token to a canonical type. Unrecognized tokens map to
/// `chore`.
fn canonical_type(raw: &str) -> &'static str {
    let lower = raw.to_lowercase();
    let mapped = match lower.as_str() {
        "feature" | "features" => "feat",
        "bugfix" | "hotfix" => "fix",
        "refactoring" => "refactor",
        "doc" | "documentation" => "docs",
        "tests" | "testing" => "test",
        "performance" => "perf",
        other => other,
    };
    CANONICAL_TYPES
        .iter()
        .find(|t| **t == mapped)
        .copied()
        .unwrap_or("chore")
}

/// Strips `<think>`/`<thinking>` blocks leaked by reasoning models.
fn strip_reasoning(raw: &str) -> String {
    REASONING_RE.replace_all(raw, "\n").into_owned()
}

/// Picks the first usable line: trims surrounding quotes, drops blank lines
/// and bare code-fence markers.
fn first_content_line(text: &str) -> Option<String> {
    for line in text.lines() {
        let trimmed = line.trim().trim_matches(['"', '\'', '`']).trim();
        if trimmed.is_empty() || trimmed.starts_with("```") {
            continue;
        }
        return Some(trimmed.to_string());
    }
    None
}

/// Normalizes raw model output into a `type(scope): subject` line no longer
/// than `max_length` characters.
///
/// Returns an empty string when nothing usable remains; the caller treats
/// that as "no message" and falls back to its deterministic subject.
pub fn format_typed_message(raw: &str, max_length: usize) -> String {
    let cleaned = strip_reasoning(raw);
    let Some(line) = first_content_line(&cleaned) else {
        return String::new();
    };

    let (prefix, subject) = match TYPED_LINE_RE.captures(&line) {
        Some(caps) => {
            let ty = canonical_type(&caps["type"]);
            let scope = caps.name("scope").map_or("", |m| m.as_str());
            let subject = caps["subject"].trim().to_string();
            (format!("{ty}{scope}: "), subject)
        }
        None => ("chore: ".to_string(), line),
    };

    if subject.is_empty() {
        return String::new();
    }

    enforce_length(&prefix, &subject, max_length)
}

/// Truncates the subject so `prefix + subject` fits in `max_length` chars,
/// appending an ellipsis. When even the prefix does not fit, the whole
/// string is hard-truncated.
fn enforce_length(prefix: &str, subject: &str, max_length: usize) -> String {
    let full = format!("{prefix}{subject}");
    if full.chars().count() <= max_length {
        return full;
    }

    let prefix_len = prefix.chars().count();
    if prefix_len + 1 >= max_length {
        return full.chars().take(max_length).collect();
    }

    let keep = max_length - prefix_len - 1;
    let truncated: String = subject.chars().take(keep).collect();
    format!("{prefix}{}…", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_mapping() {
        assert_eq!(format_typed_message("feature: add x", 72), "feat: add x");
        assert_eq!(format_typed_message("bugfix: stop crash", 72), "fix: stop crash");
        assert_eq!(
            format_typed_message("refactoring(core): split module", 72),
            "refactor(core): split module"
        );
    }

    #[test]
    fn test_untyped_line_becomes_chore() {
        assert_eq!(format_typed_message("bogus thing", 72), "chore: bogus thing");
    }

    #[test]
    fn test_unrecognized_type_canonicalizes_to_chore() {
        assert_eq!(format_typed_message("wip: half done", 72), "chore: half done");
    }

    #[test]
    fn test_strips_reasoning_blocks() {
        let raw = "<think>the user changed the parser\nso...</think>fix: handle empty input";
        assert_eq!(format_typed_message(raw, 72), "fix: handle empty input");
    }

    #[test]
    fn test_skips_fences_and_quotes() {
        let raw = "```\n\"feat: quoted subject\"\n```";
        assert_eq!(format_typed_message(raw, 72), "feat: quoted subject");
    }

    #[test]
    fn test_truncation_law() {
        let long = format!("feat: {}", "x".repeat(200));
        let out = format_typed_message(&long, 30);
        assert!(out.chars().count() <= 30);
        assert!(out.ends_with('…'));
        assert!(out.starts_with("feat: "));
    }

    #[test]
    fn test_hard_truncation_when_prefix_overflows() {
        let out = format_typed_message("refactor(deeply/nested/scope): x", 10);
        assert_eq!(out.chars().count(), 10);
        assert!(!out.ends_with('…'));
    }

    #[test]
    fn test_empty_subject_yields_empty_result() {
        assert_eq!(format_typed_message("feat:   ", 72), "");
        assert_eq!(format_typed_message("\"\"\n", 72), "");
        assert_eq!(format_typed_message("<thinking>only thoughts</thinking>", 72), "");
    }
}
