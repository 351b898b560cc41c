//! Output file naming derived from document content.
//!
//! Pure functions, no IO except [`unique_output_path`]'s existence checks.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

pub const MAX_NAME_CHARS: usize = 50;

/// Only the head of the text is considered for a title.
const PREVIEW_CHARS: usize = 200;
const MAX_TITLE_LINE_CHARS: usize = 100;
const MAX_TOKENS: usize = 5;

/// Words that usually appear in a document's title sentence.
pub const TITLE_KEYWORDS: &[&str] = &[
    "需求", "方案", "报告", "文档", "合同", "协议", "说明", "指南", "report", "proposal",
    "contract", "agreement", "specification", "guide", "manual", "invoice",
];

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]+(.+?)[ \t#]*$").expect("valid regex"))
}

fn punctuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid regex"))
}

/// How output files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingPolicy {
    /// Derive a title from the text.
    #[default]
    Smart,
    /// Keep the input file stem.
    Stem,
}

impl std::str::FromStr for NamingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "smart" => Ok(Self::Smart),
            "stem" => Ok(Self::Stem),
            other => Err(format!("unknown naming policy '{}' (expected smart or stem)", other)),
        }
    }
}

/// Derive a sanitized file stem from recognized text.
///
/// Tried in order: markdown heading, short first line, keyword sentence,
/// first few tokens, then `fallback_stem`. A rule whose candidate has no
/// letters or digits (page markers, symbol rows) yields to the next one.
pub fn derive_name(text: &str, fallback_stem: &str) -> String {
    if text.trim().chars().count() < 10 {
        return sanitize_filename(fallback_stem);
    }

    let preview: String = text.trim().chars().take(PREVIEW_CHARS).collect();

    heading_title(&preview)
        .or_else(|| first_line(&preview))
        .or_else(|| keyword_sentence(&preview))
        .or_else(|| leading_tokens(&preview))
        .unwrap_or_else(|| sanitize_filename(fallback_stem))
}

/// Sanitized `candidate`, or `None` if it carries no letters or digits.
fn usable(candidate: &str) -> Option<String> {
    if candidate.chars().any(char::is_alphanumeric) {
        Some(sanitize_filename(candidate))
    } else {
        None
    }
}

fn heading_title(preview: &str) -> Option<String> {
    heading_re()
        .captures_iter(preview)
        .find_map(|cap| usable(cap[1].trim()))
}

fn first_line(preview: &str) -> Option<String> {
    let first = preview
        .lines()
        .map(str::trim)
        .find(|l| l.chars().any(char::is_alphanumeric))?;
    let sentence_marks = first.matches(['，', '。']).count();
    if first.chars().count() < MAX_TITLE_LINE_CHARS && sentence_marks < 3 {
        usable(first)
    } else {
        None
    }
}

fn keyword_sentence(preview: &str) -> Option<String> {
    let lowered = preview.to_lowercase();
    TITLE_KEYWORDS
        .iter()
        .filter(|keyword| lowered.contains(*keyword))
        .find_map(|keyword| {
            preview
                .split(['。', '\n', '.', '!', '?', '！', '？'])
                .map(str::trim)
                .filter(|s| s.to_lowercase().contains(keyword) && s.chars().count() < MAX_NAME_CHARS)
                .find_map(usable)
        })
}

fn leading_tokens(preview: &str) -> Option<String> {
    let stripped = punctuation_re().replace_all(preview, "");
    let tokens: Vec<&str> = stripped.split_whitespace().take(MAX_TOKENS).collect();
    usable(&tokens.join("_"))
}

/// Make `name` safe as a file stem on Windows, macOS and Linux.
///
/// Reserved characters and control characters become `_`, whitespace runs
/// collapse to a single `_`, leading/trailing `_ - .` are trimmed and the
/// result is capped at [`MAX_NAME_CHARS`]. Never returns an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_control() {
            out.push('_');
        } else {
            out.push(c);
        }
    }

    let trim = |s: &str| s.trim_matches(|c: char| matches!(c, '_' | '-' | '.' | ' ')).to_string();
    let capped: String = trim(&out).chars().take(MAX_NAME_CHARS).collect();
    let cleaned = trim(&capped);
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned
    }
}

/// First of `stem.ext`, `stem_1.ext`, `stem_2.ext`, ... absent from `dir`.
pub fn unique_output_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let candidate = dir.join(format!("{}.{}", stem, ext));
    if !candidate.exists() {
        return candidate;
    }
    (1..)
        .map(|n| dir.join(format!("{}_{}.{}", stem, n, ext)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
