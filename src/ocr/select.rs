//! Backend selection policy.
//!
//! Pure function from document metadata and configured backends to a
//! concrete backend. Either provider is an acceptable fallback, so the
//! heuristics only express a preference.

use super::registry::spec;
use super::{BackendChoice, BackendKind};
use crate::error::{ConvertError, Result};

/// Resolve `choice` for a document named `file_name`.
pub fn select_backend(
    choice: BackendChoice,
    file_name: &str,
    available: &[BackendKind],
) -> Result<BackendKind> {
    let explicit = match choice {
        BackendChoice::OcrSpace => Some(BackendKind::OcrSpace),
        BackendChoice::Baidu => Some(BackendKind::Baidu),
        BackendChoice::Auto => None,
    };

    if let Some(kind) = explicit {
        return if available.contains(&kind) {
            Ok(kind)
        } else {
            Err(ConvertError::Config(format!(
                "backend {} requested but {} not set",
                kind,
                spec(kind).credential_vars.join(", ")
            )))
        };
    }

    match available {
        [] => Err(ConvertError::Config(
            "no OCR backend credentials configured".to_string(),
        )),
        [only] => Ok(*only),
        _ if contains_cjk(file_name) => Ok(pick_by(available, |k| spec(*k).strong_on_cjk as u32)),
        _ => Ok(pick_by(available, |k| spec(*k).monthly_free_quota)),
    }
}

fn pick_by(available: &[BackendKind], score: impl Fn(&BackendKind) -> u32) -> BackendKind {
    // max_by_key keeps the last maximum; reverse so ties go to the first configured
    available
        .iter()
        .rev()
        .max_by_key(|k| score(k))
        .copied()
        .unwrap_or(available[0])
}

/// True if `s` contains CJK ideographs, kana or hangul.
pub fn contains_cjk(s: &str) -> bool {
    s.chars().any(|c| {
        matches!(c,
            '\u{4E00}'..='\u{9FFF}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{3040}'..='\u{30FF}'
            | '\u{AC00}'..='\u{D7AF}')
    })
}
