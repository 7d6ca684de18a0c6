use crate::config::Postprocess;
use unicode_normalization::UnicodeNormalization;

/// Cleans raw recognizer output for storage.
pub fn normalize_text(cfg: &Postprocess, raw: &str) -> String {
    if cfg.normalize_unicode {
        collapse_whitespace(&raw.nfkc().collect::<String>())
    } else {
        collapse_whitespace(raw)
    }
}

/// Collapses every whitespace run to a single space and trims both ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Uppercased, trimmed form used for marker matching.
pub fn marker_text(raw: &str) -> String {
    raw.trim().to_uppercase()
}
