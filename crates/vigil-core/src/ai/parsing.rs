//! Response cleanup for generated explanations
//!
//! Models wrap plain-text answers in all kinds of noise: reasoning blocks,
//! surrounding quotes, "Explanation:" prefixes. These helpers reduce a raw
//! response to the text a user should see.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Max characters of a raw response echoed into error messages
const RAW_PREVIEW_CHARS: usize = 200;

fn think_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<think(?:ing)?>.*?</think(?:ing)?>").expect("valid regex")
    })
}

fn label_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(explanation|answer|response)\s*:\s*").expect("valid regex")
    })
}

/// Clean a raw model response into display text
///
/// Empty output after cleanup is a malformed response.
pub fn clean_response(raw: &str) -> Result<String> {
    let without_thinking = think_block_re().replace_all(raw, "");
    let unlabeled = label_prefix_re().replace(without_thinking.trim(), "");
    let text = strip_wrapping_quotes(unlabeled.trim()).trim();

    if text.is_empty() {
        return Err(Error::Ai(format!(
            "Empty response from AI | Raw: {}",
            preview(raw)
        )));
    }

    Ok(text.to_string())
}

/// Remove one pair of matching quotes around the whole text
fn strip_wrapping_quotes(text: &str) -> &str {
    for (open, close) in [('"', '"'), ('\'', '\''), ('\u{201C}', '\u{201D}'), ('`', '`')] {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            return inner;
        }
    }
    text
}

/// Truncate a raw response for error messages (char-boundary safe)
pub fn preview(raw: &str) -> String {
    let raw = raw.trim();
    match raw.char_indices().nth(RAW_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(
            clean_response("  This is much larger than usual.\n").unwrap(),
            "This is much larger than usual."
        );
    }

    #[test]
    fn test_think_blocks_are_removed() {
        let raw = "<think>\nThe user spent a lot...\n</think>\n\nThis purchase is far above your typical grocery spend.";
        assert_eq!(
            clean_response(raw).unwrap(),
            "This purchase is far above your typical grocery spend."
        );
    }

    #[test]
    fn test_wrapping_quotes_and_labels_are_removed() {
        assert_eq!(
            clean_response("\"You rarely shop here.\"").unwrap(),
            "You rarely shop here."
        );
        assert_eq!(
            clean_response("Explanation: \u{201C}First purchase in Jewelry.\u{201D}").unwrap(),
            "First purchase in Jewelry."
        );
    }

    #[test]
    fn test_inner_quotes_are_kept() {
        assert_eq!(
            clean_response("You bought \"gift cards\" twice.").unwrap(),
            "You bought \"gift cards\" twice."
        );
    }

    #[test]
    fn test_empty_response_is_error() {
        assert!(matches!(clean_response("   "), Err(Error::Ai(_))));
        assert!(matches!(
            clean_response("<think>only thinking</think>"),
            Err(Error::Ai(_))
        ));
        assert!(matches!(clean_response("\"\""), Err(Error::Ai(_))));
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), RAW_PREVIEW_CHARS + 3);
        assert_eq!(preview("short"), "short");
    }
}
