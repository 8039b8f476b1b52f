//! Instrument-name cleanup.

/// Default cap on instrument name length.
pub const DEFAULT_MAX_INSTRUMENT_LEN: usize = 50;

/// Clean a user-supplied instrument name.
///
/// Keeps ASCII letters and digits, whitespace and `. - _ ( )`, trims the result and
/// truncates it to `max_len` characters. An empty result means the name was
/// unusable.
///
/// ```
/// use taxlot_importer::sanitize_instrument;
///
/// assert_eq!(sanitize_instrument("  CEZ <script> ", 50), "CEZ script");
/// assert_eq!(sanitize_instrument("KOMB;DROP", 50), "KOMBDROP");
/// ```
pub fn sanitize_instrument(raw: &str, max_len: usize) -> String {
    let kept: String = raw.chars().filter(|c| is_allowed(*c)).collect();
    let truncated: String = kept.trim().chars().take(max_len).collect();
    truncated.trim_end().to_string()
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_whitespace() || matches!(c, '.' | '-' | '_' | '(' | ')')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_allowed_punctuation() {
        assert_eq!(
            sanitize_instrument("ERSTE (Group) Bank-A_1.0", 50),
            "ERSTE (Group) Bank-A_1.0"
        );
    }

    #[test]
    fn test_strips_markup_and_trims() {
        assert_eq!(sanitize_instrument("  <b>CEZ</b>  ", 50), "bCEZb");
    }

    #[test]
    fn test_non_ascii_letters_dropped() {
        assert_eq!(sanitize_instrument("ČEZ", 50), "EZ");
    }

    #[test]
    fn test_truncates() {
        let long = "A".repeat(80);
        assert_eq!(sanitize_instrument(&long, 50).len(), 50);
        assert_eq!(sanitize_instrument("ABC DEF", 4), "ABC");
    }

    #[test]
    fn test_empty_after_cleanup() {
        assert!(sanitize_instrument(" <>;'\" ", 50).is_empty());
    }
}
