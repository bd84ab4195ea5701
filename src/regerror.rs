// regerror.rs - Error codes, default messages and diagnostic excerpts.

pub const REG_NORMAL: i32 = 0;

// Structural errors.
pub const REGERR_EMPTY_PATTERN: i32 = -100;
pub const REGERR_UNMATCHED_PAREN: i32 = -101;
pub const REGERR_UNMATCHED_BRACKET: i32 = -102;
pub const REGERR_UNMATCHED_BRACE: i32 = -103;

// Semantic errors.
pub const REGERR_BAD_REPEAT: i32 = -110;
pub const REGERR_BAD_BRACE_RANGE: i32 = -111;
pub const REGERR_BAD_RANGE: i32 = -112;
pub const REGERR_BAD_BACKREFERENCE: i32 = -113;
pub const REGERR_BAD_PATTERN: i32 = -114;

// Lexical errors.
pub const REGERR_BAD_CHARACTER_CLASS: i32 = -120;
pub const REGERR_BAD_COLLATING_NAME: i32 = -121;
pub const REGERR_MALFORMED_ESCAPE: i32 = -122;
pub const REGERR_MALFORMED_PERL_EXTENSION: i32 = -123;

// Resource and configuration errors.
pub const REGERR_COMPLEXITY_LIMIT: i32 = -200;
pub const REGERR_INVALID_OPTION_COMBINATION: i32 = -201;
pub const REGERR_UNKNOWN: i32 = -999;

/// Characters of context shown on either side of the failing position.
const EXCERPT_RADIUS: usize = 10;

/// Marker spliced into the excerpt at the failing position.
pub const EXCERPT_MARKER: &str = ">>>HERE>>>";

/// Default message for an error code.
pub fn reg_error_code_to_format(code: i32) -> &'static str {
    match code {
        REG_NORMAL => "Success.",
        REGERR_EMPTY_PATTERN => "Empty expression.",
        REGERR_UNMATCHED_PAREN => "Unmatched marking parenthesis ( or \\(.",
        REGERR_UNMATCHED_BRACKET => "Unmatched [ or [^ in character class declaration.",
        REGERR_UNMATCHED_BRACE => "Unmatched quantified repeat operator { or \\{.",
        REGERR_BAD_REPEAT => "Invalid preceding regular expression prior to repetition operator.",
        REGERR_BAD_BRACE_RANGE => "Invalid content of repeat range.",
        REGERR_BAD_RANGE => "Invalid range end in character class.",
        REGERR_BAD_BACKREFERENCE => {
            "Invalid back reference: specified capturing group does not exist."
        }
        REGERR_BAD_PATTERN => "Invalid regular expression.",
        REGERR_BAD_CHARACTER_CLASS => "Invalid character class name.",
        REGERR_BAD_COLLATING_NAME => "Invalid collation character.",
        REGERR_MALFORMED_ESCAPE => "Invalid or unterminated escape sequence.",
        REGERR_MALFORMED_PERL_EXTENSION => "Invalid or unterminated Perl (?...) sequence.",
        REGERR_COMPLEXITY_LIMIT => "Complexity requirements exceeded.",
        REGERR_INVALID_OPTION_COMBINATION => {
            "An invalid combination of regular expression syntax flags was used."
        }
        _ => "Unknown error.",
    }
}

/// Build the full diagnostic: `message` followed by a bounded excerpt of
/// `pattern` around byte offset `position`.
///
/// The excerpt holds at most `EXCERPT_RADIUS` characters on each side. Empty
/// pattern errors carry no excerpt since there is nothing to point at.
pub fn format_error_message(code: i32, message: &str, pattern: &str, position: usize) -> String {
    let mut out = String::from(message);
    if code == REGERR_EMPTY_PATTERN {
        return out;
    }

    let position = floor_char_boundary(pattern, position.min(pattern.len()));
    let start = pattern[..position]
        .char_indices()
        .rev()
        .take(EXCERPT_RADIUS)
        .last()
        .map_or(position, |(i, _)| i);
    let end = pattern[position..]
        .char_indices()
        .nth(EXCERPT_RADIUS)
        .map_or(pattern.len(), |(i, _)| position + i);

    if start != 0 || end != pattern.len() {
        out.push_str("  The error occurred while parsing the regular expression fragment: '");
    } else {
        out.push_str("  The error occurred while parsing the regular expression: '");
    }
    if start != end {
        out.push_str(&pattern[start..position]);
        out.push_str(EXCERPT_MARKER);
        out.push_str(&pattern[position..end]);
    }
    out.push_str("'.");
    out
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_pattern_shows_whole_expression() {
        let msg = format_error_message(REGERR_BAD_REPEAT, "Bad.", "a**", 2);
        assert_eq!(
            msg,
            "Bad.  The error occurred while parsing the regular expression: 'a*>>>HERE>>>*'."
        );
    }

    #[test]
    fn long_pattern_is_clipped() {
        let pattern = "abcdefghijklmnopqrstuvwxyz0123456789";
        let msg = format_error_message(REGERR_BAD_REPEAT, "Bad.", pattern, 18);
        assert!(msg.contains("fragment"));
        assert!(msg.ends_with("'ijklmnopqr>>>HERE>>>stuvwxyz01'."));
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let pattern = "\u{3042}\u{3044}\u{3046}(";
        let msg = format_error_message(REGERR_UNMATCHED_PAREN, "Paren.", pattern, 9);
        assert!(msg.contains("\u{3042}\u{3044}\u{3046}>>>HERE>>>("));
    }

    #[test]
    fn empty_pattern_has_no_excerpt() {
        let msg = format_error_message(REGERR_EMPTY_PATTERN, "Empty expression.", "", 0);
        assert_eq!(msg, "Empty expression.");
    }

    #[test]
    fn unknown_code_message() {
        assert_eq!(reg_error_code_to_format(12345), "Unknown error.");
    }
}
