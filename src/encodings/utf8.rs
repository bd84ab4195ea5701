// encodings/utf8.rs - Unicode-aware traits (the default)
// Classes follow the Unicode general categories as exposed by `char`;
// property names (`\p{Lu}`, `[[:Letter:]]`) resolve onto the same masks.

use crate::encodings::lookup_posix_collatename;
use crate::regenc::*;

// === Unicode Traits Struct ===
pub struct UnicodeTraits;

pub static REGEX_TRAITS_UNICODE: UnicodeTraits = UnicodeTraits;

// Canonical spellings; exact matches win over the POSIX names, so `L` is
// Letter here while `l` stays the POSIX lower-case class.
const PROPERTY_NAMES: &[(&str, CharClass)] = &[
    ("Any", CharClass::ANY),
    ("ASCII", CharClass::ASCII),
    ("Alphabetic", CharClass::ALPHA),
    ("L", CharClass::ALPHA),
    ("Letter", CharClass::ALPHA),
    ("Ll", CharClass::LOWER),
    ("Lowercase_Letter", CharClass::LOWER),
    ("Lu", CharClass::UPPER),
    ("Uppercase_Letter", CharClass::UPPER),
    ("N", CharClass::DIGIT),
    ("Nd", CharClass::DIGIT),
    ("Number", CharClass::DIGIT),
    ("P", CharClass::PUNCT),
    ("Punctuation", CharClass::PUNCT),
    ("Z", CharClass::SPACE),
    ("Zs", CharClass::BLANK),
    ("Separator", CharClass::SPACE),
    ("White_Space", CharClass::SPACE),
    ("Cc", CharClass::CNTRL),
    ("Control", CharClass::CNTRL),
];

impl RegexTraits for UnicodeTraits {
    fn name(&self) -> &str {
        "Unicode"
    }

    fn isctype(&self, c: char, class: CharClass) -> bool {
        if c.is_ascii() {
            return crate::encodings::ascii::ascii_isctype(c, class);
        }
        class.contains(CharClass::ANY)
            || (class.intersects(CharClass::ALNUM | CharClass::WORD) && c.is_alphanumeric())
            || (class.contains(CharClass::ALPHA) && c.is_alphabetic())
            || (class.contains(CharClass::CNTRL) && c.is_control())
            || (class.contains(CharClass::DIGIT) && c.is_numeric())
            || (class.intersects(CharClass::GRAPH | CharClass::PRINT)
                && !c.is_control()
                && !c.is_whitespace())
            || (class.contains(CharClass::LOWER) && c.is_lowercase())
            || (class.contains(CharClass::UPPER) && c.is_uppercase())
            || (class.contains(CharClass::SPACE) && c.is_whitespace())
            || (class.intersects(CharClass::BLANK | CharClass::HORIZONTAL)
                && c.is_whitespace()
                && !is_vertical_space(c))
            || (class.contains(CharClass::VERTICAL) && is_vertical_space(c))
            || class.contains(CharClass::UNICODE)
    }

    fn lookup_classname(&self, name: &str, icase: bool) -> Option<CharClass> {
        find_class(PROPERTY_NAMES, name, false)
            .or_else(|| lookup_posix_classname(name, false))
            .or_else(|| find_class(PROPERTY_NAMES, name, true))
            .map(|class| widen_for_icase(class, icase))
    }

    fn lookup_collatename(&self, name: &str) -> Option<String> {
        if let Some(c) = lookup_posix_collatename(name) {
            return Some(c.to_string());
        }
        // U+XXXX spells out a code point.
        let hex = name.strip_prefix("U+").or_else(|| name.strip_prefix("u+"))?;
        let (value, consumed) = self.toi(hex, 16)?;
        if consumed != hex.len() {
            return None;
        }
        char::from_u32(value).map(String::from)
    }

    fn translate(&self, c: char, icase: bool) -> char {
        if !icase {
            return c;
        }
        let mut lower = c.to_lowercase();
        match (lower.next(), lower.next()) {
            (Some(l), None) => l,
            _ => c,
        }
    }
}

fn is_vertical_space(c: char) -> bool {
    matches!(c, '\n'..='\r' | '\u{85}' | '\u{2028}' | '\u{2029}')
}
