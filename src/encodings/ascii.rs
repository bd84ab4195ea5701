// encodings/ascii.rs - C-locale traits
// Classification restricted to ASCII; everything above 0x7f belongs to no
// class and folds to itself.

use crate::encodings::lookup_posix_collatename;
use crate::regenc::*;

// === ASCII Traits Struct ===
pub struct AsciiTraits;

pub static REGEX_TRAITS_ASCII: AsciiTraits = AsciiTraits;

impl RegexTraits for AsciiTraits {
    fn name(&self) -> &str {
        "C"
    }

    fn isctype(&self, c: char, class: CharClass) -> bool {
        ascii_isctype(c, class)
    }

    fn lookup_classname(&self, name: &str, icase: bool) -> Option<CharClass> {
        lookup_posix_classname(name, icase)
    }

    fn lookup_collatename(&self, name: &str) -> Option<String> {
        lookup_posix_collatename(name).map(String::from)
    }

    fn translate(&self, c: char, icase: bool) -> char {
        if icase {
            c.to_ascii_lowercase()
        } else {
            c
        }
    }
}

pub(crate) fn ascii_isctype(c: char, class: CharClass) -> bool {
    if class.contains(CharClass::ANY) {
        return true;
    }
    if !c.is_ascii() {
        return false;
    }
    (class.contains(CharClass::ALNUM) && c.is_ascii_alphanumeric())
        || (class.contains(CharClass::ALPHA) && c.is_ascii_alphabetic())
        || (class.contains(CharClass::BLANK) && (c == ' ' || c == '\t'))
        || (class.contains(CharClass::CNTRL) && c.is_ascii_control())
        || (class.contains(CharClass::DIGIT) && c.is_ascii_digit())
        || (class.contains(CharClass::GRAPH) && c.is_ascii_graphic())
        || (class.contains(CharClass::LOWER) && c.is_ascii_lowercase())
        || (class.contains(CharClass::PRINT) && (c.is_ascii_graphic() || c == ' '))
        || (class.contains(CharClass::PUNCT) && c.is_ascii_punctuation())
        || (class.contains(CharClass::SPACE) && (c.is_ascii_whitespace() || c == '\x0b'))
        || (class.contains(CharClass::UPPER) && c.is_ascii_uppercase())
        || (class.contains(CharClass::XDIGIT) && c.is_ascii_hexdigit())
        || (class.contains(CharClass::WORD) && (c.is_ascii_alphanumeric() || c == '_'))
        || (class.contains(CharClass::HORIZONTAL) && (c == ' ' || c == '\t'))
        || (class.contains(CharClass::VERTICAL) && ('\n'..='\r').contains(&c))
        || class.contains(CharClass::ASCII)
}
