// regenc.rs - Character traits consumed by the parser.
//
// The parser never looks at a character directly to decide what it means:
// it asks the traits for the character's syntactic role, for the meaning of
// the character after a backslash, for named classes and collating names,
// and for numeric values. Everything locale- or encoding-specific sits
// behind `RegexTraits`.

use bitflags::bitflags;

// === Traits type alias ===
pub type RegexTraitsRef = &'static dyn RegexTraits;

// === Syntactic roles ===

/// Role of an unescaped character in a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxType {
    Char,
    OpenMark,
    CloseMark,
    Dollar,
    Caret,
    Dot,
    Star,
    Plus,
    Question,
    OpenSet,
    CloseSet,
    Or,
    Escape,
    Dash,
    OpenBrace,
    CloseBrace,
    Digit,
    Comma,
    Equal,
    Colon,
    Not,
    Hash,
    Newline,
    Less,
    Greater,
    Quote,
    Ampersand,
}

/// Meaning of a character following the escape introducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeType {
    /// No special meaning: the character stands for itself.
    Other,
    // Escaped operators, significant in the basic grammar.
    OpenMark,
    CloseMark,
    Plus,
    Question,
    OpenBrace,
    CloseBrace,
    Or,
    Digit,
    // Class shorthands `\d \w \s ...` and their negations.
    Class,
    NotClass,
    // Assertions.
    LeftWord,
    RightWord,
    StartBuffer,
    EndBuffer,
    WordAssert,
    NotWordAssert,
    SoftBufferEnd,
    RestartContinue,
    // Perl extensions.
    QuoteStart,
    QuoteEnd,
    AnyUnit,
    Combining,
    Property,
    NotProperty,
    NamedChar,
    ExtendedBackref,
    ResetStartMark,
    LineEnding,
    // Character escapes.
    ControlA,
    Escape,
    ControlF,
    ControlN,
    ControlR,
    ControlT,
    ControlV,
    AsciiControl,
    Hex,
}

bitflags! {
    /// Named character classes, as a mask so a set can hold several.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CharClass: u32 {
        const ALNUM = 1 << 0;
        const ALPHA = 1 << 1;
        const BLANK = 1 << 2;
        const CNTRL = 1 << 3;
        const DIGIT = 1 << 4;
        const GRAPH = 1 << 5;
        const LOWER = 1 << 6;
        const PRINT = 1 << 7;
        const PUNCT = 1 << 8;
        const SPACE = 1 << 9;
        const UPPER = 1 << 10;
        const XDIGIT = 1 << 11;
        const WORD = 1 << 12;
        const HORIZONTAL = 1 << 13;
        const VERTICAL = 1 << 14;
        const UNICODE = 1 << 15;
        const ANY = 1 << 16;
        const ASCII = 1 << 17;
    }
}

// === Traits trait ===

pub trait RegexTraits: Send + Sync {
    /// Traits name, for diagnostics.
    fn name(&self) -> &str;

    /// Role of `c` when it appears unescaped.
    fn syntax_type(&self, c: char) -> SyntaxType {
        default_syntax_type(c)
    }

    /// Role of `c` when it follows the escape introducer.
    fn escape_syntax_type(&self, c: char) -> EscapeType {
        default_escape_syntax_type(c)
    }

    /// Does `c` belong to any class in `class`?
    fn isctype(&self, c: char, class: CharClass) -> bool;

    /// Resolve a class name (`alpha`, `d`, a property name, ...).
    fn lookup_classname(&self, name: &str, icase: bool) -> Option<CharClass>;

    /// Resolve a collating element name to the characters it stands for.
    fn lookup_collatename(&self, name: &str) -> Option<String>;

    /// Case-fold `c` when `icase` is set.
    fn translate(&self, c: char, icase: bool) -> char;

    /// Digit value of `c` in `radix`.
    fn value(&self, c: char, radix: u32) -> Option<u32> {
        c.to_digit(radix)
    }

    /// Parse the longest numeral prefix of `text`.
    ///
    /// Returns the value and the number of bytes consumed, or `None` when
    /// `text` does not start with a digit or the value overflows.
    fn toi(&self, text: &str, radix: u32) -> Option<(u32, usize)> {
        let mut value: u32 = 0;
        let mut consumed = 0;
        for c in text.chars() {
            let Some(digit) = self.value(c, radix) else {
                break;
            };
            if (u32::MAX - digit) / radix < value {
                return None; // overflow
            }
            value = value * radix + digit;
            consumed += c.len_utf8();
        }
        if consumed == 0 {
            None
        } else {
            Some((value, consumed))
        }
    }
}

pub fn default_syntax_type(c: char) -> SyntaxType {
    match c {
        '(' => SyntaxType::OpenMark,
        ')' => SyntaxType::CloseMark,
        '$' => SyntaxType::Dollar,
        '^' => SyntaxType::Caret,
        '.' => SyntaxType::Dot,
        '*' => SyntaxType::Star,
        '+' => SyntaxType::Plus,
        '?' => SyntaxType::Question,
        '[' => SyntaxType::OpenSet,
        ']' => SyntaxType::CloseSet,
        '|' => SyntaxType::Or,
        '\\' => SyntaxType::Escape,
        '-' => SyntaxType::Dash,
        '{' => SyntaxType::OpenBrace,
        '}' => SyntaxType::CloseBrace,
        '0'..='9' => SyntaxType::Digit,
        ',' => SyntaxType::Comma,
        '=' => SyntaxType::Equal,
        ':' => SyntaxType::Colon,
        '!' => SyntaxType::Not,
        '#' => SyntaxType::Hash,
        '\n' | '\r' | '\x0c' | '\u{85}' | '\u{2028}' | '\u{2029}' => SyntaxType::Newline,
        '<' => SyntaxType::Less,
        '>' => SyntaxType::Greater,
        '\'' => SyntaxType::Quote,
        '&' => SyntaxType::Ampersand,
        _ => SyntaxType::Char,
    }
}

pub fn default_escape_syntax_type(c: char) -> EscapeType {
    match c {
        '(' => EscapeType::OpenMark,
        ')' => EscapeType::CloseMark,
        '+' => EscapeType::Plus,
        '?' => EscapeType::Question,
        '{' => EscapeType::OpenBrace,
        '}' => EscapeType::CloseBrace,
        '|' => EscapeType::Or,
        '0'..='9' => EscapeType::Digit,
        'd' | 'w' | 's' | 'l' | 'u' | 'h' => EscapeType::Class,
        'D' | 'W' | 'S' | 'L' | 'U' | 'H' | 'V' => EscapeType::NotClass,
        '<' => EscapeType::LeftWord,
        '>' => EscapeType::RightWord,
        'A' | '`' => EscapeType::StartBuffer,
        'z' | '\'' => EscapeType::EndBuffer,
        'b' => EscapeType::WordAssert,
        'B' => EscapeType::NotWordAssert,
        'Z' => EscapeType::SoftBufferEnd,
        'G' => EscapeType::RestartContinue,
        'Q' => EscapeType::QuoteStart,
        'E' => EscapeType::QuoteEnd,
        'C' => EscapeType::AnyUnit,
        'X' => EscapeType::Combining,
        'p' => EscapeType::Property,
        'P' => EscapeType::NotProperty,
        'N' => EscapeType::NamedChar,
        'g' | 'k' => EscapeType::ExtendedBackref,
        'K' => EscapeType::ResetStartMark,
        'R' => EscapeType::LineEnding,
        'a' => EscapeType::ControlA,
        'e' => EscapeType::Escape,
        'f' => EscapeType::ControlF,
        'n' => EscapeType::ControlN,
        'r' => EscapeType::ControlR,
        't' => EscapeType::ControlT,
        'v' => EscapeType::ControlV,
        'c' => EscapeType::AsciiControl,
        'x' => EscapeType::Hex,
        _ => EscapeType::Other,
    }
}

// === Class names ===

const CLASS_NAMES: &[(&str, CharClass)] = &[
    ("alnum", CharClass::ALNUM),
    ("alpha", CharClass::ALPHA),
    ("blank", CharClass::BLANK),
    ("cntrl", CharClass::CNTRL),
    ("d", CharClass::DIGIT),
    ("digit", CharClass::DIGIT),
    ("graph", CharClass::GRAPH),
    ("h", CharClass::HORIZONTAL),
    ("l", CharClass::LOWER),
    ("lower", CharClass::LOWER),
    ("print", CharClass::PRINT),
    ("punct", CharClass::PUNCT),
    ("s", CharClass::SPACE),
    ("space", CharClass::SPACE),
    ("u", CharClass::UPPER),
    ("unicode", CharClass::UNICODE),
    ("upper", CharClass::UPPER),
    ("v", CharClass::VERTICAL),
    ("w", CharClass::WORD),
    ("word", CharClass::WORD),
    ("xdigit", CharClass::XDIGIT),
];

/// Look up a POSIX/Perl class name, retrying in lower case.
///
/// With `icase`, `lower` and `upper` both widen to cover either case.
pub fn lookup_posix_classname(name: &str, icase: bool) -> Option<CharClass> {
    let found = find_class(CLASS_NAMES, name, false)
        .or_else(|| find_class(CLASS_NAMES, name, true))?;
    Some(widen_for_icase(found, icase))
}

/// Table lookup, exact or ignoring ASCII case.
pub(crate) fn find_class(
    table: &[(&str, CharClass)],
    name: &str,
    fold: bool,
) -> Option<CharClass> {
    table
        .iter()
        .find(|(n, _)| if fold { n.eq_ignore_ascii_case(name) } else { *n == name })
        .map(|(_, class)| *class)
}

pub(crate) fn widen_for_icase(class: CharClass, icase: bool) -> CharClass {
    if icase && class.intersects(CharClass::LOWER | CharClass::UPPER) {
        class | CharClass::LOWER | CharClass::UPPER
    } else {
        class
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_roles() {
        assert_eq!(default_syntax_type('('), SyntaxType::OpenMark);
        assert_eq!(default_syntax_type('|'), SyntaxType::Or);
        assert_eq!(default_syntax_type('7'), SyntaxType::Digit);
        assert_eq!(default_syntax_type('\n'), SyntaxType::Newline);
        assert_eq!(default_syntax_type('q'), SyntaxType::Char);
    }

    #[test]
    fn escape_roles() {
        assert_eq!(default_escape_syntax_type('d'), EscapeType::Class);
        assert_eq!(default_escape_syntax_type('W'), EscapeType::NotClass);
        assert_eq!(default_escape_syntax_type('`'), EscapeType::StartBuffer);
        assert_eq!(default_escape_syntax_type('\''), EscapeType::EndBuffer);
        assert_eq!(default_escape_syntax_type('k'), EscapeType::ExtendedBackref);
        assert_eq!(default_escape_syntax_type('%'), EscapeType::Other);
    }

    #[test]
    fn classname_lookup() {
        assert_eq!(lookup_posix_classname("alpha", false), Some(CharClass::ALPHA));
        assert_eq!(lookup_posix_classname("D", false), Some(CharClass::DIGIT));
        assert_eq!(lookup_posix_classname("Digit", false), Some(CharClass::DIGIT));
        assert_eq!(lookup_posix_classname("nope", false), None);
    }

    #[test]
    fn icase_widens_case_classes() {
        let upper = lookup_posix_classname("upper", true).unwrap();
        assert!(upper.contains(CharClass::LOWER | CharClass::UPPER));
        assert_eq!(lookup_posix_classname("digit", true), Some(CharClass::DIGIT));
    }
}
