// encodings/mod.rs - Traits registry
// One module per shipped `RegexTraits` implementation, plus the POSIX
// collating-name table they share.

pub mod ascii;
pub mod utf8;

pub use ascii::REGEX_TRAITS_ASCII;
pub use utf8::REGEX_TRAITS_UNICODE;

/// POSIX portable character set names. Letters are omitted: a single
/// character names itself.
const POSIX_COLLATING_NAMES: &[(&str, char)] = &[
    ("NUL", '\u{00}'),
    ("SOH", '\u{01}'),
    ("STX", '\u{02}'),
    ("ETX", '\u{03}'),
    ("EOT", '\u{04}'),
    ("ENQ", '\u{05}'),
    ("ACK", '\u{06}'),
    ("alert", '\u{07}'),
    ("backspace", '\u{08}'),
    ("tab", '\t'),
    ("newline", '\n'),
    ("vertical-tab", '\u{0b}'),
    ("form-feed", '\u{0c}'),
    ("carriage-return", '\r'),
    ("SO", '\u{0e}'),
    ("SI", '\u{0f}'),
    ("DLE", '\u{10}'),
    ("DC1", '\u{11}'),
    ("DC2", '\u{12}'),
    ("DC3", '\u{13}'),
    ("DC4", '\u{14}'),
    ("NAK", '\u{15}'),
    ("SYN", '\u{16}'),
    ("ETB", '\u{17}'),
    ("CAN", '\u{18}'),
    ("EM", '\u{19}'),
    ("SUB", '\u{1a}'),
    ("ESC", '\u{1b}'),
    ("IS4", '\u{1c}'),
    ("IS3", '\u{1d}'),
    ("IS2", '\u{1e}'),
    ("IS1", '\u{1f}'),
    ("space", ' '),
    ("exclamation-mark", '!'),
    ("quotation-mark", '"'),
    ("number-sign", '#'),
    ("dollar-sign", '$'),
    ("percent-sign", '%'),
    ("ampersand", '&'),
    ("apostrophe", '\''),
    ("left-parenthesis", '('),
    ("right-parenthesis", ')'),
    ("asterisk", '*'),
    ("plus-sign", '+'),
    ("comma", ','),
    ("hyphen", '-'),
    ("hyphen-minus", '-'),
    ("period", '.'),
    ("full-stop", '.'),
    ("slash", '/'),
    ("solidus", '/'),
    ("zero", '0'),
    ("one", '1'),
    ("two", '2'),
    ("three", '3'),
    ("four", '4'),
    ("five", '5'),
    ("six", '6'),
    ("seven", '7'),
    ("eight", '8'),
    ("nine", '9'),
    ("colon", ':'),
    ("semicolon", ';'),
    ("less-than-sign", '<'),
    ("equals-sign", '='),
    ("greater-than-sign", '>'),
    ("question-mark", '?'),
    ("commercial-at", '@'),
    ("left-square-bracket", '['),
    ("backslash", '\\'),
    ("reverse-solidus", '\\'),
    ("right-square-bracket", ']'),
    ("circumflex", '^'),
    ("circumflex-accent", '^'),
    ("underscore", '_'),
    ("low-line", '_'),
    ("grave-accent", '`'),
    ("left-curly-bracket", '{'),
    ("left-brace", '{'),
    ("vertical-line", '|'),
    ("right-curly-bracket", '}'),
    ("right-brace", '}'),
    ("tilde", '~'),
    ("DEL", '\u{7f}'),
];

/// Resolve a POSIX collating name, or a name consisting of a single character.
pub(crate) fn lookup_posix_collatename(name: &str) -> Option<char> {
    if let Some((_, c)) = POSIX_COLLATING_NAMES.iter().find(|(n, _)| *n == name) {
        return Some(*c);
    }
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}
