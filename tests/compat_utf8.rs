// compat_utf8.rs - Integration tests for non-ASCII patterns.
//
// Offsets in errors and spans are byte offsets into the UTF-8 pattern text.
// The Unicode traits are the default; a few tests compare against the
// C-locale traits.

use regprog::encodings::{REGEX_TRAITS_ASCII, REGEX_TRAITS_UNICODE};
use regprog::error::ErrorKind;
use regprog::regcomp::{compile, compile_with_traits};
use regprog::regenc::CharClass;
use regprog::regint::{CharSet, Instr, Program, SubexpressionSpan};
use regprog::regsyntax::SyntaxOptions;

fn x(pattern: &str) -> Program {
    compile(pattern, SyntaxOptions::PERL)
        .unwrap_or_else(|e| panic!("compile failed for {:?}: {}", pattern, e))
}

fn n(pattern: &str, kind: ErrorKind, offset: usize) {
    let err = compile(pattern, SyntaxOptions::PERL)
        .err()
        .unwrap_or_else(|| panic!("n: expected {:?} for {:?}", kind, pattern));
    assert_eq!((err.kind(), err.offset()), (kind, offset), "n: {:?}: {}", pattern, err);
}

fn literal(text: &str, icase: bool) -> Instr {
    Instr::Literal {
        chars: text.chars().collect(),
        icase,
    }
}

fn first_set(program: &Program) -> &CharSet {
    program
        .iter()
        .find_map(|i| match i {
            Instr::Set(set) => Some(set.as_ref()),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no set in:\n{}", program))
}

// === Literals and escapes ===

#[test]
fn multibyte_literals() {
    assert_eq!(x("日本語").get(1), Some(&literal("日本語", false)));
    assert_eq!(x("caf\u{e9}").get(1), Some(&literal("café", false)));
}

#[test]
fn code_point_escapes() {
    assert_eq!(x("\\x{1F600}").get(1), Some(&literal("\u{1F600}", false)));
    assert_eq!(x("\\x{3042}\\x41").get(1), Some(&literal("\u{3042}A", false)));
    n("\\x{110000}", ErrorKind::BadBraceRange, 0);
}

#[test]
fn named_characters() {
    assert_eq!(x("\\N{U+00E9}").get(1), Some(&literal("é", false)));
    assert_eq!(x("\\N{space}").get(1), Some(&literal(" ", false)));
    n("a\\N{U+ZZ}", ErrorKind::BadCollatingName, 1);
}

#[test]
fn repeat_binds_to_last_multibyte_character() {
    let program = x("éü*");
    assert_eq!(program.get(1), Some(&literal("é", false)));
    assert!(matches!(program.get(2), Some(Instr::Repeat { .. })));
    assert_eq!(program.get(3), Some(&literal("ü", false)));
}

// === Sets ===

#[test]
fn multibyte_ranges() {
    let program = x("[α-ω]");
    assert_eq!(first_set(&program).ranges.as_slice(), [('α', 'ω')]);
}

#[test]
fn collating_elements() {
    let program = compile("[[.U+0041.]é]", SyntaxOptions::EXTENDED).unwrap();
    let set = first_set(&program);
    assert!(set.singles.contains(&'A'));
    assert!(set.singles.contains(&'é'));
}

#[test]
fn property_classes() {
    assert_eq!(first_set(&x("\\p{Lu}")).classes, CharClass::UPPER);
    assert_eq!(first_set(&x("\\p{Nd}")).classes, CharClass::DIGIT);
    let negated = x("\\P{Letter}");
    assert!(first_set(&negated).negated);
    n("\\p{Klingon}", ErrorKind::BadCharacterClass, 0);
}

#[test]
fn ascii_traits_reject_unicode_properties() {
    let err = compile_with_traits("\\p{Lu}", SyntaxOptions::PERL, &REGEX_TRAITS_ASCII).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadCharacterClass);
    assert_eq!(err.offset(), 0);
}

// === Case folding ===

#[test]
fn unicode_case_folding() {
    let program = x("(?i)ΣÉ");
    assert!(program.iter().any(|i| *i == literal("σé", true)));
}

#[test]
fn ascii_traits_leave_non_ascii_alone() {
    let options = SyntaxOptions::PERL | SyntaxOptions::ICASE;
    let program = compile_with_traits("ÉA", options, &REGEX_TRAITS_ASCII).unwrap();
    assert_eq!(program.get(1), Some(&literal("Éa", true)));
    let program = compile_with_traits("ÉA", options, &REGEX_TRAITS_UNICODE).unwrap();
    assert_eq!(program.get(1), Some(&literal("éa", true)));
}

// === Error offsets ===

#[test]
fn error_offsets_are_bytes() {
    n("é(", ErrorKind::UnmatchedParen, 3);
    n("ü*+*", ErrorKind::BadRepeat, 4);
    n("[ü-a]", ErrorKind::BadRange, 1);
    n("日本)", ErrorKind::UnmatchedParen, 6);
}

#[test]
fn error_excerpt_on_char_boundary() {
    let err = compile("日本語(", SyntaxOptions::PERL).unwrap_err();
    assert!(err.message().contains("日本語(>>>HERE>>>"), "{}", err);
}

// === Groups ===

#[test]
fn spans_after_multibyte_text() {
    let options = SyntaxOptions::PERL | SyntaxOptions::SAVE_SUBEXPRESSION_LOCATION;
    let program = compile("é(a)", options).unwrap();
    assert_eq!(program.subexpression(1), Some(SubexpressionSpan { start: 2, end: 4 }));
}

#[test]
fn unicode_group_names() {
    let program = x("(?<名前>a)\\k<名前>");
    assert_eq!(program.name_to_group_numbers("名前"), Some(&[1][..]));
    assert!(program.iter().any(|i| matches!(i, Instr::Backref { index: 1, .. })));
}

// === Whitespace and newlines ===

#[test]
fn extended_mode_skips_unicode_spaces() {
    let options = SyntaxOptions::PERL | SyntaxOptions::MOD_X;
    let program = compile("a\u{3000}b", options).unwrap();
    assert_eq!(program.get(1), Some(&literal("ab", false)));
    let program = compile_with_traits("a\u{3000}b", options, &REGEX_TRAITS_ASCII).unwrap();
    assert_eq!(program.get(1), Some(&literal("a\u{3000}b", false)));
}

#[test]
fn unicode_line_separator_alternates() {
    let program = compile("a\u{2028}b", SyntaxOptions::GREP).unwrap();
    assert!(matches!(program.get(0), Some(Instr::Alt { .. })));
    let program = compile("a\u{2028}b", SyntaxOptions::BASIC).unwrap();
    assert_eq!(program.get(0), Some(&literal("a\u{2028}b", false)));
}
