// regsyntax.rs - Option bitset and dialect presets.
//
// A dialect is nothing more than a set of option bits: one grammar selector
// (basic, extended, perl or literal) plus the quirks that the classic tools
// layered on top of it, such as grep's newline alternation.

use std::fmt;

bitflags::bitflags! {
    /// Compile options. Exactly one grammar selector may be set; none means Perl.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SyntaxOptions: u32 {
        // === Grammar selectors ===
        const BASIC_SYNTAX = 1 << 0;
        const EXTENDED_SYNTAX = 1 << 1;
        const PERL_SYNTAX = 1 << 2;
        const LITERAL = 1 << 3;

        // === Matching semantics ===
        /// Case-insensitive by default.
        const ICASE = 1 << 4;
        /// `^` and `$` only match at buffer boundaries.
        const NO_MOD_M = 1 << 5;
        /// `.` matches a newline.
        const MOD_S = 1 << 6;
        /// `.` never matches a newline.
        const NO_MOD_S = 1 << 7;
        /// Ignore unescaped whitespace and allow `#` comments.
        const MOD_X = 1 << 8;

        // === Dialect quirks ===
        /// `\N` is not a backreference (extended dialects).
        const NO_BK_REFS = 1 << 9;
        /// `\+` and `\?` are the repeat operators (basic dialects).
        const BK_PLUS_QM = 1 << 10;
        /// `\|` is the alternation operator (basic dialects).
        const BK_VBAR = 1 << 11;
        /// `\{m,n\}` is literal text.
        const NO_INTERVALS = 1 << 12;
        /// `[[:name:]]` is literal text.
        const NO_CHAR_CLASSES = 1 << 13;
        /// `\` is an ordinary character inside `[...]`.
        const NO_ESCAPE_IN_LISTS = 1 << 14;
        /// Emacs operators on top of the basic grammar.
        const EMACS_EX = 1 << 15;
        /// A newline in the pattern separates alternatives.
        const NEWLINE_ALT = 1 << 16;

        // === Output shaping ===
        /// Groups do not capture.
        const NOSUBS = 1 << 18;
        /// Record the source span of every capture group.
        const SAVE_SUBEXPRESSION_LOCATION = 1 << 19;
        /// Empty patterns and empty alternatives are errors, even in Perl mode.
        const NO_EMPTY_EXPRESSIONS = 1 << 20;
        /// Report failures as a status instead of an error.
        const NO_EXCEPT = 1 << 21;
    }
}

impl SyntaxOptions {
    /// Every grammar selector bit.
    pub const GRAMMAR_MASK: SyntaxOptions = SyntaxOptions::BASIC_SYNTAX
        .union(SyntaxOptions::EXTENDED_SYNTAX)
        .union(SyntaxOptions::PERL_SYNTAX)
        .union(SyntaxOptions::LITERAL);

    // === Presets ===

    pub const PERL: SyntaxOptions = SyntaxOptions::PERL_SYNTAX;
    pub const ECMASCRIPT: SyntaxOptions = SyntaxOptions::PERL_SYNTAX;
    pub const BASIC: SyntaxOptions = SyntaxOptions::BASIC_SYNTAX
        .union(SyntaxOptions::NO_ESCAPE_IN_LISTS);
    pub const EXTENDED: SyntaxOptions = SyntaxOptions::EXTENDED_SYNTAX
        .union(SyntaxOptions::NO_BK_REFS)
        .union(SyntaxOptions::NO_ESCAPE_IN_LISTS);
    pub const EMACS: SyntaxOptions = SyntaxOptions::BASIC_SYNTAX
        .union(SyntaxOptions::EMACS_EX)
        .union(SyntaxOptions::BK_VBAR);
    pub const AWK: SyntaxOptions = SyntaxOptions::EXTENDED_SYNTAX.union(SyntaxOptions::NO_BK_REFS);
    pub const GREP: SyntaxOptions = SyntaxOptions::BASIC.union(SyntaxOptions::NEWLINE_ALT);
    pub const EGREP: SyntaxOptions = SyntaxOptions::EXTENDED.union(SyntaxOptions::NEWLINE_ALT);
    pub const SED: SyntaxOptions = SyntaxOptions::BASIC;

    /// Classify the grammar selector. `None` when more than one is set.
    pub fn grammar(self) -> Option<Grammar> {
        let selected = self.intersection(Self::GRAMMAR_MASK);
        match selected.bits().count_ones() {
            0 => Some(Grammar::Perl),
            1 if selected == Self::BASIC_SYNTAX => Some(Grammar::Basic),
            1 if selected == Self::EXTENDED_SYNTAX => Some(Grammar::Extended),
            1 if selected == Self::PERL_SYNTAX => Some(Grammar::Perl),
            1 => Some(Grammar::Literal),
            _ => None,
        }
    }

    /// True when the Perl grammar (or the default) is selected.
    pub fn is_perl(self) -> bool {
        self.grammar() == Some(Grammar::Perl)
    }

    /// `(?...)`, `(*VERB)` and lazy quantifiers are available.
    pub fn allows_perl_ex(self) -> bool {
        match self.grammar() {
            Some(Grammar::Perl) => true,
            Some(Grammar::Basic) => self.contains(Self::EMACS_EX),
            _ => false,
        }
    }

    /// Empty patterns and empty alternatives are tolerated.
    pub fn allows_empty_expressions(self) -> bool {
        self.is_perl() && !self.contains(Self::NO_EMPTY_EXPRESSIONS)
    }

    /// Unescaped whitespace is insignificant.
    pub fn skips_whitespace(self) -> bool {
        self.is_perl() && self.contains(Self::MOD_X)
    }
}

/// The grammar function driving the top-level statement loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Basic,
    Extended,
    Perl,
    Literal,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Grammar::Basic => "basic",
            Grammar::Extended => "extended",
            Grammar::Perl => "perl",
            Grammar::Literal => "literal",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_perl() {
        assert_eq!(SyntaxOptions::empty().grammar(), Some(Grammar::Perl));
        assert_eq!(SyntaxOptions::ICASE.grammar(), Some(Grammar::Perl));
    }

    #[test]
    fn presets_classify() {
        assert_eq!(SyntaxOptions::BASIC.grammar(), Some(Grammar::Basic));
        assert_eq!(SyntaxOptions::GREP.grammar(), Some(Grammar::Basic));
        assert_eq!(SyntaxOptions::EMACS.grammar(), Some(Grammar::Basic));
        assert_eq!(SyntaxOptions::EXTENDED.grammar(), Some(Grammar::Extended));
        assert_eq!(SyntaxOptions::EGREP.grammar(), Some(Grammar::Extended));
        assert_eq!(SyntaxOptions::AWK.grammar(), Some(Grammar::Extended));
        assert_eq!(SyntaxOptions::LITERAL.grammar(), Some(Grammar::Literal));
        assert_eq!(SyntaxOptions::SED.grammar().map(|g| g.to_string()).as_deref(), Some("basic"));
    }

    #[test]
    fn preset_contents() {
        assert_eq!(SyntaxOptions::BASIC, SyntaxOptions::BASIC_SYNTAX | SyntaxOptions::NO_ESCAPE_IN_LISTS);
        assert_eq!(SyntaxOptions::AWK, SyntaxOptions::EXTENDED_SYNTAX | SyntaxOptions::NO_BK_REFS);
        assert_eq!(
            SyntaxOptions::EMACS,
            SyntaxOptions::BASIC_SYNTAX | SyntaxOptions::EMACS_EX | SyntaxOptions::BK_VBAR
        );
        assert_eq!(SyntaxOptions::EGREP - SyntaxOptions::EXTENDED, SyntaxOptions::NEWLINE_ALT);
    }

    #[test]
    fn two_selectors_are_rejected() {
        let both = SyntaxOptions::BASIC_SYNTAX | SyntaxOptions::LITERAL;
        assert_eq!(both.grammar(), None);
        let both = SyntaxOptions::PERL_SYNTAX | SyntaxOptions::EXTENDED_SYNTAX;
        assert_eq!(both.grammar(), None);
    }

    #[test]
    fn perl_extensions_gate() {
        assert!(SyntaxOptions::PERL.allows_perl_ex());
        assert!(SyntaxOptions::EMACS.allows_perl_ex());
        assert!(!SyntaxOptions::BASIC.allows_perl_ex());
        assert!(!SyntaxOptions::EXTENDED.allows_perl_ex());
    }

    #[test]
    fn empty_expressions() {
        assert!(SyntaxOptions::PERL.allows_empty_expressions());
        assert!(!(SyntaxOptions::PERL | SyntaxOptions::NO_EMPTY_EXPRESSIONS)
            .allows_empty_expressions());
        assert!(!SyntaxOptions::EXTENDED.allows_empty_expressions());
    }
}
