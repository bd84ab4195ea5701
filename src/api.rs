// api.rs - Idiomatic Rust API for regprog.
//
// Wraps the compile entry points with Rust-native types: Regex and
// RegexBuilder. A Regex owns its pattern text and the outcome of compiling it.

use std::ops::Range;

use crate::encodings::REGEX_TRAITS_UNICODE;
use crate::error::{CompileError, CompileStatus, ErrorKind};
use crate::regcomp::compile_with_traits;
use crate::regenc::RegexTraitsRef;
use crate::regerror::REG_NORMAL;
use crate::regint::Program;
use crate::regsyntax::SyntaxOptions;

/// A compiled regular expression.
///
/// # Examples
///
/// ```
/// use regprog::api::Regex;
///
/// let re = Regex::new(r"(?<year>\d{4})-(\d{2})").unwrap();
/// assert_eq!(re.captures_len(), 2);
/// assert_eq!(re.group_numbers("year"), Some(&[1][..]));
/// assert!(re.program().is_some());
/// ```
pub struct Regex {
    pattern: String,
    options: SyntaxOptions,
    status: CompileStatus,
}

impl Regex {
    /// Compile a pattern with Perl syntax and the Unicode traits.
    pub fn new(pattern: &str) -> Result<Regex, CompileError> {
        RegexBuilder::new(pattern).build()
    }

    /// Create a [`RegexBuilder`] for fine-grained control over compilation.
    pub fn builder(pattern: &str) -> RegexBuilder {
        RegexBuilder::new(pattern)
    }

    /// The pattern text this expression was built from.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Options the pattern was compiled with.
    pub fn options(&self) -> SyntaxOptions {
        self.options
    }

    /// The compiled program, or `None` when compilation failed under
    /// [`RegexBuilder::no_except`].
    pub fn program(&self) -> Option<&Program> {
        self.status.program()
    }

    /// `REG_NORMAL` (0) when the pattern compiled, otherwise the error code.
    pub fn status(&self) -> i32 {
        self.status.status()
    }

    pub fn is_valid(&self) -> bool {
        self.status() == REG_NORMAL
    }

    /// Why compilation failed, if it did.
    pub fn error(&self) -> Option<&CompileError> {
        self.status.error()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.status.kind()
    }

    /// Number of capture groups in the pattern (excluding group 0).
    pub fn captures_len(&self) -> usize {
        self.program()
            .map_or(0, |program| program.mark_count().saturating_sub(1))
    }

    /// Group indices carrying `name`, in definition order.
    pub fn group_numbers(&self, name: &str) -> Option<&[usize]> {
        self.program()?.name_to_group_numbers(name)
    }

    /// Names of all named groups, sorted.
    pub fn capture_names(&self) -> Vec<&str> {
        let Some(program) = self.program() else {
            return Vec::new();
        };
        let mut names: Vec<&str> = program
            .names()
            .entries()
            .into_iter()
            .map(|entry| entry.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Byte range of group `index` in the pattern text, from its `(` to its
    /// `)`. Only recorded with [`RegexBuilder::save_subexpression_locations`].
    pub fn group_span(&self, index: usize) -> Option<Range<usize>> {
        let span = self.program()?.subexpression(index)?;
        Some(span.start..span.end)
    }

    /// True when a backtracking verb such as `(*COMMIT)` appears.
    pub fn disables_match_any(&self) -> bool {
        self.program().is_some_and(Program::disables_match_any)
    }
}

impl std::fmt::Debug for Regex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Regex")
            .field("pattern", &self.pattern)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

// === RegexBuilder ===

/// Builder for compiling a [`Regex`] with a chosen dialect and options.
///
/// # Examples
///
/// ```
/// use regprog::api::Regex;
/// use regprog::regsyntax::SyntaxOptions;
///
/// let re = Regex::builder(r"\(ab\)*")
///     .syntax(SyntaxOptions::BASIC)
///     .case_insensitive(true)
///     .build()
///     .unwrap();
/// assert_eq!(re.captures_len(), 1);
///
/// // with no_except, failures are reported through status()
/// let bad = Regex::builder("a(").no_except(true).build().unwrap();
/// assert!(!bad.is_valid());
/// ```
pub struct RegexBuilder {
    pattern: String,
    syntax: SyntaxOptions,
    options: SyntaxOptions,
    traits: RegexTraitsRef,
}

impl RegexBuilder {
    /// Create a new builder for the given pattern (Perl syntax, Unicode traits).
    pub fn new(pattern: &str) -> Self {
        RegexBuilder {
            pattern: pattern.to_string(),
            syntax: SyntaxOptions::PERL,
            options: SyntaxOptions::empty(),
            traits: &REGEX_TRAITS_UNICODE,
        }
    }

    /// Select the dialect preset (default: [`SyntaxOptions::PERL`]).
    ///
    /// Options set through the other methods are kept.
    pub fn syntax(mut self, syntax: SyntaxOptions) -> Self {
        self.syntax = syntax;
        self
    }

    /// Enable or disable case-insensitive literals and sets.
    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.options.set(SyntaxOptions::ICASE, yes);
        self
    }

    /// Make `.` match newlines (`yes`) or never match them (`no`).
    pub fn dot_matches_newline(mut self, yes: bool) -> Self {
        self.options.set(SyntaxOptions::MOD_S, yes);
        self.options.set(SyntaxOptions::NO_MOD_S, !yes);
        self
    }

    /// Enable or disable `^`/`$` matching at every line boundary.
    pub fn multi_line_anchors(mut self, yes: bool) -> Self {
        self.options.set(SyntaxOptions::NO_MOD_M, !yes);
        self
    }

    /// Enable or disable extended mode (whitespace and `#` comments ignored).
    pub fn extended(mut self, yes: bool) -> Self {
        self.options.set(SyntaxOptions::MOD_X, yes);
        self
    }

    /// Treat every group as non-capturing.
    pub fn no_subs(mut self, yes: bool) -> Self {
        self.options.set(SyntaxOptions::NOSUBS, yes);
        self
    }

    /// Record each capture group's span in the pattern text.
    pub fn save_subexpression_locations(mut self, yes: bool) -> Self {
        self.options.set(SyntaxOptions::SAVE_SUBEXPRESSION_LOCATION, yes);
        self
    }

    /// Reject empty alternatives in the Perl dialect.
    pub fn no_empty_expressions(mut self, yes: bool) -> Self {
        self.options.set(SyntaxOptions::NO_EMPTY_EXPRESSIONS, yes);
        self
    }

    /// Never fail [`build`](Self::build); query [`Regex::status`] instead.
    pub fn no_except(mut self, yes: bool) -> Self {
        self.options.set(SyntaxOptions::NO_EXCEPT, yes);
        self
    }

    /// Set a raw option flag.
    pub fn option(mut self, flag: SyntaxOptions) -> Self {
        self.options |= flag;
        self
    }

    /// Classify characters with `traits` (default: Unicode).
    pub fn traits(mut self, traits: RegexTraitsRef) -> Self {
        self.traits = traits;
        self
    }

    /// Compile the pattern into a [`Regex`].
    pub fn build(self) -> Result<Regex, CompileError> {
        let options = self.syntax | self.options;
        match compile_with_traits(&self.pattern, options, self.traits) {
            Err(err) if !options.contains(SyntaxOptions::NO_EXCEPT) => Err(err),
            result => Ok(Regex {
                pattern: self.pattern,
                options,
                status: CompileStatus::from(result),
            }),
        }
    }
}
