// regparse_types.rs - Parser state and its supporting structures.
//
// The parser is a set of methods on one `ParserState`. It owns the program
// under construction and everything the grammar handlers share: the cursor,
// the live option flags, capture numbering, the alternation bookkeeping and
// the first error raised.

use std::collections::HashSet;

use smallvec::SmallVec;

use crate::error::CompileError;
use crate::regenc::{RegexTraits, SyntaxType};
use crate::regint::Program;
use crate::regsyntax::{Grammar, SyntaxOptions};

/// Deepest group nesting the statement loop accepts.
pub const MAX_RECURSION_DEPTH: u32 = 400;

// === Closed-capture set ===

/// Capture indices that have been closed and may be referenced.
///
/// The first 64 indices live in a bit mask; larger ones spill into a hash set.
#[derive(Debug, Clone, Default)]
pub struct BackrefSet {
    low: u64,
    high: HashSet<usize>,
}

impl BackrefSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, index: usize) {
        if index < 64 {
            self.low |= 1u64 << index;
        } else {
            self.high.insert(index);
        }
    }

    pub fn test(&self, index: usize) -> bool {
        if index < 64 {
            self.low & (1u64 << index) != 0
        } else {
            self.high.contains(&index)
        }
    }
}

// === Forward references ===

/// A name used by a recursion or condition before the group may exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingName {
    pub name: String,
    /// Byte offset of the construct in the pattern.
    pub offset: usize,
}

// === Scope save area ===

/// State saved when a group opens and restored when it closes.
#[derive(Debug, Clone, Copy)]
pub struct Scope {
    pub alt_insert_point: usize,
    pub flags: SyntaxOptions,
    pub has_case_change: bool,
    pub mark_reset: Option<usize>,
    pub max_mark: usize,
}

// === Parser state ===

pub struct ParserState<'a> {
    // cursor
    pub(crate) pattern: &'a str,
    pub(crate) pos: usize,
    pub(crate) end: usize,

    pub(crate) flags: SyntaxOptions,
    pub(crate) grammar: Grammar,
    pub(crate) traits: &'a dyn RegexTraits,
    pub(crate) program: Program,

    // capture numbering
    pub(crate) mark_count: usize,
    pub(crate) mark_reset: Option<usize>,
    pub(crate) max_mark: usize,
    pub(crate) backrefs: BackrefSet,

    // alternation
    pub(crate) paren_start: usize,
    pub(crate) alt_insert_point: usize,
    pub(crate) alt_jumps: SmallVec<[usize; 16]>,
    pub(crate) has_case_change: bool,

    pub(crate) recursion_count: u32,
    pub(crate) pending_names: Vec<PendingName>,
    /// Numbered conditions as `(group, pattern offset)`, checked once the
    /// capture count is known.
    pub(crate) pending_groups: Vec<(usize, usize)>,
    /// Pattern offsets of recursion calls, in emission order.
    pub(crate) recursion_sites: Vec<usize>,
    pub(crate) error: Option<CompileError>,
}

impl<'a> ParserState<'a> {
    pub fn new(pattern: &'a str, flags: SyntaxOptions, traits: &'a dyn RegexTraits) -> Self {
        ParserState {
            pattern,
            pos: 0,
            end: pattern.len(),
            flags,
            grammar: flags.grammar().unwrap_or(Grammar::Perl),
            traits,
            program: Program::new(flags),
            mark_count: 0,
            mark_reset: None,
            max_mark: 0,
            backrefs: BackrefSet::new(),
            paren_start: 0,
            alt_insert_point: 0,
            alt_jumps: SmallVec::new(),
            has_case_change: false,
            recursion_count: 0,
            pending_names: Vec::new(),
            pending_groups: Vec::new(),
            recursion_sites: Vec::new(),
            error: None,
        }
    }

    // --- Cursor ---

    #[inline]
    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.end
    }

    /// Character at byte offset `pos`, if inside the pattern.
    #[inline]
    pub(crate) fn char_at(&self, pos: usize) -> Option<char> {
        if pos >= self.end {
            return None;
        }
        self.pattern[pos..self.end].chars().next()
    }

    #[inline]
    pub(crate) fn peek(&self) -> Option<char> {
        self.char_at(self.pos)
    }

    /// Syntactic role of the character at `pos`.
    #[inline]
    pub(crate) fn syntax_at(&self, pos: usize) -> Option<SyntaxType> {
        self.char_at(pos).map(|c| self.traits.syntax_type(c))
    }

    #[inline]
    pub(crate) fn peek_syntax(&self) -> Option<SyntaxType> {
        self.syntax_at(self.pos)
    }

    /// Offset just past the character at `pos`.
    #[inline]
    pub(crate) fn next_pos(&self, pos: usize) -> usize {
        self.char_at(pos).map_or(self.end, |c| pos + c.len_utf8())
    }

    /// Offset of the character before `pos`.
    #[inline]
    pub(crate) fn prev_pos(&self, pos: usize) -> usize {
        self.pattern[..pos].chars().next_back().map_or(0, |c| pos - c.len_utf8())
    }

    #[inline]
    pub(crate) fn advance(&mut self) {
        self.pos = self.next_pos(self.pos);
    }

    /// Step over the current character; true if input remains afterwards.
    #[inline]
    pub(crate) fn advance_checked(&mut self) -> bool {
        self.advance();
        !self.at_end()
    }

    /// Does the remaining input start with `word`?
    pub(crate) fn looking_at(&self, word: &str) -> bool {
        self.pattern[self.pos..self.end].starts_with(word)
    }

    /// Parse a numeral at the cursor and step over it.
    pub(crate) fn toi(&mut self, radix: u32) -> Option<u32> {
        let (value, consumed) = self.traits.toi(&self.pattern[self.pos..self.end], radix)?;
        self.pos += consumed;
        Some(value)
    }

    /// Like [`toi`](Self::toi) but reads at most `max_chars` digits.
    pub(crate) fn toi_bounded(&mut self, radix: u32, max_chars: usize) -> Option<u32> {
        let limit = self.pattern[self.pos..self.end]
            .char_indices()
            .nth(max_chars)
            .map_or(self.end, |(i, _)| self.pos + i);
        let (value, consumed) = self.traits.toi(&self.pattern[self.pos..limit], radix)?;
        self.pos += consumed;
        Some(value)
    }

    #[inline]
    pub(crate) fn icase(&self) -> bool {
        self.flags.contains(SyntaxOptions::ICASE)
    }

    pub(crate) fn is_space(&self, c: char) -> bool {
        self.traits.isctype(c, crate::regenc::CharClass::SPACE)
    }

    // --- Scopes ---

    pub(crate) fn save_scope(&self) -> Scope {
        Scope {
            alt_insert_point: self.alt_insert_point,
            flags: self.flags,
            has_case_change: self.has_case_change,
            mark_reset: self.mark_reset,
            max_mark: self.max_mark,
        }
    }
}
