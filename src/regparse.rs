// regparse.rs - Grammar handlers.
//
// One method per construct. A handler starts with the cursor on the
// character that selected it and leaves the cursor past everything it
// consumed. Handlers return `Ok(true)` to keep the statement loop going,
// `Ok(false)` when the cursor sits on a `)` that closes the enclosing scope,
// and `Err` once a failure has been recorded through `fail`.

use memchr::{memchr, memchr3};

use crate::error::{CompileError, ErrorKind};
use crate::regenc::{CharClass, EscapeType, SyntaxType};
use crate::regint::*;
use crate::regparse_types::{ParserState, PendingName, MAX_RECURSION_DEPTH};
use crate::regsyntax::{Grammar, SyntaxOptions};

type ParseResult = Result<bool, CompileError>;

/// `\R` expands to this sub-pattern.
const LINE_ENDING: &str = "(?>\\x0D\\x0A?|[\\x0A-\\x0C\\x{85}\\x{2028}\\x{2029}])";

/// Shape of the record a repeat operator applies to.
enum RepeatTarget {
    Nothing,
    Group(MarkKind),
    LiteralRun,
    Single,
    Fixed,
}

/// Records that match no text of their own and so cannot be repeated.
fn is_repeatable(instr: &Instr) -> bool {
    !matches!(
        instr,
        Instr::StartLine
            | Instr::EndLine
            | Instr::WordBoundary
            | Instr::WithinWord
            | Instr::WordStart
            | Instr::WordEnd
            | Instr::BufferStart
            | Instr::BufferEnd
            | Instr::SoftBufferEnd
            | Instr::RestartContinue
            | Instr::Alt { .. }
            | Instr::Jump { .. }
            | Instr::StartMark { .. }
            | Instr::Backstep
            | Instr::ToggleCase { .. }
            | Instr::ResetStartMark
    )
}

impl<'a> ParserState<'a> {
    // ========================================================================
    // Statement loops
    // ========================================================================

    /// Run the grammar's statement parser until the input or the scope ends.
    ///
    /// Returns `Ok(false)` when a `)` stopped the loop.
    pub(crate) fn parse_all(&mut self) -> ParseResult {
        if self.recursion_count >= MAX_RECURSION_DEPTH {
            return Err(self.fail_with(
                ErrorKind::ComplexityLimitExceeded,
                self.pos,
                "Exceeded nested brace limit.",
            ));
        }
        self.recursion_count += 1;
        let result = self.parse_statements();
        self.recursion_count -= 1;
        result
    }

    fn parse_statements(&mut self) -> ParseResult {
        while !self.at_end() {
            let keep_going = match self.grammar {
                Grammar::Basic => self.parse_basic()?,
                Grammar::Literal => self.parse_literal()?,
                Grammar::Extended | Grammar::Perl => self.parse_extended()?,
            };
            if !keep_going {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn parse_extended(&mut self) -> ParseResult {
        let Some(c) = self.peek() else {
            return Ok(true);
        };
        match self.traits.syntax_type(c) {
            SyntaxType::OpenMark => self.parse_open_paren(),
            SyntaxType::CloseMark => Ok(false),
            SyntaxType::Escape => self.parse_extended_escape(),
            SyntaxType::Dot => self.parse_match_any(),
            SyntaxType::Caret => {
                let anchor = if self.flags.contains(SyntaxOptions::NO_MOD_M) {
                    Instr::BufferStart
                } else {
                    Instr::StartLine
                };
                self.append_assertion(anchor)
            }
            SyntaxType::Dollar => {
                let anchor = if self.flags.contains(SyntaxOptions::NO_MOD_M) {
                    Instr::BufferEnd
                } else {
                    Instr::EndLine
                };
                self.append_assertion(anchor)
            }
            role @ (SyntaxType::Star | SyntaxType::Plus | SyntaxType::Question) => {
                if self.pos == 0 {
                    let message = format!(
                        "The repeat operator \"{}\" cannot start a regular expression.",
                        c
                    );
                    return Err(self.fail_with(ErrorKind::BadRepeat, 0, &message));
                }
                self.advance();
                match role {
                    SyntaxType::Star => self.parse_repeat(0, INFINITE_REPEAT),
                    SyntaxType::Plus => self.parse_repeat(1, INFINITE_REPEAT),
                    _ => self.parse_repeat(0, Some(1)),
                }
            }
            SyntaxType::OpenBrace => {
                self.advance();
                self.parse_repeat_range(false)
            }
            SyntaxType::CloseBrace if self.grammar != Grammar::Perl => Err(self.fail_with(
                ErrorKind::UnmatchedBrace,
                self.pos,
                "Found a closing repetition operator } with no corresponding {.",
            )),
            SyntaxType::Or => self.parse_alt(),
            SyntaxType::OpenSet => self.parse_set(),
            SyntaxType::Newline if self.flags.contains(SyntaxOptions::NEWLINE_ALT) => self.parse_alt(),
            SyntaxType::Hash if self.flags.skips_whitespace() => {
                let rest = &self.pattern.as_bytes()[self.pos..self.end];
                match memchr3(b'\n', b'\r', b'\x0c', rest) {
                    Some(i) => self.pos += i + 1,
                    None => self.pos = self.end,
                }
                Ok(true)
            }
            _ => self.parse_literal(),
        }
    }

    fn parse_basic(&mut self) -> ParseResult {
        let Some(c) = self.peek() else {
            return Ok(true);
        };
        let emacs = self.flags.contains(SyntaxOptions::EMACS_EX);
        match self.traits.syntax_type(c) {
            SyntaxType::Escape => self.parse_basic_escape(),
            SyntaxType::Dot => self.parse_match_any(),
            SyntaxType::Caret => self.append_assertion(Instr::StartLine),
            SyntaxType::Dollar => self.append_assertion(Instr::EndLine),
            SyntaxType::Star => {
                // a leading `*` is an ordinary character
                if self.at_expression_start() {
                    return self.parse_literal();
                }
                self.advance();
                self.parse_repeat(0, INFINITE_REPEAT)
            }
            SyntaxType::Plus if emacs && !self.at_expression_start() => {
                self.advance();
                self.parse_repeat(1, INFINITE_REPEAT)
            }
            SyntaxType::Question if emacs && !self.at_expression_start() => {
                self.advance();
                self.parse_repeat(0, Some(1))
            }
            SyntaxType::OpenSet => self.parse_set(),
            SyntaxType::Newline if self.flags.contains(SyntaxOptions::NEWLINE_ALT) => self.parse_alt(),
            _ => self.parse_literal(),
        }
    }

    /// True at the start of a pattern, group or alternative, or right after `^`.
    fn at_expression_start(&self) -> bool {
        self.program.len() == self.alt_insert_point
            || matches!(self.last_state(), Some(Instr::StartLine))
    }

    pub(crate) fn parse_literal(&mut self) -> ParseResult {
        let Some(c) = self.peek() else {
            return Ok(true);
        };
        if !self.flags.skips_whitespace() || !self.is_space(c) {
            self.append_literal(c);
        }
        self.advance();
        Ok(true)
    }

    fn parse_match_any(&mut self) -> ParseResult {
        self.advance();
        let mode = if self.flags.contains(SyntaxOptions::NO_MOD_S) {
            DotMode::NotNewline
        } else if self.flags.contains(SyntaxOptions::MOD_S) {
            DotMode::Any
        } else {
            DotMode::Default
        };
        self.append_state(Instr::Wild { mode });
        Ok(true)
    }

    /// Step over the selecting character and emit a zero-width record.
    fn append_assertion(&mut self, instr: Instr) -> ParseResult {
        self.advance();
        self.append_state(instr);
        Ok(true)
    }

    // ========================================================================
    // Escapes
    // ========================================================================

    fn incomplete_escape(&mut self, escape_start: usize) -> CompileError {
        self.fail_with(
            ErrorKind::MalformedEscape,
            escape_start,
            "Incomplete escape sequence found.",
        )
    }

    fn parse_basic_escape(&mut self) -> ParseResult {
        let escape_start = self.pos;
        self.advance();
        let Some(c) = self.peek() else {
            return Err(self.incomplete_escape(escape_start));
        };
        let flags = self.flags;
        match self.traits.escape_syntax_type(c) {
            EscapeType::OpenMark => return self.parse_open_paren(),
            EscapeType::CloseMark => return Ok(false),
            EscapeType::Plus if flags.contains(SyntaxOptions::BK_PLUS_QM) => {
                self.advance();
                return self.parse_repeat(1, INFINITE_REPEAT);
            }
            EscapeType::Question if flags.contains(SyntaxOptions::BK_PLUS_QM) => {
                self.advance();
                return self.parse_repeat(0, Some(1));
            }
            EscapeType::OpenBrace if !flags.contains(SyntaxOptions::NO_INTERVALS) => {
                self.advance();
                return self.parse_repeat_range(true);
            }
            EscapeType::CloseBrace if !flags.contains(SyntaxOptions::NO_INTERVALS) => {
                return Err(self.fail_with(
                    ErrorKind::UnmatchedBrace,
                    escape_start,
                    "Found a closing repetition operator } with no corresponding {.",
                ));
            }
            EscapeType::Or if flags.contains(SyntaxOptions::BK_VBAR) => return self.parse_alt(),
            EscapeType::Digit => return self.parse_backref(),
            _ => {}
        }

        if flags.contains(SyntaxOptions::EMACS_EX) {
            match self.traits.escape_syntax_type(c) {
                EscapeType::StartBuffer => return self.append_assertion(Instr::BufferStart),
                EscapeType::EndBuffer => return self.append_assertion(Instr::BufferEnd),
                EscapeType::WordAssert => return self.append_assertion(Instr::WordBoundary),
                EscapeType::NotWordAssert => return self.append_assertion(Instr::WithinWord),
                EscapeType::LeftWord => return self.append_assertion(Instr::WordStart),
                EscapeType::RightWord => return self.append_assertion(Instr::WordEnd),
                _ => {}
            }
            match c {
                'w' | 'W' => {
                    self.advance();
                    let set = CharSet::of_class(CharClass::WORD, c == 'W', self.icase());
                    self.append_set(set);
                    return Ok(true);
                }
                's' | 'S' => {
                    self.advance();
                    return self.add_emacs_code(escape_start, c == 'S');
                }
                'c' | 'C' => {
                    return Err(self.fail_with(
                        ErrorKind::MalformedEscape,
                        escape_start,
                        "The \\c and \\C escape sequences are not supported by POSIX basic regular expressions: try the Perl syntax instead.",
                    ));
                }
                _ => {}
            }
        }

        self.parse_literal()
    }

    /// Emacs `\sC` / `\SC`: a set selected by the syntax code `C`.
    fn add_emacs_code(&mut self, escape_start: usize, negated: bool) -> ParseResult {
        let Some(code) = self.peek() else {
            return Err(self.incomplete_escape(escape_start));
        };
        let mut set = CharSet::new(self.icase());
        set.negated = negated;
        let members = match code {
            's' | ' ' | '-' => {
                set.add_class(CharClass::SPACE);
                ""
            }
            'w' => {
                set.add_class(CharClass::WORD);
                ""
            }
            '.' => {
                set.add_class(CharClass::PUNCT);
                ""
            }
            '_' => "$&*+-_<>",
            '(' => "([{",
            ')' => ")]}",
            '"' => "\"'`",
            '\'' => "',#",
            '<' => ";",
            '>' => "\n\x0c",
            _ => return Err(self.fail(ErrorKind::BadCharacterClass, self.pos)),
        };
        for c in members.chars() {
            set.add_single(c);
        }
        self.advance();
        self.append_set(set);
        Ok(true)
    }

    fn parse_extended_escape(&mut self) -> ParseResult {
        let escape_start = self.pos;
        self.advance();
        let Some(c) = self.peek() else {
            return Err(self.incomplete_escape(escape_start));
        };
        let perl = self.grammar == Grammar::Perl;
        match self.traits.escape_syntax_type(c) {
            EscapeType::Class => return self.parse_class_escape(escape_start, false),
            EscapeType::NotClass => return self.parse_class_escape(escape_start, true),
            EscapeType::ControlV if perl => return self.parse_class_escape(escape_start, false),
            EscapeType::Digit => return self.parse_backref(),
            EscapeType::LeftWord => return self.append_assertion(Instr::WordStart),
            EscapeType::RightWord => return self.append_assertion(Instr::WordEnd),
            EscapeType::StartBuffer => return self.append_assertion(Instr::BufferStart),
            EscapeType::EndBuffer => return self.append_assertion(Instr::BufferEnd),
            EscapeType::WordAssert => return self.append_assertion(Instr::WordBoundary),
            EscapeType::NotWordAssert => return self.append_assertion(Instr::WithinWord),
            EscapeType::SoftBufferEnd => return self.append_assertion(Instr::SoftBufferEnd),
            EscapeType::RestartContinue => return self.append_assertion(Instr::RestartContinue),
            EscapeType::QuoteStart => return self.parse_quoted(),
            EscapeType::QuoteEnd => {
                // a stray \E
                self.advance();
                return Ok(true);
            }
            EscapeType::AnyUnit => return self.append_assertion(Instr::AnyUnit),
            EscapeType::Combining => return self.append_assertion(Instr::Combining),
            EscapeType::Property => return self.parse_property(escape_start, false),
            EscapeType::NotProperty => return self.parse_property(escape_start, true),
            EscapeType::ResetStartMark if perl => return self.append_assertion(Instr::ResetStartMark),
            EscapeType::LineEnding if perl => return self.parse_line_ending(),
            EscapeType::ExtendedBackref if perl => return self.parse_extended_backref(escape_start),
            _ => {}
        }
        let c = self.unescape_character(escape_start)?;
        self.append_literal(c);
        Ok(true)
    }

    /// `\d`, `\W` and friends. An unknown shorthand is an escaped literal.
    fn parse_class_escape(&mut self, escape_start: usize, negated: bool) -> ParseResult {
        let Some(c) = self.peek() else {
            return Err(self.incomplete_escape(escape_start));
        };
        let name: String = c.to_lowercase().collect();
        match self.traits.lookup_classname(&name, self.icase()) {
            Some(class) => {
                self.advance();
                let set = CharSet::of_class(class, negated, self.icase());
                self.append_set(set);
                Ok(true)
            }
            None => {
                let c = self.unescape_character(escape_start)?;
                self.append_literal(c);
                Ok(true)
            }
        }
    }

    /// `\Q...\E`: everything up to `\E` (or the end) is literal text.
    fn parse_quoted(&mut self) -> ParseResult {
        self.advance();
        let pattern = self.pattern;
        let start = self.pos;
        let (body_end, resume) = match self.find_from(start, "\\E") {
            Some(at) => (at, at + 2),
            None => (self.end, self.end),
        };
        for c in pattern[start..body_end].chars() {
            self.append_literal(c);
        }
        self.pos = resume;
        Ok(true)
    }

    /// `\pL`, `\p{Name}`, `\P{Name}`.
    fn parse_property(&mut self, escape_start: usize, negated: bool) -> ParseResult {
        self.advance();
        let pattern = self.pattern;
        let Some(c) = self.peek() else {
            return Err(self.fail_with(
                ErrorKind::MalformedEscape,
                escape_start,
                "Incomplete property escape found.",
            ));
        };
        let name = if c == '{' {
            let name_start = self.pos + 1;
            let Some(close) = self.find_from(name_start, "}") else {
                return Err(self.fail_with(
                    ErrorKind::MalformedEscape,
                    escape_start,
                    "Closing } missing from property escape sequence.",
                ));
            };
            self.pos = close + 1;
            &pattern[name_start..close]
        } else {
            let name_start = self.pos;
            self.advance();
            &pattern[name_start..self.pos]
        };
        match self.traits.lookup_classname(name, self.icase()) {
            Some(class) => {
                let set = CharSet::of_class(class, negated, self.icase());
                self.append_set(set);
                Ok(true)
            }
            None => Err(self.fail(ErrorKind::BadCharacterClass, escape_start)),
        }
    }

    /// `\R`: parse the line-ending alternation in place of the escape.
    fn parse_line_ending(&mut self) -> ParseResult {
        let saved = (self.pattern, self.pos, self.end);
        self.pattern = LINE_ENDING;
        self.pos = 0;
        self.end = LINE_ENDING.len();
        let result = self.parse_all();
        (self.pattern, self.pos, self.end) = saved;
        result?;
        self.advance();
        Ok(true)
    }

    /// Decode the escape whose introducer is at `escape_start`; the cursor is
    /// on the character after the introducer and ends past the sequence.
    pub(crate) fn unescape_character(&mut self, escape_start: usize) -> Result<char, CompileError> {
        let Some(c) = self.peek() else {
            return Err(self.fail_with(
                ErrorKind::MalformedEscape,
                escape_start,
                "Escape sequence terminated prematurely.",
            ));
        };
        let decoded = match self.traits.escape_syntax_type(c) {
            EscapeType::ControlA => '\x07',
            EscapeType::Escape => '\x1b',
            EscapeType::ControlF => '\x0c',
            EscapeType::ControlN => '\n',
            EscapeType::ControlR => '\r',
            EscapeType::ControlT => '\t',
            EscapeType::ControlV => '\x0b',
            EscapeType::WordAssert => '\x08',
            EscapeType::AsciiControl => {
                self.advance();
                let Some(x) = self.peek() else {
                    return Err(self.fail_with(
                        ErrorKind::MalformedEscape,
                        escape_start,
                        "ASCII escape sequence terminated prematurely.",
                    ));
                };
                char::from((u32::from(x) % 32) as u8)
            }
            EscapeType::Hex => return self.unescape_hex(escape_start),
            EscapeType::NamedChar => return self.unescape_named(escape_start),
            EscapeType::Digit if c == '0' => {
                // leading zero plus up to three octal digits
                return match self.toi_bounded(8, 4).and_then(char::from_u32) {
                    Some(decoded) => Ok(decoded),
                    None => Err(self.fail_with(
                        ErrorKind::MalformedEscape,
                        escape_start,
                        "Invalid octal escape sequence.",
                    )),
                };
            }
            _ => c,
        };
        self.advance();
        Ok(decoded)
    }

    fn unescape_hex(&mut self, escape_start: usize) -> Result<char, CompileError> {
        self.advance();
        if self.peek() == Some('{') {
            self.advance();
            let value = self.toi(16);
            if let (Some(value), Some('}')) = (value, self.peek()) {
                self.advance();
                if let Some(decoded) = char::from_u32(value) {
                    return Ok(decoded);
                }
            }
            return Err(self.fail_with(
                ErrorKind::BadBraceRange,
                escape_start,
                "Invalid or unterminated hexadecimal escape sequence.",
            ));
        }
        match self.toi_bounded(16, 2).and_then(char::from_u32) {
            Some(decoded) => Ok(decoded),
            None => Err(self.fail_with(
                ErrorKind::MalformedEscape,
                escape_start,
                "Hexadecimal escape sequence was invalid.",
            )),
        }
    }

    /// `\N{name}`, resolved through the collating-name table.
    fn unescape_named(&mut self, escape_start: usize) -> Result<char, CompileError> {
        self.advance();
        if self.peek() != Some('{') {
            return Err(self.incomplete_escape(escape_start));
        }
        let name_start = self.pos + 1;
        let Some(close) = self.find_from(name_start, "}") else {
            return Err(self.incomplete_escape(escape_start));
        };
        let pattern = self.pattern;
        let name = &pattern[name_start..close];
        self.pos = close + 1;
        let Some(text) = self.traits.lookup_collatename(name) else {
            return Err(self.fail(ErrorKind::BadCollatingName, escape_start));
        };
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(decoded), None) => Ok(decoded),
            _ => Err(self.fail_with(
                ErrorKind::MalformedEscape,
                escape_start,
                "A named character escape must name a single character.",
            )),
        }
    }

    // ========================================================================
    // Backreferences
    // ========================================================================

    /// `\N` with the cursor on the digit.
    fn parse_backref(&mut self) -> ParseResult {
        let escape_start = self.prev_pos(self.pos);
        let digit = self.pos;
        let value = self.toi_bounded(10, 1).unwrap_or(0) as usize;
        if value == 0 || self.flags.contains(SyntaxOptions::NO_BK_REFS) {
            // not a backreference: an octal escape or the digit itself
            self.pos = digit;
            let c = self.unescape_character(escape_start)?;
            self.append_literal(c);
            return Ok(true);
        }
        if self.backrefs.test(value) {
            self.append_backref(value);
            return Ok(true);
        }
        let offset = self.rewind_to(self.pos, SyntaxType::Escape);
        Err(self.fail_with(
            ErrorKind::BadBackreference,
            offset,
            "Found a backreference to a non-existent sub-expression.",
        ))
    }

    fn append_backref(&mut self, index: usize) {
        let icase = self.icase();
        self.append_state(Instr::Backref { index, icase });
    }

    /// `\g1`, `\g{-1}`, `\g{name}`, `\k<name>`, `\k'name'`, `\k{name}`.
    fn parse_extended_backref(&mut self, escape_start: usize) -> ParseResult {
        self.advance();
        let close = match self.peek() {
            Some('{') => Some('}'),
            Some('<') => Some('>'),
            Some('\'') => Some('\''),
            Some(_) => None,
            None => return Err(self.incomplete_escape(escape_start)),
        };
        if close.is_some() {
            self.advance();
        }
        let relative = self.peek() == Some('-');
        if relative {
            self.advance();
        }
        let index = match self.toi(10) {
            Some(n) if relative => (self.mark_count + 1).checked_sub(n as usize),
            Some(n) => Some(n as usize),
            None => {
                let Some(close) = close.filter(|_| !relative) else {
                    return Err(self.fail(ErrorKind::BadBackreference, escape_start));
                };
                let name_start = self.pos;
                let Some(name_end) = self.find_from(name_start, close.encode_utf8(&mut [0; 4])) else {
                    return Err(self.incomplete_escape(escape_start));
                };
                let pattern = self.pattern;
                self.pos = name_end;
                self.closed_group_named(&pattern[name_start..name_end])
            }
        };
        if let Some(close) = close {
            if self.peek() != Some(close) {
                return Err(self.incomplete_escape(escape_start));
            }
            self.advance();
        }
        match index {
            Some(index) if index > 0 && self.backrefs.test(index) => {
                self.append_backref(index);
                Ok(true)
            }
            _ => Err(self.fail_with(
                ErrorKind::BadBackreference,
                escape_start,
                "Found a backreference to a non-existent sub-expression.",
            )),
        }
    }

    /// Lowest closed capture carrying `name`.
    fn closed_group_named(&self, name: &str) -> Option<usize> {
        self.program
            .names
            .name_to_group_numbers(name)?
            .iter()
            .copied()
            .filter(|&index| self.backrefs.test(index))
            .min()
    }

    // ========================================================================
    // Groups and alternation
    // ========================================================================

    /// `(...)`, or `\(...\)` in the basic grammar. The cursor is on the `(`.
    fn parse_open_paren(&mut self) -> ParseResult {
        let open = self.pos;
        if !self.advance_checked() {
            return Err(self.fail(ErrorKind::UnmatchedParen, self.end));
        }
        if self.flags.allows_perl_ex() {
            match self.peek_syntax() {
                Some(SyntaxType::Question) => return self.parse_perl_extension(open),
                Some(SyntaxType::Star) if self.grammar == Grammar::Perl => {
                    return self.parse_perl_verb(open)
                }
                _ => {}
            }
        }

        let mark = if self.flags.contains(SyntaxOptions::NOSUBS) {
            MarkKind::NonCapturing
        } else {
            self.mark_count += 1;
            MarkKind::Capture(self.mark_count)
        };
        if let MarkKind::Capture(index) = mark {
            self.open_span(index, open);
        }
        let start = self.append_mark(true, mark);
        let scope = self.save_scope();
        self.alt_insert_point = self.program.len();
        self.has_case_change = false;
        self.mark_reset = None;

        self.parse_all()?;
        self.unwind_alts(Some(start))?;
        if self.has_case_change {
            let icase = scope.flags.contains(SyntaxOptions::ICASE);
            self.append_state(Instr::ToggleCase { icase });
        }
        self.flags = scope.flags;
        self.has_case_change = scope.has_case_change;
        self.mark_reset = scope.mark_reset;

        if self.at_end() {
            return Err(self.fail(ErrorKind::UnmatchedParen, self.end));
        }
        if self.peek_syntax() != Some(SyntaxType::CloseMark) {
            return Ok(false);
        }
        if let MarkKind::Capture(index) = mark {
            self.close_span(index, open, self.pos);
        }
        self.advance();
        self.append_mark(false, mark);
        self.paren_start = start;
        self.alt_insert_point = scope.alt_insert_point;
        if let MarkKind::Capture(index) = mark {
            self.backrefs.set(index);
        }
        Ok(true)
    }

    fn open_span(&mut self, index: usize, open: usize) {
        if !self.flags.contains(SyntaxOptions::SAVE_SUBEXPRESSION_LOCATION) {
            return;
        }
        let Some(slot) = index.checked_sub(1) else {
            return;
        };
        let spans = &mut self.program.subexpressions;
        // a branch reset reuses indices; the first group keeps the slot
        if slot < spans.len() {
            return;
        }
        spans.resize(slot, SubexpressionSpan::default());
        spans.push(SubexpressionSpan {
            start: open,
            end: open,
        });
    }

    fn close_span(&mut self, index: usize, open: usize, close: usize) {
        let Some(slot) = index.checked_sub(1) else {
            return;
        };
        if let Some(span) = self.program.subexpressions.get_mut(slot) {
            if span.start == open {
                span.end = close;
            }
        }
    }

    /// `|`, `\|` or a newline separating alternatives.
    fn parse_alt(&mut self) -> ParseResult {
        if self.program.len() == self.alt_insert_point && !self.flags.allows_empty_expressions() {
            return Err(self.fail_with(
                ErrorKind::EmptyPattern,
                self.pos,
                "A regular expression cannot start with the alternation operator |.",
            ));
        }
        self.max_mark = self.max_mark.max(self.mark_count);
        if let Some(reset) = self.mark_reset {
            self.mark_count = reset;
        }
        self.advance();

        let jump = self.append_state(Instr::Jump { rel: 0 });
        let alt = self.insert_state(self.alt_insert_point, Instr::Alt { rel: 0 });
        let jump = jump + 1;
        let next_branch = self.program.len();
        self.program.patch(alt, next_branch);
        self.alt_insert_point = next_branch;
        if self.has_case_change {
            let icase = self.icase();
            self.append_state(Instr::ToggleCase { icase });
        }
        self.alt_jumps.push(jump);
        Ok(true)
    }

    /// Patch the pending alternation jumps pushed after `last_paren_start`
    /// (all of them when `None`) to the current end of the program.
    pub(crate) fn unwind_alts(&mut self, last_paren_start: Option<usize>) -> Result<(), CompileError> {
        let inside = |jump: usize| last_paren_start.map_or(true, |start| jump > start);
        if self.program.len() == self.alt_insert_point
            && self.alt_jumps.last().is_some_and(|&jump| inside(jump))
            && !self.flags.allows_empty_expressions()
        {
            return Err(self.fail_with(
                ErrorKind::EmptyPattern,
                self.pos,
                "Can't terminate a sub-expression with an alternation operator |.",
            ));
        }
        while let Some(&jump) = self.alt_jumps.last() {
            if !inside(jump) {
                break;
            }
            self.alt_jumps.pop();
            if !matches!(self.program.get(jump), Some(Instr::Jump { .. })) {
                log::debug!("pending alternation jump {} is not a jump record", jump);
                return Err(self.fail_with(
                    ErrorKind::Unknown,
                    self.pos,
                    "Internal logic failed while compiling the expression.",
                ));
            }
            let end = self.program.len();
            self.program.patch(jump, end);
        }
        Ok(())
    }

    // ========================================================================
    // Repeats
    // ========================================================================

    /// Wrap the previous construct in a repeat. The cursor is past the operator.
    fn parse_repeat(&mut self, low: usize, high: Option<usize>) -> ParseResult {
        let mut greedy = true;
        let mut possessive = false;
        if self.flags.allows_perl_ex() {
            if self.flags.skips_whitespace() {
                self.skip_whitespace();
            }
            match self.peek_syntax() {
                Some(SyntaxType::Question) => {
                    greedy = false;
                    self.advance();
                }
                Some(SyntaxType::Plus) if self.grammar == Grammar::Perl => {
                    possessive = true;
                    self.advance();
                }
                _ => {}
            }
        }

        let target = match self.last_state() {
            None => RepeatTarget::Nothing,
            Some(Instr::EndMark { mark, .. }) => RepeatTarget::Group(*mark),
            Some(Instr::Literal { chars, .. }) if chars.len() > 1 => RepeatTarget::LiteralRun,
            Some(instr) if is_repeatable(instr) => RepeatTarget::Single,
            Some(_) => RepeatTarget::Fixed,
        };
        let insert_point = match target {
            RepeatTarget::Nothing => {
                return Err(self.fail_with(ErrorKind::BadRepeat, self.pos, "Nothing to repeat."));
            }
            RepeatTarget::Fixed => return Err(self.fail(ErrorKind::BadRepeat, self.pos)),
            RepeatTarget::Group(mark) => {
                let start = self.paren_start;
                if mark == MarkKind::Conditional
                    && matches!(
                        self.program.get(start + 2),
                        Some(Instr::AssertBackref {
                            cond: Condition::Define
                        })
                    )
                {
                    return Err(self.fail_with(
                        ErrorKind::BadRepeat,
                        self.pos,
                        "A DEFINE block cannot be repeated.",
                    ));
                }
                start
            }
            RepeatTarget::LiteralRun => {
                // the repeat binds to the last character only
                let split = match self.program.last_mut() {
                    Some(Instr::Literal { chars, icase }) => chars.pop().map(|c| (c, *icase)),
                    _ => None,
                };
                if let Some((c, icase)) = split {
                    self.program.append(Instr::literal(c, icase));
                }
                self.program.len() - 1
            }
            RepeatTarget::Single => self.program.len() - 1,
        };

        let repeat = self.insert_state(
            insert_point,
            Instr::Repeat {
                min: low,
                max: high,
                greedy,
                rel: 0,
            },
        );
        let back = self.append_state(Instr::Jump { rel: 0 });
        self.program.patch(back, repeat);
        let end = self.program.len();
        self.program.patch(repeat, end);

        if possessive {
            if self.followed_by_quantifier() {
                return Err(self.fail_with(
                    ErrorKind::BadRepeat,
                    self.pos,
                    "Double repeats are not permitted.",
                ));
            }
            // same layout as `(?>...)`: start marker, skip jump, body, end marker
            let icase = self.icase();
            self.insert_state(
                insert_point,
                Instr::StartMark {
                    mark: MarkKind::Independent,
                    icase,
                },
            );
            let jump = self.insert_state(insert_point + 1, Instr::Jump { rel: 0 });
            let end = self.program.len();
            self.program.patch(jump, end);
            self.append_mark(false, MarkKind::Independent);
        }
        Ok(true)
    }

    /// Is the next token another quantifier? Skips `(?#...)` comments.
    fn followed_by_quantifier(&mut self) -> bool {
        loop {
            if self.flags.skips_whitespace() {
                self.skip_whitespace();
            }
            if !self.looking_at("(?#") {
                break;
            }
            let rest = &self.pattern.as_bytes()[self.pos..self.end];
            match memchr(b')', rest) {
                Some(i) => self.pos += i + 1,
                None => self.pos = self.end,
            }
        }
        matches!(
            self.peek_syntax(),
            Some(SyntaxType::Star | SyntaxType::Plus | SyntaxType::Question | SyntaxType::OpenBrace)
        )
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !self.is_space(c) {
                break;
            }
            self.advance();
        }
    }

    /// `{m}`, `{m,}` or `{m,n}`; the cursor is past the `{`.
    ///
    /// The basic grammar (`\{m,n\}`) falls back to a literal `{` when the
    /// interval does not parse; the other grammars fail.
    fn parse_repeat_range(&mut self, is_basic: bool) -> ParseResult {
        let brace = self.prev_pos(self.pos);
        self.skip_whitespace();
        let Some(min) = self.toi(10) else {
            return self.repeat_range_fallback(brace, is_basic);
        };
        let min = min as usize;
        self.skip_whitespace();
        let max = if self.peek_syntax() == Some(SyntaxType::Comma) {
            self.advance();
            self.skip_whitespace();
            let max = self.toi(10).map(|max| max as usize);
            self.skip_whitespace();
            max
        } else {
            Some(min)
        };

        if is_basic {
            let closed = self.peek_syntax() == Some(SyntaxType::Escape)
                && self.syntax_at(self.next_pos(self.pos)) == Some(SyntaxType::CloseBrace);
            if !closed {
                return self.repeat_range_fallback(brace, is_basic);
            }
            self.advance();
        } else if self.peek_syntax() != Some(SyntaxType::CloseBrace) {
            return self.repeat_range_fallback(brace, is_basic);
        }
        self.advance();

        if let Some(max) = max {
            if min > max {
                return Err(self.fail_with(
                    ErrorKind::BadBraceRange,
                    brace,
                    "Bad repeat range: the minimum is greater than the maximum.",
                ));
            }
        }
        self.parse_repeat(min, max)
    }

    fn repeat_range_fallback(&mut self, brace: usize, is_basic: bool) -> ParseResult {
        if is_basic {
            self.pos = brace;
            return self.parse_literal();
        }
        if self.at_end() {
            return Err(self.fail_with(
                ErrorKind::UnmatchedBrace,
                self.pos,
                "Missing } in quantified repetition.",
            ));
        }
        Err(self.fail_with(
            ErrorKind::BadBraceRange,
            self.pos,
            "Invalid content of repeat range.",
        ))
    }

    // ========================================================================
    // Character sets
    // ========================================================================

    /// `[...]`; the cursor is on the opening bracket.
    fn parse_set(&mut self) -> ParseResult {
        let open = self.pos;
        self.advance();
        let mut set = CharSet::new(self.icase());
        if self.peek_syntax() == Some(SyntaxType::Caret) {
            set.negated = true;
            self.advance();
        }
        let item_base = self.pos;
        let escapes = self.grammar == Grammar::Perl
            && !self.flags.contains(SyntaxOptions::NO_ESCAPE_IN_LISTS);

        while !self.at_end() {
            match self.peek_syntax() {
                Some(SyntaxType::CloseSet) if self.pos != item_base => {
                    self.advance();
                    self.append_set(set);
                    return Ok(true);
                }
                Some(SyntaxType::OpenSet) => {
                    if !self.parse_inner_set(&mut set, open)? {
                        // replaced by a word assertion
                        return Ok(true);
                    }
                }
                Some(SyntaxType::Escape) if escapes && self.parse_set_class_escape(&mut set) => {}
                _ => self.parse_set_literal(&mut set, open)?,
            }
        }
        Err(self.fail(ErrorKind::UnmatchedBracket, open))
    }

    /// `\d`, `\W`, ... inside brackets. Leaves the cursor alone and returns
    /// false when the escape is not a class shorthand.
    fn parse_set_class_escape(&mut self, set: &mut CharSet) -> bool {
        let Some((class, negated)) = self.set_class_escape_at(self.pos) else {
            return false;
        };
        if negated {
            set.add_negated_class(class);
        } else {
            set.add_class(class);
        }
        self.pos = self.next_pos(self.next_pos(self.pos));
        true
    }

    /// The class named by the escape at `escape`, with its negation.
    fn set_class_escape_at(&self, escape: usize) -> Option<(CharClass, bool)> {
        let c = self.char_at(self.next_pos(escape))?;
        let negated = match self.traits.escape_syntax_type(c) {
            EscapeType::Class => false,
            EscapeType::NotClass => true,
            _ => return None,
        };
        let name: String = c.to_lowercase().collect();
        let class = self.traits.lookup_classname(&name, self.icase())?;
        Some((class, negated))
    }

    /// A `[` inside a set: `[:class:]`, `[=equiv=]`, `[.coll.]` or a literal.
    ///
    /// Returns `Ok(false)` when `[[:<:]]` or `[[:>:]]` replaced the whole set.
    fn parse_inner_set(&mut self, set: &mut CharSet, open: usize) -> Result<bool, CompileError> {
        let construct = self.pos;
        let after = self.next_pos(construct);
        let no_classes = self.grammar == Grammar::Basic
            && self.flags.contains(SyntaxOptions::NO_CHAR_CLASSES);
        let pattern = self.pattern;
        match self.syntax_at(after) {
            Some(SyntaxType::Colon) if !no_classes => {
                self.pos = self.next_pos(after);
                let negated = self.peek_syntax() == Some(SyntaxType::Caret);
                if negated {
                    self.advance();
                }
                let name_start = self.pos;
                let name_end = match self.find_from(name_start, ":]") {
                    Some(end) if end > name_start => end,
                    _ => return Err(self.fail(ErrorKind::UnmatchedBracket, construct)),
                };
                let name = &pattern[name_start..name_end];
                let close = name_end + 2;
                if let Some(class) = self.traits.lookup_classname(name, self.icase()) {
                    if negated {
                        set.add_negated_class(class);
                    } else {
                        set.add_class(class);
                    }
                    self.pos = close;
                    return Ok(true);
                }
                let word_anchor = match name {
                    "<" => Some(Instr::WordStart),
                    ">" => Some(Instr::WordEnd),
                    _ => None,
                };
                if let Some(anchor) = word_anchor {
                    if set.is_empty() && !negated && self.syntax_at(close) == Some(SyntaxType::CloseSet) {
                        self.pos = self.next_pos(close);
                        self.append_state(anchor);
                        return Ok(false);
                    }
                }
                Err(self.fail(ErrorKind::BadCharacterClass, name_start))
            }
            Some(SyntaxType::Equal) if !no_classes => {
                let name_start = self.next_pos(after);
                let name_end = match self.find_from(name_start, "=]") {
                    Some(end) if end > name_start => end,
                    _ => return Err(self.fail(ErrorKind::UnmatchedBracket, construct)),
                };
                let Some(c) = self.collating_element(&pattern[name_start..name_end]) else {
                    return Err(self.fail(ErrorKind::BadCollatingName, name_start));
                };
                set.add_equivalent(c);
                self.pos = name_end + 2;
                Ok(true)
            }
            _ => {
                // `[.x.]` and a plain `[` are read as set literals
                self.parse_set_literal(set, open)?;
                Ok(true)
            }
        }
    }

    /// A single character or a range.
    fn parse_set_literal(&mut self, set: &mut CharSet, open: usize) -> Result<(), CompileError> {
        let range_start = self.pos;
        let first = self.next_set_literal(set, open)?;
        if self.at_end() {
            return Err(self.fail(ErrorKind::UnmatchedBracket, open));
        }
        if self.peek_syntax() == Some(SyntaxType::Dash) {
            let dash = self.pos;
            if !self.advance_checked() {
                return Err(self.fail(ErrorKind::UnmatchedBracket, open));
            }
            if self.peek_syntax() != Some(SyntaxType::CloseSet) {
                let last = self.next_set_literal(set, open)?;
                if first > last {
                    return Err(self.fail_with(
                        ErrorKind::BadRange,
                        range_start,
                        "Invalid range end point: the end of the range precedes its start.",
                    ));
                }
                set.add_range(first, last);
                if self.peek_syntax() == Some(SyntaxType::Dash) {
                    let trailing = self.pos;
                    if !self.advance_checked() {
                        return Err(self.fail(ErrorKind::UnmatchedBracket, open));
                    }
                    if self.peek_syntax() == Some(SyntaxType::CloseSet) {
                        // `[a-z-]`: the dash is read again as a literal
                        self.pos = trailing;
                        return Ok(());
                    }
                    return Err(self.fail(ErrorKind::BadRange, self.pos));
                }
                return Ok(());
            }
            // `[a-]`
            self.pos = dash;
        }
        set.add_single(first);
        Ok(())
    }

    fn next_set_literal(&mut self, set: &CharSet, open: usize) -> Result<char, CompileError> {
        let Some(c) = self.peek() else {
            return Err(self.fail(ErrorKind::UnmatchedBracket, open));
        };
        match self.traits.syntax_type(c) {
            SyntaxType::Dash => {
                if !set.is_empty() && self.syntax_at(self.next_pos(self.pos)) != Some(SyntaxType::CloseSet) {
                    return Err(self.fail(ErrorKind::BadRange, self.pos));
                }
                self.advance();
                Ok(c)
            }
            SyntaxType::Escape if !self.flags.contains(SyntaxOptions::NO_ESCAPE_IN_LISTS) => {
                let escape_start = self.pos;
                if self.grammar == Grammar::Perl && self.set_class_escape_at(escape_start).is_some() {
                    // `[a-\d]`: a class cannot end a range
                    return Err(self.fail_with(
                        ErrorKind::BadRange,
                        escape_start,
                        "A character class escape cannot be the end point of a range.",
                    ));
                }
                if !self.advance_checked() {
                    return Err(self.fail(ErrorKind::UnmatchedBracket, open));
                }
                self.unescape_character(escape_start)
            }
            SyntaxType::OpenSet if self.syntax_at(self.next_pos(self.pos)) == Some(SyntaxType::Dot) => {
                let construct = self.pos;
                let name_start = self.next_pos(self.next_pos(construct));
                let name_end = match self.find_from(name_start, ".]") {
                    Some(end) if end > name_start => end,
                    _ => return Err(self.fail(ErrorKind::UnmatchedBracket, construct)),
                };
                let pattern = self.pattern;
                let Some(element) = self.collating_element(&pattern[name_start..name_end]) else {
                    return Err(self.fail(ErrorKind::BadCollatingName, name_start));
                };
                self.pos = name_end + 2;
                Ok(element)
            }
            _ => {
                self.advance();
                Ok(c)
            }
        }
    }

    /// A collating name that stands for exactly one character.
    fn collating_element(&self, name: &str) -> Option<char> {
        let text = self.traits.lookup_collatename(name)?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }

    // ========================================================================
    // Perl extensions
    // ========================================================================

    /// `(?...)`; `open` is the `(`, the cursor is on the `?`.
    fn parse_perl_extension(&mut self, open: usize) -> ParseResult {
        if !self.advance_checked() {
            return Err(self.fail(ErrorKind::MalformedPerlExtension, open));
        }
        if self.peek_syntax() == Some(SyntaxType::Hash) {
            let rest = &self.pattern.as_bytes()[self.pos..self.end];
            return match memchr(b')', rest) {
                Some(i) => {
                    self.pos += i + 1;
                    Ok(true)
                }
                None => Err(self.fail(ErrorKind::UnmatchedParen, self.end)),
            };
        }
        if self.looking_at("P=") {
            return self.parse_named_backref_group(open);
        }

        let start = self.append_mark(true, MarkKind::NonCapturing);
        let scope = self.save_scope();
        self.alt_insert_point = self.program.len();
        let expected_alt_point = self.alt_insert_point;
        let mut restore_flags = true;
        let mut old_case_change = self.has_case_change;
        self.has_case_change = false;
        self.mark_reset = None;
        self.max_mark = self.mark_count;

        let mut mark = MarkKind::NonCapturing;
        let mut skip_jump = None;
        let mut body_start = 0;
        let mut capture = None;

        let Some(c) = self.peek() else {
            return Err(self.fail(ErrorKind::MalformedPerlExtension, open));
        };
        let next_role = self.syntax_at(self.next_pos(self.pos));
        match self.traits.syntax_type(c) {
            SyntaxType::Or => {
                self.mark_reset = Some(self.mark_count);
                self.advance();
            }
            SyntaxType::Colon => self.advance(),
            SyntaxType::Digit | SyntaxType::Plus => self.parse_numbered_recursion(open)?,
            SyntaxType::Dash if next_role == Some(SyntaxType::Digit) => {
                self.parse_numbered_recursion(open)?
            }
            role @ (SyntaxType::Equal | SyntaxType::Not) => {
                mark = if role == SyntaxType::Equal {
                    MarkKind::Lookahead
                } else {
                    MarkKind::NegativeLookahead
                };
                self.advance();
                skip_jump = Some(self.append_state(Instr::Jump { rel: 0 }));
                self.alt_insert_point = self.program.len();
                body_start = self.program.len();
            }
            SyntaxType::Less if matches!(next_role, Some(SyntaxType::Equal | SyntaxType::Not)) => {
                mark = if next_role == Some(SyntaxType::Equal) {
                    MarkKind::Lookbehind
                } else {
                    MarkKind::NegativeLookbehind
                };
                self.advance();
                self.advance();
                skip_jump = Some(self.append_state(Instr::Jump { rel: 0 }));
                self.append_state(Instr::Backstep);
                self.alt_insert_point = self.program.len();
                body_start = self.program.len();
            }
            SyntaxType::Less => {
                self.advance();
                capture = self.begin_named_capture(open, '>')?;
            }
            SyntaxType::Quote => {
                self.advance();
                capture = self.begin_named_capture(open, '\'')?;
            }
            SyntaxType::Greater => {
                mark = MarkKind::Independent;
                self.advance();
                skip_jump = Some(self.append_state(Instr::Jump { rel: 0 }));
                self.alt_insert_point = self.program.len();
                body_start = self.program.len();
            }
            SyntaxType::OpenMark => {
                mark = MarkKind::Conditional;
                self.parse_condition(open)?;
            }
            SyntaxType::CloseMark => {
                return Err(self.fail(ErrorKind::MalformedPerlExtension, open));
            }
            SyntaxType::Ampersand => {
                self.advance();
                self.parse_named_recursion(open)?;
            }
            _ if c == 'R' => {
                if next_role != Some(SyntaxType::CloseMark) {
                    return Err(self.fail_with(
                        ErrorKind::MalformedPerlExtension,
                        open,
                        "The whole-pattern recursion (?R) must be followed immediately by ).",
                    ));
                }
                self.advance();
                self.insert_recursion(open, GroupRef::Index(0));
            }
            _ if self.looking_at("P>") => {
                self.pos += 2;
                self.parse_named_recursion(open)?;
            }
            _ if self.looking_at("P<") => {
                self.pos += 2;
                capture = self.begin_named_capture(open, '>')?;
            }
            _ => self.parse_options(open, &mut restore_flags, &mut old_case_change)?,
        }
        if let Some(index) = capture {
            mark = MarkKind::Capture(index);
        }
        self.set_mark(start, mark);

        self.parse_all()?;
        self.unwind_alts(Some(start))?;
        if self.at_end() {
            return Err(self.fail(ErrorKind::UnmatchedParen, self.end));
        }
        if self.peek_syntax() != Some(SyntaxType::CloseMark) {
            return Ok(false);
        }
        let close = self.pos;
        self.advance();

        let empty_body = self.program.len() == body_start;
        if restore_flags {
            if self.has_case_change {
                let icase = scope.flags.contains(SyntaxOptions::ICASE);
                self.append_state(Instr::ToggleCase { icase });
            }
            self.flags = scope.flags;
        }

        if let Some(jump) = skip_jump {
            let end = self.program.len();
            self.program.patch(jump, end);
            if empty_body && mark != MarkKind::NegativeLookahead {
                return Err(self.fail_with(
                    ErrorKind::MalformedPerlExtension,
                    open,
                    "Invalid or empty zero width assertion.",
                ));
            }
        }

        if mark == MarkKind::Conditional {
            self.check_conditional(open, expected_alt_point)?;
        }

        self.append_mark(false, mark);
        self.paren_start = start;
        self.alt_insert_point = scope.alt_insert_point;
        self.has_case_change = old_case_change;
        if self.max_mark > self.mark_count {
            self.mark_count = self.max_mark;
        }
        self.mark_reset = scope.mark_reset;
        self.max_mark = scope.max_mark;
        if let Some(index) = capture {
            self.close_span(index, open, close);
            self.backrefs.set(index);
        }
        Ok(true)
    }

    /// After a conditional's body: supply the missing `no` branch and reject
    /// a third branch or a branch inside `DEFINE`.
    fn check_conditional(&mut self, open: usize, alt_at: usize) -> Result<(), CompileError> {
        let alt_target = match self.program.get(alt_at) {
            Some(Instr::Alt { .. }) => self.program.target(alt_at),
            _ => None,
        };
        match alt_target {
            None => {
                let alt = self.insert_state(alt_at, Instr::Alt { rel: 0 });
                let end = self.program.len();
                self.program.patch(alt, end);
            }
            Some(target) => {
                if matches!(self.program.get(target), Some(Instr::Alt { .. })) {
                    return Err(self.fail_with(
                        ErrorKind::BadPattern,
                        open,
                        "More than one alternation operator | was encountered inside a conditional expression.",
                    ));
                }
                if matches!(
                    self.program.get(alt_at + 1),
                    Some(Instr::AssertBackref {
                        cond: Condition::Define
                    })
                ) {
                    return Err(self.fail_with(
                        ErrorKind::BadPattern,
                        open,
                        "Alternation operators are not allowed inside a DEFINE block.",
                    ));
                }
            }
        }
        if !matches!(
            self.program.get(alt_at + 1),
            Some(Instr::AssertBackref { .. } | Instr::StartMark { .. })
        ) {
            return Err(self.fail_with(
                ErrorKind::BadRepeat,
                open,
                "A repetition operator cannot be applied to the condition of a conditional expression.",
            ));
        }
        Ok(())
    }

    /// The condition of `(?(cond)...)`; the cursor is on the inner `(`.
    fn parse_condition(&mut self, open: usize) -> Result<(), CompileError> {
        let cond_open = self.pos;
        if !self.advance_checked() {
            return Err(self.fail(ErrorKind::MalformedPerlExtension, open));
        }
        let cond = if self.peek() == Some('R') {
            self.advance();
            if self.peek_syntax() == Some(SyntaxType::Ampersand) {
                self.advance();
                let name = self.read_name(')', open)?;
                self.pending_names.push(PendingName {
                    name: name.clone(),
                    offset: open,
                });
                Condition::InRecursionToNamed(name)
            } else {
                match self.toi(10) {
                    Some(0) | None => Condition::InRecursion,
                    Some(index) => {
                        self.pending_groups.push((index as usize, open));
                        Condition::InRecursionTo(index as usize)
                    }
                }
            }
        } else if let Some(close) = match self.peek() {
            Some('<') => Some('>'),
            Some('\'') => Some('\''),
            _ => None,
        } {
            self.advance();
            let name = self.read_name(close, open)?;
            self.advance();
            self.pending_names.push(PendingName {
                name: name.clone(),
                offset: open,
            });
            Condition::Named(name)
        } else if self.looking_at("DEFINE") {
            self.pos += "DEFINE".len();
            Condition::Define
        } else if let Some(index) = self.toi(10) {
            if index == 0 {
                return Err(self.fail(ErrorKind::MalformedPerlExtension, open));
            }
            self.pending_groups.push((index as usize, open));
            Condition::Group(index as usize)
        } else {
            // a lookaround assertion: parsed as the first statement of the body
            if self.peek_syntax() != Some(SyntaxType::Question) || !self.advance_checked() {
                return Err(self.fail(ErrorKind::MalformedPerlExtension, open));
            }
            if self.peek_syntax() == Some(SyntaxType::Less) {
                self.advance();
            }
            if !matches!(self.peek_syntax(), Some(SyntaxType::Equal | SyntaxType::Not)) {
                return Err(self.fail(ErrorKind::MalformedPerlExtension, open));
            }
            self.pos = cond_open;
            return Ok(());
        };
        if self.peek_syntax() != Some(SyntaxType::CloseMark) || !self.advance_checked() {
            return Err(self.fail(ErrorKind::MalformedPerlExtension, open));
        }
        self.append_state(Instr::AssertBackref { cond });
        Ok(())
    }

    /// Read a non-empty name up to `close`, leaving the cursor on `close`.
    fn read_name(&mut self, close: char, open: usize) -> Result<String, CompileError> {
        match self.scan_name(close) {
            Some(name) => Ok(name),
            None => Err(self.fail(ErrorKind::MalformedPerlExtension, open)),
        }
    }

    fn scan_name(&mut self, close: char) -> Option<String> {
        let start = self.pos;
        let pattern = self.pattern;
        let len = pattern[start..self.end].find(close).filter(|&len| len > 0)?;
        self.pos = start + len;
        Some(pattern[start..start + len].to_string())
    }

    /// Register a named capture and return its index (`None` under `NOSUBS`).
    fn begin_named_capture(&mut self, open: usize, close: char) -> Result<Option<usize>, CompileError> {
        let name = self.read_name(close, open)?;
        self.advance();
        if self.flags.contains(SyntaxOptions::NOSUBS) {
            return Ok(None);
        }
        self.mark_count += 1;
        let index = self.mark_count;
        self.program.names.add(&name, index);
        self.open_span(index, open);
        Ok(Some(index))
    }

    fn set_mark(&mut self, offset: usize, mark: MarkKind) {
        if let Some(Instr::StartMark { mark: slot, .. }) = self.program.get_mut(offset) {
            *slot = mark;
        }
    }

    /// `(?P=name)`: a backreference spelled as a group.
    fn parse_named_backref_group(&mut self, open: usize) -> ParseResult {
        self.pos += "P=".len();
        let Some(name) = self.scan_name(')') else {
            return Err(self.fail(ErrorKind::BadBackreference, open));
        };
        self.advance();
        match self.closed_group_named(&name) {
            Some(index) => {
                self.append_backref(index);
                Ok(true)
            }
            None => Err(self.fail_with(
                ErrorKind::BadBackreference,
                open,
                "Encountered a reference to a named sub-expression that does not exist.",
            )),
        }
    }

    /// `(?N)`, `(?+N)`, `(?-N)`. The cursor stays on the closing `)`.
    fn parse_numbered_recursion(&mut self, open: usize) -> Result<(), CompileError> {
        let sign = match self.peek_syntax() {
            Some(SyntaxType::Plus) => {
                self.advance();
                1
            }
            Some(SyntaxType::Dash) => {
                self.advance();
                -1
            }
            _ => 0,
        };
        let value = self.toi(10).map(|value| value as usize);
        let group = match (sign, value) {
            (0, Some(value)) => Some(value),
            (1, Some(value)) if value > 0 => Some(self.mark_count + value),
            (-1, Some(value)) if value > 0 => (self.mark_count + 1).checked_sub(value).filter(|&g| g > 0),
            _ => None,
        };
        match group {
            Some(group) if self.peek_syntax() == Some(SyntaxType::CloseMark) => {
                self.insert_recursion(open, GroupRef::Index(group));
                Ok(())
            }
            _ => Err(self.fail_with(
                ErrorKind::MalformedPerlExtension,
                open,
                "The recursive sub-expression refers to an invalid marking group, or is unterminated.",
            )),
        }
    }

    /// `(?&name)` and `(?P>name)`; the name may be defined later.
    fn parse_named_recursion(&mut self, open: usize) -> Result<(), CompileError> {
        let name = self.read_name(')', open)?;
        self.pending_names.push(PendingName {
            name: name.clone(),
            offset: open,
        });
        self.insert_recursion(open, GroupRef::Name(name));
        Ok(())
    }

    fn insert_recursion(&mut self, site: usize, group: GroupRef) {
        self.append_state(Instr::Recurse { group, rel: 0 });
        self.recursion_sites.push(site);
        self.program.has_recursions = true;
        let icase = self.icase();
        self.append_state(Instr::ToggleCase { icase });
    }

    /// `(?imsx-imsx)` and `(?imsx-imsx:...)`.
    fn parse_options(
        &mut self,
        open: usize,
        restore_flags: &mut bool,
        old_case_change: &mut bool,
    ) -> Result<(), CompileError> {
        let mut flags = self.flags;
        let mut on = true;
        loop {
            let Some(c) = self.peek() else {
                return Err(self.fail(ErrorKind::UnmatchedParen, self.end));
            };
            match c {
                'i' => flags.set(SyntaxOptions::ICASE, on),
                'm' => flags.set(SyntaxOptions::NO_MOD_M, !on),
                's' => {
                    flags.set(SyntaxOptions::MOD_S, on);
                    flags.set(SyntaxOptions::NO_MOD_S, !on);
                }
                'x' => flags.set(SyntaxOptions::MOD_X, on),
                '-' if on => on = false,
                _ => break,
            }
            self.advance();
        }
        self.has_case_change = flags.contains(SyntaxOptions::ICASE) != self.icase();
        match self.peek_syntax() {
            Some(SyntaxType::CloseMark) => {
                // applies until the enclosing group closes
                self.flags = flags;
                *restore_flags = false;
                *old_case_change |= self.has_case_change;
            }
            Some(SyntaxType::Colon) => {
                self.flags = flags;
                self.advance();
            }
            _ => {
                return Err(self.fail_with(
                    ErrorKind::MalformedPerlExtension,
                    open,
                    "Unrecognised or invalid character in (?imsx) construct.",
                ));
            }
        }
        if self.has_case_change {
            let icase = self.icase();
            self.append_state(Instr::ToggleCase { icase });
        }
        Ok(())
    }

    // ========================================================================
    // Verbs
    // ========================================================================

    /// `(*VERB)`; `open` is the `(`, the cursor is on the `*`.
    fn parse_perl_verb(&mut self, open: usize) -> ParseResult {
        self.advance();
        let name_start = self.pos;
        let Some(close) = self.find_from(name_start, ")") else {
            return Err(self.fail(ErrorKind::MalformedPerlExtension, open));
        };
        let pattern = self.pattern;
        let verb = match &pattern[name_start..close] {
            "FAIL" | "F" => Instr::Fail,
            "ACCEPT" | "A" => Instr::Accept,
            "COMMIT" => Instr::Commit,
            "PRUNE" => Instr::Prune,
            "SKIP" => Instr::Skip,
            "THEN" => Instr::Then,
            _ => {
                return Err(self.fail_with(
                    ErrorKind::MalformedPerlExtension,
                    open,
                    "Unknown backtracking control verb.",
                ));
            }
        };
        if !matches!(verb, Instr::Fail | Instr::Accept) {
            self.program.disable_match_any = true;
        }
        self.append_state(verb);
        self.pos = close + 1;
        Ok(true)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Absolute offset of the next `needle` at or after `from`.
    fn find_from(&self, from: usize, needle: &str) -> Option<usize> {
        self.pattern[from..self.end].find(needle).map(|i| from + i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regcomp::compile;

    fn perl(pattern: &str) -> Program {
        compile(pattern, SyntaxOptions::PERL).unwrap()
    }

    fn dump(prog: &Program) -> Vec<String> {
        prog.to_string().lines().map(|line| line.trim().to_string()).collect()
    }

    fn failure(pattern: &str, flags: SyntaxOptions) -> (ErrorKind, usize) {
        let err = compile(pattern, flags).unwrap_err();
        (err.kind(), err.offset())
    }

    fn only_set(prog: &Program) -> &CharSet {
        let sets: Vec<&CharSet> = prog
            .iter()
            .filter_map(|instr| match instr {
                Instr::Set(set) => Some(set.as_ref()),
                _ => None,
            })
            .collect();
        assert_eq!(sets.len(), 1, "{}", prog);
        sets[0]
    }

    #[test]
    fn repeated_alternation_group() {
        let prog = perl("a(b|c)*d");
        assert_eq!(
            dump(&prog),
            vec![
                "0: StartMark 0",
                "1: Literal \"a\"",
                "2: Repeat {0,} -> 10",
                "3: StartMark 1",
                "4: Alt -> 7",
                "5: Literal \"b\"",
                "6: Jump -> 8",
                "7: Literal \"c\"",
                "8: EndMark 1",
                "9: Jump -> 2",
                "10: Literal \"d\"",
                "11: EndMark 0",
                "12: Match",
            ]
        );
        assert_eq!(prog.mark_count(), 2);
    }

    #[test]
    fn lookbehind_has_backstep() {
        let prog = perl("(?<=foo)bar");
        assert_eq!(
            dump(&prog),
            vec![
                "0: StartMark 0",
                "1: StartMark Lookbehind",
                "2: Jump -> 5",
                "3: Backstep",
                "4: Literal \"foo\"",
                "5: EndMark Lookbehind",
                "6: Literal \"bar\"",
                "7: EndMark 0",
                "8: Match",
            ]
        );
    }

    #[test]
    fn named_date_captures() {
        let prog = perl("(?P<year>[0-9]{4})-(?P<month>[0-9]{2})");
        assert_eq!(prog.names().first_group("year"), Some(1));
        assert_eq!(prog.names().first_group("month"), Some(2));
        assert_eq!(prog.mark_count(), 3);
        let repeats: Vec<(usize, Option<usize>)> = prog
            .iter()
            .filter_map(|instr| match instr {
                Instr::Repeat { min, max, .. } => Some((*min, *max)),
                _ => None,
            })
            .collect();
        assert_eq!(repeats, vec![(4, Some(4)), (2, Some(2))]);
        let digits = prog
            .iter()
            .filter(|instr| matches!(instr, Instr::Set(set) if set.ranges.as_slice() == [('0', '9')]))
            .count();
        assert_eq!(digits, 2);
        assert!(matches!(prog.get(2), Some(Instr::Repeat { .. })));
        assert!(matches!(prog.get(3), Some(Instr::Set(_))));
    }

    #[test]
    fn literal_runs_merge_and_split() {
        let prog = perl("abc*");
        assert_eq!(
            dump(&prog)[1..5],
            ["1: Literal \"ab\"", "2: Repeat {0,} -> 5", "3: Literal \"c\"", "4: Jump -> 2"]
        );
    }

    #[test]
    fn lazy_and_possessive() {
        let prog = perl("a+?");
        assert_eq!(dump(&prog)[1], "1: Repeat {1,} lazy -> 4");

        let prog = perl("a*+");
        assert_eq!(
            dump(&prog)[1..7],
            [
                "1: StartMark Independent",
                "2: Jump -> 6",
                "3: Repeat {0,} -> 6",
                "4: Literal \"a\"",
                "5: Jump -> 3",
                "6: EndMark Independent",
            ]
        );
        assert_eq!(failure("a*+*", SyntaxOptions::PERL), (ErrorKind::BadRepeat, 3));
        assert_eq!(failure("a++(?#c)+", SyntaxOptions::PERL), (ErrorKind::BadRepeat, 8));
    }

    #[test]
    fn bad_repeats() {
        assert_eq!(failure("*a", SyntaxOptions::PERL), (ErrorKind::BadRepeat, 0));
        assert_eq!(failure("^*", SyntaxOptions::PERL), (ErrorKind::BadRepeat, 2));
        assert_eq!(failure("^*", SyntaxOptions::EXTENDED), (ErrorKind::BadRepeat, 2));
        assert_eq!(failure("a**", SyntaxOptions::PERL).0, ErrorKind::BadRepeat);
        assert_eq!(failure("a|*b", SyntaxOptions::PERL).0, ErrorKind::BadRepeat);
        assert_eq!(failure("(?:*a)", SyntaxOptions::PERL).0, ErrorKind::BadRepeat);
        assert_eq!(failure("\\b+", SyntaxOptions::PERL).0, ErrorKind::BadRepeat);
        assert!(compile("(?:a)*", SyntaxOptions::PERL).is_ok());
    }

    #[test]
    fn brace_intervals() {
        let prog = compile("a\\{2,3\\}", SyntaxOptions::BASIC).unwrap();
        assert!(matches!(prog.get(0), Some(Instr::Repeat { min: 2, max: Some(3), .. })));

        // basic falls back to a literal brace
        let prog = compile("a\\{x", SyntaxOptions::BASIC).unwrap();
        assert_eq!(prog.instructions(), &[Instr::Literal { chars: "a{x".chars().collect(), icase: false }, Instr::Match]);

        let prog = perl("a{2,}b{ 1 , 3 }");
        assert!(prog.iter().any(|i| matches!(i, Instr::Repeat { min: 2, max: None, .. })));
        assert!(prog.iter().any(|i| matches!(i, Instr::Repeat { min: 1, max: Some(3), .. })));

        assert_eq!(failure("a{x}", SyntaxOptions::EXTENDED), (ErrorKind::BadBraceRange, 2));
        assert_eq!(failure("a{2", SyntaxOptions::PERL), (ErrorKind::UnmatchedBrace, 3));
        assert_eq!(failure("a{3,2}", SyntaxOptions::PERL), (ErrorKind::BadBraceRange, 1));
        assert_eq!(failure("a}", SyntaxOptions::EXTENDED), (ErrorKind::UnmatchedBrace, 1));
        assert!(compile("a}", SyntaxOptions::PERL).is_ok());
    }

    #[test]
    fn basic_grammar_quirks() {
        let prog = compile("*a", SyntaxOptions::BASIC).unwrap();
        assert_eq!(prog.get(0), Some(&Instr::Literal { chars: "*a".chars().collect(), icase: false }));

        let prog = compile("\\(*a\\)\\1", SyntaxOptions::BASIC).unwrap();
        assert_eq!(prog.mark_count(), 2);
        assert_eq!(prog.get(1), Some(&Instr::Literal { chars: "*a".chars().collect(), icase: false }));
        assert!(prog.iter().any(|i| matches!(i, Instr::Backref { index: 1, .. })));

        // `+`, `?` and `|` are ordinary characters
        let prog = compile("a+?|b", SyntaxOptions::BASIC).unwrap();
        assert_eq!(prog.len(), 2);

        let prog = compile("a\nb", SyntaxOptions::GREP).unwrap();
        assert!(prog.iter().any(|i| matches!(i, Instr::Alt { .. })));
    }

    #[test]
    fn emacs_extensions() {
        let prog = compile("\\`a+\\|\\sw\\'", SyntaxOptions::EMACS).unwrap();
        assert_eq!(prog.get(0), Some(&Instr::BufferStart));
        assert!(prog.iter().any(|i| matches!(i, Instr::Repeat { min: 1, .. })));
        assert!(prog.iter().any(|i| matches!(i, Instr::Set(set) if set.classes == CharClass::WORD)));
        assert!(prog.iter().any(|i| matches!(i, Instr::BufferEnd)));

        let prog = compile("\\s_", SyntaxOptions::EMACS).unwrap();
        assert!(only_set(&prog).singles.contains(&'$'));
        assert_eq!(failure("\\sZ", SyntaxOptions::EMACS), (ErrorKind::BadCharacterClass, 2));
        assert_eq!(failure("\\c", SyntaxOptions::EMACS), (ErrorKind::MalformedEscape, 0));
    }

    #[test]
    fn alternation_emptiness() {
        assert!(compile("a||b", SyntaxOptions::PERL).is_ok());
        assert!(compile("(a|)", SyntaxOptions::PERL).is_ok());
        assert_eq!(failure("a||b", SyntaxOptions::EXTENDED), (ErrorKind::EmptyPattern, 2));
        assert_eq!(failure("|a", SyntaxOptions::EXTENDED), (ErrorKind::EmptyPattern, 0));
        assert_eq!(failure("(a|)", SyntaxOptions::EXTENDED).0, ErrorKind::EmptyPattern);
        assert_eq!(failure("a|", SyntaxOptions::PERL | SyntaxOptions::NO_EMPTY_EXPRESSIONS).0, ErrorKind::EmptyPattern);
    }

    #[test]
    fn branch_reset_shares_indices() {
        let prog = perl("(?|(a)|(b)(c))(d)");
        assert_eq!(prog.mark_count(), 4);
        let prog = perl("(?|(a)(b)|(c))(d)");
        assert_eq!(prog.mark_count(), 4);
        let starts: Vec<usize> = prog
            .iter()
            .filter_map(|i| match i {
                Instr::StartMark { mark: MarkKind::Capture(n), .. } => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(starts, vec![0, 1, 2, 1, 3]);
    }

    #[test]
    fn inline_options() {
        let prog = perl("a(?i:B)c");
        assert_eq!(
            dump(&prog)[1..8],
            [
                "1: Literal \"a\"",
                "2: StartMark NonCapturing",
                "3: ToggleCase on",
                "4: Literal \"b\" /i",
                "5: ToggleCase off",
                "6: EndMark NonCapturing",
                "7: Literal \"c\"",
            ]
        );

        // persists to the end of the enclosing group
        let prog = perl("((?i)a)b");
        let b = prog.iter().position(|i| matches!(i, Instr::Literal { chars, .. } if chars[0] == 'b')).unwrap();
        assert_eq!(prog.get(b - 2), Some(&Instr::ToggleCase { icase: false }));
        assert!(matches!(prog.get(b), Some(Instr::Literal { icase: false, .. })));

        let prog = perl("(?s).(?-s).");
        let modes: Vec<DotMode> = prog
            .iter()
            .filter_map(|i| match i {
                Instr::Wild { mode } => Some(*mode),
                _ => None,
            })
            .collect();
        assert_eq!(modes, vec![DotMode::Any, DotMode::NotNewline]);
        assert_eq!(failure("(?z)", SyntaxOptions::PERL), (ErrorKind::MalformedPerlExtension, 0));
        assert_eq!(failure("(?i", SyntaxOptions::PERL).0, ErrorKind::UnmatchedParen);
    }

    #[test]
    fn conditionals() {
        let prog = perl("(a)?(?(1)b|c)");
        assert!(prog.iter().any(|i| matches!(i, Instr::AssertBackref { cond: Condition::Group(1) })));

        // a missing `no` branch is supplied
        let prog = perl("(a)(?(1)b)");
        let alt = prog.iter().position(|i| matches!(i, Instr::Alt { .. })).unwrap();
        let target = prog.target(alt).unwrap();
        assert!(matches!(prog.get(target), Some(Instr::EndMark { mark: MarkKind::Conditional, .. })));

        let prog = perl("(?<n>a)(?(<n>)b|c)(?(R)x)(?(?=d)e|f)");
        assert!(prog.iter().any(|i| matches!(i, Instr::AssertBackref { cond: Condition::Named(n) } if n == "n")));
        assert!(prog.iter().any(|i| matches!(i, Instr::AssertBackref { cond: Condition::InRecursion })));

        assert_eq!(failure("(?(1)a|b|c)", SyntaxOptions::PERL), (ErrorKind::BadPattern, 0));
        assert_eq!(failure("(?(DEFINE)a|b)", SyntaxOptions::PERL), (ErrorKind::BadPattern, 0));
        assert_eq!(failure("(?(DEFINE)(?<n>a))*", SyntaxOptions::PERL).0, ErrorKind::BadRepeat);
        assert_eq!(failure("(?(0)a)", SyntaxOptions::PERL), (ErrorKind::MalformedPerlExtension, 0));
        assert_eq!(failure("x(?(1a)", SyntaxOptions::PERL), (ErrorKind::MalformedPerlExtension, 1));
        assert_eq!(failure("(?(<zz>)a)", SyntaxOptions::PERL), (ErrorKind::BadBackreference, 0));
        assert!(compile("(?(DEFINE)(?<n>a))(?&n)", SyntaxOptions::PERL).is_ok());
    }

    #[test]
    fn conditions_on_missing_groups() {
        assert_eq!(failure("(?(5)a|b)", SyntaxOptions::PERL), (ErrorKind::BadBackreference, 0));
        assert_eq!(failure("(a)(?(2)x)", SyntaxOptions::PERL), (ErrorKind::BadBackreference, 3));
        assert_eq!(failure("(?(R7)a)", SyntaxOptions::PERL), (ErrorKind::BadBackreference, 0));
        // the earlier construct is reported
        assert_eq!(failure("(?(3)a)(?(<zz>)b)", SyntaxOptions::PERL), (ErrorKind::BadBackreference, 0));
        assert_eq!(failure("(?(<zz>)a)(?(3)b)", SyntaxOptions::PERL), (ErrorKind::BadBackreference, 0));

        // a forward reference resolves once the group exists
        let prog = perl("(?(2)a|b)(x)(y)");
        assert_eq!(prog.mark_count(), 3);
        assert!(prog.iter().any(|i| matches!(i, Instr::AssertBackref { cond: Condition::Group(2) })));
        let prog = perl("(a(?(R1)b))");
        assert!(prog.iter().any(|i| matches!(i, Instr::AssertBackref { cond: Condition::InRecursionTo(1) })));

        let err = compile("(a)(?(2)x)", SyntaxOptions::PERL).unwrap_err();
        assert!(err.message().contains("non-existent sub-expression"), "{}", err);
    }

    #[test]
    fn zero_width_assertions() {
        assert!(compile("(?!)", SyntaxOptions::PERL).is_ok());
        assert_eq!(failure("(?=)", SyntaxOptions::PERL), (ErrorKind::MalformedPerlExtension, 0));
        assert_eq!(failure("a(?<!)", SyntaxOptions::PERL), (ErrorKind::MalformedPerlExtension, 1));
        let prog = perl("(?>a|b)");
        assert!(matches!(prog.get(1), Some(Instr::StartMark { mark: MarkKind::Independent, .. })));
    }

    #[test]
    fn verbs() {
        assert!(perl("(*COMMIT)a").disables_match_any());
        assert!(perl("a(*SKIP)b(*THEN)").disables_match_any());
        let prog = perl("a(*FAIL)|b(*A)");
        assert!(!prog.disables_match_any());
        assert!(prog.iter().any(|i| *i == Instr::Fail));
        assert!(prog.iter().any(|i| *i == Instr::Accept));
        assert_eq!(failure("a(*BOGUS)", SyntaxOptions::PERL), (ErrorKind::MalformedPerlExtension, 1));
        assert_eq!(failure("(*FAIL", SyntaxOptions::PERL), (ErrorKind::MalformedPerlExtension, 0));
    }

    #[test]
    fn recursion() {
        let prog = perl("(?<n>a)(?&n)(?R)(?-1)(?+1)(b)");
        let targets: Vec<usize> = prog
            .iter()
            .filter_map(|i| match i {
                Instr::Recurse { group: GroupRef::Index(n), .. } => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(targets, vec![1, 0, 1, 2]);
        assert!(prog.has_recursions());
        assert_eq!(failure("(?&zz)", SyntaxOptions::PERL), (ErrorKind::BadBackreference, 0));
        assert_eq!(failure("(?-1)", SyntaxOptions::PERL), (ErrorKind::MalformedPerlExtension, 0));
        assert_eq!(failure("(?1", SyntaxOptions::PERL), (ErrorKind::MalformedPerlExtension, 0));

        let err = compile("a(?Rx)", SyntaxOptions::PERL).unwrap_err();
        assert_eq!((err.kind(), err.offset()), (ErrorKind::MalformedPerlExtension, 1));
        assert!(err.message().contains("(?R)"), "{}", err);
        assert!(!err.message().contains("(?imsx)"), "{}", err);
    }

    #[test]
    fn backreferences() {
        assert!(compile("(a)\\1", SyntaxOptions::PERL).is_ok());
        assert_eq!(failure("\\1(a)", SyntaxOptions::PERL), (ErrorKind::BadBackreference, 0));
        assert_eq!(failure("(a\\1)", SyntaxOptions::PERL), (ErrorKind::BadBackreference, 2));

        let prog = perl("(a)(b)\\g{-1}\\g1(?<x>c)\\k'x'(?P=x)");
        let indices: Vec<usize> = prog
            .iter()
            .filter_map(|i| match i {
                Instr::Backref { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, vec![2, 1, 3, 3]);
        let prog = perl("(?<x>a)(?<x>b)\\k{x}");
        assert!(prog.iter().any(|i| matches!(i, Instr::Backref { index: 1, .. })));
        assert_eq!(failure("\\k<x>(?<x>a)", SyntaxOptions::PERL), (ErrorKind::BadBackreference, 0));
        assert_eq!(failure("(?P=x)(?<x>a)", SyntaxOptions::PERL), (ErrorKind::BadBackreference, 0));
        assert_eq!(failure("(a)\\g{1", SyntaxOptions::PERL), (ErrorKind::MalformedEscape, 3));
    }

    #[test]
    fn escapes_decode() {
        let prog = perl("\\x41\\x{263A}\\n\\0101\\cA\\N{space}\\e");
        assert_eq!(
            prog.get(1),
            Some(&Instr::Literal {
                chars: "A\u{263A}\nA\u{1} \u{1b}".chars().collect(),
                icase: false
            })
        );
        assert_eq!(failure("\\x{zz}", SyntaxOptions::PERL), (ErrorKind::BadBraceRange, 0));
        assert_eq!(failure("a\\xg", SyntaxOptions::PERL), (ErrorKind::MalformedEscape, 1));
        assert_eq!(failure("\\N{bogus}", SyntaxOptions::PERL), (ErrorKind::BadCollatingName, 0));
        assert_eq!(failure("ab\\", SyntaxOptions::PERL), (ErrorKind::MalformedEscape, 2));
        assert_eq!(failure("ab\\c", SyntaxOptions::PERL), (ErrorKind::MalformedEscape, 2));
    }

    #[test]
    fn class_and_property_escapes() {
        let prog = perl("\\d");
        assert_eq!(only_set(&prog).classes, CharClass::DIGIT);
        let prog = perl("\\W");
        let set = only_set(&prog);
        assert!(set.negated);
        assert_eq!(set.classes, CharClass::WORD);
        let prog = perl("\\pL");
        assert_eq!(only_set(&prog).classes, CharClass::ALPHA);
        let prog = perl("\\P{Lu}");
        assert!(only_set(&prog).negated);
        assert_eq!(failure("x\\p{Bogus}", SyntaxOptions::PERL), (ErrorKind::BadCharacterClass, 1));
        assert_eq!(failure("\\p{L", SyntaxOptions::PERL), (ErrorKind::MalformedEscape, 0));
    }

    #[test]
    fn anchors_and_wildcards() {
        let prog = perl("^a$");
        assert_eq!(prog.get(1), Some(&Instr::StartLine));
        assert_eq!(prog.get(3), Some(&Instr::EndLine));
        let prog = compile("^a$", SyntaxOptions::PERL | SyntaxOptions::NO_MOD_M).unwrap();
        assert_eq!(prog.get(1), Some(&Instr::BufferStart));
        assert_eq!(prog.get(3), Some(&Instr::BufferEnd));
        let prog = perl("\\A\\b\\B\\<\\>\\Z\\G\\z\\K\\C\\X.");
        let names: Vec<&str> = prog.iter().skip(1).map(Instr::name).collect();
        assert_eq!(
            names[..12],
            [
                "BufferStart",
                "WordBoundary",
                "WithinWord",
                "WordStart",
                "WordEnd",
                "SoftBufferEnd",
                "RestartContinue",
                "BufferEnd",
                "ResetStartMark",
                "AnyUnit",
                "Combining",
                "Wild",
            ]
        );
    }

    #[test]
    fn bracket_edges() {
        assert_eq!(only_set(&perl("[-a]")).singles.as_slice(), ['-', 'a']);
        assert_eq!(only_set(&perl("[a-]")).singles.as_slice(), ['a', '-']);
        assert_eq!(only_set(&perl("[]a]")).singles.as_slice(), [']', 'a']);
        let prog = perl("[^]a-c-]");
        let set = only_set(&prog);
        assert!(set.negated);
        assert_eq!(set.singles.as_slice(), [']', '-']);
        assert_eq!(set.ranges.as_slice(), [('a', 'c')]);

        assert_eq!(failure("x[z-a]", SyntaxOptions::PERL), (ErrorKind::BadRange, 2));
        assert_eq!(failure("[a-c-e]", SyntaxOptions::PERL), (ErrorKind::BadRange, 5));
        // a class shorthand cannot be either end of a range
        assert_eq!(failure("[a-\\d]", SyntaxOptions::PERL), (ErrorKind::BadRange, 3));
        assert_eq!(failure("[a-\\w]", SyntaxOptions::PERL), (ErrorKind::BadRange, 3));
        assert_eq!(failure("[\\d-z]", SyntaxOptions::PERL), (ErrorKind::BadRange, 3));
        // other escapes still end a range
        assert_eq!(only_set(&perl("[a-\\x7a]")).ranges.as_slice(), [('a', 'z')]);
        // without escapes in lists the backslash is an ordinary end point
        let prog = compile("[A-\\d]", SyntaxOptions::EXTENDED).unwrap();
        assert_eq!(only_set(&prog).ranges.as_slice(), [('A', '\\')]);
        assert_eq!(failure("[abc", SyntaxOptions::PERL), (ErrorKind::UnmatchedBracket, 0));
        assert_eq!(failure("[]", SyntaxOptions::PERL), (ErrorKind::UnmatchedBracket, 0));
    }

    #[test]
    fn bracket_constructs() {
        assert_eq!(only_set(&perl("[[:alpha:][:^digit:]]")).classes, CharClass::ALPHA);
        assert_eq!(only_set(&perl("[[:alpha:][:^digit:]]")).negated_classes, CharClass::DIGIT);
        assert_eq!(only_set(&perl("[[.space.]a]")).singles.as_slice(), [' ', 'a']);
        assert_eq!(only_set(&perl("[[=e=]]")).equivalents.as_slice(), ['e']);
        assert_eq!(only_set(&perl("[\\d\\s]")).classes, CharClass::DIGIT | CharClass::SPACE);
        assert_eq!(
            only_set(&compile("[\\d]", SyntaxOptions::EXTENDED).unwrap()).singles.as_slice(),
            ['\\', 'd']
        );
        assert_eq!(
            only_set(&compile("[[:alpha:]]", SyntaxOptions::BASIC | SyntaxOptions::NO_CHAR_CLASSES).unwrap()).classes,
            CharClass::empty()
        );

        assert_eq!(failure("[[:foo:]]", SyntaxOptions::PERL), (ErrorKind::BadCharacterClass, 3));
        assert_eq!(failure("a[x[:alpha]", SyntaxOptions::PERL), (ErrorKind::UnmatchedBracket, 3));
        assert_eq!(failure("[[::]]", SyntaxOptions::PERL), (ErrorKind::UnmatchedBracket, 1));
        assert_eq!(failure("[[.bogus.]]", SyntaxOptions::PERL), (ErrorKind::BadCollatingName, 3));
        assert_eq!(failure("[[.a]", SyntaxOptions::PERL), (ErrorKind::UnmatchedBracket, 1));

        let prog = perl("[[:<:]]a[[:>:]]");
        assert_eq!(prog.get(1), Some(&Instr::WordStart));
        assert_eq!(prog.get(3), Some(&Instr::WordEnd));
    }

    #[test]
    fn whitespace_mode_and_quoting() {
        let prog = compile("a b # note\n c", SyntaxOptions::PERL | SyntaxOptions::MOD_X).unwrap();
        assert_eq!(prog.get(1), Some(&Instr::Literal { chars: "abc".chars().collect(), icase: false }));

        let prog = perl("\\Qa.b*\\E.");
        assert_eq!(prog.get(1), Some(&Instr::Literal { chars: "a.b*".chars().collect(), icase: false }));
        assert!(matches!(prog.get(2), Some(Instr::Wild { .. })));

        let prog = compile("a(b", SyntaxOptions::LITERAL).unwrap();
        assert_eq!(prog.get(0), Some(&Instr::Literal { chars: "a(b".chars().collect(), icase: false }));
    }

    #[test]
    fn line_ending_escape() {
        let prog = perl("a\\Rb");
        assert!(prog.iter().any(|i| matches!(i, Instr::StartMark { mark: MarkKind::Independent, .. })));
        assert!(prog.iter().any(|i| matches!(i, Instr::Alt { .. })));
        assert_eq!(prog.mark_count(), 1);
        assert!(matches!(prog.get(prog.len() - 3), Some(Instr::Literal { chars, .. }) if chars[0] == 'b'));
    }

    #[test]
    fn subexpression_spans() {
        let flags = SyntaxOptions::PERL | SyntaxOptions::SAVE_SUBEXPRESSION_LOCATION;
        let prog = compile("(a)(?<n>bc)", flags).unwrap();
        assert_eq!(prog.subexpression(1), Some(SubexpressionSpan { start: 0, end: 2 }));
        assert_eq!(prog.subexpression(2), Some(SubexpressionSpan { start: 3, end: 10 }));
        assert_eq!(prog.subexpression(0), None);
        assert!(perl("(a)").subexpressions().is_empty());
    }

    #[test]
    fn nosubs_groups_do_not_capture() {
        let prog = compile("(a)(b)", SyntaxOptions::PERL | SyntaxOptions::NOSUBS).unwrap();
        assert_eq!(prog.mark_count(), 1);
        assert!(matches!(prog.get(1), Some(Instr::StartMark { mark: MarkKind::NonCapturing, .. })));
    }

    #[test]
    fn nesting_limit() {
        let deep = format!("{}a{}", "(".repeat(500), ")".repeat(500));
        assert_eq!(failure(&deep, SyntaxOptions::PERL).0, ErrorKind::ComplexityLimitExceeded);
        let shallow = format!("{}a{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(perl(&shallow).mark_count(), 101);
    }

    #[test]
    fn unmatched_groups() {
        assert_eq!(failure("(a", SyntaxOptions::PERL), (ErrorKind::UnmatchedParen, 2));
        assert_eq!(failure("a(", SyntaxOptions::PERL), (ErrorKind::UnmatchedParen, 2));
        assert_eq!(failure("(?", SyntaxOptions::PERL), (ErrorKind::MalformedPerlExtension, 0));
        assert_eq!(failure("(?)", SyntaxOptions::PERL), (ErrorKind::MalformedPerlExtension, 0));
        assert_eq!(failure("\\(a", SyntaxOptions::BASIC), (ErrorKind::UnmatchedParen, 3));
    }
}
