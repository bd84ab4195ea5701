// regcomp.rs - Program emission, dialect dispatch and the compile entry points.
//
// The grammar handlers in regparse.rs decide what to emit; this file owns how
// records are appended or spliced into the program, how failures are
// reported, and how a finished parse is turned into a validated `Program`.

use crate::encodings::REGEX_TRAITS_UNICODE;
use crate::error::{CompileError, CompileStatus, ErrorKind};
use crate::regenc::{RegexTraits, SyntaxType};
use crate::regerror::format_error_message;
use crate::regint::*;
use crate::regparse_types::ParserState;
use crate::regsyntax::{Grammar, SyntaxOptions};

// ============================================================================
// Emission
// ============================================================================

impl<'a> ParserState<'a> {
    pub(crate) fn append_state(&mut self, instr: Instr) -> usize {
        self.program.append(instr)
    }

    /// Splice `instr` in at `at`. Pending alternation jumps at or after the
    /// splice point move with the records they label.
    pub(crate) fn insert_state(&mut self, at: usize, instr: Instr) -> usize {
        for jump in self.alt_jumps.iter_mut() {
            if *jump >= at {
                *jump += 1;
            }
        }
        self.program.insert(at, instr)
    }

    pub(crate) fn last_state(&self) -> Option<&Instr> {
        self.program.last()
    }

    /// Append one literal character, extending the previous literal run when
    /// it was emitted under the same case mode.
    pub(crate) fn append_literal(&mut self, c: char) {
        let icase = self.icase();
        let c = self.traits.translate(c, icase);
        if let Some(Instr::Literal {
            chars,
            icase: run_icase,
        }) = self.program.last_mut()
        {
            if *run_icase == icase {
                chars.push(c);
                return;
            }
        }
        self.program.append(Instr::literal(c, icase));
    }

    pub(crate) fn append_set(&mut self, mut set: CharSet) -> usize {
        let icase = self.icase();
        set.icase = icase;
        if icase {
            for c in set.singles.iter_mut() {
                *c = self.traits.translate(*c, true);
            }
        }
        self.program.append(Instr::Set(Box::new(set)))
    }

    pub(crate) fn append_mark(&mut self, start: bool, mark: MarkKind) -> usize {
        let icase = self.icase();
        if start {
            self.append_state(Instr::StartMark { mark, icase })
        } else {
            self.append_state(Instr::EndMark { mark, icase })
        }
    }

    // ========================================================================
    // Failure reporting
    // ========================================================================

    /// Record a failure at byte `offset` with the kind's default message.
    pub(crate) fn fail(&mut self, kind: ErrorKind, offset: usize) -> CompileError {
        self.fail_with(kind, offset, kind.description())
    }

    /// Record a failure and freeze the cursor at the end of input.
    ///
    /// Only the first failure is kept; later calls return it unchanged.
    pub(crate) fn fail_with(&mut self, kind: ErrorKind, offset: usize, message: &str) -> CompileError {
        self.pos = self.end;
        if let Some(first) = &self.error {
            return first.clone();
        }
        let text = format_error_message(kind.code(), message, self.pattern, offset);
        let error = CompileError::new(kind, offset, text);
        self.error = Some(error.clone());
        error
    }

    /// Offset of the nearest character before `pos` whose role is `role`.
    ///
    /// Used to point diagnostics at the start of the construct that failed.
    pub(crate) fn rewind_to(&self, pos: usize, role: SyntaxType) -> usize {
        let mut p = pos.min(self.end);
        while p > 0 {
            p = self.prev_pos(p);
            if self.syntax_at(p) == Some(role) {
                return p;
            }
        }
        0
    }

    // ========================================================================
    // Dispatcher
    // ========================================================================

    pub(crate) fn parse(&mut self) -> Result<(), CompileError> {
        let original_flags = self.flags;
        let Some(grammar) = self.flags.grammar() else {
            return Err(self.fail_with(
                ErrorKind::InvalidOptionCombination,
                0,
                "An invalid combination of regular expression syntax flags was used.",
            ));
        };
        self.grammar = grammar;

        if self.pattern.is_empty() && !self.flags.allows_empty_expressions() {
            return Err(self.fail(ErrorKind::EmptyPattern, 0));
        }

        if grammar == Grammar::Perl {
            // Group 0 gives whole-pattern recursion a target.
            self.append_mark(true, MarkKind::Capture(0));
            self.alt_insert_point = self.program.len();
        }

        let completed = self.parse_all()?;
        self.unwind_alts(None)?;
        // A top-level (?imsx) may have changed the flags.
        self.flags = original_flags;

        if !completed {
            return Err(self.fail_with(
                ErrorKind::UnmatchedParen,
                self.pos,
                "Found a closing ) with no corresponding opening parenthesis.",
            ));
        }

        self.program.mark_count = 1 + self.mark_count;
        self.finalize()
    }

    // ========================================================================
    // Finalization
    // ========================================================================

    fn finalize(&mut self) -> Result<(), CompileError> {
        if self.grammar == Grammar::Perl {
            self.append_mark(false, MarkKind::Capture(0));
        }
        self.append_state(Instr::Match);

        let unresolved_name = self
            .pending_names
            .iter()
            .filter(|pending| self.program.names.find(&pending.name).is_none())
            .map(|pending| pending.offset)
            .min();
        let unresolved_group = self
            .pending_groups
            .iter()
            .filter(|&&(index, _)| index >= self.program.mark_count)
            .map(|&(_, offset)| offset)
            .min();
        match (unresolved_name, unresolved_group) {
            (Some(name), group) if group.map_or(true, |group| name <= group) => {
                return Err(self.fail_with(
                    ErrorKind::BadBackreference,
                    name,
                    "Encountered a reference to a named sub-expression that does not exist.",
                ));
            }
            (_, Some(group)) => {
                return Err(self.fail_with(
                    ErrorKind::BadBackreference,
                    group,
                    "Found a backreference to a non-existent sub-expression.",
                ));
            }
            _ => {}
        }

        self.resolve_recursions()?;

        if let Err(offset) = self.program.validate() {
            log::debug!("record {} has a dangling offset", offset);
            return Err(self.fail_with(
                ErrorKind::Unknown,
                self.end,
                "Internal logic failed while compiling the expression.",
            ));
        }
        Ok(())
    }

    /// Point every recursion call at the start marker of its group.
    fn resolve_recursions(&mut self) -> Result<(), CompileError> {
        let mut sites = std::mem::take(&mut self.recursion_sites).into_iter();
        for offset in 0..self.program.len() {
            let group = match self.program.get(offset) {
                Some(Instr::Recurse { group, .. }) => group.clone(),
                _ => continue,
            };
            let site = sites.next().unwrap_or(0);
            let index = match group {
                GroupRef::Index(index) => Some(index),
                GroupRef::Name(name) => self.program.names.first_group(&name),
            };
            let target = index.and_then(|index| Some((index, self.program.find_group_start(index)?)));
            let Some((index, target)) = target else {
                return Err(self.fail_with(
                    ErrorKind::BadPattern,
                    site,
                    "Encountered a forward reference to a recursive sub-expression that does not exist.",
                ));
            };
            if let Some(Instr::Recurse { group, .. }) = self.program.get_mut(offset) {
                *group = GroupRef::Index(index);
            }
            self.program.patch(offset, target);
        }
        Ok(())
    }

    pub(crate) fn into_program(self) -> Program {
        self.program
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Compile `pattern` with the Unicode traits.
///
/// Always returns a `Result`; `NO_EXCEPT` only affects [`compile_status`]
/// and the `api` wrapper.
pub fn compile(pattern: &str, flags: SyntaxOptions) -> Result<Program, CompileError> {
    compile_with_traits(pattern, flags, &REGEX_TRAITS_UNICODE)
}

/// Compile `pattern`, classifying characters with `traits`.
pub fn compile_with_traits(
    pattern: &str,
    flags: SyntaxOptions,
    traits: &dyn RegexTraits,
) -> Result<Program, CompileError> {
    let mut state = ParserState::new(pattern, flags, traits);
    match state.parse() {
        Ok(()) => {
            let grammar = state.grammar;
            let program = state.into_program();
            log::debug!(
                "compiled {:?} ({} grammar, {} traits): {} records, {} groups",
                pattern,
                grammar,
                traits.name(),
                program.len(),
                program.mark_count()
            );
            log::trace!("program for {:?}:\n{}", pattern, program);
            Ok(program)
        }
        Err(err) => {
            log::debug!("failed to compile {:?}: {}", pattern, err);
            Err(err)
        }
    }
}

/// Compile without raising: the outcome is returned as a status.
pub fn compile_status(pattern: &str, flags: SyntaxOptions) -> CompileStatus {
    CompileStatus::from(compile(pattern, flags))
}
