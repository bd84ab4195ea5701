// regint.rs - Instruction records and the program arena.
//
// A program is a flat vector of records. Records refer to each other only
// through relative offsets (target index minus source index), so the
// compiler can splice a record into the middle of the vector and repair the
// offsets that straddle the splice point.

use std::collections::HashMap;
use std::fmt;

use smallvec::SmallVec;

use crate::regenc::CharClass;
use crate::regsyntax::SyntaxOptions;

// === Addressing ===
pub type RelAddr = i32;

/// Unbounded repeat upper limit.
pub const INFINITE_REPEAT: Option<usize> = None;

// === Group markers ===

/// What a start/end marker pair delimits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkKind {
    /// Capture group; index 0 is the whole match.
    Capture(usize),
    NonCapturing,
    Lookahead,
    NegativeLookahead,
    Lookbehind,
    NegativeLookbehind,
    /// Atomic group, also used for possessive repeats.
    Independent,
    Conditional,
}

impl MarkKind {
    pub fn capture_index(self) -> Option<usize> {
        match self {
            MarkKind::Capture(index) => Some(index),
            _ => None,
        }
    }

    pub fn is_assertion(self) -> bool {
        matches!(
            self,
            MarkKind::Lookahead
                | MarkKind::NegativeLookahead
                | MarkKind::Lookbehind
                | MarkKind::NegativeLookbehind
        )
    }
}

/// Test performed by a conditional's condition record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Group N has matched.
    Group(usize),
    /// Some group with this name has matched.
    Named(String),
    /// Inside any recursion.
    InRecursion,
    /// Inside a recursion into group N.
    InRecursionTo(usize),
    /// Inside a recursion into the named group.
    InRecursionToNamed(String),
    /// `(?(DEFINE)...)`: never true, the body only holds definitions.
    Define,
}

/// Target of a recursion call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupRef {
    Index(usize),
    /// Forward reference by name; replaced by `Index` when the program is finalized.
    Name(String),
}

/// Newline handling of a wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DotMode {
    /// Decided by the match flags at run time.
    Default,
    /// Matches everything, newlines included.
    Any,
    /// Never matches a newline.
    NotNewline,
}

// === Character sets ===

/// A bracket expression or class shorthand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharSet {
    pub negated: bool,
    pub icase: bool,
    pub singles: SmallVec<[char; 8]>,
    pub ranges: SmallVec<[(char, char); 4]>,
    /// Equivalence classes `[=x=]`, by their representative.
    pub equivalents: SmallVec<[char; 2]>,
    pub classes: CharClass,
    /// Classes whose complement belongs to the set (`\D` inside brackets, `[:^alpha:]`).
    pub negated_classes: CharClass,
}

impl CharSet {
    pub fn new(icase: bool) -> Self {
        CharSet {
            icase,
            ..Default::default()
        }
    }

    /// A set holding a single class, as produced by `\d` or `\P{L}`.
    pub fn of_class(class: CharClass, negated: bool, icase: bool) -> Self {
        let mut set = CharSet::new(icase);
        set.classes = class;
        set.negated = negated;
        set
    }

    pub fn add_single(&mut self, c: char) {
        if !self.singles.contains(&c) {
            self.singles.push(c);
        }
    }

    pub fn add_range(&mut self, first: char, last: char) {
        self.ranges.push((first, last));
    }

    pub fn add_equivalent(&mut self, c: char) {
        self.equivalents.push(c);
    }

    pub fn add_class(&mut self, class: CharClass) {
        self.classes |= class;
    }

    pub fn add_negated_class(&mut self, class: CharClass) {
        self.negated_classes |= class;
    }

    pub fn is_empty(&self) -> bool {
        self.singles.is_empty()
            && self.ranges.is_empty()
            && self.equivalents.is_empty()
            && self.classes.is_empty()
            && self.negated_classes.is_empty()
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        if self.negated {
            f.write_str("^")?;
        }
        for c in &self.singles {
            write!(f, "{}", c.escape_debug())?;
        }
        for (first, last) in &self.ranges {
            write!(f, "{}-{}", first.escape_debug(), last.escape_debug())?;
        }
        for c in &self.equivalents {
            write!(f, "[={}=]", c.escape_debug())?;
        }
        if !self.classes.is_empty() {
            write!(f, "{:?}", self.classes)?;
        }
        if !self.negated_classes.is_empty() {
            write!(f, "^{:?}", self.negated_classes)?;
        }
        f.write_str("]")?;
        if self.icase {
            f.write_str("/i")?;
        }
        Ok(())
    }
}

// === Instruction ===

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    StartMark { mark: MarkKind, icase: bool },
    EndMark { mark: MarkKind, icase: bool },
    /// Run of literal characters, already case-folded when icase was on.
    Literal { chars: SmallVec<[char; 8]>, icase: bool },
    Wild { mode: DotMode },
    /// `\C`: one code unit.
    AnyUnit,
    StartLine,
    EndLine,
    BufferStart,
    BufferEnd,
    /// `\Z`: end of buffer or before a final newline.
    SoftBufferEnd,
    /// `\G`: where the previous match ended.
    RestartContinue,
    WordBoundary,
    WithinWord,
    WordStart,
    WordEnd,
    Set(Box<CharSet>),
    Backref { index: usize, icase: bool },
    /// Condition of a `(?(cond)yes|no)` block.
    AssertBackref { cond: Condition },
    /// Try the next record; on failure resume at `rel`.
    Alt { rel: RelAddr },
    Jump { rel: RelAddr },
    /// Repeat the records up to the back jump; `rel` points past the back jump.
    Repeat {
        min: usize,
        max: Option<usize>,
        greedy: bool,
        rel: RelAddr,
    },
    /// Call into a group; `rel` points at the group's start marker.
    Recurse { group: GroupRef, rel: RelAddr },
    ToggleCase { icase: bool },
    /// Rewind for a lookbehind; the width is computed by the matcher.
    Backstep,
    /// `\X`.
    Combining,
    /// `\K`.
    ResetStartMark,
    Fail,
    Accept,
    Commit,
    Prune,
    Skip,
    Then,
    Match,
}

impl Instr {
    pub fn literal(c: char, icase: bool) -> Self {
        let mut chars = SmallVec::new();
        chars.push(c);
        Instr::Literal { chars, icase }
    }

    /// Relative offset carried by the record, if any.
    pub fn rel(&self) -> Option<RelAddr> {
        match self {
            Instr::Alt { rel }
            | Instr::Jump { rel }
            | Instr::Repeat { rel, .. }
            | Instr::Recurse { rel, .. } => Some(*rel),
            _ => None,
        }
    }

    pub fn rel_mut(&mut self) -> Option<&mut RelAddr> {
        match self {
            Instr::Alt { rel }
            | Instr::Jump { rel }
            | Instr::Repeat { rel, .. }
            | Instr::Recurse { rel, .. } => Some(rel),
            _ => None,
        }
    }

    /// Name used by the program dump.
    pub fn name(&self) -> &'static str {
        match self {
            Instr::StartMark { .. } => "StartMark",
            Instr::EndMark { .. } => "EndMark",
            Instr::Literal { .. } => "Literal",
            Instr::Wild { .. } => "Wild",
            Instr::AnyUnit => "AnyUnit",
            Instr::StartLine => "StartLine",
            Instr::EndLine => "EndLine",
            Instr::BufferStart => "BufferStart",
            Instr::BufferEnd => "BufferEnd",
            Instr::SoftBufferEnd => "SoftBufferEnd",
            Instr::RestartContinue => "RestartContinue",
            Instr::WordBoundary => "WordBoundary",
            Instr::WithinWord => "WithinWord",
            Instr::WordStart => "WordStart",
            Instr::WordEnd => "WordEnd",
            Instr::Set(_) => "Set",
            Instr::Backref { .. } => "Backref",
            Instr::AssertBackref { .. } => "AssertBackref",
            Instr::Alt { .. } => "Alt",
            Instr::Jump { .. } => "Jump",
            Instr::Repeat { .. } => "Repeat",
            Instr::Recurse { .. } => "Recurse",
            Instr::ToggleCase { .. } => "ToggleCase",
            Instr::Backstep => "Backstep",
            Instr::Combining => "Combining",
            Instr::ResetStartMark => "ResetStartMark",
            Instr::Fail => "Fail",
            Instr::Accept => "Accept",
            Instr::Commit => "Commit",
            Instr::Prune => "Prune",
            Instr::Skip => "Skip",
            Instr::Then => "Then",
            Instr::Match => "Match",
        }
    }
}

fn fmt_mark(f: &mut fmt::Formatter<'_>, mark: MarkKind, icase: bool) -> fmt::Result {
    match mark {
        MarkKind::Capture(index) => write!(f, " {}", index)?,
        other => write!(f, " {:?}", other)?,
    }
    if icase {
        f.write_str(" /i")?;
    }
    Ok(())
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        match self {
            Instr::StartMark { mark, icase } | Instr::EndMark { mark, icase } => {
                fmt_mark(f, *mark, *icase)
            }
            Instr::Literal { chars, icase } => {
                let text: String = chars.iter().collect();
                write!(f, " {:?}", text)?;
                if *icase {
                    f.write_str(" /i")?;
                }
                Ok(())
            }
            Instr::Wild { mode } => write!(f, " {:?}", mode),
            Instr::Set(set) => write!(f, " {}", set),
            Instr::Backref { index, icase } => {
                write!(f, " {}", index)?;
                if *icase {
                    f.write_str(" /i")?;
                }
                Ok(())
            }
            Instr::AssertBackref { cond } => write!(f, " {:?}", cond),
            Instr::Repeat {
                min,
                max,
                greedy,
                ..
            } => {
                match max {
                    Some(max) => write!(f, " {{{},{}}}", min, max)?,
                    None => write!(f, " {{{},}}", min)?,
                }
                if !*greedy {
                    f.write_str(" lazy")?;
                }
                Ok(())
            }
            Instr::Recurse { group, .. } => match group {
                GroupRef::Index(index) => write!(f, " {}", index),
                GroupRef::Name(name) => write!(f, " <{}>", name),
            },
            Instr::ToggleCase { icase } => write!(f, " {}", if *icase { "on" } else { "off" }),
            _ => Ok(()),
        }
    }
}

// === Name Table ===

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    pub name: String,
    /// Group indices carrying this name, in the order they were opened.
    pub back_refs: Vec<usize>,
}

/// Group name to group indices. One name may label several groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    entries: HashMap<String, NameEntry>,
}

impl NameTable {
    pub fn new() -> Self {
        NameTable {
            entries: HashMap::new(),
        }
    }

    pub fn find(&self, name: &str) -> Option<&NameEntry> {
        self.entries.get(name)
    }

    pub fn add(&mut self, name: &str, group: usize) {
        let entry = self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| NameEntry {
                name: name.to_string(),
                back_refs: Vec::new(),
            });
        if !entry.back_refs.contains(&group) {
            entry.back_refs.push(group);
        }
    }

    pub fn name_to_group_numbers(&self, name: &str) -> Option<&[usize]> {
        self.entries.get(name).map(|e| e.back_refs.as_slice())
    }

    /// Lowest group index carrying `name`.
    pub fn first_group(&self, name: &str) -> Option<usize> {
        self.name_to_group_numbers(name)?.iter().copied().min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by their first group index.
    pub fn entries(&self) -> Vec<&NameEntry> {
        let mut entries: Vec<&NameEntry> = self.entries.values().collect();
        entries.sort_by_key(|e| (e.back_refs.first().copied(), e.name.as_str()));
        entries
    }
}

// === Program ===

/// Byte span of a capture group in the pattern text, from `(` to `)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubexpressionSpan {
    pub start: usize,
    pub end: usize,
}

/// A compiled pattern.
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) instrs: Vec<Instr>,
    pub(crate) mark_count: usize,
    pub(crate) names: NameTable,
    pub(crate) subexpressions: Vec<SubexpressionSpan>,
    pub(crate) options: SyntaxOptions,
    pub(crate) disable_match_any: bool,
    pub(crate) has_recursions: bool,
}

impl Program {
    pub fn new(options: SyntaxOptions) -> Self {
        Program {
            instrs: Vec::new(),
            mark_count: 0,
            names: NameTable::new(),
            subexpressions: Vec::new(),
            options,
            disable_match_any: false,
            has_recursions: false,
        }
    }

    // --- Queries ---

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    pub fn instructions(&self) -> &[Instr] {
        &self.instrs
    }

    pub fn get(&self, offset: usize) -> Option<&Instr> {
        self.instrs.get(offset)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instr> {
        self.instrs.iter()
    }

    /// Number of capture groups, the whole match included.
    pub fn mark_count(&self) -> usize {
        self.mark_count
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn name_to_group_numbers(&self, name: &str) -> Option<&[usize]> {
        self.names.name_to_group_numbers(name)
    }

    /// Source span of capture group `index` (1-based), when spans were recorded.
    pub fn subexpression(&self, index: usize) -> Option<SubexpressionSpan> {
        self.subexpressions.get(index.checked_sub(1)?).copied()
    }

    pub fn subexpressions(&self) -> &[SubexpressionSpan] {
        &self.subexpressions
    }

    pub fn options(&self) -> SyntaxOptions {
        self.options
    }

    /// Set by `(*COMMIT)`, `(*PRUNE)`, `(*SKIP)` and `(*THEN)`: the matcher
    /// must not retry at later start positions on its own.
    pub fn disables_match_any(&self) -> bool {
        self.disable_match_any
    }

    pub fn has_recursions(&self) -> bool {
        self.has_recursions
    }

    /// Absolute target of the record at `offset`.
    pub fn target(&self, offset: usize) -> Option<usize> {
        let rel = self.instrs.get(offset)?.rel()?;
        let target = offset as i64 + rel as i64;
        usize::try_from(target).ok()
    }

    // --- Emission ---

    pub(crate) fn append(&mut self, instr: Instr) -> usize {
        self.instrs.push(instr);
        self.instrs.len() - 1
    }

    /// Insert `instr` before the record at `at`, shifting the tail.
    ///
    /// Offsets crossing `at` are corrected. A record before `at` that
    /// pointed at `at` keeps its offset and so now points at the new record.
    pub(crate) fn insert(&mut self, at: usize, instr: Instr) -> usize {
        let at = at.min(self.instrs.len());
        for (index, existing) in self.instrs.iter_mut().enumerate() {
            let Some(rel) = existing.rel_mut() else {
                continue;
            };
            let target = index as i64 + *rel as i64;
            if index < at && target > at as i64 {
                *rel += 1;
            } else if index >= at && target < at as i64 {
                *rel -= 1;
            }
        }
        self.instrs.insert(at, instr);
        at
    }

    pub(crate) fn last(&self) -> Option<&Instr> {
        self.instrs.last()
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut Instr> {
        self.instrs.last_mut()
    }

    pub(crate) fn get_mut(&mut self, offset: usize) -> Option<&mut Instr> {
        self.instrs.get_mut(offset)
    }

    /// Point the record at `offset` to `target`. Returns false when the
    /// record carries no offset.
    pub(crate) fn patch(&mut self, offset: usize, target: usize) -> bool {
        match self.instrs.get_mut(offset).and_then(Instr::rel_mut) {
            Some(rel) => {
                *rel = target as RelAddr - offset as RelAddr;
                true
            }
            None => false,
        }
    }

    /// Offset of the start marker of capture group `index`.
    pub fn find_group_start(&self, index: usize) -> Option<usize> {
        self.instrs.iter().position(|instr| {
            matches!(instr, Instr::StartMark { mark, .. } if mark.capture_index() == Some(index))
        })
    }

    /// Check that every relative offset lands on a record.
    ///
    /// Returns the offset of the first bad record.
    pub fn validate(&self) -> Result<(), usize> {
        for (offset, instr) in self.instrs.iter().enumerate() {
            if instr.rel().is_none() {
                continue;
            }
            match self.target(offset) {
                Some(target) if target < self.instrs.len() => {}
                _ => return Err(offset),
            }
        }
        Ok(())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (offset, instr) in self.instrs.iter().enumerate() {
            write!(f, "{:4}: {}", offset, instr)?;
            if let Some(target) = self.target(offset) {
                write!(f, " -> {}", target)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
