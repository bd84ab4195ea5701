// error.rs - Compile error types.
//
// One variant per failure family. The numeric codes live in regerror.rs so
// callers that persist or compare statuses get stable values.

use std::fmt;

use crate::regerror::*;
use crate::regint::Program;

/// What went wrong while compiling a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Empty pattern or empty alternative where the dialect forbids it.
    EmptyPattern,
    /// A `(` without its `)`, or a stray `)`.
    UnmatchedParen,
    /// A `[` (or `[:`, `[.`, `[=`) without its closing bracket.
    UnmatchedBracket,
    /// A `{` without its `}`, or a stray `}`.
    UnmatchedBrace,
    /// A repeat operator applied to nothing or to something unrepeatable.
    BadRepeat,
    /// Invalid `{m,n}` content, including `m > n`.
    BadBraceRange,
    /// A character range whose end precedes its start.
    BadRange,
    /// A backreference to a group that does not exist (yet).
    BadBackreference,
    /// Unknown character class name.
    BadCharacterClass,
    /// Unknown collating element name.
    BadCollatingName,
    /// Malformed or truncated escape sequence.
    MalformedEscape,
    /// Malformed `(?...)` or `(*...)` construct.
    MalformedPerlExtension,
    /// Structurally invalid pattern (conditionals, DEFINE blocks, recursion targets).
    BadPattern,
    /// Nesting deeper than the parser allows.
    ComplexityLimitExceeded,
    /// More than one grammar selector in the options.
    InvalidOptionCombination,
    /// Internal inconsistency.
    Unknown,
}

impl ErrorKind {
    /// Stable numeric code.
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::EmptyPattern => REGERR_EMPTY_PATTERN,
            ErrorKind::UnmatchedParen => REGERR_UNMATCHED_PAREN,
            ErrorKind::UnmatchedBracket => REGERR_UNMATCHED_BRACKET,
            ErrorKind::UnmatchedBrace => REGERR_UNMATCHED_BRACE,
            ErrorKind::BadRepeat => REGERR_BAD_REPEAT,
            ErrorKind::BadBraceRange => REGERR_BAD_BRACE_RANGE,
            ErrorKind::BadRange => REGERR_BAD_RANGE,
            ErrorKind::BadBackreference => REGERR_BAD_BACKREFERENCE,
            ErrorKind::BadCharacterClass => REGERR_BAD_CHARACTER_CLASS,
            ErrorKind::BadCollatingName => REGERR_BAD_COLLATING_NAME,
            ErrorKind::MalformedEscape => REGERR_MALFORMED_ESCAPE,
            ErrorKind::MalformedPerlExtension => REGERR_MALFORMED_PERL_EXTENSION,
            ErrorKind::BadPattern => REGERR_BAD_PATTERN,
            ErrorKind::ComplexityLimitExceeded => REGERR_COMPLEXITY_LIMIT,
            ErrorKind::InvalidOptionCombination => REGERR_INVALID_OPTION_COMBINATION,
            ErrorKind::Unknown => REGERR_UNKNOWN,
        }
    }

    /// Inverse of [`ErrorKind::code`].
    pub fn from_code(code: i32) -> Option<ErrorKind> {
        let kind = match code {
            REGERR_EMPTY_PATTERN => ErrorKind::EmptyPattern,
            REGERR_UNMATCHED_PAREN => ErrorKind::UnmatchedParen,
            REGERR_UNMATCHED_BRACKET => ErrorKind::UnmatchedBracket,
            REGERR_UNMATCHED_BRACE => ErrorKind::UnmatchedBrace,
            REGERR_BAD_REPEAT => ErrorKind::BadRepeat,
            REGERR_BAD_BRACE_RANGE => ErrorKind::BadBraceRange,
            REGERR_BAD_RANGE => ErrorKind::BadRange,
            REGERR_BAD_BACKREFERENCE => ErrorKind::BadBackreference,
            REGERR_BAD_CHARACTER_CLASS => ErrorKind::BadCharacterClass,
            REGERR_BAD_COLLATING_NAME => ErrorKind::BadCollatingName,
            REGERR_MALFORMED_ESCAPE => ErrorKind::MalformedEscape,
            REGERR_MALFORMED_PERL_EXTENSION => ErrorKind::MalformedPerlExtension,
            REGERR_BAD_PATTERN => ErrorKind::BadPattern,
            REGERR_COMPLEXITY_LIMIT => ErrorKind::ComplexityLimitExceeded,
            REGERR_INVALID_OPTION_COMBINATION => ErrorKind::InvalidOptionCombination,
            REGERR_UNKNOWN => ErrorKind::Unknown,
            _ => return None,
        };
        Some(kind)
    }

    /// Default description, used when a failure site has nothing more specific to say.
    pub fn description(self) -> &'static str {
        reg_error_code_to_format(self.code())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A failed compilation: what, where, and a message with a pattern excerpt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    kind: ErrorKind,
    offset: usize,
    message: String,
}

impl CompileError {
    pub fn new(kind: ErrorKind, offset: usize, message: String) -> Self {
        CompileError {
            kind,
            offset,
            message,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Byte offset into the pattern.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at offset {})", self.message, self.offset)
    }
}

impl std::error::Error for CompileError {}

/// Outcome of a compile that does not raise.
#[derive(Debug, Clone)]
pub enum CompileStatus {
    Compiled(Program),
    Failed(CompileError),
}

impl CompileStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, CompileStatus::Compiled(_))
    }

    /// `REG_NORMAL` on success, otherwise the error code.
    pub fn status(&self) -> i32 {
        match self {
            CompileStatus::Compiled(_) => REG_NORMAL,
            CompileStatus::Failed(err) => err.code(),
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.error().map(CompileError::kind)
    }

    pub fn error(&self) -> Option<&CompileError> {
        match self {
            CompileStatus::Compiled(_) => None,
            CompileStatus::Failed(err) => Some(err),
        }
    }

    pub fn program(&self) -> Option<&Program> {
        match self {
            CompileStatus::Compiled(program) => Some(program),
            CompileStatus::Failed(_) => None,
        }
    }

    pub fn into_result(self) -> Result<Program, CompileError> {
        self.into()
    }
}

impl From<Result<Program, CompileError>> for CompileStatus {
    fn from(result: Result<Program, CompileError>) -> Self {
        match result {
            Ok(program) => CompileStatus::Compiled(program),
            Err(err) => CompileStatus::Failed(err),
        }
    }
}

impl From<CompileStatus> for Result<Program, CompileError> {
    fn from(status: CompileStatus) -> Self {
        match status {
            CompileStatus::Compiled(program) => Ok(program),
            CompileStatus::Failed(err) => Err(err),
        }
    }
}
