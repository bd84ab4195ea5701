//! # regprog
//!
//! A regular-expression pattern compiler. One pattern plus one set of
//! [`SyntaxOptions`](regsyntax::SyntaxOptions) goes in; a flat, validated
//! [`Program`](regint::Program) of matcher records comes out, or a
//! [`CompileError`](error::CompileError) naming what went wrong and where.
//!
//! Four grammars share one parser: POSIX basic (with the grep, sed and Emacs
//! variants), POSIX extended (egrep, awk), Perl/ECMAScript, and literal text.
//!
//! ## Quick Start
//!
//! ```rust
//! use regprog::prelude::*;
//!
//! let re = Regex::new(r"(?P<year>\d{4})-(?P<month>\d{2})").unwrap();
//! assert_eq!(re.captures_len(), 2);
//! assert_eq!(re.group_numbers("month"), Some(&[2][..]));
//! ```
//!
//! For dialects and options, use [`RegexBuilder`](api::RegexBuilder):
//!
//! ```rust
//! use regprog::prelude::*;
//!
//! let err = Regex::builder(r"a\{2,1\}")
//!     .syntax(SyntaxOptions::BASIC)
//!     .build()
//!     .unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::BadBraceRange);
//! assert_eq!(err.offset(), 2);
//! ```
//!
//! ## Low-Level API
//!
//! The compile entry points hand back the program directly:
//!
//! ```rust
//! use regprog::regcomp::compile;
//! use regprog::regint::Instr;
//! use regprog::regsyntax::SyntaxOptions;
//!
//! let program = compile("ab|c", SyntaxOptions::EXTENDED).unwrap();
//! assert!(matches!(program.get(0), Some(Instr::Alt { .. })));
//! assert_eq!(program.instructions().last(), Some(&Instr::Match));
//! println!("{}", program);
//! ```
//!
//! ## Module Structure
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`regsyntax`] | Option bitset and dialect presets |
//! | [`regenc`] | Character traits consumed by the parser |
//! | [`encodings`] | Unicode and C-locale traits |
//! | [`regint`] | Program records, name table, spans |
//! | [`regparse_types`] | Parser state |
//! | [`regparse`] | Grammar handlers |
//! | [`regcomp`] | Emission, dispatch and compile entry points |
//! | [`regerror`] | Error codes and messages |
//! | [`error`] | `CompileError`, `ErrorKind`, `CompileStatus` |
//! | [`api`] | `Regex` / `RegexBuilder` |

pub mod api;
pub mod encodings;
pub mod error;
pub mod prelude;
pub mod regcomp;
pub mod regenc;
pub mod regerror;
pub mod regint;
pub mod regparse;
pub mod regparse_types;
pub mod regsyntax;
