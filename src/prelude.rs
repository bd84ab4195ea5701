// prelude.rs - Convenient re-exports for the idiomatic API.
//
//! # Prelude
//!
//! ```
//! use regprog::prelude::*;
//!
//! let re = Regex::builder(r"a{2,3}|b")
//!     .syntax(SyntaxOptions::EXTENDED)
//!     .build()
//!     .unwrap();
//! assert_eq!(re.program().map(Program::mark_count), Some(1));
//! ```

pub use crate::api::{Regex, RegexBuilder};
pub use crate::error::{CompileError, CompileStatus, ErrorKind};
pub use crate::regint::Program;
pub use crate::regsyntax::SyntaxOptions;
