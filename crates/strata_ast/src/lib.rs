//! Template AST node types, parser options, and diagnostics for the strata
//! compiler.
//!
//! The parser produces the tree defined in [`ast`]; downstream transform and
//! codegen stages consume it. [`options`] holds the fully-defaulted
//! configuration record the parser is driven by, and [`errors`] the structured
//! diagnostics it emits.

pub mod ast;
pub mod errors;
pub mod options;

pub use ast::*;
pub use errors::{CompilerError, ErrorCode};
pub use options::{ParserOptions, TextMode};
