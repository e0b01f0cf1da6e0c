//! Recursive-descent template parser for the strata compiler.
//!
//! Turns a raw template source string (HTML-like syntax extended with
//! `{{ }}` interpolation and directive-prefixed attributes) into the typed
//! AST defined in `strata_ast`, annotated with precise source locations.
//! Diagnostics are collected as values; parsing always continues to
//! end-of-input and always returns a root node, possibly partial.
//!
//! The core is platform-naive: void tags, per-element text modes, namespace
//! resolution, and the entity table all arrive through
//! [`strata_ast::ParserOptions`]. See the `strata_dom` crate for the browser
//! preset.

mod entity;
pub mod parser;

pub use parser::{parse, parse_with_options, ParserContext};
