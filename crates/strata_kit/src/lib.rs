//! Kit - the shared toolbox for the strata compiler.
//!
//! This crate provides the foundational types every other strata crate builds
//! on: arena-based memory allocation for AST construction and a handful of
//! re-exported data structures so the rest of the workspace agrees on string
//! and map types.
//!
//! # Example
//!
//! ```
//! use strata_kit::{Box, Bump, Vec};
//!
//! let bump = Bump::new();
//!
//! // Allocate a boxed value in the arena
//! let boxed = Box::new_in(42, &bump);
//! assert_eq!(*boxed, 42);
//!
//! // Create an arena-backed vector
//! let mut vec = Vec::new_in(&bump);
//! vec.push(1);
//! vec.push(2);
//! vec.push(3);
//! assert_eq!(vec.len(), 3);
//! ```

// Re-export bumpalo allocation types
pub use bumpalo::boxed::Box;
pub use bumpalo::collections::String as BumpString;
pub use bumpalo::collections::Vec;
pub use bumpalo::Bump;

// Re-export compact_str::CompactString as the workspace string type
pub use compact_str::CompactString;
pub use compact_str::CompactString as String;

// Re-export rustc-hash for fast hash maps/sets
pub use rustc_hash::{FxHashMap, FxHashSet};

// Re-export phf for compile-time perfect hash tables
pub use phf::{phf_map, phf_set, Map as PhfMap, Set as PhfSet};
