//! Parser options.
//!
//! The options record is fully defaulted: every hook resolves to a concrete
//! function pointer at construction so the parser hot path never branches on
//! presence. The core is HTML-naive; platform presets (void tags, RCDATA and
//! RAWTEXT rules, a full entity table) are supplied through these hooks.

use strata_kit::{FxHashMap, String};

use crate::ast::Namespace;
use crate::errors::CompilerError;

/// Text mode for different parsing contexts.
///
/// Controls whether child elements are recognized, whether character
/// references are decoded, and what terminates a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextMode {
    /// Normal text parsing (default)
    #[default]
    Data,
    /// RCDATA (e.g. textarea, title): entities decoded, no child elements
    RcData,
    /// Raw text (e.g. script, style): no decoding, no child elements
    RawText,
    /// CDATA section
    CData,
    /// Attribute value
    AttributeValue,
}

/// Injectable named character reference table, keyed by the reference name
/// as it appears after `&` (including a trailing `;` where one is required).
pub type NamedCharacterReferences = FxHashMap<String, String>;

/// The minimal entity table the parser defaults to. Platform presets inject
/// the full WHATWG table through [`ParserOptions::named_character_references`].
pub const DEFAULT_NAMED_REFERENCES: &[(&str, &str)] = &[
    ("gt;", ">"),
    ("lt;", "<"),
    ("amp;", "&"),
    ("apos;", "'"),
    ("quot;", "\""),
];

/// Parser options
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Interpolation delimiters (default: `{{`, `}}`)
    pub delimiters: (String, String),
    /// Drop whitespace-only text nodes (default: true)
    pub ignore_spaces: bool,
    /// Keep comment nodes in the output tree (default: true in debug builds)
    pub comments: bool,
    /// Elements whose content preserves whitespace verbatim
    pub is_pre_tag: fn(&str) -> bool,
    /// Elements that never have children or end tags
    pub is_void_tag: fn(&str) -> bool,
    /// Namespace resolver; receives the tag and the parent's tag + namespace
    pub get_namespace: fn(&str, Option<(&str, Namespace)>) -> Namespace,
    /// Per-element child text mode selector
    pub get_text_mode: fn(&str, Namespace) -> TextMode,
    /// Entity table for named character references
    pub named_character_references: NamedCharacterReferences,
    /// Diagnostic sink invoked for every error; when absent, errors are
    /// logged and parsing continues either way
    pub on_error: Option<fn(&CompilerError)>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            delimiters: (String::const_new("{{"), String::const_new("}}")),
            ignore_spaces: true,
            comments: cfg!(debug_assertions),
            is_pre_tag: |_| false,
            is_void_tag: |_| false,
            get_namespace: |_, _| Namespace::Html,
            get_text_mode: |_, _| TextMode::Data,
            named_character_references: default_named_references(),
            on_error: None,
        }
    }
}

fn default_named_references() -> NamedCharacterReferences {
    DEFAULT_NAMED_REFERENCES
        .iter()
        .map(|(name, value)| ((*name).into(), (*value).into()))
        .collect()
}
