//! DOM platform preset for the strata template parser.
//!
//! The parser core is HTML-naive; this crate supplies the browser-flavored
//! configuration through the parser's extension points:
//!
//! - void element set
//! - RCDATA / RAWTEXT text modes for `textarea`/`title` and `style`/`script`
//! - SVG and MathML namespace resolution, including the HTML integration
//!   points
//! - a named character reference table covering the core and common legacy
//!   entities (the semicolon-less `amp`/`lt`/`gt`/`quot` spellings matter for
//!   attribute-value compatibility decoding)

use phf::phf_set;
use strata_ast::errors::CompilerError;
use strata_ast::options::{NamedCharacterReferences, ParserOptions, TextMode};
use strata_ast::{Namespace, RootNode};
use strata_kit::{Bump, Vec};

/// Elements that never have children or end tags
pub static VOID_TAGS: phf::Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr"
};

/// Elements whose content is RCDATA: no child elements, entities decoded
static RCDATA_TAGS: phf::Set<&'static str> = phf_set! {
    "textarea", "title"
};

/// Elements whose content is raw text: no child elements, no decoding
static RAW_TEXT_TAGS: phf::Set<&'static str> = phf_set! {
    "style", "iframe", "script", "noscript"
};

#[inline]
pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(tag)
}

#[inline]
pub fn is_pre_tag(tag: &str) -> bool {
    tag == "pre"
}

/// Child text mode for HTML elements
pub fn get_text_mode(tag: &str, ns: Namespace) -> TextMode {
    if ns == Namespace::Html {
        if RCDATA_TAGS.contains(tag) {
            return TextMode::RcData;
        }
        if RAW_TEXT_TAGS.contains(tag) {
            return TextMode::RawText;
        }
    }
    TextMode::Data
}

/// Namespace resolution with SVG and MathML entry and integration points
pub fn get_namespace(tag: &str, parent: Option<(&str, Namespace)>) -> Namespace {
    let mut ns = parent.map_or(Namespace::Html, |(_, parent_ns)| parent_ns);

    if let Some((parent_tag, parent_ns)) = parent {
        match parent_ns {
            Namespace::MathMl => {
                if parent_tag == "annotation-xml" && tag == "svg" {
                    return Namespace::Svg;
                }
                // Text integration points break out of MathML
                if matches!(parent_tag, "mi" | "mo" | "mn" | "ms" | "mtext")
                    && !matches!(tag, "mglyph" | "malignmark")
                {
                    ns = Namespace::Html;
                }
            }
            Namespace::Svg => {
                if matches!(parent_tag, "foreignObject" | "desc" | "title") {
                    ns = Namespace::Html;
                }
            }
            Namespace::Html => {}
        }
    }

    if ns == Namespace::Html {
        if tag == "svg" {
            return Namespace::Svg;
        }
        if tag == "math" {
            return Namespace::MathMl;
        }
    }
    ns
}

/// Named character references understood by the DOM preset. The semicolon-less
/// entries are the legacy spellings HTML still honors in text content.
pub const NAMED_REFERENCES: &[(&str, &str)] = &[
    ("gt;", ">"),
    ("gt", ">"),
    ("lt;", "<"),
    ("lt", "<"),
    ("amp;", "&"),
    ("amp", "&"),
    ("apos;", "'"),
    ("quot;", "\""),
    ("quot", "\""),
    ("nbsp;", "\u{a0}"),
    ("nbsp", "\u{a0}"),
    ("copy;", "\u{a9}"),
    ("copy", "\u{a9}"),
    ("reg;", "\u{ae}"),
    ("reg", "\u{ae}"),
    ("trade;", "\u{2122}"),
    ("hellip;", "\u{2026}"),
    ("mdash;", "\u{2014}"),
    ("ndash;", "\u{2013}"),
    ("laquo;", "\u{ab}"),
    ("laquo", "\u{ab}"),
    ("raquo;", "\u{bb}"),
    ("raquo", "\u{bb}"),
    ("ldquo;", "\u{201c}"),
    ("rdquo;", "\u{201d}"),
    ("lsquo;", "\u{2018}"),
    ("rsquo;", "\u{2019}"),
    ("middot;", "\u{b7}"),
    ("middot", "\u{b7}"),
    ("times;", "\u{d7}"),
    ("times", "\u{d7}"),
    ("divide;", "\u{f7}"),
    ("divide", "\u{f7}"),
    ("plusmn;", "\u{b1}"),
    ("plusmn", "\u{b1}"),
    ("deg;", "\u{b0}"),
    ("deg", "\u{b0}"),
    ("micro;", "\u{b5}"),
    ("micro", "\u{b5}"),
    ("para;", "\u{b6}"),
    ("para", "\u{b6}"),
    ("sect;", "\u{a7}"),
    ("sect", "\u{a7}"),
    ("bull;", "\u{2022}"),
    ("dagger;", "\u{2020}"),
    ("Dagger;", "\u{2021}"),
    ("permil;", "\u{2030}"),
    ("euro;", "\u{20ac}"),
    ("pound;", "\u{a3}"),
    ("pound", "\u{a3}"),
    ("yen;", "\u{a5}"),
    ("yen", "\u{a5}"),
    ("cent;", "\u{a2}"),
    ("cent", "\u{a2}"),
    ("sup1;", "\u{b9}"),
    ("sup1", "\u{b9}"),
    ("sup2;", "\u{b2}"),
    ("sup2", "\u{b2}"),
    ("sup3;", "\u{b3}"),
    ("sup3", "\u{b3}"),
    ("frac12;", "\u{bd}"),
    ("frac12", "\u{bd}"),
    ("frac14;", "\u{bc}"),
    ("frac14", "\u{bc}"),
    ("frac34;", "\u{be}"),
    ("frac34", "\u{be}"),
    ("iexcl;", "\u{a1}"),
    ("iexcl", "\u{a1}"),
    ("iquest;", "\u{bf}"),
    ("iquest", "\u{bf}"),
    ("szlig;", "\u{df}"),
    ("szlig", "\u{df}"),
];

/// Build the DOM entity table for [`ParserOptions::named_character_references`]
pub fn named_character_references() -> NamedCharacterReferences {
    NAMED_REFERENCES
        .iter()
        .map(|(name, value)| ((*name).into(), (*value).into()))
        .collect()
}

/// Parser options preset for browser templates
pub fn parser_options() -> ParserOptions {
    ParserOptions {
        is_pre_tag,
        is_void_tag,
        get_namespace,
        get_text_mode,
        named_character_references: named_character_references(),
        ..ParserOptions::default()
    }
}

/// Parse a template with the DOM preset applied
pub fn parse_template<'a>(
    allocator: &'a Bump,
    source: &'a str,
) -> (RootNode<'a>, Vec<'a, CompilerError>) {
    strata_parser::parse_with_options(allocator, source, parser_options())
}
