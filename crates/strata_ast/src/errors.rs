//! Structured compiler diagnostics.
//!
//! Errors are values, never panics: the parser reports every problem it finds
//! and keeps going, so a single parse can surface many diagnostics. Codes
//! whose conditions come from the WHATWG tokenization rules keep the
//! standard's naming; `MissingEndTag`, `InvalidEndTag`,
//! `MissingInterpolationEnd`, and `MissingDynamicDirectiveArgumentEnd` are
//! template-syntax checks layered on top.

use serde::{Deserialize, Serialize};

use crate::ast::SourceLocation;

/// Parse error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorCode {
    // Tokenization structure
    EofBeforeTagName = 0,
    EofInTag = 1,
    EofInComment = 2,
    EofInCdata = 3,
    EofInScriptHtmlCommentLikeText = 4,
    MissingEndTagName = 5,
    InvalidFirstCharacterOfTagName = 6,
    UnexpectedQuestionMarkInsteadOfTagName = 7,
    MissingEndTag = 8,
    InvalidEndTag = 9,

    // Comments and CDATA
    IncorrectlyOpenedComment = 10,
    IncorrectlyClosedComment = 11,
    AbruptClosingOfEmptyComment = 12,
    NestedComment = 13,
    CdataInHtmlContent = 14,

    // Attributes
    DuplicateAttribute = 15,
    UnexpectedEqualsSignBeforeAttributeName = 16,
    UnexpectedCharacterInAttributeName = 17,
    MissingAttributeValue = 18,
    UnexpectedCharacterInUnquotedAttributeValue = 19,
    MissingWhitespaceBetweenAttributes = 20,
    UnexpectedSolidusInTag = 21,
    EndTagWithAttributes = 22,
    EndTagWithTrailingSolidus = 23,

    // Character references
    AbsenceOfDigitsInNumericCharacterReference = 24,
    NullCharacterReference = 25,
    CharacterReferenceOutsideUnicodeRange = 26,
    SurrogateCharacterReference = 27,
    NoncharacterCharacterReference = 28,
    ControlCharacterReference = 29,
    UnknownNamedCharacterReference = 30,
    MissingSemicolonAfterCharacterReference = 31,

    // Interpolation and directives
    MissingInterpolationEnd = 32,
    MissingDynamicDirectiveArgumentEnd = 33,
}

impl ErrorCode {
    pub fn message(&self) -> &'static str {
        match self {
            Self::EofBeforeTagName => "Unexpected EOF in tag.",
            Self::EofInTag => "Unexpected EOF in tag.",
            Self::EofInComment => "Unexpected EOF in comment.",
            Self::EofInCdata => "Unexpected EOF in CDATA section.",
            Self::EofInScriptHtmlCommentLikeText => "Unexpected EOF in script.",
            Self::MissingEndTagName => "End tag name was expected.",
            Self::InvalidFirstCharacterOfTagName => "Illegal tag name; use '&lt;' to print '<'.",
            Self::UnexpectedQuestionMarkInsteadOfTagName => "'<?' is allowed only in XML context.",
            Self::MissingEndTag => "Element is missing end tag.",
            Self::InvalidEndTag => "Invalid end tag.",
            Self::IncorrectlyOpenedComment => "Incorrectly opened comment.",
            Self::IncorrectlyClosedComment => "Incorrectly closed comment.",
            Self::AbruptClosingOfEmptyComment => "Illegal comment.",
            Self::NestedComment => "Unexpected '<!--' in comment.",
            Self::CdataInHtmlContent => {
                "CDATA section is allowed only in XML context."
            }
            Self::DuplicateAttribute => "Duplicate attribute.",
            Self::UnexpectedEqualsSignBeforeAttributeName => {
                "Attribute name cannot start with '='."
            }
            Self::UnexpectedCharacterInAttributeName => {
                "Attribute name cannot contain U+0022 (\"), U+0027 ('), or U+003C (<)."
            }
            Self::MissingAttributeValue => "Attribute value was expected.",
            Self::UnexpectedCharacterInUnquotedAttributeValue => {
                "Unquoted attribute value cannot contain U+0022 (\"), U+0027 ('), U+003C (<), \
                 U+003D (=), or U+0060 (`)."
            }
            Self::MissingWhitespaceBetweenAttributes => "Whitespace was expected.",
            Self::UnexpectedSolidusInTag => "Illegal '/' in tags.",
            Self::EndTagWithAttributes => "End tag cannot have attributes.",
            Self::EndTagWithTrailingSolidus => "Illegal '/' in end tags.",
            Self::AbsenceOfDigitsInNumericCharacterReference => {
                "Numeric character reference is missing digits."
            }
            Self::NullCharacterReference => "Illegal numeric character reference: null character.",
            Self::CharacterReferenceOutsideUnicodeRange => {
                "Illegal numeric character reference: too big."
            }
            Self::SurrogateCharacterReference => {
                "Illegal numeric character reference: surrogate code point."
            }
            Self::NoncharacterCharacterReference => {
                "Illegal numeric character reference: non-character."
            }
            Self::ControlCharacterReference => {
                "Illegal numeric character reference: control character."
            }
            Self::UnknownNamedCharacterReference => "Unknown entity name.",
            Self::MissingSemicolonAfterCharacterReference => {
                "Semicolon was expected after character reference."
            }
            Self::MissingInterpolationEnd => {
                "Interpolation end sign was expected."
            }
            Self::MissingDynamicDirectiveArgumentEnd => {
                "End bracket for dynamic directive argument was expected."
            }
        }
    }
}

/// A single parse diagnostic with its source span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerError {
    pub code: ErrorCode,
    pub loc: Option<SourceLocation>,
}

impl CompilerError {
    pub fn new(code: ErrorCode, loc: Option<SourceLocation>) -> Self {
        Self { code, loc }
    }

    pub fn message(&self) -> &'static str {
        self.code.message()
    }
}

impl std::fmt::Display for CompilerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.loc {
            Some(loc) => write!(
                f,
                "{} ({}:{})",
                self.code.message(),
                loc.start.line,
                loc.start.column
            ),
            None => f.write_str(self.code.message()),
        }
    }
}

impl std::error::Error for CompilerError {}
