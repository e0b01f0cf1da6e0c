//! Template AST node types.
//!
//! All AST containers are allocated in a bumpalo arena so a whole parse can be
//! dropped in one shot. `SourceLocation::source` carries a copied slice of the
//! original input, so the tree stays usable after the input buffer goes away.

use serde::{Deserialize, Serialize};
use strata_kit::{Box, Bump, String, Vec};

/// Node type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Root = 0,
    Element = 1,
    Text = 2,
    Comment = 3,
    SimpleExpression = 4,
    Interpolation = 5,
    Attribute = 6,
    Directive = 7,
}

/// Element type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum ElementType {
    #[default]
    Element = 0,
    Component = 1,
    Slot = 2,
    Template = 3,
}

/// Namespace for elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum Namespace {
    #[default]
    Html = 0,
    Svg = 1,
    MathMl = 2,
}

/// Constant type levels for downstream static analysis
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[repr(u8)]
pub enum ConstantType {
    #[default]
    NotConstant = 0,
    CanSkipPatch = 1,
    CanCache = 2,
    CanStringify = 3,
}

/// Source position in the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Byte offset from start of input
    pub offset: u32,
    /// 1-indexed line number
    pub line: u32,
    /// 1-indexed column number
    pub column: u32,
}

impl Position {
    pub const fn new(offset: u32, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(0, 1, 1)
    }
}

/// Source location span `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
    pub source: String,
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::STUB
    }
}

impl SourceLocation {
    /// Stub location for synthesized nodes
    pub const STUB: Self = Self {
        start: Position {
            offset: 0,
            line: 1,
            column: 1,
        },
        end: Position {
            offset: 0,
            line: 1,
            column: 1,
        },
        source: String::const_new(""),
    };

    pub fn new(start: Position, end: Position, source: impl Into<String>) -> Self {
        Self {
            start,
            end,
            source: source.into(),
        }
    }
}

/// Root AST node
#[derive(Debug)]
pub struct RootNode<'a> {
    pub children: Vec<'a, TemplateChildNode<'a>>,
    /// Runtime helper names the transform stage resolves
    pub helpers: Vec<'a, String>,
    /// Component names referenced by the template
    pub components: Vec<'a, String>,
    /// User directive names referenced by the template
    pub directives: Vec<'a, String>,
    /// Nodes hoisted out of the render function by the transform stage
    pub hoists: Vec<'a, TemplateChildNode<'a>>,
    pub source: String,
    pub loc: SourceLocation,
    pub codegen_node: Option<TemplateChildNode<'a>>,
}

impl<'a> RootNode<'a> {
    pub fn new(allocator: &'a Bump, source: impl Into<String>) -> Self {
        Self {
            children: Vec::new_in(allocator),
            helpers: Vec::new_in(allocator),
            components: Vec::new_in(allocator),
            directives: Vec::new_in(allocator),
            hoists: Vec::new_in(allocator),
            source: source.into(),
            loc: SourceLocation::STUB,
            codegen_node: None,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::Root
    }
}

/// All template child node types
#[derive(Debug)]
pub enum TemplateChildNode<'a> {
    Element(Box<'a, ElementNode<'a>>),
    Text(Box<'a, TextNode>),
    Comment(Box<'a, CommentNode>),
    Interpolation(Box<'a, InterpolationNode>),
}

impl<'a> TemplateChildNode<'a> {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Element(_) => NodeType::Element,
            Self::Text(_) => NodeType::Text,
            Self::Comment(_) => NodeType::Comment,
            Self::Interpolation(_) => NodeType::Interpolation,
        }
    }

    pub fn loc(&self) -> &SourceLocation {
        match self {
            Self::Element(n) => &n.loc,
            Self::Text(n) => &n.loc,
            Self::Comment(n) => &n.loc,
            Self::Interpolation(n) => &n.loc,
        }
    }
}

/// Element node
#[derive(Debug)]
pub struct ElementNode<'a> {
    pub ns: Namespace,
    pub tag: String,
    pub tag_type: ElementType,
    pub props: Vec<'a, PropNode<'a>>,
    pub children: Vec<'a, TemplateChildNode<'a>>,
    pub is_self_closing: bool,
    pub loc: SourceLocation,
    pub codegen_node: Option<TemplateChildNode<'a>>,
}

impl<'a> ElementNode<'a> {
    pub fn new(allocator: &'a Bump, tag: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            ns: Namespace::Html,
            tag: tag.into(),
            tag_type: ElementType::Element,
            props: Vec::new_in(allocator),
            children: Vec::new_in(allocator),
            is_self_closing: false,
            loc,
            codegen_node: None,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::Element
    }
}

/// Prop node (attribute or directive)
#[derive(Debug)]
pub enum PropNode<'a> {
    Attribute(Box<'a, AttributeNode>),
    Directive(Box<'a, DirectiveNode<'a>>),
}

impl<'a> PropNode<'a> {
    pub fn loc(&self) -> &SourceLocation {
        match self {
            Self::Attribute(n) => &n.loc,
            Self::Directive(n) => &n.loc,
        }
    }
}

/// Attribute node
#[derive(Debug)]
pub struct AttributeNode {
    pub name: String,
    /// Span of the bare attribute name
    pub name_loc: SourceLocation,
    pub value: Option<TextNode>,
    pub loc: SourceLocation,
}

impl AttributeNode {
    pub fn new(name: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            name: name.into(),
            name_loc: loc.clone(),
            value: None,
            loc,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::Attribute
    }
}

/// Directive node (`v-if`, `:prop`, `@click`, `#default`, ...)
#[derive(Debug)]
pub struct DirectiveNode<'a> {
    /// Normalized directive name without prefix (e.g. "if", "bind", "on")
    pub name: String,
    /// Raw attribute spelling including shorthand (e.g. "@click.stop")
    pub raw_name: Option<String>,
    /// Directive expression
    pub exp: Option<SimpleExpressionNode>,
    /// Directive argument (e.g. "click" in `@click`)
    pub arg: Option<SimpleExpressionNode>,
    /// Directive modifiers (e.g. ["stop", "prevent"] in `@click.stop.prevent`)
    pub modifiers: Vec<'a, String>,
    pub loc: SourceLocation,
}

impl<'a> DirectiveNode<'a> {
    pub fn new(allocator: &'a Bump, name: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            name: name.into(),
            raw_name: None,
            exp: None,
            arg: None,
            modifiers: Vec::new_in(allocator),
            loc,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::Directive
    }
}

/// Text node
#[derive(Debug)]
pub struct TextNode {
    pub content: String,
    /// Whether the content is empty after trimming whitespace
    pub is_empty: bool,
    pub loc: SourceLocation,
}

impl TextNode {
    pub fn new(content: impl Into<String>, loc: SourceLocation) -> Self {
        let content = content.into();
        let is_empty = content.trim().is_empty();
        Self {
            content,
            is_empty,
            loc,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::Text
    }
}

/// Comment node
#[derive(Debug)]
pub struct CommentNode {
    pub content: String,
    pub loc: SourceLocation,
}

impl CommentNode {
    pub fn new(content: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            content: content.into(),
            loc,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::Comment
    }
}

/// Interpolation node (`{{ expr }}`)
#[derive(Debug)]
pub struct InterpolationNode {
    pub content: SimpleExpressionNode,
    pub loc: SourceLocation,
}

impl InterpolationNode {
    pub fn node_type(&self) -> NodeType {
        NodeType::Interpolation
    }
}

/// Simple expression node
#[derive(Debug)]
pub struct SimpleExpressionNode {
    pub content: String,
    pub is_static: bool,
    pub const_type: ConstantType,
    pub loc: SourceLocation,
}

impl SimpleExpressionNode {
    pub fn new(content: impl Into<String>, is_static: bool, loc: SourceLocation) -> Self {
        Self {
            content: content.into(),
            is_static,
            const_type: if is_static {
                ConstantType::CanStringify
            } else {
                ConstantType::NotConstant
            },
            loc,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::SimpleExpression
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_location() {
        let loc = SourceLocation::default();
        assert_eq!(loc.start.offset, 0);
        assert_eq!(loc.start.line, 1);
        assert_eq!(loc.start.column, 1);
        assert_eq!(loc.source.as_str(), "");
    }

    #[test]
    fn test_text_node_emptiness() {
        let text = TextNode::new("  \n\t ", SourceLocation::STUB);
        assert!(text.is_empty);
        let text = TextNode::new(" x ", SourceLocation::STUB);
        assert!(!text.is_empty);
    }

    #[test]
    fn test_static_expression_const_type() {
        let expr = SimpleExpressionNode::new("foo", true, SourceLocation::STUB);
        assert_eq!(expr.const_type, ConstantType::CanStringify);
        let expr = SimpleExpressionNode::new("foo", false, SourceLocation::STUB);
        assert_eq!(expr.const_type, ConstantType::NotConstant);
    }
}
