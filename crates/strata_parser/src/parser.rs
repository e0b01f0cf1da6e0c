//! Template parser.
//!
//! A recursive-descent parser over a mutable cursor: the context owns the
//! live source tail plus the offset/line/column position, and every routine
//! advances through the input while building arena-allocated AST nodes.
//! Errors never abort the parse; they are pushed into the context and the
//! cursor moves past the offending bytes.

use strata_ast::ast::*;
use strata_ast::errors::{CompilerError, ErrorCode};
use strata_ast::options::{ParserOptions, TextMode};
use strata_kit::{Box, Bump, FxHashSet, String, Vec};

use crate::entity;

/// Whether a start or end tag is being parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagType {
    Start,
    End,
}

/// Lightweight copy of an open element, kept on the ancestor stack so
/// end-tag matching and namespace resolution never borrow into the tree
#[derive(Debug, Clone)]
struct Ancestor {
    tag: String,
    ns: Namespace,
}

/// A parsed attribute value before it is attached to an attribute or
/// directive node
struct AttributeValue {
    content: String,
    is_quoted: bool,
    loc: SourceLocation,
}

#[inline]
fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | b'\x0c')
}

#[inline]
fn is_end_of_tag_section(c: u8) -> bool {
    c == b'/' || c == b'>' || is_whitespace(c)
}

/// Walk `text` from `pos`, updating line/column for every byte and line
/// break. The cursor and every sub-token span are derived from this one
/// primitive, which keeps offsets and line/column mutually consistent.
fn advance_position(mut pos: Position, text: &str) -> Position {
    let bytes = text.as_bytes();
    let mut lines = 0u32;
    let mut last_newline = None;
    for i in memchr::memchr_iter(b'\n', bytes) {
        lines += 1;
        last_newline = Some(i);
    }
    pos.offset += bytes.len() as u32;
    pos.line += lines;
    pos.column = match last_newline {
        Some(i) => (bytes.len() - i) as u32,
        None => pos.column + bytes.len() as u32,
    };
    pos
}

/// True if `source` opens the end tag of `tag`: `</`, the tag name matched
/// case-insensitively, then a name terminator or end of input.
fn starts_with_end_tag_open(source: &str, tag: &str) -> bool {
    let bytes = source.as_bytes();
    if !source.starts_with("</") || bytes.len() < 2 + tag.len() {
        return false;
    }
    if !bytes[2..2 + tag.len()].eq_ignore_ascii_case(tag.as_bytes()) {
        return false;
    }
    match bytes.get(2 + tag.len()) {
        None => true,
        Some(&c) => is_end_of_tag_section(c),
    }
}

/// Largest index `<= i` that lands on a character boundary of `s`
fn floor_char_boundary(s: &str, i: usize) -> usize {
    let mut i = i.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Locate the first `-->` or `--!>` in `src`; returns the index of the
/// leading dashes, the terminator length, and whether the bang form matched
fn find_comment_end(src: &str) -> Option<(usize, usize, bool)> {
    let bytes = src.as_bytes();
    for i in memchr::memchr_iter(b'-', bytes) {
        if bytes.get(i + 1).copied() != Some(b'-') {
            continue;
        }
        match bytes.get(i + 2).copied() {
            Some(b'>') => return Some((i, 3, false)),
            Some(b'!') if bytes.get(i + 3).copied() == Some(b'>') => {
                return Some((i, 4, true));
            }
            _ => {}
        }
    }
    None
}

/// Split a raw directive attribute name into its pieces: the explicit `v-`
/// name, the argument (with its byte offset inside the raw name, brackets
/// included), and the `.modifier` tail.
fn split_directive_name(name: &str) -> (Option<&str>, Option<(usize, &str)>, Option<&str>) {
    let bytes = name.as_bytes();
    let mut i = 0;
    let mut dir_name = None;
    if name.starts_with("v-") {
        let mut j = 2;
        while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'-') {
            j += 1;
        }
        if j > 2 {
            dir_name = Some(&name[2..j]);
        }
        i = j;
    }

    let mut arg = None;
    if i < bytes.len() {
        let shorthand = i == 0 && matches!(bytes[0], b':' | b'@' | b'#');
        if shorthand || bytes[i] == b':' {
            let arg_start = i + 1;
            let mut j = arg_start;
            while j < bytes.len() && bytes[j] != b'.' {
                j += 1;
            }
            if j > arg_start {
                arg = Some((arg_start, &name[arg_start..j]));
            }
            i = j;
        }
    }

    let modifiers_tail = if i < bytes.len() { Some(&name[i..]) } else { None };
    (dir_name, arg, modifiers_tail)
}

/// Element classification is purely syntactic: `slot` and `template` are
/// reserved, and any name carrying an uppercase letter or a dash refers to a
/// user component.
fn classify_tag(tag: &str) -> ElementType {
    if tag == "slot" {
        ElementType::Slot
    } else if tag == "template" {
        ElementType::Template
    } else if tag.bytes().any(|b| b.is_ascii_uppercase()) || tag.contains('-') {
        ElementType::Component
    } else {
        ElementType::Element
    }
}

/// Parser context: the single piece of mutable state for one parse
pub struct ParserContext<'a> {
    /// Arena all AST nodes are allocated in
    allocator: &'a Bump,
    /// Resolved options
    options: ParserOptions,
    /// Full input, never advanced; location sources are sliced from it
    original_source: &'a str,
    /// Remaining input
    source: &'a str,
    /// Cursor over the original input
    position: Position,
    /// Longest key in the entity table, precomputed once
    max_cr_name_length: usize,
    /// Inside an element whose content preserves whitespace
    in_pre: bool,
    /// Diagnostics collected so far, in source order
    errors: Vec<'a, CompilerError>,
}

impl<'a> ParserContext<'a> {
    pub fn new(allocator: &'a Bump, source: &'a str, options: ParserOptions) -> Self {
        let max_cr_name_length = options
            .named_character_references
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0);
        Self {
            allocator,
            options,
            original_source: source,
            source,
            position: Position::new(0, 1, 1),
            max_cr_name_length,
            in_pre: false,
            errors: Vec::new_in(allocator),
        }
    }

    // ========== Cursor primitives ==========

    fn get_cursor(&self) -> Position {
        self.position
    }

    fn advance_by(&mut self, n: usize) {
        debug_assert!(n <= self.source.len());
        let (advanced, rest) = self.source.split_at(n);
        self.position = advance_position(self.position, advanced);
        self.source = rest;
    }

    fn advance_spaces(&mut self) {
        let n = self
            .source
            .bytes()
            .take_while(|&b| is_whitespace(b))
            .count();
        if n > 0 {
            self.advance_by(n);
        }
    }

    /// Snapshot `[start, end)` with its slice of the original input. `end`
    /// defaults to the current cursor.
    fn get_selection(&self, start: Position, end: Option<Position>) -> SourceLocation {
        let end = end.unwrap_or_else(|| self.get_cursor());
        SourceLocation::new(
            start,
            end,
            &self.original_source[start.offset as usize..end.offset as usize],
        )
    }

    /// `start` advanced by `num_bytes` of the original input, without moving
    /// the cursor. Used to locate sub-tokens inside an attribute name.
    fn get_new_position(&self, start: Position, num_bytes: usize) -> Position {
        let from = start.offset as usize;
        advance_position(start, &self.original_source[from..from + num_bytes])
    }

    // ========== Diagnostics ==========

    fn emit_error(&mut self, code: ErrorCode, offset: usize) {
        let mut pos = self.get_cursor();
        pos.offset += offset as u32;
        pos.column += offset as u32;
        self.emit_error_at(code, pos);
    }

    fn emit_error_at(&mut self, code: ErrorCode, pos: Position) {
        let err = CompilerError::new(code, Some(SourceLocation::new(pos, pos, "")));
        match self.options.on_error {
            Some(hook) => hook(&err),
            None => tracing::warn!(line = pos.line, column = pos.column, "{}", err),
        }
        self.errors.push(err);
    }

    // ========== Children ==========

    fn parse_children(
        &mut self,
        mode: TextMode,
        ancestors: &mut std::vec::Vec<Ancestor>,
    ) -> Vec<'a, TemplateChildNode<'a>> {
        let mut nodes: Vec<'a, TemplateChildNode<'a>> = Vec::new_in(self.allocator);

        while !self.is_end(mode, ancestors) {
            let src = self.source;
            let mut node: Option<TemplateChildNode<'a>> = None;

            if matches!(mode, TextMode::Data | TextMode::RcData)
                && src.starts_with(self.options.delimiters.0.as_str())
            {
                if let Some(interpolation) = self.parse_interpolation(mode) {
                    node = Some(TemplateChildNode::Interpolation(Box::new_in(
                        interpolation,
                        self.allocator,
                    )));
                }
            } else if mode == TextMode::Data && src.starts_with('<') {
                let bytes = src.as_bytes();
                if src.len() == 1 {
                    self.emit_error(ErrorCode::EofBeforeTagName, 1);
                } else if bytes[1] == b'!' {
                    if src.starts_with("<!--") {
                        node = Some(TemplateChildNode::Comment(Box::new_in(
                            self.parse_comment(),
                            self.allocator,
                        )));
                    } else if src.starts_with("<!DOCTYPE") {
                        // Ignore DOCTYPE declarations but keep their content
                        node = Some(TemplateChildNode::Comment(Box::new_in(
                            self.parse_bogus_comment(),
                            self.allocator,
                        )));
                    } else if src.starts_with("<![CDATA[") {
                        let ns = ancestors.last().map_or(Namespace::Html, |a| a.ns);
                        if ns != Namespace::Html {
                            for child in self.parse_cdata(ancestors) {
                                self.push_node(&mut nodes, child);
                            }
                            continue;
                        }
                        self.emit_error(ErrorCode::CdataInHtmlContent, 0);
                        node = Some(TemplateChildNode::Comment(Box::new_in(
                            self.parse_bogus_comment(),
                            self.allocator,
                        )));
                    } else {
                        self.emit_error(ErrorCode::IncorrectlyOpenedComment, 0);
                        node = Some(TemplateChildNode::Comment(Box::new_in(
                            self.parse_bogus_comment(),
                            self.allocator,
                        )));
                    }
                } else if bytes[1] == b'/' {
                    if src.len() == 2 {
                        self.emit_error(ErrorCode::EofBeforeTagName, 2);
                    } else if bytes[2] == b'>' {
                        self.emit_error(ErrorCode::MissingEndTagName, 2);
                        self.advance_by(3);
                        continue;
                    } else if bytes[2].is_ascii_alphabetic() {
                        // Stray end tag: parse it for accurate positions, then
                        // throw it away
                        self.emit_error(ErrorCode::InvalidEndTag, 0);
                        let parent = ancestors.last().cloned();
                        let _ = self.parse_tag(TagType::End, parent.as_ref());
                        continue;
                    } else {
                        self.emit_error(ErrorCode::InvalidFirstCharacterOfTagName, 2);
                        node = Some(TemplateChildNode::Comment(Box::new_in(
                            self.parse_bogus_comment(),
                            self.allocator,
                        )));
                    }
                } else if bytes[1].is_ascii_alphabetic() {
                    let element = self.parse_element(ancestors);
                    node = Some(TemplateChildNode::Element(Box::new_in(
                        element,
                        self.allocator,
                    )));
                } else if bytes[1] == b'?' {
                    self.emit_error(ErrorCode::UnexpectedQuestionMarkInsteadOfTagName, 1);
                    node = Some(TemplateChildNode::Comment(Box::new_in(
                        self.parse_bogus_comment(),
                        self.allocator,
                    )));
                } else {
                    self.emit_error(ErrorCode::InvalidFirstCharacterOfTagName, 1);
                }
            }

            let node = match node {
                Some(node) => node,
                None => {
                    TemplateChildNode::Text(Box::new_in(self.parse_text(mode), self.allocator))
                }
            };
            self.push_node(&mut nodes, node);
        }

        nodes
    }

    /// Append a node, dropping comments and whitespace-only text per options
    /// and merging a text node into a previous text sibling whose span
    /// touches it
    fn push_node(&self, nodes: &mut Vec<'a, TemplateChildNode<'a>>, node: TemplateChildNode<'a>) {
        match node {
            TemplateChildNode::Comment(_) if !self.options.comments => {}
            TemplateChildNode::Text(text) => {
                if let Some(TemplateChildNode::Text(prev)) = nodes.last_mut() {
                    if prev.loc.end.offset == text.loc.start.offset {
                        prev.content.push_str(&text.content);
                        prev.loc.end = text.loc.end;
                        prev.loc.source.push_str(&text.loc.source);
                        prev.is_empty = prev.content.trim().is_empty();
                        return;
                    }
                }
                if self.options.ignore_spaces && !self.in_pre && text.is_empty {
                    return;
                }
                nodes.push(TemplateChildNode::Text(text));
            }
            other => nodes.push(other),
        }
    }

    fn is_end(&self, mode: TextMode, ancestors: &[Ancestor]) -> bool {
        let s = self.source;
        match mode {
            TextMode::Data => {
                if s.starts_with("</") {
                    // Nearest-first: an end tag for any open element closes
                    // everything inside it
                    for ancestor in ancestors.iter().rev() {
                        if starts_with_end_tag_open(s, &ancestor.tag) {
                            return true;
                        }
                    }
                }
            }
            TextMode::RcData | TextMode::RawText => {
                if let Some(parent) = ancestors.last() {
                    if starts_with_end_tag_open(s, &parent.tag) {
                        return true;
                    }
                }
            }
            TextMode::CData => {
                if s.starts_with("]]>") {
                    return true;
                }
            }
            TextMode::AttributeValue => {}
        }
        s.is_empty()
    }

    // ========== Elements and tags ==========

    fn parse_element(&mut self, ancestors: &mut std::vec::Vec<Ancestor>) -> ElementNode<'a> {
        let was_in_pre = self.in_pre;
        let parent = ancestors.last().cloned();
        let mut element = self.parse_tag(TagType::Start, parent.as_ref());

        if (self.options.is_pre_tag)(element.tag.as_str()) {
            self.in_pre = true;
        }

        if element.is_self_closing || (self.options.is_void_tag)(element.tag.as_str()) {
            self.in_pre = was_in_pre;
            return element;
        }

        ancestors.push(Ancestor {
            tag: element.tag.clone(),
            ns: element.ns,
        });
        let mode = (self.options.get_text_mode)(element.tag.as_str(), element.ns);
        let children = self.parse_children(mode, ancestors);
        ancestors.pop();
        element.children = children;

        if starts_with_end_tag_open(self.source, &element.tag) {
            let _ = self.parse_tag(TagType::End, parent.as_ref());
        } else {
            self.emit_error_at(ErrorCode::MissingEndTag, element.loc.start);
            if self.source.is_empty() && element.tag.as_str().eq_ignore_ascii_case("script") {
                if let Some(TemplateChildNode::Text(first)) = element.children.first() {
                    if first.loc.source.starts_with("<!--") {
                        self.emit_error(ErrorCode::EofInScriptHtmlCommentLikeText, 0);
                    }
                }
            }
        }

        element.loc = self.get_selection(element.loc.start, None);
        self.in_pre = was_in_pre;
        element
    }

    /// Parse a `<tag ...>` or `</tag ...>` token, attributes included. End
    /// tags go through the same path so their errors land on exact spans;
    /// the caller discards the node.
    fn parse_tag(&mut self, tag_type: TagType, parent: Option<&Ancestor>) -> ElementNode<'a> {
        let start = self.get_cursor();
        let src = self.source;
        let bytes = src.as_bytes();

        let name_start = if src.starts_with("</") { 2 } else { 1 };
        debug_assert!(bytes[name_start].is_ascii_alphabetic());
        let mut name_end = name_start + 1;
        while name_end < bytes.len() && !is_end_of_tag_section(bytes[name_end]) {
            name_end += 1;
        }

        let tag: String = src[name_start..name_end].into();
        let ns = (self.options.get_namespace)(
            tag.as_str(),
            parent.map(|a| (a.tag.as_str(), a.ns)),
        );

        self.advance_by(name_end);
        self.advance_spaces();

        let props = self.parse_attributes(tag_type);

        let mut is_self_closing = false;
        if self.source.is_empty() {
            self.emit_error(ErrorCode::EofInTag, 0);
        } else {
            is_self_closing = self.source.starts_with("/>");
            if tag_type == TagType::End && is_self_closing {
                self.emit_error(ErrorCode::EndTagWithTrailingSolidus, 0);
            }
            self.advance_by(if is_self_closing { 2 } else { 1 });
        }

        let tag_class = classify_tag(tag.as_str());
        let mut element = ElementNode::new(self.allocator, tag, self.get_selection(start, None));
        element.ns = ns;
        element.tag_type = tag_class;
        element.props = props;
        element.is_self_closing = is_self_closing;
        element
    }

    // ========== Attributes ==========

    fn parse_attributes(&mut self, tag_type: TagType) -> Vec<'a, PropNode<'a>> {
        let mut props = Vec::new_in(self.allocator);
        let mut attribute_names: FxHashSet<String> = FxHashSet::default();

        while !self.source.is_empty()
            && !self.source.starts_with('>')
            && !self.source.starts_with("/>")
        {
            if self.source.starts_with('/') {
                self.emit_error(ErrorCode::UnexpectedSolidusInTag, 0);
                self.advance_by(1);
                self.advance_spaces();
                continue;
            }
            if tag_type == TagType::End {
                self.emit_error(ErrorCode::EndTagWithAttributes, 0);
            }

            let attr = self.parse_attribute(&mut attribute_names);
            if tag_type == TagType::Start {
                props.push(attr);
            }

            if let Some(&next) = self.source.as_bytes().first() {
                if !is_end_of_tag_section(next) {
                    self.emit_error(ErrorCode::MissingWhitespaceBetweenAttributes, 0);
                }
            }
            self.advance_spaces();
        }

        props
    }

    fn parse_attribute(&mut self, attribute_names: &mut FxHashSet<String>) -> PropNode<'a> {
        let start = self.get_cursor();
        let src = self.source;
        let bytes = src.as_bytes();

        // Name: any first byte except a terminator, then anything except a
        // terminator or `=`
        let mut name_len = 1;
        while name_len < bytes.len()
            && !is_end_of_tag_section(bytes[name_len])
            && bytes[name_len] != b'='
        {
            name_len += 1;
        }
        let name = &src[..name_len];

        if attribute_names.contains(name) {
            self.emit_error(ErrorCode::DuplicateAttribute, 0);
        }
        attribute_names.insert(name.into());

        if bytes[0] == b'=' {
            self.emit_error(ErrorCode::UnexpectedEqualsSignBeforeAttributeName, 0);
        }
        for (i, b) in name.bytes().enumerate() {
            if matches!(b, b'"' | b'\'' | b'<') {
                self.emit_error(ErrorCode::UnexpectedCharacterInAttributeName, i);
            }
        }

        self.advance_by(name_len);
        let name_loc = self.get_selection(start, None);

        let mut value = None;
        let next_non_space = self.source.bytes().find(|&b| !is_whitespace(b));
        if next_non_space == Some(b'=') {
            self.advance_spaces();
            self.advance_by(1);
            self.advance_spaces();
            value = self.parse_attribute_value();
            if value.is_none() {
                self.emit_error(ErrorCode::MissingAttributeValue, 0);
            }
        }
        let loc = self.get_selection(start, None);

        if name.starts_with("v-") || matches!(bytes[0], b':' | b'@' | b'#') {
            return self.build_directive(name, start, value, loc);
        }

        let mut attr = AttributeNode::new(name, loc);
        attr.name_loc = name_loc;
        if let Some(value) = value {
            attr.value = Some(TextNode::new(value.content, value.loc));
        }
        PropNode::Attribute(Box::new_in(attr, self.allocator))
    }

    /// Build a directive node out of a `v-*` / `:` / `@` / `#` attribute
    fn build_directive(
        &mut self,
        name: &str,
        start: Position,
        value: Option<AttributeValue>,
        loc: SourceLocation,
    ) -> PropNode<'a> {
        let (dir_name, arg, modifiers_tail) = split_directive_name(name);
        let resolved: String = match dir_name {
            Some(n) => n.into(),
            None => match name.as_bytes()[0] {
                b':' => "bind".into(),
                b'@' => "on".into(),
                _ => "slot".into(),
            },
        };

        let mut directive = DirectiveNode::new(self.allocator, resolved, loc);
        directive.raw_name = Some(name.into());

        if let Some((arg_offset, raw_arg)) = arg {
            // The argument span is computed from its byte offset inside the
            // raw name, brackets included
            let arg_start = self.get_new_position(start, arg_offset);
            let arg_end = self.get_new_position(start, arg_offset + raw_arg.len());
            let arg_loc = self.get_selection(arg_start, Some(arg_end));

            let mut content = raw_arg;
            let mut is_static = true;
            if content.starts_with('[') {
                is_static = false;
                match content.strip_prefix('[').and_then(|c| c.strip_suffix(']')) {
                    Some(stripped) => content = stripped,
                    None => {
                        self.emit_error(ErrorCode::MissingDynamicDirectiveArgumentEnd, 0);
                        content = &content[1..];
                    }
                }
            }
            directive.arg = Some(SimpleExpressionNode::new(content, is_static, arg_loc));
        }

        if let Some(tail) = modifiers_tail {
            for modifier in tail.trim_start_matches('.').split('.') {
                if !modifier.is_empty() {
                    directive.modifiers.push(modifier.into());
                }
            }
        }

        if let Some(value) = value {
            let mut exp_loc = value.loc;
            if value.is_quoted && exp_loc.source.len() >= 2 {
                // Tighten the span to exclude the quotes
                exp_loc.start.offset += 1;
                exp_loc.start.column += 1;
                exp_loc.end = advance_position(exp_loc.start, value.content.as_str());
                let inner: String = exp_loc.source[1..exp_loc.source.len() - 1].into();
                exp_loc.source = inner;
            }
            directive.exp = Some(SimpleExpressionNode::new(value.content, false, exp_loc));
        }

        PropNode::Directive(Box::new_in(directive, self.allocator))
    }

    fn parse_attribute_value(&mut self) -> Option<AttributeValue> {
        let start = self.get_cursor();
        let src = self.source;
        let quote = *src.as_bytes().first()?;

        let is_quoted = quote == b'"' || quote == b'\'';
        let content = if is_quoted {
            self.advance_by(1);
            let tail = self.source;
            match memchr::memchr(quote, tail.as_bytes()) {
                Some(close_index) => {
                    let content = self.parse_text_data(close_index, TextMode::AttributeValue);
                    self.advance_by(1);
                    content
                }
                // Unterminated value: consume to end of input
                None => self.parse_text_data(tail.len(), TextMode::AttributeValue),
            }
        } else {
            let bytes = src.as_bytes();
            let mut len = 0;
            while len < bytes.len()
                && !matches!(bytes[len], b'\t' | b'\r' | b'\n' | b'\x0c' | b' ' | b'>')
            {
                len += 1;
            }
            if len == 0 {
                return None;
            }
            for (i, b) in src[..len].bytes().enumerate() {
                if matches!(b, b'"' | b'\'' | b'<' | b'=' | b'`') {
                    self.emit_error(ErrorCode::UnexpectedCharacterInUnquotedAttributeValue, i);
                }
            }
            self.parse_text_data(len, TextMode::AttributeValue)
        };

        Some(AttributeValue {
            content,
            is_quoted,
            loc: self.get_selection(start, None),
        })
    }

    // ========== Text and character references ==========

    fn parse_text(&mut self, mode: TextMode) -> TextNode {
        let src = self.source;
        debug_assert!(!src.is_empty());
        let bytes = src.as_bytes();

        // A run ends at the next `<`, the next interpolation opener, or (in
        // CDATA) the next `]]>` -- each searched from index 1 so progress is
        // always made
        let mut end_index = src.len();
        if let Some(i) = memchr::memchr(b'<', &bytes[1..]) {
            end_index = end_index.min(i + 1);
        }
        {
            let open = self.options.delimiters.0.as_bytes();
            if let Some(i) = memchr::memmem::find(&bytes[1..], open) {
                end_index = end_index.min(i + 1);
            }
        }
        if mode == TextMode::CData {
            if let Some(i) = memchr::memmem::find(&bytes[1..], b"]]>") {
                end_index = end_index.min(i + 1);
            }
        }

        let start = self.get_cursor();
        let content = self.parse_text_data(end_index, mode);
        TextNode::new(content, self.get_selection(start, None))
    }

    /// Consume `length` bytes of source, decoding character references where
    /// the mode calls for it. The cursor advances through the run piecewise
    /// so every reference diagnostic carries its exact position.
    fn parse_text_data(&mut self, length: usize, mode: TextMode) -> String {
        let src = self.source;
        let raw = &src[..length];
        if matches!(mode, TextMode::RawText | TextMode::CData)
            || memchr::memchr(b'&', raw.as_bytes()).is_none()
        {
            self.advance_by(length);
            return raw.into();
        }

        let end = self.position.offset as usize + length;
        let mut text = std::string::String::with_capacity(length);
        while (self.position.offset as usize) < end {
            let tail = self.source;
            let bound = end - self.position.offset as usize;
            let head = &tail[..bound];
            match memchr::memchr(b'&', head.as_bytes()) {
                None => {
                    text.push_str(head);
                    self.advance_by(bound);
                    break;
                }
                Some(i) => {
                    text.push_str(&head[..i]);
                    self.advance_by(i);
                    self.decode_character_reference(&mut text, end, mode);
                }
            }
        }
        text.into()
    }

    /// Decode one reference at the cursor (which sits on `&`), never reading
    /// at or past absolute offset `end`
    fn decode_character_reference(
        &mut self,
        text: &mut std::string::String,
        end: usize,
        mode: TextMode,
    ) {
        let tail = self.source;
        let bound = end - self.position.offset as usize;
        let window = &tail[..bound];
        let bytes = window.as_bytes();
        debug_assert_eq!(bytes[0], b'&');

        match bytes.get(1).copied() {
            Some(next) if next.is_ascii_alphanumeric() => {
                let max_len = self.max_cr_name_length.min(bound - 1);
                match entity::match_named_reference(
                    &self.options.named_character_references,
                    &window[1..],
                    max_len,
                ) {
                    Some((name_len, replacement)) => {
                        let name = &window[1..1 + name_len];
                        let semi = name.ends_with(';');
                        let after = bytes.get(1 + name_len).copied();
                        let legacy_compat = mode == TextMode::AttributeValue
                            && !semi
                            && matches!(after, Some(c) if c == b'=' || c.is_ascii_alphanumeric());
                        if legacy_compat {
                            // `&name` followed by `=` or an alphanumeric in an
                            // attribute value stays literal
                            text.push('&');
                            text.push_str(name);
                            self.advance_by(1 + name_len);
                        } else {
                            text.push_str(&replacement);
                            self.advance_by(1 + name_len);
                            if !semi {
                                self.emit_error(
                                    ErrorCode::MissingSemicolonAfterCharacterReference,
                                    0,
                                );
                            }
                        }
                    }
                    None => {
                        let mut scanned = 1;
                        while scanned < bytes.len() && bytes[scanned].is_ascii_alphanumeric() {
                            scanned += 1;
                        }
                        self.emit_error(ErrorCode::UnknownNamedCharacterReference, 0);
                        text.push_str(&window[..scanned]);
                        self.advance_by(scanned);
                    }
                }
            }
            Some(b'#') => self.decode_numeric_reference(text, window),
            _ => {
                text.push('&');
                self.advance_by(1);
            }
        }
    }

    fn decode_numeric_reference(&mut self, text: &mut std::string::String, window: &str) {
        let bytes = window.as_bytes();
        let hex = matches!(bytes.get(2).copied(), Some(b'x' | b'X'));
        let digits_start = if hex { 3 } else { 2 };

        let mut digits_end = digits_start;
        while digits_end < bytes.len() {
            let is_digit = if hex {
                bytes[digits_end].is_ascii_hexdigit()
            } else {
                bytes[digits_end].is_ascii_digit()
            };
            if !is_digit {
                break;
            }
            digits_end += 1;
        }

        if digits_end == digits_start {
            self.emit_error(ErrorCode::AbsenceOfDigitsInNumericCharacterReference, 0);
            let literal_len = digits_start.min(window.len());
            text.push_str(&window[..literal_len]);
            self.advance_by(literal_len);
            return;
        }

        let digits = &window[digits_start..digits_end];
        // Overflowing digit runs clamp above the Unicode range
        let mut cp = u32::from_str_radix(digits, if hex { 16 } else { 10 }).unwrap_or(0x0011_0000);

        if cp == 0 {
            self.emit_error(ErrorCode::NullCharacterReference, 0);
            cp = 0xfffd;
        } else if cp > 0x0010_ffff {
            self.emit_error(ErrorCode::CharacterReferenceOutsideUnicodeRange, 0);
            cp = 0xfffd;
        } else if (0xd800..=0xdfff).contains(&cp) {
            self.emit_error(ErrorCode::SurrogateCharacterReference, 0);
            cp = 0xfffd;
        } else if entity::is_noncharacter(cp) {
            // Flagged but kept
            self.emit_error(ErrorCode::NoncharacterCharacterReference, 0);
        } else if entity::is_control_reference(cp) {
            self.emit_error(ErrorCode::ControlCharacterReference, 0);
            cp = entity::control_replacement(cp);
        }
        text.push(char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER));

        let semi = bytes.get(digits_end).copied() == Some(b';');
        self.advance_by(if semi { digits_end + 1 } else { digits_end });
        if !semi {
            self.emit_error(ErrorCode::MissingSemicolonAfterCharacterReference, 0);
        }
    }

    // ========== Interpolation ==========

    fn parse_interpolation(&mut self, mode: TextMode) -> Option<InterpolationNode> {
        let src = self.source;
        let open_len = self.options.delimiters.0.len();
        let close_len = self.options.delimiters.1.len();

        let close_index = {
            let close = self.options.delimiters.1.as_bytes();
            memchr::memmem::find(&src.as_bytes()[open_len..], close).map(|i| i + open_len)
        };
        let Some(close_index) = close_index else {
            self.emit_error(ErrorCode::MissingInterpolationEnd, 0);
            return None;
        };

        let start = self.get_cursor();
        self.advance_by(open_len);
        let inner_base = self.get_cursor();
        let raw_content_length = close_index - open_len;
        let raw_content = &src[open_len..close_index];

        let pre_trim = self.parse_text_data(raw_content_length, mode);
        let content = pre_trim.trim();

        // Recover the trimmed expression's span inside the raw content; the
        // first occurrence is the contract when the content repeats
        let start_offset = pre_trim.find(content).unwrap_or(0);
        let inner_start = advance_position(
            inner_base,
            &raw_content[..floor_char_boundary(raw_content, start_offset)],
        );
        let end_offset = raw_content_length - (pre_trim.len() - content.len() - start_offset);
        let inner_end = advance_position(
            inner_base,
            &raw_content[..floor_char_boundary(raw_content, end_offset)],
        );
        self.advance_by(close_len);

        let exp_loc = self.get_selection(inner_start, Some(inner_end));
        let expression = SimpleExpressionNode::new(content, false, exp_loc);
        Some(InterpolationNode {
            content: expression,
            loc: self.get_selection(start, None),
        })
    }

    // ========== Comments and CDATA ==========

    fn parse_comment(&mut self) -> CommentNode {
        let start = self.get_cursor();
        let src = self.source;

        let content: String;
        match find_comment_end(src) {
            None => {
                content = src[4.min(src.len())..].into();
                self.advance_by(src.len());
                self.emit_error(ErrorCode::EofInComment, 0);
            }
            Some((index, terminator_len, bang)) => {
                if index <= 3 {
                    self.emit_error(ErrorCode::AbruptClosingOfEmptyComment, 0);
                }
                if bang {
                    self.emit_error(ErrorCode::IncorrectlyClosedComment, 0);
                }
                content = src[4..index.max(4)].into();

                // Walk any nested `<!--` so their diagnostics land exactly
                let inner = &src[..index];
                let mut prev_index = 1;
                while let Some(found) =
                    memchr::memmem::find(&inner.as_bytes()[prev_index..], b"<!--")
                {
                    let nested_index = found + prev_index;
                    self.advance_by(nested_index - prev_index + 1);
                    if nested_index + 4 < inner.len() {
                        self.emit_error(ErrorCode::NestedComment, 0);
                    }
                    prev_index = nested_index + 1;
                }
                self.advance_by(index + terminator_len - prev_index + 1);
            }
        }

        CommentNode::new(content, self.get_selection(start, None))
    }

    /// Malformed-declaration recovery: everything up to `>` becomes a
    /// comment node
    fn parse_bogus_comment(&mut self) -> CommentNode {
        let start = self.get_cursor();
        let src = self.source;
        let content_start = if src.as_bytes()[1] == b'?' { 1 } else { 2 };

        let content: String;
        match memchr::memchr(b'>', src.as_bytes()) {
            None => {
                content = src[content_start.min(src.len())..].into();
                self.advance_by(src.len());
            }
            Some(close_index) => {
                content = src[content_start..close_index.max(content_start)].into();
                self.advance_by(close_index + 1);
            }
        }

        CommentNode::new(content, self.get_selection(start, None))
    }

    fn parse_cdata(
        &mut self,
        ancestors: &mut std::vec::Vec<Ancestor>,
    ) -> Vec<'a, TemplateChildNode<'a>> {
        self.advance_by(9); // <![CDATA[
        let nodes = self.parse_children(TextMode::CData, ancestors);
        if self.source.is_empty() {
            self.emit_error(ErrorCode::EofInCdata, 0);
        } else {
            self.advance_by(3); // ]]>
        }
        nodes
    }
}

/// Parse a template with default options
pub fn parse<'a>(allocator: &'a Bump, source: &'a str) -> (RootNode<'a>, Vec<'a, CompilerError>) {
    parse_with_options(allocator, source, ParserOptions::default())
}

/// Parse a template
pub fn parse_with_options<'a>(
    allocator: &'a Bump,
    source: &'a str,
    options: ParserOptions,
) -> (RootNode<'a>, Vec<'a, CompilerError>) {
    let mut context = ParserContext::new(allocator, source, options);
    let start = context.get_cursor();
    let mut ancestors = std::vec::Vec::new();
    let children = context.parse_children(TextMode::Data, &mut ancestors);

    let mut root = RootNode::new(allocator, source);
    root.children = children;
    root.loc = context.get_selection(start, None);
    (root, context.errors)
}
