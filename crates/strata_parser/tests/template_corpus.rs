//! End-to-end template parsing corpus.
//!
//! Exercises complete documents through the public entry points and checks
//! the structural guarantees the AST makes: location spans that reproduce
//! the original input, document-ordered siblings, and merged text runs.

use strata_ast::ast::*;
use strata_ast::errors::ErrorCode;
use strata_ast::options::{ParserOptions, TextMode, DEFAULT_NAMED_REFERENCES};
use strata_kit::Bump;
use strata_parser::{parse, parse_with_options};

/// Reference position walker: one column per byte, `\n` starts a new line
fn walk_position(mut pos: Position, text: &str) -> Position {
    for b in text.bytes() {
        pos.offset += 1;
        if b == b'\n' {
            pos.line += 1;
            pos.column = 1;
        } else {
            pos.column += 1;
        }
    }
    pos
}

/// A location must carry the exact original slice, and walking that slice
/// from its start position must land on its end position
fn check_loc(original: &str, loc: &SourceLocation) {
    assert_eq!(
        loc.source.as_str(),
        &original[loc.start.offset as usize..loc.end.offset as usize],
        "location source must be the original slice"
    );
    let walked = walk_position(loc.start, loc.source.as_str());
    assert_eq!(walked.offset, loc.end.offset);
    assert_eq!(walked.line, loc.end.line, "line drift in {:?}", loc.source);
    assert_eq!(
        walked.column, loc.end.column,
        "column drift in {:?}",
        loc.source
    );
}

fn check_children(original: &str, children: &[TemplateChildNode<'_>]) {
    let mut previous_end: Option<(u32, bool)> = None;
    for child in children {
        let loc = child.loc();
        check_loc(original, loc);

        // Siblings appear in document order
        if let Some((prev_end, prev_was_text)) = previous_end {
            assert!(
                prev_end <= loc.start.offset,
                "sibling spans must not overlap"
            );
            // Touching text runs must have been merged
            if prev_was_text && matches!(child, TemplateChildNode::Text(_)) {
                assert!(prev_end < loc.start.offset, "touching text nodes survived");
            }
        }
        previous_end = Some((
            loc.end.offset,
            matches!(child, TemplateChildNode::Text(_)),
        ));

        match child {
            TemplateChildNode::Element(el) => {
                for prop in el.props.iter() {
                    check_loc(original, prop.loc());
                    match prop {
                        PropNode::Attribute(attr) => {
                            check_loc(original, &attr.name_loc);
                            if let Some(value) = &attr.value {
                                check_loc(original, &value.loc);
                            }
                        }
                        PropNode::Directive(dir) => {
                            if let Some(arg) = &dir.arg {
                                check_loc(original, &arg.loc);
                            }
                        }
                    }
                }
                check_children(original, &el.children);
            }
            TemplateChildNode::Interpolation(interpolation) => {
                check_loc(original, &interpolation.content.loc);
            }
            _ => {}
        }
    }
}

#[test]
fn spans_reproduce_source() {
    let source = "<div id=\"a\" :class=\"cls\">\n  hello {{ name }}\n  <span>world</span>\n</div><p>tail</p>";
    let allocator = Bump::new();
    let (root, errors) = parse(&allocator, source);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    check_loc(source, &root.loc);
    check_children(source, &root.children);
}

#[test]
fn spans_survive_recovery() {
    // Malformed input still produces consistent spans
    let source = "<div>\n  a < b</span>\n  {{ x }}";
    let allocator = Bump::new();
    let (root, _errors) = parse(&allocator, source);
    check_children(source, &root.children);
}

#[test]
fn unambiguous_input_round_trips() {
    let source = "<div id=\"a\">hello</div><span>y</span>";
    let allocator = Bump::new();
    let (root, errors) = parse(&allocator, source);
    assert!(errors.is_empty());
    let rebuilt: String = root
        .children
        .iter()
        .map(|child| child.loc().source.as_str())
        .collect();
    assert_eq!(rebuilt, source);
}

#[test]
fn plain_element_with_attribute_and_text() {
    let allocator = Bump::new();
    let (root, errors) = parse(&allocator, "<div id=\"a\">hello</div>");
    assert!(errors.is_empty());
    assert_eq!(root.children.len(), 1);
    let TemplateChildNode::Element(div) = &root.children[0] else {
        panic!("expected element");
    };
    assert_eq!(div.tag.as_str(), "div");
    assert_eq!(div.tag_type, ElementType::Element);
    let PropNode::Attribute(attr) = &div.props[0] else {
        panic!("expected attribute");
    };
    assert_eq!(attr.name.as_str(), "id");
    assert_eq!(attr.value.as_ref().unwrap().content.as_str(), "a");
    assert!(
        matches!(&div.children[0], TemplateChildNode::Text(t) if t.content.as_str() == "hello")
    );
}

#[test]
fn entity_decodes_in_element_text() {
    let allocator = Bump::new();
    let (root, errors) = parse(&allocator, "<p>a &amp; b</p>");
    assert!(errors.is_empty());
    let TemplateChildNode::Element(p) = &root.children[0] else {
        panic!("expected element");
    };
    assert!(matches!(&p.children[0], TemplateChildNode::Text(t) if t.content.as_str() == "a & b"));
}

#[test]
fn every_default_entity_decodes() {
    for (name, value) in DEFAULT_NAMED_REFERENCES {
        let source = format!("&{name}");
        let allocator = Bump::new();
        let (root, errors) = parse(&allocator, &source);
        assert!(errors.is_empty(), "errors decoding &{name}: {errors:?}");
        let TemplateChildNode::Text(text) = &root.children[0] else {
            panic!("expected text for &{name}");
        };
        assert_eq!(text.content.as_str(), *value);
    }
}

#[test]
fn interpolation_inner_span_is_trimmed() {
    let allocator = Bump::new();
    let (root, errors) = parse(&allocator, "{{ foo }}");
    assert!(errors.is_empty());
    let TemplateChildNode::Interpolation(interpolation) = &root.children[0] else {
        panic!("expected interpolation");
    };
    let expr = &interpolation.content;
    assert_eq!(expr.content.as_str(), "foo");
    assert!(!expr.is_static);
    assert_eq!(expr.loc.start.offset, 3);
    assert_eq!(expr.loc.end.offset, 6);
}

#[test]
fn component_with_directives() {
    let allocator = Bump::new();
    let (root, errors) = parse(&allocator, "<MyComp :prop=\"x\" @click.stop=\"f\" v-if=\"ok\"/>");
    assert!(errors.is_empty());
    let TemplateChildNode::Element(el) = &root.children[0] else {
        panic!("expected element");
    };
    assert_eq!(el.tag_type, ElementType::Component);
    assert!(el.is_self_closing);
    let names: Vec<&str> = el
        .props
        .iter()
        .map(|p| match p {
            PropNode::Directive(d) => d.name.as_str(),
            PropNode::Attribute(a) => a.name.as_str(),
        })
        .collect();
    assert_eq!(names, vec!["bind", "on", "if"]);
}

#[test]
fn comments_follow_build_mode_option() {
    let source = "<div><!-- c --></div>";

    let allocator = Bump::new();
    let dev = ParserOptions {
        comments: true,
        ..ParserOptions::default()
    };
    let (root, errors) = parse_with_options(&allocator, source, dev);
    assert!(errors.is_empty());
    let TemplateChildNode::Element(div) = &root.children[0] else {
        panic!("expected element");
    };
    assert!(
        matches!(&div.children[0], TemplateChildNode::Comment(c) if c.content.as_str() == " c ")
    );

    let prod = ParserOptions {
        comments: false,
        ..ParserOptions::default()
    };
    let (root, errors) = parse_with_options(&allocator, source, prod);
    assert!(errors.is_empty());
    let TemplateChildNode::Element(div) = &root.children[0] else {
        panic!("expected element");
    };
    assert!(div.children.is_empty());
}

#[test]
fn unclosed_element_reports_and_returns() {
    let allocator = Bump::new();
    let (root, errors) = parse(&allocator, "<div>");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ErrorCode::MissingEndTag);
    let TemplateChildNode::Element(div) = &root.children[0] else {
        panic!("expected element");
    };
    assert!(div.children.is_empty());
}

#[test]
fn one_diagnostic_per_extra_duplicate() {
    let allocator = Bump::new();
    let (root, errors) = parse(&allocator, "<div x=\"1\" x=\"2\" x=\"3\"></div>");
    let duplicates = errors
        .iter()
        .filter(|e| e.code == ErrorCode::DuplicateAttribute)
        .count();
    assert_eq!(duplicates, 2);
    let TemplateChildNode::Element(div) = &root.children[0] else {
        panic!("expected element");
    };
    assert_eq!(div.props.len(), 3);
}

#[test]
fn cdata_in_foreign_namespace() {
    fn svg_namespace(tag: &str, parent: Option<(&str, Namespace)>) -> Namespace {
        if tag == "svg" {
            Namespace::Svg
        } else {
            parent.map_or(Namespace::Html, |(_, ns)| ns)
        }
    }
    let allocator = Bump::new();
    let options = ParserOptions {
        get_namespace: svg_namespace,
        ..ParserOptions::default()
    };
    let (root, errors) = parse_with_options(&allocator, "<svg><![CDATA[x<y]]></svg>", options);
    assert!(errors.is_empty());
    let TemplateChildNode::Element(svg) = &root.children[0] else {
        panic!("expected element");
    };
    assert_eq!(svg.ns, Namespace::Svg);
    assert_eq!(svg.children.len(), 1);
    assert!(matches!(&svg.children[0], TemplateChildNode::Text(t) if t.content.as_str() == "x<y"));
}

#[test]
fn attribute_value_compat_decoding() {
    let mut options = ParserOptions::default();
    options
        .named_character_references
        .insert("amp".into(), "&".into());

    // Followed by `=` or alphanumeric: kept literal
    for source in ["<a x=\"&amp=1\"></a>", "<a x=\"&ampz\"></a>"] {
        let allocator = Bump::new();
        let (root, errors) = parse_with_options(&allocator, source, options.clone());
        assert!(errors.is_empty(), "unexpected errors for {source}");
        let TemplateChildNode::Element(a) = &root.children[0] else {
            panic!("expected element");
        };
        let PropNode::Attribute(attr) = &a.props[0] else {
            panic!("expected attribute");
        };
        assert!(attr.value.as_ref().unwrap().content.starts_with("&amp"));
    }

    // Followed by anything else: decoded
    let allocator = Bump::new();
    let (root, errors) = parse_with_options(&allocator, "<a x=\"&amp!\"></a>", options);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].code,
        ErrorCode::MissingSemicolonAfterCharacterReference
    );
    let TemplateChildNode::Element(a) = &root.children[0] else {
        panic!("expected element");
    };
    let PropNode::Attribute(attr) = &a.props[0] else {
        panic!("expected attribute");
    };
    assert_eq!(attr.value.as_ref().unwrap().content.as_str(), "&!");
}

#[test]
fn errors_arrive_in_source_order() {
    let allocator = Bump::new();
    let source = "<div a=\"1\" a=\"2\"></div><p>&bogus;</p>";
    let (_root, errors) = parse(&allocator, source);
    let offsets: Vec<u32> = errors
        .iter()
        .filter_map(|e| e.loc.as_ref().map(|l| l.start.offset))
        .collect();
    let mut sorted = offsets.clone();
    sorted.sort_unstable();
    assert_eq!(offsets, sorted, "diagnostics must be monotonic");
}

#[test]
fn deep_nesting_and_mixed_children() {
    let allocator = Bump::new();
    let source = "<div>text<span><em>deep</em></span>{{ msg }}</div>";
    let (root, errors) = parse(&allocator, source);
    assert!(errors.is_empty());
    let TemplateChildNode::Element(div) = &root.children[0] else {
        panic!("expected element");
    };
    assert_eq!(div.children.len(), 3);
    assert!(matches!(&div.children[0], TemplateChildNode::Text(_)));
    assert!(matches!(&div.children[1], TemplateChildNode::Element(_)));
    assert!(matches!(&div.children[2], TemplateChildNode::Interpolation(_)));
    check_children(source, &root.children);
}

#[test]
fn rcdata_mode_parses_markup_as_text() {
    let allocator = Bump::new();
    let options = ParserOptions {
        get_text_mode: |tag, _| {
            if tag == "textarea" {
                TextMode::RcData
            } else {
                TextMode::Data
            }
        },
        ..ParserOptions::default()
    };
    let source = "<textarea><div>{{ x }}</textarea>";
    let (root, errors) = parse_with_options(&allocator, source, options);
    assert!(errors.is_empty());
    let TemplateChildNode::Element(textarea) = &root.children[0] else {
        panic!("expected element");
    };
    // Markup stays text, interpolation still parses
    assert_eq!(textarea.children.len(), 2);
    assert!(
        matches!(&textarea.children[0], TemplateChildNode::Text(t) if t.content.as_str() == "<div>")
    );
    assert!(matches!(
        &textarea.children[1],
        TemplateChildNode::Interpolation(_)
    ));
}
