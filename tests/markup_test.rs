use accio::blueprint::markup::{parse, Body, TagName};
use accio::blueprint::MissingNamePolicy;
use accio::error::ParseErrorKind;

fn tags(source: &str) -> Vec<accio::blueprint::Tag> {
    parse(source.as_bytes(), MissingNamePolicy::Skip).unwrap()
}

#[test]
fn test_empty_input_has_no_tags() {
    assert!(tags("").is_empty());
    assert!(tags("\n\n  \n").is_empty());
}

#[test]
fn test_inline_tag() {
    let parsed = tags(r#"variable -name="v" << 2 + 2 >>"#);
    assert_eq!(parsed.len(), 1);
    let tag = &parsed[0];
    assert_eq!(tag.name, TagName::Variable);
    assert_eq!(tag.attribute("name"), Some("v"));
    assert_eq!(tag.body, Some(Body { content: "2 + 2".to_string(), inline: true }));
    assert_eq!(tag.line, 1);
}

#[test]
fn test_block_tag_keeps_text_verbatim() {
    let source = "\ntemplate <<\n  indented {{x}}\nsecond\n>>\n";
    let parsed = tags(source);
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].line, 2);
    assert_eq!(
        parsed[0].body,
        Some(Body { content: "  indented {{x}}\nsecond\n".to_string(), inline: false })
    );
}

#[test]
fn test_block_closing_line_may_carry_text() {
    let parsed = tags("template <<\nfirst\nlast>>\n");
    assert_eq!(parsed[0].body.as_ref().unwrap().content, "first\nlast");
}

#[test]
fn test_tags_in_document_order_with_lines() {
    let source = "\
variable -name=\"a\" << 1 >>
partial -name=\"p\" <<
text
>>

filename << 'out.txt' >>
skipif << False >>
template << {{a}} >>
";
    let parsed = tags(source);
    let names: Vec<TagName> = parsed.iter().map(|t| t.name).collect();
    assert_eq!(
        names,
        vec![
            TagName::Variable,
            TagName::Partial,
            TagName::Filename,
            TagName::Skipif,
            TagName::Template
        ]
    );
    let lines: Vec<usize> = parsed.iter().map(|t| t.line).collect();
    assert_eq!(lines, vec![1, 2, 6, 7, 8]);
}

#[test]
fn test_whitespace_only_body_is_empty() {
    let parsed = tags("template <<   >>\nfilename\nskipif <<\n\n>>\n");
    assert_eq!(parsed.len(), 3);
    assert!(parsed.iter().all(|tag| tag.body.is_none()));
}

#[test]
fn test_attribute_escapes_and_repeats() {
    let parsed = tags(r#"variable -name="first" -name="say \"hi\"" << 1 >>"#);
    assert_eq!(parsed[0].attribute("name"), Some(r#"say "hi""#));
    assert_eq!(parsed[0].attributes.len(), 1);
}

#[test]
fn test_unknown_tags_are_ignored() {
    let parsed = tags("comment <<\nvariable -name=\"x\" << 1 >>\n>>\ntemplate << ok >>\n");
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].name, TagName::Template);
    assert_eq!(parsed[0].line, 4);
}

#[test]
fn test_missing_name_is_skipped_by_default() {
    let parsed = tags("variable << 1 >>\npartial << text >>\ntemplate << x >>\n");
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].name, TagName::Template);
}

#[test]
fn test_missing_name_can_be_an_error() {
    let err = parse(b"\nvariable << 1 >>\n", MissingNamePolicy::Error).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    assert_eq!(err.tag, "variable");
    assert_eq!(err.line, 2);
}

#[test]
fn test_syntax_errors() {
    let cases: &[(&str, &str, usize)] = &[
        ("template <<\nnever closed\n", "template", 1),
        ("template << open", "template", 1),
        ("template << x >> trailing", "template", 1),
        ("\n\nvariable -name=v << 1 >>", "variable", 3),
        ("variable -name=\"v << 1 >>", "variable", 1),
        ("variable name=\"v\" << 1 >>", "variable", 1),
        ("<< 1 >>", "markup", 1),
    ];
    for (source, tag, line) in cases {
        let err = parse(source.as_bytes(), MissingNamePolicy::Skip).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Syntax, "{source:?}");
        assert_eq!(&err.tag, tag, "{source:?}");
        assert_eq!(err.line, *line, "{source:?}");
    }
}

#[test]
fn test_invalid_utf8_is_a_syntax_error() {
    let err = parse(b"template << a >>\n\xff\n", MissingNamePolicy::Skip).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    assert_eq!(err.line, 2);
}

#[test]
fn test_crlf_line_endings() {
    let parsed = tags("template <<\r\nline\r\n>>\r\n");
    assert_eq!(parsed[0].body.as_ref().unwrap().content, "line\n");
}

#[test]
fn test_parse_error_display() {
    let err = parse(b"template << open", MissingNamePolicy::Skip).unwrap_err();
    assert!(err.to_string().starts_with("template tag, line 1: "));
}
