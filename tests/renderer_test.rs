use accio::error::Error;
use accio::renderer::{HandlebarsRenderer, TemplateRenderer};
use serde_json::json;
use std::collections::HashMap;

fn render(template: &str, data: serde_json::Value) -> String {
    HandlebarsRenderer::new().render(template, &HashMap::new(), &data).unwrap()
}

fn render_err(template: &str, partials: &[(&str, &str)]) -> String {
    let partials: HashMap<String, String> =
        partials.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    match HandlebarsRenderer::new().render(template, &partials, &json!({})) {
        Err(Error::RenderError(msg)) => msg,
        other => panic!("expected a render error, got {other:?}"),
    }
}

#[test]
fn test_plain_text() {
    assert_eq!(render("test", json!({})), "test");
}

#[test]
fn test_interpolation_is_not_escaped() {
    let data = json!({"code": "<a href=\"x\">&</a>", "n": 4, "flag": true});
    assert_eq!(render("{{code}}", data.clone()), "<a href=\"x\">&</a>");
    assert_eq!(render("{{{code}}}", data.clone()), "<a href=\"x\">&</a>");
    assert_eq!(render("{{ n }}/{{flag}}", data), "4/true");
}

#[test]
fn test_missing_names_render_empty() {
    assert_eq!(render("[{{missing}}]", json!({})), "[]");
    assert_eq!(render("[{{a.b.c}}]", json!({"a": {"b": 1}})), "[]");
}

#[test]
fn test_dotted_names() {
    assert_eq!(render("{{a.b}}", json!({"a": {"b": "deep"}})), "deep");
}

#[test]
fn test_list_sections() {
    let data = json!({"items": ["a", "b", "c"]});
    assert_eq!(render("{{#items}}<{{.}}>{{/items}}", data), "<a><b><c>");
}

#[test]
fn test_object_sections_push_context() {
    let data = json!({"name": "outer", "user": {"name": "inner"}, "people": [{"name": "x"}, {}]});
    assert_eq!(render("{{#user}}{{name}}{{/user}}", data.clone()), "inner");
    assert_eq!(render("{{#people}}{{name}};{{/people}}", data.clone()), "x;;");
    assert_eq!(render("{{#user}}{{../name}}{{/user}}", data), "outer");
}

#[test]
fn test_falsy_sections_and_inverted_sections() {
    let data = json!({"f": false, "e": "", "z": 0, "l": [], "t": "yes"});
    for name in ["f", "e", "z", "l", "missing"] {
        let template = format!("{{{{#{name}}}}}shown{{{{else}}}}hidden{{{{/{name}}}}}");
        assert_eq!(render(&template, data.clone()), "hidden", "{name}");
    }
    assert_eq!(render("{{#t}}{{t}}{{else}}no{{/t}}", data.clone()), "yes");
    assert_eq!(render("{{#unless f}}not f{{/unless}}", data), "not f");
}

#[test]
fn test_standalone_lines_are_removed() {
    let template = "start\n{{#items}}\n- {{.}}\n{{/items}}\nend\n";
    assert_eq!(render(template, json!({"items": [1, 2]})), "start\n- 1\n- 2\nend\n");
}

#[test]
fn test_comments_render_nothing() {
    assert_eq!(render("a{{! note }}b{{!-- {{#x}} --}}c", json!({})), "abc");
}

#[test]
fn test_partials_render_with_same_data() {
    let partials: HashMap<String, String> = [
        ("greet".to_string(), "Hello, {{name}}!".to_string()),
        ("outer".to_string(), "[{{> greet}}]".to_string()),
    ]
    .into_iter()
    .collect();
    let output = HandlebarsRenderer::new()
        .render("{{> outer}}", &partials, &json!({"name": "accio"}))
        .unwrap();
    assert_eq!(output, "[Hello, accio!]");
}

#[test]
fn test_standalone_partials_are_indented() {
    let partials: HashMap<String, String> =
        [("body".to_string(), "a\nb\n".to_string())].into_iter().collect();
    let output =
        HandlebarsRenderer::new().render("fn x() {\n    {{> body}}\n}\n", &partials, &json!({})).unwrap();
    assert_eq!(output, "fn x() {\n    a\n    b\n}\n");
}

#[test]
fn test_errors_carry_local_lines() {
    assert_eq!(render_err("a\nb\n{{> nope}}", &[]), "line 3: undefined partial 'nope'");
    assert_eq!(render_err("\n{{#open}}\nx", &[]), "line 2: unclosed section 'open'");
    assert!(render_err("{{#a}}\n{{/b}}", &[]).starts_with("line 2: "));
    assert!(render_err("x\n{{/b}}", &[]).starts_with("line 2: "));
    assert!(render_err("\n\n{{oops", &[]).starts_with("line 3: unclosed tag"));
}

#[test]
fn test_errors_inside_partials_point_at_the_inclusion() {
    let msg = render_err("\n{{> p}}", &[("p", "\n\n{{> missing}}")]);
    assert_eq!(msg, "line 2: in partial 'p': undefined partial 'missing'");
}

#[test]
fn test_deeply_nested_sections_fail_cleanly() {
    let msg = render_err(&"{{#a}}".repeat(100_000), &[]);
    assert_eq!(msg, "line 1: sections nested deeper than 64 levels");
    let nested = format!("{}x{}", "{{#a}}".repeat(64), "{{/a}}".repeat(64));
    assert_eq!(render(&nested, json!({"a": true})), "x");
}

#[test]
fn test_recursive_partials_are_bounded() {
    let msg = render_err("{{> loop}}", &[("loop", "{{> loop}}")]);
    assert!(msg.starts_with("line 1: "));
    assert!(msg.contains("nested deeper than 32"));
}
