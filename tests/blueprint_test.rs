use accio::blueprint::{
    Blueprint, BlueprintOptions, BlueprintParser, Context, DuplicateTagPolicy, MissingNamePolicy,
};
use accio::error::{ParseError, ParseErrorKind};
use accio::renderer::HandlebarsRenderer;
use accio::script::Value;
use indexmap::IndexMap;

fn parse_with(source: &str, context: &Context) -> Result<Blueprint, ParseError> {
    let renderer = HandlebarsRenderer::new();
    BlueprintParser::new(&renderer).parse(source.as_bytes(), context)
}

fn parse(source: &str) -> Result<Blueprint, ParseError> {
    parse_with(source, &Context::new())
}

fn parse_opts(source: &str, options: BlueprintOptions) -> Result<Blueprint, ParseError> {
    let renderer = HandlebarsRenderer::new();
    BlueprintParser::new(&renderer).with_options(options).parse(source.as_bytes(), &Context::new())
}

#[test]
fn test_empty_input() {
    assert_eq!(parse("").unwrap(), Blueprint::default());
    assert_eq!(
        parse("").unwrap(),
        Blueprint { body: String::new(), filename: String::new(), skip: false }
    );
}

#[test]
fn test_plain_template() {
    assert_eq!(parse("template <<test>>").unwrap().body, "test");
}

#[test]
fn test_variable_feeds_template() {
    let blueprint = parse("variable -name=\"v\" << 2+2 >>\ntemplate <<{{v}}>>").unwrap();
    assert_eq!(blueprint.body, "4");
}

#[test]
fn test_variables_see_earlier_variables() {
    let source = "\
variable -name=\"a\" << 'x' >>
variable -name=\"b\" << vars['a'] * 3 >>
template << {{b}} >>
";
    assert_eq!(parse(source).unwrap().body, "xxx");
}

#[test]
fn test_block_template_and_partials() {
    let source = "\
partial -name=\"header\" <<
// {{title}}
>>
variable -name=\"title\" << 'generated' >>
template <<
{{> header}}
fn main() {}
>>
";
    assert_eq!(parse(source).unwrap().body, "// generated\nfn main() {}\n");
}

#[test]
fn test_shadowing_is_isolated_per_file() {
    let mut answers = IndexMap::new();
    answers.insert("name".to_string(), serde_json::json!("base"));
    let base = Context::from_answers(&answers).unwrap();

    let first = parse_with(
        "variable -name=\"name\" << 'local' >>\ntemplate << {{name}} >>",
        &base,
    )
    .unwrap();
    assert_eq!(first.body, "local");

    let second = parse_with("template << {{name}} >>", &base).unwrap();
    assert_eq!(second.body, "base");
    assert_eq!(base.var("name"), Some(&Value::from("base")));
}

#[test]
fn test_later_tags_only_see_earlier_bindings() {
    let source = "\
template << [{{late}}] >>
variable -name=\"late\" << 1 >>
";
    assert_eq!(parse(source).unwrap().body, "[]");
}

#[test]
fn test_filename_type_errors() {
    for body in ["True", "1", "{}", "[]", "(1,)"] {
        let source = format!("\n\nfilename << {body} >>");
        let err = parse(&source).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Type, "{body}");
        assert_eq!(err.tag, "filename");
        assert_eq!(err.line, 3);
    }
}

#[test]
fn test_filename_values() {
    assert_eq!(parse("filename << None >>").unwrap().filename, "");
    assert_eq!(parse("filename << 'src/' + 'main.rs' >>").unwrap().filename, "src/main.rs");
    assert_eq!(parse("filename").unwrap().filename, "");
}

#[test]
fn test_skipif_truthiness() {
    assert!(parse("skipif << \"true string\" >>").unwrap().skip);

    let mut answers = IndexMap::new();
    answers.insert("x".to_string(), serde_json::json!(1));
    let base = Context::from_answers(&answers).unwrap();
    assert!(parse_with("skipif << vars['x'] >>", &base).unwrap().skip);

    for falsy in ["0", "\"\"", "[]", "None", "False", "{}", "0.0"] {
        let source = format!("skipif << {falsy} >>");
        assert!(!parse(&source).unwrap().skip, "{falsy}");
    }
    assert!(!parse("skipif").unwrap().skip);
}

#[test]
fn test_block_script_errors_map_to_source_lines() {
    let source = "\
template << ok >>
variable -name=\"v\" <<
    x = 1
    return x + 'a'
>>
";
    let err = parse(source).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Eval);
    assert_eq!(err.tag, "variable");
    assert_eq!(err.line, 4);
}

#[test]
fn test_inline_script_errors_map_to_tag_line() {
    let err = parse("\n\nvariable -name=\"v\" << nope >>").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Eval);
    assert_eq!(err.line, 3);
    assert!(err.msg.contains("nope"));
}

#[test]
fn test_render_errors_map_to_source_lines() {
    let source = "\
variable -name=\"v\" << 1 >>
template <<
first
{{#open}}
>>
";
    let err = parse(source).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Render);
    assert_eq!(err.tag, "template");
    assert_eq!(err.line, 4);
    assert_eq!(err.msg, "unclosed section 'open'");
}

#[test]
fn test_inline_render_errors_map_to_tag_line() {
    let err = parse("\ntemplate << {{> missing}} >>").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Render);
    assert_eq!(err.line, 2);
}

#[test]
fn test_first_error_aborts() {
    let source = "\
variable -name=\"a\" << 1 // 0 >>
variable -name=\"b\" << undefined >>
";
    let err = parse(source).unwrap_err();
    assert_eq!(err.line, 1);
}

#[test]
fn test_duplicate_tags_last_wins_by_default() {
    let source = "template << one >>\ntemplate << two >>\nfilename << 'a' >>\nfilename << 'b' >>";
    let blueprint = parse(source).unwrap();
    assert_eq!(blueprint.body, "two");
    assert_eq!(blueprint.filename, "b");
}

#[test]
fn test_duplicate_tag_policies() {
    let source = "template << one >>\ntemplate << two >>";

    let first_wins = BlueprintOptions { duplicates: DuplicateTagPolicy::FirstWins, ..Default::default() };
    assert_eq!(parse_opts(source, first_wins).unwrap().body, "one");

    let strict = BlueprintOptions { duplicates: DuplicateTagPolicy::Error, ..Default::default() };
    let err = parse_opts(source, strict).unwrap_err();
    assert_eq!(err.tag, "template");
    assert_eq!(err.line, 2);
}

#[test]
fn test_missing_name_policies() {
    let source = "variable << 1 >>\ntemplate << ok >>";
    assert_eq!(parse(source).unwrap().body, "ok");

    let strict = BlueprintOptions { missing_name: MissingNamePolicy::Error, ..Default::default() };
    let err = parse_opts(source, strict).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    assert_eq!(err.line, 1);
}

#[test]
fn test_template_sees_float_and_none_projection() {
    let source = "\
variable -name=\"ratio\" << 1 / 4 >>
variable -name=\"nothing\" << None >>
variable -name=\"big\" << 1e21 >>
template << {{ratio}}|{{nothing}}|{{big}} >>
";
    assert_eq!(parse(source).unwrap().body, "0.25||1e+21");
}

#[test]
fn test_dict_with_tuple_keys_in_template() {
    let source = "\
variable -name=\"table\" << {('a', 'b'): 1} >>
template << {{table.[a b]}} >>
";
    assert_eq!(parse(source).unwrap().body, "1");
}

#[test]
fn test_list_variable_iteration() {
    let mut answers = IndexMap::new();
    answers.insert("features".to_string(), serde_json::json!(["serde", "log"]));
    let base = Context::from_answers(&answers).unwrap();
    let blueprint = parse_with("template << {{#features}}{{.}},{{/features}} >>", &base).unwrap();
    assert_eq!(blueprint.body, "serde,log,");
}

#[test]
fn test_unsupported_answers_fail_to_marshal() {
    let mut answers = IndexMap::new();
    answers.insert("nested".to_string(), serde_json::json!({"a": 1}));
    assert!(Context::from_answers(&answers).is_err());
}
