//! Edge cases: parse failures, safety guards, and hostile-ish inputs.

use std::collections::HashMap;

use sqlweave::{
    AnsiDialect, MapResolver, ParseError, RenderContext, RenderError, RenderedSql, Template, Value,
};

fn render(template: &str, pairs: &[(&str, Value)]) -> Result<RenderedSql, RenderError> {
    let template = Template::parse(template).expect("template should parse");
    let bindings: HashMap<String, Value> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    let dialect = AnsiDialect;
    let resolver = MapResolver::new();
    let ctx = RenderContext::new(&bindings, &dialect, &resolver);
    template.render(&ctx)
}

#[test]
fn colon_inside_string_literal_stays_text() {
    let out = render("SELECT * FROM t WHERE created > '10:30'", &[]).unwrap();
    assert_eq!(out.sql, "SELECT * FROM t WHERE created > '10:30'");
    assert!(out.binds.is_empty());
}

#[test]
fn at_sign_without_directive_stays_text() {
    let out = render("WHERE email = 'a@b.com' AND note = :note", &[(
        "note",
        Value::string("hi"),
    )])
    .unwrap();
    assert_eq!(out.sql, "WHERE email = 'a@b.com' AND note = ?");
}

#[test]
fn directive_chars_inside_quotes_do_not_close_blocks() {
    let out = render(
        "@if(:on){ AND note = '}' } @if(:on){ AND tag = '@where' }",
        &[("on", Value::Bool(true))],
    )
    .unwrap();
    assert_eq!(out.sql.trim(), "AND note = '}' AND tag = '@where'");
}

#[test]
fn parameter_after_from_is_rejected() {
    let err = render("SELECT * FROM :table", &[("table", Value::string("users"))]).unwrap_err();
    assert_eq!(
        err,
        RenderError::ParameterInIdentifierPosition("FROM".into())
    );
}

#[test]
fn parameter_after_dot_is_rejected() {
    let err = render("WHERE t.:col = 1", &[("col", Value::string("name"))]).unwrap_err();
    assert_eq!(err, RenderError::ParameterInIdentifierPosition(".".into()));
}

#[test]
fn parameter_after_order_by_is_rejected() {
    let err = render(
        "SELECT * FROM t ORDER BY :col",
        &[("col", Value::string("name"))],
    )
    .unwrap_err();
    assert_eq!(
        err,
        RenderError::ParameterInIdentifierPosition("ORDER BY".into())
    );
}

#[test]
fn parameter_in_value_position_is_fine() {
    // GROUP BY in a string literal earlier in the text must not trip the
    // guard for a later, legitimate placeholder.
    let out = render(
        "SELECT * FROM t WHERE kind = 'ORDER BY' AND id = :id",
        &[("id", Value::Int(1))],
    )
    .unwrap();
    assert!(out.sql.ends_with("id = ?"));
}

#[test]
fn missing_binding_names_the_path_root() {
    let err = render("WHERE id = :id", &[]).unwrap_err();
    assert_eq!(err, RenderError::MissingBinding("id".into()));
}

#[test]
fn unknown_property_names_the_segment() {
    let mut map = HashMap::new();
    map.insert("a".to_string(), Value::Int(1));
    let err = render("WHERE x = :m.b", &[("m", Value::Map(map))]).unwrap_err();
    assert_eq!(
        err,
        RenderError::UnknownProperty {
            property: "b".into(),
            value_kind: "map"
        }
    );
}

#[test]
fn unknown_entity_and_column() {
    assert_eq!(
        render("SELECT * FROM @table(Ghost)", &[]).unwrap_err(),
        RenderError::UnknownEntity("Ghost".into())
    );
    assert_eq!(
        render("SELECT @col(Ghost::id) FROM t", &[]).unwrap_err(),
        RenderError::UnknownColumn {
            entity: "Ghost".into(),
            field: "id".into()
        }
    );
}

#[test]
fn for_over_scalar_is_not_iterable() {
    let err = render("@for(x : :s){ :x }", &[("s", Value::string("nope"))]).unwrap_err();
    assert_eq!(err, RenderError::NotIterable("string"));
}

#[test]
fn page_arguments_must_be_integers() {
    let err = render(
        "@page(:p, :n)",
        &[("p", Value::string("one")), ("n", Value::Int(10))],
    )
    .unwrap_err();
    assert_eq!(err, RenderError::NotANumber("string"));
}

#[test]
fn order_by_fragment_with_binds_is_rejected() {
    let err = render(
        r#"@orderBy(:sort, allowed = { K: "coalesce(x, :fallback)" })"#,
        &[
            ("sort", Value::string("K")),
            ("fallback", Value::Int(0)),
        ],
    )
    .unwrap_err();
    assert_eq!(err, RenderError::OrderByFragmentHasParams("K".into()));
}

#[test]
fn order_by_without_default_and_null_selection_emits_nothing() {
    let out = render(
        r#"SELECT * FROM t @orderBy(:sort, allowed = { K: "k" })"#,
        &[("sort", Value::Null)],
    )
    .unwrap();
    assert_eq!(out.sql.trim_end(), "SELECT * FROM t");
}

#[test]
fn failed_render_returns_no_partial_output() {
    // The second parameter is missing; the whole render fails rather than
    // returning the prefix that had already been produced.
    let result = render(
        "WHERE a = :a AND b = :b",
        &[("a", Value::Int(1))],
    );
    assert_eq!(result.unwrap_err(), RenderError::MissingBinding("b".into()));
}

#[test]
fn unterminated_block_reports_position() {
    let err = Template::parse("SELECT * @where{ AND a = :a").unwrap_err();
    match err {
        ParseError::Template { position, .. } => assert!(position >= 9),
        other => panic!("expected template error, got {other}"),
    }
}

#[test]
fn bad_expression_reports_position_in_the_template() {
    let err = Template::parse("SELECT * @if(:a ==){ x }").unwrap_err();
    assert!(matches!(err, ParseError::Expr { .. }));
}

#[test]
fn unterminated_string_in_expression_is_an_error() {
    let err = Template::parse("@if(:a == 'oops){ x }").unwrap_err();
    assert!(matches!(err, ParseError::Template { .. } | ParseError::Expr { .. }));
}

#[test]
fn deeply_nested_directives_render_inside_out() {
    let out = render(
        "@where{ @if(:a){ AND (x = :a @for(y : :ys){ OR y = :y}) } }",
        &[("a", Value::Int(1)), ("ys", Value::from(vec![2i64]))],
    )
    .unwrap();
    assert_eq!(out.sql, "WHERE (x = ? OR y = ?)");
    assert_eq!(out.sql.matches('?').count(), out.binds.len());
}
