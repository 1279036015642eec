//! End-to-end template rendering: parse, then render against bindings.

use std::collections::HashMap;

use sqlweave::{
    AnsiDialect, Bind, EmptyInStrategy, MapResolver, RenderContext, RenderError, RenderedSql,
    Template, Value,
};

fn bindings(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn resolver() -> MapResolver {
    MapResolver::new()
        .table("Order", "orders")
        .column("Order", "id", "id")
        .column("Order", "status", "status")
}

fn render(template: &str, pairs: &[(&str, Value)]) -> Result<RenderedSql, RenderError> {
    render_with_strategy(template, pairs, EmptyInStrategy::Null)
}

fn render_with_strategy(
    template: &str,
    pairs: &[(&str, Value)],
    strategy: EmptyInStrategy,
) -> Result<RenderedSql, RenderError> {
    let template = Template::parse(template).expect("template should parse");
    let bindings = bindings(pairs);
    let dialect = AnsiDialect;
    let resolver = resolver();
    let ctx = RenderContext::new(&bindings, &dialect, &resolver).with_empty_in(strategy);
    template.render(&ctx)
}

fn str_binds(values: &[&str]) -> Vec<Bind> {
    values
        .iter()
        .map(|v| Bind::Value(Value::string(*v)))
        .collect()
}

#[test]
fn logical_names_resolve_to_physical_identifiers() {
    let out = render(
        "SELECT @col(Order::id) FROM @table(Order) o WHERE o.@col(Order::status) = :status",
        &[("status", Value::string("PAID"))],
    )
    .unwrap();
    assert_eq!(out.sql, "SELECT id FROM orders o WHERE o.status = ?");
    assert_eq!(out.binds, str_binds(&["PAID"]));
}

#[test]
fn where_clause_strips_leading_conjunction() {
    let out = render(
        "@where{ @if(!:includeDeleted){ AND deleted_at IS NULL } @if(:statuses){ AND status IN @in(:statuses) } }",
        &[
            ("includeDeleted", Value::Bool(false)),
            ("statuses", Value::from(vec!["PAID", "NEW"])),
        ],
    )
    .unwrap();
    assert_eq!(out.sql, "WHERE deleted_at IS NULL AND status IN (?, ?)");
    assert_eq!(out.binds, str_binds(&["PAID", "NEW"]));
}

#[test]
fn where_clause_vanishes_when_body_is_blank() {
    let out = render(
        "SELECT * FROM t @where{ @if(:a){ AND a = :a } } ORDER BY id",
        &[("a", Value::Null)],
    )
    .unwrap();
    assert_eq!(out.sql, "SELECT * FROM t ORDER BY id");
    assert!(out.binds.is_empty());
}

#[test]
fn or_groups_inside_a_loop() {
    let out = render(
        "@where{ @for(tag : :tags){ @or{ tag = :tag } } }",
        &[("tags", Value::from(vec!["a", "b"]))],
    )
    .unwrap();
    assert_eq!(out.sql, "WHERE tag = ? OR tag = ?");
    assert_eq!(out.binds, str_binds(&["a", "b"]));
}

#[test]
fn in_list_expands_one_placeholder_per_item() {
    let out = render(
        "WHERE id IN @in(:ids)",
        &[("ids", Value::from(vec![1i64, 2, 3]))],
    )
    .unwrap();
    assert_eq!(out.sql, "WHERE id IN (?, ?, ?)");
    assert_eq!(
        out.binds,
        vec![
            Bind::Value(Value::Int(1)),
            Bind::Value(Value::Int(2)),
            Bind::Value(Value::Int(3)),
        ]
    );
}

#[test]
fn empty_in_null_strategy_emits_null_group() {
    let out = render("WHERE id IN @in(:ids)", &[("ids", Value::List(vec![]))]).unwrap();
    assert_eq!(out.sql, "WHERE id IN (NULL)");
    assert!(out.binds.is_empty());
}

#[test]
fn empty_in_error_strategy_fails() {
    let err = render_with_strategy(
        "WHERE id IN @in(:ids)",
        &[("ids", Value::List(vec![]))],
        EmptyInStrategy::Error,
    )
    .unwrap_err();
    assert_eq!(err, RenderError::EmptyInList);
}

#[test]
fn empty_in_false_strategy_rewrites_the_predicate() {
    let out = render_with_strategy(
        "SELECT * FROM t WHERE id IN @in(:ids)",
        &[("ids", Value::List(vec![]))],
        EmptyInStrategy::False,
    )
    .unwrap();
    assert_eq!(out.sql, "SELECT * FROM t WHERE 1=0");
    assert!(out.binds.is_empty());
}

#[test]
fn false_strategy_preserves_preceding_predicates() {
    let out = render_with_strategy(
        "WHERE a = :a AND id IN @in(:ids)",
        &[("a", Value::Int(1)), ("ids", Value::List(vec![]))],
        EmptyInStrategy::False,
    )
    .unwrap();
    assert_eq!(out.sql, "WHERE a = ? AND 1=0");
    assert_eq!(out.binds, vec![Bind::Value(Value::Int(1))]);
}

#[test]
fn false_strategy_drops_binds_cut_by_the_rewrite() {
    // The truncated predicate already held a placeholder; its bind must go
    // with it or the placeholder/bind alignment breaks.
    let out = render_with_strategy(
        "WHERE coalesce(col, :def) IN @in(:ids)",
        &[("def", Value::Int(0)), ("ids", Value::List(vec![]))],
        EmptyInStrategy::False,
    )
    .unwrap();
    assert_eq!(out.sql, "WHERE coalesce(1=0");
    assert!(out.binds.is_empty());
    assert_eq!(out.sql.matches('?').count(), out.binds.len());
}

#[test]
fn false_strategy_respects_paren_groups() {
    let out = render_with_strategy(
        "WHERE (id IN @in(:ids) OR b = :b)",
        &[("ids", Value::List(vec![])), ("b", Value::Int(2))],
        EmptyInStrategy::False,
    )
    .unwrap();
    assert_eq!(out.sql, "WHERE (1=0 OR b = ?)");
    assert_eq!(out.binds, vec![Bind::Value(Value::Int(2))]);
}

#[test]
fn order_by_whitelist_and_default() {
    let template = r#"@orderBy(:sort, allowed = { ID_ASC: "id ASC", CREATED_DESC: "created_at DESC" }, default = CREATED_DESC)"#;

    let out = render(template, &[("sort", Value::Null)]).unwrap();
    assert_eq!(out.sql, "ORDER BY created_at DESC");

    let out = render(template, &[("sort", Value::string("ID_ASC"))]).unwrap();
    assert_eq!(out.sql, "ORDER BY id ASC");

    let err = render(template, &[("sort", Value::string("BAD"))]).unwrap_err();
    assert_eq!(err, RenderError::OrderBySelectionNotAllowed("BAD".into()));
}

#[test]
fn order_by_accepts_multiple_keys() {
    let template = r#"@orderBy(:sort, allowed = { A: "a", B: "b" })"#;
    let out = render(
        template,
        &[("sort", Value::from(vec!["B desc", "A"]))],
    )
    .unwrap();
    assert_eq!(out.sql, "ORDER BY b DESC, a");
}

#[test]
fn pagination_delegates_to_the_dialect() {
    let out = render(
        "SELECT * FROM t @page(:page, :size)",
        &[("page", Value::Int(2)), ("size", Value::Int(10))],
    )
    .unwrap();
    assert_eq!(out.sql, "SELECT * FROM t LIMIT ? OFFSET ?");
    assert_eq!(
        out.binds,
        vec![Bind::Value(Value::Int(10)), Bind::Value(Value::Int(10))]
    );
}

#[test]
fn function_directive_splices_dialect_output() {
    let out = render(
        "SELECT @fn.coalesce(:name, 'anonymous') FROM users",
        &[("name", Value::string("ada"))],
    )
    .unwrap();
    assert_eq!(out.sql, "SELECT coalesce(?, 'anonymous') FROM users");
    assert_eq!(out.binds, str_binds(&["ada"]));
}

#[test]
fn loop_locals_resolve_nested_paths() {
    let mut a = HashMap::new();
    a.insert("name".to_string(), Value::string("x"));
    let mut b = HashMap::new();
    b.insert("name".to_string(), Value::string("y"));
    let out = render(
        "@where{ @for(f : :filters){ @or{ name = :f.name } } }",
        &[("filters", Value::List(vec![Value::Map(a), Value::Map(b)]))],
    )
    .unwrap();
    assert_eq!(out.sql, "WHERE name = ? OR name = ?");
    assert_eq!(out.binds, str_binds(&["x", "y"]));
}

#[test]
fn nested_loops_shadow_independently() {
    let group = |name: &str, tags: Vec<i64>| {
        let mut m = HashMap::new();
        m.insert("name".to_string(), Value::string(name));
        m.insert("tags".to_string(), Value::from(tags));
        Value::Map(m)
    };
    let out = render(
        "@where{ @for(g : :groups){ @or{ (name = :g.name@for(t : g.tags){ OR tag = :t}) } } }",
        &[(
            "groups",
            Value::List(vec![group("n1", vec![1, 2]), group("n2", vec![])]),
        )],
    )
    .unwrap();
    assert_eq!(
        out.sql,
        "WHERE (name = ? OR tag = ? OR tag = ?) OR (name = ?)"
    );
    assert_eq!(
        out.binds,
        vec![
            Bind::Value(Value::string("n1")),
            Bind::Value(Value::Int(1)),
            Bind::Value(Value::Int(2)),
            Bind::Value(Value::string("n2")),
        ]
    );
}

#[test]
fn null_loop_source_iterates_zero_times() {
    let out = render(
        "SELECT 1 @for(x : :missing_list){ , :x }",
        &[("missing_list", Value::Null)],
    )
    .unwrap();
    assert_eq!(out.sql.trim_end(), "SELECT 1");
    assert!(out.binds.is_empty());
}

#[test]
fn placeholder_count_always_matches_binds() {
    let out = render(
        "@where{ @if(:a){ AND a = :a } AND b IN @in(:bs) } @page(:p, :n)",
        &[
            ("a", Value::Int(1)),
            ("bs", Value::from(vec![2i64, 3])),
            ("p", Value::Int(1)),
            ("n", Value::Int(5)),
        ],
    )
    .unwrap();
    assert_eq!(out.sql.matches('?').count(), out.binds.len());
}

#[test]
fn null_bind_folds_into_bind_null() {
    let out = render(
        "UPDATE t SET note = :note WHERE id = :id",
        &[("note", Value::Null), ("id", Value::Int(1))],
    )
    .unwrap();
    assert_eq!(out.binds, vec![Bind::Null, Bind::Value(Value::Int(1))]);
}

#[test]
fn analysis_reports_required_bindings() {
    let template = Template::parse(
        "@where{ @if(:status){ AND status = :status } @for(t : :tags){ @or{ tag = :t } } }",
    )
    .unwrap();
    let analysis = template.analyze();
    let names: Vec<&str> = analysis
        .required_bindings
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(names, vec!["status", "tags"]);
    assert!(!analysis.order_by_has_params);
}
