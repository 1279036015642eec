//! The template renderer: walks a node tree with a context, producing SQL
//! text and an ordered bind list.
//!
//! All safety rules live here: leading-conjunction stripping for clauses,
//! OR-prefix suppression at group starts, empty-IN handling, the
//! identifier-position guard, and the order-by whitelist. Rendering is
//! atomic — any error aborts before a result is returned.

use crate::ast::{TemplateExpr, TemplateNode};
use crate::context::{EmptyInStrategy, RenderContext};
use crate::error::RenderError;
use crate::eval::evaluate;
use crate::value::{Bind, RenderedSql, Value};

/// Keywords after which a bind placeholder would stand in for an identifier.
const IDENT_KEYWORDS: &[&str] = &["FROM", "JOIN", "UPDATE", "INTO", "TABLE", "SET"];

/// Render a node list against a context.
pub fn render(nodes: &[TemplateNode], ctx: &RenderContext<'_>) -> Result<RenderedSql, RenderError> {
    let mut renderer = Renderer::default();
    renderer.render_nodes(nodes, ctx)?;
    Ok(RenderedSql {
        sql: renderer.sql,
        binds: renderer.binds,
    })
}

#[derive(Default)]
struct Renderer {
    sql: String,
    binds: Vec<Bind>,
}

impl Renderer {
    fn render_nodes(
        &mut self,
        nodes: &[TemplateNode],
        ctx: &RenderContext<'_>,
    ) -> Result<(), RenderError> {
        for node in nodes {
            self.render_node(node, ctx)?;
        }
        Ok(())
    }

    fn render_node(
        &mut self,
        node: &TemplateNode,
        ctx: &RenderContext<'_>,
    ) -> Result<(), RenderError> {
        match node {
            TemplateNode::Text(text) => {
                self.push_text(text);
            }
            TemplateNode::Param(expr) => {
                let value = evaluate(expr, ctx)?;
                self.guard_identifier_position()?;
                self.sql.push('?');
                self.binds.push(Bind::from_value(value));
            }
            TemplateNode::If { cond, body } => {
                if evaluate(cond, ctx)?.is_truthy() {
                    self.render_nodes(body, ctx)?;
                }
            }
            TemplateNode::For { var, source, body } => {
                for item in iterate(evaluate(source, ctx)?)? {
                    let scoped = ctx.with_local(var.clone(), item);
                    self.render_nodes(body, &scoped)?;
                }
            }
            TemplateNode::Clause { keyword, body } => {
                let inner = render_isolated(body, ctx)?;
                let trimmed = inner.sql.trim();
                if !trimmed.is_empty() {
                    let stripped = strip_leading_conjunction(trimmed);
                    self.push_text(&format!("{keyword} {stripped}"));
                    self.binds.extend(inner.binds);
                }
            }
            TemplateNode::Or(body) => {
                let inner = render_isolated(body, ctx)?;
                let trimmed = inner.sql.trim();
                if !trimmed.is_empty() {
                    if or_prefix_wanted(&self.sql) {
                        self.push_text(&format!("OR {trimmed}"));
                    } else {
                        self.push_text(trimmed);
                    }
                    self.binds.extend(inner.binds);
                }
            }
            TemplateNode::In(source) => {
                let items = iterate(evaluate(source, ctx)?)?;
                self.render_in_list(items, ctx)?;
            }
            TemplateNode::Table(entity) => {
                let name = ctx
                    .resolver
                    .resolve_table(entity)
                    .ok_or_else(|| RenderError::UnknownEntity(entity.clone()))?;
                self.push_text(&name);
            }
            TemplateNode::Column { entity, field } => {
                let name = ctx.resolver.resolve_column(entity, field).ok_or_else(|| {
                    RenderError::UnknownColumn {
                        entity: entity.clone(),
                        field: field.clone(),
                    }
                })?;
                self.push_text(&name);
            }
            TemplateNode::Page { page, page_size } => {
                let page = int_value(evaluate(page, ctx)?)?;
                let page_size = int_value(evaluate(page_size, ctx)?)?;
                let fragment = ctx.dialect.render_pagination(page, page_size, &[]);
                if !fragment.sql.trim().is_empty() {
                    self.push_text(&fragment.sql);
                    self.binds.extend(fragment.binds);
                }
            }
            TemplateNode::OrderBy {
                selection,
                allowed,
                default,
            } => {
                self.render_order_by(selection, allowed, default.as_deref(), ctx)?;
            }
            TemplateNode::Fn { name, args } => {
                let rendered: Vec<RenderedSql> = args
                    .iter()
                    .map(|arg| render_isolated(arg, ctx))
                    .collect::<Result<_, _>>()?;
                let out = ctx.dialect.render_function(name, &rendered)?;
                self.push_text(&out.sql);
                self.binds.extend(out.binds);
            }
        }
        Ok(())
    }

    /// Append text, collapsing one leading whitespace character when the
    /// accumulator already ends in whitespace. Keeps fragment boundaries
    /// from doubling spaces without touching anything inside the text.
    fn push_text(&mut self, text: &str) {
        let text = if ends_in_whitespace(&self.sql) {
            match text.chars().next() {
                Some(c) if c.is_whitespace() => &text[c.len_utf8()..],
                _ => text,
            }
        } else {
            text
        };
        self.sql.push_str(text);
    }

    /// Refuse to emit a placeholder where SQL grammar expects an identifier:
    /// right after a dot, a quote, an open bracket, a table-position keyword,
    /// or `ORDER BY` / `GROUP BY`.
    fn guard_identifier_position(&self) -> Result<(), RenderError> {
        let before = self.sql.trim_end();
        if before.is_empty() {
            return Ok(());
        }
        if let Some(c) = before.chars().last() {
            if matches!(c, '.' | '"' | '\'' | '`' | '[') {
                return Err(RenderError::ParameterInIdentifierPosition(c.to_string()));
            }
        }
        let mut words = before
            .rsplit(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|w| !w.is_empty());
        let Some(last) = words.next() else {
            return Ok(());
        };
        if IDENT_KEYWORDS.iter().any(|k| last.eq_ignore_ascii_case(k)) {
            return Err(RenderError::ParameterInIdentifierPosition(last.to_string()));
        }
        if last.eq_ignore_ascii_case("BY") {
            if let Some(prev) = words.next() {
                if prev.eq_ignore_ascii_case("ORDER") || prev.eq_ignore_ascii_case("GROUP") {
                    return Err(RenderError::ParameterInIdentifierPosition(format!(
                        "{} BY",
                        prev.to_ascii_uppercase()
                    )));
                }
            }
        }
        Ok(())
    }

    fn render_in_list(
        &mut self,
        items: Vec<Value>,
        ctx: &RenderContext<'_>,
    ) -> Result<(), RenderError> {
        if !items.is_empty() {
            let mut list = String::with_capacity(items.len() * 3 + 2);
            list.push('(');
            for (i, item) in items.into_iter().enumerate() {
                if i > 0 {
                    list.push_str(", ");
                }
                list.push('?');
                self.binds.push(Bind::from_value(item));
            }
            list.push(')');
            self.push_text(&list);
            return Ok(());
        }
        match ctx.empty_in {
            EmptyInStrategy::Null => {
                self.push_text("(NULL)");
                Ok(())
            }
            EmptyInStrategy::Error => Err(RenderError::EmptyInList),
            EmptyInStrategy::False => {
                self.rewrite_predicate_to_false();
                Ok(())
            }
        }
    }

    /// Scan backward for the nearest predicate boundary (WHERE/AND/OR
    /// keyword or open paren), cut the dangling predicate text, and emit
    /// `1=0` in its place. Token-based on purpose, not a SQL parse.
    ///
    /// Placeholders cut away by the truncation take their binds with them,
    /// keeping the placeholder/bind counts aligned.
    fn rewrite_predicate_to_false(&mut self) {
        let mut boundary = 0usize;
        let mut word_start: Option<usize> = None;
        for (i, c) in self.sql.char_indices() {
            if c.is_alphanumeric() || c == '_' {
                word_start.get_or_insert(i);
                continue;
            }
            if let Some(start) = word_start.take() {
                if is_boundary_word(&self.sql[start..i]) {
                    boundary = i;
                }
            }
            if c == '(' {
                boundary = i + 1;
            }
        }
        if let Some(start) = word_start {
            if is_boundary_word(&self.sql[start..]) {
                boundary = self.sql.len();
            }
        }
        let dropped = self.sql[boundary..].matches('?').count();
        self.sql.truncate(boundary);
        self.binds.truncate(self.binds.len().saturating_sub(dropped));
        if self.sql.is_empty() || self.sql.ends_with('(') {
            self.sql.push_str("1=0");
        } else {
            self.push_text(" 1=0");
        }
    }

    fn render_order_by(
        &mut self,
        selection: &TemplateExpr,
        allowed: &[(String, Vec<TemplateNode>)],
        default: Option<&str>,
        ctx: &RenderContext<'_>,
    ) -> Result<(), RenderError> {
        let selected = normalize_selection(evaluate(selection, ctx)?)?;
        let selected = if selected.is_empty() {
            match default {
                Some(key) => vec![(key.to_string(), None)],
                None => return Ok(()),
            }
        } else {
            selected
        };

        let mut fragments = Vec::with_capacity(selected.len());
        for (key, direction) in selected {
            let body = allowed
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, body)| body)
                .ok_or_else(|| RenderError::OrderBySelectionNotAllowed(key.clone()))?;
            let rendered = render_isolated(body, ctx)?;
            if !rendered.binds.is_empty() {
                return Err(RenderError::OrderByFragmentHasParams(key));
            }
            let mut fragment = rendered.sql.trim().to_string();
            if let Some(direction) = direction {
                if !has_direction_suffix(&fragment) {
                    fragment.push(' ');
                    fragment.push_str(direction);
                }
            }
            fragments.push(fragment);
        }
        self.push_text(&format!("ORDER BY {}", fragments.join(", ")));
        Ok(())
    }
}

fn render_isolated(
    nodes: &[TemplateNode],
    ctx: &RenderContext<'_>,
) -> Result<RenderedSql, RenderError> {
    render(nodes, ctx)
}

fn ends_in_whitespace(s: &str) -> bool {
    s.chars().last().is_some_and(|c| c.is_whitespace())
}

fn iterate(value: Value) -> Result<Vec<Value>, RenderError> {
    match value {
        Value::List(items) => Ok(items),
        // A null source iterates zero times rather than failing; absent
        // optional inputs then simply contribute nothing.
        Value::Null => Ok(Vec::new()),
        other => Err(RenderError::NotIterable(other.kind())),
    }
}

fn int_value(value: Value) -> Result<i64, RenderError> {
    match value {
        Value::Int(n) => Ok(n),
        other => Err(RenderError::NotANumber(other.kind())),
    }
}

/// Strip one leading AND/OR token (case-insensitive, whole word).
fn strip_leading_conjunction(s: &str) -> &str {
    for conj in ["AND", "OR"] {
        let Some(prefix) = s.get(..conj.len()) else {
            continue;
        };
        if prefix.eq_ignore_ascii_case(conj) {
            let rest = &s[conj.len()..];
            if rest.is_empty() {
                return "";
            }
            if rest.starts_with(|c: char| c.is_whitespace()) {
                return rest.trim_start();
            }
        }
    }
    s
}

/// A leading `OR ` is wanted unless the group is the first predicate: the
/// accumulator (ignoring trailing whitespace) ends at start-of-text, an open
/// paren, or an AND/OR/WHERE keyword.
fn or_prefix_wanted(sql: &str) -> bool {
    let before = sql.trim_end();
    if before.is_empty() || before.ends_with('(') {
        return false;
    }
    let last = before
        .rsplit(|c: char| !c.is_alphanumeric() && c != '_')
        .find(|w| !w.is_empty());
    !matches!(last, Some(w) if w.eq_ignore_ascii_case("AND")
        || w.eq_ignore_ascii_case("OR")
        || w.eq_ignore_ascii_case("WHERE"))
}

fn is_boundary_word(word: &str) -> bool {
    word.eq_ignore_ascii_case("WHERE")
        || word.eq_ignore_ascii_case("AND")
        || word.eq_ignore_ascii_case("OR")
}

/// Normalize an order-by selection to `(key, direction)` pairs.
///
/// A selection is a single key string, optionally carrying a trailing
/// direction (`"ID_ASC desc"`), or a sequence of such strings. Null and
/// empty selections normalize to nothing, which falls back to the default.
fn normalize_selection(value: Value) -> Result<Vec<(String, Option<&'static str>)>, RenderError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Str(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::Str(s) => Ok(vec![parse_selection_item(&s)]),
        Value::List(items) => {
            let mut keys = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Str(s) if !s.trim().is_empty() => keys.push(parse_selection_item(&s)),
                    Value::Null => {}
                    other => {
                        return Err(RenderError::OrderBySelectionNotAllowed(
                            other.kind().to_string(),
                        ))
                    }
                }
            }
            Ok(keys)
        }
        other => Err(RenderError::OrderBySelectionNotAllowed(
            other.kind().to_string(),
        )),
    }
}

fn parse_selection_item(s: &str) -> (String, Option<&'static str>) {
    let mut parts = s.split_whitespace();
    let key = parts.next().unwrap_or_default().to_string();
    let direction = match parts.next() {
        Some(d) if d.eq_ignore_ascii_case("asc") => Some("ASC"),
        Some(d) if d.eq_ignore_ascii_case("desc") => Some("DESC"),
        _ => None,
    };
    (key, direction)
}

fn has_direction_suffix(fragment: &str) -> bool {
    let upper = fragment.to_ascii_uppercase();
    upper.ends_with(" ASC") || upper.ends_with(" DESC")
}
