//! Pluggable SQL-engine differences: identifier quoting, pagination syntax,
//! and function syntax. Callers supply one implementation per target engine.

use std::collections::HashMap;

use crate::error::RenderError;
use crate::value::{Bind, RenderedSql, Value};

/// Engine-specific SQL surface.
pub trait Dialect {
    /// Quote one identifier segment.
    fn quote_ident(&self, name: &str) -> String;

    /// Render a pagination tail for a 1-based `page` of `page_size` rows.
    ///
    /// `order_by` carries already-rendered sort fragments for engines whose
    /// pagination syntax requires an ORDER BY (e.g. OFFSET/FETCH); the ANSI
    /// form ignores it.
    fn render_pagination(&self, page: i64, page_size: i64, order_by: &[String]) -> RenderedSql;

    /// Render a function call from already-rendered arguments. The result's
    /// SQL and binds are spliced into the output as-is.
    fn render_function(
        &self,
        name: &str,
        args: &[RenderedSql],
    ) -> Result<RenderedSql, RenderError>;
}

/// Plain ANSI-flavored dialect: double-quoted identifiers, `LIMIT ? OFFSET ?`
/// pagination, `name(arg, …)` functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiDialect;

impl Dialect for AnsiDialect {
    fn quote_ident(&self, name: &str) -> String {
        // Double any embedded quote, then wrap.
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn render_pagination(&self, page: i64, page_size: i64, _order_by: &[String]) -> RenderedSql {
        let offset = (page.max(1) - 1).saturating_mul(page_size);
        RenderedSql::new(
            "LIMIT ? OFFSET ?",
            vec![
                Bind::Value(Value::Int(page_size)),
                Bind::Value(Value::Int(offset)),
            ],
        )
    }

    fn render_function(
        &self,
        name: &str,
        args: &[RenderedSql],
    ) -> Result<RenderedSql, RenderError> {
        let mut sql = String::with_capacity(name.len() + 2 + args.len() * 8);
        let mut binds = Vec::new();
        sql.push_str(name);
        sql.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(arg.sql.trim());
            binds.extend(arg.binds.iter().cloned());
        }
        sql.push(')');
        Ok(RenderedSql::new(sql, binds))
    }
}

/// Maps logical entity and field names to physical table and column names.
///
/// This is the seam to the excluded mapping layer; the core only consumes
/// the resolved physical names and emits them verbatim.
pub trait IdentifierResolver {
    fn resolve_table(&self, entity: &str) -> Option<String>;
    fn resolve_column(&self, entity: &str, field: &str) -> Option<String>;
}

/// HashMap-backed resolver, enough for tests and hosts with static mappings.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    tables: HashMap<String, String>,
    columns: HashMap<(String, String), String>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, entity: impl Into<String>, name: impl Into<String>) -> Self {
        self.tables.insert(entity.into(), name.into());
        self
    }

    pub fn column(
        mut self,
        entity: impl Into<String>,
        field: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.columns
            .insert((entity.into(), field.into()), name.into());
        self
    }
}

impl IdentifierResolver for MapResolver {
    fn resolve_table(&self, entity: &str) -> Option<String> {
        self.tables.get(entity).cloned()
    }

    fn resolve_column(&self, entity: &str, field: &str) -> Option<String> {
        self.columns
            .get(&(entity.to_string(), field.to_string()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ansi_quoting_doubles_embedded_quotes() {
        assert_eq!(AnsiDialect.quote_ident("users"), "\"users\"");
        assert_eq!(AnsiDialect.quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn ansi_pagination_is_limit_offset() {
        let out = AnsiDialect.render_pagination(3, 20, &[]);
        assert_eq!(out.sql, "LIMIT ? OFFSET ?");
        assert_eq!(
            out.binds,
            vec![Bind::Value(Value::Int(20)), Bind::Value(Value::Int(40))]
        );
    }

    #[test]
    fn pagination_clamps_page_to_one() {
        let out = AnsiDialect.render_pagination(0, 10, &[]);
        assert_eq!(
            out.binds,
            vec![Bind::Value(Value::Int(10)), Bind::Value(Value::Int(0))]
        );
    }

    #[test]
    fn function_rendering_keeps_bind_order() {
        let args = vec![
            RenderedSql::new("?", vec![Bind::Value(Value::Int(1))]),
            RenderedSql::fragment("'x'"),
            RenderedSql::new("?", vec![Bind::Value(Value::Int(2))]),
        ];
        let out = AnsiDialect.render_function("coalesce", &args).unwrap();
        assert_eq!(out.sql, "coalesce(?, 'x', ?)");
        assert_eq!(
            out.binds,
            vec![Bind::Value(Value::Int(1)), Bind::Value(Value::Int(2))]
        );
    }

    #[test]
    fn map_resolver_round_trip() {
        let resolver = MapResolver::new()
            .table("Order", "orders")
            .column("Order", "id", "id");
        assert_eq!(resolver.resolve_table("Order").as_deref(), Some("orders"));
        assert_eq!(
            resolver.resolve_column("Order", "id").as_deref(),
            Some("id")
        );
        assert_eq!(resolver.resolve_table("Nope"), None);
    }
}
