//! Rendering of statement trees to canonical SQL.

use std::collections::HashMap;

use super::expr::SqlExpr;
use super::stmt::{
    DeleteStmt, InsertStmt, OrderItem, SelectItem, SelectStmt, Stmt, TableRef, UpdateStmt,
};
use crate::dialect::Dialect;
use crate::error::RenderError;
use crate::value::{Bind, RenderedSql, Value};

/// Render a statement against a dialect and a named-bindings map.
pub fn render_stmt(
    stmt: &Stmt,
    dialect: &dyn Dialect,
    bindings: &HashMap<String, Value>,
) -> Result<RenderedSql, RenderError> {
    let mut renderer = StmtRenderer {
        dialect,
        bindings,
        sql: String::with_capacity(128),
        binds: Vec::new(),
    };
    match stmt {
        Stmt::Select(s) => renderer.render_select(s)?,
        Stmt::Insert(s) => renderer.render_insert(s)?,
        Stmt::Update(s) => renderer.render_update(s)?,
        Stmt::Delete(s) => renderer.render_delete(s)?,
    }
    Ok(RenderedSql {
        sql: renderer.sql,
        binds: renderer.binds,
    })
}

struct StmtRenderer<'a> {
    dialect: &'a dyn Dialect,
    bindings: &'a HashMap<String, Value>,
    sql: String,
    binds: Vec<Bind>,
}

impl StmtRenderer<'_> {
    fn write(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn render_select(&mut self, stmt: &SelectStmt) -> Result<(), RenderError> {
        self.write("SELECT ");
        for (i, item) in stmt.items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            match item {
                SelectItem::Star => self.write("*"),
                SelectItem::Expr { expr, alias } => {
                    self.render_expr(expr)?;
                    if let Some(alias) = alias {
                        let quoted = self.dialect.quote_ident(alias);
                        self.write(" AS ");
                        self.write(&quoted);
                    }
                }
            }
        }

        self.write(" FROM ");
        self.render_table(&stmt.from);

        for join in &stmt.joins {
            self.write(" ");
            self.write(join.kind.as_sql());
            self.write(" ");
            self.render_table(&join.table);
            self.write(" ON ");
            self.render_expr(&join.on)?;
        }

        if let Some(where_clause) = &stmt.where_clause {
            self.write(" WHERE ");
            self.render_expr(where_clause)?;
        }

        if !stmt.group_by.is_empty() {
            self.write(" GROUP BY ");
            for (i, expr) in stmt.group_by.iter().enumerate() {
                if i > 0 {
                    self.write(", ");
                }
                self.render_expr(expr)?;
            }
        }

        if let Some(having) = &stmt.having {
            self.write(" HAVING ");
            self.render_expr(having)?;
        }

        let order_fragments = self.render_order_by(&stmt.order_by)?;

        if let Some(paging) = &stmt.paging {
            let fragment =
                self.dialect
                    .render_pagination(paging.page, paging.page_size, &order_fragments);
            if !fragment.sql.is_empty() {
                self.write(" ");
                self.write(&fragment.sql);
                self.binds.extend(fragment.binds);
            }
        }
        Ok(())
    }

    /// Render ORDER BY into the output and also hand the fragments back for
    /// dialects whose pagination syntax needs them.
    fn render_order_by(&mut self, items: &[OrderItem]) -> Result<Vec<String>, RenderError> {
        let mut fragments = Vec::with_capacity(items.len());
        for item in items {
            let mut sub = StmtRenderer {
                dialect: self.dialect,
                bindings: self.bindings,
                sql: String::new(),
                binds: Vec::new(),
            };
            sub.render_expr(&item.expr)?;
            let mut fragment = sub.sql;
            self.binds.extend(sub.binds);
            if let Some(direction) = item.direction {
                fragment.push(' ');
                fragment.push_str(direction.as_sql());
            }
            fragments.push(fragment);
        }
        if !fragments.is_empty() {
            self.write(" ORDER BY ");
            self.write(&fragments.join(", "));
        }
        Ok(fragments)
    }

    fn render_insert(&mut self, stmt: &InsertStmt) -> Result<(), RenderError> {
        self.write("INSERT INTO ");
        let table = self.quote_dotted(&stmt.table);
        self.write(&table);
        self.write(" (");
        for (i, column) in stmt.columns.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            let quoted = self.dialect.quote_ident(column);
            self.write(&quoted);
        }
        self.write(") VALUES ");
        for (i, row) in stmt.rows.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write("(");
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    self.write(", ");
                }
                self.render_expr(value)?;
            }
            self.write(")");
        }
        Ok(())
    }

    fn render_update(&mut self, stmt: &UpdateStmt) -> Result<(), RenderError> {
        self.write("UPDATE ");
        let table = self.quote_dotted(&stmt.table);
        self.write(&table);
        self.write(" SET ");
        for (i, (column, value)) in stmt.assignments.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            let quoted = self.dialect.quote_ident(column);
            self.write(&quoted);
            self.write(" = ");
            self.render_expr(value)?;
        }
        if let Some(where_clause) = &stmt.where_clause {
            self.write(" WHERE ");
            self.render_expr(where_clause)?;
        }
        Ok(())
    }

    fn render_delete(&mut self, stmt: &DeleteStmt) -> Result<(), RenderError> {
        self.write("DELETE FROM ");
        let table = self.quote_dotted(&stmt.table);
        self.write(&table);
        if let Some(where_clause) = &stmt.where_clause {
            self.write(" WHERE ");
            self.render_expr(where_clause)?;
        }
        Ok(())
    }

    fn render_table(&mut self, table: &TableRef) {
        let name = self.quote_dotted(&table.name);
        self.write(&name);
        if let Some(alias) = &table.alias {
            let quoted = self.dialect.quote_ident(alias);
            self.write(" ");
            self.write(&quoted);
        }
    }

    /// Dot-split an identifier and quote each segment independently, so
    /// `public.orders` becomes `"public"."orders"`.
    fn quote_dotted(&self, name: &str) -> String {
        name.split('.')
            .map(|segment| self.dialect.quote_ident(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn render_expr(&mut self, expr: &SqlExpr) -> Result<(), RenderError> {
        match expr {
            SqlExpr::True => self.write("1=1"),
            SqlExpr::False => self.write("1=0"),
            SqlExpr::And(items) => self.render_group(items, " AND ", "1=1")?,
            SqlExpr::Or(items) => self.render_group(items, " OR ", "1=0")?,
            SqlExpr::Not(inner) => {
                self.write("NOT (");
                self.render_expr(inner)?;
                self.write(")");
            }
            SqlExpr::Compare { left, op, right } => {
                self.render_expr(left)?;
                self.write(" ");
                self.write(op.as_sql());
                self.write(" ");
                self.render_expr(right)?;
            }
            SqlExpr::In { left, list } => {
                // Zero alternatives can never match.
                if list.is_empty() {
                    self.write("1=0");
                } else {
                    self.render_expr(left)?;
                    self.write(" IN (");
                    for (i, item) in list.iter().enumerate() {
                        if i > 0 {
                            self.write(", ");
                        }
                        self.render_expr(item)?;
                    }
                    self.write(")");
                }
            }
            SqlExpr::Like { left, pattern } => {
                self.render_expr(left)?;
                self.write(" LIKE ");
                self.render_expr(pattern)?;
            }
            SqlExpr::Func { name, args } => {
                let mut rendered = Vec::with_capacity(args.len());
                for arg in args {
                    let mut sub = StmtRenderer {
                        dialect: self.dialect,
                        bindings: self.bindings,
                        sql: String::new(),
                        binds: Vec::new(),
                    };
                    sub.render_expr(arg)?;
                    rendered.push(RenderedSql {
                        sql: sub.sql,
                        binds: sub.binds,
                    });
                }
                let out = self.dialect.render_function(name, &rendered)?;
                self.write(&out.sql);
                self.binds.extend(out.binds);
            }
            SqlExpr::Param(name) => {
                let value = self
                    .bindings
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RenderError::MissingBinding(name.clone()))?;
                self.write("?");
                self.binds.push(Bind::from_value(value));
            }
            SqlExpr::Column { table, name } => {
                if let Some(table) = table {
                    let quoted = self.dialect.quote_ident(table);
                    self.write(&quoted);
                    self.write(".");
                }
                let quoted = self.quote_dotted(name);
                self.write(&quoted);
            }
            SqlExpr::Literal(value) => {
                // Literals never inline; injection safety over prettiness.
                self.write("?");
                self.binds.push(Bind::from_value(value.clone()));
            }
            SqlExpr::RawSql(fragment) => self.write(fragment),
        }
        Ok(())
    }

    /// Flatten a logical group: empty groups become their vacuous constant,
    /// singletons render bare, larger groups get parens.
    fn render_group(
        &mut self,
        items: &[SqlExpr],
        joiner: &str,
        vacuous: &str,
    ) -> Result<(), RenderError> {
        match items {
            [] => self.write(vacuous),
            [single] => self.render_expr(single)?,
            _ => {
                self.write("(");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.write(joiner);
                    }
                    self.render_expr(item)?;
                }
                self.write(")");
            }
        }
        Ok(())
    }
}
