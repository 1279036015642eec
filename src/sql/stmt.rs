//! Statement nodes: SELECT, INSERT, UPDATE, DELETE.

use super::expr::SqlExpr;

/// Top-level statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Select(SelectStmt),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
}

/// A table name with an optional alias. The name may be schema-qualified
/// with dots; each segment is quoted independently when rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }
}

/// One SELECT output item.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Expr {
        expr: SqlExpr,
        alias: Option<String>,
    },
    Star,
}

impl SelectItem {
    pub fn expr(expr: SqlExpr) -> Self {
        Self::Expr { expr, alias: None }
    }

    pub fn expr_as(expr: SqlExpr, alias: impl Into<String>) -> Self {
        Self::Expr {
            expr,
            alias: Some(alias.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Inner => "JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: SqlExpr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: SqlExpr,
    pub direction: Option<SortDirection>,
}

impl OrderItem {
    pub fn new(expr: SqlExpr) -> Self {
        Self {
            expr,
            direction: None,
        }
    }

    pub fn asc(expr: SqlExpr) -> Self {
        Self {
            expr,
            direction: Some(SortDirection::Asc),
        }
    }

    pub fn desc(expr: SqlExpr) -> Self {
        Self {
            expr,
            direction: Some(SortDirection::Desc),
        }
    }
}

/// 1-based page selection, delegated to the dialect when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: i64,
    pub page_size: i64,
}

/// SELECT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    pub items: Vec<SelectItem>,
    pub from: TableRef,
    pub joins: Vec<Join>,
    pub where_clause: Option<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    pub having: Option<SqlExpr>,
    pub order_by: Vec<OrderItem>,
    pub paging: Option<Paging>,
}

impl SelectStmt {
    pub fn new(from: TableRef) -> Self {
        Self {
            items: vec![SelectItem::Star],
            from,
            joins: Vec::new(),
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            paging: None,
        }
    }

    pub fn with_items(mut self, items: Vec<SelectItem>) -> Self {
        self.items = items;
        self
    }

    pub fn with_where(mut self, expr: SqlExpr) -> Self {
        self.where_clause = Some(expr);
        self
    }

    pub fn with_group_by(mut self, exprs: Vec<SqlExpr>) -> Self {
        self.group_by = exprs;
        self
    }

    pub fn with_having(mut self, expr: SqlExpr) -> Self {
        self.having = Some(expr);
        self
    }

    pub fn with_order_by(mut self, items: Vec<OrderItem>) -> Self {
        self.order_by = items;
        self
    }

    pub fn with_paging(mut self, page: i64, page_size: i64) -> Self {
        self.paging = Some(Paging { page, page_size });
        self
    }

    pub fn join(mut self, table: TableRef, on: SqlExpr) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Inner,
            table,
            on,
        });
        self
    }

    pub fn left_join(mut self, table: TableRef, on: SqlExpr) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Left,
            table,
            on,
        });
        self
    }

    pub fn right_join(mut self, table: TableRef, on: SqlExpr) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Right,
            table,
            on,
        });
        self
    }
}

/// INSERT statement: multi-row VALUES form.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlExpr>>,
}

impl InsertStmt {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, values: Vec<SqlExpr>) -> Self {
        self.rows.push(values);
        self
    }
}

/// UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStmt {
    pub table: String,
    pub assignments: Vec<(String, SqlExpr)>,
    pub where_clause: Option<SqlExpr>,
}

impl UpdateStmt {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            where_clause: None,
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: SqlExpr) -> Self {
        self.assignments.push((column.into(), value));
        self
    }

    pub fn with_where(mut self, expr: SqlExpr) -> Self {
        self.where_clause = Some(expr);
        self
    }
}

/// DELETE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStmt {
    pub table: String,
    pub where_clause: Option<SqlExpr>,
}

impl DeleteStmt {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            where_clause: None,
        }
    }

    pub fn with_where(mut self, expr: SqlExpr) -> Self {
        self.where_clause = Some(expr);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_builder_shape() {
        let stmt = SelectStmt::new(TableRef::aliased("orders", "o"))
            .with_items(vec![SelectItem::expr(SqlExpr::qualified_column("o", "id"))])
            .left_join(
                TableRef::aliased("users", "u"),
                SqlExpr::qualified_column("u", "id")
                    .eq(SqlExpr::qualified_column("o", "user_id")),
            )
            .with_where(SqlExpr::column("status").eq(SqlExpr::param("status")))
            .with_paging(1, 50);

        assert_eq!(stmt.joins.len(), 1);
        assert_eq!(stmt.joins[0].kind, JoinKind::Left);
        assert!(stmt.where_clause.is_some());
        assert_eq!(stmt.paging, Some(Paging { page: 1, page_size: 50 }));
    }

    #[test]
    fn insert_builder_accumulates_rows() {
        let stmt = InsertStmt::new("users", vec!["name".into(), "email".into()])
            .row(vec![SqlExpr::literal("a"), SqlExpr::literal("a@x")])
            .row(vec![SqlExpr::literal("b"), SqlExpr::literal("b@x")]);
        assert_eq!(stmt.rows.len(), 2);
    }
}
