//! Expression nodes of the statement tree.

use crate::value::Value;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

/// A SQL expression built programmatically.
///
/// `And`/`Or` take whole lists so callers can assemble predicates
/// incrementally; the renderer handles the degenerate sizes (empty groups
/// become the constants `1=1`/`1=0`, singletons lose their parens).
#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    True,
    False,
    And(Vec<SqlExpr>),
    Or(Vec<SqlExpr>),
    Not(Box<SqlExpr>),
    Compare {
        left: Box<SqlExpr>,
        op: CompareOp,
        right: Box<SqlExpr>,
    },
    In {
        left: Box<SqlExpr>,
        list: Vec<SqlExpr>,
    },
    Like {
        left: Box<SqlExpr>,
        pattern: Box<SqlExpr>,
    },
    Func {
        name: String,
        args: Vec<SqlExpr>,
    },
    /// Named parameter, looked up in the bindings map at render time.
    Param(String),
    /// Column reference, optionally qualified by a table alias. The name is
    /// dot-split and each segment quoted independently.
    Column {
        table: Option<String>,
        name: String,
    },
    /// A literal value. Always rendered as a placeholder plus bind, never
    /// inlined into the SQL text.
    Literal(Value),
    /// Verbatim SQL. The caller vouches for its safety.
    RawSql(String),
}

impl SqlExpr {
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column {
            table: None,
            name: name.into(),
        }
    }

    pub fn qualified_column(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Column {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    pub fn param(name: impl Into<String>) -> Self {
        Self::Param(name.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Self::RawSql(sql.into())
    }

    pub fn func(name: impl Into<String>, args: Vec<SqlExpr>) -> Self {
        Self::Func {
            name: name.into(),
            args,
        }
    }

    pub fn and(items: Vec<SqlExpr>) -> Self {
        Self::And(items)
    }

    pub fn or(items: Vec<SqlExpr>) -> Self {
        Self::Or(items)
    }

    pub fn not(expr: SqlExpr) -> Self {
        Self::Not(Box::new(expr))
    }

    fn compare(self, op: CompareOp, other: SqlExpr) -> Self {
        Self::Compare {
            left: Box::new(self),
            op,
            right: Box::new(other),
        }
    }

    pub fn eq(self, other: SqlExpr) -> Self {
        self.compare(CompareOp::Eq, other)
    }

    pub fn ne(self, other: SqlExpr) -> Self {
        self.compare(CompareOp::Ne, other)
    }

    pub fn gt(self, other: SqlExpr) -> Self {
        self.compare(CompareOp::Gt, other)
    }

    pub fn ge(self, other: SqlExpr) -> Self {
        self.compare(CompareOp::Ge, other)
    }

    pub fn lt(self, other: SqlExpr) -> Self {
        self.compare(CompareOp::Lt, other)
    }

    pub fn le(self, other: SqlExpr) -> Self {
        self.compare(CompareOp::Le, other)
    }

    pub fn in_list(self, list: Vec<SqlExpr>) -> Self {
        Self::In {
            left: Box::new(self),
            list,
        }
    }

    pub fn like(self, pattern: SqlExpr) -> Self {
        Self::Like {
            left: Box::new(self),
            pattern: Box::new(pattern),
        }
    }
}
