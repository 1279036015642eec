//! The parsed template tree and the embedded expression language.
//!
//! Both trees are immutable once built and safe to share across concurrent
//! render calls; a parse happens once, renders happen many times.

/// Binary operators of the embedded expression language, lowest precedence
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Literal values an expression can carry directly.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprLiteral {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

/// One step of a dotted path: `name` or `name()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    pub is_call: bool,
}

impl PathSegment {
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_call: false,
        }
    }

    pub fn call(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_call: true,
        }
    }
}

/// An expression of the template language.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateExpr {
    Literal(ExprLiteral),
    /// Dotted reference, root segment first. The root is looked up in the
    /// active context (loop locals shadow outer bindings).
    Path(Vec<PathSegment>),
    Not(Box<TemplateExpr>),
    Binary {
        op: BinOp,
        left: Box<TemplateExpr>,
        right: Box<TemplateExpr>,
    },
}

impl TemplateExpr {
    /// A single-segment path, the common `:name` case.
    pub fn name(root: impl Into<String>) -> Self {
        Self::Path(vec![PathSegment::field(root)])
    }

    /// The root binding name if this expression is a path.
    pub fn root(&self) -> Option<&str> {
        match self {
            Self::Path(segments) => segments.first().map(|s| s.name.as_str()),
            _ => None,
        }
    }
}

/// One node of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// Literal SQL text, emitted verbatim.
    Text(String),
    /// `:expr` — a placeholder plus one bind.
    Param(TemplateExpr),
    /// `@if(cond){ body }`
    If {
        cond: TemplateExpr,
        body: Vec<TemplateNode>,
    },
    /// `@for(var : source){ body }`
    For {
        var: String,
        source: TemplateExpr,
        body: Vec<TemplateNode>,
    },
    /// `@where{ body }` / `@having{ body }` — keyword emitted only when the
    /// body renders non-blank, with one leading AND/OR stripped.
    Clause {
        keyword: &'static str,
        body: Vec<TemplateNode>,
    },
    /// `@or{ body }` — OR-prefixed predicate inside a group.
    Or(Vec<TemplateNode>),
    /// `@in(source)` — expands to `(?, ?, …)`.
    In(TemplateExpr),
    /// `@table(Entity)` — physical table name via the identifier resolver.
    Table(String),
    /// `@col(Entity::field)` — physical column name via the resolver.
    Column { entity: String, field: String },
    /// `@page(page, pageSize)` — dialect-rendered pagination.
    Page {
        page: TemplateExpr,
        page_size: TemplateExpr,
    },
    /// `@orderBy(selection, allowed = { key: fragment, … }, default = key)`
    OrderBy {
        selection: TemplateExpr,
        /// Whitelisted fragments in declaration order.
        allowed: Vec<(String, Vec<TemplateNode>)>,
        default: Option<String>,
    },
    /// `@fn.name(arg, …)` — dialect-rendered function call; each argument is
    /// a full node list of its own.
    Fn {
        name: String,
        args: Vec<Vec<TemplateNode>>,
    },
}
