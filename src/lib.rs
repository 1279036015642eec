//! sqlweave: a SQL templating and statement-building core.
//!
//! Two ways in, one way out. The template path parses a SQL string with
//! embedded `@` directives and `:name` parameters, then renders it against a
//! bindings map. The builder path assembles a statement tree
//! programmatically. Both produce a [`RenderedSql`]: SQL text with `?`
//! placeholders and the matching ordered bind list. User values never land in
//! the SQL text, only in the binds.
//!
//! ```
//! use std::collections::HashMap;
//! use sqlweave::{AnsiDialect, MapResolver, RenderContext, Template, Value};
//!
//! let template = Template::parse(
//!     "SELECT * FROM orders @where{ @if(:status){ AND status = :status } }",
//! )?;
//!
//! let mut bindings = HashMap::new();
//! bindings.insert("status".to_string(), Value::string("PAID"));
//! let dialect = AnsiDialect;
//! let resolver = MapResolver::new();
//! let ctx = RenderContext::new(&bindings, &dialect, &resolver);
//!
//! let out = template.render(&ctx)?;
//! assert_eq!(out.sql, "SELECT * FROM orders WHERE status = ?");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod analyze;
pub mod ast;
pub mod context;
pub mod dialect;
pub mod error;
pub mod eval;
pub mod sql;
pub mod value;

mod lexer;
mod parser;
mod render;

pub use analyze::{analyze, Analysis};
pub use ast::{BinOp, ExprLiteral, PathSegment, TemplateExpr, TemplateNode};
pub use context::{EmptyInStrategy, RenderContext};
pub use dialect::{AnsiDialect, Dialect, IdentifierResolver, MapResolver};
pub use error::{ParseError, RenderError};
pub use parser::{parse_expr, parse_template};
pub use render::render;
pub use value::{Bind, RenderedSql, Value, ValueResolver};

/// A parsed template, ready to analyze or render any number of times.
///
/// Parsing happens once; the node tree is immutable afterwards, so a
/// `Template` can be cached and shared across renders with different
/// bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<TemplateNode>,
}

impl Template {
    /// Parse template text into a node tree.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        Ok(Self {
            nodes: parse_template(input)?,
        })
    }

    /// Render against a context, producing SQL text and ordered binds.
    pub fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderedSql, RenderError> {
        render(&self.nodes, ctx)
    }

    /// Statically analyze the template without evaluating anything.
    pub fn analyze(&self) -> Analysis {
        analyze(&self.nodes)
    }

    /// The underlying node tree.
    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }
}
