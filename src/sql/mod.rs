//! The builder-style statement tree.
//!
//! This is the programmatic counterpart of the template path: queries are
//! assembled from immutable value objects through fluent constructors and
//! rendered through the same [`crate::Dialect`] abstraction and the same
//! output contract (`?` placeholders, ordered binds).

mod expr;
mod render;
mod stmt;

pub use expr::{CompareOp, SqlExpr};
pub use render::render_stmt;
pub use stmt::{
    DeleteStmt, InsertStmt, Join, JoinKind, OrderItem, Paging, SelectItem, SelectStmt,
    SortDirection, Stmt, TableRef, UpdateStmt,
};
