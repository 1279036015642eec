//! Error taxonomies for the two phases of the pipeline.
//!
//! Parse-time errors are deterministic functions of the input text and carry
//! a byte position. Render-time errors are distinct named conditions so a
//! caller can tell a bad template apart from bad runtime input. Nothing here
//! is retried or recovered internally; rendering either fully succeeds or
//! fails before returning any output.

use thiserror::Error;

/// Failure while parsing an expression or a template string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Malformed expression text (unexpected token, unterminated string,
    /// trailing garbage).
    #[error("expression syntax error at byte {position}: {message}")]
    Expr { position: usize, message: String },

    /// Malformed directive syntax in a template (unterminated block,
    /// invalid macro arguments).
    #[error("template syntax error at byte {position}: {message}")]
    Template { position: usize, message: String },
}

impl ParseError {
    pub(crate) fn expr(position: usize, message: impl Into<String>) -> Self {
        Self::Expr {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn template(position: usize, message: impl Into<String>) -> Self {
        Self::Template {
            position,
            message: message.into(),
        }
    }
}

/// Failure while rendering a template or a statement tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A path root or statement parameter was not supplied in the bindings.
    #[error("missing binding: {0}")]
    MissingBinding(String),

    /// A path segment could not be resolved on the value it was applied to.
    #[error("unknown property `{property}` on {value_kind} value")]
    UnknownProperty {
        property: String,
        value_kind: &'static str,
    },

    /// Two values of incompatible kinds were ordered against each other.
    #[error("cannot compare {left} with {right}")]
    NotComparable {
        left: &'static str,
        right: &'static str,
    },

    /// A `@for` or `@in` source did not evaluate to a sequence.
    #[error("expected a sequence, got {0}")]
    NotIterable(&'static str),

    /// A `@page` argument did not evaluate to an integer.
    #[error("expected an integer, got {0}")]
    NotANumber(&'static str),

    /// An `@in` list was empty and the strategy in force forbids that.
    #[error("IN list is empty")]
    EmptyInList,

    /// An order-by selection key is not in the whitelist.
    #[error("order-by selection `{0}` is not allowed")]
    OrderBySelectionNotAllowed(String),

    /// A whitelisted order-by fragment contained a bind placeholder.
    #[error("order-by fragment for `{0}` contains parameters")]
    OrderByFragmentHasParams(String),

    /// A parameter placeholder would land where SQL expects an identifier.
    #[error("parameter in identifier position after `{0}`")]
    ParameterInIdentifierPosition(String),

    /// `@table` named an entity the resolver does not know.
    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    /// `@col` named a field the resolver does not know.
    #[error("unknown column `{entity}::{field}`")]
    UnknownColumn { entity: String, field: String },
}
