//! Evaluation of template expressions against a render context.

use std::cmp::Ordering;

use crate::ast::{BinOp, ExprLiteral, PathSegment, TemplateExpr};
use crate::context::RenderContext;
use crate::error::RenderError;
use crate::value::Value;

/// Evaluate an expression to a value.
pub fn evaluate(expr: &TemplateExpr, ctx: &RenderContext<'_>) -> Result<Value, RenderError> {
    match expr {
        TemplateExpr::Literal(lit) => Ok(literal_value(lit)),
        TemplateExpr::Path(segments) => evaluate_path(segments, ctx),
        TemplateExpr::Not(inner) => {
            let value = evaluate(inner, ctx)?;
            Ok(Value::Bool(!value.is_truthy()))
        }
        TemplateExpr::Binary { op, left, right } => evaluate_binary(*op, left, right, ctx),
    }
}

fn literal_value(lit: &ExprLiteral) -> Value {
    match lit {
        ExprLiteral::Null => Value::Null,
        ExprLiteral::Bool(b) => Value::Bool(*b),
        ExprLiteral::Int(n) => Value::Int(*n),
        ExprLiteral::Str(s) => Value::Str(s.clone()),
    }
}

fn evaluate_path(segments: &[PathSegment], ctx: &RenderContext<'_>) -> Result<Value, RenderError> {
    let root = &segments[0];
    let mut value = ctx
        .lookup(&root.name)
        .ok_or_else(|| RenderError::MissingBinding(root.name.clone()))?;
    for segment in &segments[1..] {
        value = resolve_segment(&value, segment)?;
    }
    Ok(value)
}

/// Resolve one path step on the current value.
///
/// Maps resolve by entry; opaque objects resolve through their capability
/// function, which covers getter, method, and field shapes alike. A call
/// segment (`name()`) goes through the same lookup.
fn resolve_segment(value: &Value, segment: &PathSegment) -> Result<Value, RenderError> {
    let resolved = match value {
        Value::Map(entries) => entries.get(&segment.name).cloned(),
        Value::Object(resolver) => resolver.resolve(&segment.name),
        _ => None,
    };
    resolved.ok_or_else(|| RenderError::UnknownProperty {
        property: segment.name.clone(),
        value_kind: value.kind(),
    })
}

fn evaluate_binary(
    op: BinOp,
    left: &TemplateExpr,
    right: &TemplateExpr,
    ctx: &RenderContext<'_>,
) -> Result<Value, RenderError> {
    match op {
        // Logical operators short-circuit on truthiness.
        BinOp::Or => {
            let l = evaluate(left, ctx)?;
            if l.is_truthy() {
                return Ok(Value::Bool(true));
            }
            let r = evaluate(right, ctx)?;
            Ok(Value::Bool(r.is_truthy()))
        }
        BinOp::And => {
            let l = evaluate(left, ctx)?;
            if !l.is_truthy() {
                return Ok(Value::Bool(false));
            }
            let r = evaluate(right, ctx)?;
            Ok(Value::Bool(r.is_truthy()))
        }
        BinOp::Eq => {
            let l = evaluate(left, ctx)?;
            let r = evaluate(right, ctx)?;
            Ok(Value::Bool(l == r))
        }
        BinOp::Ne => {
            let l = evaluate(left, ctx)?;
            let r = evaluate(right, ctx)?;
            Ok(Value::Bool(l != r))
        }
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let l = evaluate(left, ctx)?;
            let r = evaluate(right, ctx)?;
            let ordering = compare(&l, &r)?;
            let result = match op {
                BinOp::Lt => ordering == Ordering::Less,
                BinOp::Le => ordering != Ordering::Greater,
                BinOp::Gt => ordering == Ordering::Greater,
                BinOp::Ge => ordering != Ordering::Less,
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
    }
}

/// Order two values: numbers by magnitude, same-kind values structurally,
/// anything else is not comparable.
pub fn compare(left: &Value, right: &Value) -> Result<Ordering, RenderError> {
    let incomparable = || RenderError::NotComparable {
        left: left.kind(),
        right: right.kind(),
    };
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b).ok_or_else(incomparable),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)).ok_or_else(incomparable),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).ok_or_else(incomparable),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        _ => Err(incomparable()),
    }
}
