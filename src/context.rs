//! The render context: bindings, injected collaborators, and loop locals.

use std::collections::HashMap;
use std::rc::Rc;

use crate::dialect::{Dialect, IdentifierResolver};
use crate::value::Value;

/// What to emit when an `@in` source evaluates to an empty sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyInStrategy {
    /// Emit the literal `(NULL)` with no binds.
    #[default]
    Null,
    /// Fail rendering with [`crate::RenderError::EmptyInList`].
    Error,
    /// Rewrite the enclosing predicate to the constant falsehood `1=0`.
    False,
}

/// One loop-local binding; scopes chain outward via `parent` so nested
/// `@for` blocks share structure instead of copying maps.
struct Scope {
    name: String,
    value: Value,
    parent: Option<Rc<Scope>>,
}

/// Immutable snapshot of everything a render call needs.
///
/// `with_local` returns a new context sharing the rest of the chain; the
/// parent is never mutated, which is what makes nested `@for` safe.
pub struct RenderContext<'a> {
    bindings: &'a HashMap<String, Value>,
    pub(crate) dialect: &'a dyn Dialect,
    pub(crate) resolver: &'a dyn IdentifierResolver,
    pub(crate) empty_in: EmptyInStrategy,
    locals: Option<Rc<Scope>>,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        bindings: &'a HashMap<String, Value>,
        dialect: &'a dyn Dialect,
        resolver: &'a dyn IdentifierResolver,
    ) -> Self {
        Self {
            bindings,
            dialect,
            resolver,
            empty_in: EmptyInStrategy::default(),
            locals: None,
        }
    }

    pub fn with_empty_in(mut self, strategy: EmptyInStrategy) -> Self {
        self.empty_in = strategy;
        self
    }

    /// A child context where `name` shadows any outer binding of the same
    /// name. The receiver is untouched.
    pub fn with_local(&self, name: impl Into<String>, value: Value) -> Self {
        Self {
            bindings: self.bindings,
            dialect: self.dialect,
            resolver: self.resolver,
            empty_in: self.empty_in,
            locals: Some(Rc::new(Scope {
                name: name.into(),
                value,
                parent: self.locals.clone(),
            })),
        }
    }

    /// Innermost loop-local first, then the binding map.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut scope = self.locals.as_deref();
        while let Some(s) = scope {
            if s.name == name {
                return Some(s.value.clone());
            }
            scope = s.parent.as_deref();
        }
        self.bindings.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{AnsiDialect, MapResolver};

    #[test]
    fn locals_shadow_bindings_and_parents_survive() {
        let mut bindings = HashMap::new();
        bindings.insert("x".to_string(), Value::Int(1));
        let dialect = AnsiDialect;
        let resolver = MapResolver::new();
        let ctx = RenderContext::new(&bindings, &dialect, &resolver);

        let inner = ctx.with_local("x", Value::Int(2));
        let innermost = inner.with_local("x", Value::Int(3));

        assert_eq!(ctx.lookup("x"), Some(Value::Int(1)));
        assert_eq!(inner.lookup("x"), Some(Value::Int(2)));
        assert_eq!(innermost.lookup("x"), Some(Value::Int(3)));
        assert_eq!(innermost.lookup("missing"), None);
    }
}
