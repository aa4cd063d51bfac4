//! The binding environment produced by a successful match.

use crate::ast::{Expr, ExprKind, JavaType};
use std::collections::HashMap;

/// A target expression bound to a metavariable, with its resolved static type.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundExpr {
    pub expr: Expr,
    pub ty: Option<JavaType>,
}

/// What a metavariable is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Single(BoundExpr),
    /// A run of sibling expressions, in source order.
    Repeated(Vec<BoundExpr>),
}

impl Bound {
    /// The bound expressions in order; one for a single binding.
    pub fn exprs(&self) -> Vec<&Expr> {
        match self {
            Bound::Single(b) => vec![&b.expr],
            Bound::Repeated(items) => items.iter().map(|b| &b.expr).collect(),
        }
    }
}

/// A placeholder captured as a function value.
///
/// The body is target code in which the call-site arguments have been replaced
/// by positional markers; [`PlaceholderFn::call`] substitutes new arguments
/// back in.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderFn {
    pub body: Expr,
    pub arity: usize,
}

impl PlaceholderFn {
    /// The marker name standing for formal parameter `index`. Not a valid Java identifier.
    pub fn marker(index: usize) -> String {
        format!("#{index}")
    }

    /// Applies the captured body to `args`.
    pub fn call(&self, args: &[Expr]) -> Expr {
        self.body.replace_where(&mut |node| match &node.kind {
            ExprKind::Name(name) => name
                .strip_prefix('#')
                .and_then(|i| i.parse::<usize>().ok())
                .and_then(|i| args.get(i))
                .cloned(),
            _ => None,
        })
    }
}

/// Metavariable, placeholder and type-variable bindings of one match.
///
/// Created fresh for every match attempt and discarded on failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Binding {
    vars: HashMap<String, Bound>,
    placeholders: HashMap<String, PlaceholderFn>,
    lambda_renames: HashMap<String, String>,
    type_vars: HashMap<String, JavaType>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Bound> {
        self.vars.get(name)
    }

    /// Returns the expression bound to a single metavariable.
    pub fn single(&self, name: &str) -> Option<&BoundExpr> {
        match self.vars.get(name)? {
            Bound::Single(b) => Some(b),
            Bound::Repeated(_) => None,
        }
    }

    pub fn vars(&self) -> impl Iterator<Item = (&str, &Bound)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn bind(&mut self, name: impl Into<String>, bound: Bound) {
        self.vars.insert(name.into(), bound);
    }

    pub fn placeholder(&self, name: &str) -> Option<&PlaceholderFn> {
        self.placeholders.get(name)
    }

    pub fn bind_placeholder(&mut self, name: impl Into<String>, value: PlaceholderFn) {
        self.placeholders.insert(name.into(), value);
    }

    /// The target name a template lambda parameter was matched against.
    pub fn lambda_rename(&self, template_name: &str) -> Option<&str> {
        self.lambda_renames.get(template_name).map(String::as_str)
    }

    pub fn rename_lambda_param(&mut self, template_name: impl Into<String>, target: impl Into<String>) {
        self.lambda_renames.insert(template_name.into(), target.into());
    }

    /// The type a rule type variable was instantiated with.
    pub fn type_var(&self, name: &str) -> Option<&JavaType> {
        self.type_vars.get(name)
    }

    pub fn bind_type_var(&mut self, name: impl Into<String>, ty: JavaType) {
        self.type_vars.insert(name.into(), ty);
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.placeholders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_expression;

    #[test]
    fn test_placeholder_call_substitutes_markers() {
        let body = parse_expression("foo(x).bar()").unwrap();
        let body = body.replace_where(&mut |e| {
            matches!(&e.kind, ExprKind::Name(n) if n == "x").then(|| Expr::name(PlaceholderFn::marker(0)))
        });
        let f = PlaceholderFn { body, arity: 1 };
        let applied = f.call(&[parse_expression("y + 1").unwrap()]);
        assert_eq!(applied.to_string(), "foo(y + 1).bar()");
    }

    #[test]
    fn test_single_and_repeated() {
        let mut binding = Binding::new();
        let a = BoundExpr {
            expr: Expr::name("a"),
            ty: None,
        };
        binding.bind("x", Bound::Single(a.clone()));
        binding.bind("rest", Bound::Repeated(vec![a.clone(), a]));
        assert!(binding.single("x").is_some());
        assert!(binding.single("rest").is_none());
        assert_eq!(binding.get("rest").unwrap().exprs().len(), 2);
    }
}
