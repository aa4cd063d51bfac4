//! Instantiation of after-templates from a binding.

use super::negate::negate;
use crate::ast::{Expr, ExprKind, JavaType};
use crate::matcher::{Bound, Binding};
use crate::rule::Rule;
use crate::template::Pattern;
use std::collections::HashSet;

/// The instantiated replacement expression and any risks noted on the way.
#[derive(Debug, Clone)]
pub struct Instantiation {
    pub expr: Expr,
    pub notes: Vec<String>,
}

/// Builds the replacement for a match of `rule` from its binding.
///
/// Bound subtrees are cloned with their spans, so printing them against the
/// original source reproduces the user's text. With `negated`, the result is
/// the logical negation of the after-template.
pub fn instantiate(rule: &Rule, binding: &Binding, negated: bool) -> Instantiation {
    let mut taken = HashSet::new();
    for (_, bound) in binding.vars() {
        for expr in bound.exprs() {
            collect_names(expr, &mut taken);
        }
    }

    let mut sub = Substituter {
        rule,
        binding,
        taken,
        scope: Vec::new(),
        notes: Vec::new(),
    };
    let expr = sub.build(&rule.after);
    let expr = if negated { negate(&expr) } else { expr };
    Instantiation {
        expr,
        notes: sub.notes,
    }
}

fn collect_names(expr: &Expr, names: &mut HashSet<String>) {
    expr.visit(&mut |e| {
        if let ExprKind::Name(name) = &e.kind {
            names.insert(name.clone());
        }
    });
}

struct Substituter<'a> {
    rule: &'a Rule,
    binding: &'a Binding,
    /// Names that generated lambda parameters must not shadow.
    taken: HashSet<String>,
    /// Template lambda parameter to emitted name, innermost last.
    scope: Vec<(String, String)>,
    notes: Vec<String>,
}

impl Substituter<'_> {
    fn build(&mut self, pattern: &Pattern) -> Expr {
        let kind = match pattern {
            Pattern::Metavar(name) => {
                return match self.binding.get(name) {
                    Some(Bound::Single(bound)) => bound.expr.clone(),
                    // a repeated variable outside an argument list renders as its first element
                    Some(Bound::Repeated(items)) => items
                        .first()
                        .map(|b| b.expr.clone())
                        .unwrap_or_else(|| Expr::name(name.clone())),
                    None => Expr::name(name.clone()),
                };
            }
            Pattern::LambdaParam(name) => {
                let emitted = self
                    .scope
                    .iter()
                    .rev()
                    .find(|(template, _)| template == name)
                    .map(|(_, emitted)| emitted.clone())
                    .unwrap_or_else(|| name.clone());
                ExprKind::Name(emitted)
            }
            Pattern::Placeholder(call) => {
                let args = self.list(&call.args);
                return match self.binding.placeholder(&call.decl.name) {
                    Some(f) => f.call(&args),
                    None => Expr::synthetic(ExprKind::Call {
                        receiver: None,
                        type_args: Vec::new(),
                        name: call.decl.name.clone(),
                        args,
                    }),
                };
            }
            Pattern::Name(name) => ExprKind::Name(name.clone()),
            Pattern::Literal(lit) => ExprKind::Literal(lit.clone()),
            Pattern::This => ExprKind::This,
            Pattern::Opaque(text) => ExprKind::Opaque(text.clone()),
            Pattern::FieldAccess { target, field } => ExprKind::FieldAccess {
                target: Box::new(self.build(target)),
                field: field.clone(),
            },
            Pattern::Call {
                receiver,
                type_args,
                name,
                args,
            } => {
                let receiver = receiver.as_ref().map(|r| Box::new(self.build(r)));
                let witnesses: Option<Vec<JavaType>> =
                    type_args.iter().map(|t| self.resolve(t)).collect();
                let type_args = witnesses.unwrap_or_else(|| {
                    self.notes.push(format!(
                        "dropped unresolved type arguments of '{name}'; the call relies on inference"
                    ));
                    Vec::new()
                });
                ExprKind::Call {
                    receiver,
                    type_args,
                    name: name.clone(),
                    args: self.list(args),
                }
            }
            Pattern::New { ty, args } => {
                let ty = self.resolve(ty).unwrap_or_else(|| {
                    JavaType::generic(ty.name.clone(), vec![JavaType::named("")])
                });
                ExprKind::New {
                    ty,
                    args: self.list(args),
                }
            }
            Pattern::NewArray { ty, dims, init } => ExprKind::NewArray {
                ty: self.resolve_or_erase(ty),
                dims: self.list(dims),
                init: init.as_ref().map(|items| self.list(items)),
            },
            Pattern::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: Box::new(self.build(operand)),
            },
            Pattern::Binary { op, lhs, rhs } => ExprKind::Binary {
                op: *op,
                lhs: Box::new(self.build(lhs)),
                rhs: Box::new(self.build(rhs)),
            },
            Pattern::Ternary {
                cond,
                then,
                otherwise,
            } => ExprKind::Ternary {
                cond: Box::new(self.build(cond)),
                then: Box::new(self.build(then)),
                otherwise: Box::new(self.build(otherwise)),
            },
            Pattern::Cast { ty, expr } => ExprKind::Cast {
                ty: self.resolve_or_erase(ty),
                expr: Box::new(self.build(expr)),
            },
            Pattern::InstanceOf { expr, ty } => ExprKind::InstanceOf {
                expr: Box::new(self.build(expr)),
                ty: self.resolve_or_erase(ty),
            },
            Pattern::ArrayAccess { array, index } => ExprKind::ArrayAccess {
                array: Box::new(self.build(array)),
                index: Box::new(self.build(index)),
            },
            Pattern::Lambda { params, body } => {
                let depth = self.scope.len();
                let mut emitted = Vec::with_capacity(params.len());
                for param in params {
                    let name = self.lambda_name(param);
                    self.scope.push((param.clone(), name.clone()));
                    emitted.push(name);
                }
                let body = self.build(body);
                self.scope.truncate(depth);
                ExprKind::Lambda {
                    params: emitted,
                    body: Box::new(body),
                }
            }
            Pattern::MethodRef { target, name } => ExprKind::MethodRef {
                target: Box::new(self.build(target)),
                name: name.clone(),
            },
            Pattern::ClassLit(ty) => ExprKind::ClassLit(self.resolve_or_erase(ty)),
        };
        Expr::synthetic(kind)
    }

    /// Builds an argument list, expanding repeated metavariables in place.
    fn list(&mut self, patterns: &[Pattern]) -> Vec<Expr> {
        let mut out = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            if let Pattern::Metavar(name) = pattern {
                if let Some(Bound::Repeated(items)) = self.binding.get(name) {
                    out.extend(items.iter().map(|b| b.expr.clone()));
                    continue;
                }
            }
            out.push(self.build(pattern));
        }
        out
    }

    /// Prefers the name the matched code used, then the template's, then a fresh one.
    fn lambda_name(&mut self, template: &str) -> String {
        let preferred = self
            .binding
            .lambda_rename(template)
            .unwrap_or(template)
            .to_string();
        let in_scope = |name: &str, scope: &[(String, String)]| scope.iter().any(|(_, e)| e == name);
        let mut name = preferred.clone();
        let mut suffix = 1;
        while self.taken.contains(&name) || in_scope(&name, &self.scope) {
            name = format!("{preferred}{suffix}");
            suffix += 1;
        }
        name
    }

    /// Replaces rule type variables by their captured instantiations.
    fn resolve(&self, ty: &JavaType) -> Option<JavaType> {
        if self.rule.is_type_param(&ty.name) {
            return self
                .binding
                .type_var(&ty.name)
                .map(|t| t.clone().with_dims(ty.dims));
        }
        Some(JavaType {
            name: ty.name.clone(),
            args: ty
                .args
                .iter()
                .map(|a| self.resolve(a))
                .collect::<Option<Vec<_>>>()?,
            dims: ty.dims,
        })
    }

    fn resolve_or_erase(&mut self, ty: &JavaType) -> JavaType {
        if let Some(resolved) = self.resolve(ty) {
            return resolved;
        }
        let erased = match self.rule.type_param(&ty.name).and_then(|t| t.bound.as_ref()) {
            Some(bound) => bound.erased().with_dims(ty.dims),
            None if self.rule.is_type_param(&ty.name) => JavaType::named("Object").with_dims(ty.dims),
            None => ty.erased(),
        };
        self.notes
            .push(format!("type '{ty}' could not be resolved; emitted its erasure '{erased}'"));
        erased
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CompilationUnit, Printer, parse_expression};
    use crate::guard::GuardRegistry;
    use crate::matcher::Unifier;
    use crate::rule::RuleSpec;
    use crate::template::compile_rule;
    use crate::types::{DeclaredTypeOracle, TypeHierarchy};

    const SOURCE: &str = r#"
import java.util.*;

class A {
    void run(List<String> list, Optional<String> optional, String s) {
        Arrays.asList("a", s);
        optional.isPresent() ? optional.get().trim() : null;
        list.stream().anyMatch(x -> x.isEmpty());
    }
}
"#;

    fn rewrite(yaml: &str, target: &str) -> (String, Vec<String>) {
        let spec: RuleSpec = serde_yaml::from_str(yaml).unwrap();
        let rule = compile_rule(
            &spec,
            "Test",
            0,
            &GuardRegistry::builtin(),
            &TypeHierarchy::jdk(),
        )
        .unwrap();
        let unit = CompilationUnit::parse(SOURCE).unwrap();
        let oracle = DeclaredTypeOracle::default();
        let unifier = Unifier::new(&rule, &oracle, &unit);
        let target = parse_expression(target).unwrap();
        let (_, binding) = unifier.match_alternatives(&target).unwrap();
        let result = instantiate(&rule, &binding, false);
        (Printer::new().render(&result.expr), result.notes)
    }

    #[test]
    fn test_repeated_expansion() {
        let (text, notes) = rewrite(
            r#"
name: ListOf
type_params: [T]
params: [{name: items, type: "T...", repeated: true}]
before: ["Arrays.asList(items)"]
after: List.of(items)
"#,
            "Arrays.asList(\"a\", s)",
        );
        assert_eq!(text, "List.of(\"a\", s)");
        assert!(notes.is_empty());
    }

    #[test]
    fn test_placeholder_application() {
        let (text, _) = rewrite(
            r#"
name: OptionalMap
type_params: [T]
params: [{name: optional, type: "Optional<T>"}]
placeholders:
  - name: transform
    params: [{name: value}]
before: ["optional.isPresent() ? transform(optional.get()) : null"]
after: optional.map(v -> transform(v)).orElse(null)
"#,
            "optional.isPresent() ? optional.get().trim() : null",
        );
        assert_eq!(text, "optional.map(v -> v.trim()).orElse(null)");
    }

    #[test]
    fn test_lambda_keeps_matched_name() {
        let (text, _) = rewrite(
            r#"
name: NoneMatch
type_params: [T]
params: [{name: list, type: "List<T>"}]
before: ["!list.stream().anyMatch(e -> e.isEmpty())"]
after: list.stream().noneMatch(e -> e.isEmpty())
"#,
            "!list.stream().anyMatch(x -> x.isEmpty())",
        );
        assert_eq!(text, "list.stream().noneMatch(x -> x.isEmpty())");
    }

    #[test]
    fn test_fresh_lambda_name_avoids_capture() {
        let (text, _) = rewrite(
            r#"
name: EqualsAny
params: [{name: e, type: String}]
before: ["foo(e)"]
after: bar(s -> s.equals(e))
"#,
            "foo(s)",
        );
        // `s` is taken by the bound expression, so the lambda parameter is renamed
        assert_eq!(text, "bar(s1 -> s1.equals(s))");
    }

    #[test]
    fn test_type_witnesses() {
        let yaml = r#"
name: EmptyList
type_params: [T]
params: [{name: list, type: "List<T>"}]
before: ["list.subList(0, 0)"]
after: Collections.<T>emptyList()
"#;
        let (text, notes) = rewrite(yaml, "list.subList(0, 0)");
        assert_eq!(text, "Collections.<String>emptyList()");
        assert!(notes.is_empty());
    }
}
